/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Decoded topic payloads and the payload decoder.

use bytes::Bytes;
use serde_json::{Map, Value};

/// Key under which an undecodable payload is exposed.
pub const RAW_DATA_KEY: &str = "raw_data";

/// One payload delivered to a [`TopicHandler`](crate::TopicHandler).
///
/// A payload that parses as a JSON object arrives as [`Message::Structured`].
/// Anything else (binary frames such as camera images, malformed text, or JSON
/// whose top level is not an object) arrives untouched as [`Message::Raw`].
///
/// ```
/// use bytes::Bytes;
/// use sim_client::{decode, Message};
///
/// match decode(Bytes::from_static(br#"{"speed": 10}"#)) {
///     Message::Structured(fields) => assert_eq!(fields["speed"], 10),
///     Message::Raw(_) => unreachable!(),
/// }
///
/// let image = decode(Bytes::from_static(&[0xff, 0xd8, 0xff, 0xe0]));
/// assert_eq!(image.raw_data().map(|raw| raw.len()), Some(4));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Structured(Map<String, Value>),
    Raw(Bytes),
}

impl Message {
    /// Looks up a field by key.
    ///
    /// For a raw message only [`RAW_DATA_KEY`] resolves; use
    /// [`Message::raw_data`] to get at the bytes without copying.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Message::Structured(fields) => fields.get(key).cloned(),
            Message::Raw(raw) if key == RAW_DATA_KEY => Some(raw_to_value(raw)),
            Message::Raw(_) => None,
        }
    }

    pub fn raw_data(&self) -> Option<&Bytes> {
        match self {
            Message::Raw(raw) => Some(raw),
            Message::Structured(_) => None,
        }
    }

    pub fn fields(&self) -> Option<&Map<String, Value>> {
        match self {
            Message::Structured(fields) => Some(fields),
            Message::Raw(_) => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, Message::Raw(_))
    }

    /// Renders the message as a single mapping, `{"raw_data": [..]}` for raw payloads.
    pub fn to_value(&self) -> Value {
        match self {
            Message::Structured(fields) => Value::Object(fields.clone()),
            Message::Raw(raw) => {
                let mut fields = Map::with_capacity(1);
                fields.insert(RAW_DATA_KEY.to_string(), raw_to_value(raw));
                Value::Object(fields)
            }
        }
    }
}

fn raw_to_value(raw: &Bytes) -> Value {
    Value::Array(raw.iter().map(|byte| Value::from(*byte)).collect())
}

/// Decodes one received payload. Never fails: see [`Message`].
pub fn decode(raw: Bytes) -> Message {
    match serde_json::from_slice::<Value>(&raw) {
        Ok(Value::Object(fields)) => Message::Structured(fields),
        _ => Message::Raw(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::{decode, Message, RAW_DATA_KEY};
    use bytes::Bytes;
    use serde_json::json;

    #[test]
    fn decode_returns_structured_mapping_for_json_objects() {
        let message = decode(Bytes::from_static(
            br#"{"position":[1.5,2.0,0.0],"speed":3.25,"name":"ego"}"#,
        ));

        assert_eq!(
            message.to_value(),
            json!({"position": [1.5, 2.0, 0.0], "speed": 3.25, "name": "ego"})
        );
        assert!(!message.is_raw());
    }

    #[test]
    fn decode_keeps_binary_payload_byte_for_byte() {
        let payload = Bytes::from(vec![0x89, b'P', b'N', b'G', 0x00, 0xff, 0x10]);

        let message = decode(payload.clone());

        let raw = message.raw_data().expect("binary payload should be raw");
        assert_eq!(raw, &payload);
        assert_eq!(raw.as_ptr(), payload.as_ptr());
    }

    #[test]
    fn decode_falls_back_on_malformed_json() {
        let message = decode(Bytes::from_static(br#"{"speed": 10"#));

        assert_eq!(
            message,
            Message::Raw(Bytes::from_static(br#"{"speed": 10"#))
        );
    }

    #[test]
    fn decode_treats_non_object_json_as_raw() {
        assert!(decode(Bytes::from_static(b"[1,2,3]")).is_raw());
        assert!(decode(Bytes::from_static(b"42")).is_raw());
        assert!(decode(Bytes::from_static(b"\"camera\"")).is_raw());
    }

    #[test]
    fn decode_treats_empty_payload_as_raw() {
        let message = decode(Bytes::new());

        assert_eq!(message.raw_data().map(|raw| raw.len()), Some(0));
    }

    #[test]
    fn raw_message_is_only_reachable_under_reserved_key() {
        let message = decode(Bytes::from_static(&[1, 2, 3]));

        assert_eq!(message.get(RAW_DATA_KEY), Some(json!([1, 2, 3])));
        assert_eq!(message.get("speed"), None);
        assert_eq!(message.to_value(), json!({"raw_data": [1, 2, 3]}));
        assert!(message.fields().is_none());
    }
}
