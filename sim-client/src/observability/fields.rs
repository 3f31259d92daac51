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

//! Canonical structured field values and value-format helpers.

use crate::transport::Frames;
use std::any::Any;

pub const NONE: &str = "none";
pub const REASON_SHUTTING_DOWN: &str = "shutting_down";
pub const REASON_CANCELLED: &str = "cancelled";
pub const REASON_JOIN_TIMEOUT: &str = "join_timeout";
pub const DEFAULT_LISTENER_THREAD: &str = "unknown-thread";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ListenerContext {
    pub listener_id: String,
    pub listener_thread: String,
}

impl ListenerContext {
    pub fn with_current_thread(listener_id: impl Into<String>) -> Self {
        Self {
            listener_id: listener_id.into(),
            listener_thread: current_thread_name_or_default(),
        }
    }
}

pub fn thread_name_or_default(thread_name: Option<&str>) -> String {
    thread_name.unwrap_or(DEFAULT_LISTENER_THREAD).to_string()
}

pub fn current_thread_name_or_default() -> String {
    thread_name_or_default(std::thread::current().name())
}

/// Renders the topic label frame, lossily when it is not UTF-8.
pub fn format_topic_label(frames: &Frames) -> String {
    frames
        .first()
        .map(|label| String::from_utf8_lossy(label).into_owned())
        .unwrap_or_else(|| NONE.to_string())
}

pub fn payload_len(frames: &Frames) -> usize {
    frames.last().map(|payload| payload.len()).unwrap_or(0)
}

/// Extracts the message carried by a caught panic.
pub fn format_panic_payload(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
