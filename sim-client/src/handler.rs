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

use crate::message::Message;

/// Callback invoked once per message received on a subscribed topic.
///
/// Calls for one topic never overlap and arrive in transport order. Handlers
/// for different topics run on different threads, so shared state needs its
/// own synchronization. A panic inside `on_message` is caught and logged; the
/// topic keeps receiving.
///
/// Any `Fn(Message) + Send + Sync` closure is a handler:
///
/// ```
/// use std::sync::Arc;
/// use sim_client::{Message, TopicHandler};
///
/// let handler: Arc<dyn TopicHandler> = Arc::new(|message: Message| {
///     if let Some(raw) = message.raw_data() {
///         println!("camera frame: {} bytes", raw.len());
///     }
/// });
/// # let _ = handler;
/// ```
pub trait TopicHandler: Send + Sync {
    fn on_message(&self, message: Message);
}

impl<F> TopicHandler for F
where
    F: Fn(Message) + Send + Sync,
{
    fn on_message(&self, message: Message) {
        self(message)
    }
}
