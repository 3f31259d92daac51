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

//! Transport capabilities the client is built on.
//!
//! The client never creates sockets itself. A [`SimTransport`] hands out
//! channel bindings: a topic-filtered inbound subscription, a broadcast
//! publisher and a one-to-one pusher. Payloads are multipart frames of raw
//! bytes.

use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;

/// One multipart message: for published data `[topic, payload]`.
pub type Frames = Vec<Bytes>;

/// Factory for channel bindings on a byte-oriented message fabric.
#[async_trait]
pub trait SimTransport: Send + Sync {
    /// Subscribes to `topic` on the publisher reachable at `endpoint`.
    ///
    /// Topic filtering follows the fabric's own rules, usually a prefix match
    /// on the first frame.
    async fn subscribe(
        &self,
        endpoint: &str,
        topic: &str,
    ) -> Result<Box<dyn InboundChannel>, TransportError>;

    /// Connects a one-to-many publisher to `endpoint`.
    async fn publisher(&self, endpoint: &str) -> Result<Box<dyn OutboundChannel>, TransportError>;

    /// Connects a one-to-one pusher to `endpoint`.
    async fn pusher(&self, endpoint: &str) -> Result<Box<dyn OutboundChannel>, TransportError>;

    /// Releases resources shared by every binding of this transport.
    async fn shutdown(&self);
}

/// Receiving half of a subscription.
#[async_trait]
pub trait InboundChannel: Send {
    /// Waits for the next message.
    ///
    /// Must be cancel-safe: the listener polls it under a timeout and drops
    /// the future when the timeout fires, which must not lose a message.
    async fn recv(&mut self) -> Result<Frames, TransportError>;

    async fn close(&mut self);
}

/// Sending half of a publisher or pusher binding.
#[async_trait]
pub trait OutboundChannel: Send + Sync {
    /// Writes one message without waiting for the peer.
    async fn send(&self, frames: Frames) -> Result<(), TransportError>;

    async fn close(&self);
}
