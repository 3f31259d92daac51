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

//! Per-topic receive loop: poll, decode, dispatch.

use crate::handler::TopicHandler;
use crate::message::decode;
use crate::observability::{events, fields};
use crate::transport::{Frames, InboundChannel};
use arc_swap::ArcSwap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Level};

const COMPONENT: &str = "topic_listener";

/// Shared slot holding the handler currently bound to a topic.
pub(crate) type HandlerSlot = Arc<ArcSwap<Arc<dyn TopicHandler>>>;

pub(crate) fn new_handler_slot(handler: Arc<dyn TopicHandler>) -> HandlerSlot {
    Arc::new(ArcSwap::from_pointee(handler))
}

/// Cooperative stop signal for one listener, observed at poll boundaries.
#[derive(Clone, Debug, Default)]
pub(crate) struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ListenerState {
    Idle,
    Receiving,
    Stopped,
}

/// What a single poll step did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum PollOutcome {
    NoData,
    Dispatched,
    HandlerFaulted,
    Malformed,
    TransportFault,
    Stopped,
}

pub(crate) struct TopicListener {
    topic: String,
    listener_id: String,
    inbound: Box<dyn InboundChannel>,
    handler: HandlerSlot,
    cancellation: CancellationToken,
    running: Arc<AtomicBool>,
    poll_interval: Duration,
    state: ListenerState,
}

impl TopicListener {
    pub(crate) fn new(
        topic: &str,
        listener_id: &str,
        inbound: Box<dyn InboundChannel>,
        handler: HandlerSlot,
        cancellation: CancellationToken,
        running: Arc<AtomicBool>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            topic: topic.to_string(),
            listener_id: listener_id.to_string(),
            inbound,
            handler,
            cancellation,
            running,
            poll_interval,
            state: ListenerState::Idle,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> ListenerState {
        self.state
    }

    /// Runs until cancelled and hands the inbound channel back for release.
    pub(crate) async fn run(mut self) -> Box<dyn InboundChannel> {
        let context = fields::ListenerContext::with_current_thread(self.listener_id.as_str());
        info!(
            event = events::LISTENER_START,
            component = COMPONENT,
            topic = self.topic.as_str(),
            listener_id = context.listener_id.as_str(),
            listener_thread = context.listener_thread.as_str(),
            "topic listener started"
        );

        while self.poll_once().await != PollOutcome::Stopped {}

        let reason = if self.cancellation.is_cancelled() {
            fields::REASON_CANCELLED
        } else {
            fields::REASON_SHUTTING_DOWN
        };
        info!(
            event = events::LISTENER_STOP,
            component = COMPONENT,
            topic = self.topic.as_str(),
            listener_id = context.listener_id.as_str(),
            listener_thread = context.listener_thread.as_str(),
            reason,
            "topic listener stopped"
        );

        self.inbound
    }

    /// Performs one state transition.
    ///
    /// Waits at most one poll interval for data, so a cancellation is seen
    /// within that bound even on a silent topic.
    pub(crate) async fn poll_once(&mut self) -> PollOutcome {
        if self.state == ListenerState::Stopped || self.cancellation.is_cancelled() {
            self.state = ListenerState::Stopped;
            return PollOutcome::Stopped;
        }

        match tokio::time::timeout(self.poll_interval, self.inbound.recv()).await {
            Err(_elapsed) => {
                self.state = ListenerState::Idle;
                PollOutcome::NoData
            }
            Ok(Ok(frames)) => {
                self.state = ListenerState::Receiving;
                let outcome = self.dispatch(frames);
                self.state = ListenerState::Idle;
                outcome
            }
            Ok(Err(err)) => {
                if !self.running.load(Ordering::Acquire) {
                    debug!(
                        event = events::LISTENER_RECV_FAILED,
                        component = COMPONENT,
                        topic = self.topic.as_str(),
                        listener_id = self.listener_id.as_str(),
                        reason = fields::REASON_SHUTTING_DOWN,
                        err = %err,
                        "receive failed during shutdown"
                    );
                    self.state = ListenerState::Stopped;
                    return PollOutcome::Stopped;
                }

                warn!(
                    event = events::LISTENER_RECV_FAILED,
                    component = COMPONENT,
                    topic = self.topic.as_str(),
                    listener_id = self.listener_id.as_str(),
                    err = %err,
                    "error receiving message; retrying on next poll"
                );
                tokio::time::sleep(self.poll_interval).await;
                self.state = ListenerState::Idle;
                PollOutcome::TransportFault
            }
        }
    }

    fn dispatch(&self, frames: Frames) -> PollOutcome {
        if tracing::enabled!(Level::DEBUG) {
            debug!(
                event = events::LISTENER_RECEIVE,
                component = COMPONENT,
                topic = self.topic.as_str(),
                listener_id = self.listener_id.as_str(),
                label = fields::format_topic_label(&frames).as_str(),
                frame_count = frames.len(),
                payload_len = fields::payload_len(&frames),
                "received topic message"
            );
        }

        let frame_count = frames.len();
        let payload = match frame_count {
            1 | 2 => frames.into_iter().last(),
            _ => None,
        };
        let Some(payload) = payload else {
            warn!(
                event = events::LISTENER_MALFORMED_FRAMES,
                component = COMPONENT,
                topic = self.topic.as_str(),
                listener_id = self.listener_id.as_str(),
                frame_count,
                "expected [topic, payload] frames; skipping message"
            );
            return PollOutcome::Malformed;
        };

        let message = decode(payload);
        // Loaded per message so a re-subscribe takes effect on the next delivery.
        let handler = self.handler.load_full();

        match panic::catch_unwind(AssertUnwindSafe(|| handler.on_message(message))) {
            Ok(()) => PollOutcome::Dispatched,
            Err(panic_payload) => {
                warn!(
                    event = events::LISTENER_HANDLER_PANICKED,
                    component = COMPONENT,
                    topic = self.topic.as_str(),
                    listener_id = self.listener_id.as_str(),
                    err = fields::format_panic_payload(panic_payload.as_ref()).as_str(),
                    "error processing message in topic handler"
                );
                PollOutcome::HandlerFaulted
            }
        }
    }
}
