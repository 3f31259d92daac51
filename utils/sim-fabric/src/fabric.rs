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

//! In-memory message fabric with pub/sub and push/pull endpoints.
//!
//! Endpoints are plain address strings. Either side may reach an address
//! first; the queue behind it is created on first use. Pub/sub addresses are
//! backed by a bounded broadcast queue where a slow subscriber loses the
//! oldest messages. Push/pull addresses are backed by a bounded queue where a
//! full queue rejects the write with [`TransportError::WouldBlock`].

use async_trait::async_trait;
use bytes::Bytes;
use sim_client::{Frames, InboundChannel, OutboundChannel, SimTransport, TransportError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tracing::{debug, info, warn};

const COMPONENT: &str = "in_memory_fabric";

/// Default per-endpoint queue depth.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

const FABRIC_SUBSCRIBE_OK: &str = "fabric_subscribe_ok";
const FABRIC_BIND_OK: &str = "fabric_bind_ok";
const FABRIC_BIND_FAILED: &str = "fabric_bind_failed";
const FABRIC_SUBSCRIBER_LAGGED: &str = "fabric_subscriber_lagged";
const FABRIC_SHUTDOWN: &str = "fabric_shutdown";

struct Pipeline {
    sender: mpsc::Sender<Frames>,
    receiver: Option<mpsc::Receiver<Frames>>,
}

struct FabricState {
    topics: HashMap<String, broadcast::Sender<Frames>>,
    pipelines: HashMap<String, Pipeline>,
    bound: HashSet<String>,
}

struct FabricInner {
    queue_capacity: usize,
    available: AtomicBool,
    shut_down: AtomicBool,
    shutdown_signal: watch::Sender<bool>,
    state: Mutex<FabricState>,
}

/// Shared handle to one fabric. Clones talk to the same endpoints.
#[derive(Clone)]
pub struct InMemoryFabric {
    inner: Arc<FabricInner>,
}

impl Default for InMemoryFabric {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl InMemoryFabric {
    /// Creates a fabric whose endpoint queues hold `queue_capacity` messages.
    pub fn new(queue_capacity: usize) -> Self {
        let (shutdown_signal, _) = watch::channel(false);
        Self {
            inner: Arc::new(FabricInner {
                queue_capacity: queue_capacity.max(1),
                available: AtomicBool::new(true),
                shut_down: AtomicBool::new(false),
                shutdown_signal,
                state: Mutex::new(FabricState {
                    topics: HashMap::new(),
                    pipelines: HashMap::new(),
                    bound: HashSet::new(),
                }),
            }),
        }
    }

    pub fn queue_capacity(&self) -> usize {
        self.inner.queue_capacity
    }

    /// Makes every later bind or connect fail with `Unavailable` while `false`.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::Release);
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }

    /// Binds the publishing side of a pub/sub endpoint.
    pub async fn bind_publisher(&self, endpoint: &str) -> Result<FabricPublisher, TransportError> {
        self.ensure_open(endpoint)?;
        let mut state = self.inner.state.lock().await;
        Self::claim(&mut state, endpoint)?;
        let sender = self.topic_sender(&mut state, endpoint);
        info!(
            event = FABRIC_BIND_OK,
            component = COMPONENT,
            endpoint,
            role = "publisher",
            "endpoint bound"
        );
        Ok(FabricPublisher::new(endpoint, sender, self.inner.clone()))
    }

    /// Binds the subscribing side of a pub/sub endpoint, filtered to `topic`.
    pub async fn bind_subscriber(
        &self,
        endpoint: &str,
        topic: &str,
    ) -> Result<FabricSubscriber, TransportError> {
        self.ensure_open(endpoint)?;
        let mut state = self.inner.state.lock().await;
        Self::claim(&mut state, endpoint)?;
        let receiver = self.topic_sender(&mut state, endpoint).subscribe();
        info!(
            event = FABRIC_BIND_OK,
            component = COMPONENT,
            endpoint,
            topic,
            role = "subscriber",
            "endpoint bound"
        );
        Ok(FabricSubscriber::new(endpoint, topic, receiver, &self.inner))
    }

    /// Binds the pulling side of a push/pull endpoint. Only one puller may bind.
    pub async fn bind_puller(&self, endpoint: &str) -> Result<FabricPuller, TransportError> {
        self.ensure_open(endpoint)?;
        let mut state = self.inner.state.lock().await;
        Self::claim(&mut state, endpoint)?;
        let capacity = self.inner.queue_capacity;
        let pipeline = state
            .pipelines
            .entry(endpoint.to_string())
            .or_insert_with(|| new_pipeline(capacity));
        let Some(receiver) = pipeline.receiver.take() else {
            return Err(TransportError::AddressInUse(endpoint.to_string()));
        };
        info!(
            event = FABRIC_BIND_OK,
            component = COMPONENT,
            endpoint,
            role = "puller",
            "endpoint bound"
        );
        Ok(FabricPuller {
            endpoint: endpoint.to_string(),
            receiver: Some(receiver),
            shutdown: self.inner.shutdown_signal.subscribe(),
        })
    }

    /// Terminates the fabric: open subscribers and pullers report `Closed`,
    /// further binds fail. Idempotent.
    pub async fn terminate(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.shutdown_signal.send_replace(true);
        let mut state = self.inner.state.lock().await;
        state.topics.clear();
        state.pipelines.clear();
        state.bound.clear();
        info!(
            event = FABRIC_SHUTDOWN,
            component = COMPONENT,
            "fabric terminated"
        );
    }

    fn ensure_open(&self, endpoint: &str) -> Result<(), TransportError> {
        if self.inner.shut_down.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        if !self.inner.available.load(Ordering::Acquire) {
            warn!(
                event = FABRIC_BIND_FAILED,
                component = COMPONENT,
                endpoint,
                "fabric unavailable"
            );
            return Err(TransportError::Unavailable(endpoint.to_string()));
        }
        Ok(())
    }

    fn claim(state: &mut FabricState, endpoint: &str) -> Result<(), TransportError> {
        if !state.bound.insert(endpoint.to_string()) {
            warn!(
                event = FABRIC_BIND_FAILED,
                component = COMPONENT,
                endpoint,
                "endpoint already bound"
            );
            return Err(TransportError::AddressInUse(endpoint.to_string()));
        }
        Ok(())
    }

    fn topic_sender(&self, state: &mut FabricState, endpoint: &str) -> broadcast::Sender<Frames> {
        let capacity = self.inner.queue_capacity;
        state
            .topics
            .entry(endpoint.to_string())
            .or_insert_with(|| broadcast::channel(capacity).0)
            .clone()
    }
}

fn new_pipeline(capacity: usize) -> Pipeline {
    let (sender, receiver) = mpsc::channel(capacity);
    Pipeline {
        sender,
        receiver: Some(receiver),
    }
}

#[async_trait]
impl SimTransport for InMemoryFabric {
    async fn subscribe(
        &self,
        endpoint: &str,
        topic: &str,
    ) -> Result<Box<dyn InboundChannel>, TransportError> {
        self.ensure_open(endpoint)?;
        let mut state = self.inner.state.lock().await;
        let receiver = self.topic_sender(&mut state, endpoint).subscribe();
        debug!(
            event = FABRIC_SUBSCRIBE_OK,
            component = COMPONENT,
            endpoint,
            topic,
            "subscriber connected"
        );
        Ok(Box::new(FabricSubscriber::new(
            endpoint,
            topic,
            receiver,
            &self.inner,
        )))
    }

    async fn publisher(&self, endpoint: &str) -> Result<Box<dyn OutboundChannel>, TransportError> {
        self.ensure_open(endpoint)?;
        let mut state = self.inner.state.lock().await;
        let sender = self.topic_sender(&mut state, endpoint);
        Ok(Box::new(FabricPublisher::new(
            endpoint,
            sender,
            self.inner.clone(),
        )))
    }

    async fn pusher(&self, endpoint: &str) -> Result<Box<dyn OutboundChannel>, TransportError> {
        self.ensure_open(endpoint)?;
        let mut state = self.inner.state.lock().await;
        let capacity = self.inner.queue_capacity;
        let sender = state
            .pipelines
            .entry(endpoint.to_string())
            .or_insert_with(|| new_pipeline(capacity))
            .sender
            .clone();
        Ok(Box::new(FabricPusher {
            endpoint: endpoint.to_string(),
            sender,
            closed: AtomicBool::new(false),
            fabric: self.inner.clone(),
        }))
    }

    async fn shutdown(&self) {
        self.terminate().await;
    }
}

/// Prefix match on the first frame; an empty topic matches everything.
pub fn matches_topic(frames: &Frames, topic: &str) -> bool {
    if topic.is_empty() {
        return true;
    }
    frames
        .first()
        .is_some_and(|label| label.starts_with(topic.as_bytes()))
}

/// Sending side of a pub/sub endpoint.
pub struct FabricPublisher {
    endpoint: String,
    sender: broadcast::Sender<Frames>,
    closed: AtomicBool,
    fabric: Arc<FabricInner>,
}

impl FabricPublisher {
    fn new(endpoint: &str, sender: broadcast::Sender<Frames>, fabric: Arc<FabricInner>) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            sender,
            closed: AtomicBool::new(false),
            fabric,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Publishes `[topic, payload]`.
    pub async fn publish(&self, topic: &str, payload: Bytes) -> Result<(), TransportError> {
        self.send(vec![Bytes::copy_from_slice(topic.as_bytes()), payload])
            .await
    }
}

#[async_trait]
impl OutboundChannel for FabricPublisher {
    async fn send(&self, frames: Frames) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) || self.fabric.shut_down.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        // No subscriber: the message is dropped, as pub/sub does.
        let _ = self.sender.send(frames);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Receiving side of a pub/sub endpoint.
pub struct FabricSubscriber {
    endpoint: String,
    topic: String,
    receiver: Option<broadcast::Receiver<Frames>>,
    shutdown: watch::Receiver<bool>,
}

impl FabricSubscriber {
    fn new(
        endpoint: &str,
        topic: &str,
        receiver: broadcast::Receiver<Frames>,
        fabric: &FabricInner,
    ) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            topic: topic.to_string(),
            receiver: Some(receiver),
            shutdown: fabric.shutdown_signal.subscribe(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl InboundChannel for FabricSubscriber {
    async fn recv(&mut self) -> Result<Frames, TransportError> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Err(TransportError::Closed);
        };

        loop {
            if *self.shutdown.borrow() {
                return Err(TransportError::Closed);
            }

            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() {
                        return Err(TransportError::Closed);
                    }
                }
                received = receiver.recv() => match received {
                    Ok(frames) if matches_topic(&frames, &self.topic) => return Ok(frames),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(
                            event = FABRIC_SUBSCRIBER_LAGGED,
                            component = COMPONENT,
                            endpoint = self.endpoint.as_str(),
                            topic = self.topic.as_str(),
                            skipped,
                            "subscriber fell behind; oldest messages dropped"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => return Err(TransportError::Closed),
                },
            }
        }
    }

    async fn close(&mut self) {
        self.receiver = None;
    }
}

/// Sending side of a push/pull endpoint.
pub struct FabricPusher {
    endpoint: String,
    sender: mpsc::Sender<Frames>,
    closed: AtomicBool,
    fabric: Arc<FabricInner>,
}

#[async_trait]
impl OutboundChannel for FabricPusher {
    async fn send(&self, frames: Frames) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) || self.fabric.shut_down.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        self.sender.try_send(frames).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => {
                debug!(
                    component = COMPONENT,
                    endpoint = self.endpoint.as_str(),
                    "push queue full"
                );
                TransportError::WouldBlock
            }
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Receiving side of a push/pull endpoint.
pub struct FabricPuller {
    endpoint: String,
    receiver: Option<mpsc::Receiver<Frames>>,
    shutdown: watch::Receiver<bool>,
}

impl FabricPuller {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl InboundChannel for FabricPuller {
    async fn recv(&mut self) -> Result<Frames, TransportError> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Err(TransportError::Closed);
        };
        if *self.shutdown.borrow() {
            return Err(TransportError::Closed);
        }

        tokio::select! {
            _ = self.shutdown.changed() => Err(TransportError::Closed),
            received = receiver.recv() => received.ok_or(TransportError::Closed),
        }
    }

    async fn close(&mut self) {
        self.receiver = None;
    }
}
