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

//! Topic subscription registry and listener lifecycle management.

use crate::data_plane::topic_listener::{
    new_handler_slot, CancellationToken, HandlerSlot, TopicListener,
};
use crate::error::ConnectError;
use crate::handler::TopicHandler;
use crate::observability::{events, fields};
use crate::runtime::listener_runtime::{
    spawn_listener_loop, ListenerJoin, ListenerLoopHandle, DEFAULT_LISTENER_RUNTIME_THREAD_NAME,
};
use crate::transport::{InboundChannel, SimTransport};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

const COMPONENT: &str = "subscription_registry";
const LISTENER_THREAD_NAME_PREFIX: &str = "sim-topic-";
const LISTENER_THREAD_NAME_MAX_LEN: usize = 15;

/// How a subscribe call was satisfied.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubscribeOutcome {
    /// A new listener was started for the topic.
    Started,
    /// The topic already had a listener; only its handler was replaced.
    HandlerReplaced,
}

/// Everything a new listener needs besides its topic and handler.
pub(crate) struct ListenerBinding<'a> {
    pub(crate) transport: &'a dyn SimTransport,
    pub(crate) endpoint: &'a str,
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) poll_interval: Duration,
}

struct TopicSubscription {
    listener_id: String,
    handler: HandlerSlot,
    cancellation: CancellationToken,
    worker: ListenerLoopHandle<Box<dyn InboundChannel>>,
}

/// Outcome of tearing down every listener.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct ShutdownSummary {
    pub(crate) joined: Vec<String>,
    pub(crate) abandoned: Vec<String>,
    pub(crate) lost: Vec<String>,
}

#[derive(Default)]
struct RegistryState {
    subscriptions: HashMap<String, TopicSubscription>,
    shut_down: bool,
}

/// Topic -> listener map. At most one listener per topic.
///
/// Once shut down the registry refuses new subscriptions, so a subscribe
/// racing a shutdown either lands before the drain or fails.
pub(crate) struct SubscriptionRegistry {
    state: Mutex<RegistryState>,
}

impl SubscriptionRegistry {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Binds `handler` to `topic`, starting a listener on first use.
    ///
    /// The map stays locked across the channel binding so two concurrent
    /// subscribes to one topic cannot both start a listener.
    pub(crate) async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn TopicHandler>,
        binding: ListenerBinding<'_>,
    ) -> Result<SubscribeOutcome, ConnectError> {
        let mut state = self.state.lock().await;
        if state.shut_down {
            warn!(
                event = events::SUBSCRIBE_FAILED,
                component = COMPONENT,
                topic,
                reason = fields::REASON_SHUTTING_DOWN,
                "registry already shut down"
            );
            return Err(ConnectError::Closed);
        }

        if let Some(existing) = state.subscriptions.get(topic) {
            existing.handler.store(Arc::new(handler));
            info!(
                event = events::SUBSCRIBE_HANDLER_REPLACED,
                component = COMPONENT,
                topic,
                listener_id = existing.listener_id.as_str(),
                "replaced handler of existing subscription"
            );
            return Ok(SubscribeOutcome::HandlerReplaced);
        }

        debug!(
            event = events::SUBSCRIBE_START,
            component = COMPONENT,
            topic,
            endpoint = binding.endpoint,
            "binding inbound channel"
        );

        let inbound = binding
            .transport
            .subscribe(binding.endpoint, topic)
            .await
            .map_err(|err| {
                warn!(
                    event = events::SUBSCRIBE_FAILED,
                    component = COMPONENT,
                    topic,
                    endpoint = binding.endpoint,
                    err = %err,
                    "unable to bind inbound channel"
                );
                ConnectError::Transport(err)
            })?;

        let listener_id = Uuid::new_v4().simple().to_string();
        let thread_name = Self::build_listener_thread_name(&listener_id);
        let handler = new_handler_slot(handler);
        let cancellation = CancellationToken::new();
        let listener = TopicListener::new(
            topic,
            &listener_id,
            inbound,
            handler.clone(),
            cancellation.clone(),
            binding.running,
            binding.poll_interval,
        );

        let worker = spawn_listener_loop(thread_name, move || listener.run()).map_err(|err| {
            warn!(
                event = events::SUBSCRIBE_FAILED,
                component = COMPONENT,
                topic,
                endpoint = binding.endpoint,
                err = %err,
                "unable to start topic listener"
            );
            ConnectError::ListenerSpawn(err.to_string())
        })?;

        info!(
            event = events::SUBSCRIBE_OK,
            component = COMPONENT,
            topic,
            listener_id = listener_id.as_str(),
            listener_thread = worker.thread_name(),
            "subscribed to topic"
        );

        state.subscriptions.insert(
            topic.to_string(),
            TopicSubscription {
                listener_id,
                handler,
                cancellation,
                worker,
            },
        );
        Ok(SubscribeOutcome::Started)
    }

    /// Sorted snapshot of the subscribed topics.
    pub(crate) async fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self
            .state
            .lock()
            .await
            .subscriptions
            .keys()
            .cloned()
            .collect();
        topics.sort();
        topics
    }

    pub(crate) async fn len(&self) -> usize {
        self.state.lock().await.subscriptions.len()
    }

    pub(crate) async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub(crate) async fn contains(&self, topic: &str) -> bool {
        self.state.lock().await.subscriptions.contains_key(topic)
    }

    /// Signals every listener to stop without waiting for it.
    ///
    /// Needs exclusive access, so it is usable from `Drop`.
    pub(crate) fn cancel_all(&mut self) -> usize {
        let state = self.state.get_mut();
        state.shut_down = true;
        for subscription in state.subscriptions.values() {
            subscription.cancellation.cancel();
        }
        state.subscriptions.len()
    }

    /// Cancels, joins and releases every listener, then refuses new ones.
    ///
    /// All listeners are awaited concurrently, each for at most
    /// `join_timeout`. Inbound channels are closed only for listeners that
    /// returned them; a listener that missed the bound keeps its channel until
    /// it exits on its own.
    pub(crate) async fn shutdown(&self, join_timeout: Duration) -> ShutdownSummary {
        let drained: Vec<(String, TopicSubscription)> = {
            let mut state = self.state.lock().await;
            state.shut_down = true;
            state.subscriptions.drain().collect()
        };

        info!(
            event = events::REGISTRY_SHUTDOWN_START,
            component = COMPONENT,
            listeners = drained.len(),
            "stopping topic listeners"
        );

        for (_, subscription) in &drained {
            subscription.cancellation.cancel();
        }

        let joins = drained.into_iter().map(|(topic, subscription)| async move {
            let TopicSubscription {
                listener_id,
                worker,
                ..
            } = subscription;
            let outcome = worker.join(join_timeout).await;
            (topic, listener_id, outcome)
        });
        let outcomes = futures::future::join_all(joins).await;

        let mut summary = ShutdownSummary::default();
        let mut released = Vec::new();
        for (topic, listener_id, outcome) in outcomes {
            match outcome {
                ListenerJoin::Finished(inbound) => {
                    debug!(
                        event = events::LISTENER_JOIN_OK,
                        component = COMPONENT,
                        topic = topic.as_str(),
                        listener_id = listener_id.as_str(),
                        "listener stopped"
                    );
                    released.push(inbound);
                    summary.joined.push(topic);
                }
                ListenerJoin::TimedOut => {
                    warn!(
                        event = events::LISTENER_JOIN_ABANDONED,
                        component = COMPONENT,
                        topic = topic.as_str(),
                        listener_id = listener_id.as_str(),
                        reason = fields::REASON_JOIN_TIMEOUT,
                        timeout_ms = join_timeout.as_millis() as u64,
                        "listener did not stop in time; abandoning it"
                    );
                    summary.abandoned.push(topic);
                }
                ListenerJoin::Lost => {
                    warn!(
                        event = events::LISTENER_JOIN_LOST,
                        component = COMPONENT,
                        topic = topic.as_str(),
                        listener_id = listener_id.as_str(),
                        "listener thread exited without returning its channel"
                    );
                    summary.lost.push(topic);
                }
            }
        }

        for mut inbound in released {
            inbound.close().await;
        }

        info!(
            event = events::REGISTRY_SHUTDOWN_OK,
            component = COMPONENT,
            joined = summary.joined.len(),
            abandoned = summary.abandoned.len(),
            lost = summary.lost.len(),
            "topic listeners stopped"
        );
        summary
    }

    fn build_listener_thread_name(listener_id: &str) -> String {
        let suffix_len = LISTENER_THREAD_NAME_MAX_LEN - LISTENER_THREAD_NAME_PREFIX.len();
        let suffix: String = listener_id
            .chars()
            .filter(|ch| ch.is_ascii_hexdigit())
            .take(suffix_len)
            .collect();

        if suffix.len() == suffix_len {
            format!("{LISTENER_THREAD_NAME_PREFIX}{suffix}")
        } else {
            DEFAULT_LISTENER_RUNTIME_THREAD_NAME.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ListenerBinding, SubscribeOutcome, SubscriptionRegistry, LISTENER_THREAD_NAME_MAX_LEN,
        LISTENER_THREAD_NAME_PREFIX,
    };
    use crate::data_plane::topic_listener::tests::{published, ScriptedInbound};
    use crate::error::{ConnectError, TransportError};
    use crate::handler::TopicHandler;
    use crate::message::Message;
    use crate::runtime::listener_runtime::DEFAULT_LISTENER_RUNTIME_THREAD_NAME;
    use crate::transport::{Frames, InboundChannel, OutboundChannel, SimTransport};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};
    use tokio::sync::mpsc::UnboundedSender;

    type Feeds = Arc<Mutex<HashMap<String, UnboundedSender<Result<Frames, TransportError>>>>>;

    /// Transport whose subscriptions are fed by the test.
    #[derive(Default)]
    struct FeedTransport {
        feeds: Feeds,
        closed_flags: Mutex<Vec<Arc<AtomicBool>>>,
        subscribe_calls: AtomicUsize,
        refuse: AtomicBool,
    }

    impl FeedTransport {
        fn feed(&self, topic: &str, payload: &[u8]) {
            let feeds = self.feeds.lock().unwrap();
            feeds
                .get(topic)
                .expect("topic should be subscribed")
                .send(Ok(published(topic, payload)))
                .expect("listener should hold the channel");
        }

        fn closed_count(&self) -> usize {
            self.closed_flags
                .lock()
                .unwrap()
                .iter()
                .filter(|flag| flag.load(Ordering::Acquire))
                .count()
        }
    }

    #[async_trait]
    impl SimTransport for FeedTransport {
        async fn subscribe(
            &self,
            _endpoint: &str,
            topic: &str,
        ) -> Result<Box<dyn InboundChannel>, TransportError> {
            self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
            // Gives concurrent subscribers a chance to interleave with the bind.
            tokio::task::yield_now().await;
            if self.refuse.load(Ordering::Acquire) {
                return Err(TransportError::Unavailable("refused".to_string()));
            }
            let (sender, inbound) = ScriptedInbound::new();
            self.closed_flags.lock().unwrap().push(inbound.closed.clone());
            self.feeds.lock().unwrap().insert(topic.to_string(), sender);
            Ok(Box::new(inbound))
        }

        async fn publisher(
            &self,
            _endpoint: &str,
        ) -> Result<Box<dyn OutboundChannel>, TransportError> {
            Err(TransportError::Other("not used by registry tests".to_string()))
        }

        async fn pusher(&self, _endpoint: &str) -> Result<Box<dyn OutboundChannel>, TransportError> {
            Err(TransportError::Other("not used by registry tests".to_string()))
        }

        async fn shutdown(&self) {}
    }

    fn binding(transport: &FeedTransport) -> ListenerBinding<'_> {
        ListenerBinding {
            transport,
            endpoint: "tcp://localhost:5555",
            running: Arc::new(AtomicBool::new(true)),
            poll_interval: Duration::from_millis(10),
        }
    }

    fn channel_handler() -> (
        std::sync::mpsc::Receiver<Message>,
        Arc<dyn TopicHandler>,
    ) {
        let (sender, receiver) = std::sync::mpsc::channel();
        let sender = Mutex::new(sender);
        let handler: Arc<dyn TopicHandler> = Arc::new(move |message: Message| {
            let _ = sender.lock().unwrap().send(message);
        });
        (receiver, handler)
    }

    #[tokio::test]
    async fn resubscribe_replaces_handler_without_new_listener() {
        let transport = FeedTransport::default();
        let registry = SubscriptionRegistry::new();
        let (first_rx, first) = channel_handler();
        let (second_rx, second) = channel_handler();

        let outcome = registry
            .subscribe("vehicle", first, binding(&transport))
            .await
            .expect("first subscribe should succeed");
        assert_eq!(outcome, SubscribeOutcome::Started);

        let outcome = registry
            .subscribe("vehicle", second, binding(&transport))
            .await
            .expect("second subscribe should succeed");
        assert_eq!(outcome, SubscribeOutcome::HandlerReplaced);
        assert_eq!(transport.subscribe_calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len().await, 1);

        transport.feed("vehicle", br#"{"speed":5}"#);
        let delivered = second_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("second handler should receive the message");
        assert_eq!(delivered.get("speed"), Some(serde_json::json!(5)));
        assert!(first_rx.try_recv().is_err());

        registry.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn failed_binding_records_nothing() {
        let transport = FeedTransport::default();
        transport.refuse.store(true, Ordering::Release);
        let registry = SubscriptionRegistry::new();
        let (_rx, handler) = channel_handler();

        let err = registry
            .subscribe("camera", handler, binding(&transport))
            .await
            .expect_err("refused binding should fail");

        assert!(matches!(err, ConnectError::Transport(_)));
        assert!(!registry.contains("camera").await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn shutdown_joins_and_releases_every_listener() {
        let transport = FeedTransport::default();
        let registry = SubscriptionRegistry::new();
        for topic in ["camera", "vehicle", "lidar"] {
            let (_rx, handler) = channel_handler();
            registry
                .subscribe(topic, handler, binding(&transport))
                .await
                .expect("subscribe should succeed");
        }
        assert_eq!(registry.topics().await, vec!["camera", "lidar", "vehicle"]);

        let started = Instant::now();
        let summary = registry.shutdown(Duration::from_secs(1)).await;

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(summary.joined.len(), 3);
        assert!(summary.abandoned.is_empty());
        assert_eq!(transport.closed_count(), 3);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn shutdown_abandons_listener_stuck_in_handler() {
        let transport = FeedTransport::default();
        let registry = SubscriptionRegistry::new();
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let entered_tx = Mutex::new(entered_tx);
        let handler: Arc<dyn TopicHandler> = Arc::new(move |_message: Message| {
            let _ = entered_tx.lock().unwrap().send(());
            std::thread::sleep(Duration::from_millis(500));
        });
        registry
            .subscribe("camera", handler, binding(&transport))
            .await
            .expect("subscribe should succeed");
        transport.feed("camera", b"\xff\xd8");
        entered_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("handler should start");

        let started = Instant::now();
        let summary = registry.shutdown(Duration::from_millis(50)).await;

        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(summary.abandoned, vec!["camera".to_string()]);
        assert_eq!(transport.closed_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_subscribes_start_a_single_listener() {
        let transport = Arc::new(FeedTransport::default());
        let registry = Arc::new(SubscriptionRegistry::new());

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let transport = transport.clone();
                let registry = registry.clone();
                let (_rx, handler) = channel_handler();
                tokio::spawn(async move {
                    registry
                        .subscribe("vehicle", handler, binding(&transport))
                        .await
                })
            })
            .collect();

        let mut started = 0;
        for task in tasks {
            let outcome = task
                .await
                .expect("subscribe task should not panic")
                .expect("subscribe should succeed");
            if outcome == SubscribeOutcome::Started {
                started += 1;
            }
        }

        assert_eq!(started, 1);
        assert_eq!(transport.subscribe_calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len().await, 1);

        registry.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn subscribe_after_shutdown_is_refused() {
        let transport = FeedTransport::default();
        let registry = SubscriptionRegistry::new();
        registry.shutdown(Duration::from_millis(100)).await;
        let (_rx, handler) = channel_handler();

        let err = registry
            .subscribe("vehicle", handler, binding(&transport))
            .await
            .expect_err("shut down registry should refuse subscribe");

        assert!(matches!(err, ConnectError::Closed));
        assert_eq!(transport.subscribe_calls.load(Ordering::SeqCst), 0);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn cancel_all_stops_listeners_and_refuses_new_subscriptions() {
        let transport = FeedTransport::default();
        let mut registry = SubscriptionRegistry::new();
        let (_rx, handler) = channel_handler();
        registry
            .subscribe("vehicle", handler, binding(&transport))
            .await
            .expect("subscribe should succeed");

        assert_eq!(registry.cancel_all(), 1);

        let (_rx, handler) = channel_handler();
        assert!(matches!(
            registry
                .subscribe("camera", handler, binding(&transport))
                .await,
            Err(ConnectError::Closed)
        ));
        let summary = registry.shutdown(Duration::from_secs(1)).await;
        assert_eq!(summary.joined, vec!["vehicle".to_string()]);
    }

    #[test]
    fn listener_thread_name_keeps_prefix_and_linux_safe_length() {
        let thread_name =
            SubscriptionRegistry::build_listener_thread_name("abcdef0123456789abcdef");

        assert!(thread_name.starts_with(LISTENER_THREAD_NAME_PREFIX));
        assert_eq!(thread_name.len(), LISTENER_THREAD_NAME_MAX_LEN);
    }

    #[test]
    fn listener_thread_name_uses_fallback_for_short_ids() {
        assert_eq!(
            SubscriptionRegistry::build_listener_thread_name("zz"),
            DEFAULT_LISTENER_RUNTIME_THREAD_NAME
        );
    }
}
