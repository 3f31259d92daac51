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

//! The client façade: lifecycle, subscriptions and outbound senders.

use crate::config::ClientConfig;
use crate::control::{Command, VehicleControl};
use crate::data_plane::subscription_registry::{
    ListenerBinding, SubscribeOutcome, SubscriptionRegistry,
};
use crate::error::{ConnectError, SendError};
use crate::handler::TopicHandler;
use crate::observability::events;
use crate::transport::{OutboundChannel, SimTransport};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const COMPONENT: &str = "simulator_client";

struct OutboundBindings {
    command: Box<dyn OutboundChannel>,
    control: Box<dyn OutboundChannel>,
}

enum LifecyclePhase {
    Disconnected,
    Connected(OutboundBindings),
    Closed,
}

/// Messaging façade between a controller and a running simulator.
///
/// Topic subscriptions may be registered before or after [`connect`]; each
/// topic gets one listener thread that decodes payloads and hands them to
/// the handler currently bound to the topic. Commands and vehicle controls
/// require a connected client.
///
/// [`close`] is bounded: listeners get `listener.join_timeout_ms` to stop,
/// after which they are abandoned and reported.
///
/// [`connect`]: SimulatorClient::connect
/// [`close`]: SimulatorClient::close
pub struct SimulatorClient {
    name: String,
    config: ClientConfig,
    transport: Arc<dyn SimTransport>,
    phase: Mutex<LifecyclePhase>,
    running: Arc<AtomicBool>,
    connected: AtomicBool,
    closed: AtomicBool,
    registry: SubscriptionRegistry,
}

impl SimulatorClient {
    pub fn new(name: &str, config: ClientConfig, transport: Arc<dyn SimTransport>) -> Self {
        Self {
            name: name.to_string(),
            config,
            transport,
            phase: Mutex::new(LifecyclePhase::Disconnected),
            running: Arc::new(AtomicBool::new(true)),
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            registry: SubscriptionRegistry::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Opens the command publisher and the control pusher.
    ///
    /// Either both bindings are open afterwards or neither is.
    pub async fn connect(&self) -> Result<(), ConnectError> {
        let mut phase = self.phase.lock().await;
        match &*phase {
            LifecyclePhase::Disconnected => {}
            LifecyclePhase::Connected(_) => {
                warn!(
                    event = events::CLIENT_CONNECT_FAILED,
                    component = COMPONENT,
                    client = self.name.as_str(),
                    reason = "already_connected",
                    "connect rejected"
                );
                return Err(ConnectError::AlreadyConnected);
            }
            LifecyclePhase::Closed => {
                warn!(
                    event = events::CLIENT_CONNECT_FAILED,
                    component = COMPONENT,
                    client = self.name.as_str(),
                    reason = "closed",
                    "connect rejected"
                );
                return Err(ConnectError::Closed);
            }
        }

        let command_endpoint = self.config.command_endpoint();
        let command = self
            .transport
            .publisher(&command_endpoint)
            .await
            .map_err(|err| {
                warn!(
                    event = events::CLIENT_CONNECT_FAILED,
                    component = COMPONENT,
                    client = self.name.as_str(),
                    endpoint = command_endpoint.as_str(),
                    err = %err,
                    "unable to open command publisher"
                );
                ConnectError::Transport(err)
            })?;

        let control_endpoint = self.config.control_endpoint();
        let control = match self.transport.pusher(&control_endpoint).await {
            Ok(control) => control,
            Err(err) => {
                command.close().await;
                warn!(
                    event = events::CLIENT_CONNECT_FAILED,
                    component = COMPONENT,
                    client = self.name.as_str(),
                    endpoint = control_endpoint.as_str(),
                    err = %err,
                    "unable to open control pusher; command publisher released"
                );
                return Err(ConnectError::Transport(err));
            }
        };

        let settle = self.config.connect_settle();
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }

        *phase = LifecyclePhase::Connected(OutboundBindings { command, control });
        self.connected.store(true, Ordering::Release);

        info!(
            event = events::CLIENT_CONNECT_OK,
            component = COMPONENT,
            client = self.name.as_str(),
            command_endpoint = command_endpoint.as_str(),
            control_endpoint = control_endpoint.as_str(),
            "connected to simulator"
        );
        Ok(())
    }

    /// Delivers every message published on `topic` to `handler`.
    ///
    /// Subscribing again to a topic swaps the handler in place; the next
    /// message goes to the new handler and no second listener is started.
    pub async fn subscribe(
        &self,
        topic: &str,
        handler: Arc<dyn TopicHandler>,
    ) -> Result<SubscribeOutcome, ConnectError> {
        // The phase lock only guards the check; a close racing the bind is
        // caught by the registry, which refuses subscriptions once drained.
        let closed = matches!(*self.phase.lock().await, LifecyclePhase::Closed);
        if closed {
            warn!(
                event = events::SUBSCRIBE_FAILED,
                component = COMPONENT,
                client = self.name.as_str(),
                topic,
                reason = "closed",
                "subscribe rejected"
            );
            return Err(ConnectError::Closed);
        }

        let endpoint = self.config.subscribe_endpoint();
        self.registry
            .subscribe(
                topic,
                handler,
                ListenerBinding {
                    transport: self.transport.as_ref(),
                    endpoint: &endpoint,
                    running: self.running.clone(),
                    poll_interval: self.config.listener.poll_interval(),
                },
            )
            .await
    }

    /// Broadcasts `{"command": name, "params": params}` on the command channel.
    pub async fn send_command(
        &self,
        command: &str,
        params: Map<String, Value>,
    ) -> Result<(), SendError> {
        let frames = Command::new(command, params).to_frames()?;

        let phase = self.phase.lock().await;
        let result = match &*phase {
            LifecyclePhase::Connected(bindings) => bindings
                .command
                .send(frames)
                .await
                .map_err(SendError::Transport),
            LifecyclePhase::Disconnected => Err(SendError::NotConnected),
            LifecyclePhase::Closed => Err(SendError::Closed),
        };
        drop(phase);

        match &result {
            Ok(()) => debug!(
                event = events::COMMAND_SEND_OK,
                component = COMPONENT,
                client = self.name.as_str(),
                command,
                "command sent"
            ),
            Err(err) => warn!(
                event = events::COMMAND_SEND_FAILED,
                component = COMPONENT,
                client = self.name.as_str(),
                command,
                err = %err,
                "unable to send command"
            ),
        }
        result
    }

    /// Pushes one control sample to the simulator.
    ///
    /// Out-of-range values are rejected, not clamped.
    pub async fn send_vehicle_control(
        &self,
        throttle: f64,
        steering: f64,
        brake: f64,
    ) -> Result<(), SendError> {
        let result = match VehicleControl::new(throttle, steering, brake) {
            Ok(control) => self.push_control(control).await,
            Err(err) => Err(err),
        };

        match &result {
            Ok(()) => debug!(
                event = events::CONTROL_SEND_OK,
                component = COMPONENT,
                client = self.name.as_str(),
                throttle,
                steering,
                brake,
                "vehicle control sent"
            ),
            Err(err) => warn!(
                event = events::CONTROL_SEND_FAILED,
                component = COMPONENT,
                client = self.name.as_str(),
                throttle,
                steering,
                brake,
                err = %err,
                "unable to send vehicle control"
            ),
        }
        result
    }

    async fn push_control(&self, control: VehicleControl) -> Result<(), SendError> {
        let frames = control.to_frames()?;
        let phase = self.phase.lock().await;
        match &*phase {
            LifecyclePhase::Connected(bindings) => bindings
                .control
                .send(frames)
                .await
                .map_err(SendError::Transport),
            LifecyclePhase::Disconnected => Err(SendError::NotConnected),
            LifecyclePhase::Closed => Err(SendError::Closed),
        }
    }

    /// Stops every listener and releases every binding.
    ///
    /// Never fails and never waits longer than the join bound for listeners.
    /// The client is unusable afterwards, even if it never connected.
    /// Closing twice does nothing.
    pub async fn close(&self) {
        let mut phase = self.phase.lock().await;
        if matches!(*phase, LifecyclePhase::Closed) {
            debug!(
                event = events::CLIENT_CLOSE_SKIPPED,
                component = COMPONENT,
                client = self.name.as_str(),
                reason = "already_closed",
                "close skipped"
            );
            return;
        }

        info!(
            event = events::CLIENT_CLOSE_START,
            component = COMPONENT,
            client = self.name.as_str(),
            "closing simulator client"
        );

        self.running.store(false, Ordering::Release);
        let summary = self
            .registry
            .shutdown(self.config.listener.join_timeout())
            .await;

        if let LifecyclePhase::Connected(bindings) =
            std::mem::replace(&mut *phase, LifecyclePhase::Closed)
        {
            bindings.command.close().await;
            bindings.control.close().await;
        }
        self.transport.shutdown().await;

        self.connected.store(false, Ordering::Release);
        self.closed.store(true, Ordering::Release);

        info!(
            event = events::CLIENT_CLOSE_OK,
            component = COMPONENT,
            client = self.name.as_str(),
            listeners_joined = summary.joined.len(),
            listeners_abandoned = summary.abandoned.len(),
            listeners_lost = summary.lost.len(),
            "simulator client closed"
        );
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub async fn is_subscribed(&self, topic: &str) -> bool {
        self.registry.contains(topic).await
    }

    /// Sorted snapshot of the subscribed topics.
    pub async fn subscribed_topics(&self) -> Vec<String> {
        self.registry.topics().await
    }
}

impl Drop for SimulatorClient {
    fn drop(&mut self) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        self.running.store(false, Ordering::Release);
        let listeners = self.registry.cancel_all();
        if listeners > 0 || self.connected.load(Ordering::Acquire) {
            warn!(
                event = events::CLIENT_DROPPED_OPEN,
                component = COMPONENT,
                client = self.name.as_str(),
                listeners,
                "client dropped without close; listeners signalled to stop"
            );
        }
    }
}
