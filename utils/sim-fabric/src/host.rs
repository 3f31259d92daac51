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

//! Simulator side of the three client channels.

use crate::fabric::{FabricPublisher, FabricPuller, FabricSubscriber, InMemoryFabric};
use bytes::Bytes;
use serde::Serialize;
use sim_client::{
    ClientConfig, Command, InboundChannel, OutboundChannel, TransportError, VehicleControl,
    COMMAND_TOPIC,
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

const COMPONENT: &str = "simulator_host";
const HOST_UNDECODABLE_COMMAND: &str = "host_undecodable_command";
const HOST_UNDECODABLE_CONTROL: &str = "host_undecodable_control";

/// Binds the endpoints a simulator serves: the data publisher, the command
/// subscriber and the control puller.
pub struct SimulatorHost {
    publisher: FabricPublisher,
    commands: FabricSubscriber,
    controls: FabricPuller,
}

impl SimulatorHost {
    pub async fn bind(fabric: &InMemoryFabric, config: &ClientConfig) -> Result<Self, TransportError> {
        let publisher = fabric.bind_publisher(&config.subscribe_endpoint()).await?;
        let commands = fabric
            .bind_subscriber(&config.command_endpoint(), COMMAND_TOPIC)
            .await?;
        let controls = fabric.bind_puller(&config.control_endpoint()).await?;
        Ok(Self {
            publisher,
            commands,
            controls,
        })
    }

    /// Publishes `[topic, payload]` to every matching subscriber.
    pub async fn publish(&self, topic: &str, payload: impl Into<Bytes>) -> Result<(), TransportError> {
        self.publisher.publish(topic, payload.into()).await
    }

    pub async fn publish_json<T: Serialize>(&self, topic: &str, value: &T) -> Result<(), TransportError> {
        let payload =
            serde_json::to_vec(value).map_err(|err| TransportError::Other(err.to_string()))?;
        self.publish(topic, payload).await
    }

    /// Waits up to `timeout` for the next command. Undecodable commands are
    /// logged and skipped.
    pub async fn recv_command(&mut self, timeout: Duration) -> Result<Option<Command>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            let Some(frames) = recv_until(&mut self.commands, deadline).await? else {
                return Ok(None);
            };
            let Some(body) = frames.last() else {
                continue;
            };
            match serde_json::from_slice::<Command>(body) {
                Ok(command) => return Ok(Some(command)),
                Err(err) => warn!(
                    event = HOST_UNDECODABLE_COMMAND,
                    component = COMPONENT,
                    err = %err,
                    "skipping undecodable command"
                ),
            }
        }
    }

    /// Waits up to `timeout` for the next control sample.
    pub async fn recv_control(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<VehicleControl>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            let Some(frames) = recv_until(&mut self.controls, deadline).await? else {
                return Ok(None);
            };
            let Some(body) = frames.last() else {
                continue;
            };
            match serde_json::from_slice::<VehicleControl>(body) {
                Ok(control) => return Ok(Some(control)),
                Err(err) => warn!(
                    event = HOST_UNDECODABLE_CONTROL,
                    component = COMPONENT,
                    err = %err,
                    "skipping undecodable control"
                ),
            }
        }
    }

    pub async fn close(mut self) {
        self.publisher.close().await;
        self.commands.close().await;
        self.controls.close().await;
    }
}

async fn recv_until(
    inbound: &mut dyn InboundChannel,
    deadline: Instant,
) -> Result<Option<sim_client::Frames>, TransportError> {
    match tokio::time::timeout_at(deadline, inbound.recv()).await {
        Ok(Ok(frames)) => Ok(Some(frames)),
        Ok(Err(err)) => Err(err),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::SimulatorHost;
    use crate::fabric::InMemoryFabric;
    use bytes::Bytes;
    use sim_client::{ClientConfig, OutboundChannel, SimTransport, TransportError};
    use std::time::Duration;

    #[tokio::test]
    async fn host_binding_twice_is_rejected() {
        let fabric = InMemoryFabric::default();
        let config = ClientConfig::default();
        let _host = SimulatorHost::bind(&fabric, &config)
            .await
            .expect("first host should bind");

        assert!(matches!(
            SimulatorHost::bind(&fabric, &config).await,
            Err(TransportError::AddressInUse(_))
        ));
    }

    #[tokio::test]
    async fn recv_command_skips_garbage_and_times_out_quietly() {
        let fabric = InMemoryFabric::default();
        let config = ClientConfig::default();
        let mut host = SimulatorHost::bind(&fabric, &config)
            .await
            .expect("host should bind");
        let publisher = fabric
            .publisher(&config.command_endpoint())
            .await
            .expect("publisher should connect");

        publisher
            .send(vec![
                Bytes::from_static(b"command"),
                Bytes::from_static(b"not json"),
            ])
            .await
            .expect("send should succeed");
        publisher
            .send(vec![
                Bytes::from_static(b"command"),
                Bytes::from_static(br#"{"command":"reset","params":{}}"#),
            ])
            .await
            .expect("send should succeed");

        let command = host
            .recv_command(Duration::from_secs(1))
            .await
            .expect("recv should succeed")
            .expect("command should arrive");
        assert_eq!(command.command, "reset");

        let nothing = host
            .recv_command(Duration::from_millis(20))
            .await
            .expect("recv should succeed");
        assert!(nothing.is_none());
    }

    #[tokio::test]
    async fn recv_control_decodes_pushed_sample() {
        let fabric = InMemoryFabric::default();
        let config = ClientConfig::default();
        let mut host = SimulatorHost::bind(&fabric, &config)
            .await
            .expect("host should bind");
        let pusher = fabric
            .pusher(&config.control_endpoint())
            .await
            .expect("pusher should connect");

        pusher
            .send(vec![Bytes::from_static(
                br#"{"throttle":0.5,"steering":-0.25,"brake":0.0}"#,
            )])
            .await
            .expect("push should succeed");

        let control = host
            .recv_control(Duration::from_secs(1))
            .await
            .expect("recv should succeed")
            .expect("control should arrive");
        assert_eq!(control.throttle, 0.5);
        assert_eq!(control.steering, -0.25);
    }
}
