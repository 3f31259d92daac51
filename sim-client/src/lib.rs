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

//! # sim-client
//!
//! `sim-client` is the controller-side messaging façade for a real-time
//! simulator. It broadcasts named commands, pushes vehicle control samples
//! and delivers every subscribed topic to its own handler.
//!
//! Sockets and wire framing stay outside the crate: the client talks to a
//! [`SimTransport`], which hands out topic-filtered inbound channels and
//! outbound publisher/pusher channels. The `sim-fabric` crate provides an
//! in-memory implementation together with a simulator-side host.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use serde_json::Map;
//! use sim_client::{ClientConfig, Message, SimTransport, SimulatorClient, TopicHandler};
//! use sim_fabric::{InMemoryFabric, SimulatorHost};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let fabric = InMemoryFabric::default();
//! let config = ClientConfig::default();
//! let mut host = SimulatorHost::bind(&fabric, &config).await.unwrap();
//!
//! let transport: Arc<dyn SimTransport> = Arc::new(fabric.clone());
//! let client = SimulatorClient::new("quick-start", config, transport);
//! client.connect().await.unwrap();
//!
//! let (seen_tx, seen_rx) = std::sync::mpsc::channel();
//! let seen_tx = std::sync::Mutex::new(seen_tx);
//! let on_vehicle: Arc<dyn TopicHandler> = Arc::new(move |message: Message| {
//!     let _ = seen_tx.lock().unwrap().send(message.get("speed"));
//! });
//! client.subscribe("vehicle", on_vehicle).await.unwrap();
//!
//! host.publish("vehicle", r#"{"speed": 10}"#).await.unwrap();
//! let speed = seen_rx.recv_timeout(Duration::from_secs(2)).unwrap();
//! assert_eq!(speed, Some(serde_json::json!(10)));
//!
//! client.send_command("reset_simulation", Map::new()).await.unwrap();
//! let command = host.recv_command(Duration::from_secs(1)).await.unwrap();
//! assert_eq!(command.map(|command| command.command), Some("reset_simulation".to_string()));
//!
//! client.close().await;
//! # });
//! ```
//!
//! ## Layout
//!
//! - `data_plane::subscription_registry`: topic to listener map, handler
//!   replacement, bounded shutdown.
//! - `data_plane::topic_listener`: per-topic poll/decode/dispatch loop.
//! - `runtime::listener_runtime`: one named thread with a current-thread
//!   Tokio runtime per listener.
//! - [`message`]: payload decoding into [`Message`].
//! - [`client`]: connect/close lifecycle and the outbound senders.
//!
//! ## Observability
//!
//! The crate emits `tracing` events with a stable `event` name and a
//! `component` field; see `observability::events`. No subscriber is
//! installed by the library.

pub mod client;
pub mod config;
pub mod control;
mod data_plane;
pub mod error;
pub mod handler;
pub mod message;
#[doc(hidden)]
pub mod observability;
mod runtime;
pub mod transport;

pub use client::SimulatorClient;
pub use config::{ClientConfig, EndpointConfig, ListenerConfig};
pub use control::{Command, VehicleControl, COMMAND_TOPIC};
pub use data_plane::subscription_registry::SubscribeOutcome;
pub use error::{ConfigError, ConnectError, SendError, TransportError};
pub use handler::TopicHandler;
pub use message::{decode, Message, RAW_DATA_KEY};
pub use transport::{Frames, InboundChannel, OutboundChannel, SimTransport};
