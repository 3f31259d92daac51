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

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_SUBSCRIBE_PORT: u16 = 5555;
pub const DEFAULT_COMMAND_PORT: u16 = 5556;
pub const DEFAULT_CONTROL_PORT: u16 = 5557;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_CONNECT_SETTLE_MS: u64 = 100;

/// Client settings, usually loaded from a json5 file.
///
/// ```
/// use sim_client::ClientConfig;
///
/// let config = ClientConfig::from_json5_str(
///     r#"{ host: "10.0.0.7", listener: { poll_interval_ms: 50 } }"#,
/// )
/// .unwrap();
///
/// assert_eq!(config.subscribe_endpoint(), "tcp://10.0.0.7:5555");
/// assert_eq!(config.listener.join_timeout_ms, 1000);
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub endpoints: EndpointConfig,
    #[serde(default)]
    pub listener: ListenerConfig,
    /// Pause after the outbound bindings are opened, giving the fabric time
    /// to finish the handshake before the first send.
    #[serde(default = "default_connect_settle_ms")]
    pub connect_settle_ms: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    #[serde(default = "default_subscribe_port")]
    pub subscribe_port: u16,
    #[serde(default = "default_command_port")]
    pub command_port: u16,
    #[serde(default = "default_control_port")]
    pub control_port: u16,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ListenerConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_subscribe_port() -> u16 {
    DEFAULT_SUBSCRIBE_PORT
}

fn default_command_port() -> u16 {
    DEFAULT_COMMAND_PORT
}

fn default_control_port() -> u16 {
    DEFAULT_CONTROL_PORT
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_join_timeout_ms() -> u64 {
    DEFAULT_JOIN_TIMEOUT_MS
}

fn default_connect_settle_ms() -> u64 {
    DEFAULT_CONNECT_SETTLE_MS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            endpoints: EndpointConfig::default(),
            listener: ListenerConfig::default(),
            connect_settle_ms: DEFAULT_CONNECT_SETTLE_MS,
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            subscribe_port: DEFAULT_SUBSCRIBE_PORT,
            command_port: DEFAULT_COMMAND_PORT,
            control_port: DEFAULT_CONTROL_PORT,
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
        }
    }
}

impl ListenerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

impl ClientConfig {
    /// Default settings pointed at `host`.
    pub fn for_host(host: &str) -> Self {
        Self {
            host: host.to_string(),
            ..Default::default()
        }
    }

    pub fn from_json5_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = json5::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json5_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }

        let EndpointConfig {
            subscribe_port,
            command_port,
            control_port,
        } = self.endpoints;
        if subscribe_port == command_port
            || subscribe_port == control_port
            || command_port == control_port
        {
            return Err(ConfigError::Invalid(format!(
                "endpoint ports must be distinct: subscribe={subscribe_port} \
                 command={command_port} control={control_port}"
            )));
        }

        if self.listener.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "listener.poll_interval_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Endpoint the simulator publishes topic data on.
    pub fn subscribe_endpoint(&self) -> String {
        self.endpoint(self.endpoints.subscribe_port)
    }

    /// Endpoint commands are broadcast to.
    pub fn command_endpoint(&self) -> String {
        self.endpoint(self.endpoints.command_port)
    }

    /// Endpoint vehicle controls are pushed to.
    pub fn control_endpoint(&self) -> String {
        self.endpoint(self.endpoints.control_port)
    }

    pub fn connect_settle(&self) -> Duration {
        Duration::from_millis(self.connect_settle_ms)
    }

    fn endpoint(&self, port: u16) -> String {
        format!("tcp://{}:{port}", self.host)
    }
}
