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

use sim_client::{ClientConfig, Message, SimTransport, SimulatorClient, TopicHandler};
use sim_fabric::{InMemoryFabric, SimulatorHost};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

pub(crate) const POLL_INTERVAL_MS: u64 = 20;
pub(crate) const WAIT: Duration = Duration::from_secs(3);

pub(crate) fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub(crate) fn test_config() -> ClientConfig {
    let mut config = ClientConfig::for_host("sim.test");
    config.connect_settle_ms = 0;
    config.listener.poll_interval_ms = POLL_INTERVAL_MS;
    config
}

#[allow(dead_code)]
pub(crate) struct Harness {
    pub(crate) fabric: InMemoryFabric,
    pub(crate) host: SimulatorHost,
    pub(crate) client: SimulatorClient,
}

pub(crate) async fn make_harness(name: &str, config: ClientConfig) -> Harness {
    let fabric = InMemoryFabric::default();
    let host = SimulatorHost::bind(&fabric, &config)
        .await
        .expect("simulator host should bind");
    let transport: Arc<dyn SimTransport> = Arc::new(fabric.clone());
    let client = SimulatorClient::new(name, config, transport);
    Harness {
        fabric,
        host,
        client,
    }
}

/// Handler that keeps every message it is given.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub(crate) struct Recorder {
    messages: Arc<Mutex<Vec<Message>>>,
}

#[allow(dead_code)]
impl Recorder {
    pub(crate) fn handler(&self) -> Arc<dyn TopicHandler> {
        let messages = self.messages.clone();
        Arc::new(move |message: Message| {
            messages.lock().unwrap().push(message);
        })
    }

    pub(crate) fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    /// Waits until at least `count` messages arrived, returning what was seen.
    pub(crate) async fn wait_for(&self, count: usize) -> Vec<Message> {
        let deadline = Instant::now() + WAIT;
        loop {
            let messages = self.messages();
            if messages.len() >= count || Instant::now() >= deadline {
                return messages;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}
