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

use clap::Parser;
use serde_json::Map;
use sim_client::{ClientConfig, Message, SimTransport, SimulatorClient, TopicHandler};
use sim_fabric::{InMemoryFabric, SimulatorHost, VehicleModel, CAMERA_TOPIC, VEHICLE_TOPIC};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SIMULATION_STEP: Duration = Duration::from_millis(100);
const CAMERA_PLACEHOLDER: &str =
    "Simulated camera data (would be binary image data in a real scenario)";

#[derive(Parser)]
#[command(about = "Drives a sim-client against an embedded simulator host")]
struct ClientArgs {
    /// json5 client config; defaults apply when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,
    /// Overrides the simulator host from the config.
    #[arg(long)]
    host: Option<String>,
    /// Seconds to run before closing; 0 waits for ctrl-c.
    #[arg(long, default_value_t = 5)]
    run_secs: u64,
    /// Per-endpoint queue depth of the embedded fabric.
    #[arg(long, default_value_t = sim_fabric::DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    let args = ClientArgs::parse();

    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    if let Some(host) = args.host {
        config.host = host;
        config.validate()?;
    }

    info!(
        host = config.host.as_str(),
        subscribe_endpoint = config.subscribe_endpoint().as_str(),
        "Started sim-linux-client"
    );

    let fabric = InMemoryFabric::new(args.queue_capacity);
    let host = SimulatorHost::bind(&fabric, &config).await?;
    let (stop_tx, stop_rx) = oneshot::channel();
    let simulator = tokio::spawn(run_simulator(host, stop_rx));

    let transport: Arc<dyn SimTransport> = Arc::new(fabric);
    let client = SimulatorClient::new("sim-linux-client", config, transport);

    let on_vehicle: Arc<dyn TopicHandler> = Arc::new(|message: Message| {
        info!(
            topic = VEHICLE_TOPIC,
            state = %message.to_value(),
            "vehicle update"
        );
    });
    let on_camera: Arc<dyn TopicHandler> = Arc::new(|message: Message| {
        let len = message.raw_data().map_or(0, |raw| raw.len());
        info!(topic = CAMERA_TOPIC, bytes = len, "camera frame");
    });

    client.subscribe(VEHICLE_TOPIC, on_vehicle).await?;
    client.subscribe(CAMERA_TOPIC, on_camera).await?;
    client.connect().await?;

    client.send_command("reset_simulation", Map::new()).await?;
    client.send_vehicle_control(0.5, 0.0, 0.0).await?;

    if args.run_secs == 0 {
        tokio::signal::ctrl_c().await?;
    } else {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(args.run_secs)) => {}
            signal = tokio::signal::ctrl_c() => signal?,
        }
    }

    client.close().await;
    let _ = stop_tx.send(());
    if let Err(err) = simulator.await {
        warn!(err = %err, "simulator task failed");
    }

    info!("sim-linux-client stopped");
    Ok(())
}

/// Steps the vehicle model and publishes its state until told to stop.
async fn run_simulator(mut host: SimulatorHost, mut stop: oneshot::Receiver<()>) {
    let mut model = VehicleModel::new();
    let mut ticker = tokio::time::interval(SIMULATION_STEP);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {}
        }

        while let Ok(Some(command)) = host.recv_command(Duration::ZERO).await {
            if model.apply_command(&command) {
                info!(command = command.command.as_str(), "simulation reset");
            }
        }
        while let Ok(Some(control)) = host.recv_control(Duration::ZERO).await {
            model.apply_control(control);
        }

        model.step();
        // The client side may already be gone; publishing is best effort.
        if host
            .publish_json(VEHICLE_TOPIC, &model.snapshot())
            .await
            .is_err()
            || host.publish(CAMERA_TOPIC, CAMERA_PLACEHOLDER).await.is_err()
        {
            break;
        }
    }

    host.close().await;
}
