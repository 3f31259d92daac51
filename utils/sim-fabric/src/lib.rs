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

//! In-memory stand-in for the simulator's socket layer.
//!
//! [`InMemoryFabric`] implements [`sim_client::SimTransport`] and also exposes
//! the binding side used by a simulator. [`SimulatorHost`] wires those
//! bindings together the way a simulator serves a client, and
//! [`VehicleModel`] produces the vehicle stream the sample simulator
//! publishes.

mod fabric;
mod host;
mod vehicle_model;

pub use fabric::{
    matches_topic, FabricPublisher, FabricPuller, FabricPusher, FabricSubscriber, InMemoryFabric,
    DEFAULT_QUEUE_CAPACITY,
};
pub use host::SimulatorHost;
pub use vehicle_model::{VehicleModel, VehicleSnapshot, CAMERA_TOPIC, MAX_SPEED, VEHICLE_TOPIC};
