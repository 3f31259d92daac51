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

//! Toy vehicle kinematics driven by pushed controls.

use serde::Serialize;
use sim_client::{Command, VehicleControl};

/// Topic the vehicle state is published on.
pub const VEHICLE_TOPIC: &str = "vehicle";
/// Topic the placeholder camera frame is published on.
pub const CAMERA_TOPIC: &str = "camera";

pub const MAX_SPEED: f64 = 10.0;
const THROTTLE_GAIN: f64 = 0.1;
const BRAKE_GAIN: f64 = 0.2;
const STEERING_GAIN: f64 = 0.05;
const FORWARD_GAIN: f64 = 0.1;

/// State published on [`VEHICLE_TOPIC`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VehicleSnapshot {
    pub position: [f64; 3],
    pub speed: f64,
    pub throttle: f64,
    pub steering: f64,
    pub brake: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VehicleModel {
    control: Option<VehicleControl>,
    position_x: f64,
    position_y: f64,
    speed: f64,
}

impl VehicleModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_control(&mut self, control: VehicleControl) {
        self.control = Some(control);
    }

    /// Applies a command; returns whether it changed the model.
    ///
    /// Any command whose name mentions `reset` resets the vehicle.
    pub fn apply_command(&mut self, command: &Command) -> bool {
        if command.command.contains("reset") {
            self.reset();
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advances one simulation step.
    pub fn step(&mut self) {
        let (throttle, steering, brake) = self.controls();
        if throttle > 0.0 {
            self.speed += throttle * THROTTLE_GAIN;
        }
        if brake > 0.0 {
            self.speed -= brake * BRAKE_GAIN;
        }
        self.speed = self.speed.clamp(0.0, MAX_SPEED);

        self.position_x += self.speed * steering * STEERING_GAIN;
        self.position_y += self.speed * FORWARD_GAIN;
    }

    pub fn snapshot(&self) -> VehicleSnapshot {
        let (throttle, steering, brake) = self.controls();
        VehicleSnapshot {
            position: [self.position_x, self.position_y, 0.0],
            speed: self.speed,
            throttle,
            steering,
            brake,
        }
    }

    fn controls(&self) -> (f64, f64, f64) {
        self.control
            .map(|control| (control.throttle, control.steering, control.brake))
            .unwrap_or_default()
    }
}
