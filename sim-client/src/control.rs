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

//! Payloads sent from the controller to the simulator.

use crate::error::SendError;
use crate::transport::Frames;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Topic label of every command frame.
pub const COMMAND_TOPIC: &str = "command";

/// Named command broadcast to the simulator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub command: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl Command {
    pub fn new(command: &str, params: Map<String, Value>) -> Self {
        Self {
            command: command.to_string(),
            params,
        }
    }

    /// Encodes as `[COMMAND_TOPIC, json]`.
    pub fn to_frames(&self) -> Result<Frames, SendError> {
        let payload = serde_json::to_vec(self)?;
        Ok(vec![
            Bytes::from_static(COMMAND_TOPIC.as_bytes()),
            Bytes::from(payload),
        ])
    }
}

/// Continuous vehicle control values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleControl {
    /// `0.0..=1.0`
    pub throttle: f64,
    /// `-1.0..=1.0`, negative steers left.
    pub steering: f64,
    /// `0.0..=1.0`
    pub brake: f64,
}

impl VehicleControl {
    /// Builds a control sample, rejecting non-finite or out-of-range values.
    pub fn new(throttle: f64, steering: f64, brake: f64) -> Result<Self, SendError> {
        check_range("throttle", throttle, 0.0, 1.0)?;
        check_range("steering", steering, -1.0, 1.0)?;
        check_range("brake", brake, 0.0, 1.0)?;
        Ok(Self {
            throttle,
            steering,
            brake,
        })
    }

    /// Encodes as a single json frame.
    pub fn to_frames(&self) -> Result<Frames, SendError> {
        Ok(vec![Bytes::from(serde_json::to_vec(self)?)])
    }
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), SendError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(SendError::InvalidControl(format!(
            "{name}={value} outside [{min}, {max}]"
        )))
    }
}
