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

//! Canonical structured event names used across `sim-client`.

// Lifecycle events.
pub const CLIENT_CONNECT_OK: &str = "client_connect_ok";
pub const CLIENT_CONNECT_FAILED: &str = "client_connect_failed";
pub const CLIENT_CLOSE_START: &str = "client_close_start";
pub const CLIENT_CLOSE_OK: &str = "client_close_ok";
pub const CLIENT_CLOSE_SKIPPED: &str = "client_close_skipped";
pub const CLIENT_DROPPED_OPEN: &str = "client_dropped_open";

// Outbound sender events.
pub const COMMAND_SEND_OK: &str = "command_send_ok";
pub const COMMAND_SEND_FAILED: &str = "command_send_failed";
pub const CONTROL_SEND_OK: &str = "control_send_ok";
pub const CONTROL_SEND_FAILED: &str = "control_send_failed";

// Subscription registry events.
pub const SUBSCRIBE_START: &str = "subscribe_start";
pub const SUBSCRIBE_OK: &str = "subscribe_ok";
pub const SUBSCRIBE_HANDLER_REPLACED: &str = "subscribe_handler_replaced";
pub const SUBSCRIBE_FAILED: &str = "subscribe_failed";
pub const REGISTRY_SHUTDOWN_START: &str = "registry_shutdown_start";
pub const REGISTRY_SHUTDOWN_OK: &str = "registry_shutdown_ok";
pub const LISTENER_JOIN_OK: &str = "listener_join_ok";
pub const LISTENER_JOIN_ABANDONED: &str = "listener_join_abandoned";
pub const LISTENER_JOIN_LOST: &str = "listener_join_lost";

// Topic listener events.
pub const LISTENER_START: &str = "listener_start";
pub const LISTENER_STOP: &str = "listener_stop";
pub const LISTENER_RECEIVE: &str = "listener_receive";
pub const LISTENER_MALFORMED_FRAMES: &str = "listener_malformed_frames";
pub const LISTENER_RECV_FAILED: &str = "listener_recv_failed";
pub const LISTENER_HANDLER_PANICKED: &str = "listener_handler_panicked";

// Runtime events.
pub const RUNTIME_SPAWN_OK: &str = "runtime_spawn_ok";
pub const RUNTIME_SPAWN_FAILED: &str = "runtime_spawn_failed";
pub const RUNTIME_BUILD_FAILED: &str = "runtime_build_failed";
