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

//! Error types surfaced at the public client boundary.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Failures reported by a [`SimTransport`](crate::SimTransport) or one of its channels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The fabric cannot be reached, or refused the binding.
    Unavailable(String),
    /// The channel or the whole fabric has been shut down.
    Closed,
    /// A non-blocking write found the outbound queue full.
    WouldBlock,
    /// The endpoint is already bound by someone else.
    AddressInUse(String),
    Other(String),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Unavailable(reason) => write!(f, "transport unavailable: {reason}"),
            TransportError::Closed => write!(f, "transport closed"),
            TransportError::WouldBlock => write!(f, "outbound queue is full"),
            TransportError::AddressInUse(endpoint) => {
                write!(f, "endpoint already bound: {endpoint}")
            }
            TransportError::Other(reason) => write!(f, "transport failure: {reason}"),
        }
    }
}

impl Error for TransportError {}

/// Failures while establishing bindings (connect or subscribe).
#[derive(Debug)]
pub enum ConnectError {
    /// `connect()` was called on a client that is already connected.
    AlreadyConnected,
    /// The client has been closed and cannot be reused.
    Closed,
    Transport(TransportError),
    /// The topic listener thread could not be started.
    ListenerSpawn(String),
}

impl Display for ConnectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConnectError::AlreadyConnected => write!(f, "client is already connected"),
            ConnectError::Closed => write!(f, "client has been closed"),
            ConnectError::Transport(err) => write!(f, "unable to establish binding: {err}"),
            ConnectError::ListenerSpawn(reason) => {
                write!(f, "unable to start topic listener: {reason}")
            }
        }
    }
}

impl Error for ConnectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConnectError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for ConnectError {
    fn from(err: TransportError) -> Self {
        ConnectError::Transport(err)
    }
}

/// Failures of a single command or control send.
#[derive(Debug)]
pub enum SendError {
    NotConnected,
    Closed,
    /// Control values outside their allowed range; nothing was sent.
    InvalidControl(String),
    Encode(serde_json::Error),
    Transport(TransportError),
}

impl Display for SendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SendError::NotConnected => write!(f, "not connected to simulator"),
            SendError::Closed => write!(f, "client has been closed"),
            SendError::InvalidControl(reason) => write!(f, "invalid vehicle control: {reason}"),
            SendError::Encode(err) => write!(f, "unable to encode payload: {err}"),
            SendError::Transport(err) => write!(f, "send failed: {err}"),
        }
    }
}

impl Error for SendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SendError::Encode(err) => Some(err),
            SendError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for SendError {
    fn from(err: TransportError) -> Self {
        SendError::Transport(err)
    }
}

impl From<serde_json::Error> for SendError {
    fn from(err: serde_json::Error) -> Self {
        SendError::Encode(err)
    }
}

/// Failures while loading a [`ClientConfig`](crate::ClientConfig).
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(json5::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "unable to read config file: {err}"),
            ConfigError::Parse(err) => write!(f, "unable to parse config: {err}"),
            ConfigError::Invalid(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid(_) => None,
        }
    }
}
