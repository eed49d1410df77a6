// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types for Topology Initialization
//!
//! This module provides the error type returned by every fallible operation of the crate.
//! The `AmqpError` enum distinguishes configuration problems detected before any network
//! call from failures reported by the transport or by the broker while declaring exchanges.

use thiserror::Error;

/// Represents errors that can occur while initializing a RabbitMQ topology.
///
/// Errors raised while declaring an exchange carry the name of that exchange,
/// so callers can tell which entry of the plan aborted the pass.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmqpError {
    /// A required field is missing or invalid. Raised before any network I/O.
    #[error("invalid configuration: {0}")]
    ConfigurationError(String),

    /// Transport, handshake or authentication failure while opening the session
    #[error("failure to connect: {0}")]
    ConnectionError(String),

    /// The broker already holds an exchange with this name but different attributes
    #[error("exchange `{exchange}` already exists with different attributes: {reason}")]
    ExchangeDeclareConflict { exchange: String, reason: String },

    /// Any other broker-reported failure while declaring an exchange
    #[error("failure to declare the exchange `{exchange}`: {reason}")]
    ChannelError { exchange: String, reason: String },
}

impl AmqpError {
    /// Returns the name of the exchange being declared when the error occurred, if any.
    pub fn exchange(&self) -> Option<&str> {
        match self {
            AmqpError::ExchangeDeclareConflict { exchange, .. }
            | AmqpError::ChannelError { exchange, .. } => Some(exchange),
            _ => None,
        }
    }
}
