// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Session Management
//!
//! This module handles the creation and release of the AMQP connection and channel
//! used to declare a topology. The `Connector` trait is the connection-opening capability
//! injected into the initializer, and `BrokerSession` is the scoped pair of connection
//! and channel it hands back. `AmqpConnector` / `AmqpSession` implement both on top of lapin.

use crate::{configs::ConnectionParameters, errors::AmqpError, exchange::ExchangeSpec};
use async_trait::async_trait;
use lapin::{
    options::ExchangeDeclareOptions,
    protocol::{AMQPErrorKind, AMQPSoftError},
    types::LongString,
    Channel, Connection, ConnectionProperties,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, warn};

/// Connection name announced to the broker when none is given
pub const DEFAULT_CONNECTION_NAME: &str = "rabbitmq-topology";

const REPLY_SUCCESS: u16 = 200;

/// An open connection with exactly one channel on it.
///
/// Sessions are used by a single task; declares are issued one at a time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrokerSession: Send + Sync {
    /// Declares one exchange with its exact attributes.
    async fn declare_exchange(&self, spec: &ExchangeSpec) -> Result<(), AmqpError>;

    /// Releases the channel, then the connection.
    async fn close(&self) -> Result<(), AmqpError>;
}

/// Opens broker sessions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(
        &self,
        params: &ConnectionParameters,
    ) -> Result<Box<dyn BrokerSession>, AmqpError>;
}

/// lapin-backed `Connector`.
#[derive(Debug, Clone)]
pub struct AmqpConnector {
    connection_name: String,
}

impl Default for AmqpConnector {
    fn default() -> Self {
        AmqpConnector::new(DEFAULT_CONNECTION_NAME)
    }
}

impl AmqpConnector {
    /// Creates a connector announcing `connection_name` as the client-provided connection name.
    pub fn new(connection_name: impl Into<String>) -> AmqpConnector {
        AmqpConnector {
            connection_name: connection_name.into(),
        }
    }
}

#[async_trait]
impl Connector for AmqpConnector {
    /// Establishes a connection using the given parameters, then creates a channel on it.
    ///
    /// # Returns
    /// The open session, or `AmqpError::ConnectionError` on network, handshake,
    /// authentication or channel-creation failure
    async fn open(
        &self,
        params: &ConnectionParameters,
    ) -> Result<Box<dyn BrokerSession>, AmqpError> {
        Ok(Box::new(AmqpSession::open(params, &self.connection_name).await?))
    }
}

/// Connection and channel pair driving the exchange declarations.
pub struct AmqpSession {
    conn: Connection,
    channel: Channel,
    closed: AtomicBool,
}

impl AmqpSession {
    /// Connects to the broker and opens the session's single channel.
    ///
    /// # Parameters
    /// * `params` - Broker host, port, credentials and virtual host
    /// * `connection_name` - Client-provided name shown in the broker's connection list
    ///
    /// # Returns
    /// * `Result<AmqpSession, AmqpError>` - The open session, or `AmqpError::ConnectionError`
    ///   when the connection or the channel cannot be established
    pub async fn open(
        params: &ConnectionParameters,
        connection_name: &str,
    ) -> Result<AmqpSession, AmqpError> {
        debug!(
            host = params.host_name(),
            port = params.port(),
            "creating amqp connection..."
        );
        let options = ConnectionProperties::default()
            .with_connection_name(LongString::from(connection_name.to_owned()));

        let conn = match Connection::connect_uri(params.amqp_uri(), options).await {
            Ok(c) => Ok(c),
            Err(err) => {
                error!(error = err.to_string(), "failure to connect");
                Err(AmqpError::ConnectionError(err.to_string()))
            }
        }?;
        debug!("amqp connected");

        debug!("creating amqp channel...");
        match conn.create_channel().await {
            Ok(channel) => {
                debug!("channel created");
                Ok(AmqpSession {
                    conn,
                    channel,
                    closed: AtomicBool::new(false),
                })
            }
            Err(err) => {
                error!(error = err.to_string(), "error to create the channel");
                if let Err(close_err) = conn.close(REPLY_SUCCESS, "OK").await {
                    warn!(error = close_err.to_string(), "error to close the connection");
                }
                Err(AmqpError::ConnectionError(err.to_string()))
            }
        }
    }
}

#[async_trait]
impl BrokerSession for AmqpSession {
    async fn declare_exchange(&self, spec: &ExchangeSpec) -> Result<(), AmqpError> {
        match self
            .channel
            .exchange_declare(
                spec.name(),
                spec.kind().into(),
                ExchangeDeclareOptions {
                    passive: false,
                    durable: spec.is_durable(),
                    auto_delete: spec.is_auto_delete(),
                    internal: false,
                    nowait: false,
                },
                crate::exchange::field_table(spec.get_arguments()),
            )
            .await
        {
            Err(err) => {
                error!(
                    error = err.to_string(),
                    name = spec.name(),
                    "error to declare the exchange"
                );
                Err(declare_error(spec.name(), &err))
            }
            _ => Ok(()),
        }
    }

    /// Closes the channel and then the connection. Later calls are no-ops.
    ///
    /// A channel the broker already closed (e.g. after a declare conflict) is
    /// expected to fail here; the connection is closed regardless.
    async fn close(&self) -> Result<(), AmqpError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        debug!("closing amqp channel...");
        let channel_result = self.channel.close(REPLY_SUCCESS, "OK").await;
        if let Err(err) = &channel_result {
            warn!(error = err.to_string(), "error to close the channel");
        }

        debug!("closing amqp connection...");
        let conn_result = self.conn.close(REPLY_SUCCESS, "OK").await;
        if let Err(err) = &conn_result {
            warn!(error = err.to_string(), "error to close the connection");
        }

        channel_result
            .and(conn_result)
            .map_err(|err| AmqpError::ConnectionError(err.to_string()))
    }
}

/// Maps a lapin declare failure to the crate error.
///
/// PRECONDITION_FAILED is what the broker replies when the exchange exists
/// with different attributes.
fn declare_error(exchange: &str, err: &lapin::Error) -> AmqpError {
    match err {
        lapin::Error::ProtocolError(amqp_err)
            if matches!(
                amqp_err.kind(),
                AMQPErrorKind::Soft(AMQPSoftError::PRECONDITIONFAILED)
            ) =>
        {
            AmqpError::ExchangeDeclareConflict {
                exchange: exchange.to_owned(),
                reason: amqp_err.get_message().to_string(),
            }
        }
        _ => AmqpError::ChannelError {
            exchange: exchange.to_owned(),
            reason: err.to_string(),
        },
    }
}
