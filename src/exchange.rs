// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Definitions for RabbitMQ
//!
//! This module provides the types describing one exchange to declare on the broker.
//! Exchanges are the routing mechanism in RabbitMQ that determine how messages are
//! distributed to queues. An `ExchangeSpec` carries the name, type, flags and the
//! broker-specific arguments table, and knows how to encode those arguments for the wire.

use crate::errors::AmqpError;
use lapin::types::{AMQPValue, FieldTable, LongInt, LongLongInt, LongString, ShortString};
use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

/// Maximum length in bytes of an AMQP short string (exchange names, table keys).
pub const AMQP_SHORT_STRING_MAX_LEN: usize = 255;

/// Broker-specific extension parameters of an exchange, keyed by argument name.
pub type Arguments = BTreeMap<String, ArgumentValue>;

/// Represents the types of exchanges available in RabbitMQ.
///
/// Each exchange type has specific routing behavior:
/// - Direct: Routes messages to queues based on an exact match of routing keys
/// - Fanout: Broadcasts messages to all bound queues regardless of routing keys
/// - Topic: Routes messages based on wildcard pattern matching of routing keys
/// - Headers: Routes based on message header values instead of routing keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeKind {
    #[default]
    Direct,
    Fanout,
    Topic,
    Headers,
}

impl ExchangeKind {
    /// The exchange type name as the broker knows it.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeKind::Direct => "direct",
            ExchangeKind::Fanout => "fanout",
            ExchangeKind::Topic => "topic",
            ExchangeKind::Headers => "headers",
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeKind {
    type Err = AmqpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(ExchangeKind::Direct),
            "fanout" => Ok(ExchangeKind::Fanout),
            "topic" => Ok(ExchangeKind::Topic),
            "headers" => Ok(ExchangeKind::Headers),
            other => Err(AmqpError::ConfigurationError(format!(
                "unknown exchange type `{other}`"
            ))),
        }
    }
}

impl From<ExchangeKind> for lapin::ExchangeKind {
    fn from(kind: ExchangeKind) -> Self {
        match kind {
            ExchangeKind::Direct => lapin::ExchangeKind::Direct,
            ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
            ExchangeKind::Headers => lapin::ExchangeKind::Headers,
            ExchangeKind::Topic => lapin::ExchangeKind::Topic,
        }
    }
}

/// A value allowed in an exchange arguments table.
///
/// The set is closed so that every accepted value has a well-defined AMQP encoding.
/// Floats, arrays and nulls are rejected when parsing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Bool(bool),
    Integer(i64),
    String(String),
    Table(Arguments),
}

impl From<&str> for ArgumentValue {
    fn from(value: &str) -> Self {
        ArgumentValue::String(value.to_owned())
    }
}

impl From<String> for ArgumentValue {
    fn from(value: String) -> Self {
        ArgumentValue::String(value)
    }
}

impl From<i64> for ArgumentValue {
    fn from(value: i64) -> Self {
        ArgumentValue::Integer(value)
    }
}

impl From<i32> for ArgumentValue {
    fn from(value: i32) -> Self {
        ArgumentValue::Integer(value.into())
    }
}

impl From<bool> for ArgumentValue {
    fn from(value: bool) -> Self {
        ArgumentValue::Bool(value)
    }
}

impl From<Arguments> for ArgumentValue {
    fn from(value: Arguments) -> Self {
        ArgumentValue::Table(value)
    }
}

impl From<&ArgumentValue> for AMQPValue {
    /// Integers that fit in 32 bits travel as long ints, the rest as long-long ints.
    fn from(value: &ArgumentValue) -> Self {
        match value {
            ArgumentValue::Bool(v) => AMQPValue::Boolean(*v),
            ArgumentValue::Integer(v) => match i32::try_from(*v) {
                Ok(small) => AMQPValue::LongInt(LongInt::from(small)),
                Err(_) => AMQPValue::LongLongInt(LongLongInt::from(*v)),
            },
            ArgumentValue::String(v) => AMQPValue::LongString(LongString::from(v.as_str())),
            ArgumentValue::Table(v) => AMQPValue::FieldTable(field_table(v)),
        }
    }
}

/// Encodes an arguments map into an AMQP field table.
pub fn field_table(args: &Arguments) -> FieldTable {
    let mut btree = BTreeMap::<ShortString, AMQPValue>::default();
    for (key, value) in args {
        btree.insert(ShortString::from(key.as_str()), AMQPValue::from(value));
    }
    FieldTable::from(btree)
}

/// Definition of a RabbitMQ exchange with its configuration parameters.
///
/// `name` and `kind` are fixed at construction; flags and arguments are set
/// through the consuming builder methods. Deserializes from the
/// `exchangeName`/`type`/`durable`/`autoDelete`/`arguments` configuration keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeSpec {
    #[serde(rename = "exchangeName", alias = "ExchangeName")]
    pub(crate) name: String,
    #[serde(rename = "type", alias = "Type")]
    pub(crate) kind: ExchangeKind,
    #[serde(default, alias = "Durable")]
    pub(crate) durable: bool,
    #[serde(default, alias = "AutoDelete")]
    pub(crate) auto_delete: bool,
    #[serde(default, alias = "Arguments", deserialize_with = "null_as_empty")]
    pub(crate) arguments: Arguments,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Arguments, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Arguments>::deserialize(deserializer)?.unwrap_or_default())
}

impl ExchangeSpec {
    /// Creates a new non-durable, non-auto-delete exchange spec without arguments.
    ///
    /// # Parameters
    /// * `name` - The name of the exchange
    /// * `kind` - The exchange type
    pub fn new(name: impl Into<String>, kind: ExchangeKind) -> ExchangeSpec {
        ExchangeSpec {
            name: name.into(),
            kind,
            durable: false,
            auto_delete: false,
            arguments: Arguments::default(),
        }
    }

    /// Makes the exchange durable, persisting across broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    /// Sets the exchange to auto-delete once its last binding is removed.
    pub fn auto_delete(mut self) -> Self {
        self.auto_delete = true;
        self
    }

    /// Replaces the whole arguments table.
    pub fn arguments(mut self, arguments: Arguments) -> Self {
        self.arguments = arguments;
        self
    }

    /// Adds a single argument to the exchange.
    pub fn argument(mut self, key: impl Into<String>, value: impl Into<ArgumentValue>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ExchangeKind {
        self.kind
    }

    pub fn is_durable(&self) -> bool {
        self.durable
    }

    pub fn is_auto_delete(&self) -> bool {
        self.auto_delete
    }

    pub fn get_arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Returns true when both specs would produce the same exchange on the broker.
    ///
    /// Redeclaring an exchange is accepted by the broker only in that case.
    pub fn is_equivalent(&self, other: &ExchangeSpec) -> bool {
        self.kind == other.kind
            && self.durable == other.durable
            && self.auto_delete == other.auto_delete
            && self.arguments == other.arguments
    }

    /// Checks the fields the broker would otherwise reject or misread.
    pub fn validate(&self) -> Result<(), AmqpError> {
        if self.name.is_empty() {
            return Err(AmqpError::ConfigurationError(
                "exchange name must not be empty".to_owned(),
            ));
        }

        if self.name.len() > AMQP_SHORT_STRING_MAX_LEN {
            return Err(AmqpError::ConfigurationError(format!(
                "exchange name `{}` exceeds {} bytes",
                self.name, AMQP_SHORT_STRING_MAX_LEN
            )));
        }

        validate_arguments(&self.name, &self.arguments)
    }
}

fn validate_arguments(exchange: &str, args: &Arguments) -> Result<(), AmqpError> {
    for (key, value) in args {
        if key.is_empty() || key.len() > AMQP_SHORT_STRING_MAX_LEN {
            return Err(AmqpError::ConfigurationError(format!(
                "exchange `{exchange}` has an argument key that is empty or longer than {AMQP_SHORT_STRING_MAX_LEN} bytes"
            )));
        }

        if let ArgumentValue::Table(nested) = value {
            validate_arguments(exchange, nested)?;
        }
    }

    Ok(())
}
