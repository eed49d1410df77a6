// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

pub mod channel;
pub mod configs;
pub mod errors;
pub mod exchange;
pub mod topology;

pub use channel::{AmqpConnector, BrokerSession, Connector};
pub use configs::{ConnectionParameters, TopologyConfig, TopologyPlan};
pub use errors::AmqpError;
pub use exchange::{ArgumentValue, Arguments, ExchangeKind, ExchangeSpec};
pub use topology::TopologyInitializer;
