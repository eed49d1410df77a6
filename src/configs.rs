// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Topology Configuration
//!
//! This module holds the immutable inputs of a topology initialization pass: the
//! broker `ConnectionParameters` and the ordered `TopologyPlan` of exchanges to declare.
//! Both deserialize from the configuration keys the host application already uses, and
//! `TopologyConfig` can load them together from a JSON document.

use crate::{errors::AmqpError, exchange::ExchangeSpec};
use lapin::uri::{AMQPAuthority, AMQPUri, AMQPUserInfo};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, fs, path::Path};

/// Default AMQP port
pub const DEFAULT_AMQP_PORT: u16 = 5672;
/// Virtual host used by the broker when none is configured
pub const DEFAULT_VIRTUAL_HOST: &str = "/";

fn default_port() -> u16 {
    DEFAULT_AMQP_PORT
}

/// Parameters needed to reach the broker.
///
/// An empty `virtual_host` selects the broker's default virtual host.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionParameters {
    #[serde(alias = "HostName")]
    pub(crate) host_name: String,
    #[serde(default = "default_port", alias = "Port")]
    pub(crate) port: u16,
    #[serde(default, alias = "UserName")]
    pub(crate) user_name: String,
    #[serde(default, alias = "Password")]
    pub(crate) password: String,
    #[serde(default, alias = "VirtualHost")]
    pub(crate) virtual_host: String,
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("host_name", &self.host_name)
            .field("port", &self.port)
            .field("user_name", &self.user_name)
            .field("password", &"[REDACTED]")
            .field("virtual_host", &self.virtual_host)
            .finish()
    }
}

impl ConnectionParameters {
    /// Creates connection parameters for the given host with the default port,
    /// empty credentials and the default virtual host.
    pub fn new(host_name: impl Into<String>) -> ConnectionParameters {
        ConnectionParameters {
            host_name: host_name.into(),
            port: DEFAULT_AMQP_PORT,
            user_name: String::new(),
            password: String::new(),
            virtual_host: String::new(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_credentials(
        mut self,
        user_name: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.user_name = user_name.into();
        self.password = password.into();
        self
    }

    pub fn with_virtual_host(mut self, virtual_host: impl Into<String>) -> Self {
        self.virtual_host = virtual_host.into();
        self
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn virtual_host(&self) -> &str {
        &self.virtual_host
    }

    pub fn validate(&self) -> Result<(), AmqpError> {
        if self.host_name.trim().is_empty() {
            return Err(AmqpError::ConfigurationError(
                "host name must not be empty".to_owned(),
            ));
        }

        if self.port == 0 {
            return Err(AmqpError::ConfigurationError(
                "port must be in the range 1-65535".to_owned(),
            ));
        }

        Ok(())
    }

    /// Builds the AMQP URI for these parameters.
    ///
    /// The URI is assembled field by field so credentials never need escaping.
    pub fn amqp_uri(&self) -> AMQPUri {
        let vhost = if self.virtual_host.is_empty() {
            DEFAULT_VIRTUAL_HOST.to_owned()
        } else {
            self.virtual_host.clone()
        };

        AMQPUri {
            authority: AMQPAuthority {
                userinfo: AMQPUserInfo {
                    username: self.user_name.clone(),
                    password: self.password.clone(),
                },
                host: self.host_name.clone(),
                port: self.port,
            },
            vhost,
            ..AMQPUri::default()
        }
    }
}

/// Ordered list of exchanges to declare. The order is the declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopologyPlan {
    exchanges: Vec<ExchangeSpec>,
}

impl TopologyPlan {
    pub fn new(exchanges: Vec<ExchangeSpec>) -> TopologyPlan {
        TopologyPlan { exchanges }
    }

    /// Appends an exchange at the end of the plan.
    pub fn exchange(mut self, spec: ExchangeSpec) -> Self {
        self.exchanges.push(spec);
        self
    }

    pub fn exchanges(&self) -> &[ExchangeSpec] {
        &self.exchanges
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExchangeSpec> {
        self.exchanges.iter()
    }

    /// Validates every spec and rejects duplicated exchange names.
    pub fn validate(&self) -> Result<(), AmqpError> {
        let mut seen = HashSet::with_capacity(self.exchanges.len());

        for (index, spec) in self.exchanges.iter().enumerate() {
            spec.validate().map_err(|err| match err {
                AmqpError::ConfigurationError(msg) => {
                    AmqpError::ConfigurationError(format!("exchange #{index}: {msg}"))
                }
                other => other,
            })?;

            if !seen.insert(spec.name()) {
                return Err(AmqpError::ConfigurationError(format!(
                    "exchange `{}` is declared more than once",
                    spec.name()
                )));
            }
        }

        Ok(())
    }
}

impl From<Vec<ExchangeSpec>> for TopologyPlan {
    fn from(exchanges: Vec<ExchangeSpec>) -> Self {
        TopologyPlan::new(exchanges)
    }
}

impl<'a> IntoIterator for &'a TopologyPlan {
    type Item = &'a ExchangeSpec;
    type IntoIter = std::slice::Iter<'a, ExchangeSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.exchanges.iter()
    }
}

/// Configuration document holding both the connection section and the exchanges list.
///
/// ```json
/// {
///   "RabbitMQConnection": { "hostName": "localhost", "userName": "guest", "password": "guest" },
///   "Exchanges": [ { "exchangeName": "orders", "type": "topic", "durable": true } ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyConfig {
    #[serde(rename = "RabbitMQConnection")]
    pub connection: ConnectionParameters,
    #[serde(rename = "Exchanges", default)]
    pub exchanges: TopologyPlan,
}

impl TopologyConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, AmqpError> {
        serde_json::from_str(raw).map_err(|err| {
            AmqpError::ConfigurationError(format!("failure to parse topology config: {err}"))
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AmqpError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|err| {
            AmqpError::ConfigurationError(format!(
                "failure to read topology config {}: {err}",
                path.display()
            ))
        })?;

        Self::from_json_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ExchangeKind;

    #[test]
    fn connection_defaults_are_applied() {
        let params: ConnectionParameters =
            serde_json::from_str(r#"{ "hostName": "rabbit", "userName": "app", "password": "s3cret" }"#)
                .unwrap();

        assert_eq!(params.host_name(), "rabbit");
        assert_eq!(params.port(), DEFAULT_AMQP_PORT);
        assert_eq!(params.virtual_host(), "");
        assert!(params.validate().is_ok());
    }

    #[test]
    fn builder_values_are_read_back_through_accessors() {
        let params = ConnectionParameters::new("rabbit")
            .with_port(5673)
            .with_credentials("app", "s3cret")
            .with_virtual_host("billing");

        assert_eq!(params.host_name(), "rabbit");
        assert_eq!(params.port(), 5673);
        assert_eq!(params.user_name(), "app");
        assert_eq!(params.virtual_host(), "billing");
    }

    #[test]
    fn connection_requires_host_and_valid_port() {
        assert!(serde_json::from_str::<ConnectionParameters>(r#"{ "port": 5672 }"#).is_err());
        assert!(
            serde_json::from_str::<ConnectionParameters>(r#"{ "hostName": "h", "port": 70000 }"#)
                .is_err()
        );

        assert!(matches!(
            ConnectionParameters::new("").validate(),
            Err(AmqpError::ConfigurationError(_))
        ));
        assert!(matches!(
            ConnectionParameters::new("rabbit").with_port(0).validate(),
            Err(AmqpError::ConfigurationError(_))
        ));
    }

    #[test]
    fn debug_redacts_password() {
        let params = ConnectionParameters::new("rabbit").with_credentials("app", "s3cret");
        let out = format!("{:?}", params);
        assert!(!out.contains("s3cret"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn uri_uses_default_vhost_when_empty() {
        let uri = ConnectionParameters::new("rabbit")
            .with_port(5673)
            .with_credentials("app", "p@ss/word")
            .amqp_uri();

        assert_eq!(uri.authority.host, "rabbit");
        assert_eq!(uri.authority.port, 5673);
        assert_eq!(uri.authority.userinfo.username, "app");
        assert_eq!(uri.authority.userinfo.password, "p@ss/word");
        assert_eq!(uri.vhost, DEFAULT_VIRTUAL_HOST);

        let uri = ConnectionParameters::new("rabbit").with_virtual_host("billing").amqp_uri();
        assert_eq!(uri.vhost, "billing");
    }

    #[test]
    fn plan_keeps_order_and_rejects_duplicates() {
        let plan = TopologyPlan::default()
            .exchange(ExchangeSpec::new("a", ExchangeKind::Direct))
            .exchange(ExchangeSpec::new("b", ExchangeKind::Fanout));

        let names: Vec<&str> = plan.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(plan.validate().is_ok());

        let dup = plan.exchange(ExchangeSpec::new("a", ExchangeKind::Topic));
        assert!(matches!(dup.validate(), Err(AmqpError::ConfigurationError(_))));
    }

    #[test]
    fn plan_rejects_empty_names() {
        let plan = TopologyPlan::new(vec![
            ExchangeSpec::new("a", ExchangeKind::Direct),
            ExchangeSpec::new("", ExchangeKind::Direct),
        ]);

        match plan.validate() {
            Err(AmqpError::ConfigurationError(msg)) => assert!(msg.starts_with("exchange #1")),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn loads_full_document() {
        let cfg = TopologyConfig::from_json_str(
            r#"{
                "RabbitMQConnection": {
                    "HostName": "rabbit",
                    "Port": 5673,
                    "UserName": "app",
                    "Password": "secret",
                    "VirtualHost": "orders"
                },
                "Exchanges": [
                    { "ExchangeName": "orders", "Type": "topic", "Durable": true, "AutoDelete": false },
                    { "exchangeName": "audit", "type": "fanout" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.connection.port(), 5673);
        assert_eq!(cfg.connection.virtual_host(), "orders");
        assert_eq!(cfg.exchanges.len(), 2);
        assert_eq!(cfg.exchanges.exchanges()[0].kind(), ExchangeKind::Topic);
        assert_eq!(cfg.exchanges.exchanges()[1].name(), "audit");
    }

    #[test]
    fn missing_exchanges_section_is_an_empty_plan() {
        let cfg =
            TopologyConfig::from_json_str(r#"{ "RabbitMQConnection": { "hostName": "rabbit" } }"#)
                .unwrap();
        assert!(cfg.exchanges.is_empty());
    }

    #[test]
    fn parse_failures_are_configuration_errors() {
        assert!(matches!(
            TopologyConfig::from_json_str(r#"{ "Exchanges": [] }"#),
            Err(AmqpError::ConfigurationError(_))
        ));
        assert!(matches!(
            TopologyConfig::from_file("/nonexistent/topology.json"),
            Err(AmqpError::ConfigurationError(_))
        ));
    }
}
