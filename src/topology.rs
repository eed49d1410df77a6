// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Topology Initialization
//!
//! This module provides the orchestration that turns a `TopologyPlan` into broker state.
//! A pass validates its inputs, opens one session, declares every exchange in plan order
//! on that session's channel, and closes the session on every exit path.
//!
//! Declares are fail-fast: the first failure stops the pass and is returned once the
//! session is closed. Exchanges declared before the failure stay on the broker; running
//! the same plan again is safe because identical redeclares are no-ops.

use crate::{
    channel::{AmqpConnector, BrokerSession, Connector},
    configs::{ConnectionParameters, TopologyPlan},
    errors::AmqpError,
};
use tracing::{debug, error, warn};

/// Declares the exchanges of a plan on the broker.
///
/// Holds no state between passes; every `run` opens its own session.
pub struct TopologyInitializer<C = AmqpConnector> {
    connector: C,
}

impl Default for TopologyInitializer<AmqpConnector> {
    fn default() -> Self {
        TopologyInitializer::new(AmqpConnector::default())
    }
}

impl<C: Connector> TopologyInitializer<C> {
    /// Creates an initializer opening sessions through `connector`.
    pub fn new(connector: C) -> TopologyInitializer<C> {
        TopologyInitializer { connector }
    }

    /// Runs one initialization pass.
    ///
    /// Inputs are validated before any network call. A declare failure aborts the
    /// remaining specs; the session is closed before the error is returned.
    ///
    /// # Returns
    /// Ok(()) on success or AmqpError on failure
    pub async fn run(
        &self,
        params: &ConnectionParameters,
        plan: &TopologyPlan,
    ) -> Result<(), AmqpError> {
        params.validate()?;
        plan.validate()?;

        let session = self.connector.open(params).await?;

        let result = declare_exchanges(session.as_ref(), plan).await;

        match (&result, session.close().await) {
            (Ok(()), Err(err)) => {
                warn!(error = err.to_string(), "topology applied but session close failed")
            }
            (Err(_), Err(err)) => {
                debug!(error = err.to_string(), "session close failed after declare error")
            }
            _ => {}
        }

        result
    }
}

async fn declare_exchanges(
    session: &dyn BrokerSession,
    plan: &TopologyPlan,
) -> Result<(), AmqpError> {
    debug!(count = plan.len(), "starting to create exchanges");

    for exch in plan {
        debug!(name = exch.name(), kind = %exch.kind(), "exchange being created");

        if let Err(err) = session.declare_exchange(exch).await {
            error!(
                error = err.to_string(),
                name = exch.name(),
                "aborting topology initialization"
            );
            return Err(err);
        }

        debug!(name = exch.name(), "exchange was created");
    }

    debug!("done to create exchanges");

    Ok(())
}
