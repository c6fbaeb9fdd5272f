// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Channel Management
//!
//! This module handles the creation and teardown of AMQP connections and
//! channels. A channel is opened on a dedicated connection and both are
//! wrapped in `Arc` for sharing between the publisher, the dispatcher and
//! the topology installer. Connection failures are surfaced immediately to
//! the caller; no retry is attempted here.

use crate::{config::AmqpConfig, errors::AmqpError};
use lapin::{types::LongString, Channel, Connection, ConnectionProperties};
use std::sync::Arc;
use tracing::{debug, error};

/// Creates a new AMQP channel for communication with RabbitMQ.
///
/// Validates the configuration, establishes the connection and opens one
/// channel on it. The connection is named after `cfg.app_name` so it can be
/// identified in the broker's management UI.
///
/// # Returns
/// * `Result<(Arc<Connection>, Arc<Channel>), AmqpError>` -
///   A tuple containing the connection and channel on success. A
///   [`AmqpError::ConnectionError`] carries the `host:port` the client
///   tried to reach.
pub async fn new_amqp_channel(
    cfg: &AmqpConfig,
) -> Result<(Arc<Connection>, Arc<Channel>), AmqpError> {
    cfg.validate()?;

    debug!("creating amqp connection...");
    let options = ConnectionProperties::default()
        .with_connection_name(LongString::from(cfg.app_name.clone()));

    let uri = cfg.amqp_uri();

    let conn = match Connection::connect(&uri, options).await {
        Ok(c) => Ok(c),
        Err(err) => {
            error!(
                error = err.to_string(),
                addr = cfg.addr(),
                "failure to connect"
            );
            Err(AmqpError::ConnectionError(cfg.addr()))
        }
    }?;
    debug!("amqp connected");

    debug!("creating amqp channel...");
    match conn.create_channel().await {
        Ok(c) => {
            debug!("channel created");
            Ok((Arc::new(conn), Arc::new(c)))
        }
        Err(err) => {
            error!(error = err.to_string(), "error to create the channel");
            Err(AmqpError::ChannelError {})
        }
    }
}

/// Closes the channel and its connection, best effort.
///
/// Safe to call on every exit path: closing a channel or connection that
/// the broker already tore down only logs at debug level. Callers close
/// exactly once; a second call on an already-closed pair is a no-op from
/// the broker's point of view.
pub async fn close_amqp_channel(conn: &Connection, channel: &Channel) {
    debug!("closing amqp channel...");
    if let Err(err) = channel.close(200, "client shutdown").await {
        debug!(error = err.to_string(), "channel was already closed");
    }

    debug!("closing amqp connection...");
    if let Err(err) = conn.close(200, "client shutdown").await {
        debug!(error = err.to_string(), "connection was already closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_config_fails_before_connecting() {
        let cfg = AmqpConfig {
            host: "".to_owned(),
            ..AmqpConfig::default()
        };

        let result = new_amqp_channel(&cfg).await;
        assert!(matches!(result, Err(AmqpError::ConfigError(_))));
    }
}
