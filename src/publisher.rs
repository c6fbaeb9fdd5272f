// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Publisher
//!
//! This module provides functionality for publishing messages to the
//! courier exchange. Publishing is fire-and-forget with respect to
//! routing: the broker accepts the message onto the exchange without
//! confirming that any queue is bound to it, and a message whose routing
//! key matches no binding is dropped silently. Callers that need delivery
//! confirmation would have to use publisher confirms, which this client
//! does not enable.

use crate::{
    channel::new_amqp_channel,
    config::AmqpConfig,
    envelope::{encode, Payload},
    errors::AmqpError,
    exchange::ExchangeDefinition,
    topology::{AmqpTopology, Topology},
};
use async_trait::async_trait;
use lapin::{options::BasicPublishOptions, Channel, Connection};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{debug, error};

/// Trait defining the publishing seam used by the binaries.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes one payload to the configured exchange.
    async fn publish(&self, payload: &Payload) -> Result<(), AmqpError>;
}

/// RabbitMQ implementation of the Publisher trait.
///
/// Declares its exchange once per session, before the first publish on
/// the channel, and skips the declare on every later call. Declaration is
/// idempotent, so a concurrent double declare is harmless.
pub struct AmqpPublisher {
    channel: Arc<Channel>,
    exchange: String,
    routing_key: String,
    declared: AtomicBool,
}

impl AmqpPublisher {
    /// Creates a new RabbitMQ publisher on the given channel.
    ///
    /// # Returns
    /// An Arc-wrapped AmqpPublisher instance for thread-safe sharing
    pub fn new(channel: Arc<Channel>, exchange: &str, routing_key: &str) -> Arc<AmqpPublisher> {
        Arc::new(AmqpPublisher {
            channel,
            exchange: exchange.to_owned(),
            routing_key: routing_key.to_owned(),
            declared: AtomicBool::new(false),
        })
    }

    /// Opens a channel from the configuration and builds a publisher on it.
    ///
    /// Convenience used by the producer binary; the connection is returned
    /// so the caller owns the teardown.
    pub async fn connect(
        cfg: &AmqpConfig,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(Arc<Connection>, Arc<Channel>, Arc<AmqpPublisher>), AmqpError> {
        let (conn, channel) = new_amqp_channel(cfg).await?;
        let publisher = AmqpPublisher::new(channel.clone(), exchange, routing_key);
        Ok((conn, channel, publisher))
    }

    async fn ensure_exchange(&self) -> Result<(), AmqpError> {
        if self.declared.load(Ordering::Acquire) {
            return Ok(());
        }

        debug!(exchange = self.exchange, "declaring exchange before first publish");
        let def = ExchangeDefinition::new(&self.exchange).direct().durable();
        AmqpTopology::new(self.channel.clone())
            .exchange(&def)
            .install()
            .await?;

        self.declared.store(true, Ordering::Release);
        Ok(())
    }
}

#[async_trait]
impl Publisher for AmqpPublisher {
    /// Publishes a message to RabbitMQ.
    ///
    /// Encodes the payload (persistent delivery mode, content type,
    /// timestamp, message id) and publishes it to the exchange under the
    /// configured routing key. An unroutable message is dropped by the
    /// broker with no error observed here.
    async fn publish(&self, payload: &Payload) -> Result<(), AmqpError> {
        self.ensure_exchange().await?;

        let (data, properties) = encode(payload)?;

        match self
            .channel
            .basic_publish(
                &self.exchange,
                &self.routing_key,
                BasicPublishOptions {
                    immediate: false,
                    mandatory: false,
                },
                &data,
                properties,
            )
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), "error publishing message");
                Err(AmqpError::PublishingError)
            }
            _ => {
                debug!(
                    exchange = self.exchange,
                    routing_key = self.routing_key,
                    "message published"
                );
                Ok(())
            }
        }
    }
}
