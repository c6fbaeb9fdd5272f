// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Dispatcher
//!
//! This module provides the two consumption paths over the courier queue:
//!
//! - a streaming dispatcher that subscribes with a prefetch window of one
//!   unacknowledged message and processes deliveries strictly one at a
//!   time until cancelled, and
//! - a single-shot `fetch_one` that pulls at most one message on demand
//!   without ever blocking.
//!
//! Cancellation is cooperative: the receive loop is a single select over
//! the delivery stream and a shutdown signal, so a stop request is honored
//! even while waiting for the next delivery. Anything delivered but not
//! yet acknowledged at cancellation time is returned to the queue by the
//! broker when the channel closes; the dispatcher does not requeue it
//! itself.

use crate::{
    consumer::{consume, ConsumerHandler},
    errors::AmqpError,
    queue::QueueDefinition,
};
use futures_util::StreamExt;
use lapin::{
    message::Delivery,
    options::{BasicCancelOptions, BasicConsumeOptions, BasicGetOptions, BasicQosOptions},
    types::FieldTable,
    Channel,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// The flow-control window: at most one unacknowledged message in flight
/// per channel. This is the sole concurrency-control primitive of the
/// consumer; it bounds memory and enforces sequential processing order.
pub const PREFETCH_COUNT: u16 = 1;

/// RabbitMQ implementation of the streaming consumer.
pub struct AmqpDispatcher {
    channel: Arc<Channel>,
    queue_def: QueueDefinition,
    handler: Arc<dyn ConsumerHandler>,
}

impl AmqpDispatcher {
    /// Creates a new dispatcher for one queue and one handler.
    pub fn new(
        channel: Arc<Channel>,
        queue_def: QueueDefinition,
        handler: Arc<dyn ConsumerHandler>,
    ) -> Self {
        AmqpDispatcher {
            channel,
            queue_def,
            handler,
        }
    }

    /// Consumes deliveries until the shutdown signal fires.
    ///
    /// Sets the prefetch window to [`PREFETCH_COUNT`] before registering
    /// the consumer, so the broker pushes no second delivery until the
    /// first is acknowledged. Omitting the ack stalls the channel; that
    /// is the backpressure mechanism.
    ///
    /// Returns `Ok(())` on cancellation; an unrecoverable channel failure
    /// surfaces as [`AmqpError::ConsumerError`] with no automatic
    /// resubscribe.
    pub async fn consume_blocking(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), AmqpError> {
        if let Err(err) = self
            .channel
            .basic_qos(PREFETCH_COUNT, BasicQosOptions::default())
            .await
        {
            error!(error = err.to_string(), "error to configure qos");
            return Err(AmqpError::QoSDeclarationError(err.to_string()));
        }

        let consumer_tag = format!("{}-consumer", self.queue_def.name());

        let mut consumer = match self
            .channel
            .basic_consume(
                self.queue_def.name(),
                &consumer_tag,
                BasicConsumeOptions {
                    no_local: false,
                    no_ack: false,
                    exclusive: false,
                    nowait: false,
                },
                FieldTable::default(),
            )
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), "error to create the consumer");
                Err(AmqpError::ConsumerDeclarationError)
            }
            Ok(c) => Ok(c),
        }?;

        info!(queue = self.queue_def.name(), "waiting for deliveries");

        loop {
            tokio::select! {
                delivery = consumer.next() => match delivery {
                    Some(Ok(delivery)) => {
                        if let Err(err) = consume(&delivery, self.handler.as_ref()).await {
                            error!(error = err.to_string(), "error to consume msg");
                        }
                    }
                    Some(Err(err)) => {
                        error!(error = err.to_string(), "error receiving delivery");
                    }
                    None => {
                        error!("delivery stream closed by the broker");
                        return Err(AmqpError::ConsumerError(
                            "delivery stream closed".to_owned(),
                        ));
                    }
                },
                _ = shutdown.changed() => {
                    debug!("shutdown requested, cancelling consumer");
                    if let Err(err) = self
                        .channel
                        .basic_cancel(&consumer_tag, BasicCancelOptions::default())
                        .await
                    {
                        debug!(error = err.to_string(), "consumer was already cancelled");
                    }
                    return Ok(());
                }
            }
        }
    }
}

/// Pulls at most one message from the queue, without blocking.
///
/// An empty queue is an expected outcome and comes back as `Ok(None)`,
/// never as an error. When a delivery is returned the caller owns the
/// acknowledgment: it must ack through the delivery it received, and an
/// omitted ack leaves the message in flight until the channel closes.
pub async fn fetch_one(channel: &Channel, queue: &str) -> Result<Option<Delivery>, AmqpError> {
    match channel
        .basic_get(queue, BasicGetOptions { no_ack: false })
        .await
    {
        Ok(Some(message)) => {
            debug!(
                queue = queue,
                delivery_tag = message.delivery.delivery_tag,
                "fetched one message"
            );
            Ok(Some(message.delivery))
        }
        Ok(None) => {
            debug!(queue = queue, "no message available");
            Ok(None)
        }
        Err(err) => {
            error!(error = err.to_string(), "error to fetch message");
            Err(AmqpError::FetchMessageError)
        }
    }
}
