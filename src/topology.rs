// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Topology Management
//!
//! This module provides functionality for declaring the RabbitMQ topology:
//! exchanges, queues, and the bindings between them. Declarations are
//! idempotent from the broker's point of view: redeclaring an entity with
//! identical properties is a no-op, while redeclaring with conflicting
//! properties fails with [`AmqpError::TopologyConflict`] and is never
//! auto-resolved.
//!
//! The main components are:
//! - `Topology` trait: interface for topology registration and install
//! - `AmqpTopology`: implementation of the Topology trait for RabbitMQ
//! - `queue_info`: passive queue inspection returning a point-in-time
//!   snapshot without creating anything

use crate::{
    errors::{classify_topology_error, AmqpError, TopologyFailure},
    exchange::ExchangeDefinition,
    queue::{QueueBinding, QueueDefinition},
};
use async_trait::async_trait;
use lapin::{
    options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel,
};
use std::sync::Arc;
use tracing::{debug, error};

/// Trait defining the interface for topology management.
///
/// Exchanges, queues and bindings are registered first and installed in a
/// single pass. Install order is fixed: exchanges, then queues, then
/// bindings, since a binding requires both of its ends to exist.
#[async_trait]
pub trait Topology<'tp> {
    /// Adds an exchange definition to the topology.
    fn exchange(self, def: &'tp ExchangeDefinition) -> Self;

    /// Adds a queue definition to the topology.
    fn queue(self, def: &'tp QueueDefinition) -> Self;

    /// Adds a queue-to-exchange binding to the topology.
    fn queue_binding(self, binding: &'tp QueueBinding) -> Self;

    /// Installs the topology to the RabbitMQ server.
    async fn install(&self) -> Result<(), AmqpError>;
}

/// Point-in-time snapshot of a queue, read through a passive declare.
///
/// Not cached; every call reflects the broker state at that moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueInfo {
    /// Messages sitting in the queue awaiting delivery
    pub messages: u32,
    /// Consumers currently subscribed to the queue
    pub consumers: u32,
}

/// RabbitMQ implementation of the Topology trait.
pub struct AmqpTopology<'tp> {
    channel: Arc<Channel>,
    pub(crate) exchanges: Vec<&'tp ExchangeDefinition<'tp>>,
    pub(crate) queues: Vec<&'tp QueueDefinition>,
    pub(crate) queues_binding: Vec<&'tp QueueBinding<'tp>>,
}

impl<'tp> AmqpTopology<'tp> {
    /// Creates a new AmqpTopology instance on the given channel.
    pub fn new(channel: Arc<Channel>) -> AmqpTopology<'tp> {
        AmqpTopology {
            channel,
            exchanges: vec![],
            queues: vec![],
            queues_binding: vec![],
        }
    }
}

#[async_trait]
impl<'tp> Topology<'tp> for AmqpTopology<'tp> {
    fn exchange(mut self, def: &'tp ExchangeDefinition) -> Self {
        self.exchanges.push(def);
        self
    }

    fn queue(mut self, def: &'tp QueueDefinition) -> Self {
        self.queues.push(def);
        self
    }

    fn queue_binding(mut self, binding: &'tp QueueBinding) -> Self {
        self.queues_binding.push(binding);
        self
    }

    /// Installs the topology to the RabbitMQ server.
    ///
    /// Declares all exchanges, then all queues, then sets up the bindings.
    /// Redeclaring an existing entity with identical properties succeeds;
    /// a property mismatch surfaces as [`AmqpError::TopologyConflict`].
    async fn install(&self) -> Result<(), AmqpError> {
        self.install_exchanges().await?;
        self.install_queues().await?;
        self.binding_queues().await
    }
}

impl<'tp> AmqpTopology<'tp> {
    async fn install_exchanges(&self) -> Result<(), AmqpError> {
        for exch in &self.exchanges {
            debug!("declaring exchange: {}", exch.name);

            match self
                .channel
                .exchange_declare(
                    exch.name,
                    (&exch.kind).into(),
                    ExchangeDeclareOptions {
                        passive: exch.passive,
                        durable: exch.durable,
                        auto_delete: false,
                        internal: false,
                        nowait: false,
                    },
                    FieldTable::default(),
                )
                .await
            {
                Err(err) => {
                    error!(
                        error = err.to_string(),
                        name = exch.name,
                        "error to declare the exchange"
                    );
                    match classify_topology_error(&err) {
                        TopologyFailure::Conflict => {
                            Err(AmqpError::TopologyConflict(exch.name.to_owned()))
                        }
                        _ => Err(AmqpError::DeclareExchangeError(exch.name.to_owned())),
                    }
                }
                _ => Ok(()),
            }?;

            debug!("exchange: {} was declared", exch.name);
        }

        Ok(())
    }

    async fn install_queues(&self) -> Result<(), AmqpError> {
        for def in &self.queues {
            debug!("declaring queue: {}", def.name);

            match self
                .channel
                .queue_declare(
                    &def.name,
                    QueueDeclareOptions {
                        passive: def.passive,
                        durable: def.durable,
                        exclusive: def.exclusive,
                        auto_delete: def.delete,
                        nowait: false,
                    },
                    FieldTable::default(),
                )
                .await
            {
                Err(err) => {
                    error!(
                        error = err.to_string(),
                        name = def.name,
                        "error to declare the queue"
                    );
                    match classify_topology_error(&err) {
                        TopologyFailure::Conflict => {
                            Err(AmqpError::TopologyConflict(def.name.clone()))
                        }
                        _ => Err(AmqpError::DeclareQueueError(def.name.clone())),
                    }
                }
                _ => {
                    debug!("queue: {} was declared", def.name);
                    Ok(())
                }
            }?;
        }

        Ok(())
    }

    async fn binding_queues(&self) -> Result<(), AmqpError> {
        for binding in &self.queues_binding {
            debug!(
                "binding queue: {} to the exchange: {} with the key: '{}'",
                binding.queue_name, binding.exchange_name, binding.routing_key
            );

            match self
                .channel
                .queue_bind(
                    binding.queue_name,
                    binding.exchange_name,
                    binding.routing_key,
                    QueueBindOptions { nowait: false },
                    FieldTable::default(),
                )
                .await
            {
                Err(err) => {
                    error!(error = err.to_string(), "error to bind queue to exchange");

                    Err(AmqpError::BindingExchangeToQueueError(
                        binding.exchange_name.to_owned(),
                        binding.queue_name.to_owned(),
                    ))
                }
                _ => Ok(()),
            }?;
        }

        debug!("queue was bounded");

        Ok(())
    }
}

/// Reads a point-in-time snapshot of the queue.
///
/// Declares the queue passively: if it does not exist this fails with
/// [`AmqpError::DeclareQueueError`] instead of creating it, keeping
/// introspection distinct from declaration. The snapshot does not touch
/// any message.
pub async fn queue_info(channel: &Channel, queue: &str) -> Result<QueueInfo, AmqpError> {
    match channel
        .queue_declare(
            queue,
            QueueDeclareOptions {
                passive: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
    {
        Ok(state) => Ok(QueueInfo {
            messages: state.message_count(),
            consumers: state.consumer_count(),
        }),
        Err(err) => {
            error!(
                error = err.to_string(),
                name = queue,
                "error to inspect the queue"
            );
            Err(AmqpError::DeclareQueueError(queue.to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Installation and registration need a live channel; both are covered
    // by the ignored tests in tests/broker.rs.
    #[test]
    fn queue_info_is_plain_data() {
        let info = QueueInfo {
            messages: 3,
            consumers: 1,
        };

        assert_eq!(
            info,
            QueueInfo {
                messages: 3,
                consumers: 1
            }
        );
    }
}
