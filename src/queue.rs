// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Management for RabbitMQ
//!
//! This module provides the types for defining RabbitMQ queues and the
//! bindings that connect them to exchanges. The courier topology is a
//! single durable queue bound to a direct exchange under an empty routing
//! key; the routing key on the binding must exactly match the key used at
//! publish time or the broker silently drops the message.

/// Definition of a RabbitMQ queue with its configuration parameters.
///
/// Built with chainable setters and handed to
/// [`crate::topology::AmqpTopology`] for installation, or to
/// [`crate::dispatcher::AmqpDispatcher`] for consumption.
#[derive(Debug, Clone, Default)]
pub struct QueueDefinition {
    pub(crate) name: String,
    pub(crate) durable: bool,
    pub(crate) exclusive: bool,
    pub(crate) delete: bool,
    pub(crate) passive: bool,
}

impl QueueDefinition {
    /// Creates a new queue definition with the given name.
    ///
    /// By default the queue is non-durable, non-exclusive and is not
    /// auto-deleted.
    pub fn new(name: &str) -> QueueDefinition {
        QueueDefinition {
            name: name.to_owned(),
            durable: false,
            exclusive: false,
            delete: false,
            passive: false,
        }
    }

    /// The queue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Makes the queue durable, persisting across broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    /// Makes the queue exclusive to the connection.
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Sets the queue to auto-delete when no longer used.
    pub fn delete(mut self) -> Self {
        self.delete = true;
        self
    }

    /// Makes the declare passive, checking for existence without creating.
    pub fn passive(mut self) -> Self {
        self.passive = true;
        self
    }
}

/// Configuration for binding a queue to an exchange.
pub struct QueueBinding<'qeb> {
    pub(crate) queue_name: &'qeb str,
    pub(crate) exchange_name: &'qeb str,
    pub(crate) routing_key: &'qeb str,
}

impl<'qeb> QueueBinding<'qeb> {
    /// Creates a new queue binding for the given queue.
    ///
    /// The exchange name and routing key default to empty strings and are
    /// set with [`QueueBinding::exchange`] and
    /// [`QueueBinding::routing_key`]. An empty routing key is a valid
    /// binding key for a direct exchange.
    pub fn new(queue: &'qeb str) -> QueueBinding<'qeb> {
        QueueBinding {
            queue_name: queue,
            exchange_name: "",
            routing_key: "",
        }
    }

    /// Sets the exchange to bind the queue to.
    pub fn exchange(mut self, exchange: &'qeb str) -> Self {
        self.exchange_name = exchange;
        self
    }

    /// Sets the routing key for the binding.
    pub fn routing_key(mut self, key: &'qeb str) -> Self {
        self.routing_key = key;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_a_plain_queue() {
        let def = QueueDefinition::new("2iteQueue");

        assert_eq!(def.name(), "2iteQueue");
        assert!(!def.durable);
        assert!(!def.exclusive);
        assert!(!def.delete);
        assert!(!def.passive);
    }

    #[test]
    fn durable_setter_accumulates() {
        let def = QueueDefinition::new("2iteQueue").durable();
        assert!(def.durable);
    }

    #[test]
    fn binding_defaults_to_the_empty_routing_key() {
        let binding = QueueBinding::new("2iteQueue").exchange("2iteExchange");

        assert_eq!(binding.queue_name, "2iteQueue");
        assert_eq!(binding.exchange_name, "2iteExchange");
        assert_eq!(binding.routing_key, "");
    }
}
