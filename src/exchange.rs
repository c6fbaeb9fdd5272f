// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Management for RabbitMQ
//!
//! This module provides the types for defining RabbitMQ exchanges. The
//! courier topology uses a single durable direct exchange, but the
//! definition keeps the standard exchange kinds available through the same
//! builder pattern used for queues.

/// Represents the types of exchanges available in RabbitMQ.
///
/// - Direct: routes messages to queues on an exact routing-key match
/// - Fanout: broadcasts messages to all bound queues
/// - Topic: routes messages on wildcard pattern matching of routing keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExchangeKind {
    #[default]
    Direct,
    Fanout,
    Topic,
}

impl From<&ExchangeKind> for lapin::ExchangeKind {
    fn from(kind: &ExchangeKind) -> lapin::ExchangeKind {
        match kind {
            ExchangeKind::Direct => lapin::ExchangeKind::Direct,
            ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
            ExchangeKind::Topic => lapin::ExchangeKind::Topic,
        }
    }
}

/// Definition of a RabbitMQ exchange with its configuration parameters.
///
/// Built with chainable setters and handed to
/// [`crate::topology::AmqpTopology`] for installation.
#[derive(Debug, Clone)]
pub struct ExchangeDefinition<'ex> {
    pub(crate) name: &'ex str,
    pub(crate) kind: ExchangeKind,
    pub(crate) durable: bool,
    pub(crate) passive: bool,
}

impl<'ex> ExchangeDefinition<'ex> {
    /// Creates a new exchange definition with the given name.
    ///
    /// By default the exchange is a non-durable direct exchange.
    pub fn new(name: &'ex str) -> ExchangeDefinition<'ex> {
        ExchangeDefinition {
            name,
            kind: ExchangeKind::Direct,
            durable: false,
            passive: false,
        }
    }

    /// The exchange name.
    pub fn name(&self) -> &str {
        self.name
    }

    /// Sets the exchange type.
    pub fn kind(mut self, kind: ExchangeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the exchange type to Direct.
    pub fn direct(mut self) -> Self {
        self.kind = ExchangeKind::Direct;
        self
    }

    /// Sets the exchange type to Fanout.
    pub fn fanout(mut self) -> Self {
        self.kind = ExchangeKind::Fanout;
        self
    }

    /// Makes the exchange durable, persisting across broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    /// Makes the declare passive, checking for existence without creating.
    pub fn passive(mut self) -> Self {
        self.passive = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_a_plain_direct_exchange() {
        let def = ExchangeDefinition::new("2iteExchange");

        assert_eq!(def.name(), "2iteExchange");
        assert_eq!(def.kind, ExchangeKind::Direct);
        assert!(!def.durable);
        assert!(!def.passive);
    }

    #[test]
    fn chained_setters_accumulate() {
        let def = ExchangeDefinition::new("2iteExchange").direct().durable();

        assert_eq!(def.kind, ExchangeKind::Direct);
        assert!(def.durable);
    }

    #[test]
    fn kinds_convert_to_lapin_kinds() {
        assert_eq!(
            lapin::ExchangeKind::from(&ExchangeKind::Direct),
            lapin::ExchangeKind::Direct
        );
        assert_eq!(
            lapin::ExchangeKind::from(&ExchangeKind::Fanout),
            lapin::ExchangeKind::Fanout
        );
        assert_eq!(
            lapin::ExchangeKind::from(&ExchangeKind::Topic),
            lapin::ExchangeKind::Topic
        );
    }
}
