// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types for the RabbitMQ Client
//!
//! This module provides the error types for all broker operations. The
//! `AmqpError` enum covers connection, channel, topology declaration,
//! publishing and consumption failures. Each variant carries the context
//! needed by the operator to fix the problem externally; none of them are
//! retried internally.

use lapin::protocol::{AMQPErrorKind, AMQPSoftError};
use thiserror::Error;

/// Represents errors that can occur during AMQP/RabbitMQ operations.
///
/// Decode failures are deliberately absent: a payload that is not valid
/// UTF-8 (or not valid JSON when JSON was indicated) degrades to a less
/// structured representation instead of failing the delivery. See
/// [`crate::envelope::decode`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AmqpError {
    /// Internal errors that don't fit into other categories
    #[error("internal error")]
    InternalError,

    /// Error establishing a connection to the RabbitMQ server. Carries the
    /// `host:port` the client tried to reach.
    #[error("failure to connect to `{0}`")]
    ConnectionError(String),

    /// Error creating a channel from an established connection
    #[error("failure to create a channel")]
    ChannelError,

    /// A required configuration value is missing or empty
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// Error declaring an exchange with the given name
    #[error("failure to declare an exchange `{0}`")]
    DeclareExchangeError(String),

    /// Error declaring a queue with the given name
    #[error("failure to declare a queue `{0}`")]
    DeclareQueueError(String),

    /// The exchange or queue already exists with different properties.
    /// Resolving this would require a destructive redeclaration, which the
    /// client never does implicitly.
    #[error("topology conflict on `{0}`: it already exists with different properties")]
    TopologyConflict(String),

    /// Error binding an exchange to a queue
    #[error("failure to binding exchange `{0}` to queue `{1}`")]
    BindingExchangeToQueueError(String, String),

    /// Error serializing a payload per the requested content type
    #[error("failure to serialize payload")]
    SerializePayloadError,

    /// Error publishing a message
    #[error("failure to publish")]
    PublishingError,

    /// Error acknowledging a message
    #[error("failure to ack message")]
    AckMessageError,

    /// Error configuring Quality of Service parameters
    #[error("failure to configure qos `{0}`")]
    QoSDeclarationError(String),

    /// Error declaring a consumer
    #[error("consumer declaration error")]
    ConsumerDeclarationError,

    /// Error consuming a message
    #[error("failure to consume message `{0}`")]
    ConsumerError(String),

    /// Error fetching a single message with basic.get
    #[error("failure to fetch message")]
    FetchMessageError,
}

/// Broker-side reasons a declare or bind call can fail.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum TopologyFailure {
    /// The entity exists with different properties (reply code 406)
    Conflict,
    /// The entity does not exist (reply code 404), e.g. a passive declare
    /// or a binding against a missing queue/exchange
    Missing,
    /// Anything else: transport failure, closed channel, access refused
    Other,
}

/// Classifies a lapin error from a declare/bind call.
///
/// The broker reports property mismatches and missing entities as AMQP
/// soft errors on the channel; everything else is treated as opaque.
pub(crate) fn classify_topology_error(err: &lapin::Error) -> TopologyFailure {
    match err {
        lapin::Error::ProtocolError(amqp_err) => match amqp_err.kind() {
            AMQPErrorKind::Soft(AMQPSoftError::PRECONDITIONFAILED) => TopologyFailure::Conflict,
            AMQPErrorKind::Soft(AMQPSoftError::NOTFOUND) => TopologyFailure::Missing,
            _ => TopologyFailure::Other,
        },
        _ => TopologyFailure::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapin::protocol::AMQPError;
    use lapin::types::ShortString;

    #[test]
    fn precondition_failed_maps_to_conflict() {
        let err = lapin::Error::ProtocolError(AMQPError::new(
            AMQPErrorKind::Soft(AMQPSoftError::PRECONDITIONFAILED),
            ShortString::from("PRECONDITION_FAILED - inequivalent arg 'durable'"),
        ));

        assert_eq!(classify_topology_error(&err), TopologyFailure::Conflict);
    }

    #[test]
    fn not_found_maps_to_missing() {
        let err = lapin::Error::ProtocolError(AMQPError::new(
            AMQPErrorKind::Soft(AMQPSoftError::NOTFOUND),
            ShortString::from("NOT_FOUND - no queue '2iteQueue'"),
        ));

        assert_eq!(classify_topology_error(&err), TopologyFailure::Missing);
    }

    #[test]
    fn other_errors_stay_opaque() {
        let err = lapin::Error::ProtocolError(AMQPError::new(
            AMQPErrorKind::Soft(AMQPSoftError::ACCESSREFUSED),
            ShortString::from("ACCESS_REFUSED"),
        ));

        assert_eq!(classify_topology_error(&err), TopologyFailure::Other);
        assert_eq!(
            classify_topology_error(&lapin::Error::InvalidConnectionState(
                lapin::ConnectionState::Closed
            )),
            TopologyFailure::Other
        );
    }

    #[test]
    fn connection_error_keeps_the_address_hint() {
        let err = AmqpError::ConnectionError("localhost:5672".to_owned());
        assert_eq!(err.to_string(), "failure to connect to `localhost:5672`");
    }
}
