// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Message Envelope Codec
//!
//! This module builds and interprets the wire envelope shared by the
//! producer and the consumer: payload bytes plus the content-type,
//! persistence and timestamp properties.
//!
//! Encoding is strict: a payload that cannot be serialized per its
//! content type fails with [`AmqpError::SerializePayloadError`] and
//! nothing is sent. Decoding is lenient: bytes that are not valid UTF-8
//! degrade to a raw variant, and a JSON payload that does not parse
//! degrades to its text form. A delivery is never failed by its payload.

use crate::errors::AmqpError;
use chrono::Utc;
use lapin::{message::Delivery, protocol::basic::AMQPProperties, types::ShortString};
use tracing::{error, warn};
use uuid::Uuid;

/// Content type stamped on plain-text messages
pub const TEXT_CONTENT_TYPE: &str = "text/plain";
/// Content type stamped on JSON messages
pub const JSON_CONTENT_TYPE: &str = "application/json";
/// AMQP delivery mode marking a message as persistent
pub const PERSISTENT_DELIVERY_MODE: u8 = 2;

/// A payload handed to the producer for publishing.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Published as UTF-8 bytes with content type `text/plain`
    Text(String),
    /// Serialized to canonical JSON bytes with content type
    /// `application/json`
    Json(serde_json::Value),
}

/// The decoded form of a received payload, best effort.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedPayload {
    /// UTF-8 text; also the fallback when a JSON-typed payload fails to
    /// parse
    Text(String),
    /// Parsed JSON, only when the content type indicated JSON and the
    /// bytes parsed
    Json(serde_json::Value),
    /// The untouched bytes, when they are not valid UTF-8
    Raw(Vec<u8>),
}

/// Consumer-side view of one delivery.
///
/// The `delivery_tag` is the broker-assigned acknowledgment handle; it is
/// unique per channel session, monotonically increasing, and must not be
/// reused after the ack.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub payload: DecodedPayload,
    pub exchange: String,
    pub routing_key: String,
    pub delivery_tag: u64,
    pub redelivered: bool,
    pub content_type: Option<String>,
    /// Producer-side unix timestamp, seconds
    pub timestamp: Option<u64>,
}

impl Envelope {
    /// Builds the decoded view of a lapin delivery.
    pub fn from_delivery(delivery: &Delivery) -> Envelope {
        Envelope {
            payload: decode(&delivery.data, &delivery.properties),
            exchange: delivery.exchange.to_string(),
            routing_key: delivery.routing_key.to_string(),
            delivery_tag: delivery.delivery_tag,
            redelivered: delivery.redelivered,
            content_type: delivery
                .properties
                .content_type()
                .clone()
                .map(|ct| ct.to_string()),
            timestamp: *delivery.properties.timestamp(),
        }
    }
}

/// Encodes a payload into wire bytes and message properties.
///
/// Every message produced by this client is persistent (delivery mode 2);
/// that is a fixed policy matching the durable topology, not a per-call
/// option. Properties also carry the content type, the publish timestamp
/// in unix seconds, and a v4 message id.
pub fn encode(payload: &Payload) -> Result<(Vec<u8>, AMQPProperties), AmqpError> {
    let (data, content_type) = match payload {
        Payload::Text(text) => (text.clone().into_bytes(), TEXT_CONTENT_TYPE),
        Payload::Json(value) => match serde_json::to_vec(value) {
            Ok(bytes) => (bytes, JSON_CONTENT_TYPE),
            Err(err) => {
                error!(error = err.to_string(), "failure to serialize payload");
                return Err(AmqpError::SerializePayloadError);
            }
        },
    };

    let properties = AMQPProperties::default()
        .with_content_type(ShortString::from(content_type))
        .with_delivery_mode(PERSISTENT_DELIVERY_MODE)
        .with_timestamp(Utc::now().timestamp() as u64)
        .with_message_id(ShortString::from(Uuid::new_v4().to_string()));

    Ok((data, properties))
}

/// Decodes received bytes against the delivery properties.
///
/// Never fails: non-UTF-8 bytes come back as [`DecodedPayload::Raw`], and
/// a payload whose content type says JSON but does not parse comes back as
/// [`DecodedPayload::Text`]. JSON is an enrichment, not a requirement.
pub fn decode(data: &[u8], properties: &AMQPProperties) -> DecodedPayload {
    let text = match std::str::from_utf8(data) {
        Ok(text) => text.to_owned(),
        Err(err) => {
            warn!(
                error = err.to_string(),
                "payload is not valid utf-8, keeping raw bytes"
            );
            return DecodedPayload::Raw(data.to_vec());
        }
    };

    let json_indicated = properties
        .content_type()
        .as_ref()
        .map(|ct| ct.as_str() == JSON_CONTENT_TYPE)
        .unwrap_or(false);

    if json_indicated {
        match serde_json::from_str(&text) {
            Ok(value) => return DecodedPayload::Json(value),
            Err(err) => {
                warn!(
                    error = err.to_string(),
                    "json was indicated but the payload did not parse, keeping text"
                );
            }
        }
    }

    DecodedPayload::Text(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapin::acker::Acker;
    use lapin::types::ShortString;
    use serde_json::json;

    #[test]
    fn text_round_trip() {
        let (data, properties) = encode(&Payload::Text("hello".to_owned())).unwrap();

        assert_eq!(
            properties.content_type().as_ref().map(|ct| ct.as_str()),
            Some(TEXT_CONTENT_TYPE)
        );
        assert_eq!(decode(&data, &properties), DecodedPayload::Text("hello".to_owned()));
    }

    #[test]
    fn json_round_trip() {
        let value = json!({ "name": "A", "message": "B" });
        let (data, properties) = encode(&Payload::Json(value.clone())).unwrap();

        assert_eq!(
            properties.content_type().as_ref().map(|ct| ct.as_str()),
            Some(JSON_CONTENT_TYPE)
        );
        assert_eq!(decode(&data, &properties), DecodedPayload::Json(value));
    }

    #[test]
    fn encoded_messages_are_persistent_and_timestamped() {
        let (_, properties) = encode(&Payload::Text("hello".to_owned())).unwrap();

        assert_eq!(*properties.delivery_mode(), Some(PERSISTENT_DELIVERY_MODE));
        assert!(properties.timestamp().is_some());
        assert!(properties.message_id().is_some());
    }

    #[test]
    fn invalid_utf8_degrades_to_raw_bytes() {
        let data = vec![0xff, 0xfe, 0x00, 0x9f];
        let properties =
            AMQPProperties::default().with_content_type(ShortString::from(TEXT_CONTENT_TYPE));

        assert_eq!(decode(&data, &properties), DecodedPayload::Raw(data.clone()));
    }

    #[test]
    fn broken_json_degrades_to_text() {
        let properties =
            AMQPProperties::default().with_content_type(ShortString::from(JSON_CONTENT_TYPE));

        assert_eq!(
            decode(b"{not json", &properties),
            DecodedPayload::Text("{not json".to_owned())
        );
    }

    #[test]
    fn json_content_under_text_type_stays_text() {
        let properties =
            AMQPProperties::default().with_content_type(ShortString::from(TEXT_CONTENT_TYPE));

        assert_eq!(
            decode(br#"{"name":"A"}"#, &properties),
            DecodedPayload::Text(r#"{"name":"A"}"#.to_owned())
        );
    }

    #[test]
    fn missing_content_type_stays_text() {
        let properties = AMQPProperties::default();

        assert_eq!(
            decode(b"hello", &properties),
            DecodedPayload::Text("hello".to_owned())
        );
    }

    #[test]
    fn envelope_carries_the_delivery_metadata() {
        let (data, properties) = encode(&Payload::Text("ping".to_owned())).unwrap();
        let delivery = Delivery {
            delivery_tag: 7,
            exchange: ShortString::from("2iteExchange"),
            routing_key: ShortString::from(""),
            redelivered: false,
            properties,
            data,
            acker: Acker::default(),
        };

        let envelope = Envelope::from_delivery(&delivery);

        assert_eq!(envelope.payload, DecodedPayload::Text("ping".to_owned()));
        assert_eq!(envelope.exchange, "2iteExchange");
        assert_eq!(envelope.routing_key, "");
        assert_eq!(envelope.delivery_tag, 7);
        assert!(!envelope.redelivered);
        assert_eq!(envelope.content_type.as_deref(), Some(TEXT_CONTENT_TYPE));
        assert!(envelope.timestamp.is_some());
    }
}
