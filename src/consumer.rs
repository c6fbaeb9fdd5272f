// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Consumer
//!
//! This module provides the per-delivery processing path shared by the
//! streaming and single-shot consumers. A delivery is decoded (best
//! effort), handed to the registered handler, and acknowledged only after
//! the handler returns. This preserves at-least-once semantics: a crash
//! between delivery and ack results in redelivery, and downstream
//! processing must tolerate that.

use crate::{envelope::Envelope, errors::AmqpError};
use async_trait::async_trait;
use lapin::{message::Delivery, options::BasicAckOptions};
use tracing::{debug, error};

/// Handler invoked for every decoded delivery.
///
/// A degraded payload (raw bytes, or text where JSON was indicated) is
/// still handed over; decoding never fails a delivery. Returning an error
/// leaves the message unacknowledged; the broker redelivers it once the
/// channel closes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConsumerHandler: Send + Sync {
    async fn exec(&self, envelope: &Envelope) -> Result<(), AmqpError>;
}

/// Processes one delivery: decode, handle, then ack.
///
/// The ack uses the delivery's broker-assigned tag and is sent exactly
/// once, after the handler succeeds. On handler failure the message is
/// left unacked and stays with the broker's redelivery policy.
pub(crate) async fn consume(
    delivery: &Delivery,
    handler: &dyn ConsumerHandler,
) -> Result<(), AmqpError> {
    let envelope = Envelope::from_delivery(delivery);

    debug!(
        exchange = envelope.exchange,
        delivery_tag = envelope.delivery_tag,
        redelivered = envelope.redelivered,
        "received delivery"
    );

    if let Err(err) = handler.exec(&envelope).await {
        error!(
            error = err.to_string(),
            delivery_tag = envelope.delivery_tag,
            "handler failed, leaving message unacked"
        );
        return Err(err);
    }

    match delivery.ack(BasicAckOptions { multiple: false }).await {
        Err(err) => {
            error!(error = err.to_string(), "error to ack msg");
            Err(AmqpError::AckMessageError)
        }
        _ => {
            debug!(
                delivery_tag = envelope.delivery_tag,
                "message successfully processed"
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{encode, DecodedPayload, Payload};
    use lapin::acker::Acker;
    use lapin::types::ShortString;

    fn delivery_for(payload: &Payload) -> Delivery {
        let (data, properties) = encode(payload).unwrap();
        Delivery {
            delivery_tag: 1,
            exchange: ShortString::from("2iteExchange"),
            routing_key: ShortString::from(""),
            redelivered: false,
            properties,
            data,
            acker: Acker::default(),
        }
    }

    // The ack path needs a live channel and is covered by tests/broker.rs;
    // these cover the decode-then-handle contract.
    #[tokio::test]
    async fn handler_receives_the_decoded_envelope() {
        let delivery = delivery_for(&Payload::Text("ping".to_owned()));

        let mut handler = MockConsumerHandler::new();
        handler
            .expect_exec()
            .withf(|envelope| {
                envelope.payload == DecodedPayload::Text("ping".to_owned())
                    && envelope.exchange == "2iteExchange"
            })
            .times(1)
            .returning(|_| Err(AmqpError::InternalError));

        let result = consume(&delivery, &handler).await;
        assert_eq!(result, Err(AmqpError::InternalError));
    }

    #[tokio::test]
    async fn handler_failure_is_surfaced_before_any_ack() {
        let delivery = delivery_for(&Payload::Text("boom".to_owned()));

        let mut handler = MockConsumerHandler::new();
        handler
            .expect_exec()
            .times(1)
            .returning(|_| Err(AmqpError::ConsumerError("boom".to_owned())));

        let result = consume(&delivery, &handler).await;
        assert_eq!(result, Err(AmqpError::ConsumerError("boom".to_owned())));
    }
}
