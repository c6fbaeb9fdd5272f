// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Consumes messages from the courier queue. By default it streams with a
//! prefetch window of one until interrupted; `--one` fetches at most one
//! message and `--info` prints the queue snapshot, both without staying
//! subscribed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use clap::Parser;
use lapin::options::BasicAckOptions;
use rabbit_courier::{
    channel::{close_amqp_channel, new_amqp_channel},
    config::AmqpConfig,
    consumer::ConsumerHandler,
    dispatcher::{fetch_one, AmqpDispatcher},
    envelope::{DecodedPayload, Envelope},
    errors::AmqpError,
    exchange::ExchangeDefinition,
    queue::{QueueBinding, QueueDefinition},
    topology::{queue_info, AmqpTopology, Topology},
};
use tokio::sync::watch;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(version, about = "consume messages from the courier queue", long_about = None)]
struct Args {
    #[arg(long, default_value = "2iteExchange")]
    exchange: String,

    #[arg(long, default_value = "2iteQueue")]
    queue: String,

    /// Binding key; empty matches the producer's default publish key
    #[arg(long, default_value = "")]
    routing_key: String,

    /// Fetch at most one message, display it, ack it and exit
    #[arg(long, conflicts_with = "info")]
    one: bool,

    /// Print the queue snapshot (pending messages, active consumers)
    #[arg(long)]
    info: bool,
}

fn init_tracing() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .init();
}

fn display(envelope: &Envelope) {
    let produced_at = envelope
        .timestamp
        .and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string());

    info!(
        exchange = envelope.exchange,
        routing_key = envelope.routing_key,
        delivery_tag = envelope.delivery_tag,
        redelivered = envelope.redelivered,
        content_type = envelope.content_type.as_deref().unwrap_or("-"),
        produced_at = produced_at.as_deref().unwrap_or("-"),
        "message received"
    );

    match &envelope.payload {
        DecodedPayload::Text(text) => info!(body = text.as_str(), "text payload"),
        DecodedPayload::Json(value) => {
            let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
            info!(body = pretty, "json payload");
        }
        DecodedPayload::Raw(bytes) => {
            warn!(len = bytes.len(), "payload is not utf-8, raw bytes kept");
        }
    }
}

/// Streaming handler: display the message, then let the dispatcher ack.
struct PrintHandler;

#[async_trait]
impl ConsumerHandler for PrintHandler {
    async fn exec(&self, envelope: &Envelope) -> Result<(), AmqpError> {
        display(envelope);
        Ok(())
    }
}

async fn run_info(channel: &lapin::Channel, queue: &str) -> Result<(), AmqpError> {
    let snapshot = queue_info(channel, queue).await?;
    info!(
        queue = queue,
        pending_messages = snapshot.messages,
        active_consumers = snapshot.consumers,
        "queue snapshot"
    );
    Ok(())
}

async fn run_one(channel: Arc<lapin::Channel>, queue: &str) -> Result<(), AmqpError> {
    let queue_def = QueueDefinition::new(queue).durable();
    AmqpTopology::new(channel.clone())
        .queue(&queue_def)
        .install()
        .await?;

    match fetch_one(&channel, queue).await? {
        None => {
            info!(queue = queue, "no message available in the queue");
            Ok(())
        }
        Some(delivery) => {
            let envelope = Envelope::from_delivery(&delivery);
            display(&envelope);

            match delivery.ack(BasicAckOptions { multiple: false }).await {
                Ok(()) => {
                    info!(delivery_tag = envelope.delivery_tag, "message acked");
                    Ok(())
                }
                Err(err) => {
                    error!(error = err.to_string(), "error to ack msg");
                    Err(AmqpError::AckMessageError)
                }
            }
        }
    }
}

async fn run_stream(channel: Arc<lapin::Channel>, args: &Args) -> Result<(), AmqpError> {
    let exchange = ExchangeDefinition::new(&args.exchange).direct().durable();
    let queue = QueueDefinition::new(&args.queue).durable();
    let binding = QueueBinding::new(&args.queue)
        .exchange(&args.exchange)
        .routing_key(&args.routing_key);

    AmqpTopology::new(channel.clone())
        .exchange(&exchange)
        .queue(&queue)
        .queue_binding(&binding)
        .install()
        .await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping consumer");
            let _ = shutdown_tx.send(true);
        }
    });

    let dispatcher = AmqpDispatcher::new(channel, queue, Arc::new(PrintHandler));
    info!("consuming until interrupted (ctrl-c to stop)");
    dispatcher.consume_blocking(shutdown_rx).await
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();
    let cfg = AmqpConfig::from_env();

    let (conn, channel) = match new_amqp_channel(&cfg).await {
        Ok(pair) => pair,
        Err(err) => {
            error!(error = err.to_string(), "could not reach the broker");
            std::process::exit(1);
        }
    };

    let result = if args.info {
        run_info(&channel, &args.queue).await
    } else if args.one {
        run_one(channel.clone(), &args.queue).await
    } else {
        run_stream(channel.clone(), &args).await
    };

    close_amqp_channel(&conn, &channel).await;

    if let Err(err) = result {
        error!(error = err.to_string(), "consumer failed");
        std::process::exit(1);
    }

    info!("consumer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse_and_exclude_each_other() {
        let args = Args::try_parse_from(["courier-consumer", "--one"]).unwrap();
        assert!(args.one);
        assert!(!args.info);

        let args = Args::try_parse_from(["courier-consumer", "--info"]).unwrap();
        assert!(args.info);

        assert!(Args::try_parse_from(["courier-consumer", "--one", "--info"]).is_err());
    }

    #[test]
    fn defaults_match_the_setup_utility() {
        let args = Args::try_parse_from(["courier-consumer"]).unwrap();

        assert_eq!(args.exchange, "2iteExchange");
        assert_eq!(args.queue, "2iteQueue");
        assert_eq!(args.routing_key, "");
    }
}
