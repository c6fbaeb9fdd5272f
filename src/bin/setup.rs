// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Declares the courier topology (exchange, queue and binding, in that
//! order) and exits non-zero on any connection or topology error.

use clap::Parser;
use rabbit_courier::{
    channel::{close_amqp_channel, new_amqp_channel},
    config::AmqpConfig,
    exchange::ExchangeDefinition,
    queue::{QueueBinding, QueueDefinition},
    topology::{AmqpTopology, Topology},
};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(version, about = "declare the courier exchange, queue and binding", long_about = None)]
struct Args {
    #[arg(long, default_value = "2iteExchange")]
    exchange: String,

    #[arg(long, default_value = "2iteQueue")]
    queue: String,

    /// Binding key; empty matches the producer's default publish key
    #[arg(long, default_value = "")]
    routing_key: String,
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

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();
    let cfg = AmqpConfig::from_env();

    info!(addr = cfg.addr(), "connecting to rabbitmq");
    let (conn, channel) = match new_amqp_channel(&cfg).await {
        Ok(pair) => pair,
        Err(err) => {
            error!(error = err.to_string(), "setup failed");
            std::process::exit(1);
        }
    };
    info!("connection established");

    let exchange = ExchangeDefinition::new(&args.exchange).direct().durable();
    let queue = QueueDefinition::new(&args.queue).durable();
    let binding = QueueBinding::new(&args.queue)
        .exchange(&args.exchange)
        .routing_key(&args.routing_key);

    let result = AmqpTopology::new(channel.clone())
        .exchange(&exchange)
        .queue(&queue)
        .queue_binding(&binding)
        .install()
        .await;

    if let Err(err) = result {
        error!(error = err.to_string(), "setup failed");
        close_amqp_channel(&conn, &channel).await;
        std::process::exit(1);
    }

    info!(
        exchange = args.exchange,
        kind = "direct",
        durable = true,
        "exchange declared"
    );
    info!(queue = args.queue, durable = true, "queue declared");
    info!(
        exchange = args.exchange,
        queue = args.queue,
        routing_key = args.routing_key,
        "binding declared"
    );
    info!("setup finished");

    close_amqp_channel(&conn, &channel).await;
}
