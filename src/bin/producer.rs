// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Publishes messages to the courier exchange. A positional message text
//! publishes directly; without one an interactive menu offers a single
//! text message, a structured JSON message, or a burst of five test
//! messages. The menu only builds a [`ProduceCommand`]; the library core
//! never reads from the terminal.

use std::io::{self, Write};

use chrono::{Local, Utc};
use clap::Parser;
use rabbit_courier::{
    channel::close_amqp_channel,
    config::AmqpConfig,
    envelope::Payload,
    errors::AmqpError,
    publisher::{AmqpPublisher, Publisher},
};
use serde::Serialize;
use tracing::{error, info};

const BURST_SIZE: u32 = 5;

/// The structured message shape offered by the interactive menu.
#[derive(Debug, Serialize)]
struct Note {
    name: String,
    message: String,
    timestamp: String,
}

#[derive(Parser, Debug)]
#[command(version, about = "publish messages to the courier exchange", long_about = None)]
struct Args {
    #[arg(long, default_value = "2iteExchange")]
    exchange: String,

    /// Publish key; empty matches the setup utility's default binding
    #[arg(long, default_value = "")]
    routing_key: String,

    /// Message text; the interactive menu opens when omitted
    message: Vec<String>,
}

/// The operation requested through the CLI, handed to the core as data.
#[derive(Debug, PartialEq, Eq)]
enum ProduceCommand {
    Text(String),
    Structured { name: String, message: String },
    Burst(u32),
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

fn prompt(label: &str) -> Option<String> {
    print!("{label}");
    io::stdout().flush().ok()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line).ok()?;
    Some(line.trim_end_matches(['\r', '\n']).to_owned())
}

fn command_from_args(message: &[String]) -> Option<ProduceCommand> {
    if message.is_empty() {
        return None;
    }
    Some(ProduceCommand::Text(message.join(" ")))
}

fn command_from_menu() -> Option<ProduceCommand> {
    println!("1. send a text message");
    println!("2. send a structured json message");
    println!("3. send a burst of {BURST_SIZE} test messages");

    match prompt("choice (1-3): ")?.trim() {
        "1" => {
            let text = prompt("message: ")?;
            Some(ProduceCommand::Text(text))
        }
        "2" => {
            let name = prompt("name: ")?;
            let message = prompt("message: ")?;
            Some(ProduceCommand::Structured { name, message })
        }
        "3" => Some(ProduceCommand::Burst(BURST_SIZE)),
        other => {
            eprintln!("invalid choice: {other}");
            None
        }
    }
}

async fn run(publisher: &dyn Publisher, command: ProduceCommand) -> Result<(), AmqpError> {
    match command {
        ProduceCommand::Text(text) => {
            publisher.publish(&Payload::Text(text.clone())).await?;
            info!(message = text, "message published");
        }
        ProduceCommand::Structured { name, message } => {
            let note = Note {
                name,
                message,
                timestamp: Utc::now().to_rfc3339(),
            };
            let value = serde_json::to_value(&note).map_err(|err| {
                error!(error = err.to_string(), "failure to serialize note");
                AmqpError::SerializePayloadError
            })?;
            publisher.publish(&Payload::Json(value)).await?;
            info!("json message published");
        }
        ProduceCommand::Burst(count) => {
            for seq in 1..=count {
                let text = format!("test message #{seq} at {}", Local::now().format("%H:%M:%S"));
                // Publish errors are reported per message; the burst keeps
                // going so one failure does not swallow the rest.
                match publisher.publish(&Payload::Text(text.clone())).await {
                    Ok(()) => info!(message = text, "message published"),
                    Err(err) => error!(error = err.to_string(), "message not published"),
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();
    let cfg = AmqpConfig::from_env();

    let Some(command) = command_from_args(&args.message).or_else(command_from_menu) else {
        return;
    };

    let (conn, channel, publisher) =
        match AmqpPublisher::connect(&cfg, &args.exchange, &args.routing_key).await {
            Ok(parts) => parts,
            Err(err) => {
                error!(error = err.to_string(), "could not reach the broker");
                std::process::exit(1);
            }
        };

    if let Err(err) = run(publisher.as_ref(), command).await {
        error!(error = err.to_string(), "publish failed");
    }

    close_amqp_channel(&conn, &channel).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_words_become_one_text_command() {
        let message = vec!["hello".to_owned(), "world".to_owned()];

        assert_eq!(
            command_from_args(&message),
            Some(ProduceCommand::Text("hello world".to_owned()))
        );
    }

    #[test]
    fn no_positional_message_defers_to_the_menu() {
        assert_eq!(command_from_args(&[]), None);
    }

    #[test]
    fn structured_note_serializes_with_all_fields() {
        let note = Note {
            name: "A".to_owned(),
            message: "B".to_owned(),
            timestamp: "2026-08-30T00:00:00Z".to_owned(),
        };

        let value = serde_json::to_value(&note).unwrap();

        assert_eq!(value["name"], "A");
        assert_eq!(value["message"], "B");
        assert_eq!(value["timestamp"], "2026-08-30T00:00:00Z");
    }

    #[test]
    fn args_parse_with_defaults() {
        let args = Args::try_parse_from(["courier-producer", "ping"]).unwrap();

        assert_eq!(args.exchange, "2iteExchange");
        assert_eq!(args.routing_key, "");
        assert_eq!(args.message, vec!["ping".to_owned()]);
    }
}
