// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

pub mod channel;
pub mod config;
pub mod consumer;
pub mod dispatcher;
pub mod envelope;
pub mod errors;
pub mod exchange;
pub mod publisher;
pub mod queue;
pub mod topology;
