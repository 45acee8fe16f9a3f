//! Online feature-access gate driven by a stream of user behavioral events.
//!
//! # Module organization
//!
//! - `common`: shared types across all layers (error codes)
//! - `config`: application configuration from environment variables
//! - `domain`: events, aggregates, rules, features — pure, synchronous
//! - `application`: orchestration (event processor, consumer pool, grant
//!   service, notifications)
//! - `infrastructure`: the event queue and default declarative wiring
//! - `presentation`: HTTP handlers and routing
//! - `state`: application state container with `FromRef` implementations

pub mod application;
pub mod common;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod state;
