//! Application configuration loaded from environment variables.
//!
//! Operational tunables use the `GATE_` prefix. Declarative domain wiring
//! (event schemas, aggregate/rule/feature configs) is not part of this
//! struct — it is supplied programmatically at startup from
//! [`crate::infrastructure::fixtures`], matching the source's separation
//! between tunables and domain wiring.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATE_PORT` | 3000 | HTTP server port |
//! | `GATE_NUM_CONSUMERS` | 3 | Consumer pool worker count |
//! | `GATE_QUEUE_CAPACITY` | 10000 | Bounded event queue capacity |
//! | `GATE_BREAKER_WINDOW_SECS` | 600 | Access-log sliding window width |
//! | `GATE_BREAKER_PERIOD_SECS` | 15 | Circuit breaker evaluation interval |
//! | `GATE_BREAKER_DENIAL_THRESHOLD` | 0.05 | Denial rate that force-opens a circuit |
//!
//! Standard variables (no prefix):
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RUST_LOG` | `feature_gate=debug,tower_http=debug` | Tracing filter |

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
///
/// Use [`Config::from_env()`] to load configuration at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,

    /// Number of consumer pool workers draining the event queue.
    pub num_consumers: usize,

    /// Bounded event queue capacity. `POST /event` returns `503` once full.
    pub queue_capacity: usize,

    /// Width of the access-log sliding window used for denial-rate
    /// computation.
    pub breaker_window: Duration,

    /// How often the circuit breaker evaluator runs.
    pub breaker_period: Duration,

    /// Denial rate above which a feature's circuit is forced open.
    pub breaker_denial_threshold: f64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing or invalid variables fall back to defaults, with a warning
    /// logged for invalid (but present) values.
    #[must_use]
    pub fn from_env() -> Self {
        let port = parse_env_or("GATE_PORT", 3000);
        let num_consumers = parse_env_or("GATE_NUM_CONSUMERS", 3);
        let queue_capacity = parse_env_or("GATE_QUEUE_CAPACITY", 10_000);
        let breaker_window_secs: u64 = parse_env_or("GATE_BREAKER_WINDOW_SECS", 600);
        let breaker_period_secs: u64 = parse_env_or("GATE_BREAKER_PERIOD_SECS", 15);
        let breaker_denial_threshold = parse_env_or("GATE_BREAKER_DENIAL_THRESHOLD", 0.05);

        Self {
            port,
            num_consumers,
            queue_capacity,
            breaker_window: Duration::from_secs(breaker_window_secs),
            breaker_period: Duration::from_secs(breaker_period_secs),
            breaker_denial_threshold,
        }
    }

    /// Socket address to bind the HTTP server to.
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            num_consumers: 3,
            queue_capacity: 10_000,
            breaker_window: Duration::from_secs(600),
            breaker_period: Duration::from_secs(15),
            breaker_denial_threshold: 0.05,
        }
    }
}

fn parse_env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|raw| {
            raw.parse().ok().or_else(|| {
                tracing::warn!(variable = name, value = %raw, "invalid value, using default");
                None
            })
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.num_consumers, 3);
        assert_eq!(config.queue_capacity, 10_000);
        assert_eq!(config.breaker_window, Duration::from_secs(600));
        assert_eq!(config.breaker_period, Duration::from_secs(15));
        assert!((config.breaker_denial_threshold - 0.05).abs() < f64::EPSILON);
    }

    #[test]
    fn socket_addr_binding() {
        let config = Config {
            port: 8080,
            ..Default::default()
        };
        assert_eq!(config.socket_addr(), SocketAddr::from(([0, 0, 0, 0], 8080)));
    }
}
