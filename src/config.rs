use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use thiserror::Error;

use crate::models::ConnectionAttempt;

const DEFAULT_BROKER_HOST: &str = "vakinet-mqtt-broker.onrender.com";
const DEFAULT_PORTS: &str = "10000,10001,10002";
const DEFAULT_CLIENT_ID: &str = "test-client-123";
const DEFAULT_TOPIC: &str = "test/topic";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub broker_host: String,
    pub ports: Vec<u16>,
    pub client_id: String,
    pub topic: String,
    pub keepalive_secs: u64,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is missing or invalid.")]
    MissingOrInvalid(String),
    #[error("Parsing error: {0}")]
    ParsingError(String),
}

impl Config {
    /// Validate delay and keepalive values.
    fn validate(&self) -> Result<(), ConfigError> {
        const MIN_DELAY_MS: u64 = 100;
        const MAX_DELAY_MS: u64 = 1_000_000;
        // The protocol encodes keepalive as u16 and rumqttc rejects sub-5s intervals.
        const MIN_KEEPALIVE_SECS: u64 = 5;
        const MAX_KEEPALIVE_SECS: u64 = 65_535;

        if !(MIN_DELAY_MS..=MAX_DELAY_MS).contains(&self.retry_delay_ms) {
            return Err(ConfigError::ParsingError(format!(
                "MQTT_RETRY_DELAY_MS must be between {} and {} ms",
                MIN_DELAY_MS, MAX_DELAY_MS
            )));
        }

        if !(MIN_KEEPALIVE_SECS..=MAX_KEEPALIVE_SECS).contains(&self.keepalive_secs) {
            return Err(ConfigError::ParsingError(format!(
                "MQTT_KEEPALIVE_SECS must be between {} and {} seconds",
                MIN_KEEPALIVE_SECS, MAX_KEEPALIVE_SECS
            )));
        }

        Ok(())
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok(); // Load environment variables from .env file

        let config = Self {
            broker_host: env::var("MQTT_HOST").unwrap_or_else(|_| DEFAULT_BROKER_HOST.to_string()),
            ports: parse_port_list(
                &env::var("MQTT_PORTS").unwrap_or_else(|_| DEFAULT_PORTS.to_string()),
            )?,
            client_id: env::var("MQTT_CLIENT_ID").unwrap_or_else(|_| DEFAULT_CLIENT_ID.to_string()),
            topic: env::var("MQTT_TOPIC").unwrap_or_else(|_| DEFAULT_TOPIC.to_string()),
            keepalive_secs: env::var("MQTT_KEEPALIVE_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<u64>()
                .map_err(|_| {
                    ConfigError::ParsingError(
                        "MQTT_KEEPALIVE_SECS must be a valid number".to_string(),
                    )
                })?,
            retry_delay_ms: env::var("MQTT_RETRY_DELAY_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse::<u64>()
                .map_err(|_| {
                    ConfigError::ParsingError(
                        "MQTT_RETRY_DELAY_MS must be a valid number".to_string(),
                    )
                })?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Connection parameters for a single trial on the given port.
    pub fn attempt_for(&self, port: u16) -> ConnectionAttempt {
        ConnectionAttempt {
            port,
            broker_host: self.broker_host.clone(),
            client_id: self.client_id.clone(),
            keepalive_secs: self.keepalive_secs,
        }
    }
}

fn parse_port_list(raw: &str) -> Result<Vec<u16>, ConfigError> {
    let ports = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry.parse::<u16>().map_err(|_| {
                ConfigError::ParsingError(format!("'{}' is not a valid port number", entry))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ports.is_empty() {
        return Err(ConfigError::MissingOrInvalid("MQTT_PORTS".to_string()));
    }

    Ok(ports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_comma_separated_port_list() {
        assert_eq!(
            parse_port_list("10000,10001,10002").unwrap(),
            vec![10000, 10001, 10002]
        );
        assert_eq!(parse_port_list(" 1883 , 8883 ").unwrap(), vec![1883, 8883]);
    }

    #[test]
    fn rejects_malformed_port_entries() {
        assert!(matches!(
            parse_port_list("10000,broker,10002"),
            Err(ConfigError::ParsingError(_))
        ));
        assert!(matches!(
            parse_port_list("99999"),
            Err(ConfigError::ParsingError(_))
        ));
    }

    #[test]
    fn rejects_an_empty_port_list() {
        assert!(matches!(
            parse_port_list(""),
            Err(ConfigError::MissingOrInvalid(_))
        ));
        assert!(matches!(
            parse_port_list(" , "),
            Err(ConfigError::MissingOrInvalid(_))
        ));
    }

    #[test]
    fn validation_bounds_delay_and_keepalive() {
        let mut config = Config {
            broker_host: "localhost".to_string(),
            ports: vec![1883],
            client_id: "probe".to_string(),
            topic: "test/topic".to_string(),
            keepalive_secs: 60,
            retry_delay_ms: 2000,
        };
        assert!(config.validate().is_ok());

        config.retry_delay_ms = 10;
        assert!(config.validate().is_err());

        config.retry_delay_ms = 2000;
        config.keepalive_secs = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn attempt_parameters_come_from_the_configured_profile() {
        let config = Config {
            broker_host: "broker.local".to_string(),
            ports: vec![10000, 10001],
            client_id: "test-client-123".to_string(),
            topic: "test/topic".to_string(),
            keepalive_secs: 60,
            retry_delay_ms: 2000,
        };

        let attempt = config.attempt_for(10001);
        assert_eq!(attempt.port, 10001);
        assert_eq!(attempt.broker_host, "broker.local");
        assert_eq!(attempt.client_id, "test-client-123");
        assert_eq!(attempt.keepalive_secs, 60);
    }
}
