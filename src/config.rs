use crate::poller::PollSettings;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default)]
    pub users: Vec<UserConfig>,
    #[serde(default)]
    pub poll: PollConfig,
}

#[derive(Debug, Deserialize)]
pub struct UserConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_delay_secs(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

fn default_api_base() -> String {
    "https://noj.tw/api".to_string()
}

fn default_delay_secs() -> f64 {
    1.0
}

fn default_max_in_flight() -> usize {
    64
}

impl Config {
    pub fn password_of(&self, username: &str) -> Option<&str> {
        self.users
            .iter()
            .find(|user| user.username == username)
            .map(|user| user.password.as_str())
    }
}

impl PollConfig {
    /// `delay_override` comes from the command line and wins over the file.
    pub fn settings(&self, delay_override: Option<f64>) -> Result<PollSettings> {
        let delay = match delay_override {
            Some(delay) => seconds("--delay", delay)?,
            None => seconds("poll.delay_secs", self.delay_secs)?,
        };
        Ok(PollSettings {
            delay,
            max_in_flight: self.max_in_flight.max(1),
        })
    }
}

/// Rejects negative, NaN and infinite durations.
pub fn seconds(flag: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| anyhow!("{flag} must be a non-negative number of seconds, got {value}"))
}
