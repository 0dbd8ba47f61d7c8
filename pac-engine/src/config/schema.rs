//! Configuration schema types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete engine configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub pac: PacConfig,
    #[serde(default)]
    pub sandbox: SandboxLimits,
}

/// Where the PAC script comes from and how it is fetched
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PacConfig {
    /// `file://` URI, `http(s)://` URI or a filesystem path
    pub url: Option<String>,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

impl PacConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for PacConfig {
    fn default() -> Self {
        Self {
            url: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

/// Resource limits applied to every script execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SandboxLimits {
    #[serde(default = "default_loop_iteration_limit")]
    pub loop_iteration_limit: u64,
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,
    #[serde(default = "default_stack_size_limit")]
    pub stack_size_limit: usize,
    /// Wall-clock budget for one script run, in milliseconds
    #[serde(default = "default_eval_timeout_ms")]
    pub eval_timeout_ms: u64,
}

fn default_loop_iteration_limit() -> u64 {
    1_000_000
}

fn default_recursion_limit() -> usize {
    256
}

fn default_stack_size_limit() -> usize {
    64 * 1024
}

fn default_eval_timeout_ms() -> u64 {
    5_000
}

impl SandboxLimits {
    pub fn eval_timeout(&self) -> Duration {
        Duration::from_millis(self.eval_timeout_ms)
    }
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            loop_iteration_limit: default_loop_iteration_limit(),
            recursion_limit: default_recursion_limit(),
            stack_size_limit: default_stack_size_limit(),
            eval_timeout_ms: default_eval_timeout_ms(),
        }
    }
}
