//! Explicit run configuration handed to the verifier.

use std::time::Duration;

use crate::check::CheckKind;
use crate::cli::VerifyArgs;

#[derive(Debug, Clone)]
pub struct VerifyConfig {
    pub target: String,
    pub timeout: Duration,
    pub port: u16,
    pub password: Option<String>,
    pub key_prefix: String,
    pub probe_value: String,
    pub probe_ttl: u64,
    pub cache_host: Option<String>,
    pub registry: Option<String>,
    pub image: String,
    pub volume: String,
    pub skip: Vec<CheckKind>,
    pub docker_bin: String,
    pub ss_bin: String,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            target: "redis".to_string(),
            timeout: Duration::from_secs(5),
            port: 6379,
            password: None,
            key_prefix: "app:".to_string(),
            probe_value: "ok".to_string(),
            probe_ttl: 30,
            cache_host: None,
            registry: None,
            image: "redis".to_string(),
            volume: "redis_data".to_string(),
            skip: Vec::new(),
            docker_bin: "docker".to_string(),
            ss_bin: "ss".to_string(),
        }
    }
}

impl VerifyConfig {
    /// Glob matching every probe key this tool writes.
    pub fn probe_pattern(&self) -> String {
        format!("{}probe:*", self.key_prefix)
    }

    /// Checks to run, in report order.
    pub fn checks(&self) -> Vec<CheckKind> {
        CheckKind::ALL
            .iter()
            .copied()
            .filter(|k| !self.skip.contains(k))
            .collect()
    }
}

impl From<VerifyArgs> for VerifyConfig {
    fn from(a: VerifyArgs) -> Self {
        Self {
            target: a.target,
            timeout: Duration::from_secs(a.timeout),
            port: a.port,
            password: a.password.filter(|p| !p.is_empty()),
            key_prefix: a.key_prefix,
            probe_value: a.probe_value,
            probe_ttl: a.probe_ttl,
            cache_host: a.cache_host.filter(|h| !h.is_empty()),
            registry: a.registry.filter(|r| !r.is_empty()),
            image: a.image,
            volume: a.volume,
            skip: a.skip,
            docker_bin: a.docker_bin,
            ss_bin: a.ss_bin,
        }
    }
}
