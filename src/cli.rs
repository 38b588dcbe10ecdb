use clap::{Args, Parser, Subcommand};

use crate::check::CheckKind;

#[derive(Parser)]
#[command(name = "cacheprobe")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIME"), ")"))]
#[command(about = "Cache container health and integration verifier", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Verify the cache container and its read/write path
    Verify(VerifyArgs),
}

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Container name of the cache service
    #[arg(short, long, env = "CACHEPROBE_TARGET", default_value = "redis")]
    pub target: String,

    /// Per-command timeout in seconds
    #[arg(long, env = "CACHEPROBE_TIMEOUT", default_value_t = 5,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Cache port, checked on the host and passed to redis-cli
    #[arg(short, long, env = "REDIS_PORT", default_value_t = 6379)]
    pub port: u16,

    /// Cache password
    #[arg(long, env = "REDIS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Prefix for the probe key
    #[arg(long, env = "REDIS_KEY_PREFIX", default_value = "app:")]
    pub key_prefix: String,

    /// Value written by the read/write probe (no surrounding whitespace)
    #[arg(long, default_value = "ok", value_parser = parse_probe_value)]
    pub probe_value: String,

    /// Expiry of the probe key in seconds
    #[arg(long, default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub probe_ttl: u64,

    /// Reach the cache with redis-cli -h HOST instead of docker exec
    #[arg(long, env = "CACHEPROBE_CACHE_HOST")]
    pub cache_host: Option<String>,

    /// Private registry host expected in the image reference
    #[arg(long, env = "CACHEPROBE_REGISTRY")]
    pub registry: Option<String>,

    /// Image name (without registry or tag)
    #[arg(long, default_value = "redis")]
    pub image: String,

    /// Named volume holding the cache data
    #[arg(long, default_value = "redis_data")]
    pub volume: String,

    /// Skip a check (repeatable)
    #[arg(long, value_enum)]
    pub skip: Vec<CheckKind>,

    /// Control-plane client binary
    #[arg(long, env = "DOCKER_BIN", default_value = "docker")]
    pub docker_bin: String,

    /// Socket listing binary
    #[arg(long, env = "SS_BIN", default_value = "ss")]
    pub ss_bin: String,
}

/// The reply is trimmed before comparison, so a value that does not survive
/// trimming, or spans lines, could never match.
fn parse_probe_value(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("must not be empty".to_string());
    }
    if s.trim() != s {
        return Err("must not start or end with whitespace".to_string());
    }
    if s.contains(['\n', '\r']) {
        return Err("must be a single line".to_string());
    }
    Ok(s.to_string())
}
