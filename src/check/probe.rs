//! Cache-level checks, all routed through [`CacheClient`].

use tracing::debug;

use crate::check::cache::{CacheClient, ProbeKey};
use crate::check::executor::Executor;
use crate::check::report::CheckResult;
use crate::check::CheckKind;
use crate::config::VerifyConfig;

const LIVENESS_TOKEN: &str = "PONG";
const MAX_LISTED_KEYS: usize = 5;

pub fn connectivity(exec: &dyn Executor, cfg: &VerifyConfig) -> CheckResult {
    let name = CheckKind::Connectivity.name();
    let via = match &cfg.cache_host {
        Some(host) => format!("{}:{}", host, cfg.port),
        None => format!("docker exec {}", cfg.target),
    };

    match CacheClient::new(exec, cfg).ping() {
        Ok(reply) if reply == LIVENESS_TOKEN => {
            CheckResult::pass(name, format!("{} via {}", LIVENESS_TOKEN, via))
        }
        Ok(reply) => CheckResult::fail(
            name,
            format!("expected {:?}, got {:?} via {}", LIVENESS_TOKEN, reply, via),
        ),
        Err(e) => CheckResult::fail(name, e.to_string()),
    }
}

/// SET, GET, TYPE and TTL a fresh probe key, then always delete it.
pub fn read_write(exec: &dyn Executor, cfg: &VerifyConfig) -> CheckResult {
    let name = CheckKind::ReadWrite.name();
    let client = CacheClient::new(exec, cfg);
    let probe = ProbeKey::new(&client, &cfg.key_prefix);
    debug!(key = probe.key(), "probe key claimed");

    let outcome = round_trip(&client, probe.key(), cfg);
    let key = probe.key().to_string();
    let cleanup = probe.release();

    let (passed, mut detail) = match outcome {
        Ok(detail) => (true, detail),
        Err(detail) => (false, detail),
    };
    if let Err(e) = cleanup {
        detail.push_str(&format!("; cleanup warning: could not delete {}: {}", key, e));
    }

    if passed {
        CheckResult::pass(name, detail)
    } else {
        CheckResult::fail(name, detail)
    }
}

fn round_trip(
    client: &CacheClient<'_>,
    key: &str,
    cfg: &VerifyConfig,
) -> Result<String, String> {
    let expected = cfg.probe_value.as_str();

    client
        .set_ex(key, expected, cfg.probe_ttl)
        .map_err(|e| format!("SET {} failed: {}", key, e))?;

    let actual = client
        .get(key)
        .map_err(|e| format!("GET {} failed: {}", key, e))?;
    match actual.as_deref() {
        Some(v) if v == expected => {}
        Some(v) => return Err(format!("GET {}: expected {:?}, got {:?}", key, expected, v)),
        None => return Err(format!("GET {}: expected {:?}, got nil", key, expected)),
    }

    let kind = client
        .key_type(key)
        .map_err(|e| format!("TYPE {} failed: {}", key, e))?;
    if kind != "string" {
        return Err(format!("TYPE {}: expected \"string\", got {:?}", key, kind));
    }

    let mut detail = format!("SET/GET {} round-trip ok", key);
    match client.ttl(key) {
        Ok(ttl) if ttl > 0 => {}
        Ok(ttl) => detail.push_str(&format!(" (ttl {}: expiry not applied)", ttl)),
        Err(e) => detail.push_str(&format!(" (ttl unknown: {})", e)),
    }
    Ok(detail)
}

/// Probe keys without an expiry will never go away on their own.
///
/// Every probe is written with `EX`, so a key that still has a TTL is either
/// in flight in a concurrent run or about to expire; only keys reporting
/// TTL -1 are flagged.
pub fn stale_probes(exec: &dyn Executor, cfg: &VerifyConfig) -> CheckResult {
    let name = CheckKind::StaleProbes.name();
    let pattern = cfg.probe_pattern();
    let client = CacheClient::new(exec, cfg);

    let keys = match client.keys(&pattern) {
        Ok(keys) => keys,
        Err(e) => return CheckResult::warn(name, format!("could not list {}: {}", pattern, e)),
    };
    if keys.is_empty() {
        return CheckResult::pass(name, format!("no keys match {}", pattern));
    }

    let mut leftover = Vec::new();
    for key in &keys {
        match client.ttl(key) {
            Ok(-1) => leftover.push(key.as_str()),
            Ok(ttl) => debug!(key = %key, ttl, "probe key still expiring"),
            Err(e) => debug!(key = %key, error = %e, "ttl unavailable"),
        }
    }

    if leftover.is_empty() {
        return CheckResult::pass(
            name,
            format!("no leftover probe keys ({} expiring on their own)", keys.len()),
        );
    }
    let mut listed = leftover[..leftover.len().min(MAX_LISTED_KEYS)].join(", ");
    if leftover.len() > MAX_LISTED_KEYS {
        listed.push_str(", ...");
    }
    CheckResult::warn(
        name,
        format!("{} leftover probe key(s) without expiry: {}", leftover.len(), listed),
    )
}

/// Informational only: anything short of a parsed version is WARN.
pub fn server_info(exec: &dyn Executor, cfg: &VerifyConfig) -> CheckResult {
    let name = CheckKind::ServerInfo.name();
    let raw = match CacheClient::new(exec, cfg).info("server") {
        Ok(raw) => raw,
        Err(e) => return CheckResult::warn(name, format!("INFO failed: {}", e)),
    };

    let field = |key: &str| {
        raw.lines()
            .filter_map(|l| l.trim().split_once(':'))
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.trim().to_string())
    };

    let Some(version) = field("redis_version") else {
        return CheckResult::warn(name, "unrecognised INFO reply");
    };
    let mut detail = format!("version {}", version);
    if let Some(mode) = field("redis_mode") {
        detail.push_str(&format!(" ({})", mode));
    }
    if let Some(days) = field("uptime_in_days") {
        detail.push_str(&format!(", up {} day(s)", days));
    }
    CheckResult::pass(name, detail)
}
