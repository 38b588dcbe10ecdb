//! Cache command client. Every store command is one `redis-cli` invocation,
//! run either through `docker exec` or directly against a host.

use thiserror::Error;
use tracing::{debug, warn};

use crate::check::executor::{ExecutionError, Executor, ExternalCommand};
use crate::config::VerifyConfig;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    Exec(#[from] ExecutionError),

    /// Non-zero exit or death by signal, already described.
    #[error("{0}")]
    Command(String),

    #[error("error reply: {0}")]
    Reply(String),

    #[error("unexpected reply to {command}: {reply:?}")]
    Unexpected { command: String, reply: String },
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

pub struct CacheClient<'a> {
    exec: &'a dyn Executor,
    cfg: &'a VerifyConfig,
}

impl<'a> CacheClient<'a> {
    pub fn new(exec: &'a dyn Executor, cfg: &'a VerifyConfig) -> Self {
        Self { exec, cfg }
    }

    pub fn command(&self, args: &[&str]) -> ExternalCommand {
        let cfg = self.cfg;
        let mut argv: Vec<String> = match &cfg.cache_host {
            Some(host) => vec!["redis-cli".into(), "-h".into(), host.clone()],
            None => vec![
                cfg.docker_bin.clone(),
                "exec".into(),
                cfg.target.clone(),
                "redis-cli".into(),
            ],
        };
        argv.push("-p".into());
        argv.push(cfg.port.to_string());
        if let Some(pw) = &cfg.password {
            argv.push("--no-auth-warning".into());
            argv.push("-a".into());
            argv.push(pw.clone());
        }
        argv.extend(args.iter().map(|s| s.to_string()));
        ExternalCommand { argv, timeout: cfg.timeout }
    }

    /// Run one store command and return its trimmed reply.
    fn call(&self, args: &[&str]) -> CacheResult<String> {
        let out = self.exec.execute(&self.command(args))?;
        if !out.success() {
            return Err(CacheError::Command(out.failure()));
        }
        let reply = out.stdout.trim().to_string();
        if is_error_reply(&reply) {
            return Err(CacheError::Reply(reply));
        }
        Ok(reply)
    }

    pub fn ping(&self) -> CacheResult<String> {
        self.call(&["PING"])
    }

    pub fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
        let ttl = ttl_secs.to_string();
        let reply = self.call(&["SET", key, value, "EX", &ttl])?;
        expect_reply("SET", reply, "OK").map(|_| ())
    }

    /// `None` when the key does not exist.
    pub fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let reply = self.call(&["GET", key])?;
        Ok(if reply.is_empty() { None } else { Some(reply) })
    }

    pub fn del(&self, key: &str) -> CacheResult<u64> {
        let reply = self.call(&["DEL", key])?;
        parse_int("DEL", &reply)
    }

    pub fn exists(&self, key: &str) -> CacheResult<bool> {
        let reply = self.call(&["EXISTS", key])?;
        Ok(parse_int::<u64>("EXISTS", &reply)? > 0)
    }

    pub fn key_type(&self, key: &str) -> CacheResult<String> {
        self.call(&["TYPE", key])
    }

    /// Seconds to live; -1 no expiry, -2 missing key.
    pub fn ttl(&self, key: &str) -> CacheResult<i64> {
        let reply = self.call(&["TTL", key])?;
        parse_int("TTL", &reply)
    }

    pub fn keys(&self, pattern: &str) -> CacheResult<Vec<String>> {
        let reply = self.call(&["KEYS", pattern])?;
        Ok(reply
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    pub fn info(&self, section: &str) -> CacheResult<String> {
        self.call(&["INFO", section])
    }
}

fn is_error_reply(reply: &str) -> bool {
    ["ERR", "(error)", "NOAUTH", "WRONGPASS", "WRONGTYPE", "Could not connect"]
        .iter()
        .any(|p| reply.starts_with(p))
}

fn expect_reply(command: &str, reply: String, expected: &str) -> CacheResult<String> {
    if reply == expected {
        Ok(reply)
    } else {
        Err(CacheError::Unexpected { command: command.to_string(), reply })
    }
}

fn parse_int<T: std::str::FromStr>(command: &str, reply: &str) -> CacheResult<T> {
    reply
        .trim_start_matches("(integer)")
        .trim()
        .parse()
        .map_err(|_| CacheError::Unexpected {
            command: command.to_string(),
            reply: reply.to_string(),
        })
}

// ── probe key ───────────────────────────────────────────────────────────────

/// A temporary key owned by one read/write probe.
///
/// The key is deleted by [`ProbeKey::release`]; if the guard is dropped
/// without being released (early return, panic) the delete still happens,
/// best effort, in `Drop`.
pub struct ProbeKey<'c, 'a> {
    client: &'c CacheClient<'a>,
    key: String,
    released: bool,
}

impl<'c, 'a> ProbeKey<'c, 'a> {
    /// Claim a fresh, collision-free key name under `prefix`.
    pub fn new(client: &'c CacheClient<'a>, prefix: &str) -> Self {
        let key = format!("{}probe:{}", prefix, uuid::Uuid::new_v4().simple());
        Self { client, key, released: false }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Delete the key and confirm it is gone.
    pub fn release(mut self) -> CacheResult<()> {
        self.released = true;
        self.client.del(&self.key)?;
        if self.client.exists(&self.key)? {
            return Err(CacheError::Unexpected {
                command: "EXISTS".to_string(),
                reply: "1".to_string(),
            });
        }
        debug!(key = %self.key, "probe key released");
        Ok(())
    }
}

impl Drop for ProbeKey<'_, '_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.client.del(&self.key) {
            warn!(key = %self.key, error = %e, "failed to delete probe key");
        }
    }
}
