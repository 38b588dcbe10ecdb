//! Scripted stand-in for `docker`, `ss` and `redis-cli`, backed by an
//! in-memory key store. Knobs switch individual failure modes on.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::check::executor::{CommandOutput, ExecutionError, Executor, ExternalCommand};

pub struct FakePlane {
    pub docker_missing: bool,
    pub running: bool,
    pub listening: bool,
    pub cache_timeout: bool,
    pub auth_error: bool,
    pub corrupt_get: bool,
    pub fail_del: bool,
    pub images: Vec<String>,
    pub volumes: Vec<String>,
    pub info: String,
    /// key -> (value, ttl); ttl -1 means no expiry
    pub store: RefCell<BTreeMap<String, (String, i64)>>,
    pub calls: RefCell<Vec<Vec<String>>>,
}

impl FakePlane {
    pub fn healthy() -> Self {
        Self {
            docker_missing: false,
            running: true,
            listening: true,
            cache_timeout: false,
            auth_error: false,
            corrupt_get: false,
            fail_del: false,
            images: vec!["registry.example.com/redis:7.2".into(), "postgres:16".into()],
            volumes: vec!["backend_redis_data".into(), "backend_pg_data".into()],
            info: concat!(
                "# Server\r\n",
                "redis_version:7.2.4\r\n",
                "redis_mode:standalone\r\n",
                "uptime_in_seconds:259200\r\n",
                "uptime_in_days:3\r\n",
            )
            .into(),
            store: RefCell::new(BTreeMap::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// A key written without expiry, like a plain `SET`.
    pub fn seed(self, key: &str, value: &str) -> Self {
        self.seed_with_ttl(key, value, -1)
    }

    pub fn seed_with_ttl(self, key: &str, value: &str, ttl: i64) -> Self {
        self.store
            .borrow_mut()
            .insert(key.to_string(), (value.to_string(), ttl));
        self
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.store.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.store.borrow().keys().cloned().collect()
    }

    /// How many invocations contained `needle` as an argument.
    pub fn calls_with(&self, needle: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|argv| argv.iter().any(|a| a == needle))
            .count()
    }

    fn docker(
        &self,
        args: &[String],
        cmd: &ExternalCommand,
    ) -> Result<CommandOutput, ExecutionError> {
        match args.first().map(String::as_str) {
            Some("version") => Ok(ok("27.0.1\n")),
            Some("ps") => Ok(ok(if self.running {
                "redis|Up 2 hours (healthy)\npostgres|Up 2 hours\n"
            } else {
                "redis|Exited (137) 5 minutes ago\npostgres|Up 2 hours\n"
            })),
            Some("images") => Ok(ok(&lines(&self.images))),
            Some("volume") => Ok(ok(&lines(&self.volumes))),
            Some("exec") if !self.running => Ok(CommandOutput {
                stdout: String::new(),
                stderr: "Error response from daemon: container is not running\n".into(),
                exit_code: 1,
                signal: None,
            }),
            Some("exec") => self.redis_cli(&args[2..], cmd),
            _ => Ok(failed(125, "unknown command\n")),
        }
    }

    fn redis_cli(
        &self,
        args: &[String],
        cmd: &ExternalCommand,
    ) -> Result<CommandOutput, ExecutionError> {
        if self.cache_timeout {
            return Err(ExecutionError::Timeout { timeout: cmd.timeout });
        }
        if self.auth_error {
            return Ok(ok("NOAUTH Authentication required.\n"));
        }

        // skip "redis-cli" and connection options
        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "-h" | "-p" | "-a" => i += 2,
                "--no-auth-warning" => i += 1,
                _ => break,
            }
        }
        let rest = &args[i..];
        let arg = |n: usize| rest.get(n).cloned().unwrap_or_default();
        let mut store = self.store.borrow_mut();

        let reply = match arg(0).as_str() {
            "PING" => "PONG".to_string(),
            "SET" => {
                let ttl = match arg(3).as_str() {
                    "EX" => arg(4).parse().unwrap_or(-1),
                    _ => -1,
                };
                store.insert(arg(1), (arg(2), ttl));
                "OK".to_string()
            }
            "GET" => match store.get(&arg(1)) {
                Some((v, _)) if self.corrupt_get => format!("{v}-corrupted"),
                Some((v, _)) => v.clone(),
                None => String::new(),
            },
            "DEL" if self.fail_del => return Ok(failed(1, "READONLY replica\n")),
            "DEL" => (store.remove(&arg(1)).is_some() as u8).to_string(),
            "EXISTS" => (store.contains_key(&arg(1)) as u8).to_string(),
            "TYPE" => (if store.contains_key(&arg(1)) { "string" } else { "none" }).to_string(),
            "TTL" => store.get(&arg(1)).map_or(-2, |(_, ttl)| *ttl).to_string(),
            "KEYS" => {
                let prefix = arg(1).trim_end_matches('*').to_string();
                store
                    .keys()
                    .filter(|k| k.starts_with(&prefix))
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            "INFO" => self.info.clone(),
            other => format!("ERR unknown command '{other}'"),
        };
        Ok(ok(&format!("{reply}\n")))
    }

    fn ss(&self) -> CommandOutput {
        let mut out = String::from("LISTEN 0      4096         0.0.0.0:5432       0.0.0.0:*\n");
        if self.listening {
            out.push_str("LISTEN 0      511          0.0.0.0:6379       0.0.0.0:*\n");
            out.push_str("LISTEN 0      511             [::]:6379          [::]:*\n");
        }
        ok(&out)
    }
}

impl Executor for FakePlane {
    fn execute(&self, cmd: &ExternalCommand) -> Result<CommandOutput, ExecutionError> {
        self.calls.borrow_mut().push(cmd.argv.clone());
        let (program, args) = cmd.argv.split_first().ok_or(ExecutionError::EmptyCommand)?;
        match program.as_str() {
            "docker" if self.docker_missing => {
                Err(ExecutionError::NotFound { program: program.clone() })
            }
            "docker" => self.docker(args, cmd),
            "ss" => Ok(self.ss()),
            "redis-cli" => self.redis_cli(&cmd.argv, cmd),
            _ => Err(ExecutionError::NotFound { program: program.clone() }),
        }
    }
}

fn ok(stdout: &str) -> CommandOutput {
    CommandOutput { stdout: stdout.to_string(), ..Default::default() }
}

fn failed(exit_code: i32, stderr: &str) -> CommandOutput {
    CommandOutput { exit_code, stderr: stderr.to_string(), ..Default::default() }
}

fn lines(items: &[String]) -> String {
    items.iter().map(|s| format!("{s}\n")).collect()
}
