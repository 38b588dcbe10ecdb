use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;

const FAKE_DOCKER: &str = r#"#!/bin/sh
store="${FAKE_STORE:?}"
state="${FAKE_STATE:-healthy}"
case "$1" in
  version) echo "27.0.1"; exit 0 ;;
  ps)
    if [ "$state" = "down" ]; then
      echo "redis|Exited (1) 3 seconds ago"
    else
      echo "redis|Up 5 minutes"
    fi
    exit 0 ;;
  images) echo "registry.example.com/redis:7.2"; exit 0 ;;
  volume) echo "backend_redis_data"; exit 0 ;;
  exec) ;;
  *) echo "unknown command: $1" >&2; exit 125 ;;
esac
if [ "$state" = "down" ]; then
  echo "Error response from daemon: container is not running" >&2
  exit 1
fi
shift 3
while [ $# -gt 0 ]; do
  case "$1" in
    -p|-h|-a) shift 2 ;;
    --no-auth-warning) shift ;;
    *) break ;;
  esac
done
cmd="$1"; shift
case "$cmd" in
  PING)
    [ "$state" = "slow" ] && sleep 3
    echo PONG ;;
  SET) printf '%s' "$2" > "$store/$1"; echo OK ;;
  GET) [ -f "$store/$1" ] && cat "$store/$1"; echo ;;
  TYPE) if [ -f "$store/$1" ]; then echo string; else echo none; fi ;;
  TTL) if [ -f "$store/$1" ]; then echo 30; else echo -2; fi ;;
  DEL) if [ -f "$store/$1" ]; then rm -f "$store/$1"; echo 1; else echo 0; fi ;;
  EXISTS) if [ -f "$store/$1" ]; then echo 1; else echo 0; fi ;;
  KEYS) ls "$store" ;;
  INFO) printf '# Server\r\nredis_version:7.2.4\r\nuptime_in_days:1\r\n' ;;
  *) echo "ERR unknown command '$cmd'" ;;
esac
"#;

const FAKE_SS: &str = r#"#!/bin/sh
echo "LISTEN 0      4096         0.0.0.0:5432       0.0.0.0:*"
if [ "${FAKE_STATE:-healthy}" != "noport" ]; then
  echo "LISTEN 0      511          0.0.0.0:6379       0.0.0.0:*"
fi
"#;

/// Scripts are written once, before any test spawns a process.
fn scripts() -> &'static Path {
    static DIR: OnceLock<TempDir> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = TempDir::new().expect("create script dir");
        for (name, body) in [("docker", FAKE_DOCKER), ("ss", FAKE_SS)] {
            let path = dir.path().join(name);
            fs::write(&path, body).expect("write fake script");
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .expect("chmod fake script");
        }
        dir
    })
    .path()
}

pub struct TestEnv {
    store: TempDir,
    scripts: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let scripts = scripts().to_path_buf();
        Self {
            store: TempDir::new().expect("create store dir"),
            scripts,
        }
    }

    pub fn cmd(&self, state: &str) -> Command {
        self.cmd_with_docker(state, &self.scripts.join("docker"))
    }

    pub fn cmd_with_docker(&self, state: &str, docker: &Path) -> Command {
        let mut cmd = Command::cargo_bin("cacheprobe").expect("binary built");
        cmd.env("FAKE_STORE", self.store.path())
            .env("FAKE_STATE", state)
            .env_remove("REDIS_PASSWORD")
            .env_remove("REDIS_PORT")
            .env_remove("REDIS_KEY_PREFIX")
            .env_remove("RUST_LOG")
            .arg("verify")
            .arg("--docker-bin")
            .arg(docker)
            .arg("--ss-bin")
            .arg(self.scripts.join("ss"))
            .args(["--registry", "registry.example.com"]);
        cmd
    }

    pub fn run_json(&self, state: &str, args: &[&str], code: i32) -> Value {
        let out = self
            .cmd(state)
            .arg("--json")
            .args(args)
            .assert()
            .code(code)
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }

    pub fn stored_keys(&self) -> Vec<String> {
        fs::read_dir(self.store.path())
            .expect("read store")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect()
    }
}

pub fn result<'v>(report: &'v Value, name: &str) -> &'v Value {
    report["results"]
        .as_array()
        .and_then(|rs| rs.iter().find(|r| r["name"] == name))
        .unwrap_or_else(|| panic!("no result named {name}"))
}
