//! Host-level socket check
//! 来源：ss -ltnH

use crate::check::executor::{Executor, ExternalCommand};
use crate::check::report::CheckResult;
use crate::check::CheckKind;
use crate::config::VerifyConfig;

/// PASS when the port is listening on the host. Never FAIL: a cache that is
/// only published on the container network is a valid deployment.
pub fn port_listening(exec: &dyn Executor, cfg: &VerifyConfig) -> CheckResult {
    let name = CheckKind::PortListening.name();
    let cmd = ExternalCommand::new([cfg.ss_bin.as_str(), "-ltnH"], cfg.timeout);

    let out = match exec.execute(&cmd) {
        Ok(out) if out.success() => out,
        Ok(out) => {
            return CheckResult::warn(
                name,
                format!("socket listing failed: {}", out.failure()),
            )
        }
        Err(e) => return CheckResult::warn(name, format!("socket listing unavailable: {}", e)),
    };

    let addrs = listening_on(&out.stdout, cfg.port);
    if addrs.is_empty() {
        CheckResult::warn(
            name,
            format!(
                concat!(
                    "port {} not listening on host; ",
                    "service may be reachable only through the container network"
                ),
                cfg.port
            ),
        )
    } else {
        CheckResult::pass(name, format!("listening on {}", addrs.join(", ")))
    }
}

/// Local addresses bound to `port`, taken from the 4th column of `ss` output.
fn listening_on(stdout: &str, port: u16) -> Vec<String> {
    let port = port.to_string();
    stdout
        .lines()
        .filter_map(|l| l.split_whitespace().nth(3))
        .filter(|local| local.rsplit_once(':').map(|(_, p)| p == port).unwrap_or(false))
        .map(String::from)
        .collect()
}
