//! Control-plane checks
//! 来源：docker ps / docker images / docker volume ls

use crate::check::executor::{CommandOutput, Executor, ExternalCommand};
use crate::check::report::CheckResult;
use crate::check::CheckKind;
use crate::config::VerifyConfig;

// ── docker ps ───────────────────────────────────────────────────────────────

/// PASS when the target's status starts with `Up`; everything else is FAIL.
pub fn container_running(exec: &dyn Executor, cfg: &VerifyConfig) -> CheckResult {
    let name = CheckKind::ContainerRunning.name();
    let target = &cfg.target;
    let filter = format!("name={}", target);
    let args = [
        "ps",
        "-a",
        "--filter",
        filter.as_str(),
        "--format",
        "{{.Names}}|{{.Status}}",
    ];
    let out = match docker(exec, cfg, &args) {
        Ok(out) => out,
        Err(detail) => return CheckResult::fail(name, format!("{}: {}", target, detail)),
    };

    match find_status(&out.stdout, target) {
        Some(status) if status.starts_with("Up") => {
            CheckResult::pass(name, format!("{} is {}", target, status))
        }
        Some(status) => {
            CheckResult::fail(name, format!("{} is not running ({})", target, status))
        }
        None => CheckResult::fail(name, format!("container {} not found", target)),
    }
}

/// `--filter name=` is a substring match, so pick the exact row.
fn find_status<'o>(stdout: &'o str, target: &str) -> Option<&'o str> {
    stdout
        .lines()
        .filter_map(|l| l.split_once('|'))
        .find(|(n, _)| n.trim() == target)
        .map(|(_, s)| s.trim())
}

// ── docker images ───────────────────────────────────────────────────────────

pub fn image_provenance(exec: &dyn Executor, cfg: &VerifyConfig) -> CheckResult {
    let name = CheckKind::ImageProvenance.name();
    let Some(registry) = cfg.registry.as_deref() else {
        return CheckResult::warn(name, "no private registry configured");
    };
    let out = match docker(exec, cfg, &["images", "--format", "{{.Repository}}:{{.Tag}}"]) {
        Ok(out) => out,
        Err(detail) => {
            return CheckResult::warn(name, format!("image listing failed: {}", detail))
        }
    };

    let local: Vec<&str> = out
        .stdout
        .lines()
        .map(str::trim)
        .filter(|r| image_name(r) == cfg.image)
        .collect();
    let expected = format!("{}/", registry.trim_end_matches('/'));

    match local.iter().find(|r| r.starts_with(&expected)) {
        Some(found) => CheckResult::pass(name, format!("{} pulled from {}", found, registry)),
        None if local.is_empty() => {
            CheckResult::warn(name, format!("no local image named {}", cfg.image))
        }
        None => CheckResult::warn(
            name,
            format!("no {} image from {} (local: {})", cfg.image, registry, local.join(", ")),
        ),
    }
}

/// `host:5000/team/redis:7` → `redis`
fn image_name(reference: &str) -> &str {
    let last = reference.rsplit('/').next().unwrap_or(reference);
    last.split(':').next().unwrap_or(last)
}

// ── docker volume ls ────────────────────────────────────────────────────────

pub fn persistence_volume(exec: &dyn Executor, cfg: &VerifyConfig) -> CheckResult {
    let name = CheckKind::PersistenceVolume.name();
    let out = match docker(exec, cfg, &["volume", "ls", "--format", "{{.Name}}"]) {
        Ok(out) => out,
        Err(detail) => {
            return CheckResult::warn(name, format!("volume listing failed: {}", detail))
        }
    };

    // compose prefixes volumes with the project name
    let suffix = format!("_{}", cfg.volume);
    match out
        .stdout
        .lines()
        .map(str::trim)
        .find(|v| *v == cfg.volume || v.ends_with(&suffix))
    {
        Some(found) => CheckResult::pass(name, format!("volume {} present", found)),
        None => CheckResult::warn(
            name,
            format!("volume {} not found; data is not persisted", cfg.volume),
        ),
    }
}

// ── 工具 ────────────────────────────────────────────────────────────────────

/// Run a docker sub-command; executor errors and non-zero exits become text.
fn docker(
    exec: &dyn Executor,
    cfg: &VerifyConfig,
    args: &[&str],
) -> Result<CommandOutput, String> {
    let mut argv = vec![cfg.docker_bin.as_str()];
    argv.extend_from_slice(args);
    let out = exec
        .execute(&ExternalCommand::new(argv, cfg.timeout))
        .map_err(|e| e.to_string())?;
    if !out.success() {
        return Err(out.failure());
    }
    Ok(out)
}
