//! Runs the declared checks in order and builds the report.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::check::executor::{ExecutionError, Executor, ExternalCommand};
use crate::check::report::{CheckResult, Report, Status};
use crate::check::CheckKind;
use crate::config::VerifyConfig;
use crate::utils::{CancelFlag, ProbeError, Result};

pub const SKIPPED_PREREQUISITE: &str = "skipped: prerequisite failed";
pub const SKIPPED_CANCELLED: &str = "skipped: cancelled";

pub struct Verifier<'a> {
    exec: &'a dyn Executor,
    cfg: &'a VerifyConfig,
    cancel: CancelFlag,
}

impl<'a> Verifier<'a> {
    pub fn new(exec: &'a dyn Executor, cfg: &'a VerifyConfig, cancel: CancelFlag) -> Self {
        Self { exec, cfg, cancel }
    }

    /// Fail fast when the control-plane client cannot be started at all.
    /// A non-zero exit (daemon down) is left for the checks to report.
    pub fn preflight(&self, checks: &[CheckKind]) -> Result<()> {
        if !checks.iter().any(|k| k.uses_control_plane(self.cfg)) {
            debug!("no check needs the control plane");
            return Ok(());
        }

        let bin = self.cfg.docker_bin.as_str();
        let cmd = ExternalCommand::new(
            [bin, "version", "--format", "{{.Client.Version}}"],
            self.cfg.timeout,
        );
        match self.exec.execute(&cmd) {
            Ok(out) => {
                debug!(
                    client = %out.stdout.trim(),
                    exit_code = out.exit_code,
                    "control plane client found"
                );
                Ok(())
            }
            Err(ExecutionError::Timeout { .. }) => {
                warn!("control plane client is slow to answer; continuing");
                Ok(())
            }
            Err(e) => Err(ProbeError::ControlPlane(e.to_string())),
        }
    }

    /// Run every check once. Results follow `checks` order; a failure never
    /// stops later checks, only its dependents are skipped.
    ///
    /// Once cancelled, checks that have not completed are reported as
    /// skipped, including the one whose command was interrupted.
    pub fn run(&self, checks: &[CheckKind]) -> Report {
        let mut done: HashMap<CheckKind, CheckResult> = HashMap::new();
        let results = checks
            .iter()
            .map(|&kind| self.resolve(kind, checks, &mut done))
            .collect();

        Report::new(self.cfg.target.clone(), results)
    }

    /// Result for `kind`, running its prerequisite first when needed.
    /// Prerequisites that were not declared are not enforced.
    fn resolve(
        &self,
        kind: CheckKind,
        declared: &[CheckKind],
        done: &mut HashMap<CheckKind, CheckResult>,
    ) -> CheckResult {
        if let Some(r) = done.get(&kind) {
            return r.clone();
        }

        let result = match kind.prerequisite().filter(|p| declared.contains(p)) {
            _ if self.cancel.is_cancelled() => CheckResult::warn(kind.name(), SKIPPED_CANCELLED),
            Some(pre) if self.resolve(pre, declared, done).status() != Status::Pass => {
                self.skipped(kind, SKIPPED_PREREQUISITE)
            }
            _ => self.run_one(kind),
        };

        match result.status() {
            Status::Pass => debug!(check = result.name(), detail = result.detail(), "pass"),
            Status::Warn => warn!(check = result.name(), detail = result.detail(), "warn"),
            Status::Fail => warn!(check = result.name(), detail = result.detail(), "fail"),
        }
        done.insert(kind, result.clone());
        result
    }

    /// A cancel that lands while the check runs wins over its outcome: the
    /// signal also reaches the child, so the result describes the interrupt.
    fn run_one(&self, kind: CheckKind) -> CheckResult {
        info!(check = kind.name(), "running");
        let result = kind.run(self.exec, self.cfg);
        if self.cancel.is_cancelled() {
            debug!(check = kind.name(), discarded = result.detail(), "interrupted");
            return CheckResult::warn(kind.name(), SKIPPED_CANCELLED);
        }
        result
    }

    /// The prerequisite may itself have been cut short by a cancel.
    fn skipped(&self, kind: CheckKind, reason: &str) -> CheckResult {
        if self.cancel.is_cancelled() {
            CheckResult::warn(kind.name(), SKIPPED_CANCELLED)
        } else {
            CheckResult::warn(kind.name(), reason)
        }
    }
}
