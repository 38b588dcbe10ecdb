pub mod cache;
pub mod container;
pub mod executor;
pub mod host;
pub mod output;
pub mod probe;
pub mod report;
pub mod verifier;

#[cfg(test)]
pub mod testing;

use clap::ValueEnum;
use tracing::info;

use crate::config::VerifyConfig;
use crate::utils::{CancelFlag, Result};
use executor::{Executor, SystemExecutor};
use report::{CheckResult, Overall};
use verifier::Verifier;

/// Every check the verifier knows, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum CheckKind {
    ContainerRunning,
    PortListening,
    Connectivity,
    ReadWrite,
    StaleProbes,
    ServerInfo,
    ImageProvenance,
    PersistenceVolume,
}

impl CheckKind {
    pub const ALL: [CheckKind; 8] = [
        CheckKind::ContainerRunning,
        CheckKind::PortListening,
        CheckKind::Connectivity,
        CheckKind::ReadWrite,
        CheckKind::StaleProbes,
        CheckKind::ServerInfo,
        CheckKind::ImageProvenance,
        CheckKind::PersistenceVolume,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CheckKind::ContainerRunning => "container-running",
            CheckKind::PortListening => "port-listening",
            CheckKind::Connectivity => "connectivity",
            CheckKind::ReadWrite => "read-write",
            CheckKind::StaleProbes => "stale-probes",
            CheckKind::ServerInfo => "server-info",
            CheckKind::ImageProvenance => "image-provenance",
            CheckKind::PersistenceVolume => "persistence-volume",
        }
    }

    /// Check whose PASS this one needs before it is worth running.
    pub fn prerequisite(self) -> Option<CheckKind> {
        match self {
            CheckKind::ReadWrite | CheckKind::StaleProbes | CheckKind::ServerInfo => {
                Some(CheckKind::Connectivity)
            }
            _ => None,
        }
    }

    /// Whether running this check shells out to the control-plane client.
    pub fn uses_control_plane(self, cfg: &VerifyConfig) -> bool {
        match self {
            CheckKind::ContainerRunning
            | CheckKind::ImageProvenance
            | CheckKind::PersistenceVolume => true,
            CheckKind::PortListening => false,
            CheckKind::Connectivity
            | CheckKind::ReadWrite
            | CheckKind::StaleProbes
            | CheckKind::ServerInfo => cfg.cache_host.is_none(),
        }
    }

    pub fn run(self, exec: &dyn Executor, cfg: &VerifyConfig) -> CheckResult {
        match self {
            CheckKind::ContainerRunning => container::container_running(exec, cfg),
            CheckKind::PortListening => host::port_listening(exec, cfg),
            CheckKind::Connectivity => probe::connectivity(exec, cfg),
            CheckKind::ReadWrite => probe::read_write(exec, cfg),
            CheckKind::StaleProbes => probe::stale_probes(exec, cfg),
            CheckKind::ServerInfo => probe::server_info(exec, cfg),
            CheckKind::ImageProvenance => container::image_provenance(exec, cfg),
            CheckKind::PersistenceVolume => container::persistence_volume(exec, cfg),
        }
    }
}

pub fn run_verify(cfg: &VerifyConfig, json: bool, cancel: CancelFlag) -> Result<Overall> {
    let checks = cfg.checks();
    let exec = SystemExecutor;
    let verifier = Verifier::new(&exec, cfg, cancel);

    info!(service = %cfg.target, checks = checks.len(), "checking control plane");
    verifier.preflight(&checks)?;

    info!("running checks");
    let report = verifier.run(&checks);

    output::display(&report, json)?;
    Ok(report.overall())
}
