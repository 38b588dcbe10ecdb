//! 顶层报告结构体

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Warn,
    Fail,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Pass => write!(f, "PASS"),
            Status::Warn => write!(f, "WARN"),
            Status::Fail => write!(f, "FAIL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Overall {
    Ok,
    Degraded,
    Failed,
}

impl Overall {
    pub fn exit_code(self) -> i32 {
        match self {
            Overall::Ok | Overall::Degraded => 0,
            Overall::Failed => 1,
        }
    }
}

impl fmt::Display for Overall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Overall::Ok => write!(f, "OK"),
            Overall::Degraded => write!(f, "DEGRADED"),
            Overall::Failed => write!(f, "FAILED"),
        }
    }
}

/// Outcome of one check. Fields are read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    name: String,
    status: Status,
    detail: String,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, status: Status, detail: impl Into<String>) -> Self {
        Self { name: name.into(), status, detail: detail.into() }
    }

    pub fn pass(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(name, Status::Pass, detail)
    }

    pub fn warn(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(name, Status::Warn, detail)
    }

    pub fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(name, Status::Fail, detail)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// Aggregated outcome of a run. `overall` is always derived from `results`.
#[derive(Debug, Clone)]
pub struct Report {
    pub target: String,
    pub collected_at: String,
    results: Vec<CheckResult>,
}

impl Report {
    pub fn new(target: impl Into<String>, results: Vec<CheckResult>) -> Self {
        Self {
            target: target.into(),
            collected_at: chrono::Local::now()
                .format("%Y-%m-%d %H:%M:%S %z")
                .to_string(),
            results,
        }
    }

    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn overall(&self) -> Overall {
        overall_of(&self.results)
    }

    pub fn count(&self, status: Status) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

pub fn overall_of(results: &[CheckResult]) -> Overall {
    if results.iter().any(|r| r.status == Status::Fail) {
        Overall::Failed
    } else if results.iter().any(|r| r.status == Status::Warn) {
        Overall::Degraded
    } else {
        Overall::Ok
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("Report", 4)?;
        st.serialize_field("target", &self.target)?;
        st.serialize_field("collected_at", &self.collected_at)?;
        st.serialize_field("overall", &self.overall())?;
        st.serialize_field("results", &self.results)?;
        st.end()
    }
}
