use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Current instant as an ISO-8601 UTC string with millisecond precision.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: String,
    /// Process uptime in seconds.
    pub uptime: f64,
    pub environment: String,
    pub version: &'static str,
}

/// Body of `GET /health/detailed`.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedHealth {
    #[serde(flatten)]
    pub health: HealthStatus,
    pub system: SystemInfo,
    pub process: ProcessInfo,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub platform: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
    pub cpu_cores: usize,
    pub physical_cores: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub uptime: f64,
}

/// Body of the readiness and liveness probes.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeStatus {
    pub status: &'static str,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// Body returned by the MoMo operation endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
}

/// Body of `GET /`.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub success: bool,
    pub message: &'static str,
    pub app: AppInfo,
    pub endpoints: EndpointIndex,
    pub features: Vec<&'static str>,
    pub status: &'static str,
    pub uptime: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub environment: String,
    pub port: u16,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndpointIndex {
    pub health: &'static str,
    pub momo: &'static str,
    pub downloads: &'static str,
    pub metrics: &'static str,
}
