//! Basilica API models shared by the client and its callers.

use basilica_core::query::QueryParams;
use basilica_core::{RentalState, SshAccess};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Health check response returned by `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthCheckResponse {
    /// Service status label.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Server timestamp.
    pub timestamp: DateTime<Utc>,
    /// Number of healthy validators.
    pub healthy_validators: usize,
    /// Total number of validators.
    pub total_validators: usize,
}

impl HealthCheckResponse {
    /// Returns true if the service reports itself healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy") || self.status.eq_ignore_ascii_case("ok")
    }
}

/// GPU specification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GpuSpec {
    /// GPU model name.
    pub name: String,
    /// GPU memory in GB.
    pub memory_gb: u32,
    /// CUDA compute capability.
    pub compute_capability: String,
}

/// CPU specification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CpuSpec {
    /// Number of cores.
    pub cores: u32,
    /// CPU model name.
    pub model: String,
    /// System memory in GB.
    pub memory_gb: u32,
}

/// Hardware description of an executor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutorDetails {
    /// Executor identifier.
    pub id: String,
    /// GPUs attached to the executor.
    #[serde(default)]
    pub gpu_specs: Vec<GpuSpec>,
    /// CPU and memory of the executor.
    pub cpu_specs: CpuSpec,
    /// Location or region, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl ExecutorDetails {
    /// Number of GPUs on the executor.
    #[must_use]
    pub fn gpu_count(&self) -> usize {
        self.gpu_specs.len()
    }
}

/// Availability of an executor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityInfo {
    /// Time the executor stays available until, if bounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_until: Option<DateTime<Utc>>,
    /// Verification score between 0 and 1.
    pub verification_score: f64,
    /// Uptime percentage.
    pub uptime_percentage: f64,
}

/// Executor available for rent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailableExecutor {
    /// Executor hardware.
    pub executor: ExecutorDetails,
    /// Availability information.
    pub availability: AvailabilityInfo,
}

/// Response of `GET /executors`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListExecutorsResponse {
    /// Executors matching the query.
    pub available_executors: Vec<AvailableExecutor>,
    /// Total number of matches.
    pub total_count: usize,
}

/// Parameters supported by the `/executors` list endpoint.
#[derive(Debug, Default, Clone)]
pub struct ExecutorListParams {
    /// Only return executors that can be rented now.
    pub available: Option<bool>,
    /// Minimum GPU memory in GB.
    pub min_gpu_memory: Option<u32>,
    /// GPU type filter (e.g. `h100`).
    pub gpu_type: Option<String>,
    /// Minimum number of GPUs.
    pub min_gpu_count: Option<u32>,
}

impl ExecutorListParams {
    /// Convert the parameters into URL query pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryParams::new();
        params.push_opt("available", self.available);
        params.push_opt("min_gpu_memory", self.min_gpu_memory);
        params.push_opt("gpu_type", self.gpu_type.as_deref());
        params.push_opt("min_gpu_count", self.min_gpu_count);

        params.into_pairs()
    }
}

/// GPU requirements used when the API picks the executor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GpuRequirements {
    /// Number of GPUs.
    pub gpu_count: u32,
    /// GPU type, any type when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_type: Option<String>,
    /// Minimum memory per GPU in GB.
    #[serde(default)]
    pub min_memory_gb: u32,
}

/// How the executor for a rental is chosen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutorSelection {
    /// Rent a specific executor.
    ExecutorId {
        /// Executor identifier.
        executor_id: String,
    },
    /// Let the API pick an executor matching the requirements.
    GpuRequirements {
        /// Requirements to match.
        gpu_requirements: GpuRequirements,
    },
}

/// Port forwarded from the host into the container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortMapping {
    /// Port inside the container.
    pub container_port: u32,
    /// Port on the host.
    pub host_port: u32,
    /// `tcp` or `udp`.
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

fn default_protocol() -> String {
    "tcp".to_string()
}

impl PortMapping {
    /// Create a TCP port mapping.
    #[must_use]
    pub fn tcp(container_port: u32, host_port: u32) -> Self {
        Self {
            container_port,
            host_port,
            protocol: default_protocol(),
        }
    }
}

/// Resources reserved for the rental container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceRequirements {
    /// CPU cores.
    pub cpu_cores: f64,
    /// Memory in MB.
    pub memory_mb: i64,
    /// Storage in MB.
    pub storage_mb: i64,
    /// Number of GPUs.
    pub gpu_count: u32,
    /// Accepted GPU types.
    #[serde(default)]
    pub gpu_types: Vec<String>,
}

impl Default for ResourceRequirements {
    fn default() -> Self {
        Self {
            cpu_cores: 1.0,
            memory_mb: 1024,
            storage_mb: 10240,
            gpu_count: 0,
            gpu_types: Vec::new(),
        }
    }
}

/// Host directory mounted into the container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeMount {
    /// Path on the host.
    pub host_path: String,
    /// Path inside the container.
    pub container_path: String,
    /// Mount read-only.
    #[serde(default)]
    pub read_only: bool,
}

/// Body of `POST /rentals`.
///
/// Usually assembled with [`crate::rental::StartRentalOptions`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StartRentalRequest {
    /// Executor selection strategy.
    pub executor_selection: ExecutorSelection,
    /// Container image to run.
    pub container_image: String,
    /// OpenSSH public key installed in the container (empty with `no_ssh`).
    pub ssh_public_key: String,
    /// Environment variables.
    #[serde(default)]
    pub environment: HashMap<String, String>,
    /// Port mappings.
    #[serde(default)]
    pub ports: Vec<PortMapping>,
    /// Resource requirements.
    #[serde(default)]
    pub resources: ResourceRequirements,
    /// Command to run instead of the image entrypoint.
    #[serde(default)]
    pub command: Vec<String>,
    /// Volume mounts.
    #[serde(default)]
    pub volumes: Vec<VolumeMount>,
    /// Disable SSH access.
    #[serde(default)]
    pub no_ssh: bool,
}

/// Container created for a rental.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Container ID.
    pub container_id: String,
    /// Container name.
    pub container_name: String,
    /// Container status.
    pub status: String,
}

/// Response of `POST /rentals`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RentalResponse {
    /// Identifier of the new rental.
    pub rental_id: String,
    /// SSH credentials in `user@host:port` form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_credentials: Option<String>,
    /// Container details.
    pub container_info: ContainerInfo,
}

/// Lifecycle state plus an optional human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "StatusRepr")]
pub struct RentalStatusInfo {
    /// Lifecycle state.
    pub state: RentalState,
    /// Provider message, e.g. a failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// The API sends either a bare label or an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusRepr {
    Label(RentalState),
    Detailed {
        state: RentalState,
        #[serde(default)]
        message: Option<String>,
    },
}

impl From<StatusRepr> for RentalStatusInfo {
    fn from(repr: StatusRepr) -> Self {
        match repr {
            StatusRepr::Label(state) => Self {
                state,
                message: None,
            },
            StatusRepr::Detailed { state, message } => Self { state, message },
        }
    }
}

impl From<RentalState> for RentalStatusInfo {
    fn from(state: RentalState) -> Self {
        Self {
            state,
            message: None,
        }
    }
}

/// Snapshot of a rental returned by `GET /rentals/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RentalStatus {
    /// Rental identifier.
    pub rental_id: String,
    /// Current lifecycle status.
    pub status: RentalStatusInfo,
    /// Executor the rental runs on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor: Option<ExecutorDetails>,
    /// SSH credentials in `user@host:port` form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_credentials: Option<String>,
    /// Structured SSH access, when the API provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_access: Option<SshAccess>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl RentalStatus {
    /// Create a minimal snapshot with only an identifier and a state.
    #[must_use]
    pub fn new(rental_id: impl Into<String>, state: RentalState) -> Self {
        Self {
            rental_id: rental_id.into(),
            status: state.into(),
            executor: None,
            ssh_credentials: None,
            ssh_access: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> &RentalState {
        &self.status.state
    }

    /// SSH connection details, if the rental exposes any.
    ///
    /// Prefers the structured descriptor and falls back to parsing
    /// `ssh_credentials`. Unparseable credentials yield `None`.
    #[must_use]
    pub fn ssh_access(&self) -> Option<SshAccess> {
        if let Some(access) = &self.ssh_access {
            return Some(access.clone());
        }
        self.ssh_credentials
            .as_deref()
            .and_then(|credentials| credentials.parse().ok())
    }
}

/// Parameters supported by the `/rentals` list endpoint.
#[derive(Debug, Default, Clone)]
pub struct RentalListParams {
    /// Filter by state.
    pub status: Option<RentalState>,
    /// Filter by GPU type.
    pub gpu_type: Option<String>,
    /// Minimum number of GPUs.
    pub min_gpu_count: Option<u32>,
}

impl RentalListParams {
    /// Convert the parameters into URL query pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryParams::new();
        params.push_opt("status", self.status.as_ref());
        params.push_opt("gpu_type", self.gpu_type.as_deref());
        params.push_opt("min_gpu_count", self.min_gpu_count);

        params.into_pairs()
    }
}

/// Entry of `GET /rentals`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RentalListItem {
    /// Rental identifier.
    pub rental_id: String,
    /// Executor identifier.
    pub executor_id: String,
    /// Container identifier.
    pub container_id: String,
    /// Lifecycle state.
    pub state: RentalState,
    /// Creation time as reported by the API.
    pub created_at: String,
    /// Miner hosting the executor.
    pub miner_id: String,
    /// Container image.
    pub container_image: String,
    /// GPUs of the rental.
    #[serde(default)]
    pub gpu_specs: Vec<GpuSpec>,
    /// Whether SSH credentials are available.
    #[serde(default)]
    pub has_ssh: bool,
    /// CPU specification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_specs: Option<CpuSpec>,
    /// Location or region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Response of `GET /rentals`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListRentalsResponse {
    /// Rentals owned by the caller.
    pub rentals: Vec<RentalListItem>,
    /// Total number of rentals.
    pub total_count: usize,
}

/// Parameters of `GET /rentals/{id}/logs`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogParams {
    /// Keep the stream open.
    pub follow: bool,
    /// Only return the last N lines.
    pub tail: Option<u32>,
}

impl LogParams {
    /// Convert the parameters into URL query pairs.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = QueryParams::new();
        params.push_flag("follow", self.follow);
        params.push_opt("tail", self.tail);

        params.into_pairs()
    }
}
