//! Core Basilica domain types.
//!
//! This module provides the rental lifecycle state labels shared by the SDK and its
//! callers, along with the SSH access descriptor handed out for active rentals.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Lifecycle state of a rental as reported by the API.
///
/// Known labels are parsed case-insensitively; anything else is preserved verbatim in
/// [`RentalState::Other`] so newer server-side states do not break deserialization.
///
/// `Other` labels compare exactly as received: `Other("Migrating")` and
/// `Other("migrating")` are different states. Waiting for a provider-defined state
/// needs the label spelled the way the API reports it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RentalState {
    /// Accepted but not yet scheduled
    Pending,
    /// Container is being provisioned on an executor
    Provisioning,
    /// Running and reachable
    Active,
    /// Shutdown in progress
    Stopping,
    /// Stopped by the owner
    Stopped,
    /// Provisioning or execution failed
    Failed,
    /// Terminated by the platform or the owner
    Terminated,
    /// Cancelled before becoming active
    Cancelled,
    /// Provider-defined state not known to this client
    Other(String),
}

/// States from which a rental can never reach another target state.
pub const TERMINAL_FAILURE_STATES: [RentalState; 3] = [
    RentalState::Failed,
    RentalState::Terminated,
    RentalState::Cancelled,
];

impl RentalState {
    /// Returns the canonical label for the state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::Provisioning => "Provisioning",
            Self::Active => "Active",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
            Self::Failed => "Failed",
            Self::Terminated => "Terminated",
            Self::Cancelled => "Cancelled",
            Self::Other(label) => label,
        }
    }

    fn from_label(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "provisioning" => Self::Provisioning,
            "active" => Self::Active,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            "failed" => Self::Failed,
            "terminated" => Self::Terminated,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other(label.to_string()),
        }
    }
}

impl From<String> for RentalState {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<&str> for RentalState {
    fn from(label: &str) -> Self {
        Self::from_label(label)
    }
}

impl From<RentalState> for String {
    fn from(state: RentalState) -> Self {
        match state {
            RentalState::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for RentalState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidRequest(
                "rental state must not be empty".to_string(),
            ));
        }
        Ok(Self::from_label(trimmed))
    }
}

impl fmt::Display for RentalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SSH connection details for an active rental.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshAccess {
    /// Host name or IP address
    pub host: String,
    /// SSH port
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    /// Login user
    #[serde(alias = "username")]
    pub user: String,
}

const fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

impl SshAccess {
    /// Create a new SSH access descriptor.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
        }
    }

    /// Render an `ssh` command line for this rental.
    #[must_use]
    pub fn ssh_command(&self, identity_file: Option<&Path>) -> String {
        match identity_file {
            Some(key) => format!(
                "ssh -i {} {}@{} -p {}",
                key.display(),
                self.user,
                self.host,
                self.port
            ),
            None => format!("ssh {}@{} -p {}", self.user, self.host, self.port),
        }
    }
}

impl FromStr for SshAccess {
    type Err = Error;

    /// Parse credentials in `user@host:port` form.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            Error::ParseError(format!("Invalid SSH credentials `{s}`: {reason}"))
        };

        let (user, host_port) = s.trim().split_once('@').ok_or_else(|| invalid("missing `@`"))?;
        let (host, port) = host_port
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing port"))?;

        if user.is_empty() {
            return Err(invalid("empty user"));
        }
        if host.is_empty() {
            return Err(invalid("empty host"));
        }

        let port: u16 = port.parse().map_err(|_| invalid("port is not a number"))?;
        if port == 0 {
            return Err(invalid("port must be between 1 and 65535"));
        }

        Ok(Self::new(host, port, user))
    }
}

impl fmt::Display for SshAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_rental_state_parse_known_labels() {
        assert_eq!("Active".parse::<RentalState>().unwrap(), RentalState::Active);
        assert_eq!("active".parse::<RentalState>().unwrap(), RentalState::Active);
        assert_eq!(
            "PROVISIONING".parse::<RentalState>().unwrap(),
            RentalState::Provisioning
        );
        assert_eq!(
            "canceled".parse::<RentalState>().unwrap(),
            RentalState::Cancelled
        );
    }

    #[test]
    fn test_rental_state_preserves_unknown_labels() {
        let state: RentalState = "Migrating".parse().unwrap();
        assert_eq!(state, RentalState::Other("Migrating".to_string()));
        assert_eq!(state.to_string(), "Migrating");
    }

    #[test]
    fn test_unknown_labels_compare_exactly() {
        let reported: RentalState = serde_json::from_str("\"Migrating\"").unwrap();
        assert_eq!(reported, "Migrating".parse::<RentalState>().unwrap());
        assert_ne!(reported, "migrating".parse::<RentalState>().unwrap());

        // Known labels normalise regardless of case.
        assert_eq!(
            "ACTIVE".parse::<RentalState>().unwrap(),
            "active".parse::<RentalState>().unwrap()
        );
    }

    #[test]
    fn test_rental_state_rejects_empty() {
        assert!(matches!(
            "  ".parse::<RentalState>(),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_rental_state_serde() {
        let json = serde_json::to_string(&RentalState::Terminated).unwrap();
        assert_eq!(json, "\"Terminated\"");

        let state: RentalState = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(state, RentalState::Failed);

        let state: RentalState = serde_json::from_str("\"Suspended\"").unwrap();
        assert_eq!(serde_json::to_string(&state).unwrap(), "\"Suspended\"");
    }

    #[test]
    fn test_terminal_failure_states() {
        assert_eq!(TERMINAL_FAILURE_STATES.len(), 3);
        assert!(TERMINAL_FAILURE_STATES.contains(&RentalState::Failed));
        assert!(TERMINAL_FAILURE_STATES.contains(&RentalState::Terminated));
        assert!(TERMINAL_FAILURE_STATES.contains(&RentalState::Cancelled));
        assert!(!TERMINAL_FAILURE_STATES.contains(&RentalState::Active));
        assert!(!TERMINAL_FAILURE_STATES.contains(&RentalState::Stopped));
    }

    #[test]
    fn test_ssh_access_parse() {
        let access: SshAccess = "root@84.200.81.243:32776".parse().unwrap();
        assert_eq!(access.user, "root");
        assert_eq!(access.host, "84.200.81.243");
        assert_eq!(access.port, 32776);
        assert_eq!(access.to_string(), "root@84.200.81.243:32776");
    }

    #[test]
    fn test_ssh_access_parse_rejects_malformed() {
        for input in [
            "",
            "root84.200.81.243:22",
            "root@84.200.81.243",
            "@host:22",
            "root@:22",
            "root@host:abc",
            "root@host:0",
            "root@host:70000",
        ] {
            assert!(
                matches!(input.parse::<SshAccess>(), Err(Error::ParseError(_))),
                "expected parse failure for `{input}`"
            );
        }
    }

    #[test]
    fn test_ssh_command() {
        let access = SshAccess::new("10.0.0.5", 2222, "ubuntu");
        assert_eq!(access.ssh_command(None), "ssh ubuntu@10.0.0.5 -p 2222");

        let key = PathBuf::from("/home/me/.ssh/basilica_ed25519");
        assert_eq!(
            access.ssh_command(Some(&key)),
            "ssh -i /home/me/.ssh/basilica_ed25519 ubuntu@10.0.0.5 -p 2222"
        );
    }

    #[test]
    fn test_ssh_access_deserialize_username_alias() {
        let access: SshAccess =
            serde_json::from_str(r#"{"host": "gpu-1.example", "username": "root"}"#).unwrap();
        assert_eq!(access.user, "root");
        assert_eq!(access.port, DEFAULT_SSH_PORT);
    }
}
