//! Basilica API client and data models.
//!
//! Provides typed structures and an asynchronous client for the Basilica GPU rental
//! API, plus [`RentalWaiter`] for polling a rental until it is ready.
//!
//! ```no_run
//! use basilica_sdk::{BasilicaClient, StartRentalOptions, WaitOptions};
//!
//! # async fn example() -> basilica_sdk::Result<()> {
//! let client = BasilicaClient::from_env()?;
//! let rental = client
//!     .start_rental_with(StartRentalOptions::new().ssh_public_key_file("/home/me/.ssh/id_ed25519.pub"))
//!     .await?;
//! let status = client
//!     .wait_for_rental(&rental.rental_id, &WaitOptions::default())
//!     .await?;
//! if let Some(ssh) = status.ssh_access() {
//!     println!("{}", ssh.ssh_command(None));
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod client;
pub mod logs;
pub mod models;
pub mod rental;
pub mod wait;

pub use basilica_core::{Error, RentalState, SshAccess, TERMINAL_FAILURE_STATES};
pub use client::{BasilicaClient, BasilicaClientBuilder};
pub use logs::LogStream;
pub use models::{
    AvailabilityInfo, AvailableExecutor, ContainerInfo, CpuSpec, ExecutorDetails,
    ExecutorListParams, ExecutorSelection, GpuRequirements, GpuSpec, HealthCheckResponse,
    ListExecutorsResponse, ListRentalsResponse, LogParams, PortMapping, RentalListItem,
    RentalListParams, RentalResponse, RentalStatus, RentalStatusInfo, ResourceRequirements,
    StartRentalRequest, VolumeMount,
};
pub use rental::StartRentalOptions;
pub use wait::{RentalStatusProvider, RentalWaiter, WaitOptions};

/// Convenient result alias that reuses the shared Basilica error type.
pub type Result<T> = basilica_core::Result<T>;
