//! Basilica CLI - rent GPUs from the command line.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use basilica_core::config::{BasilicaConfig, DEFAULT_API_URL};
use basilica_sdk::{
    BasilicaClient, BasilicaClientBuilder, Error, ExecutorListParams, LogParams, PortMapping,
    RentalListParams, RentalState, RentalStatus, StartRentalOptions, WaitOptions,
};
use clap::{Parser, Subcommand};
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Basilica CLI - Rent and manage GPU containers.
#[derive(Parser)]
#[command(name = "basilica")]
#[command(about = "Rent and manage GPU containers on Basilica")]
struct Cli {
    /// Basilica API URL (or set `BASILICA_API_URL` env var).
    #[arg(long, env = "BASILICA_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Bearer token (or set `BASILICA_API_TOKEN` env var).
    #[arg(long, env = "BASILICA_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, default_value = "30")]
    request_timeout: u64,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health.
    Health,

    /// List executors available for rent.
    Executors {
        /// Only show executors that can be rented now.
        #[arg(long, default_value = "false")]
        available: bool,

        /// GPU type, e.g. h100.
        #[arg(long)]
        gpu_type: Option<String>,

        /// Minimum GPU memory in GB.
        #[arg(long)]
        min_gpu_memory: Option<u32>,

        /// Minimum number of GPUs.
        #[arg(long)]
        min_gpu_count: Option<u32>,
    },

    /// List your rentals.
    Rentals {
        /// Filter by state, e.g. Active.
        #[arg(long)]
        status: Option<RentalState>,

        /// Filter by GPU type.
        #[arg(long)]
        gpu_type: Option<String>,

        /// Minimum number of GPUs.
        #[arg(long)]
        min_gpu_count: Option<u32>,
    },

    /// Start a new rental.
    Start {
        /// Container image.
        #[arg(long)]
        image: Option<String>,

        /// Rent this executor instead of matching on GPU requirements.
        #[arg(long)]
        executor_id: Option<String>,

        /// GPU type.
        #[arg(long)]
        gpu_type: Option<String>,

        /// Number of GPUs.
        #[arg(long)]
        gpu_count: Option<u32>,

        /// Minimum memory per GPU in GB.
        #[arg(long)]
        min_gpu_memory: Option<u32>,

        /// Path to an OpenSSH public key file.
        #[arg(long, conflicts_with = "no_ssh")]
        ssh_key: Option<PathBuf>,

        /// Disable SSH access.
        #[arg(long, default_value = "false")]
        no_ssh: bool,

        /// Environment variable as KEY=VALUE (repeatable).
        #[arg(long = "env", value_parser = parse_env_var)]
        env: Vec<(String, String)>,

        /// Port mapping as CONTAINER[:HOST][/PROTOCOL] (repeatable).
        #[arg(long = "port", value_parser = parse_port_mapping)]
        ports: Vec<PortMapping>,

        /// Wait until the rental is active.
        #[arg(long, default_value = "false")]
        wait: bool,

        /// Wait timeout in seconds.
        #[arg(long, default_value = "300")]
        timeout: u64,

        /// Seconds between status checks while waiting.
        #[arg(long, default_value = "5")]
        poll_interval: u64,

        /// Command to run in the container.
        #[arg(last = true)]
        command: Vec<String>,
    },

    /// Show the status of a rental.
    Status {
        /// Rental ID.
        id: String,
    },

    /// Stop a rental.
    Stop {
        /// Rental ID.
        id: String,

        /// Skip confirmation prompt.
        #[arg(long, short = 'y', default_value = "false")]
        yes: bool,
    },

    /// Print container logs of a rental.
    Logs {
        /// Rental ID.
        id: String,

        /// Keep streaming new lines.
        #[arg(long, short = 'f', default_value = "false")]
        follow: bool,

        /// Only print the last N lines.
        #[arg(long)]
        tail: Option<u32>,
    },

    /// Wait for a rental to reach a state.
    Wait {
        /// Rental ID.
        id: String,

        /// State to wait for.
        #[arg(long, default_value = "Active")]
        target: RentalState,

        /// Timeout in seconds.
        #[arg(long, default_value = "300")]
        timeout: u64,

        /// Seconds between status checks.
        #[arg(long, default_value = "5")]
        poll_interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let client = build_client(&cli)?;

    match cli.command {
        Commands::Health => {
            let health = client.health_check().await?;
            let emoji = if health.is_healthy() { "🟢" } else { "🔴" };

            println!("\n{} Basilica API {} (v{})", emoji, health.status, health.version);
            println!(
                "   Validators: {}/{} healthy",
                health.healthy_validators, health.total_validators
            );
            println!(
                "   Checked:    {}",
                health.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }

        Commands::Executors {
            available,
            gpu_type,
            min_gpu_memory,
            min_gpu_count,
        } => {
            let params = ExecutorListParams {
                available: available.then_some(true),
                min_gpu_memory,
                gpu_type,
                min_gpu_count,
            };
            let response = client.list_executors(&params).await?;

            println!("\n🎮 Available Executors ({})", response.total_count);
            println!("{}", "=".repeat(90));

            for entry in response.available_executors {
                let executor = entry.executor;
                let gpus = match executor.gpu_specs.first() {
                    Some(gpu) => format!("{} x{} ({} GB)", gpu.name, executor.gpu_count(), gpu.memory_gb),
                    None => "no GPUs".to_string(),
                };

                println!("\n{} (ID: {})", gpus, executor.id);
                println!(
                    "   CPU: {} cores {} | RAM: {} GB",
                    executor.cpu_specs.cores, executor.cpu_specs.model, executor.cpu_specs.memory_gb
                );
                println!(
                    "   ✅ Verified {:.0}% | Uptime {:.1}%",
                    entry.availability.verification_score * 100.0,
                    entry.availability.uptime_percentage
                );
                println!(
                    "   📍 Location: {}",
                    executor.location.as_deref().unwrap_or("Unknown")
                );
            }
            println!();
        }

        Commands::Rentals {
            status,
            gpu_type,
            min_gpu_count,
        } => {
            let params = RentalListParams {
                status,
                gpu_type,
                min_gpu_count,
            };
            let response = client.list_rentals(&params).await?;

            println!(
                "\n{:<24} {:<16} {:<24} {:<40}",
                "ID", "STATE", "EXECUTOR", "IMAGE"
            );
            println!("{}", "-".repeat(100));

            for rental in response.rentals {
                println!(
                    "{:<24} {} {:<13} {:<24} {:<40}",
                    rental.rental_id,
                    state_emoji(&rental.state),
                    rental.state,
                    rental.executor_id,
                    rental.container_image
                );
            }
            println!();
        }

        Commands::Start {
            image,
            executor_id,
            gpu_type,
            gpu_count,
            min_gpu_memory,
            ssh_key,
            no_ssh,
            env,
            ports,
            wait,
            timeout,
            poll_interval,
            command,
        } => {
            let mut options = StartRentalOptions::new().no_ssh(no_ssh);
            if let Some(image) = image {
                options = options.container_image(image);
            }
            if let Some(executor_id) = executor_id {
                options = options.executor_id(executor_id);
            }
            if let Some(gpu_type) = gpu_type {
                options = options.gpu_type(gpu_type);
            }
            if let Some(gpu_count) = gpu_count {
                options = options.gpu_count(gpu_count);
            }
            if let Some(memory) = min_gpu_memory {
                options = options.min_gpu_memory_gb(memory);
            }
            if let Some(path) = ssh_key {
                options = options.ssh_public_key_file(path);
            }
            for (key, value) in env {
                options = options.env(key, value);
            }
            for port in ports {
                options = options.port(port);
            }
            if !command.is_empty() {
                options = options.command(command);
            }

            let rental = client
                .start_rental_with(options)
                .await
                .context("Failed to start rental")?;
            info!(rental_id = %rental.rental_id, "Started rental");

            println!("\n✅ Rental started!");
            println!("   ID:        {}", rental.rental_id);
            println!("   Container: {}", rental.container_info.container_name);
            println!("   Status:    {}", rental.container_info.status);

            if wait {
                let options = wait_options(RentalState::Active, timeout, poll_interval);
                let status = wait_with_report(&client, &rental.rental_id, &options).await?;
                print_ready(&status);
            } else {
                println!(
                    "\n💡 Run `basilica wait {}` to wait for it to be ready",
                    rental.rental_id
                );
            }
        }

        Commands::Status { id } => {
            let status = client.get_rental(&id).await?;
            print_status(&status);
        }

        Commands::Stop { id, yes } => {
            if !yes {
                println!("⚠️  Are you sure you want to stop rental {}?", id);
                println!("   The container and its data will be removed.");
                println!("   Use --yes to skip this prompt.");
                return Ok(());
            }

            info!(rental_id = %id, "Stopping rental");
            client.stop_rental(&id).await?;
            println!("\n✅ Rental {} stopped", id);
        }

        Commands::Logs { id, follow, tail } => {
            let mut stream = client
                .stream_rental_logs(&id, &LogParams { follow, tail })
                .await
                .context("Failed to open log stream")?;

            let mut stdout = tokio::io::stdout();
            while let Some(chunk) = stream.next_chunk().await? {
                stdout.write_all(&chunk).await?;
                stdout.flush().await?;
            }
        }

        Commands::Wait {
            id,
            target,
            timeout,
            poll_interval,
        } => {
            let options = wait_options(target, timeout, poll_interval);
            let status = wait_with_report(&client, &id, &options).await?;
            print_ready(&status);
        }
    }

    Ok(())
}

fn build_client(cli: &Cli) -> Result<BasilicaClient> {
    let mut config = BasilicaConfig::new(cli.api_url.trim())?.with_timeout(cli.request_timeout);
    if let Some(token) = cli.api_token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        config = config.with_api_token(token);
    }

    let client = BasilicaClientBuilder::from_config(&config)
        .and_then(BasilicaClientBuilder::build)
        .context("Failed to create Basilica client")?;
    Ok(client)
}

fn wait_options(target: RentalState, timeout: u64, poll_interval: u64) -> WaitOptions {
    WaitOptions::new()
        .with_target_state(target)
        .with_timeout(Duration::from_secs(timeout))
        .with_poll_interval(Duration::from_secs(poll_interval))
}

async fn wait_with_report(
    client: &BasilicaClient,
    rental_id: &str,
    options: &WaitOptions,
) -> Result<RentalStatus> {
    println!(
        "⏳ Waiting for rental {} to become {}...",
        rental_id, options.target_state
    );

    match client.wait_for_rental(rental_id, options).await {
        Ok(status) => Ok(status),
        Err(err) => {
            if let Some(report) = describe_wait_failure(&err) {
                println!("\n{report}");
            }
            Err(anyhow::Error::new(err).context(format!("Failed waiting for rental {rental_id}")))
        }
    }
}

/// Human-readable report for a wait that ended without reaching the target.
fn describe_wait_failure(err: &Error) -> Option<String> {
    match err {
        Error::RentalTerminalState { rental_id, state } => Some(format!(
            "❌ Rental {rental_id} ended in state {state}\n\
             💡 Run `basilica logs {rental_id}` to see what happened"
        )),
        Error::RentalWaitTimeout {
            rental_id,
            target_state,
            elapsed,
            last_state,
        } => {
            let last = last_state
                .as_ref()
                .map_or_else(|| "unknown".to_string(), ToString::to_string);
            Some(format!(
                "⏰ Gave up after {}s waiting for {target_state}; last state was {last}\n\
                 💡 Run `basilica wait {rental_id} --timeout {}` to keep waiting",
                elapsed.as_secs(),
                elapsed.as_secs().max(1) * 2
            ))
        }
        _ => None,
    }
}

fn print_ready(status: &RentalStatus) {
    println!("\n✅ Rental {} is {}!", status.rental_id, status.state());
    match status.ssh_access() {
        Some(ssh) => println!("   SSH:  {}", ssh.ssh_command(None)),
        None => println!("   SSH:  not available"),
    }
}

fn print_status(status: &RentalStatus) {
    println!("\n🖥️  Rental: {}", status.rental_id);
    println!(
        "   State:    {} {}",
        state_emoji(status.state()),
        status.state()
    );
    if let Some(message) = &status.status.message {
        println!("   Message:  {}", message);
    }

    if let Some(executor) = &status.executor {
        println!("   Executor: {}", executor.id);
        if let Some(gpu) = executor.gpu_specs.first() {
            println!("   GPU:      {} x{}", gpu.name, executor.gpu_count());
        }
    }

    if let Some(ssh) = status.ssh_access() {
        println!("\n   📡 SSH: {}", ssh.ssh_command(None));
    }

    if let Some(created) = &status.created_at {
        println!("   Created:  {}", created.format("%Y-%m-%d %H:%M:%S UTC"));
    }
}

fn state_emoji(state: &RentalState) -> &'static str {
    match state {
        RentalState::Active => "🟢",
        RentalState::Pending | RentalState::Provisioning => "🟡",
        RentalState::Stopping | RentalState::Stopped => "🟠",
        RentalState::Failed | RentalState::Terminated | RentalState::Cancelled => "🔴",
        RentalState::Other(_) => "⚪",
    }
}

fn parse_env_var(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    if key.is_empty() {
        return Err(format!("missing variable name in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_port_mapping(raw: &str) -> std::result::Result<PortMapping, String> {
    let (ports, protocol) = match raw.split_once('/') {
        Some((ports, protocol)) => (ports, protocol.to_ascii_lowercase()),
        None => (raw, "tcp".to_string()),
    };

    let parse = |value: &str| {
        value
            .parse::<u32>()
            .ok()
            .filter(|port| (1..=65535).contains(port))
            .ok_or_else(|| format!("invalid port `{value}` in `{raw}`"))
    };

    let (container_port, host_port) = match ports.split_once(':') {
        Some((container, host)) => (parse(container)?, parse(host)?),
        None => {
            let port = parse(ports)?;
            (port, port)
        }
    };

    Ok(PortMapping {
        container_port,
        host_port,
        protocol,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_wait_arguments() {
        let cli = Cli::try_parse_from([
            "basilica",
            "--api-url",
            "http://localhost:8000",
            "wait",
            "r-1",
            "--target",
            "terminated",
            "--timeout",
            "60",
        ])
        .unwrap();

        match cli.command {
            Commands::Wait {
                id,
                target,
                timeout,
                poll_interval,
            } => {
                assert_eq!(id, "r-1");
                assert_eq!(target, RentalState::Terminated);
                assert_eq!(timeout, 60);
                assert_eq!(poll_interval, 5);
            }
            _ => panic!("expected wait command"),
        }
    }

    #[test]
    fn parses_start_with_trailing_command() {
        let cli = Cli::try_parse_from([
            "basilica",
            "start",
            "--no-ssh",
            "--env",
            "MODE=train",
            "--port",
            "8888",
            "--",
            "python",
            "train.py",
        ])
        .unwrap();

        match cli.command {
            Commands::Start {
                no_ssh,
                env,
                ports,
                command,
                ..
            } => {
                assert!(no_ssh);
                assert_eq!(env, vec![("MODE".to_string(), "train".to_string())]);
                assert_eq!(ports, vec![PortMapping::tcp(8888, 8888)]);
                assert_eq!(command, vec!["python", "train.py"]);
            }
            _ => panic!("expected start command"),
        }
    }

    #[test]
    fn wait_failure_names_terminal_state() {
        let err = Error::RentalTerminalState {
            rental_id: "r-7".to_string(),
            state: RentalState::Failed,
        };
        let report = describe_wait_failure(&err).unwrap();
        assert!(report.starts_with("❌ Rental r-7 ended in state Failed"));
        assert!(report.contains("basilica logs r-7"));
    }

    #[test]
    fn wait_failure_reports_elapsed_and_last_state() {
        let err = Error::RentalWaitTimeout {
            rental_id: "r-8".to_string(),
            target_state: RentalState::Active,
            elapsed: Duration::from_secs(300),
            last_state: Some(RentalState::Provisioning),
        };
        let report = describe_wait_failure(&err).unwrap();
        assert!(report.contains("Gave up after 300s waiting for Active"));
        assert!(report.contains("last state was Provisioning"));
        assert!(report.contains("basilica wait r-8 --timeout 600"));
    }

    #[test]
    fn wait_failure_without_any_poll() {
        let err = Error::RentalWaitTimeout {
            rental_id: "r-9".to_string(),
            target_state: RentalState::Active,
            elapsed: Duration::from_secs(5),
            last_state: None,
        };
        let report = describe_wait_failure(&err).unwrap();
        assert!(report.contains("last state was unknown"));
    }

    #[test]
    fn other_errors_have_no_wait_report() {
        let err = Error::NotFound("rental r-10".to_string());
        assert!(describe_wait_failure(&err).is_none());
    }

    #[test]
    fn env_var_parsing() {
        assert_eq!(
            parse_env_var("A=b=c").unwrap(),
            ("A".to_string(), "b=c".to_string())
        );
        assert!(parse_env_var("novalue").is_err());
        assert!(parse_env_var("=x").is_err());
    }

    #[test]
    fn port_mapping_parsing() {
        assert_eq!(
            parse_port_mapping("8080:80").unwrap(),
            PortMapping::tcp(8080, 80)
        );
        let udp = parse_port_mapping("5000:5001/UDP").unwrap();
        assert_eq!(udp.protocol, "udp");
        assert_eq!(udp.host_port, 5001);

        assert!(parse_port_mapping("0").is_err());
        assert!(parse_port_mapping("abc:80").is_err());
        assert!(parse_port_mapping("70000").is_err());
    }
}
