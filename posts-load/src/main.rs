use anyhow::Context;
use clap::Parser;
use std::num::{NonZeroU32, NonZeroU64};
use std::time::Duration;
use swarm::{RunConfig, Swarm};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Run the posts API user profile against a host.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Base URL of the service under test [default: the profile's host]
    #[arg(short = 'H', long, env = "SWARM_HOST")]
    host: Option<String>,

    /// Number of simulated users
    #[arg(short, long, env = "SWARM_USERS", default_value_t = 1)]
    users: usize,

    /// Users started per second
    #[arg(short = 'r', long, env = "SWARM_SPAWN_RATE", default_value_t = NonZeroU32::MIN)]
    spawn_rate: NonZeroU32,

    /// Stop after this long, e.g. `30s`, `5m` [default: run until Ctrl-C]
    #[arg(short = 't', long, env = "SWARM_RUN_TIME", value_parser = humantime::parse_duration)]
    run_time: Option<Duration>,

    /// Stop each user after this many actions
    #[arg(short, long, env = "SWARM_ITERATIONS")]
    iterations: Option<NonZeroU64>,

    /// Seed for reproducible action selection and waits
    #[arg(long, env = "SWARM_SEED")]
    seed: Option<u64>,

    /// How often running totals are logged; `0s` disables them
    #[arg(long, env = "SWARM_REPORT_INTERVAL", value_parser = humantime::parse_duration, default_value = "2s")]
    report_interval: Duration,
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        RunConfig {
            host: cli.host,
            users: cli.users,
            spawn_rate: cli.spawn_rate,
            run_time: cli.run_time,
            iterations: cli.iterations,
            seed: cli.seed,
            report_interval: cli.report_interval,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("swarm=info,posts_load=info")),
        )
        .init();

    let config = RunConfig::from(Cli::parse());
    let profile = posts_load::api_user()?;
    info!("Starting {} users", config.users);

    let stats = Swarm::new(profile)
        .config(config)
        .stop_on(shutdown_signal())
        .await
        .context("Load test failed")?;

    println!("{stats}");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Interrupted, stopping users"),
        Err(err) => {
            error!("Unable to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await
        }
    }
}
