//! Process wiring for the `volley` binary.
//!
//! Parses the command line (with environment fallbacks), builds the generator and the results
//! store, and dispatches to a single run, a whole suite, or an analysis of stored results.
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn};
use volley::analysis::analyze;
use volley::core::{
    RunConfig, DEFAULT_CONNECTIONS, DEFAULT_DURATION, DEFAULT_LABEL, DEFAULT_PIPELINING,
    DEFAULT_WORKERS,
};
use volley::{FsRunStore, HttpGenerator, SuiteDriver, SuiteMatrix};

pub const DEFAULT_TARGET: &str = "http://localhost:3000/api/accounts";
pub const DEFAULT_RESULTS_DIR: &str = "load-test-results";
pub const DEFAULT_FAMILY: &str = "account-creation";

#[derive(Parser, Debug)]
#[command(version, about = "Load test a write-heavy HTTP endpoint")]
struct VolleyCli {
    /// Endpoint receiving the POST requests
    #[arg(long, env = "VOLLEY_TARGET", default_value = DEFAULT_TARGET, global = true)]
    target: String,

    /// Seconds per run
    #[arg(long, env = "VOLLEY_DURATION", default_value_t = DEFAULT_DURATION.as_secs(), global = true)]
    duration: u64,

    #[arg(long, env = "VOLLEY_CONNECTIONS", default_value_t = DEFAULT_CONNECTIONS, global = true)]
    connections: usize,

    /// Requests queued per connection before awaiting responses
    #[arg(long, env = "VOLLEY_PIPELINING", default_value_t = DEFAULT_PIPELINING, global = true)]
    pipelining: usize,

    #[arg(long, env = "VOLLEY_WORKERS", default_value_t = DEFAULT_WORKERS, global = true)]
    workers: usize,

    #[arg(long, env = "VOLLEY_RESULTS_DIR", default_value = DEFAULT_RESULTS_DIR, global = true)]
    results_dir: PathBuf,

    /// Prefix of the stored result files
    #[arg(long, default_value = DEFAULT_FAMILY, global = true)]
    family: String,

    /// Serve Prometheus metrics on this address while running
    #[arg(long, global = true)]
    metrics_addr: Option<SocketAddr>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Run a single configuration and print its summary
    Run {
        #[arg(long, default_value = DEFAULT_LABEL)]
        label: String,
    },
    /// Run every configuration of a matrix in order
    Suite {
        /// JSON array of named configurations; the standard matrix when omitted
        #[arg(long)]
        matrix: Option<PathBuf>,
    },
    /// Rank stored results and write `analysis-report.md`
    Analyze,
}

/// The `volley` command line runtime.
///
/// # Example
///
/// ```no_run
/// use volley_runtime::VolleyRuntime;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     VolleyRuntime::from_args().run().await
/// }
/// ```
pub struct VolleyRuntime {
    cli: VolleyCli,
}

impl VolleyRuntime {
    pub fn from_args() -> Self {
        Self {
            cli: VolleyCli::parse(),
        }
    }

    pub fn try_from_iter<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self {
            cli: VolleyCli::try_parse_from(args)?,
        })
    }

    #[instrument(name = "volley", skip_all)]
    pub async fn run(self) -> anyhow::Result<()> {
        if let Some(addr) = self.cli.metrics_addr {
            install_metrics(addr)?;
        }

        let store = FsRunStore::new(&self.cli.results_dir, &self.cli.family);

        match &self.cli.command {
            Command::Run { label } => {
                let config = self.config(label)?;
                let driver = SuiteDriver::new(HttpGenerator::default(), store);
                let completed = driver.run_one(&config).await?;

                println!("\n=== {} ===\n", config.label());
                println!("{}", completed.result);
                println!("\nResults saved as {}", completed.key);
            }
            Command::Suite { matrix } => {
                let matrix = match matrix {
                    Some(path) => {
                        let json = tokio::fs::read_to_string(path)
                            .await
                            .with_context(|| format!("Reading suite matrix {}", path.display()))?;
                        SuiteMatrix::from_json(&self.cli.target, &json)?
                    }
                    None => SuiteMatrix::standard(&self.cli.target)?,
                };

                let driver = SuiteDriver::new(HttpGenerator::default(), store);
                let report = driver.run_suite(&matrix).await;

                println!("\nAll tests completed");
                for completed in report.completed() {
                    println!("  ok     {}", completed.result.config().label());
                }
                for (label, err) in report.failed() {
                    println!("  failed {label}: {err}");
                }
            }
            Command::Analyze => {
                let report = analyze(&store).await?;
                println!("{}", report.render_console());

                let path = store.write_report(&report.render_markdown()).await?;
                println!("\nAnalysis report saved to {}", path.display());
            }
        }

        Ok(())
    }

    fn config(&self, label: &str) -> anyhow::Result<RunConfig> {
        let config = RunConfig::builder(&self.cli.target)
            .duration(Duration::from_secs(self.cli.duration))
            .connections(self.cli.connections)
            .pipelining(self.cli.pipelining)
            .workers(self.cli.workers)
            .label(label)
            .build()?;
        Ok(config)
    }
}

#[cfg(feature = "metrics")]
fn install_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    info!("Serving metrics on {addr}");
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn install_metrics(addr: SocketAddr) -> anyhow::Result<()> {
    warn!("Built without the `metrics` feature; not serving metrics on {addr}");
    Ok(())
}
