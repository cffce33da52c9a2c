use tracing_subscriber::{EnvFilter, FmtSubscriber};
use volley_runtime::{VolleyRuntime, DEFAULT_LOG_FILTER};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    FmtSubscriber::builder().with_env_filter(filter).init();

    VolleyRuntime::from_args().run().await
}
