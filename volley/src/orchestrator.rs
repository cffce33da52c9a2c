//! Fan-out of one configuration across several generators.
use crate::error::GeneratorError;
use crate::generator::Generator;
use std::sync::Arc;
use tokio::task::JoinSet;
#[allow(unused)]
use tracing::{debug, error, info, info_span, instrument, trace, warn, Instrument};
use volley_core::{RawResult, RunConfig};

/// Runs `workers` generator instances side by side under one shared configuration.
///
/// Generators share nothing; each produces its own [`RawResult`]. The first fatal
/// generator error aborts every remaining instance.
pub struct Orchestrator<G> {
    generator: Arc<G>,
}

impl<G> Clone for Orchestrator<G> {
    fn clone(&self) -> Self {
        Self {
            generator: self.generator.clone(),
        }
    }
}

impl<G> Orchestrator<G>
where
    G: Generator + Sync + 'static,
{
    pub fn new(generator: G) -> Self {
        Self {
            generator: Arc::new(generator),
        }
    }

    /// Returns one result per worker, ordered by worker index.
    #[instrument(name = "orchestrator", skip_all, fields(label = config.label(), workers = config.workers()))]
    pub async fn run(&self, config: &RunConfig) -> Result<Vec<RawResult>, GeneratorError> {
        if config.workers() == 1 {
            return Ok(vec![self.generator.generate(config).await?]);
        }

        info!("Starting {} generators", config.workers());

        let mut set = JoinSet::new();
        for worker in 0..config.workers() {
            let generator = self.generator.clone();
            let config = config.clone();
            set.spawn(
                async move { (worker, generator.generate(&config).await) }
                    .instrument(info_span!("worker", id = worker)),
            );
        }

        let mut results = Vec::with_capacity(config.workers());
        while let Some(joined) = set.join_next().await {
            let outcome = match joined {
                Ok((worker, Ok(result))) => {
                    debug!("Worker {worker} finished");
                    Ok((worker, result))
                }
                Ok((worker, Err(err))) => {
                    error!("Worker {worker} failed: {err}");
                    Err(err)
                }
                Err(err) => Err(GeneratorError::Panicked(err.to_string())),
            };

            match outcome {
                Ok(result) => results.push(result),
                Err(err) => {
                    set.abort_all();
                    return Err(err);
                }
            }
        }

        results.sort_by_key(|(worker, _)| *worker);
        Ok(results.into_iter().map(|(_, result)| result).collect())
    }
}
