#![cfg_attr(docsrs, feature(doc_cfg))]
//! Load testing for a single write-heavy HTTP endpoint.
//!
//! A [`SuiteDriver`] runs each [`RunConfig`] of a [`SuiteMatrix`] in turn: the
//! [`Orchestrator`] fans the configuration out to one [`Generator`] per worker, the raw results
//! are merged with [`aggregate`], and the combined result is handed to a [`RunStore`]. The
//! [`analysis`] module later ranks everything the store holds.
//!
//! ```no_run
//! use volley::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let matrix = SuiteMatrix::standard("http://localhost:3000/api/accounts")?;
//! let driver = SuiteDriver::new(
//!     HttpGenerator::default(),
//!     FsRunStore::new("load-test-results", "account-creation"),
//! );
//! let summary = driver.run_suite(&matrix).await;
//! println!("{} configurations completed", summary.completed().len());
//! # Ok(())
//! # }
//! ```
pub mod analysis;
mod error;
pub mod generator;
mod measurement;
pub mod orchestrator;
pub mod store;
pub mod suite;

#[cfg(test)]
pub(crate) mod test_utils;

pub use error::*;
pub use generator::{Generator, HttpGenerator};
pub use orchestrator::Orchestrator;
pub use store::{FsRunStore, MemoryRunStore, RecordKey, RunStore};
pub use suite::{SuiteDriver, SuiteMatrix};
pub use volley_core as core;
pub use volley_core::{aggregate, CombinedResult, RawResult, RunConfig, RunRecord};

pub mod prelude {
    pub use crate::analysis::{analyze, AnalysisReport, Recommendation};
    pub use crate::generator::{Generator, HttpGenerator};
    pub use crate::orchestrator::Orchestrator;
    pub use crate::store::{FsRunStore, MemoryRunStore, RunStore};
    pub use crate::suite::{SuiteDriver, SuiteEntry, SuiteMatrix};
    pub use volley_core::{aggregate, CombinedResult, RawResult, RunConfig, RunRecord};
}
