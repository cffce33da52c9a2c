//! Command line runtime for [`volley`].
pub mod runtime;

pub use crate::runtime::VolleyRuntime;

/// Filter applied when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "volley=info,volley_core=info,volley_runtime=info";
