#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! OData filter-string builder and datasource filter registry.
//!
//! Every analytics endpoint turns the dashboard's query parameters into an
//! OData filter before calling an external provider. [`build_filter`] and
//! [`build_eligibility_filter`] do that for any dataset described in the
//! [`registry::DatasourceRegistry`], either as a top-level `$filter=...&`
//! parameter or nested as a `filter(...)/` step inside an aggregation
//! template.
//!
//! Building is pure and total: unconfigured dimensions and malformed values
//! are skipped, never reported. Only loading the registry can fail.

pub mod builder;
pub mod query;
pub mod registry;

pub use builder::{FILTER_PLACEHOLDER, FilterBuilder};
pub use query::{build_eligibility_filter, build_filter, clauses, eligibility_clauses};

use thiserror::Error;

/// Errors that can occur while loading or querying datasource configs.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A datasource TOML file could not be parsed.
    #[error("Failed to parse {file}.toml: {source}")]
    Parse {
        /// Config file name.
        file: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// Two datasource configs declare the same id.
    #[error("Duplicate datasource id: {id}")]
    DuplicateDatasource {
        /// The repeated id.
        id: String,
    },

    /// A dataset declares no filter fields at all.
    #[error("Dataset {datasource}/{dataset} has no filter fields")]
    EmptyDataset {
        /// Datasource id.
        datasource: String,
        /// Dataset name.
        dataset: String,
    },

    /// The requested datasource is not registered.
    #[error("Unknown datasource: {datasource}")]
    UnknownDatasource {
        /// Requested datasource id.
        datasource: String,
    },

    /// The requested dataset is not registered for its datasource.
    #[error("Unknown dataset {dataset} for datasource {datasource}")]
    UnknownDataset {
        /// Datasource id.
        datasource: String,
        /// Requested dataset name.
        dataset: String,
    },
}
