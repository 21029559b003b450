//! Datasource registry, loads all filter configs from embedded TOML.
//!
//! Each `.toml` file in `packages/filter/datasources/` is baked into the
//! binary at compile time via [`include_str!`] and describes one external
//! OData provider: its query syntax and, per dataset, the field path of
//! every filter dimension. Configs are resolved once at startup so that
//! request handling never looks up a field on an unknown datasource.

use std::collections::BTreeMap;

use data_explorer_filter_models::{FieldPaths, FilterConfig, SyntaxOverride, SyntaxTokens};
use serde::Deserialize;

use crate::FilterError;

/// TOML configs embedded at compile time.
const DATASOURCE_TOMLS: &[(&str, &str)] = &[
    ("global_fund", include_str!("../datasources/global_fund.toml")),
    (
        "data_warehouse",
        include_str!("../datasources/data_warehouse.toml"),
    ),
];

/// A datasource as written in its TOML file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasourceDefinition {
    /// Unique identifier used in requests (e.g. `"global_fund"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Query syntax shared by all datasets unless overridden.
    pub syntax: SyntaxTokens,
    /// Datasets keyed by name.
    pub datasets: BTreeMap<String, DatasetDefinition>,
}

/// A dataset entry inside a [`DatasourceDefinition`].
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetDefinition {
    /// Entity-set path relative to the datasource base URL.
    pub path: Option<String>,
    /// Default aggregation template containing `<filterString>`.
    pub aggregation: Option<String>,
    /// Tokens that differ from the datasource syntax.
    #[serde(default)]
    pub syntax: SyntaxOverride,
    /// Field path per filter dimension.
    pub fields: FieldPaths,
}

/// A dataset with its syntax resolved against its datasource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    /// Entity-set path relative to the datasource base URL.
    pub path: Option<String>,
    /// Default aggregation template.
    pub aggregation: Option<String>,
    /// Filter configuration ready for the builder.
    pub config: FilterConfig,
}

/// Resolved datasources, keyed by datasource id then dataset name.
#[derive(Debug, Clone, Default)]
pub struct DatasourceRegistry {
    names: BTreeMap<String, String>,
    datasets: BTreeMap<String, BTreeMap<String, Dataset>>,
}

impl DatasourceRegistry {
    /// Loads every embedded datasource config.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] if a config is malformed, two configs share
    /// an id, or a dataset declares no filter fields.
    pub fn load() -> Result<Self, FilterError> {
        Self::from_tomls(DATASOURCE_TOMLS)
    }

    /// Builds a registry from `(file name, TOML text)` pairs.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn from_tomls(tomls: &[(&str, &str)]) -> Result<Self, FilterError> {
        let mut registry = Self::default();

        for (file, text) in tomls {
            let definition: DatasourceDefinition =
                toml::from_str(text).map_err(|source| FilterError::Parse {
                    file: (*file).to_string(),
                    source,
                })?;
            registry.insert(definition)?;
        }

        log::debug!(
            "Loaded {} datasources with {} datasets",
            registry.names.len(),
            registry.datasets.values().map(BTreeMap::len).sum::<usize>()
        );

        Ok(registry)
    }

    fn insert(&mut self, definition: DatasourceDefinition) -> Result<(), FilterError> {
        if self.names.contains_key(&definition.id) {
            return Err(FilterError::DuplicateDatasource { id: definition.id });
        }

        let mut datasets = BTreeMap::new();
        for (name, dataset) in definition.datasets {
            if dataset.fields.is_empty() {
                return Err(FilterError::EmptyDataset {
                    datasource: definition.id,
                    dataset: name,
                });
            }
            let config = FilterConfig {
                syntax: dataset.syntax.apply(&definition.syntax),
                fields: dataset.fields,
            };
            datasets.insert(
                name,
                Dataset {
                    path: dataset.path,
                    aggregation: dataset.aggregation,
                    config,
                },
            );
        }

        self.names.insert(definition.id.clone(), definition.name);
        self.datasets.insert(definition.id, datasets);
        Ok(())
    }

    /// Looks up a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::UnknownDatasource`] or
    /// [`FilterError::UnknownDataset`] if either key is not registered.
    pub fn dataset(&self, datasource: &str, dataset: &str) -> Result<&Dataset, FilterError> {
        self.datasets
            .get(datasource)
            .ok_or_else(|| FilterError::UnknownDatasource {
                datasource: datasource.to_string(),
            })?
            .get(dataset)
            .ok_or_else(|| FilterError::UnknownDataset {
                datasource: datasource.to_string(),
                dataset: dataset.to_string(),
            })
    }

    /// Looks up the filter configuration of a dataset.
    ///
    /// # Errors
    ///
    /// See [`Self::dataset`].
    pub fn config(&self, datasource: &str, dataset: &str) -> Result<&FilterConfig, FilterError> {
        self.dataset(datasource, dataset).map(|d| &d.config)
    }

    /// Returns the human-readable name of a datasource.
    #[must_use]
    pub fn name(&self, datasource: &str) -> Option<&str> {
        self.names.get(datasource).map(String::as_str)
    }

    /// Iterates over `(datasource id, dataset name, dataset)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Dataset)> {
        self.datasets.iter().flat_map(|(source, datasets)| {
            datasets
                .iter()
                .map(move |(name, dataset)| (source.as_str(), name.as_str(), dataset))
        })
    }
}
