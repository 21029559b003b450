#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the data explorer builders.
//!
//! Lists the registered datasources, prints the OData filter a set of
//! dashboard query parameters produces, and renders a bucketized choropleth
//! map from live provider data.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use data_explorer_filter::registry::{Dataset, DatasourceRegistry};
use data_explorer_filter::{build_eligibility_filter, build_filter};
use data_explorer_filter_models::QueryParams;
use data_explorer_source::odata::ODataClient;

#[derive(Parser)]
#[command(name = "data_explorer_cli", about = "Data explorer filter and map tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered datasources and their datasets
    Datasources,
    /// Print the filter string built from query parameters
    Filter {
        #[command(flatten)]
        target: Target,
        /// Aggregation template containing `<filterString>`; defaults to the
        /// dataset's own template when `--aggregate` is set
        #[arg(long)]
        template: Option<String>,
        /// Use the dataset's configured aggregation template
        #[arg(long, conflicts_with = "template")]
        aggregate: bool,
        /// Raw filter expression placed before the generated clauses
        #[arg(long)]
        extra: Option<String>,
    },
    /// Fetch rows from a provider and print the bucketized map
    Geomap {
        #[command(flatten)]
        target: Target,
        /// Provider base URL
        #[arg(long)]
        base_url: String,
        /// Resource path; defaults to the dataset path
        #[arg(long)]
        path: Option<String>,
        /// `GeoJSON` file with one feature per region
        #[arg(long)]
        geojson: PathBuf,
        /// Dot path of the region code in each row
        #[arg(long)]
        code_field: String,
        /// Dot path of the numeric value in each row
        #[arg(long)]
        value_field: String,
    },
}

/// Dataset selection and query parameters shared by the subcommands.
#[derive(clap::Args)]
struct Target {
    /// Datasource id (see `datasources`)
    #[arg(long)]
    datasource: String,
    /// Dataset name within the datasource
    #[arg(long)]
    dataset: String,
    /// Match each period token as a whole (eligibility datasets)
    #[arg(long)]
    eligibility: bool,
    /// Query parameter as `key=value`; repeatable
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

impl Target {
    fn params(&self) -> QueryParams {
        self.params.iter().cloned().collect()
    }

    fn filter(&self, dataset: &Dataset, template: Option<&str>, extra: Option<&str>) -> String {
        let params = self.params();
        if self.eligibility {
            build_eligibility_filter(&params, &dataset.config, template, extra)
        } else {
            build_filter(&params, &dataset.config, template, extra)
        }
    }
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got {s:?}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();
    let registry = DatasourceRegistry::load()?;

    match cli.command {
        Commands::Datasources => {
            for (source, name, dataset) in registry.iter() {
                let label = registry.name(source).unwrap_or(source);
                let path = dataset.path.as_deref().unwrap_or("-");
                println!("{source}/{name}\t{label}\t{path}");
            }
        }
        Commands::Filter {
            target,
            template,
            aggregate,
            extra,
        } => {
            let dataset = registry.dataset(&target.datasource, &target.dataset)?;
            let template = if aggregate {
                dataset.aggregation.as_deref()
            } else {
                template.as_deref()
            };
            println!("{}", target.filter(dataset, template, extra.as_deref()));
        }
        Commands::Geomap {
            target,
            base_url,
            path,
            geojson,
            code_field,
            value_field,
        } => {
            let dataset = registry.dataset(&target.datasource, &target.dataset)?;
            let path = path
                .or_else(|| dataset.path.clone())
                .ok_or_else(|| format!("No path configured for {}", target.dataset))?;
            let features = data_explorer_geomap::load_feature_collection(&geojson)?;

            let client = ODataClient::new(&base_url)?;
            let url = client.url(&path, &target.filter(dataset, None, None));
            let response = client.fetch_or_empty(&url).await;
            if let Some(message) = &response.message {
                log::warn!("Provider returned no data: {message}");
            }

            let series = data_explorer_geomap::series::from_rows(
                &response.data,
                &code_field,
                &value_field,
            );
            let map = data_explorer_geomap::bucketize(&series, features);
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_params() {
        assert_eq!(
            parse_param("locations=KEN,UGA"),
            Ok(("locations".to_string(), "KEN,UGA".to_string()))
        );
        assert_eq!(
            parse_param("q=a=b"),
            Ok(("q".to_string(), "a=b".to_string()))
        );
        assert!(parse_param("locations").is_err());
    }

    #[test]
    fn filter_command_parses_repeated_params() {
        let cli = Cli::try_parse_from([
            "data_explorer_cli",
            "filter",
            "--datasource",
            "global_fund",
            "--dataset",
            "allocations",
            "-p",
            "locations=KEN",
            "--param",
            "components=HIV",
        ])
        .unwrap();

        let Commands::Filter { target, .. } = cli.command else {
            panic!("expected filter command");
        };
        assert_eq!(target.params.len(), 2);
        assert!(!target.eligibility);
    }

    #[test]
    fn template_and_aggregate_conflict() {
        let result = Cli::try_parse_from([
            "data_explorer_cli",
            "filter",
            "--datasource",
            "global_fund",
            "--dataset",
            "allocations",
            "--aggregate",
            "--template",
            "x",
        ]);
        assert!(result.is_err());
    }
}
