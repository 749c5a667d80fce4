//! rowmap command-line tool
//!
//! Resolves the result-set mapping described by a scenario file and prints
//! the selections and domain results it produces.

mod error;
mod formatter;
mod scenario;

use clap::{Args as ClapArgs, Parser, Subcommand};
use comfy_table::Table;
use formatter::{create_formatter, OutputFormat};
use rowmap_core::config::{DEFAULT_DISCRIMINATOR_ALIAS, DEFAULT_MAX_FETCH_DEPTH};
use rowmap_core::{LoadQueryInfluencers, ResultsConfig};
use scenario::Scenario;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::CliError;

/// rowmap command-line tool
#[derive(Parser, Debug)]
#[command(name = "rowmap")]
#[command(version, about = "Resolve native-query result-set mappings")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a scenario's mapping against its columns
    Resolve(ResolveArgs),
    /// List the entities a scenario declares
    Entities {
        /// Scenario file (JSON)
        scenario: PathBuf,
    },
}

#[derive(ClapArgs, Debug)]
pub struct ResolveArgs {
    /// Scenario file (JSON)
    pub scenario: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Maximum association fetch depth
    #[arg(long, default_value_t = DEFAULT_MAX_FETCH_DEPTH)]
    pub max_fetch_depth: usize,

    /// Result-set alias of case-expression discriminators
    #[arg(long, default_value = DEFAULT_DISCRIMINATOR_ALIAS)]
    pub discriminator_alias: String,

    /// Enable a fetch profile (repeatable)
    #[arg(long = "profile")]
    pub profiles: Vec<String>,
}

impl ResolveArgs {
    fn to_config(&self) -> ResultsConfig {
        ResultsConfig::new()
            .with_max_fetch_depth(self.max_fetch_depth)
            .with_discriminator_alias(&self.discriminator_alias)
    }

    fn influencers(&self) -> LoadQueryInfluencers {
        self.profiles
            .iter()
            .fold(LoadQueryInfluencers::new(), |influencers, profile| {
                influencers.with_fetch_profile(profile)
            })
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rowmap=info,rowmap_core=warn".into()),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<String, CliError> {
    match args.command {
        Command::Resolve(resolve) => {
            let scenario = Scenario::load(&resolve.scenario)?;
            let factory = scenario.factory(resolve.to_config());
            let metadata = scenario.metadata();
            let mapping = scenario.mapping(&factory)?;

            let resolved = mapping.resolve(&metadata, &resolve.influencers(), &factory)?;
            info!(
                scenario = %scenario.name,
                selections = resolved.selections().len(),
                results = resolved.domain_results().len(),
                "mapping resolved"
            );

            Ok(create_formatter(resolve.format).format_mapping(&resolved, &metadata))
        }
        Command::Entities { scenario } => {
            let scenario = Scenario::load(&scenario)?;
            let mut table = Table::new();
            table.set_header(vec!["Entity", "Super entity", "Attributes"]);
            for entity in &scenario.entities {
                table.add_row(vec![
                    entity.name.clone(),
                    entity.super_entity.clone().unwrap_or_default(),
                    entity.attributes.len().to_string(),
                ]);
            }
            Ok(table.to_string())
        }
    }
}
