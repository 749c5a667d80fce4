//! Scenario files: a metamodel, result-set columns and a mapping to resolve.

use rowmap_core::catalog::{EntityDef, FetchProfile, MappingMetamodel, ScalarType};
use rowmap_core::jdbc::{ColumnDescriptor, ResultSetMetadata};
use rowmap_core::results::{
    attribute_result, entity, instantiation, legacy_fetch, DynamicFetchBuilder, LockMode,
    ResultBuilder, ResultSetMapping, ScalarResultBuilder,
};
use rowmap_core::{ResultsConfig, SessionFactory};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::CliError;

/// A resolution scenario as read from JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    #[serde(default)]
    pub fetch_profiles: Vec<FetchProfile>,
    /// Result-set columns in order.
    pub columns: Vec<ColumnDescriptor>,
    /// Result builders; empty means every column is auto-discovered.
    #[serde(default)]
    pub results: Vec<ResultSpec>,
    #[serde(default)]
    pub legacy_fetches: Vec<LegacyFetchSpec>,
}

fn default_name() -> String {
    "scenario".to_string()
}

/// One top-level result.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultSpec {
    Scalar {
        #[serde(default)]
        column: Option<String>,
        /// 1-based JDBC position.
        #[serde(default)]
        position: Option<usize>,
        #[serde(default, rename = "type")]
        scalar_type: Option<ScalarType>,
    },
    Entity {
        alias: String,
        entity: String,
        #[serde(default)]
        lock_mode: LockMode,
        #[serde(default)]
        discriminator_alias: Option<String>,
        #[serde(default)]
        fetches: BTreeMap<String, FetchSpec>,
    },
    Attribute {
        column: String,
        entity: String,
        attribute: String,
    },
    Instantiation {
        target: String,
        arguments: Vec<ResultSpec>,
    },
}

/// Fetch builder nested below an entity result or another fetch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchSpec {
    #[serde(default)]
    pub columns: Vec<String>,
    /// Table alias of a joined association.
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub lock_mode: LockMode,
    #[serde(default)]
    pub fetches: BTreeMap<String, FetchSpec>,
}

/// Fetch builder keyed by the owner's table alias.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyFetchSpec {
    pub alias: String,
    pub owner: String,
    pub fetchable: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub lock_mode: LockMode,
    #[serde(default)]
    pub fetches: BTreeMap<String, FetchSpec>,
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Session factory over the scenario's entities and fetch profiles.
    pub fn factory(&self, config: ResultsConfig) -> SessionFactory {
        let metamodel = self
            .entities
            .iter()
            .cloned()
            .fold(MappingMetamodel::new(1), MappingMetamodel::with_entity);
        let metamodel = self
            .fetch_profiles
            .iter()
            .cloned()
            .fold(metamodel, MappingMetamodel::with_fetch_profile);
        SessionFactory::with_config(metamodel, config)
    }

    pub fn metadata(&self) -> ResultSetMetadata {
        ResultSetMetadata::new(self.columns.clone())
    }

    /// Dynamic mapping built from the result and legacy fetch specs.
    pub fn mapping(&self, factory: &SessionFactory) -> rowmap_core::Result<ResultSetMapping> {
        let mut mapping = ResultSetMapping::dynamic(&self.name);
        for result in &self.results {
            mapping.add_result_builder(result.to_builder(factory)?)?;
        }
        for legacy in &self.legacy_fetches {
            let builder = legacy
                .fetches
                .iter()
                .fold(
                    legacy_fetch(&legacy.alias, &legacy.owner, &legacy.fetchable)
                        .with_column_names(legacy.columns.clone())
                        .with_lock_mode(legacy.lock_mode),
                    |builder, (name, fetch)| builder.with_fetch(name, fetch.to_builder()),
                );
            mapping.add_legacy_fetch_builder(builder);
        }
        Ok(mapping)
    }
}

impl ResultSpec {
    fn to_builder(&self, factory: &SessionFactory) -> rowmap_core::Result<ResultBuilder> {
        Ok(match self {
            ResultSpec::Scalar {
                column,
                position,
                scalar_type,
            } => ScalarResultBuilder {
                column_alias: column.clone(),
                jdbc_position: *position,
                explicit_type: scalar_type.clone(),
            }
            .into(),
            ResultSpec::Entity {
                alias,
                entity: entity_name,
                lock_mode,
                discriminator_alias,
                fetches,
            } => {
                let mut builder = entity(alias, entity_name, factory)?.with_lock_mode(*lock_mode);
                if let Some(discriminator_alias) = discriminator_alias {
                    builder = builder.with_discriminator_alias(discriminator_alias);
                }
                fetches
                    .iter()
                    .fold(builder, |builder, (name, fetch)| {
                        builder.with_fetch(name, fetch.to_builder())
                    })
                    .into()
            }
            ResultSpec::Attribute {
                column,
                entity,
                attribute,
            } => attribute_result(column, entity, attribute, factory)?.into(),
            ResultSpec::Instantiation { target, arguments } => instantiation(
                target,
                arguments
                    .iter()
                    .map(|argument| argument.to_builder(factory))
                    .collect::<rowmap_core::Result<Vec<_>>>()?,
            )
            .into(),
        })
    }
}

impl FetchSpec {
    fn to_builder(&self) -> DynamicFetchBuilder {
        let builder = DynamicFetchBuilder {
            column_names: self.columns.clone(),
            table_alias: self.alias.clone(),
            lock_mode: self.lock_mode,
            ..Default::default()
        };
        self.fetches
            .iter()
            .fold(builder, |builder, (name, fetch)| builder.with_fetch(name, fetch.to_builder()))
    }
}
