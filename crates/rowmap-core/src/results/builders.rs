//! Result builders and the factory functions that create them.

use super::creation_state::{DomainResultCreationState, EntityGraphSpec};
use super::domain::{BasicResult, DomainResult, EntityResult, InstantiationResult};
use super::fetch::{DynamicFetchBuilder, FetchBuilder, FetchBuilders, LegacyFetchBuilder};
use super::path::NavigablePath;
use super::selection::{ColumnReferenceKey, ResultSetMappingSqlSelection, SqlExpression};
use super::values_mapping::LockMode;
use crate::catalog::{AttributeKind, ScalarType};
use crate::error::{Error, Result};
use crate::session::SessionFactory;
use std::sync::Arc;

/// Builder of one top-level result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResultBuilder {
    Scalar(ScalarResultBuilder),
    Entity(EntityResultBuilder),
    Instantiation(InstantiationResultBuilder),
    Attribute(AttributeResultBuilder),
}

/// A single column read by alias, explicit position, or result position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ScalarResultBuilder {
    pub column_alias: Option<String>,
    /// 1-based JDBC position.
    pub jdbc_position: Option<usize>,
    /// Overrides the type derived from the column's JDBC type.
    pub explicit_type: Option<ScalarType>,
}

/// An entity read through a table alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityResultBuilder {
    pub entity_name: String,
    pub table_alias: String,
    pub lock_mode: LockMode,
    /// Result-set alias of the discriminator, overriding the mapped column.
    pub discriminator_alias: Option<String>,
    pub fetch_builders: FetchBuilders,
}

/// A constructor call over argument results.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstantiationResultBuilder {
    pub target: String,
    pub arguments: Vec<ResultBuilder>,
}

/// A basic entity attribute read from one column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeResultBuilder {
    pub column_alias: String,
    pub entity_name: String,
    pub attribute_name: String,
    pub scalar: ScalarType,
}

impl ScalarResultBuilder {
    /// Scalar read from an explicit 1-based JDBC position.
    pub fn at(jdbc_position: usize) -> Self {
        Self {
            jdbc_position: Some(jdbc_position),
            ..Default::default()
        }
    }

    /// Override the value type.
    pub fn with_type(mut self, scalar: ScalarType) -> Self {
        self.explicit_type = Some(scalar);
        self
    }

    /// Build the result for the top-level position `result_position`.
    pub fn build_result(
        &self,
        result_position: usize,
        state: &mut DomainResultCreationState<'_>,
    ) -> Result<DomainResult> {
        let metadata = state.metadata();
        let (key, jdbc_position) = match (&self.column_alias, self.jdbc_position) {
            (Some(alias), _) => (
                ColumnReferenceKey::column(None, alias),
                metadata.resolve_column_position(alias)?,
            ),
            (None, Some(position)) => (ColumnReferenceKey::position(position), position),
            (None, None) if state.allow_positional_selections() => {
                let position = result_position + 1;
                (ColumnReferenceKey::position(position), position)
            }
            (None, None) => return Err(Error::PositionalSelectionDisallowed { result_position }),
        };

        let jdbc_type = metadata.resolve_type(
            jdbc_position,
            self.explicit_type.as_ref(),
            state.factory().type_configuration(),
        )?;
        let column_name = metadata.column_name(jdbc_position)?.to_string();
        let selection = state.resolve_sql_expression(key, move || {
            SqlExpression::Selection(Arc::new(ResultSetMappingSqlSelection::new(
                jdbc_position - 1,
                jdbc_type,
            )))
        })?;

        Ok(DomainResult::Basic(BasicResult {
            position: selection.values_array_position(),
            jdbc_type: selection.jdbc_type().clone(),
            result_variable: Some(self.column_alias.clone().unwrap_or(column_name)),
        }))
    }
}

impl EntityResultBuilder {
    /// Add a builder for one fetchable of the entity.
    pub fn with_fetch(mut self, name: impl Into<String>, builder: impl Into<FetchBuilder>) -> Self {
        self.fetch_builders.insert(name.into(), builder.into());
        self
    }

    pub fn with_lock_mode(mut self, lock_mode: LockMode) -> Self {
        self.lock_mode = lock_mode;
        self
    }

    pub fn with_discriminator_alias(mut self, alias: impl Into<String>) -> Self {
        self.discriminator_alias = Some(alias.into());
        self
    }

    /// Check if any fetch builder below this result joins a table.
    pub fn contains_join(&self) -> bool {
        self.fetch_builders.values().any(FetchBuilder::contains_join)
    }

    fn build_result<'a>(&'a self, state: &mut DomainResultCreationState<'a>) -> Result<DomainResult> {
        let path = NavigablePath::root(&self.entity_name, Some(&self.table_alias));
        let graph = state.build_entity_graph(EntityGraphSpec {
            entity: &self.entity_name,
            path: path.clone(),
            table_alias: self.table_alias.clone(),
            discriminator_alias: self.discriminator_alias.as_deref(),
            lock_mode: self.lock_mode,
            fetch_builders: Some(&self.fetch_builders),
        })?;

        Ok(DomainResult::Entity(EntityResult {
            path,
            entity: self.entity_name.clone(),
            table_alias: self.table_alias.clone(),
            identifier: Box::new(graph.identifier),
            discriminator: graph.discriminator,
            fetches: graph.fetches,
            lock_mode: self.lock_mode,
        }))
    }
}

impl AttributeResultBuilder {
    fn build_result(&self, state: &mut DomainResultCreationState<'_>) -> Result<DomainResult> {
        let position = state.metadata().resolve_column_position(&self.column_alias)?;
        let jdbc_type = self.scalar.clone();
        let selection = state.resolve_sql_expression(ColumnReferenceKey::column(None, &self.column_alias), move || {
            SqlExpression::Selection(Arc::new(ResultSetMappingSqlSelection::new(position - 1, jdbc_type)))
        })?;

        Ok(DomainResult::Basic(BasicResult {
            position: selection.values_array_position(),
            jdbc_type: selection.jdbc_type().clone(),
            result_variable: Some(self.column_alias.clone()),
        }))
    }
}

impl ResultBuilder {
    /// Explicit JDBC positions claimed by this builder and its instantiation arguments.
    pub fn explicit_positions(&self) -> Vec<usize> {
        match self {
            ResultBuilder::Scalar(builder) => builder.jdbc_position.into_iter().collect(),
            ResultBuilder::Instantiation(builder) => builder
                .arguments
                .iter()
                .flat_map(ResultBuilder::explicit_positions)
                .collect(),
            ResultBuilder::Entity(_) | ResultBuilder::Attribute(_) => Vec::new(),
        }
    }

    /// Check if the builder is a scalar with neither column alias nor position.
    fn infers_position(&self) -> bool {
        matches!(
            self,
            ResultBuilder::Scalar(ScalarResultBuilder {
                column_alias: None,
                jdbc_position: None,
                ..
            })
        )
    }

    /// Build the domain result for top-level position `result_position`.
    pub fn build<'a>(
        &'a self,
        result_position: usize,
        state: &mut DomainResultCreationState<'a>,
    ) -> Result<DomainResult> {
        match self {
            ResultBuilder::Scalar(builder) => builder.build_result(result_position, state),
            ResultBuilder::Entity(builder) => builder.build_result(state),
            ResultBuilder::Attribute(builder) => builder.build_result(state),
            ResultBuilder::Instantiation(builder) => {
                // Arguments share the result position, so each must name its column.
                if builder.arguments.iter().any(ResultBuilder::infers_position) {
                    return Err(Error::PositionalSelectionDisallowed { result_position });
                }
                let arguments = builder
                    .arguments
                    .iter()
                    .map(|argument| argument.build(result_position, state))
                    .collect::<Result<Vec<_>>>()?;
                Ok(DomainResult::Instantiation(InstantiationResult {
                    target: builder.target.clone(),
                    arguments,
                }))
            }
        }
    }
}

impl From<ScalarResultBuilder> for ResultBuilder {
    fn from(builder: ScalarResultBuilder) -> Self {
        ResultBuilder::Scalar(builder)
    }
}

impl From<EntityResultBuilder> for ResultBuilder {
    fn from(builder: EntityResultBuilder) -> Self {
        ResultBuilder::Entity(builder)
    }
}

impl From<InstantiationResultBuilder> for ResultBuilder {
    fn from(builder: InstantiationResultBuilder) -> Self {
        ResultBuilder::Instantiation(builder)
    }
}

impl From<AttributeResultBuilder> for ResultBuilder {
    fn from(builder: AttributeResultBuilder) -> Self {
        ResultBuilder::Attribute(builder)
    }
}

/// Scalar result read by column alias.
pub fn scalar(column_alias: impl Into<String>) -> ScalarResultBuilder {
    ScalarResultBuilder {
        column_alias: Some(column_alias.into()),
        ..Default::default()
    }
}

/// Scalar result read from a 1-based JDBC position.
pub fn scalar_at(jdbc_position: usize) -> ScalarResultBuilder {
    ScalarResultBuilder::at(jdbc_position)
}

/// Entity result for `entity_name` read through `table_alias`.
pub fn entity(
    table_alias: impl Into<String>,
    entity_name: impl Into<String>,
    factory: &SessionFactory,
) -> Result<EntityResultBuilder> {
    let entity_name = entity_name.into();
    factory.metamodel().find_entity(&entity_name)?;
    Ok(EntityResultBuilder {
        entity_name,
        table_alias: table_alias.into(),
        lock_mode: LockMode::None,
        discriminator_alias: None,
        fetch_builders: FetchBuilders::new(),
    })
}

/// Result reading a basic attribute of `entity_name` from `column_alias`.
///
/// Only single-segment attribute paths are supported.
pub fn attribute_result(
    column_alias: impl Into<String>,
    entity_name: &str,
    attribute_path: &str,
    factory: &SessionFactory,
) -> Result<AttributeResultBuilder> {
    if attribute_path.contains('.') {
        return Err(Error::Unsupported(format!(
            "composite attribute path [{attribute_path}] in attribute result"
        )));
    }

    let attribute = factory.metamodel().find_attribute(entity_name, attribute_path)?;
    match &attribute.kind {
        AttributeKind::Basic(basic) => Ok(AttributeResultBuilder {
            column_alias: column_alias.into(),
            entity_name: entity_name.to_string(),
            attribute_name: attribute_path.to_string(),
            scalar: basic.scalar.clone(),
        }),
        _ => Err(Error::IllegalArgument(format!(
            "attribute [{entity_name}.{attribute_path}] is not basic-valued"
        ))),
    }
}

/// Dynamic instantiation of `target` from argument results.
pub fn instantiation(target: impl Into<String>, arguments: Vec<ResultBuilder>) -> InstantiationResultBuilder {
    InstantiationResultBuilder {
        target: target.into(),
        arguments,
    }
}

/// Fetch reading a fetchable from the given columns.
pub fn fetch(column_names: Vec<String>) -> DynamicFetchBuilder {
    DynamicFetchBuilder::new(column_names)
}

/// Fetch joining an association through `table_alias`.
pub fn joined_fetch(table_alias: impl Into<String>) -> DynamicFetchBuilder {
    DynamicFetchBuilder::joined(table_alias)
}

/// Legacy fetch joining `owner_alias.fetchable_name` as `table_alias`.
pub fn legacy_fetch(
    table_alias: impl Into<String>,
    owner_alias: impl Into<String>,
    fetchable_name: impl Into<String>,
) -> LegacyFetchBuilder {
    LegacyFetchBuilder::new(table_alias, owner_alias, fetchable_name)
}
