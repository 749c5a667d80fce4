//! Per-resolution context threaded through every builder.

use super::domain::{
    BasicFetch, CircularFetch, DiscriminatedFetch, EmbeddableFetch, EntityJoinedFetch,
    EntityKeyFetch, Fetch, PluralFetch,
};
use super::fetch::{FetchBuilder, FetchBuilders, Fetchable, LegacyFetchBuilder, LegacyFetchBuilders};
use super::from_clause::{FromClauseAccess, TableGroup};
use super::implicit::implicit_fetch_builder;
use super::path::NavigablePath;
use super::selection::{
    ColumnReference, ColumnReferenceKey, ResultSetMappingSqlSelection, SqlExpression,
};
use super::values_mapping::LockMode;
use crate::catalog::{
    CollectionElement, EmbeddableDef, FetchTiming, ForeignKeySide, MappingMetamodel, PluralDef,
    ScalarType, ToOneDef,
};
use crate::error::{Error, Result};
use crate::jdbc::JdbcValuesMetadata;
use crate::session::{LoadQueryInfluencers, SessionFactory};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, trace};

/// Name of the discriminator node below an entity path.
pub const DISCRIMINATOR_PART_NAME: &str = "{discriminator}";

/// What a fetch parent exposes fetchables of.
#[derive(Debug, Clone, Copy)]
pub enum FetchContainer<'a> {
    Entity(&'a str),
    Embeddable(&'a EmbeddableDef),
    Collection(&'a PluralDef),
}

/// A node whose fetchables are being resolved.
#[derive(Debug, Clone)]
pub struct FetchParent<'a> {
    pub path: NavigablePath,
    /// Table alias the parent's columns are read through.
    pub table_alias: Option<String>,
    pub container: FetchContainer<'a>,
    /// Entity owning the row the parent lives in.
    pub owner_entity: &'a str,
    /// Set for identifier embeddables: all of their fetchables are key fetchables.
    pub is_key: bool,
}

impl<'a> FetchParent<'a> {
    /// Parent for an entity read through `table_alias`.
    pub fn entity(path: NavigablePath, table_alias: Option<String>, entity: &'a str) -> Self {
        Self {
            path,
            table_alias,
            container: FetchContainer::Entity(entity),
            owner_entity: entity,
            is_key: false,
        }
    }

    /// Parent for an embeddable living in this parent's row.
    pub fn embedded(&self, path: NavigablePath, embeddable: &'a EmbeddableDef, is_key: bool) -> Self {
        Self {
            path,
            table_alias: self.table_alias.clone(),
            container: FetchContainer::Embeddable(embeddable),
            owner_entity: self.owner_entity,
            is_key,
        }
    }
}

/// Embeddable whose columns are read from inside one aggregate value.
#[derive(Debug, Clone)]
pub struct NestingFetchParent<'a> {
    pub path: NavigablePath,
    pub embeddable: &'a EmbeddableDef,
}

/// Resolved parts of an entity node.
#[derive(Debug)]
pub(crate) struct EntityGraph {
    pub identifier: Fetch,
    pub discriminator: Option<BasicFetch>,
    pub fetches: Vec<Fetch>,
}

/// Inputs for resolving one entity node.
pub(crate) struct EntityGraphSpec<'a> {
    pub entity: &'a str,
    pub path: NavigablePath,
    pub table_alias: String,
    pub discriminator_alias: Option<&'a str>,
    pub lock_mode: LockMode,
    pub fetch_builders: Option<&'a FetchBuilders>,
}

#[derive(Debug)]
struct JoinLink {
    entity: String,
    alias: String,
    path: NavigablePath,
}

/// Borrowed view of an explicit or legacy fetch builder.
#[derive(Clone, Copy)]
struct BuilderView<'a> {
    columns: &'a [String],
    table_alias: Option<&'a str>,
    lock_mode: LockMode,
    fetch_builders: &'a FetchBuilders,
}

impl<'a> From<&'a FetchBuilder> for BuilderView<'a> {
    fn from(builder: &'a FetchBuilder) -> Self {
        Self {
            columns: builder.column_names(),
            table_alias: builder.table_alias(),
            lock_mode: builder.lock_mode(),
            fetch_builders: builder.fetch_builders(),
        }
    }
}

impl<'a> From<&'a LegacyFetchBuilder> for BuilderView<'a> {
    fn from(builder: &'a LegacyFetchBuilder) -> Self {
        Self {
            columns: &builder.column_names,
            table_alias: Some(builder.table_alias.as_str()),
            lock_mode: builder.lock_mode,
            fetch_builders: &builder.fetch_builders,
        }
    }
}

/// Mutable state of one `resolve` pass.
///
/// A fresh context is created per resolution and never shared between
/// threads. Every builder receives it by `&mut` borrow.
pub struct DomainResultCreationState<'a> {
    factory: &'a SessionFactory,
    metadata: &'a dyn JdbcValuesMetadata,
    influencers: &'a LoadQueryInfluencers,
    legacy_fetch_builders: &'a LegacyFetchBuilders,
    from_clause: FromClauseAccess,
    selection_map: HashMap<ColumnReferenceKey, Arc<ResultSetMappingSqlSelection>>,
    selections: Vec<Arc<ResultSetMappingSqlSelection>>,
    fetch_builder_scopes: Vec<Option<&'a FetchBuilders>>,
    processing_key_fetches: bool,
    nesting_fetch_parent: Option<NestingFetchParent<'a>>,
    allow_positional_selections: bool,
    lock_modes: BTreeMap<String, LockMode>,
    join_chain: Vec<JoinLink>,
}

impl<'a> DomainResultCreationState<'a> {
    /// Create the context for one resolution pass.
    pub fn new(
        factory: &'a SessionFactory,
        metadata: &'a dyn JdbcValuesMetadata,
        influencers: &'a LoadQueryInfluencers,
        legacy_fetch_builders: &'a LegacyFetchBuilders,
    ) -> Self {
        Self {
            factory,
            metadata,
            influencers,
            legacy_fetch_builders,
            from_clause: FromClauseAccess::new(),
            selection_map: HashMap::new(),
            selections: Vec::new(),
            fetch_builder_scopes: Vec::new(),
            processing_key_fetches: false,
            nesting_fetch_parent: None,
            allow_positional_selections: true,
            lock_modes: BTreeMap::new(),
            join_chain: Vec::new(),
        }
    }

    pub fn factory(&self) -> &'a SessionFactory {
        self.factory
    }

    pub fn metadata(&self) -> &'a dyn JdbcValuesMetadata {
        self.metadata
    }

    fn metamodel(&self) -> &'a MappingMetamodel {
        self.factory.metamodel()
    }

    pub fn from_clause_access(&self) -> &FromClauseAccess {
        &self.from_clause
    }

    /// Selections registered so far, in registration order.
    pub fn selections(&self) -> &[Arc<ResultSetMappingSqlSelection>] {
        &self.selections
    }

    pub fn allow_positional_selections(&self) -> bool {
        self.allow_positional_selections
    }

    /// Require column names for the rest of the pass.
    pub fn disallow_positional_selections(&mut self) {
        if self.allow_positional_selections {
            debug!("positional selections disallowed");
        }
        self.allow_positional_selections = false;
    }

    pub fn is_processing_key_fetches(&self) -> bool {
        self.processing_key_fetches
    }

    pub fn nesting_fetch_parent(&self) -> Option<&NestingFetchParent<'a>> {
        self.nesting_fetch_parent.as_ref()
    }

    /// Register the lock mode requested for a table alias.
    pub fn register_lock_mode(&mut self, alias: &str, lock_mode: LockMode) {
        self.lock_modes.insert(alias.to_string(), lock_mode);
    }

    /// Builders of the innermost explicit scope.
    pub fn current_fetch_builders(&self) -> Option<&'a FetchBuilders> {
        self.fetch_builder_scopes.last().copied().flatten()
    }

    /// Consume the context, yielding the selections and lock modes.
    pub(crate) fn into_parts(
        self,
    ) -> (
        Vec<Arc<ResultSetMappingSqlSelection>>,
        BTreeMap<String, LockMode>,
    ) {
        (self.selections, self.lock_modes)
    }

    /// Selection for `key`, created through `creator` on first request only.
    ///
    /// Repeated requests return the same `Arc` and register nothing new.
    pub fn resolve_sql_expression(
        &mut self,
        key: ColumnReferenceKey,
        creator: impl FnOnce() -> SqlExpression,
    ) -> Result<Arc<ResultSetMappingSqlSelection>> {
        if let Some(existing) = self.selection_map.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let selection = match creator() {
            SqlExpression::Selection(selection) => selection,
            SqlExpression::ColumnReference(reference) => Arc::new(self.position_column(&reference)?),
            SqlExpression::CaseDiscriminator { alias, jdbc_type } => {
                let position = self.metadata.resolve_column_position(&alias)?;
                Arc::new(ResultSetMappingSqlSelection::new(position - 1, jdbc_type))
            }
        };

        trace!(
            key = ?key,
            position = selection.values_array_position(),
            nested = selection.is_nested(),
            "registered selection"
        );
        self.selection_map.insert(key, Arc::clone(&selection));
        self.selections.push(Arc::clone(&selection));
        Ok(selection)
    }

    fn position_column(&self, reference: &ColumnReference) -> Result<ResultSetMappingSqlSelection> {
        match &self.nesting_fetch_parent {
            Some(nesting) => {
                let index = nesting
                    .embeddable
                    .selectable_index(&reference.column)
                    .ok_or_else(|| Error::NestedSelectableNotFound {
                        column: reference.column.clone(),
                        parent: nesting.embeddable.name.clone(),
                    })?;
                Ok(ResultSetMappingSqlSelection::nested(
                    index,
                    reference.jdbc_type.clone(),
                ))
            }
            None => {
                let position = self.metadata.resolve_column_position(&reference.column)?;
                Ok(ResultSetMappingSqlSelection::new(
                    position - 1,
                    reference.jdbc_type.clone(),
                ))
            }
        }
    }

    /// Run `action` with `scope` as the innermost explicit fetch builder scope.
    pub fn with_fetch_builder_scope<R>(
        &mut self,
        scope: Option<&'a FetchBuilders>,
        action: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.fetch_builder_scopes.push(scope);
        let result = action(self);
        self.fetch_builder_scopes.pop();
        result
    }

    /// Run `action` with `parent` as the nesting fetch parent, restoring the
    /// previous one afterwards.
    pub fn with_nested_fetch_parent<R>(
        &mut self,
        parent: NestingFetchParent<'a>,
        action: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let previous = self.nesting_fetch_parent.replace(parent);
        let result = action(self);
        self.nesting_fetch_parent = previous;
        result
    }

    /// Run `action` with key-fetch processing switched on or off.
    fn with_key_fetch_processing<R>(&mut self, processing: bool, action: impl FnOnce(&mut Self) -> R) -> R {
        let previous = std::mem::replace(&mut self.processing_key_fetches, processing);
        let result = action(self);
        self.processing_key_fetches = previous;
        result
    }

    fn at_top_level<R>(&mut self, action: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.nesting_fetch_parent.take();
        let result = action(self);
        self.nesting_fetch_parent = previous;
        result
    }

    /// Resolve the fetches of `parent`: key fetchables first, then ordinary ones.
    pub fn visit_fetches(&mut self, parent: &FetchParent<'a>) -> Result<Vec<Fetch>> {
        let (keys, ordinary) = self.fetchables_of(parent)?;
        let mut fetches = Vec::with_capacity(keys.len() + ordinary.len());
        for fetchable in keys {
            fetches.push(self.with_key_fetch_processing(true, |state| state.resolve_fetch(parent, fetchable))?);
        }
        for fetchable in ordinary {
            fetches.push(self.resolve_fetch(parent, fetchable)?);
        }
        Ok(fetches)
    }

    /// Resolve the identifier of the entity owning `parent`.
    pub fn visit_identifier_fetch(&mut self, parent: &FetchParent<'a>) -> Result<Fetch> {
        let identifier = self.metamodel().identifier_of(parent.owner_entity)?;
        let fetchable = Fetchable::from_attribute(identifier);
        self.with_key_fetch_processing(true, |state| state.resolve_fetch(parent, fetchable))
    }

    fn fetchables_of(
        &self,
        parent: &FetchParent<'a>,
    ) -> Result<(Vec<Fetchable<'a>>, Vec<Fetchable<'a>>)> {
        let metamodel = self.metamodel();
        let fetchables: Vec<Fetchable<'a>> = match parent.container {
            FetchContainer::Entity(entity) => metamodel
                .version_of(entity)?
                .into_iter()
                .chain(metamodel.fetchable_attributes(entity)?)
                .filter(|attribute| attribute.selectable)
                .map(Fetchable::from_attribute)
                .collect(),
            FetchContainer::Embeddable(embeddable) => embeddable
                .attributes
                .iter()
                .filter(|attribute| attribute.selectable)
                .map(Fetchable::from_attribute)
                .collect(),
            FetchContainer::Collection(plural) => vec![Fetchable::collection_element(plural)],
        };

        if parent.is_key {
            Ok((fetchables, Vec::new()))
        } else {
            Ok((Vec::new(), fetchables))
        }
    }

    /// Resolve one fetchable of `parent`.
    ///
    /// Precedence: an explicit builder from the innermost scope, then a legacy
    /// builder registered for the parent's alias, then a key-only fetch for
    /// deferred to-one associations, then the implicit builder.
    pub fn resolve_fetch(&mut self, parent: &FetchParent<'a>, fetchable: Fetchable<'a>) -> Result<Fetch> {
        let name = fetchable.name();
        let path = parent.path.append(name);

        if let Some(builder) = self.current_fetch_builders().and_then(|builders| builders.get(name)) {
            debug!(path = %path, "using explicit fetch builder");
            return self.fetch_from_builder(parent, fetchable, path, builder.into());
        }

        let legacy = self.legacy_fetch_builders;
        if let Some(builder) = parent
            .table_alias
            .as_deref()
            .and_then(|alias| legacy.get(alias))
            .and_then(|builders| builders.get(name))
        {
            debug!(path = %path, alias = %builder.table_alias, "using legacy fetch builder");
            return self.fetch_from_builder(parent, fetchable, path, builder.into());
        }

        self.resolve_default_fetch(parent, fetchable, path)
    }

    fn resolve_default_fetch(
        &mut self,
        parent: &FetchParent<'a>,
        fetchable: Fetchable<'a>,
        path: NavigablePath,
    ) -> Result<Fetch> {
        if let Fetchable::ToOne { name, to_one } = fetchable {
            if self.processing_key_fetches || !self.is_immediate(parent, name, to_one) {
                return self.foreign_key_fetch(parent, path, to_one, false);
            }
        }
        implicit_fetch_builder(path, fetchable).build_fetch(parent, self)
    }

    fn is_immediate(&self, parent: &FetchParent<'a>, name: &str, to_one: &ToOneDef) -> bool {
        to_one.fetch == FetchTiming::Immediate
            || self.metamodel().profiles_cover(
                self.influencers.enabled_fetch_profiles(),
                parent.owner_entity,
                name,
            )
    }

    fn fetch_from_builder(
        &mut self,
        parent: &FetchParent<'a>,
        fetchable: Fetchable<'a>,
        path: NavigablePath,
        builder: BuilderView<'a>,
    ) -> Result<Fetch> {
        match (fetchable, builder.table_alias) {
            (Fetchable::ToOne { to_one, .. }, Some(alias)) => {
                self.joined_entity_fetch(parent, path, to_one, alias, builder)
            }
            (Fetchable::Plural { plural, .. }, Some(alias)) => {
                self.joined_collection_fetch(parent, path, plural, alias, builder)
            }
            (Fetchable::EntityCollectionPart { target, .. }, alias) => {
                let alias = alias.map(str::to_string).or_else(|| parent.table_alias.clone());
                self.with_fetch_builder_scope(Some(builder.fetch_builders), |state| {
                    state.collection_part_fetch(parent, path, target, alias)
                })
            }
            (Fetchable::Embeddable { embeddable, .. }, _) if builder.columns.is_empty() => self
                .with_fetch_builder_scope(Some(builder.fetch_builders), |state| {
                    state.embeddable_fetch(parent, path, embeddable)
                }),
            (_, _) if builder.columns.is_empty() => self.resolve_default_fetch(parent, fetchable, path),
            (_, _) => self.with_fetch_builder_scope(Some(builder.fetch_builders), |state| {
                state.fetch_with_columns(parent, fetchable, path, builder.columns)
            }),
        }
    }

    /// Fetch reading the fetchable from explicitly named columns.
    fn fetch_with_columns(
        &mut self,
        parent: &FetchParent<'a>,
        fetchable: Fetchable<'a>,
        path: NavigablePath,
        columns: &[String],
    ) -> Result<Fetch> {
        match fetchable {
            Fetchable::Basic { basic, .. } => {
                let column = required_columns(&path, columns, 1)?;
                Ok(Fetch::Basic(self.basic_fetch(parent, path, &column[0], &basic.scalar)?))
            }
            Fetchable::Embeddable { embeddable, .. } => {
                let child = parent.embedded(path.clone(), embeddable, parent.is_key || self.processing_key_fetches);
                let mut fetches = Vec::new();
                let mut offset = 0;
                for attribute in embeddable.attributes.iter().filter(|a| a.selectable) {
                    let component = Fetchable::from_attribute(attribute);
                    let span = attribute.column_span();
                    if span == 0 {
                        fetches.push(self.resolve_fetch(&child, component)?);
                        continue;
                    }
                    let slice = columns.get(offset..offset + span).ok_or_else(|| {
                        Error::IllegalArgument(format!(
                            "fetch builder for [{path}] supplies {} columns, more are required",
                            columns.len()
                        ))
                    })?;
                    offset += span;
                    let component_path = path.append(&attribute.name);
                    fetches.push(self.fetch_with_columns(&child, component, component_path, slice)?);
                }
                Ok(Fetch::Embeddable(EmbeddableFetch {
                    path,
                    embeddable: embeddable.name.clone(),
                    aggregate_position: None,
                    fetches,
                }))
            }
            Fetchable::ToOne { name, to_one } => {
                let key = self.key_positions(parent, columns, &to_one.target)?;
                let fetch = EntityKeyFetch {
                    path,
                    entity: to_one.target.clone(),
                    key,
                    side: to_one.side,
                };
                if self.is_immediate(parent, name, to_one) && !self.processing_key_fetches {
                    Ok(Fetch::EntitySelect(fetch))
                } else {
                    Ok(Fetch::EntityDelayed(fetch))
                }
            }
            Fetchable::Plural { .. } => {
                let key = self.key_positions(parent, columns, parent.owner_entity)?;
                Ok(Fetch::Plural(PluralFetch {
                    path,
                    key,
                    element: None,
                    table_alias: None,
                }))
            }
            Fetchable::EntityCollectionPart { target, .. } => {
                let key = self.key_positions(parent, columns, target)?;
                Ok(Fetch::EntitySelect(EntityKeyFetch {
                    path,
                    entity: target.to_string(),
                    key,
                    side: ForeignKeySide::Referring,
                }))
            }
            Fetchable::Discriminated { any, .. } => {
                let columns = required_columns(&path, columns, 2)?;
                let discriminator = self.select_column(parent, &columns[0], &ScalarType::String)?;
                let key = self.select_column(parent, &columns[1], &any.key_type)?;
                Ok(Fetch::Discriminated(DiscriminatedFetch {
                    path,
                    discriminator: discriminator.values_array_position(),
                    key: key.values_array_position(),
                }))
            }
        }
    }

    /// Selection for a column read through the parent's table reference.
    pub(crate) fn select_column(
        &mut self,
        parent: &FetchParent<'a>,
        column: &str,
        jdbc_type: &ScalarType,
    ) -> Result<Arc<ResultSetMappingSqlSelection>> {
        let qualifier = match &self.nesting_fetch_parent {
            Some(nesting) => Some(nesting.path.full_path().to_string()),
            None => parent.table_alias.clone(),
        };
        let key = ColumnReferenceKey::column(qualifier.as_deref(), column);
        let table_alias = parent.table_alias.clone();
        self.resolve_sql_expression(key, || {
            SqlExpression::ColumnReference(ColumnReference {
                table_alias,
                column: column.to_string(),
                jdbc_type: jdbc_type.clone(),
            })
        })
    }

    pub(crate) fn basic_fetch(
        &mut self,
        parent: &FetchParent<'a>,
        path: NavigablePath,
        column: &str,
        jdbc_type: &ScalarType,
    ) -> Result<BasicFetch> {
        let selection = self.select_column(parent, column, jdbc_type)?;
        Ok(BasicFetch {
            path,
            position: selection.values_array_position(),
            jdbc_type: selection.jdbc_type().clone(),
            nested: selection.is_nested(),
        })
    }

    fn key_positions<S: AsRef<str>>(
        &mut self,
        parent: &FetchParent<'a>,
        columns: &[S],
        key_entity: &str,
    ) -> Result<Vec<usize>> {
        let types = self.metamodel().key_types(key_entity)?;
        let mut positions = Vec::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            let jdbc_type = types.get(index).cloned().unwrap_or(ScalarType::Object);
            positions.push(self.select_column(parent, column.as_ref(), &jdbc_type)?.values_array_position());
        }
        Ok(positions)
    }

    fn foreign_key_positions(&mut self, parent: &FetchParent<'a>, to_one: &'a ToOneDef) -> Result<Vec<usize>> {
        match to_one.side {
            ForeignKeySide::Referring => self.key_positions(parent, &to_one.fk_columns, &to_one.target),
            ForeignKeySide::Target => {
                let columns = self.metamodel().key_columns(parent.owner_entity)?;
                self.at_top_level(|state| state.key_positions(parent, &columns, parent.owner_entity))
            }
        }
    }

    /// Fetch reading only the key of a to-one association.
    pub(crate) fn foreign_key_fetch(
        &mut self,
        parent: &FetchParent<'a>,
        path: NavigablePath,
        to_one: &'a ToOneDef,
        immediate: bool,
    ) -> Result<Fetch> {
        let key = self.foreign_key_positions(parent, to_one)?;
        trace!(path = %path, immediate, "foreign key fetch");
        let fetch = EntityKeyFetch {
            path,
            entity: to_one.target.clone(),
            key,
            side: to_one.side,
        };
        Ok(if immediate {
            Fetch::EntitySelect(fetch)
        } else {
            Fetch::EntityDelayed(fetch)
        })
    }

    /// Key positions of a collection: its key columns, or the owner's identifier.
    pub(crate) fn collection_key_positions(
        &mut self,
        parent: &FetchParent<'a>,
        plural: &'a PluralDef,
    ) -> Result<Vec<usize>> {
        if plural.key_columns.is_empty() {
            let columns = self.metamodel().key_columns(parent.owner_entity)?;
            self.at_top_level(|state| state.key_positions(parent, &columns, parent.owner_entity))
        } else {
            self.key_positions(parent, &plural.key_columns, parent.owner_entity)
        }
    }

    /// Embeddable fetch resolving the components through the current scope.
    pub(crate) fn embeddable_fetch(
        &mut self,
        parent: &FetchParent<'a>,
        path: NavigablePath,
        embeddable: &'a EmbeddableDef,
    ) -> Result<Fetch> {
        let child = parent.embedded(path.clone(), embeddable, parent.is_key || self.processing_key_fetches);
        let (aggregate_position, fetches) = match embeddable.aggregate_column.as_deref() {
            Some(column) => {
                let aggregate = self.select_column(parent, column, &ScalarType::Object)?;
                let nesting = NestingFetchParent {
                    path: path.clone(),
                    embeddable,
                };
                let fetches = self.with_nested_fetch_parent(nesting, |state| state.visit_fetches(&child))?;
                (Some(aggregate.values_array_position()), fetches)
            }
            None => (None, self.visit_fetches(&child)?),
        };
        Ok(Fetch::Embeddable(EmbeddableFetch {
            path,
            embeddable: embeddable.name.clone(),
            aggregate_position,
            fetches,
        }))
    }

    fn joined_entity_fetch(
        &mut self,
        parent: &FetchParent<'a>,
        path: NavigablePath,
        to_one: &'a ToOneDef,
        alias: &'a str,
        builder: BuilderView<'a>,
    ) -> Result<Fetch> {
        let ancestor = self
            .join_chain
            .iter()
            .find(|link| link.alias == alias && link.entity == to_one.target)
            .map(|link| link.path.clone());
        if let Some(referenced_path) = ancestor {
            debug!(path = %path, referenced = %referenced_path, "circular fetch");
            let key = self.foreign_key_positions(parent, to_one)?;
            return Ok(Fetch::Circular(CircularFetch {
                path,
                referenced_path,
                entity: to_one.target.clone(),
                key,
            }));
        }

        let graph = self.build_entity_graph(EntityGraphSpec {
            entity: &to_one.target,
            path: path.clone(),
            table_alias: alias.to_string(),
            discriminator_alias: None,
            lock_mode: builder.lock_mode,
            fetch_builders: Some(builder.fetch_builders),
        })?;
        Ok(Fetch::EntityJoined(EntityJoinedFetch {
            path,
            entity: to_one.target.clone(),
            table_alias: alias.to_string(),
            identifier: Box::new(graph.identifier),
            discriminator: graph.discriminator,
            fetches: graph.fetches,
            lock_mode: builder.lock_mode,
        }))
    }

    fn joined_collection_fetch(
        &mut self,
        parent: &FetchParent<'a>,
        path: NavigablePath,
        plural: &'a PluralDef,
        alias: &'a str,
        builder: BuilderView<'a>,
    ) -> Result<Fetch> {
        let key = if builder.columns.is_empty() {
            self.collection_key_positions(parent, plural)?
        } else {
            self.key_positions(parent, builder.columns, parent.owner_entity)?
        };

        let element_entity = match &plural.element {
            CollectionElement::Entity { target } => target.as_str(),
            _ => parent.owner_entity,
        };
        self.from_clause
            .register_table_group(TableGroup::new(path.clone(), alias, element_entity));
        if builder.lock_mode.is_locking() {
            self.register_lock_mode(alias, builder.lock_mode);
        }

        let collection = FetchParent {
            path: path.clone(),
            table_alias: Some(alias.to_string()),
            container: FetchContainer::Collection(plural),
            owner_entity: parent.owner_entity,
            is_key: false,
        };
        let element = self
            .with_fetch_builder_scope(Some(builder.fetch_builders), |state| state.visit_fetches(&collection))?
            .into_iter()
            .next()
            .map(Box::new);

        Ok(Fetch::Plural(PluralFetch {
            path,
            key,
            element,
            table_alias: Some(alias.to_string()),
        }))
    }

    /// Entity element of a joined collection, read through the collection's alias.
    pub(crate) fn collection_part_fetch(
        &mut self,
        parent: &FetchParent<'a>,
        path: NavigablePath,
        target: &'a str,
        alias: Option<String>,
    ) -> Result<Fetch> {
        let alias = alias.ok_or_else(|| {
            Error::IllegalArgument(format!("collection part [{path}] is not joined through a table alias"))
        })?;
        let scope = self.current_fetch_builders();
        let graph = self.build_entity_graph(EntityGraphSpec {
            entity: target,
            path: path.clone(),
            table_alias: alias.clone(),
            discriminator_alias: None,
            lock_mode: LockMode::None,
            fetch_builders: scope,
        })?;
        Ok(Fetch::EntityJoined(EntityJoinedFetch {
            path,
            entity: target.to_string(),
            table_alias: alias,
            identifier: Box::new(graph.identifier),
            discriminator: graph.discriminator,
            fetches: graph.fetches,
            lock_mode: LockMode::None,
        }))
    }

    /// Resolve identifier, discriminator and fetches of an entity node.
    pub(crate) fn build_entity_graph(&mut self, spec: EntityGraphSpec<'a>) -> Result<EntityGraph> {
        let entity = self.metamodel().find_entity(spec.entity)?;
        let depth = self.join_chain.len();
        let max_depth = self.factory.config().max_fetch_depth;
        if depth > max_depth {
            return Err(Error::FetchDepthExceeded {
                path: spec.path.to_string(),
                depth,
                max_depth,
            });
        }

        self.from_clause.register_table_group(TableGroup::new(
            spec.path.clone(),
            spec.table_alias.clone(),
            spec.entity,
        ));
        if spec.lock_mode.is_locking() {
            self.register_lock_mode(&spec.table_alias, spec.lock_mode);
        }

        self.join_chain.push(JoinLink {
            entity: spec.entity.to_string(),
            alias: spec.table_alias.clone(),
            path: spec.path.clone(),
        });
        let parent = FetchParent::entity(spec.path, Some(spec.table_alias), entity.name.as_str());
        let discriminator_alias = spec.discriminator_alias;
        // A joined target reached from a key fetchable resolves its own fetches normally.
        let graph: Result<EntityGraph> = self.with_key_fetch_processing(false, |state| {
            state.with_fetch_builder_scope(spec.fetch_builders, |state| {
                let identifier = state.visit_identifier_fetch(&parent)?;
                let discriminator = state.discriminator_fetch(&parent, discriminator_alias)?;
                let fetches = state.visit_fetches(&parent)?;
                Ok(EntityGraph {
                    identifier,
                    discriminator,
                    fetches,
                })
            })
        });
        self.join_chain.pop();
        graph
    }

    fn discriminator_fetch(
        &mut self,
        parent: &FetchParent<'a>,
        alias_override: Option<&'a str>,
    ) -> Result<Option<BasicFetch>> {
        let Some(discriminator) = self.metamodel().discriminator_of(parent.owner_entity)? else {
            return Ok(None);
        };
        let path = parent.path.append(DISCRIMINATOR_PART_NAME);

        let case_alias = match (alias_override, discriminator.column.as_deref()) {
            (None, Some(column)) => {
                return self
                    .basic_fetch(parent, path, column, &ScalarType::String)
                    .map(Some);
            }
            (Some(alias), _) => alias,
            (None, None) => self.factory().config().discriminator_alias.as_str(),
        };

        let key = ColumnReferenceKey::column(parent.table_alias.as_deref(), case_alias);
        let selection = self.resolve_sql_expression(key, || SqlExpression::CaseDiscriminator {
            alias: case_alias.to_string(),
            jdbc_type: ScalarType::String,
        })?;
        Ok(Some(BasicFetch {
            path,
            position: selection.values_array_position(),
            jdbc_type: ScalarType::String,
            nested: false,
        }))
    }
}

fn required_columns<'c>(path: &NavigablePath, columns: &'c [String], count: usize) -> Result<&'c [String]> {
    columns.get(..count).ok_or_else(|| {
        Error::IllegalArgument(format!(
            "fetch builder for [{path}] supplies {} columns, {count} required",
            columns.len()
        ))
    })
}
