//! Fetch builders synthesized from the metamodel when nothing explicit applies.

use super::creation_state::{DomainResultCreationState, FetchParent};
use super::domain::{DiscriminatedFetch, Fetch, PluralFetch};
use super::fetch::Fetchable;
use super::path::NavigablePath;
use crate::catalog::{AnyDef, BasicDef, EmbeddableDef, PluralDef, ScalarType, ToOneDef};
use crate::error::Result;

/// Default fetch builder for one fetchable category.
#[derive(Debug, Clone)]
pub enum ImplicitFetchBuilder<'a> {
    /// Reads the attribute's own column.
    Basic {
        path: NavigablePath,
        basic: &'a BasicDef,
    },
    /// Resolves each component; aggregate embeddables read inside their aggregate column.
    Embeddable {
        path: NavigablePath,
        embeddable: &'a EmbeddableDef,
    },
    /// Immediate to-one association loaded by a subsequent select on its key.
    Entity {
        path: NavigablePath,
        to_one: &'a ToOneDef,
    },
    /// Delayed collection keyed by its key columns.
    Plural {
        path: NavigablePath,
        plural: &'a PluralDef,
    },
    /// Entity element of a joined collection.
    EntityCollectionPart {
        path: NavigablePath,
        target: &'a str,
    },
    /// Discriminator plus key columns of an "any" association.
    Discriminated {
        path: NavigablePath,
        any: &'a AnyDef,
    },
}

/// Default builder for `fetchable`.
pub fn implicit_fetch_builder<'a>(path: NavigablePath, fetchable: Fetchable<'a>) -> ImplicitFetchBuilder<'a> {
    match fetchable {
        Fetchable::Basic { basic, .. } => ImplicitFetchBuilder::Basic { path, basic },
        Fetchable::Embeddable { embeddable, .. } => ImplicitFetchBuilder::Embeddable { path, embeddable },
        Fetchable::ToOne { to_one, .. } => ImplicitFetchBuilder::Entity { path, to_one },
        Fetchable::Plural { plural, .. } => ImplicitFetchBuilder::Plural { path, plural },
        Fetchable::EntityCollectionPart { target, .. } => {
            ImplicitFetchBuilder::EntityCollectionPart { path, target }
        }
        Fetchable::Discriminated { any, .. } => ImplicitFetchBuilder::Discriminated { path, any },
    }
}

impl<'a> ImplicitFetchBuilder<'a> {
    pub fn path(&self) -> &NavigablePath {
        match self {
            ImplicitFetchBuilder::Basic { path, .. }
            | ImplicitFetchBuilder::Embeddable { path, .. }
            | ImplicitFetchBuilder::Entity { path, .. }
            | ImplicitFetchBuilder::Plural { path, .. }
            | ImplicitFetchBuilder::EntityCollectionPart { path, .. }
            | ImplicitFetchBuilder::Discriminated { path, .. } => path,
        }
    }

    /// Build the fetch below `parent`.
    pub fn build_fetch(
        self,
        parent: &FetchParent<'a>,
        state: &mut DomainResultCreationState<'a>,
    ) -> Result<Fetch> {
        match self {
            ImplicitFetchBuilder::Basic { path, basic } => Ok(Fetch::Basic(state.basic_fetch(
                parent,
                path,
                &basic.column,
                &basic.scalar,
            )?)),
            // Components of an implicit embeddable never see the owner's explicit builders.
            ImplicitFetchBuilder::Embeddable { path, embeddable } => state
                .with_fetch_builder_scope(None, |state| {
                    state.embeddable_fetch(parent, path, embeddable)
                }),
            ImplicitFetchBuilder::Entity { path, to_one } => {
                state.foreign_key_fetch(parent, path, to_one, true)
            }
            ImplicitFetchBuilder::Plural { path, plural } => {
                let key = state.collection_key_positions(parent, plural)?;
                Ok(Fetch::Plural(PluralFetch {
                    path,
                    key,
                    element: None,
                    table_alias: None,
                }))
            }
            ImplicitFetchBuilder::EntityCollectionPart { path, target } => {
                state.collection_part_fetch(parent, path, target, parent.table_alias.clone())
            }
            ImplicitFetchBuilder::Discriminated { path, any } => {
                let discriminator =
                    state.select_column(parent, &any.discriminator_column, &ScalarType::String)?;
                let key = state.select_column(parent, &any.key_column, &any.key_type)?;
                Ok(Fetch::Discriminated(DiscriminatedFetch {
                    path,
                    discriminator: discriminator.values_array_position(),
                    key: key.values_array_position(),
                }))
            }
        }
    }
}
