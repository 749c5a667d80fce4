//! Navigable paths identifying nodes of a domain result graph.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dotted path from a root result to one of its fetches, e.g. `Person(p).address.city`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NavigablePath {
    full_path: String,
}

impl NavigablePath {
    /// Path of a root entity result, qualified by its table alias when present.
    pub fn root(entity: &str, alias: Option<&str>) -> Self {
        let full_path = match alias {
            Some(alias) => format!("{entity}({alias})"),
            None => entity.to_string(),
        };
        Self { full_path }
    }

    /// Path of a child node.
    pub fn append(&self, name: &str) -> Self {
        Self {
            full_path: format!("{}.{}", self.full_path, name),
        }
    }

    /// Parent path, if this is not a root.
    pub fn parent(&self) -> Option<NavigablePath> {
        self.full_path
            .rsplit_once('.')
            .map(|(parent, _)| NavigablePath {
                full_path: parent.to_string(),
            })
    }

    /// Last segment of the path.
    pub fn local_name(&self) -> &str {
        self.full_path
            .rsplit_once('.')
            .map_or(self.full_path.as_str(), |(_, name)| name)
    }

    /// Number of segments below the root.
    pub fn depth(&self) -> usize {
        self.full_path.matches('.').count()
    }

    /// Check if this is a root path.
    pub fn is_root(&self) -> bool {
        !self.full_path.contains('.')
    }

    /// The full dotted path.
    pub fn full_path(&self) -> &str {
        &self.full_path
    }
}

impl fmt::Display for NavigablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path)
    }
}
