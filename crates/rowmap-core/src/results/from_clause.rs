//! Table groups registered while resolving a mapping.

use super::path::NavigablePath;
use std::collections::HashMap;

/// A table (or joined table set) contributing columns to the result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableGroup {
    /// Path of the result node the group backs.
    pub path: NavigablePath,
    /// SQL alias of the group.
    pub alias: String,
    /// Entity whose columns the group exposes.
    pub entity: String,
}

impl TableGroup {
    /// Create a table group.
    pub fn new(path: NavigablePath, alias: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            path,
            alias: alias.into(),
            entity: entity.into(),
        }
    }
}

/// Two-index alias table: by navigable path and by SQL alias.
///
/// Registering a group under an alias that is already known replaces the
/// alias entry; joined-inheritance groups rely on this.
#[derive(Debug, Default)]
pub struct FromClauseAccess {
    by_path: HashMap<NavigablePath, TableGroup>,
    by_alias: HashMap<String, TableGroup>,
}

impl FromClauseAccess {
    /// Create an empty alias table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the group registered for a path.
    pub fn find_table_group(&self, path: &NavigablePath) -> Option<&TableGroup> {
        self.by_path.get(path)
    }

    /// Find the group last registered under an alias.
    pub fn find_by_alias(&self, alias: &str) -> Option<&TableGroup> {
        self.by_alias.get(alias)
    }

    /// Register a group under its path and alias.
    pub fn register_table_group(&mut self, group: TableGroup) {
        self.by_alias.insert(group.alias.clone(), group.clone());
        self.by_path.insert(group.path.clone(), group);
    }

    /// Number of registered paths.
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_find() {
        let mut access = FromClauseAccess::new();
        let path = NavigablePath::root("Person", Some("p"));
        access.register_table_group(TableGroup::new(path.clone(), "p", "Person"));

        assert_eq!(access.find_table_group(&path).map(|g| g.alias.as_str()), Some("p"));
        assert_eq!(access.find_by_alias("p").map(|g| g.entity.as_str()), Some("Person"));
        assert!(access.find_by_alias("q").is_none());
    }

    #[test]
    fn test_alias_collision_last_write_wins() {
        let mut access = FromClauseAccess::new();
        let person = NavigablePath::root("Person", Some("p"));
        let employee = person.append("employee");
        access.register_table_group(TableGroup::new(person.clone(), "p", "Person"));
        access.register_table_group(TableGroup::new(employee.clone(), "p", "Employee"));

        assert_eq!(access.find_by_alias("p").map(|g| g.entity.as_str()), Some("Employee"));
        assert_eq!(access.find_table_group(&person).map(|g| g.entity.as_str()), Some("Person"));
        assert_eq!(access.len(), 2);
    }
}
