//! Output formatters for resolved mappings.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use rowmap_core::jdbc::ResultSetMetadata;
use rowmap_core::{DomainResult, JdbcValuesMapping};

/// Output format for resolved mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII tables
    Table,
    /// JSON document
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format a resolved mapping; `metadata` names the selected columns.
    fn format_mapping(&self, mapping: &JdbcValuesMapping, metadata: &ResultSetMetadata) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_mapping(&self, mapping: &JdbcValuesMapping, metadata: &ResultSetMetadata) -> String {
        let mut selections = Table::new();
        selections.set_header(vec!["Index", "Column", "Type", "Nested"]);
        for selection in mapping.selections() {
            let column = if selection.is_nested() {
                String::new()
            } else {
                metadata
                    .columns()
                    .get(selection.values_array_position())
                    .map(|column| column.name.clone())
                    .unwrap_or_default()
            };
            selections.add_row(vec![
                Cell::new(selection.jdbc_result_set_index()),
                Cell::new(column),
                Cell::new(selection.jdbc_type().name()),
                Cell::new(selection.is_nested()),
            ]);
        }

        let mut results = Table::new();
        results.set_header(vec!["#", "Kind", "Result", "Positions"]);
        for (index, result) in mapping.domain_results().iter().enumerate() {
            let (kind, label) = describe(result);
            let positions = result
                .positions()
                .iter()
                .map(|position| (position + 1).to_string())
                .collect::<Vec<_>>()
                .join(", ");
            results.add_row(vec![
                Cell::new(index + 1),
                Cell::new(kind),
                Cell::new(label),
                Cell::new(positions),
            ]);
        }

        let mut output = format!(
            "{selections}\n\n{results}\n\nrow size: {}",
            mapping.row_size()
        );

        if !mapping.lock_modes().is_empty() {
            let mut locks = Table::new();
            locks.set_header(vec!["Alias", "Lock mode"]);
            for (alias, lock_mode) in mapping.lock_modes() {
                locks.add_row(vec![alias.clone(), lock_mode.to_string()]);
            }
            output.push_str(&format!("\n\n{locks}"));
        }

        output
    }
}

fn describe(result: &DomainResult) -> (&'static str, String) {
    match result {
        DomainResult::Basic(basic) => (
            "scalar",
            basic
                .result_variable
                .clone()
                .unwrap_or_else(|| basic.jdbc_type.name()),
        ),
        DomainResult::Entity(entity) => ("entity", entity.path.to_string()),
        DomainResult::Instantiation(instantiation) => {
            ("instantiation", instantiation.target.clone())
        }
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_mapping(&self, mapping: &JdbcValuesMapping, _metadata: &ResultSetMetadata) -> String {
        serde_json::to_string_pretty(mapping).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}
