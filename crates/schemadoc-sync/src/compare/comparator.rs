//! Column descriptor comparison

use std::collections::HashSet;

use schemadoc_core::ColumnDescriptor;
use thiserror::Error;

/// Errors that can occur during comparison
#[derive(Debug, Error)]
pub enum CompareError {
    /// Descriptors of two different columns were handed to the comparator
    #[error("cannot compare column {stored} with column {live}")]
    IdentityMismatch { stored: String, live: String },
}

/// Result type for comparison operations
pub type CompareResult<T> = Result<T, CompareError>;

/// Outcome of comparing a stored descriptor with its live counterpart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnComparison {
    /// One line per differing attribute, worded from stored to live
    pub differences: Vec<String>,
}

impl ColumnComparison {
    pub fn is_equal(&self) -> bool {
        self.differences.is_empty()
    }

    /// Newline-joined difference lines
    pub fn message(&self) -> String {
        self.differences.join("\n")
    }
}

fn flag_change(differences: &mut Vec<String>, stored: bool, live: bool, what: &str) {
    match (stored, live) {
        (false, true) => differences.push(format!("became {}", what)),
        (true, false) => differences.push(format!("no longer {}", what)),
        _ => {}
    }
}

fn value_change(differences: &mut Vec<String>, what: &str, stored: &str, live: &str) {
    if stored != live {
        differences.push(format!("{} changed from {} to {}", what, stored, live));
    }
}

fn is_varchar(native_type: &str) -> bool {
    native_type.to_ascii_lowercase().contains("varchar")
}

/// Compare a stored descriptor with the live descriptor of the same column.
///
/// The declared length only counts for varchar-like types on both sides.
/// For enums, stored values missing from the live set are reported one by
/// one; growth of the set is reported as a single "new enum values" line.
pub fn compare_descriptors(
    stored: &ColumnDescriptor,
    live: &ColumnDescriptor,
) -> CompareResult<ColumnComparison> {
    if !stored.same_column(live) {
        return Err(CompareError::IdentityMismatch {
            stored: format!("{}.{}", stored.table_name, stored.name),
            live: format!("{}.{}", live.table_name, live.name),
        });
    }

    let mut differences = Vec::new();

    flag_change(&mut differences, stored.is_unique, live.is_unique, "unique");
    flag_change(
        &mut differences,
        stored.is_primary_key,
        live.is_primary_key,
        "primary key",
    );

    flag_change(
        &mut differences,
        stored.is_foreign_key,
        live.is_foreign_key,
        "foreign key",
    );
    if stored.is_foreign_key && live.is_foreign_key {
        value_change(
            &mut differences,
            "foreign key target table",
            &stored.target_table_fk,
            &live.target_table_fk,
        );
        value_change(
            &mut differences,
            "foreign key delete rule",
            &stored.delete_rule,
            &live.delete_rule,
        );
        value_change(
            &mut differences,
            "foreign key update rule",
            &stored.update_rule,
            &live.update_rule,
        );
    }

    flag_change(&mut differences, stored.has_enum, live.has_enum, "enum");
    if stored.has_enum && live.has_enum {
        value_change(&mut differences, "enum name", &stored.enum_name, &live.enum_name);

        let live_values: HashSet<&str> = live.enum_values.iter().map(String::as_str).collect();
        for value in &stored.enum_values {
            if !live_values.contains(value.as_str()) {
                differences.push(format!("enum value {} removed", value));
            }
        }
        if live.enum_values.len() > stored.enum_values.len() {
            differences.push("new enum values".to_string());
        }
    }

    flag_change(&mut differences, stored.nullable, live.nullable, "nullable");

    value_change(&mut differences, "type", &stored.db_type, &live.db_type);

    if is_varchar(&stored.db_type) && is_varchar(&live.db_type) && stored.length != live.length {
        differences.push(format!(
            "length changed from {} to {}",
            stored.length, live.length
        ));
    }

    Ok(ColumnComparison { differences })
}
