//! Tests for descriptor comparison and the diff engine

use schemadoc_core::{ColumnDescriptor, Table};

use super::comparator::{CompareError, compare_descriptors};
use super::diff::{DiffResult, NewColumn};
use super::engine::DiffEngine;
use crate::{LiveSchema, LiveTable};

fn create_test_column(table: &str, name: &str, db_type: &str, length: i64) -> ColumnDescriptor {
    ColumnDescriptor {
        id: format!("{}_{}_1", table, name),
        name: name.to_string(),
        table_name: table.to_string(),
        db_type: db_type.to_string(),
        length,
        ..Default::default()
    }
}

fn create_enum_column(values: &[&str]) -> ColumnDescriptor {
    ColumnDescriptor {
        has_enum: true,
        enum_name: "counting_option".to_string(),
        enum_values: values.iter().map(|v| v.to_string()).collect(),
        ..create_test_column("product", "counting_option", "COUNTING_OPTION", 0)
    }
}

fn live_schema(tables: Vec<(&str, Vec<ColumnDescriptor>)>) -> LiveSchema {
    LiveSchema {
        tables: tables
            .into_iter()
            .map(|(name, columns)| LiveTable {
                name: name.to_string(),
                columns,
            })
            .collect(),
    }
}

mod descriptor_comparison_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_identical_descriptors_are_equal() {
        let stored = create_test_column("product", "id", "INT4", 0);
        let live = ColumnDescriptor {
            id: String::new(),
            ..stored.clone()
        };

        let comparison = compare_descriptors(&stored, &live).unwrap();
        assert!(comparison.is_equal());
        assert_eq!(comparison.message(), "");
    }

    #[test]
    fn test_varchar_length_change_is_single_line() {
        let stored = create_test_column("product", "name", "VARCHAR", 200);
        let live = create_test_column("product", "name", "VARCHAR", 100);

        let comparison = compare_descriptors(&stored, &live).unwrap();
        assert_eq!(comparison.differences, vec!["length changed from 200 to 100"]);
    }

    #[test]
    fn test_length_ignored_for_non_varchar_types() {
        let stored = create_test_column("product", "code", "BPCHAR", 10);
        let live = create_test_column("product", "code", "BPCHAR", 12);

        assert!(compare_descriptors(&stored, &live).unwrap().is_equal());
    }

    #[test]
    fn test_length_ignored_when_only_one_side_is_varchar() {
        let stored = create_test_column("product", "name", "VARCHAR", 200);
        let live = create_test_column("product", "name", "TEXT", 0);

        let comparison = compare_descriptors(&stored, &live).unwrap();
        assert_eq!(comparison.differences, vec!["type changed from VARCHAR to TEXT"]);
    }

    #[test]
    fn test_flag_wording_is_directional() {
        let plain = create_test_column("product", "name", "VARCHAR", 200);
        let keyed = ColumnDescriptor {
            is_unique: true,
            is_primary_key: true,
            nullable: true,
            ..plain.clone()
        };

        let forward = compare_descriptors(&plain, &keyed).unwrap();
        let backward = compare_descriptors(&keyed, &plain).unwrap();

        assert_eq!(
            forward.differences,
            vec!["became unique", "became primary key", "became nullable"]
        );
        assert_eq!(
            backward.differences,
            vec!["no longer unique", "no longer primary key", "no longer nullable"]
        );
        assert_eq!(forward.is_equal(), backward.is_equal());
    }

    #[test]
    fn test_foreign_key_attributes_compared_independently() {
        let stored = ColumnDescriptor {
            is_foreign_key: true,
            target_table_fk: "order".to_string(),
            delete_rule: "RESTRICT".to_string(),
            update_rule: "NO ACTION".to_string(),
            ..create_test_column("order_line", "order_id", "INT4", 0)
        };
        let live = ColumnDescriptor {
            delete_rule: "CASCADE".to_string(),
            update_rule: "CASCADE".to_string(),
            ..stored.clone()
        };

        let comparison = compare_descriptors(&stored, &live).unwrap();
        assert_eq!(
            comparison.differences,
            vec![
                "foreign key delete rule changed from RESTRICT to CASCADE",
                "foreign key update rule changed from NO ACTION to CASCADE",
            ]
        );
    }

    #[test]
    fn test_foreign_key_target_change() {
        let stored = ColumnDescriptor {
            is_foreign_key: true,
            target_table_fk: "order".to_string(),
            ..create_test_column("order_line", "order_id", "INT4", 0)
        };
        let live = ColumnDescriptor {
            target_table_fk: "invoice".to_string(),
            ..stored.clone()
        };

        let comparison = compare_descriptors(&stored, &live).unwrap();
        assert_eq!(
            comparison.differences,
            vec!["foreign key target table changed from order to invoice"]
        );
    }

    #[test]
    fn test_foreign_key_dropped() {
        let stored = ColumnDescriptor {
            is_foreign_key: true,
            target_table_fk: "order".to_string(),
            ..create_test_column("order_line", "order_id", "INT4", 0)
        };
        let live = create_test_column("order_line", "order_id", "INT4", 0);

        let comparison = compare_descriptors(&stored, &live).unwrap();
        assert_eq!(comparison.differences, vec!["no longer foreign key"]);
    }

    #[test]
    fn test_enum_value_removed() {
        let stored = create_enum_column(&["unit", "decimal"]);
        let live = create_enum_column(&["unit"]);

        let comparison = compare_descriptors(&stored, &live).unwrap();
        assert_eq!(comparison.differences, vec!["enum value decimal removed"]);
    }

    #[test]
    fn test_enum_values_added() {
        let stored = create_enum_column(&["unit", "decimal"]);
        let live = create_enum_column(&["unit", "decimal", "weight"]);

        let comparison = compare_descriptors(&stored, &live).unwrap();
        assert_eq!(comparison.differences, vec!["new enum values"]);
    }

    #[test]
    fn test_enum_value_replaced() {
        let stored = create_enum_column(&["unit", "decimal"]);
        let live = create_enum_column(&["unit", "weight"]);

        let comparison = compare_descriptors(&stored, &live).unwrap();
        assert_eq!(comparison.differences, vec!["enum value decimal removed"]);
    }

    #[test]
    fn test_enum_flag_wording() {
        let plain = create_test_column("product", "counting_option", "COUNTING_OPTION", 0);
        let enumerated = create_enum_column(&["unit", "decimal"]);

        let became = compare_descriptors(&plain, &enumerated).unwrap();
        assert_eq!(became.differences, vec!["became enum"]);

        let dropped = compare_descriptors(&enumerated, &plain).unwrap();
        assert_eq!(dropped.differences, vec!["no longer enum"]);
    }

    #[test]
    fn test_enum_name_change() {
        let stored = create_enum_column(&["unit", "decimal"]);
        let live = ColumnDescriptor {
            enum_name: "unit_kind".to_string(),
            ..stored.clone()
        };

        let comparison = compare_descriptors(&stored, &live).unwrap();
        assert_eq!(
            comparison.differences,
            vec!["enum name changed from counting_option to unit_kind"]
        );
    }

    #[test]
    fn test_type_change() {
        let stored = create_test_column("product", "id", "INT4", 0);
        let live = create_test_column("product", "id", "INT8", 0);

        let comparison = compare_descriptors(&stored, &live).unwrap();
        assert_eq!(comparison.differences, vec!["type changed from INT4 to INT8"]);

        let stored = create_test_column("product", "name", "VARCHAR", 200);
        let live = create_test_column("product", "name", "TEXT", 0);

        let comparison = compare_descriptors(&stored, &live).unwrap();
        assert_eq!(comparison.message(), "type changed from VARCHAR to TEXT");
    }

    #[test]
    fn test_mismatched_identity_is_error() {
        let stored = create_test_column("product", "id", "INT4", 0);
        let live = create_test_column("order", "id", "INT4", 0);

        match compare_descriptors(&stored, &live) {
            Err(CompareError::IdentityMismatch { stored, live }) => {
                assert_eq!(stored, "product.id");
                assert_eq!(live, "order.id");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

mod diff_engine_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stored_tables(names: &[&str]) -> Vec<Table> {
        names.iter().map(|n| Table::new(n)).collect()
    }

    #[test]
    fn test_identical_snapshots_produce_empty_diff() {
        let columns = vec![
            create_test_column("product", "id", "INT4", 0),
            create_test_column("product", "name", "VARCHAR", 200),
        ];
        let live = live_schema(vec![("product", columns.clone())]);

        let diff = DiffEngine::new()
            .compute(&live, &stored_tables(&["product"]), &columns)
            .unwrap();

        assert!(diff.is_empty());
        assert_eq!(diff.summary(), "no changes");
    }

    #[test]
    fn test_new_table_columns_not_reported_as_new_columns() {
        let live = live_schema(vec![
            ("product", vec![create_test_column("product", "id", "INT4", 0)]),
            ("unit", vec![create_test_column("unit", "id", "INT4", 0)]),
        ]);
        let stored = vec![create_test_column("product", "id", "INT4", 0)];

        let diff = DiffEngine::new()
            .compute(&live, &stored_tables(&["product"]), &stored)
            .unwrap();

        assert_eq!(diff.new_tables, vec!["unit"]);
        assert!(diff.new_columns.is_empty());
        assert_eq!(diff.change_count(), 1);
    }

    #[test]
    fn test_deleted_table_columns_not_reported_as_deleted_columns() {
        let live = live_schema(vec![(
            "product",
            vec![create_test_column("product", "id", "INT4", 0)],
        )]);
        let stored = vec![
            create_test_column("product", "id", "INT4", 0),
            create_test_column("order_line", "id", "INT4", 0),
        ];

        let diff = DiffEngine::new()
            .compute(&live, &stored_tables(&["product", "order_line"]), &stored)
            .unwrap();

        assert_eq!(diff.deleted_tables, vec!["order_line"]);
        assert!(diff.deleted_columns.is_empty());
        assert!(diff.column_changes.is_empty());
    }

    #[test]
    fn test_column_level_sets() {
        let live = live_schema(vec![(
            "product",
            vec![
                create_test_column("product", "id", "INT4", 0),
                create_test_column("product", "name", "VARCHAR", 100),
                create_test_column("product", "sku", "VARCHAR", 50),
            ],
        )]);
        let stored = vec![
            create_test_column("product", "id", "INT4", 0),
            create_test_column("product", "name", "VARCHAR", 200),
            create_test_column("product", "legacy_code", "INT4", 0),
        ];

        let diff = DiffEngine::new()
            .compute(&live, &stored_tables(&["product"]), &stored)
            .unwrap();

        assert_eq!(
            diff.new_columns,
            vec![NewColumn {
                table_name: "product".to_string(),
                name: "sku".to_string(),
            }]
        );
        assert_eq!(diff.deleted_columns.len(), 1);
        assert_eq!(diff.deleted_columns[0].id, "product_legacy_code_1");
        assert_eq!(diff.column_changes.len(), 1);
        assert_eq!(diff.column_changes[0].id, "product_name_1");
        assert_eq!(
            diff.column_changes[0].message,
            "length changed from 200 to 100"
        );
        assert!(diff.new_tables.is_empty());
        assert!(diff.deleted_tables.is_empty());
    }

    #[test]
    fn test_summary_lists_every_set() {
        let diff = DiffResult {
            new_tables: vec!["unit".into()],
            deleted_tables: vec!["order_line".into()],
            column_changes: vec![super::super::diff::ColumnChange {
                id: "product_name_2".into(),
                name: "name".into(),
                table_name: "product".into(),
                message: "became unique\nlength changed from 200 to 100".into(),
            }],
            new_columns: vec![NewColumn {
                table_name: "product".into(),
                name: "sku".into(),
            }],
            deleted_columns: vec![],
        };

        assert_eq!(
            diff.summary(),
            "new tables: unit\n\
             deleted tables: order_line\n\
             changed columns:\n  \
             product.name:\n    \
             became unique\n    \
             length changed from 200 to 100\n\
             new columns: product.sku"
        );
    }

    #[test]
    fn test_diff_serializes_with_set_names() {
        let value = serde_json::to_value(DiffResult::new()).unwrap();
        for key in [
            "new_tables",
            "deleted_tables",
            "column_changes",
            "new_columns",
            "deleted_columns",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
    }
}
