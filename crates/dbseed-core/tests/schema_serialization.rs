use dbseed_core::{ColumnSchema, LengthLimit, SafeType, TableSchema};

#[test]
fn table_schema_serializes_with_snake_case_types() {
    let table = TableSchema::new(
        "customer",
        vec![
            ColumnSchema::new("id", SafeType::Uuid).not_null(),
            ColumnSchema::new("email", SafeType::VarChar).with_max_length(120),
            ColumnSchema::new("notes", SafeType::Text),
        ],
    );

    let json = serde_json::to_value(&table).expect("serialize table");
    let columns = json
        .get("columns")
        .and_then(|value| value.as_array())
        .expect("columns array");

    assert_eq!(columns[0]["data_type"], "uuid");
    assert_eq!(columns[1]["data_type"], "var_char");
    assert_eq!(columns[1]["max_length"]["bounded"], 120);
    assert_eq!(columns[2]["max_length"], "unbounded");
    assert_eq!(json["primary_key"], "id");

    let decoded: TableSchema = serde_json::from_value(json).expect("deserialize table");
    assert_eq!(decoded.column("notes").and_then(|c| c.max_length), Some(LengthLimit::Unbounded));
}
