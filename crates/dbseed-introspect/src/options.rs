/// Options that control how the catalog reads metadata.
#[derive(Debug, Clone)]
pub struct CatalogOptions {
    /// Namespace whose tables are populated.
    pub schema: String,
    /// Read column comments as human-readable descriptions.
    pub include_comments: bool,
    /// Treat `nextval(...)` defaults (serial columns) as identity columns.
    pub serial_as_identity: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            include_comments: true,
            serial_as_identity: true,
        }
    }
}

impl CatalogOptions {
    pub fn for_schema(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            ..Self::default()
        }
    }
}
