pub fn render_schema(vector_dim: u32) -> String {
	include_str!("../../../sql/init.sql").replace("<VECTOR_DIM>", &vector_dim.to_string())
}

/// Splits rendered schema SQL into individual statements.
pub fn statements(sql: &str) -> impl Iterator<Item = &str> {
	sql.split(';').map(str::trim).filter(|statement| !statement.is_empty())
}
