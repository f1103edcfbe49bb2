use serde_json::{Map, Value};

/// One row keyed by column name.
pub type Record = Map<String, Value>;

/// Tabular query output: column names plus positional row tuples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Value>>,
}

/// Empty when the query matched nothing.
pub type ResultSet = Vec<Table>;

fn zip_row(columns: &[String], row: &[Value]) -> Record {
    columns
        .iter()
        .cloned()
        .zip(row.iter().cloned())
        .collect()
}

/// First row of the first table, or `None` when there is nothing to map.
pub fn to_object(rows: &[Table]) -> Option<Record> {
    let table = rows.first()?;
    let first = table.values.first()?;
    Some(zip_row(&table.columns, first))
}

/// Every row of the first table.
pub fn to_array(rows: &[Table]) -> Vec<Record> {
    match rows.first() {
        Some(table) => table
            .values
            .iter()
            .map(|row| zip_row(&table.columns, row))
            .collect(),
        None => Vec::new(),
    }
}
