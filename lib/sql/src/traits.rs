use crate::error::SQLError;

/// A dynamically-typed SQL parameter value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// A row returned from a SQL query — column name to value.
#[derive(Debug, Clone)]
pub struct Row {
    pub columns: Vec<(String, Value)>,
}

impl Row {
    /// Get a column value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Get a text column value by name.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get an integer column value by name.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// Get a real column value by name.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(Value::Real(f)) => Some(*f),
            _ => None,
        }
    }

    /// Get a numeric column as f64, accepting either affinity.
    ///
    /// SQLite's `SUM()` yields INTEGER or REAL depending on the summed
    /// values; report queries read aggregates through this accessor.
    pub fn get_num(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(Value::Integer(i)) => Some(*i as f64),
            Some(Value::Real(f)) => Some(*f),
            _ => None,
        }
    }
}

/// SQLStore provides a SQL execution interface backed by an embedded
/// database. Records are stored as JSON documents in a `data` column with
/// indexed columns alongside for filtering and aggregation.
pub trait SQLStore: Send + Sync {
    /// Execute a query and return rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError>;

    /// Execute a statement (INSERT/UPDATE/DELETE) and return affected row count.
    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_accessors() {
        let row = Row {
            columns: vec![
                ("name".into(), Value::Text("acpn".into())),
                ("count".into(), Value::Integer(3)),
                ("amount".into(), Value::Real(1200.5)),
            ],
        };
        assert_eq!(row.get_str("name"), Some("acpn"));
        assert_eq!(row.get_i64("count"), Some(3));
        assert_eq!(row.get_f64("amount"), Some(1200.5));
        assert_eq!(row.get_num("count"), Some(3.0));
        assert_eq!(row.get_num("amount"), Some(1200.5));
        assert_eq!(row.get_num("missing"), None);
    }
}
