use crate::error::SQLError;

/// A dynamically-typed SQL parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// `Text` for `Some`, `Null` for `None`.
    pub fn opt_text(s: Option<&str>) -> Self {
        match s {
            Some(s) => Value::Text(s.to_string()),
            None => Value::Null,
        }
    }

    pub fn bool(b: bool) -> Self {
        Value::Integer(b as i64)
    }
}

/// A row returned from a SQL query: column name to value.
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

    /// Get a text column as an owned string; NULL and missing become `None`.
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get_str(name).map(str::to_string)
    }

    /// Get an integer column value by name.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// Integer column read as a boolean (non-zero is true).
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get_i64(name).map(|i| i != 0)
    }
}

/// SQLStore provides a SQL execution interface backed by an embedded database.
pub trait SQLStore: Send + Sync {
    /// Execute a query and return rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError>;

    /// Execute a statement (INSERT/UPDATE/DELETE) and return affected row count.
    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError>;

    /// Execute several `;`-separated statements without parameters (schema setup).
    fn exec_batch(&self, sql: &str) -> Result<(), SQLError>;
}
