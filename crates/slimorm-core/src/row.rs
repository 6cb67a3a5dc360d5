//! Result rows and the forward-only reader over them.

use std::sync::Arc;

use crate::value::Value;

/// A single result row sharing its column list with the rest of the set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<Value>,
}

impl Row {
    pub fn with_columns(columns: Arc<Vec<String>>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, ordinal: usize) -> Option<&Value> {
        self.values.get(ordinal)
    }

    /// Value of the named column, matched case-insensitively.
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|i| self.values.get(i))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Forward-only cursor over query results.
pub trait DataReader {
    fn field_count(&self) -> usize;

    fn column_name(&self, ordinal: usize) -> Option<&str>;

    /// Ordinal of the column named `name`, ignoring case.
    fn ordinal(&self, name: &str) -> Option<usize> {
        (0..self.field_count()).find(|&i| {
            self.column_name(i)
                .is_some_and(|c| c.eq_ignore_ascii_case(name))
        })
    }

    /// Advance to the next row. Returns `false` once exhausted.
    fn read(&mut self) -> bool;

    /// Value at `ordinal` in the current row.
    fn value(&self, ordinal: usize) -> Value;
}

/// A fully buffered result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Arc<Vec<String>>,
    rows: Vec<Row>,
    position: Option<usize>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let columns = Arc::new(columns);
        let rows = rows
            .into_iter()
            .map(|values| Row::with_columns(Arc::clone(&columns), values))
            .collect();
        Self {
            columns,
            rows,
            position: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rewind the cursor to before the first row.
    pub fn reset(&mut self) {
        self.position = None;
    }
}

impl DataReader for ResultSet {
    fn field_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, ordinal: usize) -> Option<&str> {
        self.columns.get(ordinal).map(String::as_str)
    }

    fn read(&mut self) -> bool {
        let next = self.position.map_or(0, |p| p + 1);
        if next < self.rows.len() {
            self.position = Some(next);
            true
        } else {
            self.position = Some(self.rows.len());
            false
        }
    }

    fn value(&self, ordinal: usize) -> Value {
        self.position
            .and_then(|p| self.rows.get(p))
            .and_then(|row| row.get(ordinal))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultSet {
        ResultSet::new(
            vec!["Id".into(), "Title".into()],
            vec![
                vec![Value::BigInt(1), Value::Text("a".into())],
                vec![Value::BigInt(2), Value::Null],
            ],
        )
    }

    #[test]
    fn test_reader_walks_rows() {
        let mut rs = sample();
        assert_eq!(rs.field_count(), 2);
        assert_eq!(rs.value(0), Value::Null, "no current row before read");
        assert!(rs.read());
        assert_eq!(rs.value(0), Value::BigInt(1));
        assert!(rs.read());
        assert_eq!(rs.value(1), Value::Null);
        assert!(!rs.read());
        assert!(!rs.read());
        rs.reset();
        assert!(rs.read());
        assert_eq!(rs.value(1), Value::Text("a".into()));
    }

    #[test]
    fn test_ordinal_is_case_insensitive() {
        let rs = sample();
        assert_eq!(rs.ordinal("title"), Some(1));
        assert_eq!(rs.ordinal("missing"), None);
    }

    #[test]
    fn test_row_access() {
        let rs = sample();
        let row = &rs.rows()[0];
        assert_eq!(row.get_named("TITLE"), Some(&Value::Text("a".into())));
        assert_eq!(row.columns(), &["Id".to_string(), "Title".to_string()]);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_empty_result_set() {
        let mut rs = ResultSet::empty();
        assert!(rs.is_empty());
        assert!(!rs.read());
    }
}
