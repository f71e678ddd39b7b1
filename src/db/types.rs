use serde::Serialize;
use serde_json::{Map, Value};

/// Text form of timestamps, matching SQLite's `CURRENT_TIMESTAMP`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One result row keyed by column name.
pub type Row = Map<String, Value>;

/// A positional query parameter, bound in order to `$1, $2, ...`.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl From<&String> for SqlParam {
    fn from(v: &String) -> Self {
        SqlParam::Text(v.clone())
    }
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<i32> for SqlParam {
    fn from(v: i32) -> Self {
        SqlParam::Int(v.into())
    }
}

impl From<f64> for SqlParam {
    fn from(v: f64) -> Self {
        SqlParam::Float(v)
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        SqlParam::Bool(v)
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(v: Option<T>) -> Self {
        v.map_or(SqlParam::Null, Into::into)
    }
}

/// Statement kind, derived from the leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandTag {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

impl CommandTag {
    pub fn classify(sql: &str) -> Self {
        let keyword = sql
            .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
            .split(|c: char| !c.is_ascii_alphabetic())
            .next()
            .unwrap_or_default();

        if keyword.eq_ignore_ascii_case("select") {
            CommandTag::Select
        } else if keyword.eq_ignore_ascii_case("insert") {
            CommandTag::Insert
        } else if keyword.eq_ignore_ascii_case("update") {
            CommandTag::Update
        } else if keyword.eq_ignore_ascii_case("delete") {
            CommandTag::Delete
        } else {
            CommandTag::Other
        }
    }

    pub fn is_dml(self) -> bool {
        matches!(
            self,
            CommandTag::Insert | CommandTag::Update | CommandTag::Delete
        )
    }
}

/// Backend-independent query result.
///
/// Both executors return this shape: `rows` for SELECT-like statements,
/// `row_count` as the number of rows returned or affected, and `fields`
/// listing the column names of the returned rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub row_count: u64,
    pub command: CommandTag,
    pub fields: Vec<String>,
}

impl QueryResult {
    pub fn from_rows(command: CommandTag, fields: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            row_count: rows.len() as u64,
            rows,
            command,
            fields,
        }
    }

    pub fn affected(command: CommandTag, row_count: u64) -> Self {
        Self {
            rows: Vec::new(),
            row_count,
            command,
            fields: Vec::new(),
        }
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn into_first(self) -> Option<Row> {
        self.rows.into_iter().next()
    }
}
