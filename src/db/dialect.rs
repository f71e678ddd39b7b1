//! Textual translation from PostgreSQL-flavoured SQL to SQLite.
//!
//! The rewrite is substring-based: any occurrence of the patterns below is
//! replaced wherever it appears in the statement, including inside string
//! literals. Parameter values travel separately, so only statement text is
//! affected.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+)").expect("placeholder pattern"));

static SERIAL_PK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bSERIAL\s+PRIMARY\s+KEY\b").expect("serial pattern"));

static TIMESTAMP_DEFAULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bTIMESTAMP\s+DEFAULT\s+CURRENT_TIMESTAMP\b").expect("timestamp pattern")
});

pub const SQLITE_AUTOINCREMENT_PK: &str = "INTEGER PRIMARY KEY AUTOINCREMENT";
pub const SQLITE_TIMESTAMP_DEFAULT: &str = "DATETIME DEFAULT CURRENT_TIMESTAMP";

/// `$N` -> `?N`. SQLite's numbered markers keep the positional binding, so a
/// reused `$1` still binds the first parameter.
pub fn rewrite_placeholders(sql: &str) -> Cow<'_, str> {
    PLACEHOLDER.replace_all(sql, "?$1")
}

/// Swap the DDL spellings SQLite does not share with PostgreSQL.
pub fn rewrite_ddl(sql: &str) -> Cow<'_, str> {
    match SERIAL_PK.replace_all(sql, SQLITE_AUTOINCREMENT_PK) {
        Cow::Borrowed(s) => TIMESTAMP_DEFAULT.replace_all(s, SQLITE_TIMESTAMP_DEFAULT),
        Cow::Owned(s) => Cow::Owned(
            TIMESTAMP_DEFAULT
                .replace_all(&s, SQLITE_TIMESTAMP_DEFAULT)
                .into_owned(),
        ),
    }
}

/// Full PostgreSQL -> SQLite translation applied before every SQLite query.
pub fn to_sqlite(sql: &str) -> String {
    let sql = rewrite_placeholders(sql);
    rewrite_ddl(&sql).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_keep_order_and_reuse() {
        assert_eq!(
            rewrite_placeholders("SELECT * FROM t WHERE a = $1 AND b = $2 OR c = $1"),
            "SELECT * FROM t WHERE a = ?1 AND b = ?2 OR c = ?1"
        );
        assert_eq!(rewrite_placeholders("VALUES ($10, $11)"), "VALUES (?10, ?11)");
    }

    #[test]
    fn text_without_placeholders_is_borrowed() {
        let sql = "SELECT 1";
        assert!(matches!(rewrite_placeholders(sql), Cow::Borrowed(_)));
        assert!(matches!(rewrite_ddl(sql), Cow::Borrowed(_)));
    }

    #[test]
    fn ddl_rewrite_touches_only_known_patterns() {
        let pg = "CREATE TABLE IF NOT EXISTS users (\n  id SERIAL PRIMARY KEY,\n  name TEXT NOT NULL,\n  created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n)";
        let expected = "CREATE TABLE IF NOT EXISTS users (\n  id INTEGER PRIMARY KEY AUTOINCREMENT,\n  name TEXT NOT NULL,\n  created_at DATETIME DEFAULT CURRENT_TIMESTAMP\n)";
        assert_eq!(rewrite_ddl(pg), expected);
    }

    #[test]
    fn ddl_rewrite_is_case_insensitive() {
        assert_eq!(
            rewrite_ddl("id serial primary key"),
            "id INTEGER PRIMARY KEY AUTOINCREMENT"
        );
    }

    #[test]
    fn rewrite_applies_outside_ddl_position() {
        assert_eq!(
            to_sqlite("SELECT 'SERIAL PRIMARY KEY' WHERE x = $1"),
            "SELECT 'INTEGER PRIMARY KEY AUTOINCREMENT' WHERE x = ?1"
        );
    }

    #[test]
    fn bare_timestamp_type_is_left_alone() {
        let sql = "SELECT CURRENT_TIMESTAMP";
        assert_eq!(to_sqlite(sql), sql);
    }
}
