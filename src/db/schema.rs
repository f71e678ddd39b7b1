//! SQL DDL for the `users` and `students` tables.
//!
//! One statement set per backend. The SQLite set is what the dialect rewrite
//! produces from the PostgreSQL set; a test keeps the two in lockstep.
//! camelCase student columns are quoted so PostgreSQL keeps their case.

pub const POSTGRES_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id SERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    password TEXT NOT NULL,
    role TEXT DEFAULT 'admin',
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS students (
    id SERIAL PRIMARY KEY,
    "firstName" TEXT NOT NULL,
    "lastName" TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    phone TEXT,
    "dateOfBirth" TEXT,
    address TEXT,
    city TEXT,
    "postalCode" TEXT,
    country TEXT,
    "enrollmentDate" TEXT NOT NULL,
    status TEXT DEFAULT 'active',
    "createdAt" TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    "updatedAt" TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);
"#;

pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    password TEXT NOT NULL,
    role TEXT DEFAULT 'admin',
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS students (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    "firstName" TEXT NOT NULL,
    "lastName" TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    phone TEXT,
    "dateOfBirth" TEXT,
    address TEXT,
    city TEXT,
    "postalCode" TEXT,
    country TEXT,
    "enrollmentDate" TEXT NOT NULL,
    status TEXT DEFAULT 'active',
    "createdAt" DATETIME DEFAULT CURRENT_TIMESTAMP,
    "updatedAt" DATETIME DEFAULT CURRENT_TIMESTAMP
);
"#;

pub const TABLES: [&str; 2] = ["users", "students"];

/// Split a DDL script into single statements; sqlx prepares one at a time.
pub fn statements(script: &str) -> impl Iterator<Item = &str> {
    script.split(';').map(str::trim).filter(|s| !s.is_empty())
}
