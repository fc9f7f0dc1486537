//! Read-only inspection of the extracted collection database.
//!
//! Targeted mode sweeps schema triggers for destructive SQL and runs the
//! pattern scanner over the notes table. Exhaustive mode feeds every
//! TEXT column of every table through the scanner instead.

use colored::Colorize;
use regex::{Regex, RegexBuilder};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::debug;

use crate::error::ScanError;
use crate::scanner::PatternScanner;

/// Rows fetched per table. Bounds scan time and output volume on very
/// large decks; rows beyond the cap are accepted false negatives.
const ROW_LIMIT: usize = 50;

/// Destructive/administrative keywords flagged in trigger bodies.
const TRIGGER_KEYWORDS: &str = r"delete|drop|alter|attach|pragma";

pub struct Inspector {
    conn: Connection,
}

impl Inspector {
    /// Open the collection database read-only. The store is never mutated.
    pub fn open(path: &Path) -> Result<Self, ScanError> {
        debug!(path = %path.display(), "Opening collection database");
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self { conn })
    }

    /// Targeted scan: trigger definitions, then the notes table.
    pub fn scan_targeted(&self, scanner: &PatternScanner) -> Result<usize, ScanError> {
        let mut findings = self.scan_triggers()?;
        findings += self.scan_notes(scanner)?;
        Ok(findings)
    }

    /// Exhaustive scan: every table in the schema, row-capped.
    pub fn scan_all_tables(&self, scanner: &PatternScanner) -> Result<usize, ScanError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut findings = 0;
        for table in tables {
            findings += self.scan_table(&table, scanner)?;
        }
        Ok(findings)
    }

    /// Flag triggers whose SQL body contains a destructive keyword.
    fn scan_triggers(&self) -> Result<usize, ScanError> {
        let keywords = trigger_keywords();

        let mut stmt = self
            .conn
            .prepare("SELECT name, sql FROM sqlite_master WHERE type = 'trigger'")?;
        let triggers = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut findings = 0;
        for (name, sql) in triggers {
            if keywords.is_match(&sql) {
                findings += 1;
                println!(
                    "{} Suspicious trigger detected: {}\n{}\n",
                    "[!]".red().bold(),
                    name,
                    sql
                );
            }
        }
        Ok(findings)
    }

    /// Run the scanner over the primary text field of the notes table.
    fn scan_notes(&self, scanner: &PatternScanner) -> Result<usize, ScanError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT flds FROM notes LIMIT {}", ROW_LIMIT))?;
        let fields = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut findings = 0;
        for text in fields {
            findings += scanner.scan_value(&text);
        }
        Ok(findings)
    }

    /// Run the scanner over every TEXT column value of one table.
    fn scan_table(&self, table: &str, scanner: &PatternScanner) -> Result<usize, ScanError> {
        println!("Scanning table: {}", table);

        // Table names come from sqlite_master and cannot be bound as
        // parameters; identifier-quote them instead.
        let sql = format!(
            "SELECT * FROM \"{}\" LIMIT {}",
            table.replace('"', "\"\""),
            ROW_LIMIT
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let column_count = stmt.column_count();

        let mut findings = 0;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for index in 0..column_count {
                if let ValueRef::Text(bytes) = row.get_ref(index)? {
                    findings += scanner.scan_value(&String::from_utf8_lossy(bytes));
                }
            }
        }
        Ok(findings)
    }
}

fn trigger_keywords() -> Regex {
    RegexBuilder::new(TRIGGER_KEYWORDS)
        .case_insensitive(true)
        .build()
        .expect("trigger keyword pattern")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::FixedConfirm;
    use crate::signatures::SignatureSet;
    use std::fs;
    use tempfile::TempDir;

    fn scanner() -> PatternScanner {
        PatternScanner::new(SignatureSet::builtin(), 300, Box::new(FixedConfirm(false)))
    }

    fn create_collection(path: &Path) -> Connection {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE notes (id INTEGER PRIMARY KEY, flds TEXT NOT NULL);
             CREATE TABLE media_map (id INTEGER PRIMARY KEY, filename TEXT);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_targeted_scan_flags_note_field() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("collection.anki2");
        let conn = create_collection(&db_path);
        conn.execute(
            "INSERT INTO notes (flds) VALUES (?1)",
            ["<script>alert(1)</script>"],
        )
        .unwrap();
        drop(conn);

        let inspector = Inspector::open(&db_path).unwrap();
        assert_eq!(inspector.scan_targeted(&scanner()).unwrap(), 1);
    }

    #[test]
    fn test_targeted_scan_clean_deck() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("collection.anki2");
        let conn = create_collection(&db_path);
        conn.execute(
            "INSERT INTO notes (flds) VALUES (?1)",
            ["What is the capital of France?\x1fParis"],
        )
        .unwrap();
        drop(conn);

        let inspector = Inspector::open(&db_path).unwrap();
        assert_eq!(inspector.scan_targeted(&scanner()).unwrap(), 0);
    }

    #[test]
    fn test_suspicious_trigger_is_flagged() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("collection.anki2");
        let conn = create_collection(&db_path);
        conn.execute_batch(
            "CREATE TRIGGER trg_wipe AFTER INSERT ON notes
             BEGIN DELETE FROM notes; END;",
        )
        .unwrap();
        drop(conn);

        let inspector = Inspector::open(&db_path).unwrap();
        assert_eq!(inspector.scan_targeted(&scanner()).unwrap(), 1);
    }

    #[test]
    fn test_benign_trigger_is_not_flagged() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("collection.anki2");
        let conn = create_collection(&db_path);
        conn.execute_batch(
            "CREATE TRIGGER trg_touch AFTER INSERT ON notes
             BEGIN SELECT 1; END;",
        )
        .unwrap();
        drop(conn);

        let inspector = Inspector::open(&db_path).unwrap();
        assert_eq!(inspector.scan_targeted(&scanner()).unwrap(), 0);
    }

    #[test]
    fn test_row_cap_limits_findings() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("collection.anki2");
        let conn = create_collection(&db_path);
        for _ in 0..60 {
            conn.execute(
                "INSERT INTO notes (flds) VALUES (?1)",
                ["<script>alert(1)</script>"],
            )
            .unwrap();
        }
        drop(conn);

        let inspector = Inspector::open(&db_path).unwrap();
        assert_eq!(inspector.scan_targeted(&scanner()).unwrap(), ROW_LIMIT);
    }

    #[test]
    fn test_exhaustive_scan_covers_other_tables() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("collection.anki2");
        let conn = create_collection(&db_path);
        conn.execute(
            "INSERT INTO media_map (filename) VALUES (?1)",
            ["`rm -rf /`"],
        )
        .unwrap();
        drop(conn);

        let inspector = Inspector::open(&db_path).unwrap();
        // Targeted mode never looks at media_map.
        assert_eq!(inspector.scan_targeted(&scanner()).unwrap(), 0);
        assert_eq!(inspector.scan_all_tables(&scanner()).unwrap(), 1);
    }

    #[test]
    fn test_exhaustive_scan_skips_non_text_columns() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("collection.anki2");
        let conn = create_collection(&db_path);
        conn.execute("INSERT INTO notes (flds) VALUES (?1)", ["plain text"])
            .unwrap();
        conn.execute("INSERT INTO media_map (filename) VALUES (NULL)", [])
            .unwrap();
        drop(conn);

        let inspector = Inspector::open(&db_path).unwrap();
        assert_eq!(inspector.scan_all_tables(&scanner()).unwrap(), 0);
    }

    #[test]
    fn test_missing_notes_table_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("collection.anki2");
        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch("CREATE TABLE cards (id INTEGER PRIMARY KEY);")
            .unwrap();
        drop(conn);

        let inspector = Inspector::open(&db_path).unwrap();
        assert!(inspector.scan_targeted(&scanner()).is_err());
    }

    #[test]
    fn test_corrupt_store_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("collection.anki2");
        fs::write(&db_path, b"definitely not a sqlite file").unwrap();

        // The header may be rejected at open or at first query; either way
        // the failure surfaces as a database error, not a panic.
        match Inspector::open(&db_path) {
            Ok(inspector) => assert!(inspector.scan_targeted(&scanner()).is_err()),
            Err(ScanError::Database(_)) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_trigger_keywords_are_case_insensitive() {
        let keywords = trigger_keywords();
        assert!(keywords.is_match("BEGIN DROP TABLE notes; END"));
        assert!(keywords.is_match("begin delete from notes; end"));
        assert!(keywords.is_match("PRAGMA writable_schema = ON"));
        assert!(!keywords.is_match("BEGIN SELECT 1; END"));
    }
}
