//! SQLite storage for the loaded call graph.
//!
//! Handles schema creation, per-run truncation, and batched parameterized
//! inserts for every table the loader owns. The connection is shared
//! behind a mutex so batch-writer threads can insert concurrently with a
//! single database file; each batch runs inside its own transaction, so a
//! batch either all succeeds or is reported failed.

mod schema;

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection};

use crate::error::{LoadError, Result};
use crate::types::{
    ClassNameRecord, ExtensionDataRecord, JarInfoRecord, LambdaMethodInfoRecord,
    MethodAnnotationRecord, MethodCallRecord,
};

const SQL_KEY_CLASS_NAME: &str = "insert_class_name";
const SQL_KEY_JAR_INFO: &str = "insert_jar_info";
const SQL_KEY_METHOD_ANNOTATION: &str = "insert_method_annotation";
const SQL_KEY_LAMBDA_METHOD_INFO: &str = "insert_lambda_method_info";
const SQL_KEY_METHOD_CALL: &str = "insert_method_call";
const SQL_KEY_EXTENSION_DATA: &str = "insert_extension_data";

const COLUMNS_CLASS_NAME: &[&str] = &["full_class_name", "simple_class_name"];
const COLUMNS_JAR_INFO: &[&str] = &[
    "jar_num",
    "path_hash",
    "jar_path",
    "last_modified",
    "jar_hash",
];
const COLUMNS_METHOD_ANNOTATION: &[&str] = &["method_hash", "annotation", "full_method"];
const COLUMNS_LAMBDA_METHOD_INFO: &[&str] = &[
    "call_id",
    "callee_class_name",
    "callee_method_name",
    "callee_full_method",
    "next_class_name",
    "next_method_name",
    "next_full_method",
    "next_is_stream",
    "next_is_intermediate",
    "next_is_terminal",
];
const COLUMNS_METHOD_CALL: &[&str] = &[
    "call_id",
    "call_type",
    "enabled",
    "caller_jar_num",
    "caller_method_hash",
    "caller_full_method",
    "caller_method_name",
    "caller_full_class_name",
    "caller_class_name",
    "caller_line_num",
    "callee_method_hash",
    "callee_full_method",
    "callee_method_name",
    "callee_full_class_name",
    "callee_class_name",
];
const COLUMNS_EXTENSION_DATA: &[&str] = &["call_id", "data_type", "data_value"];

/// Database handle for the loaded call graph.
///
/// Cheap to clone; clones share the underlying connection and the
/// memoized insert-statement cache.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    app: String,
    sql_cache: Arc<Mutex<HashMap<&'static str, String>>>,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P, app_name: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, app_name)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory(app_name: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, app_name)
    }

    fn with_connection(conn: Connection, app_name: &str) -> Result<Self> {
        validate_app_name(app_name)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            app: app_name.to_string(),
            sql_cache: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Application identifier suffixed onto every table name.
    pub fn app_name(&self) -> &str {
        &self.app
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A poisoned mutex means a writer thread panicked mid-insert; the
        // connection itself is still usable for the failure report.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn table(&self, base: &str) -> String {
        format!("{}_{}", base, self.app)
    }

    // =========================================================================
    // Schema lifecycle
    // =========================================================================

    /// Create all tables and indexes if they do not exist.
    pub fn create_tables(&self) -> Result<()> {
        let ddl = schema::SCHEMA.replace("{APP}", &self.app);
        self.lock().execute_batch(&ddl)?;
        Ok(())
    }

    /// Delete all rows from every owned table. SQLite has no TRUNCATE.
    pub fn truncate_tables(&self) -> Result<()> {
        let conn = self.lock();
        for base in schema::TABLES {
            conn.execute(&format!("DELETE FROM {}", self.table(base)), [])?;
        }
        Ok(())
    }

    // =========================================================================
    // Batched inserts
    // =========================================================================

    /// Memoized parameterized insert statement, built once per run per
    /// logical operation.
    fn insert_sql(&self, key: &'static str, base_table: &str, columns: &[&str]) -> String {
        let mut cache = self.sql_cache.lock().unwrap_or_else(|e| e.into_inner());
        cache
            .entry(key)
            .or_insert_with(|| {
                let placeholders = vec!["?"; columns.len()].join(", ");
                format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    self.table(base_table),
                    columns.join(", "),
                    placeholders
                )
            })
            .clone()
    }

    pub fn insert_class_names(&self, rows: &[ClassNameRecord]) -> Result<()> {
        let sql = self.insert_sql(SQL_KEY_CLASS_NAME, "class_name", COLUMNS_CLASS_NAME);
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&sql)?;
            for row in rows {
                stmt.execute(params![row.full_class_name, row.simple_class_name])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_jar_info(&self, rows: &[JarInfoRecord]) -> Result<()> {
        let sql = self.insert_sql(SQL_KEY_JAR_INFO, "jar_info", COLUMNS_JAR_INFO);
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&sql)?;
            for row in rows {
                stmt.execute(params![
                    row.jar_num,
                    row.path_hash,
                    row.jar_path,
                    row.last_modified,
                    row.jar_hash,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_method_annotations(&self, rows: &[MethodAnnotationRecord]) -> Result<()> {
        let sql = self.insert_sql(
            SQL_KEY_METHOD_ANNOTATION,
            "method_annotation",
            COLUMNS_METHOD_ANNOTATION,
        );
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&sql)?;
            for row in rows {
                stmt.execute(params![row.method_hash, row.annotation, row.full_method])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_lambda_infos(&self, rows: &[LambdaMethodInfoRecord]) -> Result<()> {
        let sql = self.insert_sql(
            SQL_KEY_LAMBDA_METHOD_INFO,
            "lambda_method_info",
            COLUMNS_LAMBDA_METHOD_INFO,
        );
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&sql)?;
            for row in rows {
                let next = row.next.as_ref();
                stmt.execute(params![
                    row.call_id,
                    row.callee_class_name,
                    row.callee_method_name,
                    row.callee_full_method,
                    next.map(|n| n.class_name.as_str()),
                    next.map(|n| n.method_name.as_str()),
                    next.map(|n| n.full_method.as_str()),
                    next.map(|n| n.is_stream),
                    next.map(|n| n.is_intermediate),
                    next.map(|n| n.is_terminal),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_method_calls(&self, rows: &[MethodCallRecord]) -> Result<()> {
        let sql = self.insert_sql(SQL_KEY_METHOD_CALL, "method_call", COLUMNS_METHOD_CALL);
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&sql)?;
            for row in rows {
                stmt.execute(params![
                    row.call_id,
                    row.call_type,
                    row.enabled,
                    row.caller_jar_num,
                    row.caller_method_hash,
                    row.caller_full_method,
                    row.caller_method_name,
                    row.caller_full_class_name,
                    row.caller_class_name,
                    row.caller_line_num,
                    row.callee_method_hash,
                    row.callee_full_method,
                    row.callee_method_name,
                    row.callee_full_class_name,
                    row.callee_class_name,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_extension_data(&self, rows: &[ExtensionDataRecord]) -> Result<()> {
        let sql = self.insert_sql(
            SQL_KEY_EXTENSION_DATA,
            "extension_data",
            COLUMNS_EXTENSION_DATA,
        );
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&sql)?;
            for row in rows {
                stmt.execute(params![row.call_id, row.data_type, row.data_value])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Simple class names shared by more than one full class name.
    ///
    /// Must run only after every class name is durably stored; display
    /// name resolution reads the returned set.
    pub fn duplicate_simple_names(&self) -> Result<HashSet<String>> {
        let sql = format!(
            "SELECT simple_class_name FROM {} GROUP BY simple_class_name HAVING COUNT(*) > 1",
            self.table("class_name")
        );
        let conn = self.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut names = HashSet::new();
        for row in rows {
            names.insert(row?);
        }
        Ok(names)
    }

    /// Row count per owned table, in schema order.
    pub fn table_counts(&self) -> Result<Vec<(String, u64)>> {
        let conn = self.lock();
        let mut counts = Vec::with_capacity(schema::TABLES.len());
        for base in schema::TABLES {
            let table = self.table(base);
            let count: u64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })?;
            counts.push((table, count));
        }
        Ok(counts)
    }
}

/// Table names are built by string substitution, so the application
/// identifier must stay within identifier characters.
fn validate_app_name(app_name: &str) -> Result<()> {
    let valid = !app_name.is_empty()
        && app_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(LoadError::Config(format!(
            "app name must be non-empty and [A-Za-z0-9_]: {:?}",
            app_name
        )));
    }
    Ok(())
}
