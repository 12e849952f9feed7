//! Database schema definition.
//!
//! Table names carry an application-identifier suffix so several loaded
//! programs can share one database file. `{APP}` is substituted before
//! execution; creation is idempotent.

pub const SCHEMA: &str = r#"
-- Deduplicated class names observed in the input
CREATE TABLE IF NOT EXISTS class_name_{APP} (
    full_class_name TEXT NOT NULL PRIMARY KEY,
    simple_class_name TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_cn_simple_{APP} ON class_name_{APP}(simple_class_name);

-- Jar ordinal to file path, with content hash and mtime
CREATE TABLE IF NOT EXISTS jar_info_{APP} (
    jar_num INTEGER NOT NULL PRIMARY KEY,
    path_hash TEXT NOT NULL,
    jar_path TEXT NOT NULL,
    last_modified INTEGER NOT NULL,
    jar_hash TEXT NOT NULL
);

-- Method annotations; a method may have several rows
CREATE TABLE IF NOT EXISTS method_annotation_{APP} (
    method_hash TEXT NOT NULL,
    annotation TEXT NOT NULL,
    full_method TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_ma_hash_{APP} ON method_annotation_{APP}(method_hash);

-- Lambda call records; next_* columns are NULL when the lambda has no
-- onward chained call (distinct from a false classification)
CREATE TABLE IF NOT EXISTS lambda_method_info_{APP} (
    call_id INTEGER NOT NULL PRIMARY KEY,
    callee_class_name TEXT NOT NULL,
    callee_method_name TEXT NOT NULL,
    callee_full_method TEXT NOT NULL,
    next_class_name TEXT,
    next_method_name TEXT,
    next_full_method TEXT,
    next_is_stream INTEGER,
    next_is_intermediate INTEGER,
    next_is_terminal INTEGER
);

-- Method call edges, the highest-volume table
CREATE TABLE IF NOT EXISTS method_call_{APP} (
    call_id INTEGER NOT NULL PRIMARY KEY,
    call_type TEXT NOT NULL,
    enabled INTEGER NOT NULL,
    caller_jar_num INTEGER NOT NULL,
    caller_method_hash TEXT NOT NULL,
    caller_full_method TEXT NOT NULL,
    caller_method_name TEXT NOT NULL,
    caller_full_class_name TEXT NOT NULL,
    caller_class_name TEXT NOT NULL,
    caller_line_num INTEGER NOT NULL,
    callee_method_hash TEXT NOT NULL,
    callee_full_method TEXT NOT NULL,
    callee_method_name TEXT NOT NULL,
    callee_full_class_name TEXT NOT NULL,
    callee_class_name TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_mc_caller_{APP} ON method_call_{APP}(caller_method_hash);
CREATE INDEX IF NOT EXISTS idx_mc_callee_{APP} ON method_call_{APP}(callee_method_hash);

-- Opaque rows contributed by extension handlers
CREATE TABLE IF NOT EXISTS extension_data_{APP} (
    call_id INTEGER NOT NULL,
    data_type TEXT NOT NULL,
    data_value TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_ed_call_id_{APP} ON extension_data_{APP}(call_id);
"#;

/// Base table names, without the application suffix.
pub const TABLES: &[&str] = &[
    "class_name",
    "jar_info",
    "method_annotation",
    "lambda_method_info",
    "method_call",
    "extension_data",
];
