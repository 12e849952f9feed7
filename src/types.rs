//! Row types for every table the loader owns.
//!
//! One struct per table; field order matches column order in the insert
//! statements. All rows are write-once within a run: the loader truncates
//! on startup and never issues UPDATE or DELETE afterwards.

use serde::{Deserialize, Serialize};

/// Value of the `enabled` column for freshly loaded method calls.
pub const ENABLED: i64 = 1;

/// A deduplicated fully-qualified class name and its derived simple name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNameRecord {
    pub full_class_name: String,
    pub simple_class_name: String,
}

/// Metadata for one jar referenced by the input, keyed by the extractor's
/// jar ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JarInfoRecord {
    pub jar_num: u32,
    pub path_hash: String,
    pub jar_path: String,
    pub last_modified: i64,
    pub jar_hash: String,
}

/// One annotation on one method. A method may carry several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodAnnotationRecord {
    pub method_hash: String,
    pub annotation: String,
    pub full_method: String,
}

/// The onward call chained after a lambda callee, when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaNextInfo {
    pub class_name: String,
    pub method_name: String,
    pub full_method: String,
    pub is_stream: bool,
    pub is_intermediate: bool,
    pub is_terminal: bool,
}

/// Lambda call record keyed by the owning method call's id.
///
/// `next` is `None` when the lambda has no onward stream-chained call;
/// the storage layer writes NULLs then, so absence stays distinguishable
/// from flags classified as false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LambdaMethodInfoRecord {
    pub call_id: i64,
    pub callee_class_name: String,
    pub callee_method_name: String,
    pub callee_full_method: String,
    pub next: Option<LambdaNextInfo>,
}

/// One edge of the call graph: the highest-volume record type.
///
/// `caller_class_name` / `callee_class_name` are display names: the
/// simple class name unless that simple name is ambiguous across
/// packages, in which case the full name is stored instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodCallRecord {
    pub call_id: i64,
    pub call_type: String,
    pub enabled: i64,
    pub caller_jar_num: u32,
    pub caller_method_hash: String,
    pub caller_full_method: String,
    pub caller_method_name: String,
    pub caller_full_class_name: String,
    pub caller_class_name: String,
    pub caller_line_num: u32,
    pub callee_method_hash: String,
    pub callee_full_method: String,
    pub callee_method_name: String,
    pub callee_full_class_name: String,
    pub callee_class_name: String,
}

/// Free-form row contributed by an extension handler, keyed back to a
/// method call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionDataRecord {
    pub call_id: i64,
    pub data_type: String,
    pub data_value: String,
}
