//! callmap: load static call-graph extractor output into SQLite.
//!
//! An upstream analyzer walks a program's bytecode and emits a
//! line-oriented, tagged text stream describing its static call graph:
//! class references, method calls, method annotations, lambda call
//! chains, and jar metadata. This crate ingests that stream, normalizes
//! each record, and persists it to a relational store for later graph
//! queries.
//!
//! ## Pipeline
//!
//! Each run truncates and reloads. Phases, in order:
//!
//! 1. Create tables (idempotent) and truncate.
//! 2. Run extension handlers and store their derived rows.
//! 3. First pass over the input: class names (deduplicated, batched) and
//!    jar metadata (flushed as one batch once fully collected).
//! 4. Compute the set of simple class names shared across packages;
//!    this must complete before any display-name resolution.
//! 5. Annotation pass over the sibling annotation file.
//! 6. Second pass over the input: method calls, decoded on the reader
//!    thread and persisted by a backpressured writer pool; lambda call
//!    records, flushed synchronously in threshold batches.
//! 7. Drain the pool, then report a single success/failure verdict.

pub mod cli;
pub mod db;
pub mod decode;
pub mod error;
pub mod extension;
pub mod record;
pub mod registry;
pub mod signature;
pub mod types;
pub mod writer;

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::mem;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use db::Database;
use decode::{decode_lambda_info, decode_method_call, Decoded};
use error::{LoadError, Result};
use extension::{run_extension_handlers, ExtensionHandler};
use record::{strip_tag, RecordKind};
use registry::{AnnotationBuffer, ClassNameRegistry, JarRegistry};
use writer::BatchWriter;

/// Buffered-row count that triggers a flush to the persistence engine.
pub const BATCH_SIZE: usize = 1000;

/// The annotation stream lives in a sibling file next to the main input.
pub const ANNOTATION_FILE_SUFFIX: &str = "-annotation.txt";

/// Configuration for one load run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Application identifier suffixed onto every table name.
    pub app_name: String,
    /// Path to the extractor's output file.
    pub input_file: String,
    /// Path to the SQLite database file.
    pub db_path: String,
    /// When true, records outside `allowed_prefixes` are dropped.
    pub filter_packages: bool,
    /// Package-name prefixes to keep when filtering is enabled.
    pub allowed_prefixes: Vec<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            app_name: "app".to_string(),
            input_file: "callgraph.txt".to_string(),
            db_path: "callmap.db".to_string(),
            filter_packages: false,
            allowed_prefixes: Vec::new(),
        }
    }
}

/// Allowed-prefix policy applied to class names and method signatures.
#[derive(Debug, Clone)]
pub struct PrefixFilter {
    enabled: bool,
    prefixes: Vec<String>,
}

impl PrefixFilter {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self {
            enabled: true,
            prefixes,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            prefixes: Vec::new(),
        }
    }

    /// Filtering enabled with nothing allowed would drop every record,
    /// so an empty prefix set is a configuration error.
    pub fn from_config(config: &LoadConfig) -> Result<Self> {
        if !config.filter_packages {
            return Ok(Self::disabled());
        }
        if config.allowed_prefixes.is_empty() {
            return Err(LoadError::Config(
                "package filtering enabled but no allowed prefixes given".to_string(),
            ));
        }
        Ok(Self::new(config.allowed_prefixes.clone()))
    }

    pub fn allows(&self, name: &str) -> bool {
        !self.enabled || self.prefixes.iter().any(|p| name.starts_with(p))
    }
}

/// Row counts from one load run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct LoadStats {
    pub classes: u64,
    pub jars: u64,
    pub annotations: u64,
    pub lambda_infos: u64,
    pub method_calls: u64,
    pub extension_rows: u64,
    pub filtered: u64,
    pub recursive_dropped: u64,
}

/// Load one extractor output pair into the database.
///
/// `handlers` may be empty. On success every row is durably stored; on
/// failure partial data may already be persisted (no transaction spans
/// the whole run).
pub fn run_load(
    db: &Database,
    config: &LoadConfig,
    handlers: &mut [Box<dyn ExtensionHandler>],
) -> Result<LoadStats> {
    let filter = PrefixFilter::from_config(config)?;
    info!(
        "loading call graph for app {} from {}",
        config.app_name, config.input_file
    );

    db.create_tables()?;
    db.truncate_tables()?;

    let mut stats = LoadStats {
        extension_rows: run_extension_handlers(db, handlers)?,
        ..Default::default()
    };

    // First pass: class names and jar metadata.
    let mut classes = ClassNameRegistry::new();
    let mut jars = JarRegistry::new();
    let read_any = class_and_jar_pass(db, &config.input_file, &filter, &mut classes, &mut jars)?;
    classes.flush(db)?;
    stats.classes = classes.written();

    if !read_any {
        warn!(
            "no records read from {}; check the file and the allowed prefixes",
            config.input_file
        );
    }
    if stats.classes == 0 {
        warn!("no class names written; check the input content");
    }

    stats.jars = jars.flush_all(db)?;

    // Collision set must be final before any display-name resolution.
    let collisions = classes.compute_collisions(db)?;
    info!("ambiguous simple class names: {}", collisions.len());

    // Annotation pass over the sibling file.
    let annotation_file = format!("{}{}", config.input_file, ANNOTATION_FILE_SUFFIX);
    let mut annotations = AnnotationBuffer::new();
    annotation_pass(db, &annotation_file, &filter, &mut annotations)?;
    stats.annotations = annotations.written();

    // Method-call pass with asynchronous batched persistence. Whatever
    // the pass outcome, already-dispatched batches must finish before
    // the run concludes.
    let writer = BatchWriter::spawn(db.clone())?;
    let pass_result = method_call_pass(
        db,
        &config.input_file,
        &filter,
        &collisions,
        &writer,
        &mut stats,
    );
    let drained_ok = writer.drain();
    pass_result?;
    if !drained_ok {
        return Err(LoadError::Persistence);
    }

    info!(
        "load complete: {} classes, {} jars, {} annotations, {} method calls, {} lambda records, {} extension rows ({} filtered, {} recursive dropped)",
        stats.classes,
        stats.jars,
        stats.annotations,
        stats.method_calls,
        stats.lambda_infos,
        stats.extension_rows,
        stats.filtered,
        stats.recursive_dropped
    );
    Ok(stats)
}

fn open_input(path: &str) -> Result<BufReader<File>> {
    if !Path::new(path).is_file() {
        return Err(LoadError::MissingResource(format!(
            "input file does not exist: {}",
            path
        )));
    }
    Ok(BufReader::new(File::open(path)?))
}

/// First pass: observe class references and jar mappings. Returns
/// whether any non-blank line was read.
fn class_and_jar_pass(
    db: &Database,
    input_file: &str,
    filter: &PrefixFilter,
    classes: &mut ClassNameRegistry,
    jars: &mut JarRegistry,
) -> Result<bool> {
    let reader = open_input(input_file)?;
    let mut read_any = false;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        read_any = true;

        match RecordKind::classify(&line) {
            Some(RecordKind::ClassReference) => {
                let body = strip_tag(&line);
                let (caller, callee) = body
                    .split_once(' ')
                    .ok_or_else(|| LoadError::malformed(&line, "expected two class names"))?;
                classes.observe(caller.trim(), filter, db)?;
                classes.observe(callee.trim(), filter, db)?;
            }
            Some(RecordKind::JarInfo) => {
                let body = strip_tag(&line);
                let (num, path) = body
                    .split_once(' ')
                    .ok_or_else(|| LoadError::malformed(&line, "expected jar number and path"))?;
                let jar_num: u32 = num
                    .trim()
                    .parse()
                    .map_err(|_| LoadError::malformed(&line, "non-numeric jar number"))?;
                jars.observe(jar_num, path.trim());
            }
            // Method calls and lambdas belong to the later pass; unknown
            // tags are ignored for forward compatibility.
            _ => {}
        }
    }

    Ok(read_any)
}

/// Annotation pass over the sibling file. Only annotation records are
/// expected there; other tags are ignored.
fn annotation_pass(
    db: &Database,
    annotation_file: &str,
    filter: &PrefixFilter,
    annotations: &mut AnnotationBuffer,
) -> Result<()> {
    let reader = open_input(annotation_file)?;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        if RecordKind::classify(&line) == Some(RecordKind::MethodAnnotation) {
            let body = strip_tag(&line);
            let (full_method, annotation) = body
                .split_once(' ')
                .ok_or_else(|| LoadError::malformed(&line, "expected signature and annotation"))?;
            annotations.observe(full_method.trim(), annotation.trim(), filter, db)?;
        }
    }

    annotations.flush(db)
}

/// Second pass over the input: decode method calls and lambda records.
/// Method-call batches go to the writer pool; lambda batches are flushed
/// synchronously on the reader thread.
fn method_call_pass(
    db: &Database,
    input_file: &str,
    filter: &PrefixFilter,
    collisions: &HashSet<String>,
    writer: &BatchWriter,
    stats: &mut LoadStats,
) -> Result<()> {
    let reader = open_input(input_file)?;
    let mut pending: Vec<types::MethodCallRecord> = Vec::with_capacity(BATCH_SIZE);
    let mut lambda_pending: Vec<types::LambdaMethodInfoRecord> = Vec::with_capacity(BATCH_SIZE);

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match RecordKind::classify(&line) {
            Some(RecordKind::MethodCall) => {
                match decode_method_call(&line, filter, collisions)? {
                    Decoded::Record(record) => {
                        pending.push(*record);
                        stats.method_calls += 1;
                        if pending.len() >= BATCH_SIZE {
                            writer.submit(mem::take(&mut pending));
                            pending.reserve(BATCH_SIZE);
                        }
                    }
                    Decoded::Filtered => stats.filtered += 1,
                    Decoded::Recursive => stats.recursive_dropped += 1,
                }
            }
            Some(RecordKind::LambdaInfo) => {
                lambda_pending.push(decode_lambda_info(&line)?);
                stats.lambda_infos += 1;
                if lambda_pending.len() >= BATCH_SIZE {
                    info!("writing lambda info batch of {}", lambda_pending.len());
                    db.insert_lambda_infos(&lambda_pending)?;
                    lambda_pending.clear();
                }
            }
            _ => {}
        }
    }

    if !lambda_pending.is_empty() {
        info!("writing lambda info batch of {}", lambda_pending.len());
        db.insert_lambda_infos(&lambda_pending)?;
    }
    writer.submit(pending);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_filter_allows_everything() {
        let filter = PrefixFilter::disabled();
        assert!(filter.allows("com.a.Foo"));
        assert!(filter.allows(""));
    }

    #[test]
    fn enabled_filter_matches_prefixes_only() {
        let filter = PrefixFilter::new(vec!["com.a.".to_string(), "com.b.".to_string()]);
        assert!(filter.allows("com.a.Foo"));
        assert!(filter.allows("com.b.Bar.baz()V"));
        assert!(!filter.allows("org.other.Qux"));
    }

    #[test]
    fn filtering_without_prefixes_is_a_config_error() {
        let config = LoadConfig {
            filter_packages: true,
            ..Default::default()
        };
        assert!(matches!(
            PrefixFilter::from_config(&config),
            Err(LoadError::Config(_))
        ));
    }
}
