//! Buffering registries for the first ingestion pass.
//!
//! All three registries are mutated only by the single reader thread and
//! hold no cross-run state; buffers are cleared after each flush.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::time::SystemTime;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::db::Database;
use crate::error::{LoadError, Result};
use crate::signature::{signature_hash, simple_class_name};
use crate::types::{ClassNameRecord, JarInfoRecord, MethodAnnotationRecord};
use crate::{PrefixFilter, BATCH_SIZE};

/// Deduplicates observed fully-qualified class names and flushes them in
/// insertion-ordered batches.
pub struct ClassNameRegistry {
    seen: HashSet<String>,
    pending: Vec<String>,
    written: u64,
}

impl ClassNameRegistry {
    pub fn new() -> Self {
        Self {
            seen: HashSet::with_capacity(BATCH_SIZE),
            pending: Vec::with_capacity(BATCH_SIZE),
            written: 0,
        }
    }

    /// Register a class name at most once; first-seen wins. Flushes the
    /// buffer when it reaches the batch threshold.
    pub fn observe(&mut self, full_class_name: &str, filter: &PrefixFilter, db: &Database) -> Result<()> {
        if !filter.allows(full_class_name) {
            debug!("class name outside allowed prefixes, dropped: {}", full_class_name);
            return Ok(());
        }

        if self.seen.insert(full_class_name.to_string()) {
            self.pending.push(full_class_name.to_string());
            if self.pending.len() >= BATCH_SIZE {
                self.flush(db)?;
            }
        }
        Ok(())
    }

    /// Flush buffered names, if any. Simple names are derived here.
    pub fn flush(&mut self, db: &Database) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        info!("writing class name batch of {}", self.pending.len());
        let rows: Vec<ClassNameRecord> = self
            .pending
            .iter()
            .map(|full| ClassNameRecord {
                full_class_name: full.clone(),
                simple_class_name: simple_class_name(full).to_string(),
            })
            .collect();
        db.insert_class_names(&rows)?;
        self.written += rows.len() as u64;
        self.pending.clear();
        Ok(())
    }

    /// Simple names shared by at least two packages. Call only after the
    /// final flush; the result drives display-name resolution.
    pub fn compute_collisions(&self, db: &Database) -> Result<HashSet<String>> {
        db.duplicate_simple_names()
    }

    /// Total rows written so far.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Default for ClassNameRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps jar ordinals to file paths; flushed as one unthresholded batch
/// because the full mapping must be known before call records reference
/// jar numbers. Last write wins if an ordinal repeats.
pub struct JarRegistry {
    jars: BTreeMap<u32, String>,
}

impl JarRegistry {
    pub fn new() -> Self {
        Self {
            jars: BTreeMap::new(),
        }
    }

    pub fn observe(&mut self, jar_num: u32, path: &str) {
        self.jars.insert(jar_num, path.to_string());
    }

    /// Validate every mapped file, compute hashes and mtimes, and persist
    /// the whole mapping as one batch. An empty mapping or a missing file
    /// is fatal.
    pub fn flush_all(&self, db: &Database) -> Result<u64> {
        if self.jars.is_empty() {
            return Err(LoadError::MissingResource(
                "no jar records found in input".to_string(),
            ));
        }

        info!("writing jar info for {} jars", self.jars.len());
        let mut rows = Vec::with_capacity(self.jars.len());
        for (&jar_num, path) in &self.jars {
            let metadata = fs::metadata(path).map_err(|_| {
                LoadError::MissingResource(format!("jar file does not exist: {}", path))
            })?;
            if !metadata.is_file() {
                return Err(LoadError::MissingResource(format!(
                    "jar path is not a file: {}",
                    path
                )));
            }

            let last_modified = metadata
                .modified()?
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            let content = fs::read(path)?;
            let mut hasher = Sha256::new();
            hasher.update(&content);
            let jar_hash = hex::encode(hasher.finalize());

            rows.push(JarInfoRecord {
                jar_num,
                path_hash: signature_hash(path),
                jar_path: path.clone(),
                last_modified,
                jar_hash,
            });
        }

        db.insert_jar_info(&rows)?;
        Ok(rows.len() as u64)
    }

    pub fn len(&self) -> usize {
        self.jars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jars.is_empty()
    }
}

impl Default for JarRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Buffers (full method signature, annotation) pairs. The signature hash
/// is computed at flush time, not at observe time.
pub struct AnnotationBuffer {
    pending: Vec<(String, String)>,
    written: u64,
}

impl AnnotationBuffer {
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(BATCH_SIZE),
            written: 0,
        }
    }

    pub fn observe(
        &mut self,
        full_method: &str,
        annotation: &str,
        filter: &PrefixFilter,
        db: &Database,
    ) -> Result<()> {
        if !filter.allows(full_method) {
            debug!("annotated method outside allowed prefixes, dropped: {}", full_method);
            return Ok(());
        }

        self.pending
            .push((full_method.to_string(), annotation.to_string()));
        if self.pending.len() >= BATCH_SIZE {
            self.flush(db)?;
        }
        Ok(())
    }

    pub fn flush(&mut self, db: &Database) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        info!("writing method annotation batch of {}", self.pending.len());
        let rows: Vec<MethodAnnotationRecord> = self
            .pending
            .iter()
            .map(|(full_method, annotation)| MethodAnnotationRecord {
                method_hash: signature_hash(full_method),
                annotation: annotation.clone(),
                full_method: full_method.clone(),
            })
            .collect();
        db.insert_method_annotations(&rows)?;
        self.written += rows.len() as u64;
        self.pending.clear();
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Default for AnnotationBuffer {
    fn default() -> Self {
        Self::new()
    }
}
