//! Asynchronous batched persistence for the method-call table.
//!
//! A fixed pool of writer threads receives whole batches over a bounded
//! channel. `submit` blocks while the channel is full, so the reader
//! thread can never queue unbounded work ahead of a slow store. A failed
//! insert sets a sticky failure flag; no batch is retried, and the flag
//! is read only after `drain` joins every worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{error, info};

use crate::db::Database;
use crate::error::Result;
use crate::types::MethodCallRecord;

/// Writer thread count. Fixed: a shared SQLite connection gains nothing
/// past a few workers, and the bounded channel sized to match is what
/// provides backpressure.
pub const WRITER_THREADS: usize = 4;

pub struct BatchWriter {
    tx: Option<SyncSender<Vec<MethodCallRecord>>>,
    handles: Vec<JoinHandle<()>>,
    failed: Arc<AtomicBool>,
}

impl BatchWriter {
    /// Spawn the worker pool against a shared database handle.
    pub fn spawn(db: Database) -> Result<Self> {
        let (tx, rx) = mpsc::sync_channel::<Vec<MethodCallRecord>>(WRITER_THREADS);
        let rx = Arc::new(Mutex::new(rx));
        let failed = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::with_capacity(WRITER_THREADS);
        for i in 0..WRITER_THREADS {
            let rx = Arc::clone(&rx);
            let failed = Arc::clone(&failed);
            let db = db.clone();
            let handle = thread::Builder::new()
                .name(format!("callmap-writer-{}", i))
                .spawn(move || loop {
                    let batch = {
                        let guard = rx.lock().unwrap_or_else(|e| e.into_inner());
                        match guard.recv() {
                            Ok(batch) => batch,
                            // Sender dropped: pool is draining.
                            Err(_) => break,
                        }
                    };
                    info!("writing method call batch of {}", batch.len());
                    if let Err(err) = db.insert_method_calls(&batch) {
                        error!("method call batch insert failed: {}", err);
                        failed.store(true, Ordering::SeqCst);
                    }
                })?;
            handles.push(handle);
        }

        Ok(Self {
            tx: Some(tx),
            handles,
            failed,
        })
    }

    /// Hand a batch to the pool, blocking until a slot is free.
    ///
    /// Row order inside the batch is preserved; ordering across batches
    /// is not guaranteed.
    pub fn submit(&self, batch: Vec<MethodCallRecord>) {
        if batch.is_empty() {
            return;
        }
        if let Some(tx) = &self.tx {
            if tx.send(batch).is_err() {
                // All workers gone; only happens after a panic.
                self.failed.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Whether any batch has failed so far. Authoritative only after
    /// [`BatchWriter::drain`].
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Close the channel, wait for every in-flight batch to finish, and
    /// report overall success.
    pub fn drain(mut self) -> bool {
        self.tx.take();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                self.failed.store(true, Ordering::SeqCst);
            }
        }
        !self.failed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ENABLED;

    fn record(call_id: i64) -> MethodCallRecord {
        MethodCallRecord {
            call_id,
            call_type: "VIRTUAL".to_string(),
            enabled: ENABLED,
            caller_jar_num: 1,
            caller_method_hash: format!("caller{}", call_id),
            caller_full_method: "com.a.Foo.bar()V".to_string(),
            caller_method_name: "bar".to_string(),
            caller_full_class_name: "com.a.Foo".to_string(),
            caller_class_name: "Foo".to_string(),
            caller_line_num: 1,
            callee_method_hash: format!("callee{}", call_id),
            callee_full_method: "com.b.Baz.qux()I".to_string(),
            callee_method_name: "qux".to_string(),
            callee_full_class_name: "com.b.Baz".to_string(),
            callee_class_name: "Baz".to_string(),
        }
    }

    fn test_db() -> Database {
        let db = Database::in_memory("testapp").unwrap();
        db.create_tables().unwrap();
        db
    }

    #[test]
    fn batches_persist_and_drain_reports_success() {
        let db = test_db();
        let writer = BatchWriter::spawn(db.clone()).unwrap();

        writer.submit((0..10).map(record).collect());
        writer.submit((10..25).map(record).collect());
        writer.submit(Vec::new()); // no-op

        assert!(writer.drain());
        let counts = db.table_counts().unwrap();
        let method_calls = counts
            .iter()
            .find(|(table, _)| table.starts_with("method_call"))
            .map(|(_, count)| *count)
            .unwrap();
        assert_eq!(method_calls, 25);
    }

    #[test]
    fn duplicate_call_id_sets_sticky_failure() {
        let db = test_db();
        let writer = BatchWriter::spawn(db.clone()).unwrap();

        // Same primary key twice in separate batches: the second insert
        // must fail and poison the run verdict, not abort other batches.
        writer.submit(vec![record(1)]);
        writer.submit(vec![record(1)]);
        writer.submit(vec![record(2)]);

        assert!(!writer.drain());
    }
}
