//! Pluggable post-processors contributing derived rows.
//!
//! Handlers are registered by explicit, typed construction and invoked
//! once per run, after the upstream extractor's output is available and
//! before the loader's own decoding begins. Their output is opaque to
//! the pipeline and written through the same batched-insert path as any
//! other table, chunked by the batch size at insert time.

use tracing::info;

use crate::db::Database;
use crate::error::Result;
use crate::types::ExtensionDataRecord;
use crate::BATCH_SIZE;

/// Capability interface for extension handlers.
pub trait ExtensionHandler {
    /// Handler name, used in logs only.
    fn name(&self) -> &str;

    /// One-time setup before any rows are produced.
    fn init(&mut self) -> Result<()>;

    /// The finite sequence of derived rows this handler contributes.
    fn produce_rows(&mut self) -> Vec<ExtensionDataRecord>;
}

/// Initialize every handler, collect its rows, and insert them in
/// batch-size chunks. Returns the total row count written.
pub fn run_extension_handlers(
    db: &Database,
    handlers: &mut [Box<dyn ExtensionHandler>],
) -> Result<u64> {
    let mut total = 0u64;
    for handler in handlers.iter_mut() {
        handler.init()?;
        let rows = handler.produce_rows();
        if rows.is_empty() {
            continue;
        }

        info!("extension data from {}: {} rows", handler.name(), rows.len());
        for chunk in rows.chunks(BATCH_SIZE) {
            db.insert_extension_data(chunk)?;
            total += chunk.len() as u64;
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRows(Vec<ExtensionDataRecord>);

    impl ExtensionHandler for FixedRows {
        fn name(&self) -> &str {
            "fixed_rows"
        }

        fn init(&mut self) -> Result<()> {
            Ok(())
        }

        fn produce_rows(&mut self) -> Vec<ExtensionDataRecord> {
            std::mem::take(&mut self.0)
        }
    }

    #[test]
    fn handler_rows_are_written_in_chunks() {
        let db = Database::in_memory("testapp").unwrap();
        db.create_tables().unwrap();

        let rows: Vec<ExtensionDataRecord> = (0..(BATCH_SIZE + 5))
            .map(|i| ExtensionDataRecord {
                call_id: i as i64,
                data_type: "note".to_string(),
                data_value: format!("value{}", i),
            })
            .collect();
        let mut handlers: Vec<Box<dyn ExtensionHandler>> = vec![Box::new(FixedRows(rows))];

        let written = run_extension_handlers(&db, &mut handlers).unwrap();
        assert_eq!(written, (BATCH_SIZE + 5) as u64);

        let counts = db.table_counts().unwrap();
        let extension = counts
            .iter()
            .find(|(table, _)| table.starts_with("extension_data"))
            .map(|(_, count)| *count)
            .unwrap();
        assert_eq!(extension, (BATCH_SIZE + 5) as u64);
    }

    #[test]
    fn empty_handler_list_is_a_no_op() {
        let db = Database::in_memory("testapp").unwrap();
        db.create_tables().unwrap();
        let mut handlers: Vec<Box<dyn ExtensionHandler>> = Vec::new();
        assert_eq!(run_extension_handlers(&db, &mut handlers).unwrap(), 0);
    }
}
