//! Command implementations for CLI operations

use anyhow::Result;

use crate::db::Database;
use crate::{run_load, LoadConfig};

/// Load an extractor output pair into the database.
pub fn load_command(config: &LoadConfig) -> Result<()> {
    let db = Database::open(&config.db_path, &config.app_name)?;
    let stats = run_load(&db, config, &mut [])?;

    println!("\nLoad complete!");
    println!("  Class names:    {}", stats.classes);
    println!("  Jars:           {}", stats.jars);
    println!("  Annotations:    {}", stats.annotations);
    println!("  Method calls:   {}", stats.method_calls);
    println!("  Lambda records: {}", stats.lambda_infos);
    if stats.extension_rows > 0 {
        println!("  Extension rows: {}", stats.extension_rows);
    }
    if stats.filtered > 0 {
        println!("  Filtered out:   {}", stats.filtered);
    }
    if stats.recursive_dropped > 0 {
        println!("  Recursive dropped: {}", stats.recursive_dropped);
    }

    Ok(())
}

/// Show per-table row counts for a loaded application.
pub fn status_command(db_path: &str, app_name: &str) -> Result<()> {
    if !std::path::Path::new(db_path).exists() {
        println!("No database found at {}", db_path);
        println!("Run 'callmap load <input>' first.");
        return Ok(());
    }

    let db = Database::open(db_path, app_name)?;
    db.create_tables()?;

    println!("callmap status");
    println!("==============");
    println!("Database: {}", db_path);
    println!("App:      {}", app_name);
    println!();
    for (table, count) in db.table_counts()? {
        println!("  {}: {} rows", table, count);
    }

    Ok(())
}
