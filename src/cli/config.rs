//! Configuration file loading

use anyhow::{Context, Result};
use std::path::Path;

use crate::LoadConfig;

/// Load a [`LoadConfig`] from a JSON file. Missing fields fall back to
/// their defaults.
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<LoadConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("could not read config file {}", path.display()))?;
    let config: LoadConfig = serde_json::from_str(&content)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(config)
}

/// Read an allowed-prefix set from a newline-delimited file. Blank lines
/// and `#` comments are skipped.
pub fn read_prefix_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("could not read prefix file {}", path.display()))?;

    let prefixes: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    anyhow::ensure!(
        !prefixes.is_empty(),
        "prefix file {} contains no prefixes",
        path.display()
    );
    Ok(prefixes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"app_name": "myapp", "input_file": "cg.txt"}"#).unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.app_name, "myapp");
        assert_eq!(config.input_file, "cg.txt");
        assert_eq!(config.db_path, "callmap.db");
        assert!(!config.filter_packages);
    }

    #[test]
    fn prefix_file_skips_blanks_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefixes.txt");
        std::fs::write(&path, "# kept packages\ncom.a.\n\ncom.b.\n").unwrap();

        let prefixes = read_prefix_file(&path).unwrap();
        assert_eq!(prefixes, vec!["com.a.".to_string(), "com.b.".to_string()]);
    }

    #[test]
    fn empty_prefix_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefixes.txt");
        std::fs::write(&path, "\n# only comments\n").unwrap();
        assert!(read_prefix_file(&path).is_err());
    }
}
