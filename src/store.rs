use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::document::Document;

const DATA_DIR: &str = "data";

/// `data/<identifier>.json`, with anything outside `[A-Za-z0-9_-]` replaced.
pub fn default_path(identifier: &str) -> PathBuf {
    let stem: String = identifier
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    Path::new(DATA_DIR).join(format!("{}.json", stem))
}

pub fn save_document(document: &Document, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(document)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::test_support::{document, record};

    #[test]
    fn default_path_is_filesystem_safe() {
        assert_eq!(default_path("FP/2025/0159"), Path::new("data/FP_2025_0159.json"));
        assert_eq!(default_path("a b?c"), Path::new("data/a_b_c.json"));
    }

    #[test]
    fn writes_indented_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");
        let doc = document("FP/2025/0159", Some(record(&[("status", "Ongoing")])));

        save_document(&doc, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"metadata\""));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["summary"]["status"], "Ongoing");
    }
}
