//! Configuration persistence using toml_edit to preserve formatting and comments.

use super::Config;
use anyhow::{Context, Result};
use std::path::Path;
use toml_edit::DocumentMut;

/// Save the config to a TOML file.
///
/// When the file already exists, each top-level section is replaced in place
/// so comments and unknown keys in the existing document survive.
pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    let new_content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config")?;
    let new_doc: DocumentMut = new_content
        .parse()
        .with_context(|| "Failed to parse serialized config")?;

    let doc = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut doc: DocumentMut = content
            .parse()
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        merge_sections(&mut doc, &new_doc);
        doc
    } else {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {:?}", parent))?;
            }
        }
        new_doc
    };

    std::fs::write(path, doc.to_string())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    Ok(())
}

fn merge_sections(target: &mut DocumentMut, source: &DocumentMut) {
    for (section, item) in source.iter() {
        let Some(new_table) = item.as_table() else {
            target[section] = item.clone();
            continue;
        };

        match target.get_mut(section).and_then(|i| i.as_table_mut()) {
            Some(existing) => {
                for (key, value) in new_table.iter() {
                    existing[key] = value.clone();
                }
            }
            None => target[section] = item.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webpforge_common::NamingMode;

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.limits.max_files = 12;
        config.export.naming = NamingMode::Suffix;
        save_config(&path, &config).unwrap();

        let loaded = crate::config::load_config(&path).unwrap();
        assert_eq!(loaded.limits.max_files, 12);
        assert_eq!(loaded.export.naming, NamingMode::Suffix);
    }

    #[test]
    fn test_save_preserves_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "# keep me\n[limits]\nmax_files = 5 # small batches\n").unwrap();

        let mut config = crate::config::load_config(&path).unwrap();
        config.limits.max_file_size_mb = 10;
        save_config(&path, &config).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("# keep me"));
        let loaded = crate::config::load_config(&path).unwrap();
        assert_eq!(loaded.limits.max_files, 5);
        assert_eq!(loaded.limits.max_file_size_mb, 10);
    }
}
