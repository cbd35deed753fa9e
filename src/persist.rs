//! Entry file I/O and atomic progress snapshots.
//!
//! Files are UTF-8 JSON arrays pretty-printed with four-space indentation
//! and unescaped non-ASCII text. [`save`] writes to a sibling temporary file
//! and renames it over the target, so readers only ever see a complete
//! previous or a complete new snapshot.

use crate::entry::Entry;
use crate::error::{Result, SozlukError};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::trace;

/// Serialize entries in the on-disk format.
pub fn to_json(entries: &[Entry]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buf, formatter);
    entries.serialize(&mut serializer)?;
    Ok(buf)
}

/// Atomically replace `path` with a snapshot of `entries`.
pub fn save(entries: &[Entry], path: &Path) -> Result<()> {
    let write_err = |source: std::io::Error| SozlukError::OutputFileWrite {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let data = to_json(entries)?;

    // Dropping the temp file on any early return removes it.
    let tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        writer.write_all(&data).map_err(write_err)?;
        writer.flush().map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    trace!(path = %path.display(), entries = entries.len(), "Snapshot saved");
    Ok(())
}

/// Read an entry file.
pub fn load(path: &Path) -> Result<Vec<Entry>> {
    let content = fs::read_to_string(path).map_err(|e| SozlukError::InputFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| SozlukError::JsonParse {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::tempdir;

    fn sample() -> Vec<Entry> {
        let mut a = Entry::new("ab-", "to hunt", "ab- 'to hunt'");
        a.meaning_tr = Some(Some("avlamak".to_string()));
        a.page = Some(Value::from(1));
        vec![a, Entry::new("ağ", "net", "ağ 'net'")]
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");

        save(&sample(), &path).unwrap();
        assert_eq!(load(&path).unwrap(), sample());
    }

    #[test]
    fn test_snapshot_keeps_null_fields() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.json");
        let output = dir.path().join("out.json");
        let source = r#"[{"word":"ab","meaning":null,"meaning_tr":null,"page":null,"etymology_type":null}]"#;
        fs::write(&input, source).unwrap();

        save(&load(&input).unwrap(), &output).unwrap();

        let written: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        let expected: Value = serde_json::from_str(source).unwrap();
        assert_eq!(written, expected);
    }

    #[test]
    fn test_format_indent_and_unicode() {
        let text = String::from_utf8(to_json(&sample()).unwrap()).unwrap();
        assert!(text.starts_with("[\n    {\n        \"word\": \"ab-\""));
        assert!(text.contains("\"ağ\""));
        assert!(!text.contains("\\u"));
    }

    #[test]
    fn test_save_replaces_and_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");

        save(&sample(), &path).unwrap();
        save(&sample()[..1], &path).unwrap();

        assert_eq!(load(&path).unwrap().len(), 1);
        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_failed_save_keeps_previous_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        save(&sample(), &path).unwrap();

        // A directory where the file should go makes the rename fail.
        let blocked = dir.path().join("blocked");
        fs::create_dir(&blocked).unwrap();
        fs::write(blocked.join("inner"), b"x").unwrap();
        assert!(save(&sample(), &blocked).is_err());

        assert_eq!(load(&path).unwrap(), sample());
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 2);
    }

    #[test]
    fn test_load_reports_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "[{\"word\": ").unwrap();

        assert!(matches!(load(&path), Err(SozlukError::JsonParse { .. })));
    }
}
