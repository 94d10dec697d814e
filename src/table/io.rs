//! CSV reading and writing at the pipeline boundaries.
//!
//! Input is decoded as UTF-8 when valid and as Mac-Roman otherwise, so legacy exports
//! still load. Outputs are staged next to their destination and renamed into place
//! only once every table has been written.

use crate::error::FeaturizeError;
use crate::table::types::RawTable;
use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Read a CSV file into a [`RawTable`].
pub fn read_table(path: &Path) -> Result<RawTable, FeaturizeError> {
    let bytes = fs::read(path).map_err(|e| FeaturizeError::io(path, e))?;
    let text = decode_input(&bytes);
    parse_table(&text)
}

/// Decode raw bytes, tolerating legacy Mac-Roman sequences.
pub fn decode_input(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text.strip_prefix('\u{feff}').unwrap_or(text)),
        Err(_) => {
            tracing::debug!("input is not valid UTF-8, decoding as Mac-Roman");
            encoding_rs::MACINTOSH.decode_without_bom_handling(bytes).0
        }
    }
}

/// Parse CSV text with a header row.
///
/// Short rows are padded with empty cells; rows longer than the header are rejected.
pub fn parse_table(text: &str) -> Result<RawTable, FeaturizeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() > headers.len() {
            return Err(FeaturizeError::RaggedRow {
                row,
                found: record.len(),
                expected: headers.len(),
            });
        }
        let mut values: Vec<String> = record.iter().map(str::to_string).collect();
        values.resize(headers.len(), String::new());
        rows.push(values);
    }

    RawTable::new(headers, rows)
}

/// Write a table as CSV to `path`.
pub fn write_table(path: &Path, table: &RawTable) -> Result<(), FeaturizeError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush().map_err(|e| FeaturizeError::io(path, e))?;
    Ok(())
}

/// Write several tables so that either all of them land at their destination or none.
///
/// Every table is first written to a `.partial` sibling. Existing files at the
/// destinations are moved aside before the renames and put back if any rename fails.
pub fn write_tables_atomically(outputs: &[(&Path, &RawTable)]) -> Result<(), FeaturizeError> {
    for (dest, _) in outputs {
        if dest.is_dir() {
            return Err(FeaturizeError::io(
                *dest,
                io::Error::new(io::ErrorKind::InvalidInput, "output path is a directory"),
            ));
        }
    }

    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(outputs.len());

    for (dest, table) in outputs {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent) {
                discard(&staged);
                return Err(FeaturizeError::io(parent, e));
            }
        }

        let tmp = sibling_path(dest, "partial");
        if let Err(e) = write_table(&tmp, table) {
            let _ = fs::remove_file(&tmp);
            discard(&staged);
            return Err(e);
        }
        staged.push((tmp, dest.to_path_buf()));
    }

    let mut committed: Vec<Commit> = Vec::with_capacity(staged.len());
    for (i, (tmp, dest)) in staged.iter().enumerate() {
        match commit(tmp, dest) {
            Ok(done) => committed.push(done),
            Err(e) => {
                rollback(&committed);
                discard(&staged[i..]);
                return Err(e);
            }
        }
    }

    for backup in committed.iter().filter_map(|c| c.backup.as_ref()) {
        let _ = fs::remove_file(backup);
    }

    Ok(())
}

/// A destination that was replaced during [`write_tables_atomically`].
struct Commit {
    dest: PathBuf,
    /// Where the previous file at `dest` was moved, if there was one
    backup: Option<PathBuf>,
}

fn commit(tmp: &Path, dest: &Path) -> Result<Commit, FeaturizeError> {
    let backup = if dest.exists() {
        let backup = sibling_path(dest, "previous");
        fs::rename(dest, &backup).map_err(|e| FeaturizeError::io(dest, e))?;
        Some(backup)
    } else {
        None
    };

    if let Err(e) = fs::rename(tmp, dest) {
        if let Some(backup) = &backup {
            let _ = fs::rename(backup, dest);
        }
        return Err(FeaturizeError::io(dest, e));
    }

    Ok(Commit {
        dest: dest.to_path_buf(),
        backup,
    })
}

fn rollback(committed: &[Commit]) {
    for commit in committed.iter().rev() {
        let _ = fs::remove_file(&commit.dest);
        if let Some(backup) = &commit.backup {
            let _ = fs::rename(backup, &commit.dest);
        }
    }
}

fn sibling_path(dest: &Path, suffix: &str) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(suffix);
    dest.with_file_name(name)
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (tmp, _) in staged {
        let _ = fs::remove_file(tmp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("convo-featurizer-io-{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_parse_table_pads_short_rows() {
        let table = parse_table("a,b,c\n1,2\n").unwrap();
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
    }

    #[test]
    fn test_parse_table_rejects_long_rows() {
        let result = parse_table("a,b\n1,2,3\n");
        assert!(matches!(result, Err(FeaturizeError::RaggedRow { .. })));
    }

    #[test]
    fn test_parse_table_quoted_fields() {
        let table = parse_table("a,message\n1,\"hello, world\"\n").unwrap();
        assert_eq!(table.rows[0][1], "hello, world");
    }

    #[test]
    fn test_decode_utf8_with_bom() {
        let bytes = "\u{feff}a,b\n".as_bytes();
        assert_eq!(decode_input(bytes), "a,b\n");
    }

    #[test]
    fn test_decode_mac_roman() {
        // 0x8E is 'é' in Mac-Roman and invalid as a lone UTF-8 byte
        let bytes = b"caf\x8E";
        assert_eq!(decode_input(bytes), "café");
    }

    #[test]
    fn test_write_tables_atomically() {
        let dir = temp_dir("atomic");
        let table = RawTable::new(vec!["x".into()], vec![vec!["1".into()]]).unwrap();
        let first = dir.join("first.csv");
        let second = dir.join("nested").join("second.csv");

        write_tables_atomically(&[(&first, &table), (&second, &table)]).unwrap();

        assert_eq!(fs::read_to_string(&first).unwrap(), "x\n1\n");
        assert_eq!(fs::read_to_string(&second).unwrap(), "x\n1\n");
        assert!(!dir.join("first.csv.partial").exists());
    }

    #[test]
    fn test_failed_save_leaves_no_output() {
        let dir = temp_dir("dir-dest");
        let table = RawTable::new(vec!["x".into()], vec![vec!["1".into()]]).unwrap();
        let first = dir.join("first.csv");
        let second = dir.join("second.csv");
        fs::create_dir_all(&second).unwrap();

        let result = write_tables_atomically(&[(&first, &table), (&second, &table)]);

        assert!(matches!(result, Err(FeaturizeError::Io { .. })));
        assert!(!first.exists());
        assert!(!dir.join("first.csv.partial").exists());
        assert!(!dir.join("second.csv.partial").exists());
    }

    #[test]
    fn test_failed_save_keeps_previous_outputs() {
        let dir = temp_dir("keep-previous");
        let table = RawTable::new(vec!["x".into()], vec![vec!["2".into()]]).unwrap();
        let first = dir.join("first.csv");
        let second = dir.join("second.csv");
        fs::write(&first, "x\nold\n").unwrap();
        fs::create_dir_all(&second).unwrap();

        assert!(write_tables_atomically(&[(&first, &table), (&second, &table)]).is_err());
        assert_eq!(fs::read_to_string(&first).unwrap(), "x\nold\n");
    }

    #[test]
    fn test_rollback_restores_replaced_files() {
        let dir = temp_dir("rollback");
        let first = dir.join("first.csv");
        let tmp = dir.join("first.csv.partial");
        fs::write(&first, "old").unwrap();
        fs::write(&tmp, "new").unwrap();

        let committed = commit(&tmp, &first).unwrap();
        assert_eq!(fs::read_to_string(&first).unwrap(), "new");

        rollback(&[committed]);
        assert_eq!(fs::read_to_string(&first).unwrap(), "old");
        assert!(!dir.join("first.csv.previous").exists());
    }

    #[test]
    fn test_overwrite_cleans_backups() {
        let dir = temp_dir("overwrite");
        let table = RawTable::new(vec!["x".into()], vec![vec!["3".into()]]).unwrap();
        let first = dir.join("first.csv");
        fs::write(&first, "old").unwrap();

        write_tables_atomically(&[(&first, &table)]).unwrap();

        assert_eq!(fs::read_to_string(&first).unwrap(), "x\n3\n");
        assert!(!dir.join("first.csv.previous").exists());
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_table(Path::new("/definitely/not/here.csv"));
        assert!(matches!(result, Err(FeaturizeError::Io { .. })));
    }
}
