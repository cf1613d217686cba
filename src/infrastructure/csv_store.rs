//! CSV tables shared between the pipeline steps
//!
//! Tables are written as UTF-8 with a byte-order mark so spreadsheet tools pick
//! the right encoding, and always through a temporary file in the target
//! directory that is renamed into place. Readers strip the BOM, sniff the
//! delimiter from the header line, and skip rows that fail to deserialize.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const CANDIDATE_DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Options for written tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Read all rows of a table. A missing file reads as an empty table.
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Input table {} does not exist, treating it as empty", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };

    parse_table(&bytes).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Parse table bytes, skipping malformed rows with a warning
pub fn parse_table<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let delimiter = sniff_delimiter(body);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(body);

    // Header problems make the whole table unreadable
    reader.headers().context("Failed to read CSV header")?;

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<T>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) => warn!("Skipping malformed row {}: {}", index + 2, e),
        }
    }

    debug!("Read {} rows (delimiter '{}')", rows.len(), char::from(delimiter));
    Ok(rows)
}

/// Delimiter occurring most often in the header line; `,` when none occurs
pub fn sniff_delimiter(body: &[u8]) -> u8 {
    let header = body.split(|b| *b == b'\n').next().unwrap_or_default();

    CANDIDATE_DELIMITERS
        .iter()
        .map(|d| (*d, header.iter().filter(|b| *b == d).count()))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map_or(b',', |(d, _)| d)
}

/// Write `rows` under `columns`, replacing `path` atomically.
///
/// The header is always written, so an empty table is a header-only file.
pub fn write_table<T: Serialize>(path: &Path, columns: &[&str], rows: &[T], options: CsvOptions) -> Result<()> {
    let mut buffer = UTF8_BOM.to_vec();
    {
        let mut writer = WriterBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(false)
            .from_writer(&mut buffer);

        writer.write_record(columns).context("Failed to write CSV header")?;
        for row in rows {
            writer.serialize(row).context("Failed to serialize CSV row")?;
        }
        writer.flush().context("Failed to flush CSV writer")?;
    }

    replace_file(path, &buffer)?;
    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Write `contents` to a temporary file next to `path`, then rename it over `path`
pub fn replace_file(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).with_context(|| format!("Failed to create directory {}", parent.display()))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
    temp.write_all(contents)
        .with_context(|| format!("Failed to write temporary file for {}", path.display()))?;
    temp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to sync temporary file for {}", path.display()))?;
    temp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        name: String,
        #[serde(default)]
        price: Option<String>,
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter(b"name;price;url\na;b;c"), b';');
        assert_eq!(sniff_delimiter(b"name,price,url\n"), b',');
        assert_eq!(sniff_delimiter(b"name\tprice\n"), b'\t');
        assert_eq!(sniff_delimiter(b"name\n"), b',');
    }

    #[test]
    fn test_written_table_starts_with_bom() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let rows = vec![Row {
            name: "Şemsiye".to_string(),
            price: Some("10.00".to_string()),
        }];

        write_table(&path, &["name", "price"], &rows, CsvOptions { delimiter: b';' }).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        assert_eq!(&bytes[3..], "name;price\nŞemsiye;10.00\n".as_bytes());
    }

    #[test]
    fn test_empty_table_has_header_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/empty.csv");

        write_table::<Row>(&path, &["name", "price"], &[], CsvOptions::default()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim_start_matches('\u{feff}'), "name,price\n");
        assert!(read_table::<Row>(&path).unwrap().is_empty());
    }

    #[test]
    fn test_missing_table_reads_empty() {
        let dir = tempdir().unwrap();
        let rows: Vec<Row> = read_table(&dir.path().join("absent.csv")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_reader_tolerates_missing_optional_column() {
        let rows: Vec<Row> = parse_table("\u{feff}name\nÇanta\n".as_bytes()).unwrap();
        assert_eq!(
            rows,
            vec![Row {
                name: "Çanta".to_string(),
                price: None
            }]
        );
    }

    #[test]
    fn test_replace_file_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        replace_file(&path, b"first").unwrap();
        replace_file(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }
}
