//! CSV Input Tables
//!
//! Line-oriented CSV reading with a small hand-rolled state machine; no
//! external parser crate. Fields may be quoted, quotes may be doubled or
//! escaped with the escape character, and a field never spans lines.
//!
//! Null normalisation happens here: an unquoted empty field and any field
//! equal to the configured null string become [`Field::Null`]; a quoted
//! empty field stays an empty string.
//!
//! ## Options
//!
//! - `field_separator`, `quote_char`, `escape_char`
//! - `null_string`: textual null marker, compared after unquoting
//! - `has_header`: first non-blank line supplies the column names
//! - `ignore_leading_white_space`: trim leading whitespace of unquoted fields
//! - `use_strict_quotes`: discard characters outside of quotes
//! - `drop_differing_lines`: silently skip rows whose field count differs
//!   from the header's

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::error::{DiscoveryError, Result};
use crate::input::{Field, InputTable, Row, RowStream};

/// Options for CSV parsing.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub field_separator: char,
    pub quote_char: char,
    pub escape_char: char,
    pub null_string: Option<String>,
    pub has_header: bool,
    pub ignore_leading_white_space: bool,
    pub use_strict_quotes: bool,
    pub drop_differing_lines: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            field_separator: ',',
            quote_char: '"',
            escape_char: '\\',
            null_string: None,
            has_header: true,
            ignore_leading_white_space: true,
            use_strict_quotes: false,
            drop_differing_lines: false,
        }
    }
}

/// A CSV file exposed as a restartable input table.
///
/// The schema is fixed at open time from the header row (or the width of
/// the first data row); every `rows()` call re-opens the file.
#[derive(Debug, Clone)]
pub struct CsvTable {
    path: PathBuf,
    name: String,
    columns: Vec<String>,
    options: CsvOptions,
}

impl CsvTable {
    /// Open a CSV file and fix its schema.
    ///
    /// The relation name is the file stem. With `has_header` the first
    /// non-blank line supplies column names; otherwise columns are named
    /// `col0..colN` after the first data row's width.
    pub fn open(path: impl AsRef<Path>, options: CsvOptions) -> Result<CsvTable> {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "table".to_string());

        let mut columns = Vec::new();
        for line in open_lines(&path)? {
            let line = line.map_err(|e| io_error(&path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = parse_line(&line, &options);
            columns = fields
                .iter()
                .enumerate()
                .map(|(i, field)| match (&options.has_header, field) {
                    (true, Field::Text(s)) => s.clone(),
                    _ => format!("col{i}"),
                })
                .collect();
            break;
        }
        Ok(CsvTable {
            path,
            name,
            columns,
            options,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InputTable for CsvTable {
    fn relation_name(&self) -> &str {
        &self.name
    }

    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn rows(&self) -> Result<RowStream<'_>> {
        Ok(Box::new(CsvRows {
            lines: open_lines(&self.path)?,
            path: self.path.clone(),
            options: self.options.clone(),
            schema_len: self.columns.len(),
            header_pending: self.options.has_header,
        }))
    }
}

struct CsvRows {
    lines: Lines<BufReader<File>>,
    path: PathBuf,
    options: CsvOptions,
    schema_len: usize,
    header_pending: bool,
}

impl Iterator for CsvRows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(io_error(&self.path, e))),
            };
            if line.trim().is_empty() {
                continue;
            }
            if self.header_pending {
                self.header_pending = false;
                continue;
            }
            let row = parse_line(&line, &self.options);
            if self.options.drop_differing_lines && row.len() != self.schema_len {
                tracing::debug!(
                    path = %self.path.display(),
                    expected = self.schema_len,
                    got = row.len(),
                    "dropping row with differing arity"
                );
                continue;
            }
            return Some(Ok(row));
        }
    }
}

fn open_lines(path: &Path) -> Result<Lines<BufReader<File>>> {
    let file = File::open(path).map_err(|e| io_error(path, e))?;
    Ok(BufReader::new(file).lines())
}

fn io_error(path: &Path, source: std::io::Error) -> DiscoveryError {
    DiscoveryError::InputIo {
        path: path.to_path_buf(),
        source,
    }
}

/// Parse one line into fields.
fn parse_line(line: &str, options: &CsvOptions) -> Vec<Field> {
    let chars: Vec<char> = line.chars().collect();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut was_quoted = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_quotes {
            if c == options.escape_char
                && i + 1 < chars.len()
                && (chars[i + 1] == options.quote_char || chars[i + 1] == options.escape_char)
            {
                field.push(chars[i + 1]);
                i += 2;
            } else if c == options.quote_char {
                if i + 1 < chars.len() && chars[i + 1] == options.quote_char {
                    // doubled quote
                    field.push(c);
                    i += 2;
                } else {
                    in_quotes = false;
                    i += 1;
                }
            } else {
                field.push(c);
                i += 1;
            }
        } else if c == options.field_separator {
            fields.push(finish_field(field, was_quoted, options));
            field = String::new();
            was_quoted = false;
            i += 1;
        } else if c == options.quote_char {
            in_quotes = true;
            was_quoted = true;
            i += 1;
        } else if options.use_strict_quotes {
            // characters outside quotes are discarded
            i += 1;
        } else if c == options.escape_char && i + 1 < chars.len() {
            field.push(chars[i + 1]);
            i += 2;
        } else {
            field.push(c);
            i += 1;
        }
    }
    fields.push(finish_field(field, was_quoted, options));
    fields
}

fn finish_field(field: String, was_quoted: bool, options: &CsvOptions) -> Field {
    let text = if options.ignore_leading_white_space && !was_quoted {
        field.trim_start().to_string()
    } else {
        field
    };
    if let Some(null_string) = &options.null_string {
        if text == *null_string {
            return Field::Null;
        }
    }
    if text.is_empty() && !was_quoted {
        return Field::Null;
    }
    Field::Text(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn text(s: &str) -> Field {
        Field::Text(s.to_string())
    }

    fn parse(line: &str, options: &CsvOptions) -> Vec<Field> {
        parse_line(line, options)
    }

    #[test]
    fn splits_plain_fields() {
        let options = CsvOptions::default();
        assert_eq!(parse("a,b,c", &options), vec![text("a"), text("b"), text("c")]);
    }

    #[test]
    fn quoted_fields_keep_separators_and_doubled_quotes() {
        let options = CsvOptions::default();
        assert_eq!(
            parse(r#""a,b","say ""hi""""#, &options),
            vec![text("a,b"), text(r#"say "hi""#)]
        );
    }

    #[test]
    fn escape_char_escapes_quotes() {
        let options = CsvOptions::default();
        assert_eq!(parse(r#""a\"b""#, &options), vec![text(r#"a"b"#)]);
    }

    #[test]
    fn empty_and_null_string_fields_become_null() {
        let options = CsvOptions {
            null_string: Some("NULL".to_string()),
            ..CsvOptions::default()
        };
        assert_eq!(
            parse("a,,NULL,\"\"", &options),
            vec![text("a"), Field::Null, Field::Null, text("")]
        );
    }

    #[test]
    fn leading_whitespace_is_trimmed_unless_quoted() {
        let options = CsvOptions::default();
        assert_eq!(parse("  a,\" b\"", &options), vec![text("a"), text(" b")]);
        let keep = CsvOptions {
            ignore_leading_white_space: false,
            ..CsvOptions::default()
        };
        assert_eq!(parse("  a,b", &keep), vec![text("  a"), text("b")]);
    }

    #[test]
    fn strict_quotes_discard_unquoted_characters() {
        let options = CsvOptions {
            use_strict_quotes: true,
            ..CsvOptions::default()
        };
        assert_eq!(
            parse(r#"junk"a"junk,b"#, &options),
            vec![text("a"), Field::Null]
        );
    }

    #[test]
    fn custom_separator() {
        let options = CsvOptions {
            field_separator: ';',
            ..CsvOptions::default()
        };
        assert_eq!(parse("a;b,c", &options), vec![text("a"), text("b,c")]);
    }

    #[test]
    fn table_reads_header_and_restarts() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id,name").unwrap();
        writeln!(file, "1,ada").unwrap();
        writeln!(file, "2,grace").unwrap();
        let table = CsvTable::open(file.path(), CsvOptions::default()).unwrap();
        assert_eq!(table.column_names(), ["id", "name"]);

        for _ in 0..2 {
            let rows: Vec<Row> = table.rows().unwrap().map(|r| r.unwrap()).collect();
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0], vec![text("1"), text("ada")]);
        }
    }

    #[test]
    fn headerless_tables_synthesise_column_names() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1,ada").unwrap();
        let options = CsvOptions {
            has_header: false,
            ..CsvOptions::default()
        };
        let table = CsvTable::open(file.path(), options).unwrap();
        assert_eq!(table.column_names(), ["col0", "col1"]);
        assert_eq!(table.rows().unwrap().count(), 1);
    }

    #[test]
    fn differing_lines_are_dropped_when_configured() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();
        writeln!(file, "1,2").unwrap();
        writeln!(file, "1,2,3").unwrap();
        writeln!(file, "9").unwrap();
        let options = CsvOptions {
            drop_differing_lines: true,
            ..CsvOptions::default()
        };
        let table = CsvTable::open(file.path(), options).unwrap();
        let rows: Vec<Row> = table.rows().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(rows, vec![vec![text("1"), text("2")]]);
    }
}
