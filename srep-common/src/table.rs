//! Delimited-text tables
//!
//! Provides reading and writing of header-first delimited text, used for the
//! bundled reference tables (`,`) and for survey response exports (`;`).
//!
//! ## Format
//!
//! - First record is the header with column names
//! - Every cell is kept as text; nothing is type-inferred, so values like
//!   `007` keep their leading zeros
//! - Fields may be quoted; quoted fields may contain the delimiter, line
//!   breaks, and doubled quote characters
//! - A leading UTF-8 byte-order mark is ignored
//!
//! ## Example
//!
//! ```
//! use srep_common::table::{Table, TableOptions};
//!
//! let table = Table::parse("id;answer\n1;\"007\"\n", &TableOptions::semicolon()).unwrap();
//! assert_eq!(table.get(0, "answer"), Some("007"));
//! ```

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::{Error, Result};

/// Options for parsing and writing delimited text
#[derive(Debug, Clone)]
pub struct TableOptions {
    /// Field delimiter (default: ',')
    pub delimiter: char,
    /// Quote character (default: '"')
    pub quote_char: char,
    /// Trim whitespace around unquoted fields (default: true)
    pub trim_whitespace: bool,
    /// Fill rows shorter than the header with empty cells (default: false)
    pub pad_short_rows: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            delimiter: ',',
            quote_char: '"',
            trim_whitespace: true,
            pad_short_rows: false,
        }
    }
}

impl TableOptions {
    /// Semicolon-separated text with cells kept verbatim (response exports)
    ///
    /// Short rows are padded; rows with too many fields are still rejected.
    pub fn semicolon() -> Self {
        TableOptions {
            delimiter: ';',
            quote_char: '"',
            trim_whitespace: false,
            pad_short_rows: true,
        }
    }
}

/// Header plus rows of text cells
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table from headers and rows
    ///
    /// Rows must have exactly one cell per header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(Error::Parse {
                    line: i + 2,
                    message: format!("row has {} fields, expected {}", row.len(), headers.len()),
                });
            }
        }
        Ok(Self { headers, rows })
    }

    /// Parse delimited text
    pub fn parse(text: &str, options: &TableOptions) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut records = split_records(text, options)?.into_iter();

        let headers = match records.next() {
            Some((_, header)) => header,
            None => return Ok(Self::default()),
        };

        let mut rows = Vec::new();
        for (line, mut fields) in records {
            if options.pad_short_rows && fields.len() < headers.len() {
                fields.resize(headers.len(), String::new());
            }
            if fields.len() != headers.len() {
                return Err(Error::Parse {
                    line,
                    message: format!(
                        "row has {} fields, expected {}",
                        fields.len(),
                        headers.len()
                    ),
                });
            }
            rows.push(fields);
        }

        Ok(Self { headers, rows })
    }

    /// Read and parse a delimited text file
    pub fn read_file<P: AsRef<Path>>(path: P, options: &TableOptions) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::parse(&text, options)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows (header excluded)
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact header name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Required columns that are absent from the header, in the order given
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| self.column_index(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }

    /// Cell by row index and column name
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }

    /// All cells of one column, top to bottom
    pub fn column<'a>(&'a self, column: &str) -> Option<impl Iterator<Item = &'a str> + 'a> {
        let col = self.column_index(column)?;
        Some(self.rows.iter().map(move |r| r[col].as_str()))
    }

    /// Render as delimited text, one record per line
    pub fn to_delimited(&self, options: &TableOptions) -> String {
        let mut out = String::new();
        push_record(&mut out, &self.headers, options);
        for row in &self.rows {
            push_record(&mut out, row, options);
        }
        out
    }

    /// Write as delimited text
    pub fn write_to<W: Write>(&self, mut writer: W, options: &TableOptions) -> Result<()> {
        writer.write_all(self.to_delimited(options).as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

fn push_record(out: &mut String, fields: &[String], options: &TableOptions) {
    let line = fields
        .iter()
        .map(|f| escape_field(f, options))
        .collect::<Vec<_>>()
        .join(&options.delimiter.to_string());
    out.push_str(&line);
    out.push('\n');
}

/// Quote a field if it contains the delimiter, a quote, or a line break
fn escape_field(field: &str, options: &TableOptions) -> String {
    let quote = options.quote_char;
    if field.contains(options.delimiter)
        || field.contains(quote)
        || field.contains('\n')
        || field.contains('\r')
    {
        let doubled = format!("{quote}{quote}");
        format!("{quote}{}{quote}", field.replace(quote, &doubled))
    } else {
        field.to_string()
    }
}

/// Split text into records, each tagged with the line it starts on
fn split_records(text: &str, options: &TableOptions) -> Result<Vec<(usize, Vec<String>)>> {
    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut line = 1;
    let mut record_line = 1;

    let finish_field = |fields: &mut Vec<String>, field: &mut String, quoted: &mut bool| {
        let value = if options.trim_whitespace && !*quoted {
            field.trim().to_string()
        } else {
            std::mem::take(field)
        };
        field.clear();
        fields.push(value);
        *quoted = false;
    };

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == options.quote_char {
                if chars.peek() == Some(&options.quote_char) {
                    field.push(c);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                if c == '\n' {
                    line += 1;
                }
                field.push(c);
            }
            continue;
        }

        match c {
            c if c == options.quote_char && field.trim().is_empty() && !quoted => {
                field.clear();
                in_quotes = true;
                quoted = true;
            }
            c if c == options.delimiter => {
                finish_field(&mut fields, &mut field, &mut quoted);
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\r' | '\n' => {
                let blank = fields.is_empty() && !quoted && field.trim().is_empty();
                if !blank {
                    finish_field(&mut fields, &mut field, &mut quoted);
                    records.push((record_line, std::mem::take(&mut fields)));
                }
                field.clear();
                line += 1;
                record_line = line;
            }
            c => field.push(c),
        }
    }

    if in_quotes {
        return Err(Error::Parse {
            line: record_line,
            message: "unterminated quoted field".to_string(),
        });
    }

    if !fields.is_empty() || quoted || !field.trim().is_empty() {
        finish_field(&mut fields, &mut field, &mut quoted);
        records.push((record_line, fields));
    }

    Ok(records)
}
