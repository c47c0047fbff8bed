//! Delimited-text reader.
//!
//! Reading is two-staged: a strict pass that gives up on the first malformed
//! row, then a lenient pass over the same text that skips malformed rows and
//! reports them. Blank lines are ignored in both passes.

use regex::Regex;
use serde_json::Value;

use super::delimiter::Delimiter;
use crate::api::logs::{log_info, log_warning};
use crate::error::{ReadError, ReadResult, RowParseError};
use crate::models::{Record, Table};

/// Quote character used when none is configured.
pub const DEFAULT_QUOTE: char = '"';

/// How malformed rows are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// The first malformed row fails the read.
    Strict,
    /// Malformed rows are dropped and reported.
    Lenient,
}

/// Why a pass stopped.
#[derive(Debug)]
enum Failure {
    /// Unrecoverable, no retry.
    Fatal(ReadError),
    /// A malformed row during a strict pass.
    Malformed(RowParseError),
}

impl From<ReadError> for Failure {
    fn from(err: ReadError) -> Self {
        Failure::Fatal(err)
    }
}

/// Parse decoded text into a [`Table`]: strict first, lenient on failure.
pub fn read_text(content: &str, delimiter: &Delimiter, quote: char) -> ReadResult<Table> {
    match read_with_mode(content, delimiter, quote, ReadMode::Strict) {
        Ok(table) => Ok(table),
        Err(Failure::Fatal(err)) => Err(err),
        Err(Failure::Malformed(row)) => {
            log_warning(format!("Strict read failed ({}), retrying leniently", row));
            match read_with_mode(content, delimiter, quote, ReadMode::Lenient) {
                Ok(table) => {
                    log_info(format!("Skipped {} malformed row(s)", table.skipped.len()));
                    Ok(table)
                }
                Err(Failure::Fatal(err)) => Err(err),
                Err(Failure::Malformed(row)) => Err(ReadError::Csv(row.to_string())),
            }
        }
    }
}

/// Parse decoded text with a fixed [`ReadMode`].
fn read_with_mode(
    content: &str,
    delimiter: &Delimiter,
    quote: char,
    mode: ReadMode,
) -> Result<Table, Failure> {
    ascii_byte(quote)?;
    if content.trim().is_empty() {
        return Err(ReadError::Empty.into());
    }

    match delimiter {
        Delimiter::Single(c) => read_delimited(content, *c, quote, mode),
        Delimiter::Pattern(re) => read_pattern(content, re, quote, mode),
    }
}

/// Single-character separator, full CSV quoting.
///
/// The raw text of every record is checked with [`check_quotes`] before it is
/// accepted. A record with a bad quote is reported at its first line and the
/// reader restarts on the next physical line, so an unterminated quote never
/// absorbs the rows that follow it.
fn read_delimited(content: &str, delimiter: char, quote: char, mode: ReadMode) -> Result<Table, Failure> {
    let delimiter = ascii_byte(delimiter)?;
    let quote = ascii_byte(quote)?;

    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(delimiter)
        .quote(quote)
        .has_headers(false)
        .flexible(true);

    let bytes = content.as_bytes();
    let mut headers: Option<Vec<String>> = None;
    let mut records = Vec::new();
    let mut skipped = Vec::new();

    // Where the current reader starts.
    let mut offset = 0;
    let mut first_line = 1;

    'restart: while offset < bytes.len() {
        let mut reader = builder.from_reader(&bytes[offset..]);
        let mut record = csv::StringRecord::new();

        loop {
            match reader.read_record(&mut record) {
                Ok(false) => break 'restart,
                Ok(true) => {
                    let position = record.position().cloned().unwrap_or_else(csv::Position::new);
                    let (start, line) = skip_line_breaks(
                        bytes,
                        offset + position.byte() as usize,
                        first_line + position.line().saturating_sub(1),
                    );
                    let end = offset + reader.position().byte() as usize;

                    if let Err(reason) = check_quotes(&bytes[start..end.max(start)], delimiter, quote) {
                        let row = RowParseError::new(line, reason);
                        if headers.is_none() {
                            return Err(ReadError::Csv(row.to_string()).into());
                        }
                        reject(row, mode, &mut skipped)?;
                        offset = next_line(bytes, start);
                        first_line = line + 1;
                        continue 'restart;
                    }

                    let fields: Vec<&str> = record.iter().collect();
                    if headers.is_none() {
                        headers = Some(normalize_headers(fields.iter().map(|f| f.to_string()).collect())?);
                        continue;
                    }
                    if let Some(headers) = &headers {
                        if let Some(row) = build_row(headers, &fields, line, mode, &mut skipped)? {
                            records.push(row);
                        }
                    }
                }
                Err(e) => {
                    let line = e
                        .position()
                        .map(|p| first_line + p.line().saturating_sub(1))
                        .unwrap_or(first_line);
                    reject(RowParseError::new(line, e.to_string()), mode, &mut skipped)?;
                }
            }
        }
    }

    let headers = headers.ok_or(ReadError::Empty)?;
    Ok(Table {
        headers,
        records,
        skipped,
    })
}

/// Check the raw text of one record: a quote may only open a field, doubled
/// quotes are escapes, and a quoted field must be closed before the next
/// delimiter or the end of the record.
fn check_quotes(raw: &[u8], delimiter: u8, quote: u8) -> Result<(), String> {
    #[derive(Clone, Copy)]
    enum State {
        FieldStart,
        Unquoted,
        Quoted,
        Closed,
        Trailing,
    }

    let mut state = State::FieldStart;
    let mut field = 1;

    for &byte in raw {
        state = match state {
            State::Quoted if byte == quote => State::Closed,
            State::Quoted => State::Quoted,
            State::Closed if byte == quote => State::Quoted,
            _ if byte == delimiter => {
                field += 1;
                State::FieldStart
            }
            State::FieldStart if byte == quote => State::Quoted,
            State::Unquoted if byte == quote => {
                return Err(format!("unescaped quote in field {}", field));
            }
            State::Closed | State::Trailing if byte.is_ascii_whitespace() => State::Trailing,
            State::Closed | State::Trailing => {
                return Err(format!("unexpected text after closing quote in field {}", field));
            }
            State::FieldStart | State::Unquoted => State::Unquoted,
        };
    }

    match state {
        State::Quoted => Err(format!("unterminated quote in field {}", field)),
        _ => Ok(()),
    }
}

/// Move `start` past line breaks, counting the lines skipped.
fn skip_line_breaks(bytes: &[u8], mut start: usize, mut line: u64) -> (usize, u64) {
    while let Some(&byte) = bytes.get(start) {
        match byte {
            b'\n' => line += 1,
            b'\r' => {}
            _ => break,
        }
        start += 1;
    }
    (start, line)
}

/// Offset of the line after the one containing `start`.
fn next_line(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |i| start + i + 1)
}

/// Separator given as a regex; one physical line per row.
fn read_pattern(content: &str, pattern: &Regex, quote: char, mode: ReadMode) -> Result<Table, Failure> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, line)| (i as u64 + 1, line))
        .filter(|(_, line)| !line.trim().is_empty());

    let (header_line, header) = lines.next().ok_or(ReadError::Empty)?;
    let headers = split_fields(header, pattern, quote)
        .map_err(|reason| ReadError::Csv(RowParseError::new(header_line, reason).to_string()))?;
    let headers = normalize_headers(headers)?;

    let mut table = Table {
        headers,
        ..Table::default()
    };

    for (line, text) in lines {
        match split_fields(text, pattern, quote) {
            Ok(fields) => {
                let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
                if let Some(row) = build_row(&table.headers, &fields, line, mode, &mut table.skipped)? {
                    table.records.push(row);
                }
            }
            Err(reason) => reject(RowParseError::new(line, reason), mode, &mut table.skipped)?,
        }
    }

    Ok(table)
}

/// Split one line on `pattern` and unwrap quoted fields.
fn split_fields(line: &str, pattern: &Regex, quote: char) -> Result<Vec<String>, String> {
    pattern
        .split(line)
        .map(|field| unquote(field.trim(), quote))
        .collect()
}

/// `"a ""b"""` -> `a "b"`. A stray quote anywhere else is an error.
fn unquote(field: &str, quote: char) -> Result<String, String> {
    let doubled = format!("{0}{0}", quote);
    let quoted = field.len() >= 2 && field.starts_with(quote) && field.ends_with(quote);

    let inner = if quoted {
        &field[quote.len_utf8()..field.len() - quote.len_utf8()]
    } else {
        field
    };

    let unescaped = inner.replace(&doubled, "");
    if unescaped.contains(quote) {
        return Err(format!("unescaped quote in field '{}'", field));
    }

    Ok(if quoted {
        inner.replace(&doubled, &quote.to_string())
    } else {
        inner.to_string()
    })
}

/// Turn a parsed row into a record, or reject it when its width is wrong.
fn build_row(
    headers: &[String],
    fields: &[&str],
    line: u64,
    mode: ReadMode,
    skipped: &mut Vec<RowParseError>,
) -> Result<Option<Record>, Failure> {
    if fields.iter().all(|f| f.trim().is_empty()) {
        return Ok(None);
    }

    if fields.len() != headers.len() {
        let reason = format!("expected {} fields, found {}", headers.len(), fields.len());
        reject(RowParseError::new(line, reason), mode, skipped)?;
        return Ok(None);
    }

    let record = headers
        .iter()
        .zip(fields)
        .map(|(header, raw)| (header.clone(), cell(raw)))
        .collect();

    Ok(Some(record))
}

/// Record a malformed row: fatal in strict mode, reported in lenient mode.
fn reject(row: RowParseError, mode: ReadMode, skipped: &mut Vec<RowParseError>) -> Result<(), Failure> {
    match mode {
        ReadMode::Strict => Err(Failure::Malformed(row)),
        ReadMode::Lenient => {
            skipped.push(row);
            Ok(())
        }
    }
}

fn cell(raw: &str) -> Value {
    let value = raw.trim();
    if value.is_empty() {
        Value::Null
    } else {
        Value::String(value.to_string())
    }
}

/// Trim header names, name blank ones `Unnamed: <index>`, and suffix
/// duplicates with `.1`, `.2`, ...
pub fn normalize_headers(raw: Vec<String>) -> ReadResult<Vec<String>> {
    if raw.iter().all(|h| h.trim().is_empty()) {
        return Err(ReadError::NoHeaders);
    }

    let mut headers: Vec<String> = Vec::with_capacity(raw.len());
    for (index, header) in raw.iter().enumerate() {
        let base = match header.trim() {
            "" => format!("Unnamed: {}", index),
            name => name.to_string(),
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while headers.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        headers.push(name);
    }

    Ok(headers)
}

fn ascii_byte(c: char) -> ReadResult<u8> {
    u8::try_from(c)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| ReadError::Csv(format!("'{}' is not a single-byte character", c)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comma() -> Delimiter {
        Delimiter::Single(',')
    }

    #[test]
    fn test_simple_csv() {
        let table = read_text("name;age\nAlice;30\nBob;25", &Delimiter::Single(';'), '"').unwrap();

        assert_eq!(table.headers, vec!["name", "age"]);
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0]["name"], "Alice");
        assert_eq!(table.records[1]["age"], "25");
        assert!(table.skipped.is_empty());
    }

    #[test]
    fn test_quoted_values_keep_delimiter() {
        let csv = "numeroProcesso,nomeTarefa\n\"1-2019.8\",\"Analisar, urgente\"";
        let table = read_text(csv, &comma(), '"').unwrap();
        assert_eq!(table.records[0]["nomeTarefa"], "Analisar, urgente");
    }

    #[test]
    fn test_custom_quote_char() {
        let csv = "a;b\n'x;y';z";
        let table = read_text(csv, &Delimiter::Single(';'), '\'').unwrap();
        assert_eq!(table.records[0]["a"], "x;y");
    }

    #[test]
    fn test_empty_values_are_null() {
        let table = read_text("a,b,c\n1,,3", &comma(), '"').unwrap();
        assert_eq!(table.records[0]["b"], Value::Null);
        assert_eq!(table.records[0]["c"], "3");
    }

    #[test]
    fn test_blank_lines_skipped() {
        let table = read_text("a,b\n1,2\n\n3,4\n", &comma(), '"').unwrap();
        assert_eq!(table.records.len(), 2);
        assert!(table.skipped.is_empty());
    }

    #[test]
    fn test_malformed_rows_skipped_individually() {
        let csv = "a,b\n1,2\n1,2,3\n4,5\n6\n7,8";
        let table = read_text(csv, &comma(), '"').unwrap();

        assert_eq!(table.records.len(), 3);
        assert_eq!(table.skipped.len(), 2);
        assert_eq!(table.skipped[0].line, 3);
        assert_eq!(table.skipped[1].line, 5);
    }

    #[test]
    fn test_strict_mode_stops_on_first_bad_row() {
        let result = read_with_mode("a,b\n1,2\n1,2,3", &comma(), '"', ReadMode::Strict);
        assert!(matches!(result, Err(Failure::Malformed(ref row)) if row.line == 3));
    }

    #[test]
    fn test_empty_input() {
        let err = read_text("", &comma(), '"').unwrap_err();
        assert!(matches!(err, ReadError::Empty));

        let err = read_text(" \n\n", &comma(), '"').unwrap_err();
        assert!(matches!(err, ReadError::Empty));
    }

    #[test]
    fn test_header_only() {
        let table = read_text("numeroProcesso,nomeTarefa\n", &comma(), '"').unwrap();
        assert_eq!(table.headers.len(), 2);
        assert!(table.records.is_empty());
    }

    #[test]
    fn test_headers_normalized() {
        let headers = normalize_headers(vec![" a ".into(), "".into(), "a".into(), "a".into()]).unwrap();
        assert_eq!(headers, vec!["a", "Unnamed: 1", "a.1", "a.2"]);
        assert!(matches!(normalize_headers(vec!["".into()]), Err(ReadError::NoHeaders)));
    }

    #[test]
    fn test_pattern_delimiter_mixed_rows() {
        let delimiter = Delimiter::from_candidates(",;").unwrap();
        let csv = "numeroProcesso;nomeTarefa\n1-2019.8,Triagem\n2-2020.8;\"Decisão; urgente\"";
        let table = read_text(csv, &delimiter, '"').unwrap();

        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0]["nomeTarefa"], "Triagem");
        // The quoted field is split by the pattern, so its row is malformed.
        assert_eq!(table.skipped.len(), 1);
    }

    #[test]
    fn test_pattern_unquotes_fields() {
        let delimiter = Delimiter::from_candidates("|\\t").unwrap();
        let csv = "a\tb\n\"x \"\"y\"\"\"|z";
        let table = read_text(csv, &delimiter, '"').unwrap();
        assert_eq!(table.records[0]["a"], "x \"y\"");
        assert_eq!(table.records[0]["b"], "z");
    }

    #[test]
    fn test_pattern_unescaped_quote_skipped() {
        let delimiter = Delimiter::from_candidates(",;").unwrap();
        let csv = "a,b\nx\"y,z\n1;2";
        let table = read_text(csv, &delimiter, '"').unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.skipped[0].line, 2);
        assert!(table.skipped[0].reason.contains("unescaped quote"));
    }

    #[test]
    fn test_n_good_m_bad_rows() {
        let mut csv = String::from("numeroProcesso,nomeTarefa\n");
        for i in 0..50 {
            csv.push_str(&format!("{}-2019.8.26,Triagem\n", i));
            if i % 5 == 0 {
                csv.push_str("broken,row,with,extra\n");
            }
            if i % 7 == 0 {
                csv.push_str("9-2019.8.26,\"Decisão sem fim\n");
            }
        }
        let table = read_text(&csv, &comma(), '"').unwrap();
        assert_eq!(table.records.len(), 50);
        assert_eq!(table.skipped.len(), 18);
    }

    #[test]
    fn test_unterminated_quote_keeps_following_rows() {
        let csv = "numeroProcesso,nomeTarefa\n1-2019.8,\"Triagem\n2-2019.8,A\n3-2019.8,B\n";
        let table = read_text(csv, &comma(), '"').unwrap();

        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0]["numeroProcesso"], "2-2019.8");
        assert_eq!(table.records[1]["nomeTarefa"], "B");
        assert_eq!(table.skipped.len(), 1);
        assert_eq!(table.skipped[0].line, 2);
        assert!(table.skipped[0].reason.contains("unterminated quote"));
    }

    #[test]
    fn test_quoted_line_break_is_one_field() {
        let table = read_text("a,b\n\"x\ny\",1\n2,3\n", &comma(), '"').unwrap();
        assert_eq!(table.records.len(), 2);
        assert_eq!(table.records[0]["a"], "x\ny");
        assert_eq!(table.records[1]["a"], "2");
        assert!(table.skipped.is_empty());
    }

    #[test]
    fn test_stray_quote_skipped() {
        let table = read_text("a,b\nx\"y,z\n1,2", &comma(), '"').unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0]["a"], "1");
        assert_eq!(table.skipped[0].line, 2);
        assert!(table.skipped[0].reason.contains("unescaped quote"));

        let table = read_text("a,b\n\"x\"y,z\n1,2", &comma(), '"').unwrap();
        assert_eq!(table.records.len(), 1);
        assert!(table.skipped[0].reason.contains("after closing quote"));
    }

    #[test]
    fn test_quoted_header_error_is_fatal() {
        let err = read_text("\"a,b\n1,2", &comma(), '"').unwrap_err();
        assert!(matches!(err, ReadError::Csv(_)));
    }

    #[test]
    fn test_non_ascii_quote_rejected() {
        let delimiter = Delimiter::from_candidates(",;").unwrap();
        let err = read_text("a,b\nç,x", &delimiter, 'ç').unwrap_err();
        assert!(matches!(err, ReadError::Csv(_)));

        let err = read_text("a,b\nç,x", &comma(), 'ç').unwrap_err();
        assert!(matches!(err, ReadError::Csv(_)));
    }
}
