//! Delimiter inference.
//!
//! Either sniffed from a decoded sample of the file, or built from a set of
//! user-supplied candidate characters. A set with several characters becomes a
//! regex alternation so rows may mix separators.

use regex::Regex;
use std::fmt;

use super::encoding::{decode_sample, SAMPLE_SIZE};
use crate::error::OptionsError;

/// Separators tried by the heuristic sniffer, in tie-break order.
pub const CANDIDATES: [char; 4] = [',', ';', '\t', '|'];

/// Returned when nothing better can be inferred.
pub const DEFAULT_DELIMITER: char = ',';

/// Token standing for a tab in a candidate set.
const TAB_ESCAPE: &str = "\\t";

/// Field separator used by the reader.
#[derive(Debug, Clone)]
pub enum Delimiter {
    /// One ASCII separator; parsed with full CSV quoting rules.
    Single(char),
    /// Any of several separators, matched per field boundary.
    Pattern(Regex),
}

impl Delimiter {
    /// Build a delimiter from a candidate set such as `",;\t"`.
    pub fn from_candidates(set: &str) -> Result<Self, OptionsError> {
        let chars = parse_candidates(set);
        if chars.is_empty() {
            return Err(OptionsError::EmptyDelimiterSet);
        }
        if let Some(&c) = chars.iter().find(|c| matches!(c, '\n' | '\r')) {
            return Err(OptionsError::InvalidDelimiter(c));
        }

        match chars.as_slice() {
            [c] if c.is_ascii() => Ok(Delimiter::Single(*c)),
            _ => {
                let alternation = chars
                    .iter()
                    .map(|c| regex::escape(&c.to_string()))
                    .collect::<Vec<_>>()
                    .join("|");
                // Escaped literals always form a valid pattern.
                Regex::new(&format!("(?:{})", alternation))
                    .map(Delimiter::Pattern)
                    .map_err(|_| OptionsError::EmptyDelimiterSet)
            }
        }
    }
}

impl PartialEq for Delimiter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Delimiter::Single(a), Delimiter::Single(b)) => a == b,
            (Delimiter::Pattern(a), Delimiter::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Single('\t') => write!(f, "TAB"),
            Delimiter::Single(c) => write!(f, "{}", c),
            Delimiter::Pattern(re) => write!(f, "{}", re.as_str().replace('\t', TAB_ESCAPE)),
        }
    }
}

/// Split a candidate set into distinct characters, honoring the `\t` token.
pub fn parse_candidates(set: &str) -> Vec<char> {
    let mut chars = Vec::new();
    let mut rest = set;

    while let Some(c) = rest.chars().next() {
        let (candidate, len) = if rest.starts_with(TAB_ESCAPE) {
            ('\t', TAB_ESCAPE.len())
        } else {
            (c, c.len_utf8())
        };
        if !chars.contains(&candidate) {
            chars.push(candidate);
        }
        rest = &rest[len..];
    }

    chars
}

/// Pick the most plausible separator from a text sample.
///
/// Candidates present on the first line with the same count on every line
/// win over inconsistent ones; then the higher count wins; then
/// [`CANDIDATES`] order.
pub fn detect_delimiter(content: &str) -> char {
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return DEFAULT_DELIMITER;
    }

    let mut best: Option<(bool, usize, char)> = None;

    for &sep in &CANDIDATES {
        let counts: Vec<usize> = lines.iter().map(|l| l.matches(sep).count()).collect();
        let header_count = counts[0];
        if header_count == 0 {
            continue;
        }
        let consistent = counts.iter().all(|&c| c == header_count);

        let better = match best {
            None => true,
            Some((best_consistent, best_count, _)) => {
                (consistent, header_count) > (best_consistent, best_count)
            }
        };
        if better {
            best = Some((consistent, header_count, sep));
        }
    }

    best.map(|(_, _, sep)| sep).unwrap_or(DEFAULT_DELIMITER)
}

/// Choose the delimiter for a text file.
///
/// With `candidates`, the user's set is used as given. Otherwise the first
/// [`SAMPLE_SIZE`] bytes are decoded in `encoding` and sniffed; an undecodable
/// sample yields [`DEFAULT_DELIMITER`].
pub fn sniff(
    bytes: &[u8],
    encoding: &str,
    candidates: Option<&str>,
) -> Result<Delimiter, OptionsError> {
    if let Some(set) = candidates {
        return Delimiter::from_candidates(set);
    }

    let Some(mut sample) = decode_sample(bytes, encoding) else {
        return Ok(Delimiter::Single(DEFAULT_DELIMITER));
    };

    // Drop the trailing partial line of a truncated sample.
    if bytes.len() > SAMPLE_SIZE {
        if let Some(last_newline) = sample.rfind('\n') {
            sample.truncate(last_newline);
        }
    }

    Ok(Delimiter::Single(detect_delimiter(&sample)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_delimiter_semicolon() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
    }

    #[test]
    fn test_detect_delimiter_comma() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
    }

    #[test]
    fn test_detect_delimiter_tab() {
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
    }

    #[test]
    fn test_detect_delimiter_pipe() {
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
    }

    #[test]
    fn test_consistent_candidate_beats_frequent_one() {
        // Commas appear inside values on some rows only.
        let content = "numeroProcesso;nomeTarefa\n1-2019.8;Analisar, urgente, hoje\n2-2020.8;Triagem";
        assert_eq!(detect_delimiter(content), ';');
    }

    #[test]
    fn test_no_candidate_defaults_to_comma() {
        assert_eq!(detect_delimiter("single\ncolumn"), ',');
        assert_eq!(detect_delimiter(""), ',');
    }

    #[test]
    fn test_parse_candidates_tab_escape() {
        assert_eq!(parse_candidates(",;\\t"), vec![',', ';', '\t']);
        assert_eq!(parse_candidates(";;"), vec![';']);
        assert_eq!(parse_candidates("\\"), vec!['\\']);
    }

    #[test]
    fn test_single_candidate_is_single_delimiter() {
        assert_eq!(Delimiter::from_candidates(";").unwrap(), Delimiter::Single(';'));
        assert_eq!(Delimiter::from_candidates("\\t").unwrap(), Delimiter::Single('\t'));
    }

    #[test]
    fn test_multiple_candidates_build_pattern() {
        let delimiter = Delimiter::from_candidates(",;|").unwrap();
        let Delimiter::Pattern(re) = delimiter else {
            panic!("expected a pattern");
        };
        let fields: Vec<&str> = re.split("a,b;c|d").collect();
        assert_eq!(fields, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_invalid_candidate_sets() {
        assert_eq!(
            Delimiter::from_candidates("").unwrap_err(),
            OptionsError::EmptyDelimiterSet
        );
        assert_eq!(
            Delimiter::from_candidates(",\n").unwrap_err(),
            OptionsError::InvalidDelimiter('\n')
        );
    }

    #[test]
    fn test_sniff_uses_candidates_when_given() {
        let delimiter = sniff(b"a,b\n1,2", "utf-8", Some("|")).unwrap();
        assert_eq!(delimiter, Delimiter::Single('|'));
    }

    #[test]
    fn test_sniff_undecodable_sample_defaults_to_comma() {
        let delimiter = sniff(b"a;b\n\xFF;\xFE", "utf-8", None).unwrap();
        assert_eq!(delimiter, Delimiter::Single(','));
    }

    #[test]
    fn test_sniff_ignores_partial_last_line() {
        let mut content = String::from("a;b\n");
        while content.len() < SAMPLE_SIZE - 6 {
            content.push_str("1;2\n");
        }
        // The line cut by the sample edge carries commas only.
        content.push_str("x,y,z,w,v\n");
        let delimiter = sniff(content.as_bytes(), "utf-8", None).unwrap();
        assert_eq!(delimiter, Delimiter::Single(';'));
    }

    #[test]
    fn test_display() {
        assert_eq!(Delimiter::Single('\t').to_string(), "TAB");
        assert_eq!(Delimiter::from_candidates(",\\t").unwrap().to_string(), "(?:,|\\t)");
    }
}
