//! Encoding detection and decoding.
//!
//! Detection never fails: a byte-order mark wins, valid UTF-8 is UTF-8, then
//! chardet is asked, and anything inconclusive falls back to windows-1252.

use encoding_rs::{DecoderResult, Encoding, UTF_8, WINDOWS_1252};

use crate::api::logs::log_warning;
use crate::error::{ReadError, ReadResult};

/// Encoding used when detection is inconclusive or strict decoding fails.
pub const DEFAULT_ENCODING: &str = "windows-1252";

/// Number of bytes decoded for delimiter sniffing.
pub const SAMPLE_SIZE: usize = 1024;

/// Detect the encoding of raw bytes. Returns an encoding label.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return label(encoding);
    }

    if std::str::from_utf8(bytes).is_ok() {
        return label(UTF_8);
    }

    let (charset, confidence, _) = chardet::detect(bytes);
    let guess = Encoding::for_label(chardet::charset2encoding(&charset).as_bytes());

    match guess {
        // Not valid UTF-8, so a UTF-8 guess is wrong.
        Some(encoding) if encoding != UTF_8 && confidence > 0.0 => label(encoding),
        _ => DEFAULT_ENCODING.to_string(),
    }
}

/// Decode the whole buffer.
///
/// A BOM overrides `encoding`. Bytes malformed under the chosen encoding are
/// re-decoded as windows-1252 instead of failing; only an unknown label is an
/// error.
pub fn decode_content(bytes: &[u8], encoding: &str) -> ReadResult<String> {
    let requested = resolve(encoding)?;
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((bom_encoding, bom_len)) => (bom_encoding, &bytes[bom_len..]),
        None => (requested, bytes),
    };

    match encoding.decode_without_bom_handling_and_without_replacement(body) {
        Some(text) => Ok(text.into_owned()),
        None => {
            log_warning(format!(
                "Content is not valid {}, falling back to {}",
                encoding.name(),
                DEFAULT_ENCODING
            ));
            Ok(WINDOWS_1252.decode_without_bom_handling(body).0.into_owned())
        }
    }
}

/// Decode the first [`SAMPLE_SIZE`] bytes strictly.
///
/// A multi-byte sequence cut by the sample boundary is not an error.
/// Returns `None` when the sample is malformed under `encoding` or the label
/// is unknown.
pub fn decode_sample(bytes: &[u8], encoding: &str) -> Option<String> {
    let encoding = Encoding::for_label(encoding.trim().as_bytes())?;
    let end = bytes.len().min(SAMPLE_SIZE);
    let is_complete = end == bytes.len();

    let mut decoder = encoding.new_decoder_with_bom_removal();
    let capacity = decoder.max_utf8_buffer_length_without_replacement(end)?;
    let mut text = String::with_capacity(capacity);
    let (result, _) =
        decoder.decode_to_string_without_replacement(&bytes[..end], &mut text, is_complete);

    match result {
        DecoderResult::InputEmpty => Some(text),
        DecoderResult::Malformed(_, _) | DecoderResult::OutputFull => None,
    }
}

fn resolve(encoding: &str) -> ReadResult<&'static Encoding> {
    Encoding::for_label(encoding.trim().as_bytes())
        .ok_or_else(|| ReadError::Decode(format!("unknown encoding '{}'", encoding)))
}

fn label(encoding: &'static Encoding) -> String {
    encoding.name().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_is_utf8() {
        assert_eq!(detect_encoding(b"numeroProcesso,nomeTarefa\n"), "utf-8");
    }

    #[test]
    fn test_utf8_bom_detected() {
        let bytes = b"\xEF\xBB\xBFnumeroProcesso;nomeTarefa";
        assert_eq!(detect_encoding(bytes), "utf-8");
        let text = decode_content(bytes, "windows-1252").unwrap();
        assert!(text.starts_with("numeroProcesso"));
    }

    #[test]
    fn test_latin1_not_reported_as_utf8() {
        // "Distribuição;Citação" in ISO-8859-1
        let bytes: &[u8] = b"Distribui\xE7\xE3o;Cita\xE7\xE3o\nAn\xE1lise;Decis\xE3o\n";
        let encoding = detect_encoding(bytes);
        assert_ne!(encoding, "utf-8");
        let text = decode_content(bytes, &encoding).unwrap();
        assert!(text.contains("Distribui"));
    }

    #[test]
    fn test_latin1_decoding() {
        let bytes: &[u8] = &[0x41, 0x6E, 0xE1, 0x6C, 0x69, 0x73, 0x65];
        let decoded = decode_content(bytes, "iso-8859-1").unwrap();
        assert_eq!(decoded, "Análise");
    }

    #[test]
    fn test_malformed_utf8_falls_back() {
        let bytes: &[u8] = b"Decis\xE3o";
        let decoded = decode_content(bytes, "utf-8").unwrap();
        assert_eq!(decoded, "Decisão");
    }

    #[test]
    fn test_unknown_label_is_decode_error() {
        let err = decode_content(b"abc", "not-an-encoding").unwrap_err();
        assert!(matches!(err, ReadError::Decode(_)));
    }

    #[test]
    fn test_sample_cut_inside_multibyte_char() {
        let mut bytes = vec![b'a'; SAMPLE_SIZE - 1];
        bytes.extend_from_slice("ção".as_bytes());
        let sample = decode_sample(&bytes, "utf-8").unwrap();
        assert_eq!(sample.len(), SAMPLE_SIZE - 1);
    }

    #[test]
    fn test_sample_malformed_returns_none() {
        assert!(decode_sample(b"a,b\n\xFF\xFE\xFD", "utf-8").is_none());
    }
}
