use chardetng::EncodingDetector;
use encoding_rs::Encoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSnapshot {
    pub html: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode snapshot as {encoding}")]
    Malformed { encoding: String },
}

/// Decode saved page bytes into UTF-8: BOM, then `<meta charset>` sniff,
/// then chardetng guess. Snapshots carry no transport headers, so the meta
/// declaration is the only authoritative label.
pub fn decode_snapshot(bytes: &[u8]) -> Result<DecodedSnapshot, DecodeError> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = sniff_meta_charset(bytes) {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, encoding);
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

/// Scan the document head for a `charset=` declaration. Conforming pages
/// declare it within the first kilobytes, so the scan is capped.
fn sniff_meta_charset(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(2048)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    let idx = head.find("charset=")?;
    let rest = head[idx + "charset=".len()..].trim_start_matches(['"', '\'']);
    let end = rest
        .find(|c: char| matches!(c, '"' | '\'' | '>' | '/' | ';') || c.is_whitespace())
        .unwrap_or(rest.len());
    let label = rest[..end].trim();
    (!label.is_empty()).then(|| label.to_string())
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> Result<DecodedSnapshot, DecodeError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(DecodeError::Malformed {
            encoding: encoding.name().to_string(),
        });
    }
    Ok(DecodedSnapshot {
        html: text.into_owned(),
        encoding_label: encoding.name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{decode_snapshot, sniff_meta_charset};

    #[test]
    fn utf8_bom_wins() {
        let bytes = b"\xEF\xBB\xBF<html>hello</html>";
        let decoded = decode_snapshot(bytes).unwrap();
        assert_eq!(decoded.encoding_label, "UTF-8");
        assert_eq!(decoded.html, "<html>hello</html>");
    }

    #[test]
    fn meta_charset_is_sniffed() {
        let bytes = b"<html><head><meta charset=\"windows-1252\"></head><body>caf\xe9</body></html>";
        let decoded = decode_snapshot(bytes).unwrap();
        assert_eq!(decoded.encoding_label, "windows-1252");
        assert!(decoded.html.contains("caf\u{e9}"));
    }

    #[test]
    fn sniff_handles_http_equiv_form() {
        let head = b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=iso-8859-1\">";
        assert_eq!(sniff_meta_charset(head).as_deref(), Some("iso-8859-1"));
    }

    #[test]
    fn plain_utf8_survives_detection() {
        let bytes = "<html><body>\u{3053}\u{3093}\u{306b}\u{3061}\u{306f}</body></html>".as_bytes();
        let decoded = decode_snapshot(bytes).unwrap();
        assert!(decoded.html.contains("\u{3053}\u{3093}\u{306b}\u{3061}\u{306f}"));
    }
}
