use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use recdoc_logging::{engine_trace, engine_warn};

use crate::{FetchOutput, PageDocument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHtml {
    pub html: String,
    pub encoding_label: String,
}

/// Raised when nothing readable survives decoding in the chosen encoding.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("page is not valid {encoding}: {message}")]
    DecodeFailure { encoding: String, message: String },
}

pub fn decode_html(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedHtml, DecodeError> {
    let encoding = pick_encoding(bytes, content_type);
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        if !text.chars().any(|c| c != char::REPLACEMENT_CHARACTER && !c.is_whitespace()) {
            return Err(DecodeError::DecodeFailure {
                encoding: encoding.name().to_string(),
                message: "no readable text in the page".into(),
            });
        }
        engine_warn!(
            "page has bytes that are not valid {}; they were replaced",
            encoding.name()
        );
    }
    Ok(DecodedHtml {
        html: text.into_owned(),
        encoding_label: encoding.name().to_string(),
    })
}

/// Turns a fetch result into the page the extractor consumes.
pub fn decode_page(output: FetchOutput) -> Result<PageDocument, DecodeError> {
    let decoded = decode_html(&output.bytes, output.metadata.content_type.as_deref())?;
    Ok(PageDocument {
        requested_url: output.metadata.original_url,
        final_url: output.metadata.final_url,
        html: decoded.html,
        encoding_label: decoded.encoding_label,
    })
}

/// BOM first, then a recognised `charset=` label, then a guess from the bytes.
fn pick_encoding(bytes: &[u8], content_type: Option<&str>) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        engine_trace!("encoding from BOM: {}", encoding.name());
        return encoding;
    }
    let declared = content_type
        .and_then(charset_param)
        .and_then(|label| Encoding::for_label(label.as_bytes()));
    if let Some(encoding) = declared {
        return encoding;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim_matches([' ', '"', '\'']))
    })
}
