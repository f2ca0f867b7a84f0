use std::borrow::Cow;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{TranscriptError, TranscriptSegment};

/// Parses a timedtext caption document:
/// `<transcript><text start="0.5" dur="2.1">caption</text>...</transcript>`.
///
/// Caption text arrives escaped twice (`&amp;#39;`), so entities are decoded
/// a second time after the XML layer has done its own pass. Segments with no
/// text are dropped; an empty document yields no segments.
pub fn parse_timedtext(xml: &str) -> Result<Vec<TranscriptSegment>, TranscriptError> {
    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current: Option<(f64, f64, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) if element.name().as_ref() == b"text" => {
                let (start, duration) = timing(&element)?;
                current = Some((start, duration, String::new()));
            }
            Ok(Event::Text(text)) => {
                if let Some((_, _, buffer)) = current.as_mut() {
                    let decoded = text
                        .unescape()
                        .map_err(|err| TranscriptError::Parse(err.to_string()))?;
                    buffer.push_str(&decoded);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some((_, _, buffer)) = current.as_mut() {
                    buffer.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Ok(Event::End(element)) if element.name().as_ref() == b"text" => {
                if let Some((start, duration, raw)) = current.take() {
                    let text = normalize_caption(&raw);
                    if !text.is_empty() {
                        segments.push(TranscriptSegment {
                            start,
                            duration,
                            text,
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(TranscriptError::Parse(format!(
                    "invalid timedtext at byte {}: {err}",
                    reader.buffer_position()
                )))
            }
        }
    }

    Ok(segments)
}

fn timing(element: &BytesStart<'_>) -> Result<(f64, f64), TranscriptError> {
    let start = numeric_attribute(element, "start")?.unwrap_or(0.0);
    let duration = numeric_attribute(element, "dur")?.unwrap_or(0.0);
    Ok((start, duration))
}

fn numeric_attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<f64>, TranscriptError> {
    let Some(attribute) = element
        .try_get_attribute(name)
        .map_err(|err| TranscriptError::Parse(err.to_string()))?
    else {
        return Ok(None);
    };
    let value = attribute
        .unescape_value()
        .map_err(|err| TranscriptError::Parse(err.to_string()))?;
    value
        .trim()
        .parse::<f64>()
        .map(Some)
        .map_err(|_| TranscriptError::Parse(format!("attribute `{name}` is not a number: {value}")))
}

fn normalize_caption(raw: &str) -> String {
    let decoded: Cow<'_, str> = if raw.contains('&') {
        Cow::Owned(decode_entities(raw))
    } else {
        Cow::Borrowed(raw)
    };
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Longest entity worth looking at, `&#x10FFFF;` included.
const MAX_ENTITY_LEN: usize = 10;

/// Second decoding pass. Each `&name;` is resolved on its own; bare
/// ampersands and unknown or unterminated entities stay literal.
fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let entity_end = tail
            .char_indices()
            .take(MAX_ENTITY_LEN + 1)
            .skip(1)
            .find(|(_, ch)| *ch == ';' || *ch == '&' || ch.is_whitespace())
            .filter(|(_, ch)| *ch == ';')
            .map(|(idx, _)| idx + 1);
        match entity_end.and_then(|end| unescape(&tail[..end]).ok().map(|text| (end, text))) {
            Some((end, text)) => {
                out.push_str(&text);
                rest = &tail[end..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
