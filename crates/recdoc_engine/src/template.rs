use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use recdoc_logging::{engine_debug, engine_trace};
use thiserror::Error;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::render::RenderedFields;

const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("cannot read template {}: {source}", path.display())]
    Unreadable { path: PathBuf, source: io::Error },
    #[error("template is not a valid document archive: {0}")]
    Archive(#[from] ZipError),
    #[error("template has no {0} part")]
    MissingPart(&'static str),
    #[error("malformed XML in {part}: {message}")]
    Xml { part: String, message: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// A DOCX template, validated on load and reusable across runs.
#[derive(Debug, Clone)]
pub struct Template {
    bytes: Bytes,
}

/// Output of [`Template::fill`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilledDocument {
    pub bytes: Bytes,
    /// Known placeholder names that occurred in the template.
    pub placeholders_found: BTreeSet<String>,
}

impl Template {
    pub fn open(path: &Path) -> Result<Self, TemplateError> {
        let bytes = fs::read(path).map_err(|source| TemplateError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self, TemplateError> {
        let bytes = bytes.into();
        let has_document = ZipArchive::new(Cursor::new(&bytes[..]))?
            .file_names()
            .any(|name| name == DOCUMENT_PART);
        if !has_document {
            return Err(TemplateError::MissingPart(DOCUMENT_PART));
        }
        Ok(Self { bytes })
    }

    /// Replaces every `{{name}}` that `fields` knows, in the body, headers and
    /// footers. Everything else in the package is copied through untouched.
    pub fn fill(&self, fields: &RenderedFields) -> Result<FilledDocument, TemplateError> {
        let mut archive = ZipArchive::new(Cursor::new(&self.bytes[..]))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut found = BTreeSet::new();

        for idx in 0..archive.len() {
            let name = archive.by_index_raw(idx)?.name().to_string();
            if !is_text_part(&name) {
                let entry = archive.by_index_raw(idx)?;
                writer.raw_copy_file(entry)?;
                continue;
            }

            let mut xml = String::new();
            archive.by_index(idx)?.read_to_string(&mut xml)?;
            let filled = fill_part(&name, &xml, fields, &mut found)?;

            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .last_modified_time(DateTime::default());
            writer.start_file(name.as_str(), options)?;
            writer.write_all(&filled)?;
        }

        let bytes = writer.finish()?.into_inner();
        engine_debug!(
            "filled template: {} bytes, placeholders {:?}",
            bytes.len(),
            found
        );
        Ok(FilledDocument {
            bytes: Bytes::from(bytes),
            placeholders_found: found,
        })
    }
}

fn is_text_part(name: &str) -> bool {
    if name == DOCUMENT_PART {
        return true;
    }
    let Some(file) = name.strip_prefix("word/") else {
        return false;
    };
    !file.contains('/')
        && file.ends_with(".xml")
        && (file.starts_with("header") || file.starts_with("footer"))
}

/// Buffered content of one open `<w:p>`. Nested paragraphs are filled on
/// their own and kept as finished bytes.
enum Pending<'x> {
    Event(Event<'x>),
    Done(Vec<u8>),
}

fn fill_part(
    part: &str,
    xml: &str,
    fields: &RenderedFields,
    found: &mut BTreeSet<String>,
) -> Result<Vec<u8>, TemplateError> {
    let xml_error = |message: String| TemplateError::Xml {
        part: part.to_string(),
        message,
    };

    let mut reader = Reader::from_str(xml);
    let mut out = Writer::new(Vec::with_capacity(xml.len()));
    let mut open: Vec<Vec<Pending<'_>>> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|err| xml_error(format!("at byte {}: {err}", reader.buffer_position())))?;
        let kind = classify(&event);
        match kind {
            Kind::Eof => break,
            Kind::ParagraphStart => {
                open.push(vec![Pending::Event(event)]);
                continue;
            }
            Kind::ParagraphEnd => {
                let Some(mut items) = open.pop() else {
                    return Err(xml_error("unbalanced </w:p>".to_string()));
                };
                items.push(Pending::Event(event));
                let bytes =
                    fill_paragraph(items, fields, found).map_err(|e| xml_error(e.to_string()))?;
                match open.last_mut() {
                    Some(parent) => parent.push(Pending::Done(bytes)),
                    None => out.get_mut().extend_from_slice(&bytes),
                }
                continue;
            }
            Kind::Other => {}
        }
        match open.last_mut() {
            Some(items) => items.push(Pending::Event(event)),
            None => out.write_event(event)?,
        }
    }

    if !open.is_empty() {
        return Err(xml_error("unclosed <w:p>".to_string()));
    }
    Ok(out.into_inner())
}

enum Kind {
    ParagraphStart,
    ParagraphEnd,
    Eof,
    Other,
}

fn classify(event: &Event<'_>) -> Kind {
    match event {
        Event::Start(start) if start.name().as_ref() == b"w:p" => Kind::ParagraphStart,
        Event::End(end) if end.name().as_ref() == b"w:p" => Kind::ParagraphEnd,
        Event::Eof => Kind::Eof,
        _ => Kind::Other,
    }
}

/// A run of text inside `<w:t>`, addressed by its byte range in the joined
/// paragraph text.
struct Segment {
    item: usize,
    t_start: usize,
    start: usize,
    end: usize,
}

struct Placeholder {
    start: usize,
    end: usize,
    name: String,
}

fn fill_paragraph(
    mut items: Vec<Pending<'_>>,
    fields: &RenderedFields,
    found: &mut BTreeSet<String>,
) -> Result<Vec<u8>, quick_xml::Error> {
    let mut joined = String::new();
    let mut segments = Vec::new();
    let mut texts = Vec::new();
    let mut t_start: Option<usize> = None;

    for (idx, item) in items.iter().enumerate() {
        let Pending::Event(event) = item else { continue };
        match event {
            Event::Start(start) if start.name().as_ref() == b"w:t" => t_start = Some(idx),
            Event::End(end) if end.name().as_ref() == b"w:t" => t_start = None,
            Event::Text(text) => {
                if let Some(t_idx) = t_start {
                    let value = text.unescape()?;
                    let start = joined.len();
                    joined.push_str(&value);
                    segments.push(Segment {
                        item: idx,
                        t_start: t_idx,
                        start,
                        end: joined.len(),
                    });
                    texts.push(value.into_owned());
                }
            }
            _ => {}
        }
    }

    let matches = find_placeholders(&joined, fields);
    for placeholder in &matches {
        found.insert(placeholder.name.clone());
    }

    if !matches.is_empty() {
        engine_trace!("paragraph placeholders: {}", matches.len());
        let mut rewritten: Vec<(usize, usize, String)> = Vec::new();
        for (segment, original) in segments.iter().zip(&texts) {
            let text = rewrite_segment(segment, &joined, &matches, fields);
            if &text != original {
                rewritten.push((segment.item, segment.t_start, text));
            }
        }
        // Later indices first so earlier ones stay valid.
        for (item, t_idx, text) in rewritten.into_iter().rev() {
            let replacement = text_events(&text);
            items.splice(item..=item, replacement);
            if let Pending::Event(Event::Start(start)) = &items[t_idx] {
                let preserved = preserve_space(start);
                items[t_idx] = Pending::Event(Event::Start(preserved));
            }
        }
    }

    let mut writer = Writer::new(Vec::new());
    for item in items {
        match item {
            Pending::Event(event) => writer.write_event(event)?,
            Pending::Done(bytes) => writer.get_mut().extend_from_slice(&bytes),
        }
    }
    Ok(writer.into_inner())
}

/// Known names only; an unknown `{{name}}` stays in the text verbatim.
fn find_placeholders(text: &str, fields: &RenderedFields) -> Vec<Placeholder> {
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(rel) = text[from..].find("{{") {
        let start = from + rel;
        let Some(close) = text[start + 2..].find("}}") else {
            break;
        };
        let end = start + 2 + close + 2;
        let name = &text[start + 2..end - 2];
        if fields.contains(name) {
            found.push(Placeholder {
                start,
                end,
                name: name.to_string(),
            });
            from = end;
        } else {
            from = start + 1;
        }
    }
    found
}

/// The replacement lands in the segment where the placeholder starts; the
/// rest of the placeholder is cut from whichever segments it spans.
fn rewrite_segment(
    segment: &Segment,
    joined: &str,
    matches: &[Placeholder],
    fields: &RenderedFields,
) -> String {
    let mut out = String::new();
    let mut pos = segment.start;
    for placeholder in matches
        .iter()
        .filter(|p| p.start < segment.end && p.end > segment.start)
    {
        if placeholder.start > pos {
            out.push_str(&joined[pos..placeholder.start]);
        }
        if placeholder.start >= segment.start {
            out.push_str(fields.get(&placeholder.name).unwrap_or_default());
        }
        pos = pos.max(placeholder.end.min(segment.end));
    }
    if pos < segment.end {
        out.push_str(&joined[pos..segment.end]);
    }
    out
}

/// Text for one `<w:t>`; newlines close the element, add `<w:br/>` and reopen it.
fn text_events<'x>(text: &str) -> Vec<Pending<'x>> {
    let normalized = text.replace("\r\n", "\n");
    let mut events = Vec::new();
    for (idx, line) in normalized.split('\n').enumerate() {
        if idx > 0 {
            events.push(Pending::Event(Event::End(BytesEnd::new("w:t"))));
            events.push(Pending::Event(Event::Empty(BytesStart::new("w:br"))));
            events.push(Pending::Event(Event::Start(
                BytesStart::new("w:t").with_attributes([("xml:space", "preserve")]),
            )));
        }
        if !line.is_empty() {
            events.push(Pending::Event(Event::Text(BytesText::new(line).into_owned())));
        }
    }
    events
}

fn preserve_space(start: &BytesStart<'_>) -> BytesStart<'static> {
    let mut owned = start.clone().into_owned();
    let has_space = start
        .attributes()
        .flatten()
        .any(|attr| attr.key.as_ref() == b"xml:space");
    if !has_space {
        owned.push_attribute(("xml:space", "preserve"));
    }
    owned
}
