use crate::error::IngestError;
use crate::ingest::digest_file;
use crate::models::{Document, ExtractedDocument, UNKNOWN_TITLE};
use crate::structure::SectionDetector;
use chrono::Utc;
use lopdf::content::Content;
use lopdf::{Document as PdfDocument, Object};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// A run of text drawn on a page together with its effective font size.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub size: f32,
}

pub trait PdfExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, IngestError>;
}

pub struct LopdfExtractor {
    detector: SectionDetector,
}

impl LopdfExtractor {
    pub fn new() -> Result<Self, IngestError> {
        Ok(Self {
            detector: SectionDetector::new()?,
        })
    }
}

impl PdfExtractor for LopdfExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedDocument, IngestError> {
        let pdf = PdfDocument::load(path).map_err(|error| extraction_failure(path, error))?;
        let pages = extract_page_texts(&pdf, path)?;
        let title = extract_title(&pdf);
        let sections = self.detector.detect_sections(&pages);

        debug!(path = %path.display(), pages = pages.len(), %title, "parsed pdf");

        let filename = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| extraction_failure(path, "path has no file name"))?;

        Ok(ExtractedDocument {
            document: Document {
                filename: filename.to_string(),
                title,
                page_count: pages.len() as u32,
                source_path: path.to_string_lossy().to_string(),
                checksum: digest_file(path)?,
                ingested_at: Utc::now(),
            },
            sections,
        })
    }
}

fn extraction_failure(path: &Path, reason: impl ToString) -> IngestError {
    IngestError::ExtractionFailure {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Returns one entry per page in ascending page order, blank pages included.
pub fn extract_page_texts(pdf: &PdfDocument, path: &Path) -> Result<Vec<PageText>, IngestError> {
    let mut pages = Vec::new();
    for page_no in pdf.get_pages().into_keys() {
        let text = pdf
            .extract_text(&[page_no])
            .map_err(|error| extraction_failure(path, error))?;
        pages.push(PageText {
            number: page_no,
            text,
        });
    }

    if pages.is_empty() {
        return Err(extraction_failure(path, "pdf has no pages"));
    }

    Ok(pages)
}

/// Best-effort: the largest text on the first page is taken as the title.
pub fn extract_title(pdf: &PdfDocument) -> String {
    first_page_spans(pdf)
        .map(|spans| title_from_spans(&spans))
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
}

pub fn title_from_spans(spans: &[TextSpan]) -> String {
    let mut max_size = 0.0f32;
    let mut title = "";

    for span in spans {
        if span.size > max_size {
            max_size = span.size;
            title = span.text.trim();
        }
    }

    if title.is_empty() {
        UNKNOWN_TITLE.to_string()
    } else {
        title.to_string()
    }
}

fn first_page_spans(pdf: &PdfDocument) -> Option<Vec<TextSpan>> {
    let page_id = pdf.get_pages().into_values().next()?;
    let raw = pdf.get_page_content(page_id).ok()?;
    let content = Content::decode(&raw).ok()?;

    let mut spans = Vec::new();
    let mut font_size = 0.0f32;
    let mut scale = 1.0f32;

    for operation in &content.operations {
        let operands = &operation.operands;
        match operation.operator.as_str() {
            "BT" => scale = 1.0,
            "Tf" => font_size = operands.get(1).and_then(number).unwrap_or(font_size),
            "Tm" => scale = operands.get(3).and_then(number).map(f32::abs).unwrap_or(1.0),
            "Tj" | "TJ" | "'" => push_span(&mut spans, operands.first(), font_size * scale),
            "\"" => push_span(&mut spans, operands.get(2), font_size * scale),
            _ => {}
        }
    }

    Some(spans)
}

fn push_span(spans: &mut Vec<TextSpan>, operand: Option<&Object>, size: f32) {
    let Some(operand) = operand else {
        return;
    };

    let text = match operand {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        Object::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Object::String(bytes, _) => Some(decode_pdf_string(bytes)),
                _ => None,
            })
            .collect(),
        _ => return,
    };

    if text.chars().any(char::is_alphanumeric) {
        spans.push(TextSpan { text, size });
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect::<Vec<_>>();
        return String::from_utf16_lossy(&units);
    }

    bytes
        .iter()
        .map(|&byte| byte as char)
        .filter(|ch| !ch.is_control())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn span(text: &str, size: f32) -> TextSpan {
        TextSpan {
            text: text.to_string(),
            size,
        }
    }

    #[test]
    fn largest_span_becomes_title() {
        let spans = vec![
            span("arXiv preprint", 8.0),
            span("  Attention Is All You Need ", 17.2),
            span("Ashish Vaswani", 11.0),
            span("Same size later", 17.2),
        ];

        assert_eq!(title_from_spans(&spans), "Attention Is All You Need");
    }

    #[test]
    fn missing_spans_fall_back_to_unknown_title() {
        assert_eq!(title_from_spans(&[]), UNKNOWN_TITLE);
        assert_eq!(title_from_spans(&[span("   ", 20.0)]), UNKNOWN_TITLE);
    }

    #[test]
    fn pdf_strings_decode_latin_and_utf16() {
        assert_eq!(decode_pdf_string(b"Deep Nets"), "Deep Nets");
        assert_eq!(decode_pdf_string(&[0xFE, 0xFF, 0x00, 0x41, 0x00, 0x49]), "AI");
    }

    #[test]
    fn unreadable_pdf_is_an_extraction_failure() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n%broken")?;

        let extractor = LopdfExtractor::new()?;
        let result = extractor.extract(&path);

        assert!(matches!(
            result,
            Err(IngestError::ExtractionFailure { .. })
        ));
        Ok(())
    }
}
