//! Text extraction from uploaded bytes.
//!
//! Digital PDFs go through `pdf-extract`; anything else must be valid UTF-8
//! text. Scanned PDFs without a text layer come out empty and are caught by
//! the length check downstream.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("Unsupported file format")]
    UnsupportedFormat,
}

/// Page-wise text extraction.
pub trait TextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;
}

/// Handles digital PDFs with embedded text layers.
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        // pdf-extract panics on some malformed files instead of returning an error.
        let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
            .map_err(|_| ExtractionError::PdfParsing("parser panicked".into()))?;

        result.map_err(|e| ExtractionError::PdfParsing(e.to_string()))
    }
}

/// UTF-8 text files, as a single page.
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ExtractionError::UnsupportedFormat)?;
        Ok(vec![text.trim_start_matches('\u{FEFF}').to_string()])
    }
}

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Extract and concatenate the text of every page, choosing the extractor
/// from the content's magic bytes.
pub fn extract_document_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let pages = if bytes.starts_with(PDF_MAGIC) {
        PdfTextExtractor.extract_pages(bytes)?
    } else {
        PlainTextExtractor.extract_pages(bytes)?
    };
    Ok(pages.join("\n"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Generate a valid single-page PDF with one text line per entry.
    pub(crate) fn make_test_pdf(lines: &[&str]) -> Vec<u8> {
        use lopdf::dictionary;
        use lopdf::{Document, Object, Stream};

        let mut doc = Document::with_version("1.4");

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut content = String::from("BT /F1 10 Tf 50 750 Td 12 TL");
        for line in lines {
            let escaped = line.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)");
            content.push_str(&format!(" ({escaped}) Tj T*"));
        }
        content.push_str(" ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let resources = dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        };

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => resources,
        });

        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        });

        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
            dict.set("Parent", pages_id);
        }

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn extract_text_from_digital_pdf() {
        let pdf = make_test_pdf(&["Referto di laboratorio", "Emoglobina 13.5 g/dL"]);
        let text = extract_document_text(&pdf).unwrap();
        assert!(text.contains("Emoglobina"), "got: {text}");
    }

    #[test]
    fn plain_text_passes_through() {
        let text = extract_document_text("\u{FEFF}Creatinina 0.9 mg/dL".as_bytes()).unwrap();
        assert_eq!(text, "Creatinina 0.9 mg/dL");
    }

    #[test]
    fn binary_garbage_is_unsupported() {
        let result = extract_document_text(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]);
        assert!(matches!(result, Err(ExtractionError::UnsupportedFormat)));
    }

    #[test]
    fn truncated_pdf_is_an_error() {
        let result = extract_document_text(b"%PDF-1.4\n1 0 obj\n<<");
        assert!(matches!(result, Err(ExtractionError::PdfParsing(_))));
    }
}
