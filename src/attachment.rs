//! Turns user files into content blocks.
//!
//! Images become image blocks.  PDFs become page-marked text.  Source, text
//! and configuration files become fenced code blocks tagged with a language.
//! Anything else produces no content.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::observability::ATTACHMENTS_PROCESSED;
use crate::types::ContentBlock;
use crate::{Error, Result};

/// Largest attachment accepted by default: 10 MiB.
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

/// Extension to fence-language table.  An empty language leaves the fence
/// untagged.
const LANGUAGES: &[(&str, &str)] = &[
    ("py", "python"),
    ("rs", "rust"),
    ("js", "javascript"),
    ("ts", "typescript"),
    ("sql", "sql"),
    ("json", "json"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("xml", "xml"),
    ("md", "markdown"),
    ("html", "html"),
    ("css", "css"),
    ("sh", "bash"),
    ("toml", "toml"),
    ("txt", ""),
    ("csv", ""),
    ("log", ""),
];

const IMAGE_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

/// The fence language for a file extension, if the extension is supported.
pub fn language_for(extension: &str) -> Option<&'static str> {
    let extension = extension.to_ascii_lowercase();
    LANGUAGES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, language)| *language)
}

/// The image MIME type for a file extension, if it names an image format.
pub fn image_type_for(extension: &str) -> Option<&'static str> {
    let extension = extension.to_ascii_lowercase();
    IMAGE_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}

/// A file supplied by the user for one turn.
///
/// The attachment owns its bytes, so processing never consumes it and can be
/// repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name as shown to the user; its extension drives classification.
    pub name: String,
    /// MIME type reported by whoever supplied the file.
    pub mime_type: Option<String>,
    /// Declared size.
    pub size_bytes: u64,
    /// The file contents.
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// An attachment whose declared size is its byte length.
    pub fn new(name: impl Into<String>, mime_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type,
            size_bytes: bytes.len() as u64,
            bytes,
        }
    }

    /// Override the declared size.
    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    /// Read a file from disk, inferring an image MIME type from its extension.
    ///
    /// Files larger than [`DEFAULT_MAX_ATTACHMENT_BYTES`] are rejected before
    /// they are read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_path_with_limit(path, DEFAULT_MAX_ATTACHMENT_BYTES)
    }

    /// Like [`from_path`](Self::from_path) with an explicit size ceiling.
    pub fn from_path_with_limit(path: impl AsRef<Path>, max_bytes: u64) -> Result<Self> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)
            .map_err(|e| Error::io(format!("cannot read {}", path.display()), e))?
            .len();
        if size > max_bytes {
            return Err(Error::validation(
                format!(
                    "{} is {size} bytes; the limit is {max_bytes} bytes",
                    path.display()
                ),
                Some("attachment".to_string()),
            ));
        }
        let bytes = std::fs::read(path)
            .map_err(|e| Error::io(format!("cannot read {}", path.display()), e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(image_type_for)
            .map(String::from);
        Ok(Self::new(name, mime_type, bytes))
    }

    /// The lowercased final extension of the name.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// How an attachment will be turned into content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Sent as an image block with this media type.
    Image { media_type: String },
    /// Text extracted page by page.
    Pdf,
    /// Decoded as UTF-8 and fenced with this language tag.
    Source { language: &'static str },
}

impl AttachmentKind {
    /// Classify by MIME type first, then by extension.  `None` means the
    /// attachment is not supported.
    pub fn classify(attachment: &Attachment) -> Option<Self> {
        if let Some(mime) = &attachment.mime_type {
            if mime.starts_with("image/") {
                return Some(AttachmentKind::Image {
                    media_type: mime.clone(),
                });
            }
        }
        let extension = attachment.extension()?;
        if extension == "pdf" {
            return Some(AttachmentKind::Pdf);
        }
        language_for(&extension).map(|language| AttachmentKind::Source { language })
    }
}

/// Extracts the text of each page of a PDF.
pub trait PdfTextExtractor: Send + Sync {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>>;
}

/// [`PdfTextExtractor`] backed by the `pdf-extract` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtract;

impl PdfTextExtractor for PdfExtract {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>> {
        // pdf-extract panics on some malformed documents.
        let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes));
        match result {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(Error::decode(format!("PDF extraction failed: {e}"), None)),
            Err(_) => Err(Error::decode("PDF extraction failed: malformed document", None)),
        }
    }
}

/// Converts attachments to content blocks.
#[derive(Clone)]
pub struct AttachmentProcessor {
    max_bytes: u64,
    pdf: Arc<dyn PdfTextExtractor>,
}

impl AttachmentProcessor {
    pub fn new() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
            pdf: Arc::new(PdfExtract),
        }
    }

    /// Set the size ceiling.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Replace the PDF text extractor.
    pub fn with_pdf_extractor(mut self, pdf: impl PdfTextExtractor + 'static) -> Self {
        self.pdf = Arc::new(pdf);
        self
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Produce the content block for one attachment.
    ///
    /// Returns `Ok(None)` for unsupported file types, `Err(Validation)` for
    /// files over the ceiling and `Err(Decode)` for PDFs that cannot be read.
    pub fn process(&self, attachment: &Attachment) -> Result<Option<ContentBlock>> {
        let size = attachment.size_bytes.max(attachment.bytes.len() as u64);
        if size > self.max_bytes {
            return Err(Error::validation(
                format!(
                    "{} is {size} bytes; the limit is {} bytes",
                    attachment.name, self.max_bytes
                ),
                Some("attachment".to_string()),
            ));
        }

        let Some(kind) = AttachmentKind::classify(attachment) else {
            debug!(name = %attachment.name, "unsupported attachment type");
            return Ok(None);
        };
        let block = match kind {
            AttachmentKind::Image { media_type } => {
                ContentBlock::image(media_type, &attachment.bytes)
            }
            AttachmentKind::Pdf => {
                let pages = self.pdf.extract_pages(&attachment.bytes)?;
                ContentBlock::text(format_pdf(&attachment.name, &pages))
            }
            AttachmentKind::Source { language } => {
                let text = String::from_utf8_lossy(&attachment.bytes);
                ContentBlock::text(format!(
                    "File content ({}):\n```{language}\n{text}\n```",
                    attachment.name
                ))
            }
        };
        ATTACHMENTS_PROCESSED.click();
        Ok(Some(block))
    }
}

impl Default for AttachmentProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn format_pdf(name: &str, pages: &[String]) -> String {
    let body = pages
        .iter()
        .enumerate()
        .map(|(i, page)| format!("--- Page {} ---\n{}", i + 1, page.trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("PDF content ({name}):\n{body}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct TwoPages;

    impl PdfTextExtractor for TwoPages {
        fn extract_pages(&self, _: &[u8]) -> Result<Vec<String>> {
            Ok(vec!["First page.\n".to_string(), "Second page.".to_string()])
        }
    }

    struct Unreadable;

    impl PdfTextExtractor for Unreadable {
        fn extract_pages(&self, _: &[u8]) -> Result<Vec<String>> {
            Err(Error::decode("not a PDF", None))
        }
    }

    fn text_of(block: Option<ContentBlock>) -> String {
        block.unwrap().as_text().unwrap().to_string()
    }

    #[test]
    fn oversized_attachment_rejected() {
        let processor = AttachmentProcessor::new().with_max_bytes(4);
        let err = processor
            .process(&Attachment::new("a.txt", None, b"hello".to_vec()))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn declared_size_counts() {
        let attachment = Attachment::new("a.txt", None, b"hi".to_vec())
            .with_size(DEFAULT_MAX_ATTACHMENT_BYTES + 1);
        let err = AttachmentProcessor::new().process(&attachment).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn python_is_fenced() {
        let block = AttachmentProcessor::new()
            .process(&Attachment::new("main.py", None, b"print('hi')".to_vec()))
            .unwrap();
        assert_eq!(
            text_of(block),
            "File content (main.py):\n```python\nprint('hi')\n```"
        );
    }

    #[test]
    fn sql_is_fenced() {
        let block = AttachmentProcessor::new()
            .process(&Attachment::new("Q.SQL", None, b"SELECT 1;".to_vec()))
            .unwrap();
        assert!(text_of(block).contains("```sql\nSELECT 1;\n```"));
    }

    #[test]
    fn plain_text_has_empty_tag() {
        let block = AttachmentProcessor::new()
            .process(&Attachment::new("notes.txt", None, b"remember".to_vec()))
            .unwrap();
        assert_eq!(text_of(block), "File content (notes.txt):\n```\nremember\n```");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let block = AttachmentProcessor::new()
            .process(&Attachment::new("bad.log", None, vec![b'o', b'k', 0xff]))
            .unwrap();
        assert!(text_of(block).contains("ok\u{fffd}"));
    }

    #[test]
    fn image_round_trip() {
        let bytes = vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3];
        let block = AttachmentProcessor::new()
            .process(&Attachment::new(
                "shot.png",
                Some("image/png".to_string()),
                bytes.clone(),
            ))
            .unwrap()
            .unwrap();
        let image = block.as_image().unwrap();
        assert_eq!(image.source.media_type, "image/png");
        assert_eq!(image.source.decode().unwrap(), bytes);
    }

    #[test]
    fn pdf_pages_are_marked() {
        let processor = AttachmentProcessor::new().with_pdf_extractor(TwoPages);
        let block = processor
            .process(&Attachment::new("report.pdf", None, b"%PDF".to_vec()))
            .unwrap();
        assert_eq!(
            text_of(block),
            "PDF content (report.pdf):\n--- Page 1 ---\nFirst page.\n\n--- Page 2 ---\nSecond page."
        );
    }

    #[test]
    fn unreadable_pdf_is_decode_error() {
        let processor = AttachmentProcessor::new().with_pdf_extractor(Unreadable);
        let err = processor
            .process(&Attachment::new("broken.pdf", None, vec![0]))
            .unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn unknown_extension_yields_nothing() {
        let processor = AttachmentProcessor::new();
        assert_eq!(
            processor
                .process(&Attachment::new("archive.zip", None, vec![1, 2]))
                .unwrap(),
            None
        );
        assert_eq!(
            processor
                .process(&Attachment::new("Makefile", None, vec![1, 2]))
                .unwrap(),
            None
        );
    }

    #[test]
    fn processing_is_repeatable() {
        let processor = AttachmentProcessor::new();
        let attachment = Attachment::new("a.rs", None, b"fn main() {}".to_vec());
        assert_eq!(
            processor.process(&attachment).unwrap(),
            processor.process(&attachment).unwrap()
        );
    }

    #[test]
    fn from_path_infers_image_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pic.JPG");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(&[0xff, 0xd8])
            .unwrap();
        let attachment = Attachment::from_path(&path).unwrap();
        assert_eq!(attachment.name, "pic.JPG");
        assert_eq!(attachment.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(attachment.size_bytes, 2);
    }

    #[test]
    fn from_path_rejects_large_file_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.log");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(DEFAULT_MAX_ATTACHMENT_BYTES + 1).unwrap();

        let err = Attachment::from_path(&path).unwrap_err();
        assert!(err.is_validation());

        let err = Attachment::from_path_with_limit(&path, 1024).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("the limit is 1024 bytes"));
    }

    #[test]
    fn from_path_with_limit_accepts_small_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.py");
        std::fs::write(&path, "x = 1\n").unwrap();
        let attachment = Attachment::from_path_with_limit(&path, 6).unwrap();
        assert_eq!(attachment.bytes, b"x = 1\n");
    }

    #[test]
    fn from_path_missing_file() {
        let err = Attachment::from_path("/definitely/not/here.txt").unwrap_err();
        assert!(!err.is_provider());
    }
}
