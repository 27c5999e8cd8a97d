//! Text extractor implementations

mod pdf;
mod plain_text;

pub use pdf::PdfTextExtractor;
pub use plain_text::PlainTextExtractor;

fn has_extension(source: &str, extensions: &[&str]) -> bool {
    source
        .rsplit_once('.')
        .is_some_and(|(_, ext)| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}
