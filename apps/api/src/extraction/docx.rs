use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use super::ExtractError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Extracts the visible body text of a `.docx` package.
///
/// Text runs (`w:t`) are concatenated; tabs and explicit breaks are kept and
/// every paragraph ends with a newline.
pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = String::new();
    archive.by_name(DOCUMENT_PART)?.read_to_string(&mut xml)?;
    document_text(&xml)
}

fn document_text(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text_run => text.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(text.trim_end().to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    /// Builds a minimal `.docx` whose body is the given `<w:body>` inner XML.
    pub(crate) fn build_docx(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        );
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(DOCUMENT_PART, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_paragraphs_become_lines() {
        let docx = build_docx(
            "<w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p>\
             <w:p><w:r><w:t xml:space=\"preserve\">Senior </w:t></w:r><w:r><w:t>Engineer</w:t></w:r></w:p>",
        );
        assert_eq!(extract_docx(&docx).unwrap(), "Jane Doe\nSenior Engineer");
    }

    #[test]
    fn test_tabs_breaks_and_entities() {
        let docx = build_docx(
            "<w:p><w:r><w:t>Skills</w:t><w:tab/><w:t>C &amp; Rust</w:t><w:br/><w:t>SQL</w:t></w:r></w:p>",
        );
        assert_eq!(extract_docx(&docx).unwrap(), "Skills\tC & Rust\nSQL");
    }

    #[test]
    fn test_text_outside_runs_is_ignored() {
        let text = document_text(
            "<w:document><w:body><w:p><w:instrText>PAGE</w:instrText><w:t>Visible</w:t></w:p></w:body></w:document>",
        )
        .unwrap();
        assert_eq!(text, "Visible");
    }

    #[test]
    fn test_archive_without_document_part_fails() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/styles.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<w:styles/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert!(matches!(extract_docx(&bytes), Err(ExtractError::Zip(_))));
    }

    #[test]
    fn test_not_a_zip_fails() {
        assert!(extract_docx(b"plain bytes").is_err());
    }
}
