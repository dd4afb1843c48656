//! Upload boundary helpers — turn client-supplied file names into safe,
//! unique keys for one request.

use std::collections::HashSet;

use uuid::Uuid;

/// Reduces a client filename to a safe basename.
///
/// Keeps ASCII alphanumerics, `.`, `-` and `_`; whitespace becomes `_`;
/// everything else is dropped. Leading dots are stripped so the result is
/// never a hidden or relative name.
pub fn sanitize_filename(original: &str) -> String {
    let basename = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = basename
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    cleaned.trim_start_matches('.').to_string()
}

/// Extension for a part whose name sanitised to nothing, guessed from its content type.
fn extension_for_content_type(content_type: Option<&str>) -> &'static str {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match essence.as_str() {
        "application/pdf" => ".pdf",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => ".docx",
        "text/plain" => ".txt",
        "text/markdown" => ".md",
        _ => "",
    }
}

/// Assigns request-unique names to uploaded parts.
#[derive(Debug, Default)]
pub struct UploadNamer {
    taken: HashSet<String>,
}

impl UploadNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Safe, unique name for one part. Collisions get `-2`, `-3`, … before the extension.
    pub fn assign(&mut self, original: Option<&str>, content_type: Option<&str>) -> String {
        let mut name = sanitize_filename(original.unwrap_or_default());
        if name.is_empty() {
            name = format!(
                "{}{}",
                Uuid::new_v4().simple(),
                extension_for_content_type(content_type)
            );
        }

        let unique = if self.taken.contains(&name) {
            let (stem, ext) = match name.rsplit_once('.') {
                Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{ext}")),
                _ => (name.clone(), String::new()),
            };
            (2..)
                .map(|n| format!("{stem}-{n}{ext}"))
                .find(|candidate| !self.taken.contains(candidate))
                .unwrap_or(name)
        } else {
            name
        };

        self.taken.insert(unique.clone());
        unique
    }
}
