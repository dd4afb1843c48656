// Safe HTML rendering of model-authored narrative text.
// Everything that ends up in `AnalysisResult.narrative_html` passes through here.

pub mod markdown;

pub use markdown::{escape_html, format_markdown_to_html};
