use serde::Serialize;
use thiserror::Error;

use crate::extraction::ExtractionSummary;

/// One validated entry from the ranking pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub filename: String,
    /// 1 = best.
    pub rank: u32,
    /// 0 – 100
    pub match_percentage: u8,
    pub key_reason: String,
}

impl RankingEntry {
    /// Match percentage as a score in [0, 1].
    pub fn score(&self) -> f64 {
        f64::from(self.match_percentage) / 100.0
    }
}

/// The best `top_n` entries, ascending by rank.
#[derive(Debug, Clone, PartialEq)]
pub struct TopSelection(pub Vec<RankingEntry>);

impl TopSelection {
    /// Stable sort by rank so ties keep response order, then take the first `top_n`.
    pub fn select(mut entries: Vec<RankingEntry>, top_n: usize) -> Self {
        entries.sort_by_key(|e| e.rank);
        entries.truncate(top_n);
        Self(entries)
    }

    pub fn entries(&self) -> &[RankingEntry] {
        &self.0
    }

    pub fn filenames(&self) -> Vec<String> {
        self.0.iter().map(|e| e.filename.clone()).collect()
    }

    pub fn scores(&self) -> Vec<f64> {
        self.0.iter().map(RankingEntry::score).collect()
    }

    pub fn reasons(&self) -> Vec<String> {
        self.0.iter().map(|e| e.key_reason.clone()).collect()
    }
}

/// Final output of the ranking pipeline. Not persisted.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub top_filenames: Vec<String>,
    /// Parallel to `top_filenames`, each in [0, 1].
    pub match_scores: Vec<f64>,
    /// Parallel to `top_filenames`.
    pub key_reasons: Vec<String>,
    pub narrative_html: String,
    /// True when the analysis pass failed and `narrative_html` holds an error notice.
    pub narrative_degraded: bool,
    /// Submitted candidates the ranking pass did not rank.
    pub unranked_filenames: Vec<String>,
    pub extraction: Vec<ExtractionSummary>,
}

/// Fatal pipeline failures. The message is shown to the user as-is.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("AI service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("AI ranking response could not be understood: {0}")]
    MalformedResponse(String),

    #[error("No candidate documents were submitted")]
    NoCandidates,
}
