//! Ranking & Analysis — orchestrates the two-pass pipeline for one request.
//!
//! Flow: extract_all → ranking prompt → generate → parse_rankings →
//!       TopSelection → analysis prompt → generate → format_markdown_to_html.
//!
//! Stages: Idle → RankingRequested → RankingParsed → AnalysisRequested → Done,
//! with Failed reachable from the ranking stages. A failure in the analysis
//! pass does not fail the request: the ranking is returned with an error
//! notice in place of the narrative.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::RankingConfig;
use crate::extraction::{extract_all, CandidateDocument, ExtractedText};
use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::{LlmError, TextGenerator};
use crate::ranking::models::{AnalysisError, AnalysisResult, TopSelection};
use crate::ranking::parser::parse_rankings;
use crate::ranking::prompts::{
    ANALYSIS_CANDIDATE_OUTLINE, ANALYSIS_PROMPT_TEMPLATE, ANALYSIS_RESUME_TEMPLATE,
    RANKING_CANDIDATE_TEMPLATE, RANKING_PROMPT_TEMPLATE,
};
use crate::render::{escape_html, format_markdown_to_html};

// ────────────────────────────────────────────────────────────────────────────
// Pipeline stages
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    RankingRequested,
    RankingParsed,
    AnalysisRequested,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Tracks the current stage of one request and logs every transition.
struct Pipeline {
    stage: Stage,
}

impl Pipeline {
    fn new() -> Self {
        Self { stage: Stage::Idle }
    }

    fn advance(&mut self, next: Stage) {
        info!("Ranking pipeline: {} → {}", self.stage, next);
        self.stage = next;
    }

    fn fail(&mut self, error: AnalysisError) -> AnalysisError {
        warn!("Ranking pipeline failed during {}: {error}", self.stage);
        self.stage = Stage::Failed;
        error
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Entry point
// ────────────────────────────────────────────────────────────────────────────

/// Ranks candidate documents against a job description.
///
/// Steps:
/// 1. extract every document (parallel, never fails)
/// 2. ranking pass over all candidates → validated `RankingEntry` list
/// 3. `TopSelection` of the best `config.top_n`
/// 4. analysis pass over the selected candidates only → safe HTML narrative
///
/// Service or parse failures in steps 2–3 are fatal. Step 4 degrades.
pub async fn rank_candidates(
    generator: &dyn TextGenerator,
    config: &RankingConfig,
    job_description: &str,
    documents: Vec<CandidateDocument>,
) -> Result<AnalysisResult, AnalysisError> {
    let mut pipeline = Pipeline::new();

    let documents = dedupe_documents(documents);
    if documents.is_empty() {
        return Err(pipeline.fail(AnalysisError::NoCandidates));
    }

    let extracted = extract_all(documents).await;
    info!("Extracted text from {} candidate documents", extracted.len());

    // Idle → RankingRequested
    let ranking_prompt =
        build_ranking_prompt(job_description, &extracted, config.ranking_excerpt_chars);
    pipeline.advance(Stage::RankingRequested);
    let ranking_response = call_service(generator, &ranking_prompt, config.service_timeout)
        .await
        .map_err(|e| pipeline.fail(AnalysisError::ServiceUnavailable(e.to_string())))?;

    // RankingRequested → RankingParsed
    let submitted: HashSet<&str> = extracted.iter().map(|e| e.filename.as_str()).collect();
    let entries =
        parse_rankings(&ranking_response, &submitted).map_err(|e| pipeline.fail(e))?;

    let ranked: HashSet<&str> = entries.iter().map(|e| e.filename.as_str()).collect();
    let unranked_filenames: Vec<String> = extracted
        .iter()
        .filter(|e| !ranked.contains(e.filename.as_str()))
        .map(|e| e.filename.clone())
        .collect();
    if !unranked_filenames.is_empty() {
        warn!(
            "Ranking omitted {} submitted candidates: {:?}",
            unranked_filenames.len(),
            unranked_filenames
        );
    }

    let selection = TopSelection::select(entries, config.top_n);
    pipeline.advance(Stage::RankingParsed);
    info!("Top candidates: {:?}", selection.filenames());

    // RankingParsed → AnalysisRequested
    let analysis_prompt = build_analysis_prompt(
        job_description,
        &selection,
        &extracted,
        config.analysis_excerpt_chars,
    );
    pipeline.advance(Stage::AnalysisRequested);
    let (narrative_html, narrative_degraded) =
        match call_service(generator, &analysis_prompt, config.service_timeout).await {
            Ok(narrative) => (format_markdown_to_html(&narrative), false),
            Err(e) => {
                warn!("Analysis pass failed, returning ranking only: {e}");
                (analysis_error_html(&e.to_string()), true)
            }
        };

    // AnalysisRequested → Done
    pipeline.advance(Stage::Done);

    Ok(AnalysisResult {
        top_filenames: selection.filenames(),
        match_scores: selection.scores(),
        key_reasons: selection.reasons(),
        narrative_html,
        narrative_degraded,
        unranked_filenames,
        extraction: extracted.iter().map(ExtractedText::summary).collect(),
    })
}

/// One generation call bounded by the request-scoped timeout. Empty text is
/// treated as a failed call.
async fn call_service(
    generator: &dyn TextGenerator,
    prompt: &str,
    timeout: Duration,
) -> Result<String, LlmError> {
    let text = tokio::time::timeout(timeout, generator.generate(prompt))
        .await
        .map_err(|_| LlmError::Timeout(timeout))??;

    if text.trim().is_empty() {
        return Err(LlmError::EmptyContent);
    }
    Ok(text)
}

/// Keeps the first document for each filename.
fn dedupe_documents(documents: Vec<CandidateDocument>) -> Vec<CandidateDocument> {
    let mut seen = HashSet::new();
    documents
        .into_iter()
        .filter(|doc| {
            let first = seen.insert(doc.filename.clone());
            if !first {
                warn!("Duplicate filename '{}' dropped", doc.filename);
            }
            first
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Prompt construction
// ────────────────────────────────────────────────────────────────────────────

/// The first `max_chars` characters of `text`, never splitting a code point.
fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn build_ranking_prompt(
    job_description: &str,
    extracted: &[ExtractedText],
    excerpt_chars: usize,
) -> String {
    let candidates: String = extracted
        .iter()
        .map(|doc| {
            fill_template(
                RANKING_CANDIDATE_TEMPLATE,
                &[
                    ("{filename}", &doc.filename),
                    ("{excerpt}", excerpt(&doc.text, excerpt_chars)),
                ],
            )
        })
        .collect();

    fill_template(
        RANKING_PROMPT_TEMPLATE,
        &[
            ("{json_only_instruction}", JSON_ONLY_INSTRUCTION),
            ("{job_description}", job_description),
            ("{candidates}", &candidates),
        ],
    )
}

fn build_analysis_prompt(
    job_description: &str,
    selection: &TopSelection,
    extracted: &[ExtractedText],
    excerpt_chars: usize,
) -> String {
    let texts: HashMap<&str, &str> = extracted
        .iter()
        .map(|doc| (doc.filename.as_str(), doc.text.as_str()))
        .collect();

    let mut outline = String::new();
    let mut resumes = String::new();
    for (index, entry) in selection.entries().iter().enumerate() {
        let position = (index + 1).to_string();
        outline.push_str(&fill_template(
            ANALYSIS_CANDIDATE_OUTLINE,
            &[
                ("{position}", &position),
                ("{filename}", &entry.filename),
                ("{score}", &entry.match_percentage.to_string()),
                ("{reason}", &entry.key_reason),
            ],
        ));
        if let Some(text) = texts.get(entry.filename.as_str()) {
            resumes.push_str(&fill_template(
                ANALYSIS_RESUME_TEMPLATE,
                &[
                    ("{position}", &position),
                    ("{filename}", &entry.filename),
                    ("{excerpt}", excerpt(text, excerpt_chars)),
                ],
            ));
        }
    }

    fill_template(
        ANALYSIS_PROMPT_TEMPLATE,
        &[
            ("{job_description}", job_description),
            ("{candidate_outline}", &outline),
            ("{resumes}", &resumes),
        ],
    )
}

/// Substitutes `{placeholder}` markers in one pass over `template`. Inserted
/// values are never rescanned, so candidate text containing a marker stays
/// literal.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        match values.iter().find(|(marker, _)| tail.starts_with(marker)) {
            Some((marker, value)) => {
                out.push_str(value);
                rest = &tail[marker.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// User-visible notice shown in place of the narrative when the analysis pass fails.
fn analysis_error_html(message: &str) -> String {
    format!(
        "<div class=\"analysis-error\"><strong>AI Analysis Error:</strong> {}</div>",
        escape_html(message)
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
