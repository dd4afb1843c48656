// Candidate ranking: two-pass AI ranking and analysis over extracted resume text.
// All generation calls go through the `TextGenerator` seam in llm_client.

pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod upload;

pub use models::{AnalysisError, AnalysisResult};
pub use orchestrator::rank_candidates;
