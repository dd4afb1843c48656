// Shared prompt fragments used by every generation call.
// Pass-specific prompts live next to the pipeline that sends them (ranking/prompts.rs).

/// System prompt sent with every generation call.
pub const RECRUITER_SYSTEM: &str = "You are an expert HR recruiter and talent advisor. \
    You evaluate candidates strictly on the evidence in the documents you are given. \
    Follow the requested output format exactly.";

/// Instruction appended to prompts whose response must be machine-parsed.
pub const JSON_ONLY_INSTRUCTION: &str = "\
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";
