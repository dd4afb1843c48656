// Prompt templates for the two ranking passes.
// Templates use `{placeholder}` markers filled in one pass before sending.

/// Ranking pass. Replace: {json_only_instruction}, {job_description}, {candidates}
pub const RANKING_PROMPT_TEMPLATE: &str = r#"Analyze ALL candidates below and rank them by fit for this role.

{json_only_instruction}

Return a JSON object with this EXACT structure:
{
  "rankings": [
    {
      "filename": "filename.pdf",
      "rank": 1,
      "match_percentage": 92,
      "key_reason": "Brief reason for this ranking"
    },
    {
      "filename": "filename2.pdf",
      "rank": 2,
      "match_percentage": 78,
      "key_reason": "Brief reason"
    }
  ]
}

RULES:
1. Include EVERY candidate exactly once, using the exact filename shown after "Candidate:"
2. `rank` is a positive integer, 1 = best fit, no gaps
3. `match_percentage` is an integer from 0 to 100

Criteria for ranking:
- Technical skill match (40%)
- Experience level match (30%)
- Cultural fit (15%)
- Education/Certifications (15%)

JOB DESCRIPTION:
{job_description}

ALL CANDIDATES (evaluate ALL of them):{candidates}

Return ONLY valid JSON with rankings of ALL candidates."#;

/// One candidate block in the ranking pass. Replace: {filename}, {excerpt}
pub const RANKING_CANDIDATE_TEMPLATE: &str = "\n\nCandidate: {filename}\n{excerpt}";

/// Analysis pass. Replace: {job_description}, {candidate_outline}, {resumes}
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r###"Based on the job description and the top selected candidates, provide comprehensive, professional, and actionable insights.

Format your response with clear sections using markdown. Use **bold** for emphasis.
Use "## " for section headers and "- " for bullet points.

Structure your response as follows:

## Analysis Overview
Provide a brief executive summary of the top candidates.
{candidate_outline}
JOB DESCRIPTION:
{job_description}

TOP CANDIDATE RESUMES:{resumes}"###;

/// Outline for one selected candidate. Replace: {position}, {filename}, {score}, {reason}
pub const ANALYSIS_CANDIDATE_OUTLINE: &str = r#"
## Candidate {position}: {filename}
**AI Match Score:** {score}%
**Why This Match:** {reason}

**Key Strengths:**
- [Strength 1]
- [Strength 2]
- [Strength 3]

**Skill Gaps:**
- [Gap 1]
- [Gap 2]

**Recommended Interview Questions:**
- [Question 1]
- [Question 2]
- [Question 3]
"#;

/// One resume excerpt in the analysis pass. Replace: {position}, {filename}, {excerpt}
pub const ANALYSIS_RESUME_TEMPLATE: &str = "\n\nCandidate {position}: {filename}\n{excerpt}";
