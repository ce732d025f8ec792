// LLM prompt templates for the screening module.
// Placeholders are `{name}` and are filled in a single pass by `render`,
// so text substituted into one placeholder is never re-scanned.

use std::borrow::Cow;

/// Criteria extraction prompt. Placeholder: `{job_description}`.
pub const CRITERIA_PROMPT_TEMPLATE: &str = "\
Based on the following job description, identify 5-8 key evaluation criteria that would be important for \
differentiating and ranking candidates. These should be specific, measurable aspects that can be evaluated \
from a resume and will help clearly distinguish between candidates.

For each criterion, provide a short, clear label that would work well as a column header in a comparison table.
Focus on skills, qualifications, and experiences that are most relevant to this specific role.

Job Description:
{job_description}

Format your response as a simple list of criteria, one per line, without numbering or bullet points.
For example:
Technical Expertise
Years of Experience
Education Level
Industry Knowledge
Project Management
";

/// Resume evaluation prompt.
/// Placeholders: `{job_description}`, `{resume_text}`, `{criteria}`.
pub const EVALUATION_PROMPT_TEMPLATE: &str = "\
You are an expert resume screener. Evaluate the following resume against the job description and criteria.

Job Description:
{job_description}

Resume:
{resume_text}

Evaluate the candidate on each of the following criteria on a scale of 0-10 (where 10 is perfect match):
{criteria}

For each criterion, provide:
1. A score from 0-10
2. A brief justification (1-2 sentences)

Format your response as:
Criterion: Score
Justification: Brief explanation

Repeat for each criterion.
";

/// Candidate feedback prompt.
/// Placeholders: `{job_description}`, `{resume_text}`, `{scores}`.
pub const FEEDBACK_PROMPT_TEMPLATE: &str = "\
You are an expert resume reviewer. Generate constructive feedback for a candidate based on their resume \
and how it matches the job description.

Job Description:
{job_description}

Resume:
{resume_text}

Evaluation Scores:
{scores}

Provide the following feedback:
1. 3 key strengths of the candidate for this role
2. 3 areas for improvement or missing qualifications
3. Overall assessment of fit for the role

Format your response in a professional and constructive manner.
";

/// Appended to text cut short by `truncate_for_prompt`.
pub const TRUNCATION_MARKER: &str = "...";

/// Fills `{name}` placeholders from `vars` in one left-to-right pass.
/// Unknown placeholders are left as-is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match substituted {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Cuts `text` to at most `max_chars` characters and appends `...` when it had to cut.
/// Counts characters, not bytes, so multi-byte text is never split mid code point.
pub fn truncate_for_prompt(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => Cow::Owned(format!("{}{TRUNCATION_MARKER}", &text[..byte_idx])),
        None => Cow::Borrowed(text),
    }
}
