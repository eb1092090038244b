// All LLM prompt constants for answer generation.

/// System prompt for form answers — short, literal, no commentary.
pub const ANSWER_SYSTEM: &str =
    "You are filling out a job application form on behalf of a qualified candidate. \
    Answer questions concisely and favorably for the candidate. \
    Respond with the answer ONLY. \
    Do NOT explain, apologize, or add any text around the answer.";

/// Open free-text question. Replace `{question}`.
pub const TEXTUAL_PROMPT_TEMPLATE: &str = r#"Answer this application form question in one short sentence or phrase.

QUESTION:
{question}"#;

/// Numeric-only control. Replace `{question}`.
pub const NUMERIC_PROMPT_TEMPLATE: &str = r#"Answer this application form question with a single number. No units, no words, digits only. When unsure, prefer a modest value that keeps the application eligible.

QUESTION:
{question}"#;

/// Closed-option question. Replace `{question}` and `{options}`.
pub const OPTIONS_PROMPT_TEMPLATE: &str = r#"Pick the best answer for this application form question. Reply with the text of ONE option exactly as written below.

QUESTION:
{question}

OPTIONS:
{options}"#;

/// Checkbox decision. Replace `{prompt}`. The reply drives whether boxes
/// get checked, so numbered answers must come back as bare numbers.
pub const CHECKBOX_PROMPT_TEMPLATE: &str = r#"You are deciding which checkboxes to tick on an application form. Reply with "yes" or "no" for a single checkbox, or with the matching option numbers separated by commas (e.g. "1,3") when the prompt lists numbered options.

{prompt}"#;

/// Retry after the site rejected the previous free-text answer.
/// Replace `{question}`, `{previous}`, `{error}`.
pub const TEXTUAL_RETRY_PROMPT_TEMPLATE: &str = r#"Your previous answer to an application form question was rejected by the site's validation. Give a different answer that satisfies the error message. Respond with the new answer only.

QUESTION:
{question}

PREVIOUS ANSWER (rejected):
{previous}

VALIDATION ERROR:
{error}"#;

/// Retry for closed-option questions. Replace `{question}`, `{options}`,
/// `{previous}`, `{error}`.
pub const OPTIONS_RETRY_PROMPT_TEMPLATE: &str = r#"Your previous pick for this application form question was rejected by the site's validation. Pick a DIFFERENT option that satisfies the error message. Reply with the text of ONE option exactly as written below.

QUESTION:
{question}

OPTIONS:
{options}

PREVIOUS PICK (rejected):
{previous}

VALIDATION ERROR:
{error}"#;

/// System prompt for cover-letter drafting.
pub const COVER_LETTER_SYSTEM: &str =
    "You are an expert cover-letter writer. Write a concise, specific, professional \
    cover letter grounded in the candidate summary you are given. \
    Respond with the letter body only — no subject line, no commentary.";

/// Cover-letter draft. Replace `{summary}`.
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Write a cover letter (three short paragraphs, under 250 words) for the following candidate. Do not invent employers, titles, or dates that are not in the summary.

CANDIDATE SUMMARY:
{summary}"#;
