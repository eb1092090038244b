//! Text normalization and group-level DOM helpers shared by every handler.

use tracing::debug;

use crate::dom::{DomError, ElementRef};

use super::Control;

/// Selectors tried, in order, when extracting the question text of a group.
const TITLE_SELECTORS: &[&str] = &["legend", "label", ".form-label", ".question-title", "h3", "h4"];

/// Selectors that carry server-side validation messages for a group.
const ERROR_SELECTORS: &[&str] = &[
    "[role='alert']",
    ".error-message",
    ".form-error",
    "[aria-live='assertive']",
    "[id*='error']",
];

/// Canonical form used for every answer/option comparison: lowercase,
/// common Latin diacritics folded, whitespace collapsed. Idempotent.
pub fn normalize_text(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        fold_char(c, &mut folded);
    }
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_char(c: char, out: &mut String) {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => out.push('a'),
        'ç' => out.push('c'),
        'è' | 'é' | 'ê' | 'ë' => out.push('e'),
        'ì' | 'í' | 'î' | 'ï' => out.push('i'),
        'ñ' => out.push('n'),
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => out.push('o'),
        'ù' | 'ú' | 'û' | 'ü' => out.push('u'),
        'ý' | 'ÿ' => out.push('y'),
        'æ' => out.push_str("ae"),
        'œ' => out.push_str("oe"),
        'ß' => out.push_str("ss"),
        other => out.push(other),
    }
}

/// Collapses text that is visually doubled — a visible copy followed by an
/// identical screen-reader-only copy ("Your nameYour name").
pub fn dedupe_doubled(text: &str) -> String {
    let trimmed = text.trim();
    let chars: Vec<char> = trimmed.chars().collect();
    let n = chars.len();
    if n >= 2 && n % 2 == 0 && chars[..n / 2] == chars[n / 2..] {
        return chars[..n / 2].iter().collect::<String>().trim().to_string();
    }
    // Doubled copies separated by a single whitespace character.
    if n >= 3 && n % 2 == 1 && chars[n / 2].is_whitespace() && chars[..n / 2] == chars[n / 2 + 1..]
    {
        return chars[..n / 2].iter().collect::<String>().trim().to_string();
    }
    trimmed.to_string()
}

/// Sentinel question for groups where no text could be extracted.
pub const UNKNOWN_QUESTION: &str = "unknown_question";

/// Extracts the question text for a group: legend, label, structural title
/// markers, aria-label, then the first control's `name`. Doubled text is
/// collapsed; the sentinel is returned when nothing matches.
pub async fn extract_question_text(
    container: &ElementRef,
    controls: &[Control],
) -> Result<String, DomError> {
    for selector in TITLE_SELECTORS {
        if let Some(node) = container.query_first(selector).await? {
            let text = node.text().await?;
            if !text.trim().is_empty() {
                return Ok(dedupe_doubled(&text));
            }
        }
    }
    if let Some(label) = container.attr("aria-label").await? {
        if !label.trim().is_empty() {
            return Ok(dedupe_doubled(&label));
        }
    }
    for control in controls {
        if let Some(label) = &control.aria_label {
            if !label.trim().is_empty() {
                return Ok(dedupe_doubled(label));
            }
        }
    }
    if let Some(name) = controls.iter().find_map(|c| c.name.clone()) {
        debug!("falling back to control name '{name}' as question text");
        return Ok(name);
    }
    Ok(UNKNOWN_QUESTION.to_string())
}

/// Returns the first visible validation message attached to the group, if
/// the server rejected the current value.
pub async fn validation_error_text(container: &ElementRef) -> Result<Option<String>, DomError> {
    for selector in ERROR_SELECTORS {
        for node in container.query(selector).await? {
            if !node.is_displayed().await? {
                continue;
            }
            let text = node.text().await?;
            if !text.trim().is_empty() {
                return Ok(Some(text.trim().to_string()));
            }
        }
    }
    Ok(None)
}
