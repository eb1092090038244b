//! Checkboxes: consent boxes, multi-select question blocks, and the
//! force-check fallback used on a validation retry pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::dom::{resilient_click, DomError};
use crate::forms::{normalize_text, Control, FieldGroup, FieldKind};

use super::{FieldHandler, FillContext, FillOutcome};

/// Phrases that mark a consent/acknowledgement box. These are always
/// checked without asking the engine; declining them just blocks the
/// application.
const CONSENT_KEYWORDS: &[&str] = &[
    "i agree",
    "i accept",
    "i consent",
    "i certify",
    "i acknowledge",
    "i have read",
    "terms and conditions",
    "terms of use",
    "terms of service",
    "privacy policy",
    "ich stimme",
    "einverstanden",
    "datenschutz",
    "j'accepte",
    "politique de confidentialite",
    "acepto",
    "politica de privacidad",
];

pub struct CheckboxHandler {
    /// Set by the dispatcher on a validation retry pass. A required but
    /// unchecked box is the most common reason a page refuses to advance,
    /// so the retry pass checks everything.
    retry_mode: Arc<AtomicBool>,
}

impl CheckboxHandler {
    pub fn new(retry_mode: Arc<AtomicBool>) -> Self {
        Self { retry_mode }
    }
}

fn is_consent(text: &str) -> bool {
    let norm = normalize_text(text);
    CONSENT_KEYWORDS.iter().any(|k| norm.contains(k))
}

/// Extracts the 1-based option numbers from an engine reply like "1,3" or
/// "options 2 and 4". Out-of-range numbers are dropped.
fn parse_selection(reply: &str, option_count: usize) -> Vec<usize> {
    let mut picked = Vec::new();
    for token in reply.split(|c: char| !c.is_ascii_digit()) {
        if token.is_empty() {
            continue;
        }
        if let Ok(n) = token.parse::<usize>() {
            if (1..=option_count).contains(&n) && !picked.contains(&n) {
                picked.push(n);
            }
        }
    }
    picked
}

fn says_yes(reply: &str) -> bool {
    let norm = normalize_text(reply);
    norm.starts_with("yes") || norm.starts_with("check") || norm == "y"
}

async fn label_of(group: &FieldGroup, checkbox: &Control) -> Result<String, DomError> {
    if let Some(id) = &checkbox.id {
        if let Some(label) = group
            .container
            .query_first(&format!("label[for='{id}']"))
            .await?
        {
            let text = label.text().await?;
            if !text.trim().is_empty() {
                return Ok(text.trim().to_string());
            }
        }
    }
    if let Some(aria) = &checkbox.aria_label {
        if !aria.trim().is_empty() {
            return Ok(aria.trim().to_string());
        }
    }
    Ok(group.question.clone())
}

#[async_trait]
impl FieldHandler for CheckboxHandler {
    fn kind(&self) -> FieldKind {
        FieldKind::Checkbox
    }

    fn can_handle(&self, group: &FieldGroup) -> bool {
        group.has_input_of("checkbox")
    }

    async fn handle(
        &self,
        ctx: &mut FillContext<'_>,
        group: &FieldGroup,
    ) -> Result<FillOutcome, DomError> {
        let checkboxes = group.inputs_of("checkbox");

        if self.retry_mode.load(Ordering::SeqCst) {
            let mut clicked = false;
            for checkbox in &checkboxes {
                if !checkbox.element.is_checked().await? {
                    resilient_click(&checkbox.element).await?;
                    clicked = true;
                }
            }
            debug!("retry pass force-checked group '{}'", group.question);
            return Ok(if clicked {
                FillOutcome::Filled
            } else {
                FillOutcome::AlreadySatisfied
            });
        }

        if checkboxes.len() == 1 {
            let checkbox = checkboxes[0];
            if checkbox.element.is_checked().await? {
                return Ok(FillOutcome::AlreadySatisfied);
            }
            let label = label_of(group, checkbox).await?;
            if is_consent(&label) || is_consent(&group.question) {
                resilient_click(&checkbox.element).await?;
                return Ok(FillOutcome::Filled);
            }
            let prompt = format!(
                "Question: {}\nCheckbox label: {label}\nShould this checkbox be checked?",
                group.question
            );
            match ctx.engine.answer_checkbox_question(&prompt).await {
                Ok(reply) if says_yes(&reply) => {
                    resilient_click(&checkbox.element).await?;
                    Ok(FillOutcome::Filled)
                }
                Ok(_) => Ok(FillOutcome::AlreadySatisfied),
                Err(err) => {
                    warn!("checkbox decision failed for '{}': {err}", group.question);
                    Ok(FillOutcome::Unresolved("no checkbox decision".into()))
                }
            }
        } else {
            let mut labels = Vec::new();
            for checkbox in &checkboxes {
                labels.push(label_of(group, checkbox).await?);
            }
            let numbered = labels
                .iter()
                .enumerate()
                .map(|(i, l)| format!("{}. {l}", i + 1))
                .collect::<Vec<_>>()
                .join("\n");
            let prompt = format!(
                "Question: {}\nOptions:\n{numbered}\nWhich options should be checked? \
                Reply with the numbers separated by commas, or \"none\".",
                group.question
            );
            let reply = match ctx.engine.answer_checkbox_question(&prompt).await {
                Ok(reply) => reply,
                Err(err) => {
                    warn!("checkbox decision failed for '{}': {err}", group.question);
                    return Ok(FillOutcome::Unresolved("no checkbox decision".into()));
                }
            };
            let picked = parse_selection(&reply, checkboxes.len());
            if picked.is_empty() {
                debug!("engine checked nothing for '{}'", group.question);
                return Ok(FillOutcome::AlreadySatisfied);
            }
            for n in picked {
                let checkbox = checkboxes[n - 1];
                if !checkbox.element.is_checked().await? {
                    resilient_click(&checkbox.element).await?;
                }
            }
            Ok(FillOutcome::Filled)
        }
    }
}
