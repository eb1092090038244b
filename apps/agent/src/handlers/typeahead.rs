//! Typeahead / autocomplete inputs.
//!
//! These widgets need keystroke pacing (they fetch suggestions per
//! keystroke) and a second step: picking from the suggestion list once it
//! renders. When no list appears before the timeout the typed literal is
//! left standing, which most sites accept.

use async_trait::async_trait;
use tracing::debug;

use crate::dom::{resilient_click, DomError, ElementRef};
use crate::forms::{normalize_text, Control, FieldGroup, FieldKind};
use crate::matcher;

use super::{FieldHandler, FillContext, FillOutcome};

const LISTBOX_SELECTOR: &str = "[role='listbox']";
const OPTION_SELECTOR: &str = "[role='option']";

const TYPEAHEAD_MARKERS: &[&str] = &["typeahead", "autocomplete", "combobox", "search"];

pub struct TypeaheadHandler;

fn is_typeahead(control: &Control) -> bool {
    if control.tag != "input" {
        return false;
    }
    if control.role.as_deref() == Some("combobox") {
        return true;
    }
    let identifier = normalize_text(&control.identifier());
    TYPEAHEAD_MARKERS.iter().any(|m| identifier.contains(m))
}

async fn pick_suggestion(listbox: &ElementRef, answer: &str) -> Result<bool, DomError> {
    let options = listbox.query(OPTION_SELECTOR).await?;
    if options.is_empty() {
        return Ok(false);
    }
    let wanted = normalize_text(answer);
    let mut best: Option<&ElementRef> = None;
    for option in &options {
        let text = normalize_text(&option.text().await?);
        if text == wanted {
            best = Some(option);
            break;
        }
        if best.is_none() && (text.contains(&wanted) || wanted.contains(&text)) {
            best = Some(option);
        }
    }
    // An unmatched suggestion list still has to be resolved somehow; the
    // first entry is the site's own best guess for what was typed.
    let chosen = best.unwrap_or(&options[0]);
    resilient_click(chosen).await?;
    Ok(true)
}

#[async_trait]
impl FieldHandler for TypeaheadHandler {
    fn kind(&self) -> FieldKind {
        FieldKind::Typeahead
    }

    fn can_handle(&self, group: &FieldGroup) -> bool {
        group.controls.iter().any(is_typeahead)
    }

    async fn handle(
        &self,
        ctx: &mut FillContext<'_>,
        group: &FieldGroup,
    ) -> Result<FillOutcome, DomError> {
        let control = group
            .controls
            .iter()
            .find(|c| is_typeahead(c))
            .ok_or_else(|| DomError::Interaction("typeahead group lost its input".into()))?;

        if !control.value.trim().is_empty() {
            return Ok(FillOutcome::AlreadySatisfied);
        }

        // Typeaheads are nearly always location/school/company fields, so
        // profile heuristics run before the cache here.
        let answer = match matcher::match_by_element_id(ctx.profile, control)
            .or_else(|| matcher::match_by_question_text(ctx.profile, &group.question))
        {
            Some(value) => {
                ctx.cache
                    .insert(FieldKind::Typeahead, &group.question, value.clone());
                value
            }
            None => match ctx.cache.get(FieldKind::Typeahead, &group.question) {
                Some(cached) => cached.to_string(),
                None => match ctx.engine.answer_textual(&group.question).await {
                    Ok(generated) => {
                        ctx.cache
                            .insert(FieldKind::Typeahead, &group.question, generated.clone());
                        generated
                    }
                    Err(err) => {
                        debug!("typeahead generation failed for '{}': {err}", group.question);
                        return Ok(FillOutcome::Unresolved("no answer resolved".into()));
                    }
                },
            },
        };

        control.element.clear().await?;
        for ch in answer.chars() {
            control.element.type_text(&ch.to_string()).await?;
            tokio::time::sleep(ctx.pacing.keystroke_delay).await;
        }

        let listbox = ctx
            .page
            .wait_for(LISTBOX_SELECTOR, ctx.pacing.element_timeout)
            .await?;
        match listbox {
            Some(listbox) => {
                if !pick_suggestion(&listbox, &answer).await? {
                    debug!("empty suggestion list for '{}', literal stands", group.question);
                }
            }
            None => {
                debug!("no suggestion list for '{}', literal stands", group.question);
            }
        }
        Ok(FillOutcome::Filled)
    }
}
