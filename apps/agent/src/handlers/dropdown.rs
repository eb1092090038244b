//! Native `<select>` dropdowns.
//!
//! Two option shapes get profile-driven shortcuts before the generic
//! resolution path: school pickers (alias-aware matching against the
//! profile's latest school) and phone-prefix pickers (country-code match).

use async_trait::async_trait;
use tracing::debug;

use crate::dom::DomError;
use crate::forms::{normalize_text, Control, FieldGroup, FieldKind};
use crate::matcher;

use super::resolve::{resolve_answer, revised_answer_after_validation, ResolveRequest};
use super::{FieldHandler, FillContext, FillOutcome};

pub struct DropdownHandler;

/// "Select one", "-- choose --" and friends.
fn is_placeholder_option(text: &str) -> bool {
    let norm = normalize_text(text);
    norm.is_empty()
        || norm.starts_with("--")
        || ["select", "choose", "please", "pick"]
            .iter()
            .any(|w| norm.starts_with(w))
}

fn looks_like_school_question(question: &str) -> bool {
    let q = normalize_text(question);
    ["school", "university", "college", "institution"]
        .iter()
        .any(|k| q.contains(k))
}

fn looks_like_prefix_dropdown(question: &str, options: &[String]) -> bool {
    let q = normalize_text(question);
    if ["country code", "prefix", "dial"].iter().any(|k| q.contains(k)) {
        return true;
    }
    // Mostly "+NN" shaped options is signal enough on its own.
    let plus = options.iter().filter(|o| o.contains('+')).count();
    !options.is_empty() && plus * 2 > options.len()
}

async fn visible_options(select: &Control) -> Result<Vec<String>, DomError> {
    let mut out = Vec::new();
    for (i, option) in select.element.query("option").await?.iter().enumerate() {
        let text = option.text().await?.trim().to_string();
        if text.is_empty() {
            continue;
        }
        if i == 0 && is_placeholder_option(&text) {
            continue;
        }
        out.push(text);
    }
    Ok(out)
}

#[async_trait]
impl FieldHandler for DropdownHandler {
    fn kind(&self) -> FieldKind {
        FieldKind::Dropdown
    }

    fn can_handle(&self, group: &FieldGroup) -> bool {
        // Month/year select pairs belong to the date handler further down
        // the priority list.
        group.controls.iter().any(|c| c.tag == "select") && !super::date::is_month_year_pair(group)
    }

    async fn handle(
        &self,
        ctx: &mut FillContext<'_>,
        group: &FieldGroup,
    ) -> Result<FillOutcome, DomError> {
        let select = group
            .controls
            .iter()
            .find(|c| c.tag == "select")
            .ok_or_else(|| DomError::Interaction("dropdown group lost its select".into()))?;

        let options = visible_options(select).await?;
        if options.is_empty() {
            return Ok(FillOutcome::Unresolved("dropdown has no options".into()));
        }

        if !select.value.trim().is_empty() && !is_placeholder_option(&select.value) {
            return Ok(FillOutcome::AlreadySatisfied);
        }

        // Profile-driven shortcuts.
        let shortcut = if looks_like_school_question(&group.question) {
            matcher::match_school(ctx.profile, &options)
        } else if looks_like_prefix_dropdown(&group.question, &options) {
            matcher::match_phone_prefix(ctx.profile, &options)
        } else {
            None
        };
        let answer = match shortcut {
            Some(hit) => {
                debug!("profile shortcut picked '{hit}' for '{}'", group.question);
                let hit = hit.to_string();
                ctx.cache.insert(FieldKind::Dropdown, &group.question, hit.clone());
                hit
            }
            None => {
                let request = ResolveRequest::open(FieldKind::Dropdown, &group.question)
                    .with_options(&options);
                match resolve_answer(ctx, request).await {
                    Some(answer) => answer,
                    None => return Ok(FillOutcome::Unresolved("no option resolved".into())),
                }
            }
        };
        select.element.select_by_label(&answer).await?;

        let mut current = answer;
        for _ in 0..super::resolve::MAX_VALIDATION_RETRIES {
            let revised = revised_answer_after_validation(
                ctx,
                group,
                FieldKind::Dropdown,
                &current,
                Some(&options),
            )
            .await?;
            let Some(revised) = revised else { break };
            select.element.select_by_label(&revised).await?;
            current = revised;
        }
        Ok(FillOutcome::Filled)
    }
}
