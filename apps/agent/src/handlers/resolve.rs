//! Layered answer resolution shared by the fill handlers.
//!
//! Order is fixed: session cache, then profile heuristics, then the answer
//! engine. Cached answers for closed-option groups are revalidated against
//! the live option list before reuse, since two sites rarely spell their
//! options the same way. Every resolved answer is written back to the cache
//! under the group's kind and normalized question.

use tracing::{debug, warn};

use crate::forms::{normalize_text, Control, FieldGroup, FieldKind};
use crate::matcher;

use super::FillContext;

/// Option lists longer than this are truncated in the prompt; matching of
/// the reply still runs against the full list.
pub const MAX_PROMPT_OPTIONS: usize = 60;

/// How many times a rejected answer is regenerated per group. One retry is
/// deliberate: validation errors that survive a second answer are almost
/// always about the field's format, which the engine cannot see.
pub const MAX_VALIDATION_RETRIES: u8 = 1;

/// What the caller is resolving. `control` enables structural profile
/// matching, `options` switches to closed-option mode, `numeric` picks the
/// digits-only engine prompt.
pub struct ResolveRequest<'a> {
    pub kind: FieldKind,
    pub question: &'a str,
    pub control: Option<&'a Control>,
    pub options: Option<&'a [String]>,
    pub numeric: bool,
}

impl<'a> ResolveRequest<'a> {
    pub fn open(kind: FieldKind, question: &'a str) -> Self {
        Self {
            kind,
            question,
            control: None,
            options: None,
            numeric: false,
        }
    }

    pub fn with_control(mut self, control: &'a Control) -> Self {
        self.control = Some(control);
        self
    }

    pub fn with_options(mut self, options: &'a [String]) -> Self {
        self.options = Some(options);
        self
    }

    pub fn numeric(mut self, numeric: bool) -> Self {
        self.numeric = numeric;
        self
    }
}

/// Picks the option an answer refers to: exact normalized match first, then
/// substring containment in either direction.
pub fn best_option<'a>(options: &'a [String], answer: &str) -> Option<&'a str> {
    let wanted = normalize_text(answer);
    if wanted.is_empty() {
        return None;
    }
    if let Some(hit) = options.iter().find(|o| normalize_text(o) == wanted) {
        return Some(hit.as_str());
    }
    options
        .iter()
        .find(|o| {
            let norm = normalize_text(o);
            !norm.is_empty() && (norm.contains(&wanted) || wanted.contains(&norm))
        })
        .map(|o| o.as_str())
}

/// Cache → profile heuristics → engine. Returns the final fill value; for
/// closed-option requests that value is always one of the live options.
/// Resolution failure is not an error, the group is simply left unfilled.
pub async fn resolve_answer(
    ctx: &mut FillContext<'_>,
    req: ResolveRequest<'_>,
) -> Option<String> {
    // 1. Session cache, revalidated against live options.
    if let Some(cached) = ctx.cache.get(req.kind, req.question) {
        match req.options {
            None => {
                debug!("cache hit for '{}'", req.question);
                return Some(cached.to_string());
            }
            Some(options) => {
                if let Some(valid) = best_option(options, cached) {
                    debug!("cache hit for '{}' matches a live option", req.question);
                    return Some(valid.to_string());
                }
                debug!("cached answer for '{}' matches no live option", req.question);
            }
        }
    }

    // 2. Profile heuristics: structural id/name signal, then question text.
    let smart = req
        .control
        .and_then(|c| matcher::match_by_element_id(ctx.profile, c))
        .or_else(|| matcher::match_by_question_text(ctx.profile, req.question));
    if let Some(value) = smart {
        let chosen = match req.options {
            None => Some(value),
            Some(options) => best_option(options, &value).map(str::to_string),
        };
        if let Some(chosen) = chosen {
            debug!("profile heuristic resolved '{}'", req.question);
            ctx.cache.insert(req.kind, req.question, chosen.clone());
            return Some(chosen);
        }
    }

    // 3. Answer engine.
    let generated = match req.options {
        Some(options) => {
            let prompt_options = &options[..options.len().min(MAX_PROMPT_OPTIONS)];
            ctx.engine
                .answer_from_options(req.question, prompt_options)
                .await
        }
        None if req.numeric => ctx.engine.answer_numeric(req.question).await,
        None => ctx.engine.answer_textual(req.question).await,
    };
    let generated = match generated {
        Ok(answer) => answer,
        Err(err) => {
            warn!("answer generation failed for '{}': {err}", req.question);
            return None;
        }
    };

    let chosen = match req.options {
        None => Some(generated),
        Some(options) => best_option(options, &generated).map(str::to_string),
    };
    match chosen {
        Some(chosen) => {
            ctx.cache.insert(req.kind, req.question, chosen.clone());
            Some(chosen)
        }
        None => {
            warn!(
                "engine answer matched no option for '{}', leaving unfilled",
                req.question
            );
            None
        }
    }
}

/// One cycle of the validation-retry protocol: wait for the site to render
/// its verdict, and when a visible error remains, ask the engine for a
/// different answer. `Ok(None)` means either the value was accepted or no
/// better answer could be produced.
pub async fn revised_answer_after_validation(
    ctx: &mut FillContext<'_>,
    group: &FieldGroup,
    kind: FieldKind,
    previous: &str,
    options: Option<&[String]>,
) -> Result<Option<String>, crate::dom::DomError> {
    tokio::time::sleep(ctx.pacing.validation_wait).await;
    let Some(message) = crate::forms::validation_error_text(&group.container).await? else {
        return Ok(None);
    };
    warn!(
        "validation rejected '{previous}' on '{}': {message}",
        group.question
    );
    ctx.stats.validation_retries += 1;

    let revised = match options {
        Some(options) => {
            ctx.engine
                .answer_from_options_with_retry(&group.question, options, previous, &message)
                .await
        }
        None => {
            ctx.engine
                .answer_textual_with_retry(&group.question, previous, &message)
                .await
        }
    };
    let revised = match revised {
        Ok(answer) => answer,
        Err(err) => {
            warn!("retry generation failed for '{}': {err}", group.question);
            return Ok(None);
        }
    };
    let chosen = match options {
        Some(options) => match best_option(options, &revised) {
            Some(hit) => hit.to_string(),
            None => return Ok(None),
        },
        None => revised,
    };
    ctx.cache.insert(kind, &group.question, chosen.clone());
    Ok(Some(chosen))
}
