//! Field handlers — the eight strategies a field group can be handled by.
//!
//! Every handler implements the same two-method contract: `can_handle` is a
//! cheap synchronous structural test over the group's control snapshots,
//! `handle` performs the side-effecting fill. The dispatcher offers each
//! group to the handlers in a fixed priority order and the first acceptor
//! wins, so groups matching several predicates (a `<select>` plus a hidden
//! text fallback, say) are handled deterministically.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::PacingPolicy;
use crate::documents::DocumentStore;
use crate::dom::{DomError, PageHandle};
use crate::forms::{AnswerCache, FieldGroup, FieldKind};
use crate::llm_client::AnswerEngine;
use crate::models::profile::CandidateProfile;

pub mod checkbox;
pub mod date;
pub mod dropdown;
pub mod file_upload;
pub mod radio;
pub mod resolve;
pub mod text;
pub mod textarea;
pub mod typeahead;

pub use checkbox::CheckboxHandler;
pub use date::DateHandler;
pub use dropdown::DropdownHandler;
pub use file_upload::FileUploadHandler;
pub use radio::RadioHandler;
pub use text::TextHandler;
pub use textarea::TextareaHandler;
pub use typeahead::TypeaheadHandler;

/// Everything a handler may touch while filling one group. Constructed per
/// page by the session; the cache is the only mutable state.
pub struct FillContext<'a> {
    pub page: &'a dyn PageHandle,
    pub profile: &'a CandidateProfile,
    pub engine: &'a dyn AnswerEngine,
    pub cache: &'a mut AnswerCache,
    pub documents: &'a DocumentStore,
    pub pacing: &'a PacingPolicy,
    /// Textareas already holding more than this are treated as filled.
    pub prefilled_threshold: usize,
    pub stats: &'a mut PageStats,
}

/// What happened to one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    Filled,
    /// The site already holds an acceptable value; nothing was touched.
    AlreadySatisfied,
    /// No answer could be resolved; the group is left as-is and the site's
    /// own validation will surface the omission.
    Unresolved(String),
}

/// Per-page fill accounting, aggregated into session stats by the caller.
#[derive(Debug, Default, Clone)]
pub struct PageStats {
    pub filled: u32,
    pub already_satisfied: u32,
    pub unresolved: u32,
    pub unclassified: u32,
    pub validation_retries: u32,
}

#[async_trait]
pub trait FieldHandler: Send + Sync {
    fn kind(&self) -> FieldKind;

    /// Cheap structural test. Must not touch the DOM.
    fn can_handle(&self, group: &FieldGroup) -> bool;

    /// Side-effecting fill.
    async fn handle(
        &self,
        ctx: &mut FillContext<'_>,
        group: &FieldGroup,
    ) -> Result<FillOutcome, DomError>;
}

/// Offers groups to handlers in fixed priority order: file-upload →
/// checkbox → radio → dropdown → date → typeahead → textarea → text.
pub struct Dispatcher {
    handlers: Vec<Box<dyn FieldHandler>>,
    checkbox_retry: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let checkbox_retry = Arc::new(AtomicBool::new(false));
        let handlers: Vec<Box<dyn FieldHandler>> = vec![
            Box::new(FileUploadHandler),
            Box::new(CheckboxHandler::new(checkbox_retry.clone())),
            Box::new(RadioHandler),
            Box::new(DropdownHandler),
            Box::new(DateHandler),
            Box::new(TypeaheadHandler),
            Box::new(TextareaHandler),
            Box::new(TextHandler),
        ];
        Self {
            handlers,
            checkbox_retry,
        }
    }

    /// First handler whose predicate accepts the group.
    pub fn classify(&self, group: &FieldGroup) -> Option<&dyn FieldHandler> {
        self.handlers
            .iter()
            .map(|h| h.as_ref())
            .find(|h| h.can_handle(group))
    }

    /// After a failed validation pass the checkbox handler force-checks
    /// every unchecked box to guarantee forward progress.
    pub fn set_retry_mode(&self, on: bool) {
        self.checkbox_retry.store(on, Ordering::SeqCst);
    }

    /// Fills every group on the page. A failure in one handler is logged
    /// and isolated; it never aborts the page, let alone the session.
    pub async fn process_page(&self, ctx: &mut FillContext<'_>, groups: &[FieldGroup]) {
        for group in groups {
            let Some(handler) = self.classify(group) else {
                debug!("no handler for group '{}', skipping", group.question);
                ctx.stats.unclassified += 1;
                continue;
            };
            debug!(
                "group '{}' handled as {}",
                group.question,
                handler.kind()
            );
            match handler.handle(ctx, group).await {
                Ok(FillOutcome::Filled) => ctx.stats.filled += 1,
                Ok(FillOutcome::AlreadySatisfied) => ctx.stats.already_satisfied += 1,
                Ok(FillOutcome::Unresolved(reason)) => {
                    warn!("group '{}' left unfilled: {reason}", group.question);
                    ctx.stats.unresolved += 1;
                }
                Err(err) => {
                    warn!(
                        "handler {} failed on group '{}': {err}",
                        handler.kind(),
                        group.question
                    );
                    ctx.stats.unresolved += 1;
                }
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
