//! The session driver: fill the current page, advance the wizard, repeat
//! until a terminal state.
//!
//! One logical thread of control per application. Handlers run strictly
//! sequentially because every fill can change the DOM the next handler
//! sees; the only background work is the speculative document generation
//! owned by `DocumentStore`.

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::PacingPolicy;
use crate::documents::DocumentStore;
use crate::dom::PageHandle;
use crate::errors::AppError;
use crate::forms::{scan_page, AnswerCache};
use crate::handlers::{Dispatcher, FillContext, PageStats};
use crate::llm_client::AnswerEngine;
use crate::models::profile::CandidateProfile;
use crate::navigation::{ModalState, NavigationError, WizardNavigator};

/// Runaway guard; no real application wizard has this many pages.
const MAX_PAGES: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The wizard reached `success` (or completed by closing).
    Completed,
    /// Stopped by the caller's cancellation token.
    Stopped,
    Failed(String),
}

/// Aggregated over all pages of one session.
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    pub pages: u32,
    pub primary_clicks: u32,
    pub filled: u32,
    pub already_satisfied: u32,
    pub unresolved: u32,
    pub unclassified: u32,
    pub validation_retries: u32,
}

impl SessionStats {
    fn absorb(&mut self, page: &PageStats) {
        self.filled += page.filled;
        self.already_satisfied += page.already_satisfied;
        self.unresolved += page.unresolved;
        self.unclassified += page.unclassified;
        self.validation_retries += page.validation_retries;
    }
}

/// Outbound status messages for whoever is watching the session.
#[derive(Debug, Clone)]
pub enum StatusEvent {
    PageStarted { page: u32, state: ModalState },
    PageFilled { page: u32, stats: PageStats },
    Advanced { state: ModalState },
    Finished { outcome: SessionOutcome },
}

pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub stats: SessionStats,
}

pub struct Session<'a> {
    pub profile: &'a CandidateProfile,
    pub engine: &'a dyn AnswerEngine,
    pub documents: &'a DocumentStore,
    pub navigator: &'a dyn WizardNavigator,
    pub pacing: PacingPolicy,
    pub prefilled_threshold: usize,
    pub cancel: CancellationToken,
    pub status: Option<UnboundedSender<StatusEvent>>,
}

impl Session<'_> {
    fn emit(&self, event: StatusEvent) {
        if let Some(tx) = &self.status {
            let _ = tx.send(event);
        }
    }

    /// Drives the wizard on `page` to a terminal state. The caller owns the
    /// cache so answers can persist across applications.
    pub async fn run(
        &self,
        page: &dyn PageHandle,
        cache: &mut AnswerCache,
    ) -> Result<SessionReport, AppError> {
        let session_id = uuid::Uuid::new_v4();
        let started = chrono::Utc::now();
        info!(%session_id, "starting application session");

        let dispatcher = Dispatcher::new();
        let mut stats = SessionStats::default();
        let mut error_streak = 0u32;

        loop {
            if stats.pages >= MAX_PAGES {
                return Err(NavigationError::Stuck { attempts: MAX_PAGES }.into());
            }
            if self.cancel.is_cancelled() {
                info!("session cancelled between pages");
                let outcome = SessionOutcome::Stopped;
                self.emit(StatusEvent::Finished { outcome: outcome.clone() });
                return Ok(SessionReport { outcome, stats });
            }

            let state = self.navigator.classify(page).await?;
            match state {
                ModalState::Success => break,
                ModalState::Closed => {
                    if stats.pages == 0 {
                        let outcome =
                            SessionOutcome::Failed("wizard modal not found".to_string());
                        self.emit(StatusEvent::Finished { outcome: outcome.clone() });
                        return Ok(SessionReport { outcome, stats });
                    }
                    break;
                }
                ModalState::Unknown => {
                    let outcome = SessionOutcome::Failed(
                        "wizard modal exposes no recognizable action".to_string(),
                    );
                    self.emit(StatusEvent::Finished { outcome: outcome.clone() });
                    return Ok(SessionReport { outcome, stats });
                }
                // Form, review, submit, and the retry pass after an error
                // all get filled the same way.
                ModalState::Form | ModalState::Review | ModalState::Submit | ModalState::Error => {}
            }
            self.emit(StatusEvent::PageStarted { page: stats.pages, state });

            let groups = scan_page(page).await?;
            info!("page {} has {} field groups", stats.pages, groups.len());
            let mut page_stats = PageStats::default();
            let mut ctx = FillContext {
                page,
                profile: self.profile,
                engine: self.engine,
                cache: &mut *cache,
                documents: self.documents,
                pacing: &self.pacing,
                prefilled_threshold: self.prefilled_threshold,
                stats: &mut page_stats,
            };
            dispatcher.process_page(&mut ctx, &groups).await;
            stats.absorb(&page_stats);
            self.emit(StatusEvent::PageFilled { page: stats.pages, stats: page_stats });

            let next_state = self.navigator.advance(page).await?;
            stats.primary_clicks += 1;
            self.emit(StatusEvent::Advanced { state: next_state });

            if next_state == ModalState::Error {
                error_streak += 1;
                if error_streak > 1 {
                    warn!("page still rejected after the retry pass, giving up");
                    let outcome = SessionOutcome::Failed(
                        "validation errors persisted after retry".to_string(),
                    );
                    self.emit(StatusEvent::Finished { outcome: outcome.clone() });
                    return Ok(SessionReport { outcome, stats });
                }
                info!("step rejected, re-running the page in retry mode");
                dispatcher.set_retry_mode(true);
                continue;
            }
            dispatcher.set_retry_mode(false);
            error_streak = 0;
            stats.pages += 1;

            if next_state.is_terminal() {
                break;
            }
        }

        let outcome = SessionOutcome::Completed;
        self.emit(StatusEvent::Finished { outcome: outcome.clone() });
        let elapsed = chrono::Utc::now() - started;
        info!(
            "application completed in {}s: {} pages, {} fills, {} unresolved",
            elapsed.num_seconds(),
            stats.pages,
            stats.filled,
            stats.unresolved
        );
        Ok(SessionReport { outcome, stats })
    }
}
