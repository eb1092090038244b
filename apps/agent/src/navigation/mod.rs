//! Wizard navigation: finding the primary action, clicking it, and
//! reclassifying the modal state from page markup.
//!
//! `ModalState` is recomputed from the live DOM on every question asked,
//! never stored. The session loop owns page ordering and retry policy; this
//! module only knows how to take one step.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::PacingPolicy;
use crate::dom::{resilient_click, DomError, ElementRef, PageHandle};
use crate::forms::normalize_text;

/// The wizard modal as read from current markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalState {
    /// No wizard modal on the page.
    Closed,
    /// A fillable form page with a Next/Continue action.
    Form,
    /// The review page before submission.
    Review,
    /// The final page carrying the submit action.
    Submit,
    Success,
    /// A visible validation or site error blocks the current step.
    Error,
    /// A modal exists but exposes no recognizable action.
    Unknown,
}

impl ModalState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ModalState::Success | ModalState::Closed)
    }
}

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("no primary action button on the current step")]
    NoPrimaryButton,

    #[error("wizard made no progress after {attempts} attempts")]
    Stuck { attempts: u32 },

    #[error(transparent)]
    Dom(#[from] DomError),
}

const MODAL_SELECTOR: &str = "[role='dialog'], .application-modal, [data-application-modal]";

const SUCCESS_SELECTOR: &str =
    "[data-application-success], .application-success, [id*='post-apply']";

const ERROR_BANNER_SELECTOR: &str = "[role='alert'], .form-error, [aria-live='assertive']";

/// Explicit machine hooks for the primary action, tried before any text
/// matching.
const PRIMARY_HOOKS: &[&str] = &["[data-wizard-primary]", "[data-primary-action]"];

/// Labels that mark a button as the primary action, most specific first.
const PRIMARY_LABELS: &[&str] = &[
    "submit application",
    "continue to next step",
    "review your application",
    "submit",
    "review",
    "continue",
    "next",
];

const GENERIC_PRIMARY: &str = "button[type='submit'], .primary-button";

const SAVE_DIALOG_SELECTOR: &str = "[data-save-progress-dialog], .save-progress-dialog";

/// A located primary action with its normalized label.
pub struct PrimaryButton {
    pub element: ElementRef,
    pub label: String,
}

impl PrimaryButton {
    fn action(&self) -> ModalState {
        if self.label.contains("submit") {
            ModalState::Submit
        } else if self.label.contains("review") {
            ModalState::Review
        } else {
            ModalState::Form
        }
    }
}

async fn usable(button: &ElementRef) -> Result<bool, DomError> {
    Ok(button.is_displayed().await? && button.attr("disabled").await?.is_none())
}

async fn label_of(button: &ElementRef) -> Result<String, DomError> {
    if let Some(aria) = button.attr("aria-label").await? {
        if !aria.trim().is_empty() {
            return Ok(normalize_text(&aria));
        }
    }
    Ok(normalize_text(&button.text().await?))
}

/// Locates the single enabled primary action inside the modal: explicit
/// hooks, then label text, then a generically styled submit button.
pub async fn find_primary_button(
    modal: &ElementRef,
) -> Result<Option<PrimaryButton>, DomError> {
    for hook in PRIMARY_HOOKS {
        if let Some(button) = modal.query_first(hook).await? {
            if usable(&button).await? {
                let label = label_of(&button).await?;
                return Ok(Some(PrimaryButton { element: button, label }));
            }
        }
    }

    for button in modal.query("button").await? {
        if !usable(&button).await? {
            continue;
        }
        let label = label_of(&button).await?;
        if PRIMARY_LABELS.iter().any(|l| label.contains(l)) {
            return Ok(Some(PrimaryButton { element: button, label }));
        }
    }

    for button in modal.query(GENERIC_PRIMARY).await? {
        if usable(&button).await? {
            let label = label_of(&button).await?;
            return Ok(Some(PrimaryButton { element: button, label }));
        }
    }
    Ok(None)
}

/// Capability trait so the session can be tested with a scripted navigator.
#[async_trait]
pub trait WizardNavigator: Send + Sync {
    async fn classify(&self, page: &dyn PageHandle) -> Result<ModalState, NavigationError>;
    async fn advance(&self, page: &dyn PageHandle) -> Result<ModalState, NavigationError>;
}

pub struct Navigator {
    pacing: PacingPolicy,
}

impl Navigator {
    pub fn new(pacing: PacingPolicy) -> Self {
        Self { pacing }
    }

    async fn modal(&self, page: &dyn PageHandle) -> Result<Option<ElementRef>, DomError> {
        page.query_first(MODAL_SELECTOR).await
    }

    async fn visible_error(&self, modal: &ElementRef) -> Result<Option<String>, DomError> {
        for node in modal.query(ERROR_BANNER_SELECTOR).await? {
            if !node.is_displayed().await? {
                continue;
            }
            let text = node.text().await?;
            if !text.trim().is_empty() {
                return Ok(Some(text.trim().to_string()));
            }
        }
        Ok(None)
    }

    /// Unchecks the incidental "follow company" box most wizards slip in
    /// next to the submit button.
    async fn uncheck_follow_company(&self, modal: &ElementRef) -> Result<(), DomError> {
        for checkbox in modal.query("input[type='checkbox']").await? {
            let id = checkbox.attr("id").await?.unwrap_or_default();
            let aria = checkbox.attr("aria-label").await?.unwrap_or_default();
            let marker = normalize_text(&format!("{id} {aria}"));
            if marker.contains("follow") && checkbox.is_checked().await? {
                debug!("unchecking follow-company box before submit");
                resilient_click(&checkbox).await?;
            }
        }
        Ok(())
    }

    /// Saves and dismisses the "save your progress?" interrupt, waiting for
    /// the wizard modal to come back.
    async fn dismiss_save_dialog(&self, page: &dyn PageHandle) -> Result<(), DomError> {
        let Some(dialog) = page.query_first(SAVE_DIALOG_SELECTOR).await? else {
            return Ok(());
        };
        info!("save-progress dialog interrupted navigation, saving");
        for button in dialog.query("button").await? {
            let label = label_of(&button).await?;
            if label.contains("save") {
                resilient_click(&button).await?;
                break;
            }
        }
        page.wait_for(MODAL_SELECTOR, self.pacing.element_timeout).await?;
        Ok(())
    }
}

#[async_trait]
impl WizardNavigator for Navigator {
    /// Pure read of the current state, no side effects.
    async fn classify(&self, page: &dyn PageHandle) -> Result<ModalState, NavigationError> {
        let Some(modal) = self.modal(page).await? else {
            return Ok(ModalState::Closed);
        };
        if modal.query_first(SUCCESS_SELECTOR).await?.is_some() {
            return Ok(ModalState::Success);
        }
        if let Some(message) = self.visible_error(&modal).await? {
            debug!("visible error blocks the step: {message}");
            return Ok(ModalState::Error);
        }
        match find_primary_button(&modal).await? {
            Some(button) => Ok(button.action()),
            None => Ok(ModalState::Unknown),
        }
    }

    /// One step: click the primary action, absorb interrupts, reclassify.
    async fn advance(&self, page: &dyn PageHandle) -> Result<ModalState, NavigationError> {
        let Some(modal) = self.modal(page).await? else {
            return Ok(ModalState::Closed);
        };
        let Some(button) = find_primary_button(&modal).await? else {
            return Err(NavigationError::NoPrimaryButton);
        };
        let submitting = button.action() == ModalState::Submit;
        if submitting {
            self.uncheck_follow_company(&modal).await?;
        }
        info!("clicking primary action '{}'", button.label);
        resilient_click(&button.element).await?;
        tokio::time::sleep(self.pacing.settle).await;

        self.dismiss_save_dialog(page).await?;

        let Some(modal) = self.modal(page).await? else {
            // Modal gone right after submit is completion, not a failure.
            return Ok(if submitting {
                ModalState::Success
            } else {
                ModalState::Closed
            });
        };
        if modal.query_first(SUCCESS_SELECTOR).await?.is_some() {
            return Ok(ModalState::Success);
        }
        if let Some(message) = self.visible_error(&modal).await? {
            warn!("step rejected: {message}");
            return Ok(ModalState::Error);
        }
        match find_primary_button(&modal).await? {
            Some(next) => Ok(next.action()),
            None => Ok(ModalState::Unknown),
        }
    }
}
