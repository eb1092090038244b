//! DOM capability traits — the only surface through which the agent touches
//! a page.
//!
//! The field handlers and the navigation loop are written against
//! `PageHandle`/`ElementHandle` trait objects, never against a concrete
//! browser. The `browser` cargo feature provides a headless-Chrome adapter;
//! tests run against the in-memory `fake` implementation.
//!
//! Waiting semantics: every wait is bounded and a timeout yields `Ok(None)`,
//! not an error, so callers can fall through to their next strategy.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(feature = "browser")]
pub mod browser;
#[cfg(test)]
pub mod fake;

/// Shared handle to a live element. Cloned freely; the backend owns the
/// actual node reference.
pub type ElementRef = Arc<dyn ElementHandle>;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Element is stale or detached: {0}")]
    Stale(String),

    #[error("Interaction failed: {0}")]
    Interaction(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// One interactive element on the page.
#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// Lowercased tag name ("input", "select", ...).
    async fn tag_name(&self) -> Result<String, DomError>;

    async fn attr(&self, name: &str) -> Result<Option<String>, DomError>;

    /// Visible text content, trimmed.
    async fn text(&self) -> Result<String, DomError>;

    /// Current value for form controls; empty string when unset.
    async fn value(&self) -> Result<String, DomError>;

    async fn is_displayed(&self) -> Result<bool, DomError>;

    /// Checked state for checkboxes/radios, selected state for options.
    async fn is_checked(&self) -> Result<bool, DomError>;

    async fn click(&self) -> Result<(), DomError>;

    /// Clears the current value of a text control.
    async fn clear(&self) -> Result<(), DomError>;

    /// Types text into the element (appends to the current value).
    async fn type_text(&self, text: &str) -> Result<(), DomError>;

    /// Selects the `<option>` with the given visible label.
    async fn select_by_label(&self, label: &str) -> Result<(), DomError>;

    /// Attaches local files to a file input.
    async fn set_files(&self, paths: &[PathBuf]) -> Result<(), DomError>;

    /// CSS query scoped to this element's subtree.
    async fn query(&self, selector: &str) -> Result<Vec<ElementRef>, DomError>;

    async fn query_first(&self, selector: &str) -> Result<Option<ElementRef>, DomError> {
        Ok(self.query(selector).await?.into_iter().next())
    }
}

/// The current wizard page.
#[async_trait]
pub trait PageHandle: Send + Sync {
    async fn query(&self, selector: &str) -> Result<Vec<ElementRef>, DomError>;

    async fn query_first(&self, selector: &str) -> Result<Option<ElementRef>, DomError> {
        Ok(self.query(selector).await?.into_iter().next())
    }

    /// Polls for an element until it appears or `timeout` elapses.
    /// A timeout is "not found", never an error.
    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Option<ElementRef>, DomError>;
}

/// Clicks an element, retrying once after a short pause when the first
/// attempt is intercepted or the node momentarily detaches.
pub async fn resilient_click(element: &ElementRef) -> Result<(), DomError> {
    match element.click().await {
        Ok(()) => Ok(()),
        Err(first) => {
            tracing::debug!("click failed ({first}), retrying once");
            tokio::time::sleep(Duration::from_millis(300)).await;
            element.click().await
        }
    }
}
