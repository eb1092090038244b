//! Field groups — the unit of work for the dispatcher.
//!
//! A `FieldGroup` is a transient snapshot of one semantic question on the
//! current wizard page: the container handle, the extracted question text,
//! and a structural snapshot of its interactive controls. Groups are
//! re-scanned on every page transition; handles from a previous page must
//! never be reused.

use tracing::debug;

use crate::dom::{DomError, ElementRef, PageHandle};

pub mod cache;
pub mod utils;

pub use cache::{AnswerCache, FieldKind};
pub use utils::{
    dedupe_doubled, extract_question_text, normalize_text, validation_error_text,
    UNKNOWN_QUESTION,
};

/// Selectors tried, in order, when locating field-group containers. The
/// first selector that yields any containers wins, so one page is always
/// segmented one way.
const GROUP_SELECTORS: &[&str] = &[
    "fieldset",
    "[data-form-group]",
    ".form-group",
    ".form-section",
];

const CONTROL_SELECTOR: &str = "input, select, textarea";

/// Structural snapshot of one interactive control inside a group. Captured
/// once at scan time so `can_handle` predicates stay cheap and synchronous.
#[derive(Clone)]
pub struct Control {
    pub element: ElementRef,
    /// Lowercased tag name.
    pub tag: String,
    /// Lowercased `type` attribute, inputs only.
    pub input_type: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub aria_label: Option<String>,
    pub role: Option<String>,
    pub inputmode: Option<String>,
    /// Value at scan time; used for prefill detection.
    pub value: String,
}

impl Control {
    pub async fn snapshot(element: ElementRef) -> Result<Self, DomError> {
        let tag = element.tag_name().await?.to_lowercase();
        let input_type = element.attr("type").await?.map(|t| t.to_lowercase());
        let id = element.attr("id").await?;
        let name = element.attr("name").await?;
        let aria_label = element.attr("aria-label").await?;
        let role = element.attr("role").await?.map(|r| r.to_lowercase());
        let inputmode = element.attr("inputmode").await?.map(|m| m.to_lowercase());
        let value = element.value().await?;
        Ok(Control {
            element,
            tag,
            input_type,
            id,
            name,
            aria_label,
            role,
            inputmode,
            value,
        })
    }

    /// id and name concatenated, for structural pattern checks.
    pub fn identifier(&self) -> String {
        let mut out = String::new();
        if let Some(id) = &self.id {
            out.push_str(id);
        }
        if let Some(name) = &self.name {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(name);
        }
        out
    }

    pub fn is_input_of(&self, wanted: &str) -> bool {
        self.tag == "input" && self.input_type.as_deref() == Some(wanted)
    }
}

/// One semantic question with its controls.
pub struct FieldGroup {
    pub container: ElementRef,
    pub question: String,
    pub controls: Vec<Control>,
}

impl FieldGroup {
    pub fn inputs_of(&self, input_type: &str) -> Vec<&Control> {
        self.controls
            .iter()
            .filter(|c| c.is_input_of(input_type))
            .collect()
    }

    pub fn has_input_of(&self, input_type: &str) -> bool {
        self.controls.iter().any(|c| c.is_input_of(input_type))
    }
}

/// Scans the current page into field groups. Containers without any
/// interactive control are dropped here — they are decoration, not
/// questions.
pub async fn scan_page(page: &dyn PageHandle) -> Result<Vec<FieldGroup>, DomError> {
    let mut containers = Vec::new();
    for selector in GROUP_SELECTORS {
        containers = page.query(selector).await?;
        if !containers.is_empty() {
            debug!(
                "segmented page into {} groups via '{selector}'",
                containers.len()
            );
            break;
        }
    }

    let mut groups = Vec::new();
    for container in containers {
        let mut controls = Vec::new();
        for element in container.query(CONTROL_SELECTOR).await? {
            controls.push(Control::snapshot(element).await?);
        }
        if controls.is_empty() {
            debug!("skipping control-less group container");
            continue;
        }
        let question = extract_question_text(&container, &controls).await?;
        groups.push(FieldGroup {
            container,
            question,
            controls,
        });
    }
    Ok(groups)
}
