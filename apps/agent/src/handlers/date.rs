//! Date groups: native date inputs, month/year select pairs, and plain
//! text inputs that want a date.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::dom::DomError;
use crate::forms::{normalize_text, Control, FieldGroup, FieldKind};

use super::resolve::{resolve_answer, ResolveRequest};
use super::{FieldHandler, FillContext, FillOutcome};

pub struct DateHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    pub year: i32,
    pub month: u32,
    /// Absent for "March 2024" style answers.
    pub day: Option<u32>,
}

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").unwrap());
static US_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").unwrap());
static MONTH_DAY_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z]{3,9})\s+(\d{1,2}),?\s+(\d{4})$").unwrap());
static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z]{3,9})\.?,?\s+(\d{4})$").unwrap());

const MONTHS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

fn month_number(name: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| m.starts_with(name) || name.starts_with(&m[..3]))
        .map(|i| i as u32 + 1)
}

/// Parses the handful of formats answers actually come back in. Month names
/// are English; the engine is prompted in English.
pub fn parse_date(answer: &str) -> Option<ParsedDate> {
    let norm = normalize_text(answer);

    if let Some(caps) = ISO_DATE.captures(&norm) {
        return Some(ParsedDate {
            year: caps[1].parse().ok()?,
            month: caps[2].parse().ok()?,
            day: Some(caps[3].parse().ok()?),
        });
    }
    if let Some(caps) = US_DATE.captures(&norm) {
        return Some(ParsedDate {
            year: caps[3].parse().ok()?,
            month: caps[1].parse().ok()?,
            day: Some(caps[2].parse().ok()?),
        });
    }
    if let Some(caps) = MONTH_DAY_YEAR.captures(&norm) {
        return Some(ParsedDate {
            year: caps[3].parse().ok()?,
            month: month_number(&caps[1])?,
            day: Some(caps[2].parse().ok()?),
        });
    }
    if let Some(caps) = MONTH_YEAR.captures(&norm) {
        return Some(ParsedDate {
            year: caps[2].parse().ok()?,
            month: month_number(&caps[1])?,
            day: None,
        });
    }
    None
}

fn is_month_select(control: &Control) -> bool {
    control.tag == "select" && normalize_text(&control.identifier()).contains("month")
}

fn is_year_select(control: &Control) -> bool {
    control.tag == "select" && normalize_text(&control.identifier()).contains("year")
}

/// A month select next to a year select is one date question, not two
/// dropdowns; the dropdown handler defers these.
pub(super) fn is_month_year_pair(group: &FieldGroup) -> bool {
    group.controls.iter().any(is_month_select) && group.controls.iter().any(is_year_select)
}

fn question_mentions_date(question: &str) -> bool {
    normalize_text(question)
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|w| matches!(w, "date" | "start" | "end"))
}

fn text_input(group: &FieldGroup) -> Option<&Control> {
    group.controls.iter().find(|c| {
        c.tag == "input"
            && matches!(c.input_type.as_deref(), None | Some("text"))
    })
}

async fn select_month(control: &Control, month: u32) -> Result<(), DomError> {
    let name = MONTHS[(month - 1) as usize];
    let capitalized = {
        let mut s = name.to_string();
        s[..1].make_ascii_uppercase();
        s
    };
    // Sites disagree on month labels; try the common spellings in order.
    for label in [
        capitalized,
        name.to_string(),
        month.to_string(),
        format!("{month:02}"),
    ] {
        if control.element.select_by_label(&label).await.is_ok() {
            return Ok(());
        }
    }
    Err(DomError::Interaction(format!("no month option for {month}")))
}

#[async_trait]
impl FieldHandler for DateHandler {
    fn kind(&self) -> FieldKind {
        FieldKind::Date
    }

    fn can_handle(&self, group: &FieldGroup) -> bool {
        if group.has_input_of("date") {
            return true;
        }
        if is_month_year_pair(group) {
            return true;
        }
        question_mentions_date(&group.question)
            && (group.controls.iter().any(|c| c.tag == "select") || text_input(group).is_some())
    }

    async fn handle(
        &self,
        ctx: &mut FillContext<'_>,
        group: &FieldGroup,
    ) -> Result<FillOutcome, DomError> {
        let request = ResolveRequest::open(FieldKind::Date, &group.question);
        let Some(answer) = resolve_answer(ctx, request).await else {
            return Ok(FillOutcome::Unresolved("no date resolved".into()));
        };
        let parsed = parse_date(&answer);

        if let Some(date_input) = group.inputs_of("date").first() {
            // Prefilled native date inputs hold stale defaults more often
            // than real answers; always overwrite.
            date_input.element.clear().await?;
            let value = match parsed {
                Some(d) => format!("{:04}-{:02}-{:02}", d.year, d.month, d.day.unwrap_or(1)),
                None => answer.clone(),
            };
            date_input.element.type_text(&value).await?;
            return Ok(FillOutcome::Filled);
        }

        let month = group.controls.iter().find(|c| is_month_select(c));
        let year = group.controls.iter().find(|c| is_year_select(c));
        if let (Some(month_sel), Some(year_sel), Some(date)) = (month, year, parsed) {
            select_month(month_sel, date.month).await?;
            year_sel.element.select_by_label(&date.year.to_string()).await?;
            return Ok(FillOutcome::Filled);
        }

        if let Some(control) = text_input(group) {
            control.element.clear().await?;
            control.element.type_text(&answer).await?;
            return Ok(FillOutcome::Filled);
        }

        warn!("date group '{}' has no usable control shape", group.question);
        Ok(FillOutcome::Unresolved("unsupported date controls".into()))
    }
}
