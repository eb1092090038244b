//! Single-line text inputs, the lowest-priority catch-all.

use async_trait::async_trait;

use crate::dom::DomError;
use crate::forms::{normalize_text, Control, FieldGroup, FieldKind};

use super::resolve::{resolve_answer, revised_answer_after_validation, ResolveRequest};
use super::{FieldHandler, FillContext, FillOutcome};

/// Input types no text strategy should ever touch.
const EXCLUDED_TYPES: &[&str] = &[
    "button", "submit", "checkbox", "radio", "file", "hidden", "date",
];

pub struct TextHandler;

fn eligible(control: &Control) -> bool {
    if control.tag != "input" {
        return false;
    }
    match control.input_type.as_deref() {
        None => true,
        Some(t) => !EXCLUDED_TYPES.contains(&t),
    }
}

fn is_numeric(control: &Control) -> bool {
    if control.input_type.as_deref() == Some("number") {
        return true;
    }
    if matches!(control.inputmode.as_deref(), Some("numeric") | Some("decimal")) {
        return true;
    }
    let identifier = normalize_text(&control.identifier());
    identifier.contains("numeric") || identifier.contains("number")
}

/// Values the site renders into the input as a hint rather than an answer.
fn looks_like_placeholder(value: &str) -> bool {
    let norm = normalize_text(value);
    norm.starts_with("--")
        || ["select", "choose", "enter", "search"]
            .iter()
            .any(|w| norm.starts_with(w))
}

#[async_trait]
impl FieldHandler for TextHandler {
    fn kind(&self) -> FieldKind {
        FieldKind::Text
    }

    fn can_handle(&self, group: &FieldGroup) -> bool {
        group.controls.iter().any(eligible)
    }

    async fn handle(
        &self,
        ctx: &mut FillContext<'_>,
        group: &FieldGroup,
    ) -> Result<FillOutcome, DomError> {
        let control = group
            .controls
            .iter()
            .find(|c| eligible(c))
            .ok_or_else(|| DomError::Interaction("text group lost its input".into()))?;

        // A prefilled value is the site's own state; respect it unless it
        // reads like a hint.
        if !control.value.trim().is_empty() && !looks_like_placeholder(&control.value) {
            return Ok(FillOutcome::AlreadySatisfied);
        }

        let numeric = is_numeric(control);
        let request = ResolveRequest::open(FieldKind::Text, &group.question)
            .with_control(control)
            .numeric(numeric);
        let Some(answer) = resolve_answer(ctx, request).await else {
            return Ok(FillOutcome::Unresolved("no answer resolved".into()));
        };

        control.element.clear().await?;
        control.element.type_text(&answer).await?;

        let mut current = answer;
        for _ in 0..super::resolve::MAX_VALIDATION_RETRIES {
            let revised =
                revised_answer_after_validation(ctx, group, FieldKind::Text, &current, None)
                    .await?;
            let Some(revised) = revised else { break };
            control.element.clear().await?;
            control.element.type_text(&revised).await?;
            current = revised;
        }
        Ok(FillOutcome::Filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::fake::FakeNode;
    use crate::handlers::test_support::{group_from, Fixture};
    use crate::llm_client::fake::ScriptedEngine;

    #[tokio::test]
    async fn test_fills_email_from_profile_without_engine() {
        let input = FakeNode::new("input").attr("type", "email").attr("id", "email-field");
        let container = FakeNode::new("fieldset").child(input.clone());
        let group = group_from(&container, "Email address").await;

        let engine = ScriptedEngine::new("never");
        let mut fx = Fixture::new(FakeNode::new("div").child(container.clone()));
        let outcome = TextHandler.handle(&mut fx.ctx(&engine), &group).await.unwrap();

        assert_eq!(outcome, FillOutcome::Filled);
        assert_eq!(input.value_now(), "ada.mendes@example.com");
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_prefilled_value_is_left_alone() {
        let input = FakeNode::new("input").attr("type", "text").value("Ada");
        let container = FakeNode::new("fieldset").child(input.clone());
        let group = group_from(&container, "First name").await;

        let engine = ScriptedEngine::new("never");
        let mut fx = Fixture::new(FakeNode::new("div").child(container.clone()));
        let outcome = TextHandler.handle(&mut fx.ctx(&engine), &group).await.unwrap();

        assert_eq!(outcome, FillOutcome::AlreadySatisfied);
        assert_eq!(input.value_now(), "Ada");
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_placeholder_prefill_is_replaced() {
        let input = FakeNode::new("input").attr("type", "text").value("Enter your answer");
        let container = FakeNode::new("fieldset").child(input.clone());
        let group = group_from(&container, "Years of Rust experience").await;

        let engine = ScriptedEngine::new("4");
        let mut fx = Fixture::new(FakeNode::new("div").child(container.clone()));
        let outcome = TextHandler.handle(&mut fx.ctx(&engine), &group).await.unwrap();

        assert_eq!(outcome, FillOutcome::Filled);
        assert_eq!(input.value_now(), "4");
    }

    #[tokio::test]
    async fn test_validation_rejection_triggers_one_retry() {
        let input = FakeNode::new("input").attr("type", "text");
        let error = FakeNode::new("span")
            .attr("role", "alert")
            .text("Enter a whole number");
        let container = FakeNode::new("fieldset").child(input.clone()).child(error.clone());
        let group = group_from(&container, "Notice period").await;

        let engine = ScriptedEngine::new("two weeks").reply_when("retry Notice period", "14");
        let mut fx = Fixture::new(FakeNode::new("div").child(container.clone()));
        let outcome = TextHandler.handle(&mut fx.ctx(&engine), &group).await.unwrap();

        assert_eq!(outcome, FillOutcome::Filled);
        assert_eq!(input.value_now(), "14");
        assert_eq!(fx.stats.validation_retries, 1);
        // Revised answer replaces the rejected one in the cache.
        assert_eq!(fx.cache.get(FieldKind::Text, "Notice period"), Some("14"));
    }

    #[tokio::test]
    async fn test_numeric_detection_from_inputmode() {
        let control = |node: FakeNode| async move {
            let ctrl = crate::forms::Control::snapshot(
                std::sync::Arc::new(node) as crate::dom::ElementRef
            )
            .await
            .unwrap();
            is_numeric(&ctrl)
        };
        assert!(control(FakeNode::new("input").attr("inputmode", "numeric")).await);
        assert!(control(FakeNode::new("input").attr("type", "number")).await);
        assert!(!control(FakeNode::new("input").attr("type", "text")).await);
    }
}
