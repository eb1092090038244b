//! Radio groups. Options come from the sibling labels; the pick is applied
//! by clicking the label, which is what a person does and what custom-styled
//! radios usually require.

use async_trait::async_trait;
use tracing::debug;

use crate::dom::{resilient_click, DomError, ElementRef};
use crate::forms::{Control, FieldGroup, FieldKind};

use super::resolve::{resolve_answer, revised_answer_after_validation, ResolveRequest};
use super::{FieldHandler, FillContext, FillOutcome};

pub struct RadioHandler;

struct RadioOption {
    label: String,
    /// The element to click: the label when one exists, the input otherwise.
    target: ElementRef,
    input: ElementRef,
}

async fn collect_options(
    group: &FieldGroup,
    radios: &[&Control],
) -> Result<Vec<RadioOption>, DomError> {
    let mut options = Vec::new();
    for radio in radios {
        let mut label_text = None;
        let mut target = radio.element.clone();
        if let Some(id) = &radio.id {
            if let Some(label) = group
                .container
                .query_first(&format!("label[for='{id}']"))
                .await?
            {
                let text = label.text().await?;
                if !text.trim().is_empty() {
                    label_text = Some(text.trim().to_string());
                }
                target = label;
            }
        }
        let label = match label_text {
            Some(text) => text,
            // Unlabelled radios still carry a value attribute.
            None => radio
                .element
                .attr("value")
                .await?
                .unwrap_or_default()
                .trim()
                .to_string(),
        };
        if label.is_empty() {
            debug!("skipping radio option with no label or value");
            continue;
        }
        options.push(RadioOption {
            label,
            target,
            input: radio.element.clone(),
        });
    }
    Ok(options)
}

impl RadioHandler {
    async fn select(
        options: &[RadioOption],
        label: &str,
    ) -> Result<(), DomError> {
        let option = options
            .iter()
            .find(|o| o.label == label)
            .ok_or_else(|| DomError::Interaction(format!("no radio labelled '{label}'")))?;
        resilient_click(&option.target).await?;
        // Custom-styled widgets sometimes swallow the label click.
        if !option.input.is_checked().await? {
            resilient_click(&option.input).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl FieldHandler for RadioHandler {
    fn kind(&self) -> FieldKind {
        FieldKind::Radio
    }

    fn can_handle(&self, group: &FieldGroup) -> bool {
        group.has_input_of("radio")
    }

    async fn handle(
        &self,
        ctx: &mut FillContext<'_>,
        group: &FieldGroup,
    ) -> Result<FillOutcome, DomError> {
        let radios = group.inputs_of("radio");
        for radio in &radios {
            if radio.element.is_checked().await? {
                return Ok(FillOutcome::AlreadySatisfied);
            }
        }

        let options = collect_options(group, &radios).await?;
        if options.is_empty() {
            return Ok(FillOutcome::Unresolved("radio group has no options".into()));
        }
        let labels: Vec<String> = options.iter().map(|o| o.label.clone()).collect();

        let request =
            ResolveRequest::open(FieldKind::Radio, &group.question).with_options(&labels);
        let Some(answer) = resolve_answer(ctx, request).await else {
            return Ok(FillOutcome::Unresolved("no option resolved".into()));
        };
        Self::select(&options, &answer).await?;

        let mut current = answer;
        for _ in 0..super::resolve::MAX_VALIDATION_RETRIES {
            let revised = revised_answer_after_validation(
                ctx,
                group,
                FieldKind::Radio,
                &current,
                Some(&labels),
            )
            .await?;
            let Some(revised) = revised else { break };
            Self::select(&options, &revised).await?;
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

    fn radio_group(labels: &[&str]) -> (FakeNode, Vec<FakeNode>) {
        let container = FakeNode::new("fieldset");
        let mut inputs = Vec::new();
        for (i, label) in labels.iter().enumerate() {
            let id = format!("opt-{i}");
            let input = FakeNode::new("input").attr("type", "radio").attr("id", &id);
            container.add_child(&input);
            container.add_child(&FakeNode::new("label").attr("for", &id).text(label));
            inputs.push(input);
        }
        (container, inputs)
    }

    #[tokio::test]
    async fn test_paraphrased_answer_selects_closest_option() {
        let (container, inputs) = radio_group(&["Yes", "No"]);
        let group = group_from(&container, "Are you authorized to work in Germany?").await;

        // Engine replies with a sentence, not the bare option.
        let engine = ScriptedEngine::new("Yes, I am authorized");
        let mut fx = Fixture::new(FakeNode::new("div").child(container.clone()));
        let outcome = RadioHandler.handle(&mut fx.ctx(&engine), &group).await.unwrap();

        assert_eq!(outcome, FillOutcome::Filled);
        assert!(inputs[0].checked_now());
        assert!(!inputs[1].checked_now());
        // The matched option text is what gets cached, not the paraphrase.
        assert_eq!(
            fx.cache
                .get(FieldKind::Radio, "Are you authorized to work in Germany?"),
            Some("Yes")
        );
    }

    #[tokio::test]
    async fn test_already_checked_radio_is_respected() {
        let (container, inputs) = radio_group(&["Remote", "Hybrid", "On-site"]);
        inputs[1].set_checked(true);
        let group = group_from(&container, "Preferred work setup").await;

        let engine = ScriptedEngine::new("never");
        let mut fx = Fixture::new(FakeNode::new("div").child(container.clone()));
        let outcome = RadioHandler.handle(&mut fx.ctx(&engine), &group).await.unwrap();

        assert_eq!(outcome, FillOutcome::AlreadySatisfied);
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_unlabelled_radios_fall_back_to_value_attr() {
        let container = FakeNode::new("fieldset")
            .child(FakeNode::new("input").attr("type", "radio").attr("value", "daily"))
            .child(FakeNode::new("input").attr("type", "radio").attr("value", "weekly"));
        let group = group_from(&container, "Availability").await;

        let engine = ScriptedEngine::new("weekly");
        let mut fx = Fixture::new(FakeNode::new("div").child(container.clone()));
        let outcome = RadioHandler.handle(&mut fx.ctx(&engine), &group).await.unwrap();
        assert_eq!(outcome, FillOutcome::Filled);
    }

    #[tokio::test]
    async fn test_validation_rejection_picks_different_option() {
        let (container, inputs) = radio_group(&["0-1 years", "2-4 years", "5+ years"]);
        let error = FakeNode::new("span").attr("role", "alert").text("Pick a valid range");
        container.add_child(&error);
        let group = group_from(&container, "Experience range").await;

        let engine = ScriptedEngine::new("0-1 years")
            .reply_when("retry Experience range", "5+ years");
        let mut fx = Fixture::new(FakeNode::new("div").child(container.clone()));
        let outcome = RadioHandler.handle(&mut fx.ctx(&engine), &group).await.unwrap();

        assert_eq!(outcome, FillOutcome::Filled);
        assert!(inputs[2].checked_now());
        assert_eq!(fx.stats.validation_retries, 1);
    }
}
