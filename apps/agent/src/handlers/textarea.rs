//! Multi-line free text. Essay questions land here, so answers are almost
//! always engine-generated.

use async_trait::async_trait;

use crate::dom::DomError;
use crate::forms::{FieldGroup, FieldKind};

use super::resolve::{resolve_answer, revised_answer_after_validation, ResolveRequest};
use super::{FieldHandler, FillContext, FillOutcome};

pub struct TextareaHandler;

#[async_trait]
impl FieldHandler for TextareaHandler {
    fn kind(&self) -> FieldKind {
        FieldKind::Textarea
    }

    fn can_handle(&self, group: &FieldGroup) -> bool {
        group.controls.iter().any(|c| c.tag == "textarea")
    }

    async fn handle(
        &self,
        ctx: &mut FillContext<'_>,
        group: &FieldGroup,
    ) -> Result<FillOutcome, DomError> {
        let control = group
            .controls
            .iter()
            .find(|c| c.tag == "textarea")
            .ok_or_else(|| DomError::Interaction("textarea group lost its control".into()))?;

        // Long prefilled content means the candidate (or the site) already
        // wrote an answer here.
        if control.value.chars().count() > ctx.prefilled_threshold {
            return Ok(FillOutcome::AlreadySatisfied);
        }

        let request = ResolveRequest::open(FieldKind::Textarea, &group.question);
        let Some(answer) = resolve_answer(ctx, request).await else {
            return Ok(FillOutcome::Unresolved("no answer resolved".into()));
        };

        control.element.clear().await?;
        control.element.type_text(&answer).await?;

        let mut current = answer;
        for _ in 0..super::resolve::MAX_VALIDATION_RETRIES {
            let revised =
                revised_answer_after_validation(ctx, group, FieldKind::Textarea, &current, None)
                    .await?;
            let Some(revised) = revised else { break };
            control.element.clear().await?;
            control.element.type_text(&revised).await?;
            current = revised;
        }
        Ok(FillOutcome::Filled)
    }
}
