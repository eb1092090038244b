//! Upload groups: classify what document the field wants, reuse an already
//! uploaded card when one matches, otherwise attach the file and verify the
//! resulting card is selected.

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::documents::{detect_document_type, DocumentKind};
use crate::dom::{resilient_click, DomError, ElementRef};
use crate::forms::{normalize_text, FieldGroup, FieldKind};

use super::{FieldHandler, FillContext, FillOutcome};

/// Cards rendered for previously uploaded documents.
const CARD_SELECTOR: &str = "[data-document-card], .document-card";

const UPLOAD_MARKERS: &[&str] = &["upload", "attach", "hochladen", "joindre", "adjuntar"];

pub struct FileUploadHandler;

fn mentions_upload(group: &FieldGroup) -> bool {
    let question = normalize_text(&group.question);
    if UPLOAD_MARKERS.iter().any(|m| question.contains(m)) {
        return true;
    }
    group.controls.iter().any(|c| {
        let identifier = normalize_text(&c.identifier());
        UPLOAD_MARKERS.iter().any(|m| identifier.contains(m))
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| normalize_text(&s.to_string_lossy()))
        .unwrap_or_default()
}

async fn card_matching(
    group: &FieldGroup,
    stem: &str,
) -> Result<Option<ElementRef>, DomError> {
    if stem.is_empty() {
        return Ok(None);
    }
    for card in group.container.query(CARD_SELECTOR).await? {
        let text = normalize_text(&card.text().await?);
        if text.contains(stem) {
            return Ok(Some(card));
        }
    }
    Ok(None)
}

#[async_trait]
impl FieldHandler for FileUploadHandler {
    fn kind(&self) -> FieldKind {
        FieldKind::FileUpload
    }

    fn can_handle(&self, group: &FieldGroup) -> bool {
        group.has_input_of("file") || mentions_upload(group)
    }

    async fn handle(
        &self,
        ctx: &mut FillContext<'_>,
        group: &FieldGroup,
    ) -> Result<FillOutcome, DomError> {
        let kind = detect_document_type(group);
        debug!("upload group '{}' classified as {kind:?}", group.question);

        let path = match kind {
            DocumentKind::Resume => ctx.documents.resume_path().await,
            DocumentKind::CoverLetter => {
                match ctx.documents.cover_letter_path(ctx.engine, ctx.profile).await {
                    Ok(path) => path,
                    Err(err) => {
                        warn!("cover letter unavailable: {err}");
                        return Ok(FillOutcome::Unresolved("no cover letter".into()));
                    }
                }
            }
            DocumentKind::Other => {
                return Ok(FillOutcome::Unresolved(
                    "requested document type is not on file".into(),
                ));
            }
        };
        let stem = file_stem(&path);

        // An existing card for the same file means the document was already
        // uploaded on an earlier visit; selecting it beats re-uploading.
        if let Some(card) = card_matching(group, &stem).await? {
            if !card.is_checked().await? {
                resilient_click(&card).await?;
            }
            info!("reused uploaded document card for '{}'", group.question);
            return Ok(FillOutcome::AlreadySatisfied);
        }

        let Some(input) = group.inputs_of("file").into_iter().next() else {
            return Ok(FillOutcome::Unresolved("upload group has no file input".into()));
        };
        input.element.set_files(&[path.clone()]).await?;
        info!("attached {} for '{}'", path.display(), group.question);

        // Let the site render the new card, then make sure it is the
        // selected one.
        tokio::time::sleep(ctx.pacing.settle).await;
        if let Some(card) = card_matching(group, &stem).await? {
            if !card.is_checked().await? {
                resilient_click(&card).await?;
            }
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
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_resume_field_gets_resume_file() {
        let input = FakeNode::new("input")
            .attr("type", "file")
            .attr("id", "upload-resume-urn:li:document:1");
        let container = FakeNode::new("fieldset").child(input.clone());
        let group = group_from(&container, "Resume").await;

        let engine = ScriptedEngine::new("never");
        let mut fx = Fixture::new(FakeNode::new("div").child(container.clone()));
        let outcome = FileUploadHandler.handle(&mut fx.ctx(&engine), &group).await.unwrap();

        assert_eq!(outcome, FillOutcome::Filled);
        assert_eq!(input.files_now(), vec![PathBuf::from("/tmp/resume.pdf")]);
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_existing_card_is_reused_instead_of_uploading() {
        let input = FakeNode::new("input")
            .attr("type", "file")
            .attr("id", "upload-resume-urn:li:document:2");
        let card = FakeNode::new("div")
            .attr("class", "document-card")
            .text("resume.pdf · uploaded 3 days ago");
        let container = FakeNode::new("fieldset").child(card.clone()).child(input.clone());
        let group = group_from(&container, "Resume").await;

        let engine = ScriptedEngine::new("never");
        let mut fx = Fixture::new(FakeNode::new("div").child(container.clone()));
        let outcome = FileUploadHandler.handle(&mut fx.ctx(&engine), &group).await.unwrap();

        assert_eq!(outcome, FillOutcome::AlreadySatisfied);
        assert_eq!(card.click_count(), 1);
        assert!(input.files_now().is_empty());
    }

    #[tokio::test]
    async fn test_generic_upload_generates_cover_letter() {
        let input = FakeNode::new("input")
            .attr("type", "file")
            .attr("id", "jobs-document-upload-file-input-urn:li:fsu:9");
        let container = FakeNode::new("fieldset").child(input.clone());
        let group = group_from(&container, "Additional documents").await;

        let engine = ScriptedEngine::new("Dear hiring team,");
        let mut fx = Fixture::new(FakeNode::new("div").child(container.clone()));
        let outcome = FileUploadHandler.handle(&mut fx.ctx(&engine), &group).await.unwrap();

        assert_eq!(outcome, FillOutcome::Filled);
        assert_eq!(engine.calls(), 1);
        let attached = input.files_now();
        assert_eq!(attached.len(), 1);
        assert!(attached[0].ends_with("cover_letter.txt"));
        let body = std::fs::read_to_string(&attached[0]).unwrap();
        assert_eq!(body, "Dear hiring team,");
    }

    #[tokio::test]
    async fn test_transcript_request_is_declined() {
        let input = FakeNode::new("input").attr("type", "file").attr("id", "attachment");
        let container = FakeNode::new("fieldset").child(input.clone());
        let group = group_from(&container, "Upload your academic transcript").await;

        let engine = ScriptedEngine::new("never");
        let mut fx = Fixture::new(FakeNode::new("div").child(container.clone()));
        let outcome = FileUploadHandler.handle(&mut fx.ctx(&engine), &group).await.unwrap();

        assert!(matches!(outcome, FillOutcome::Unresolved(_)));
        assert!(input.files_now().is_empty());
    }
}
