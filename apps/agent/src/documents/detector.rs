//! Upload-field document classification.
//!
//! Upload groups rarely say what they want in one obvious place, so the
//! rules run in decreasing order of reliability: explicit identifier
//! tokens, the generic-upload default, identifier keywords, question-text
//! keywords, then the statistical fallback (resume is by far the most
//! common upload).

use crate::forms::{normalize_text, FieldGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Resume,
    CoverLetter,
    Other,
}

const RESUME_TOKENS: &[&str] = &["resume", "lebenslauf", "curriculum"];
const COVER_TOKENS: &[&str] = &[
    "cover-letter",
    "cover_letter",
    "coverletter",
    "cover letter",
    "motivation",
    "anschreiben",
    "lettre de motivation",
    "carta de presentacion",
];
const OTHER_TOKENS: &[&str] = &[
    "transcript",
    "certificate",
    "portfolio",
    "reference letter",
    "zeugnis",
    "diplome",
];
/// Markers of a generic secondary-document upload control. Resume fields
/// are assumed to always carry an explicit resume token, so a generic
/// identifier without one reads as "not resume".
const GENERIC_UPLOAD_TOKENS: &[&str] = &["document-upload", "upload-file", "file-input"];

fn contains_any(haystack: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| haystack.contains(t))
}

fn has_resume_token(text: &str) -> bool {
    contains_any(text, RESUME_TOKENS) || has_cv_word(text)
}

/// "cv" must stand alone — it is a substring of far too many identifiers.
fn has_cv_word(text: &str) -> bool {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .any(|w| w == "cv")
}

pub fn detect_document_type(group: &FieldGroup) -> DocumentKind {
    let mut identifiers = String::new();
    for control in &group.controls {
        identifiers.push_str(&normalize_text(&control.identifier()));
        identifiers.push(' ');
        if let Some(label) = &control.aria_label {
            identifiers.push_str(&normalize_text(label));
            identifiers.push(' ');
        }
    }

    // 1. Explicit document-type token in a structural identifier.
    if contains_any(&identifiers, COVER_TOKENS) {
        return DocumentKind::CoverLetter;
    }
    if has_resume_token(&identifiers) {
        return DocumentKind::Resume;
    }

    // 2. Generic upload identifier with no resume token — secondary
    //    document, defaults to cover letter.
    if contains_any(&identifiers, GENERIC_UPLOAD_TOKENS) {
        return DocumentKind::CoverLetter;
    }

    // 3./4. Keyword match against question text.
    let question = normalize_text(&group.question);
    if contains_any(&question, COVER_TOKENS) {
        return DocumentKind::CoverLetter;
    }
    if contains_any(&question, OTHER_TOKENS) {
        return DocumentKind::Other;
    }
    if has_resume_token(&question) {
        return DocumentKind::Resume;
    }

    // 5. Statistical fallback.
    DocumentKind::Resume
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::fake::FakeNode;
    use crate::dom::ElementRef;
    use crate::forms::{Control, FieldGroup};
    use std::sync::Arc;

    async fn upload_group(id: &str, question: &str) -> FieldGroup {
        let input = FakeNode::new("input").attr("type", "file").attr("id", id);
        let container = FakeNode::new("fieldset").child(input.clone());
        FieldGroup {
            container: Arc::new(container) as ElementRef,
            question: question.to_string(),
            controls: vec![Control::snapshot(Arc::new(input) as ElementRef)
                .await
                .unwrap()],
        }
    }

    #[tokio::test]
    async fn test_explicit_cover_letter_identifier() {
        let group = upload_group("upload-cover-letter-urn:li:document:123", "Upload").await;
        assert_eq!(detect_document_type(&group), DocumentKind::CoverLetter);
    }

    #[tokio::test]
    async fn test_explicit_resume_identifier() {
        let group = upload_group("upload-resume-urn:li:document:456", "Upload").await;
        assert_eq!(detect_document_type(&group), DocumentKind::Resume);
    }

    #[tokio::test]
    async fn test_generic_upload_defaults_to_cover_letter() {
        let group =
            upload_group("jobs-document-upload-file-input-urn:li:fsu:789", "Upload").await;
        assert_eq!(detect_document_type(&group), DocumentKind::CoverLetter);
    }

    #[tokio::test]
    async fn test_question_keywords_multilingual() {
        let group = upload_group("attachment", "Bitte laden Sie Ihr Anschreiben hoch").await;
        assert_eq!(detect_document_type(&group), DocumentKind::CoverLetter);

        let group = upload_group("attachment", "Upload your academic transcript").await;
        assert_eq!(detect_document_type(&group), DocumentKind::Other);
    }

    #[tokio::test]
    async fn test_fallback_is_resume() {
        let group = upload_group("attachment", "Attach a file").await;
        assert_eq!(detect_document_type(&group), DocumentKind::Resume);
    }

    #[tokio::test]
    async fn test_cv_must_be_a_standalone_word() {
        // "cv" inside an unrelated identifier must not classify as resume.
        let group = upload_group("jobs-document-upload-file-input-cvx42", "Upload").await;
        assert_eq!(detect_document_type(&group), DocumentKind::CoverLetter);
    }
}
