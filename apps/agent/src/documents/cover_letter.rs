//! On-demand cover-letter artifact generation.
//!
//! Invoked only when an upload group wants a cover letter and none was
//! supplied. The artifact is written into the session's temp directory and
//! reused for the rest of the session.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::errors::AppError;
use crate::llm_client::AnswerEngine;
use crate::models::profile::CandidateProfile;

/// Flattens the profile into the summary the engine drafts from.
pub fn candidate_summary(profile: &CandidateProfile) -> String {
    let mut summary = format!(
        "Name: {}\nEmail: {}\nCity: {}\n",
        profile.full_name(),
        profile.personal.email,
        profile.personal.city
    );
    for entry in &profile.education {
        summary.push_str("Education: ");
        summary.push_str(&entry.institution);
        if let Some(degree) = &entry.degree {
            summary.push_str(" — ");
            summary.push_str(degree);
        }
        summary.push('\n');
    }
    for link in &profile.links {
        summary.push_str(&format!("{}: {}\n", link.platform, link.url));
    }
    summary
}

pub async fn generate_cover_letter(
    engine: &dyn AnswerEngine,
    profile: &CandidateProfile,
    dir: &Path,
) -> Result<PathBuf, AppError> {
    let body = engine.draft_cover_letter(&candidate_summary(profile)).await?;
    let path = dir.join("cover_letter.txt");
    tokio::fs::write(&path, &body).await?;
    info!("generated cover letter artifact at {}", path.display());
    Ok(path)
}
