//! Documents owned by the session: the resume to upload, an optional
//! pre-written cover letter, and artifacts generated on demand.
//!
//! The one sanctioned piece of background work lives here: a
//! tailored-resume task may be spawned before the upload group is ever
//! reached, and the FileUpload handler awaits it only when it actually
//! needs the file.

use std::path::PathBuf;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::errors::AppError;
use crate::llm_client::AnswerEngine;
use crate::models::profile::CandidateProfile;

pub mod cover_letter;
pub mod detector;

pub use detector::{detect_document_type, DocumentKind};

enum TailoredResume {
    None,
    Pending(JoinHandle<Result<PathBuf, AppError>>),
    Ready(PathBuf),
}

pub struct DocumentStore {
    base_resume: PathBuf,
    tailored: Mutex<TailoredResume>,
    cover_letter: Mutex<Option<PathBuf>>,
    /// Holds generated artifacts; removed with the session.
    artifact_dir: tempfile::TempDir,
}

impl DocumentStore {
    pub fn new(resume_path: PathBuf, cover_letter_path: Option<PathBuf>) -> Result<Self, AppError> {
        Ok(Self {
            base_resume: resume_path,
            tailored: Mutex::new(TailoredResume::None),
            cover_letter: Mutex::new(cover_letter_path),
            artifact_dir: tempfile::tempdir()?,
        })
    }

    /// Registers a background tailored-resume task. The task is awaited
    /// lazily by `resume_path`.
    pub async fn expect_tailored_resume(&self, task: JoinHandle<Result<PathBuf, AppError>>) {
        *self.tailored.lock().await = TailoredResume::Pending(task);
    }

    /// The resume to upload. Awaits a pending tailored resume first; a
    /// failed tailoring task falls back to the base resume.
    pub async fn resume_path(&self) -> PathBuf {
        let mut slot = self.tailored.lock().await;
        match std::mem::replace(&mut *slot, TailoredResume::None) {
            TailoredResume::None => self.base_resume.clone(),
            TailoredResume::Ready(path) => {
                let out = path.clone();
                *slot = TailoredResume::Ready(path);
                out
            }
            TailoredResume::Pending(task) => match task.await {
                Ok(Ok(path)) => {
                    *slot = TailoredResume::Ready(path.clone());
                    path
                }
                Ok(Err(err)) => {
                    warn!("tailored resume failed ({err}), using base resume");
                    self.base_resume.clone()
                }
                Err(err) => {
                    warn!("tailored resume task panicked ({err}), using base resume");
                    self.base_resume.clone()
                }
            },
        }
    }

    /// The cover letter to upload, generating one on demand when none was
    /// supplied.
    pub async fn cover_letter_path(
        &self,
        engine: &dyn AnswerEngine,
        profile: &CandidateProfile,
    ) -> Result<PathBuf, AppError> {
        let mut slot = self.cover_letter.lock().await;
        if let Some(path) = slot.as_ref() {
            return Ok(path.clone());
        }
        let path =
            cover_letter::generate_cover_letter(engine, profile, self.artifact_dir.path()).await?;
        *slot = Some(path.clone());
        Ok(path)
    }
}
