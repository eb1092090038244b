//! Candidate profile — read-only structured input for the whole session.
//!
//! Loaded once from a JSON file and never mutated by the agent; the smart
//! matcher resolves common field semantics straight out of it.

use std::path::Path;

use serde::Deserialize;

use crate::errors::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateProfile {
    pub personal: PersonalInfo,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub links: Vec<ProfileLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: PhoneNumber,
    pub city: String,
}

/// Phone number with an optional country-prefix/national split. Some sites
/// take the full number in one control, others split prefix and national
/// number into two.
#[derive(Debug, Clone, Deserialize)]
pub struct PhoneNumber {
    #[serde(default)]
    pub prefix: Option<String>,
    pub national: String,
}

impl PhoneNumber {
    /// Full dialable number, prefix included when known.
    pub fn full(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{}", self.national),
            None => self.national.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EducationEntry {
    pub institution: String,
    #[serde(default)]
    pub degree: Option<String>,
}

/// An external profile link, keyed by platform ("linkedin", "github", ...).
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileLink {
    pub platform: String,
    pub url: String,
}

impl CandidateProfile {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Profile(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| AppError::Profile(format!("invalid profile JSON: {e}")))
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.personal.first_name, self.personal.last_name)
    }

    /// URL for a platform, matched case-insensitively.
    pub fn link(&self, platform: &str) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.platform.eq_ignore_ascii_case(platform))
            .map(|l| l.url.as_str())
    }

    pub fn latest_school(&self) -> Option<&str> {
        self.education.first().map(|e| e.institution.as_str())
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    /// Profile used across handler and matcher tests.
    pub fn sample_profile() -> CandidateProfile {
        CandidateProfile {
            personal: PersonalInfo {
                first_name: "Ada".to_string(),
                last_name: "Mendes".to_string(),
                email: "ada.mendes@example.com".to_string(),
                phone: PhoneNumber {
                    prefix: Some("+49".to_string()),
                    national: "15123456789".to_string(),
                },
                city: "Berlin".to_string(),
            },
            education: vec![EducationEntry {
                institution: "Technical University of Munich".to_string(),
                degree: Some("MSc Computer Science".to_string()),
            }],
            links: vec![
                ProfileLink {
                    platform: "linkedin".to_string(),
                    url: "https://linkedin.com/in/ada-mendes".to_string(),
                },
                ProfileLink {
                    platform: "github".to_string(),
                    url: "https://github.com/adamendes".to_string(),
                },
            ],
        }
    }
}
