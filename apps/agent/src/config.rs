use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    /// JSON file holding the candidate profile.
    pub profile_path: PathBuf,
    /// Resume file uploaded by default.
    pub resume_path: PathBuf,
    /// Pre-written cover letter. When absent one is generated on demand.
    pub cover_letter_path: Option<PathBuf>,
    /// URL of the application page the wizard opens from.
    pub job_url: Option<String>,
    pub pacing: PacingPolicy,
    /// A textarea already holding more than this many characters is treated
    /// as satisfied and skipped. Single-line text inputs use a placeholder
    /// heuristic instead; any real prefill is respected there.
    pub prefilled_threshold: usize,
    pub rust_log: String,
}

/// Delay policy for UI interaction. All waits are bounded; a timeout reads
/// as "not found", never as a hard failure.
#[derive(Debug, Clone)]
pub struct PacingPolicy {
    /// Pause between individual keystrokes when typing into typeaheads.
    pub keystroke_delay: Duration,
    /// Settle time after a fill or click before the page is re-read.
    pub settle: Duration,
    /// Wait before looking for validation errors on a just-filled group.
    pub validation_wait: Duration,
    /// Upper bound for any wait-for-element operation.
    pub element_timeout: Duration,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            keystroke_delay: Duration::from_millis(60),
            settle: Duration::from_millis(800),
            validation_wait: Duration::from_millis(500),
            element_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let pacing = PacingPolicy {
            keystroke_delay: millis_env("AGENT_KEYSTROKE_DELAY_MS", 60)?,
            settle: millis_env("AGENT_SETTLE_MS", 800)?,
            validation_wait: millis_env("AGENT_VALIDATION_WAIT_MS", 500)?,
            element_timeout: millis_env("AGENT_ELEMENT_TIMEOUT_MS", 5000)?,
        };

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            profile_path: PathBuf::from(require_env("AGENT_PROFILE_PATH")?),
            resume_path: PathBuf::from(require_env("AGENT_RESUME_PATH")?),
            cover_letter_path: std::env::var("AGENT_COVER_LETTER_PATH")
                .ok()
                .map(PathBuf::from),
            job_url: std::env::var("AGENT_JOB_URL").ok(),
            pacing,
            prefilled_threshold: std::env::var("AGENT_PREFILLED_THRESHOLD")
                .unwrap_or_else(|_| "50".to_string())
                .parse::<usize>()
                .context("AGENT_PREFILLED_THRESHOLD must be a number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn millis_env(key: &str, default_ms: u64) -> Result<Duration> {
    let ms = match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("{key} must be a millisecond count"))?,
        Err(_) => default_ms,
    };
    Ok(Duration::from_millis(ms))
}
