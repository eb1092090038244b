mod config;
mod documents;
mod dom;
mod errors;
mod forms;
mod handlers;
mod llm_client;
mod matcher;
mod models;
mod navigation;
mod session;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::documents::DocumentStore;
use crate::forms::AnswerCache;
use crate::llm_client::{ClaudeAnswerEngine, LlmClient};
use crate::models::profile::CandidateProfile;
use crate::navigation::Navigator;
use crate::session::{Session, SessionOutcome, StatusEvent};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (panics on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting application agent v{}", env!("CARGO_PKG_VERSION"));

    let profile = CandidateProfile::load(&config.profile_path)?;
    info!("Loaded profile for {}", profile.full_name());

    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let engine = ClaudeAnswerEngine::new(llm);

    let documents = DocumentStore::new(
        config.resume_path.clone(),
        config.cover_letter_path.clone(),
    )?;
    let navigator = Navigator::new(config.pacing.clone());

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("stop requested, finishing the current page");
            ctrl_c.cancel();
        }
    });

    let (status_tx, mut status_rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(event) = status_rx.recv().await {
            match event {
                StatusEvent::PageStarted { page, state } => {
                    info!("page {page}: state {state:?}")
                }
                StatusEvent::PageFilled { page, stats } => info!(
                    "page {page}: {} filled, {} already set, {} unresolved",
                    stats.filled, stats.already_satisfied, stats.unresolved
                ),
                StatusEvent::Advanced { state } => info!("advanced, now {state:?}"),
                StatusEvent::Finished { outcome } => info!("session finished: {outcome:?}"),
            }
        }
    });

    let session = Session {
        profile: &profile,
        engine: &engine,
        documents: &documents,
        navigator: &navigator,
        pacing: config.pacing.clone(),
        prefilled_threshold: config.prefilled_threshold,
        cancel,
        status: Some(status_tx),
    };
    let mut cache = AnswerCache::new();

    let report = run_on_browser(&config, &session, &mut cache).await?;
    info!(
        "done: {:?} after {} pages, {} fills, {} validation retries",
        report.outcome, report.stats.pages, report.stats.filled, report.stats.validation_retries
    );
    if let SessionOutcome::Failed(reason) = report.outcome {
        anyhow::bail!("application failed: {reason}");
    }
    Ok(())
}

#[cfg(feature = "browser")]
async fn run_on_browser(
    config: &Config,
    session: &Session<'_>,
    cache: &mut AnswerCache,
) -> Result<session::SessionReport> {
    let url = config
        .job_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("JOB_URL is required to drive a browser session"))?;
    // The Browser handle must outlive the session or the CDP connection
    // drops mid-wizard.
    let (_browser, page) = dom::browser::open(url).await?;
    Ok(session.run(&page, cache).await?)
}

#[cfg(not(feature = "browser"))]
async fn run_on_browser(
    _config: &Config,
    _session: &Session<'_>,
    _cache: &mut AnswerCache,
) -> Result<session::SessionReport> {
    anyhow::bail!(
        "built without the `browser` feature; rebuild with --features browser to drive a real page"
    )
}
