use std::path::Path;
use std::process;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vidq::config::{ConfigStore, config_path};
use vidq::credentials::{CredentialRefreshService, GoogleOAuthClient, TokenStore};
use vidq::domain::QuotaClock;
use vidq::ingest::{EventIngestor, FsWatcher};
use vidq::logging::{self, DEFAULT_LOG_DIR};
use vidq::presenter::ConsoleDashboard;
use vidq::scheduler::{self, SchedulerMessage, SchedulerService, UploadScheduler};
use vidq::upload::YouTubeTransport;
use vidq::utils::http_client;

/// Set to skip launching a browser for the consent flow.
const NO_BROWSER_ENV: &str = "VIDQ_NO_BROWSER";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let path = config_path();
    let config = match ConfigStore::load(&path) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("{e}");
            eprintln!(
                "Make sure you have a {} file in the working directory (or set VIDQ_CONFIG).",
                path.display()
            );
            process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(config: Arc<ConfigStore>) -> anyhow::Result<()> {
    let _log_guard = logging::init_logging(Path::new(DEFAULT_LOG_DIR))?;
    let settings = config.snapshot();
    info!(
        config = %config.path().display(),
        root = %settings.root_folder.display(),
        "vidq starting"
    );

    let time_zone = settings.scheduler.time_zone()?;
    let tick_interval = settings.scheduler.tick_interval();

    http_client::install_rustls_provider();
    let client = http_client::build_client().context("Failed to build HTTP client")?;

    let cancel = CancellationToken::new();
    let (handle, mailbox) = scheduler::channel(cancel.clone());

    let tokens = Arc::new(TokenStore::new(settings.access_tokens.clone()));
    let oauth = GoogleOAuthClient::new(client.clone(), settings.credentials.web.clone());
    let consent_handle = handle.clone();
    let mut refresher = CredentialRefreshService::new(oauth, tokens.clone(), config.clone())
        .with_consent_listener(Box::new(move |url| {
            if let Err(e) = consent_handle.try_send(SchedulerMessage::ConsentRequired(url.to_string())) {
                warn!(error = %e, "Could not report consent URL to the dashboard");
            }
        }));
    if std::env::var_os(NO_BROWSER_ENV).is_some() {
        refresher = refresher.without_browser();
    }

    let scheduler = UploadScheduler::new(&settings.root_folder, tokens)
        .with_quota_clock(QuotaClock::new(time_zone))
        .with_failure_policy(settings.scheduler.failure_policy)
        .with_upload_settings(settings.upload.clone());

    let service = SchedulerService::new(
        scheduler,
        Arc::new(YouTubeTransport::new(client)),
        Arc::new(refresher),
        handle.clone(),
        mailbox,
    )
    .with_presenter(Box::new(ConsoleDashboard::stdout(tick_interval)))
    .with_tick_interval(tick_interval);
    let mut service_task = tokio::spawn(service.run());

    let _watcher = FsWatcher::start(&settings.root_folder, EventIngestor::new(handle.clone()))
        .with_context(|| format!("Failed to watch {}", settings.root_folder.display()))?;

    logging::start_retention_cleanup(DEFAULT_LOG_DIR.into(), cancel.child_token());

    let finished = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "Failed to listen for Ctrl-C");
            }
            info!("Shutdown requested");
            None
        }
        result = &mut service_task => Some(result),
    };
    let finished = match finished {
        Some(result) => {
            if !handle.is_cancelled() {
                warn!("Scheduler exited before shutdown was requested");
                handle.cancel();
            }
            result
        }
        None => {
            handle.cancel();
            service_task.await
        }
    };

    let scheduler = finished.context("Scheduler task failed")?;
    info!(
        uploaded = scheduler.completed().len(),
        queued = scheduler.queue().len(),
        "vidq stopped"
    );
    Ok(())
}
