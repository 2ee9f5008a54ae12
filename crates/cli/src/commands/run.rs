//! Run command - the poll/deliver loop

use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thread_relay_adapters::{state::FileSeenStore, telegram::TelegramSink, x::XTimelineSource};
use thread_relay_domain::{
    MessageSink, RelayOutcome, RetryPolicy, RetryingSource,
    usecases::{FormatConfig, Formatter, RelayConfig, RelayLoop},
};
use tokio::time::interval;

use crate::args::RunArgs;
use crate::config::AppConfig;

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let dry_run = args.dry_run || config.general.dry_run;

    if config.watch.account.is_empty() {
        bail!("No account configured; set [watch] account or THREAD_RELAY__WATCH__ACCOUNT");
    }

    tracing::info!(
        dry_run = dry_run,
        once = args.once,
        account = %config.watch.account,
        state_path = %config.general.state_path.display(),
        "Starting thread-relay run"
    );

    // Build dependencies
    let seen_store = Arc::new(
        FileSeenStore::open(&config.general.state_path)
            .await
            .context("Failed to open seen-ID store")?,
    );

    let retry_policy = RetryPolicy {
        max_attempts: config.retry.max_attempts,
        initial_delay: Duration::from_millis(config.retry.initial_delay_ms),
        backoff_factor: config.retry.backoff_factor,
        jitter: config.retry.jitter,
    };

    let source = Arc::new(RetryingSource::new(build_post_source(&config)?, retry_policy));

    let sink: Arc<dyn MessageSink> = if dry_run {
        Arc::new(TelegramSink::disabled())
    } else {
        Arc::new(build_sink(&config)?)
    };

    let formatter = Formatter::new(FormatConfig {
        tag: config.format.tag.clone(),
        link_base: config.format.link_base.clone(),
        link_label: config.format.link_label.clone(),
    });

    let relay_config = RelayConfig {
        account: config.watch.account.clone(),
        fetch_limit: config.watch.fetch_limit,
        thread_fetch_limit: config.watch.thread_fetch_limit,
        dry_run,
    };

    let relay = RelayLoop::new(source, sink, seen_store, formatter, relay_config);

    // Execute
    if args.once {
        tracing::info!("Running single poll cycle");
        let results = relay.poll_once().await?;
        log_outcomes(results);
    } else {
        // Continuous polling loop; each cycle's failure is contained here so
        // the process keeps running
        let poll_interval = Duration::from_secs(config.watch.poll_interval_secs);
        let mut ticker = interval(poll_interval);

        // Set up graceful shutdown
        let shutdown = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
            tracing::info!("Shutdown signal received");
        };

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match relay.poll_once().await {
                        Ok(results) => {
                            if !results.is_empty() {
                                log_outcomes(results);
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Poll cycle failed");
                        }
                    }
                    tracing::info!(secs = poll_interval.as_secs(), "Sleeping until next cycle");
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutting down gracefully");
                    break;
                }
            }
        }
    }

    tracing::info!("thread-relay run completed");
    Ok(())
}

fn log_outcomes(results: Vec<(String, RelayOutcome)>) {
    let delivered = results
        .iter()
        .filter(|(_, o)| matches!(o, RelayOutcome::Delivered))
        .count();
    tracing::info!(processed = results.len(), delivered, "Poll cycle complete");

    for (post_id, outcome) in results {
        match outcome {
            RelayOutcome::Delivered => {
                tracing::info!(post_id = %post_id, "Delivered");
            }
            RelayOutcome::Skipped { reason } => {
                tracing::debug!(post_id = %post_id, reason = %reason, "Skipped");
            }
            RelayOutcome::Failed { error } => {
                tracing::error!(post_id = %post_id, error = %error, "Failed");
            }
        }
    }
}

fn build_post_source(config: &AppConfig) -> Result<XTimelineSource> {
    let bearer_token = load_secret(&config.x.bearer_token_env, "X read")?;
    Ok(XTimelineSource::new(bearer_token))
}

fn build_sink(config: &AppConfig) -> Result<TelegramSink> {
    if config.telegram.chat_id.is_empty() {
        bail!("No Telegram chat_id configured");
    }

    let bot_token = load_secret(&config.telegram.bot_token_env, "Telegram")?;
    Ok(TelegramSink::new(bot_token, config.telegram.chat_id.clone()))
}

fn load_secret(env_name: &str, what: &str) -> Result<SecretString> {
    let value = std::env::var(env_name)
        .with_context(|| format!("Missing {} credential: set {}", what, env_name))?;

    if value.is_empty() {
        bail!("{} credential env var {} is empty", what, env_name);
    }

    Ok(SecretString::new(value.into()))
}
