//! Doctor command - validate configuration and show status

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use thread_relay_adapters::state::FileSeenStore;

use crate::args::DoctorArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    watch: CheckResult,
    state: CheckResult,
    x_read: CheckResult,
    telegram: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        watch: CheckResult::error("Not checked"),
        state: CheckResult::error("Not checked"),
        x_read: CheckResult::error("Not checked"),
        telegram: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    // Check config
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.watch = check_watch(config);
        report.state = check_state(config).await;
        report.x_read = check_env_credential(&config.x.bearer_token_env, "X bearer token");
        report.telegram = check_telegram(config);
    }

    // Determine overall status
    let checks = [
        &report.config,
        &report.watch,
        &report.state,
        &report.x_read,
        &report.telegram,
    ];

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    // Output report
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

fn check_watch(config: &AppConfig) -> CheckResult {
    if config.watch.account.is_empty() {
        return CheckResult::error("No account configured ([watch] account)");
    }

    CheckResult::ok(format!(
        "Watching account {} every {}s",
        config.watch.account, config.watch.poll_interval_secs
    ))
}

async fn check_state(config: &AppConfig) -> CheckResult {
    match FileSeenStore::open(&config.general.state_path).await {
        Ok(store) => CheckResult::ok(format!(
            "State file {} ({} ids recorded)",
            store.path().display(),
            store.len()
        )),
        Err(e) => CheckResult::error(format!(
            "Cannot open state file {}: {}",
            config.general.state_path.display(),
            e
        )),
    }
}

fn check_env_credential(env_name: &str, what: &str) -> CheckResult {
    if env_name.is_empty() {
        return CheckResult::error(format!("No env var configured for {}", what));
    }

    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => CheckResult::ok(format!("{}: {} (set)", what, env_name)),
        _ => CheckResult::error(format!("{}: {} is not set", what, env_name)),
    }
}

fn check_telegram(config: &AppConfig) -> CheckResult {
    let credential = check_env_credential(&config.telegram.bot_token_env, "Telegram bot token");
    if credential.is_error() {
        return credential;
    }

    if config.telegram.chat_id.is_empty() {
        return CheckResult::warn("Telegram chat_id is empty (only dry-run will work)");
    }

    CheckResult::ok(format!(
        "Telegram bot token set, chat_id {}",
        config.telegram.chat_id
    ))
}

fn print_report(report: &DoctorReport) {
    println!("thread-relay doctor");
    println!();
    print_check("config", &report.config);
    print_check("watch", &report.watch);
    print_check("state", &report.state);
    print_check("x_read", &report.x_read);
    print_check("telegram", &report.telegram);
    println!();
    println!("overall: {}", report.overall);
}

fn print_check(name: &str, check: &CheckResult) {
    println!("  [{:5}] {}: {}", check.status, name, check.message);
}
