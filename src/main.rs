//! Command line interface for the Kp index monitor.
//!
//! Subcommands mirror the deployment modes: a single cron-driven check,
//! a long-lived continuous loop, an on-demand summary mail, and a mail
//! transport test. Every recognized failure inside a cycle is logged and
//! skipped; only configuration problems abort the process.

use std::path::PathBuf;
use std::time::Duration as StdDuration;

use chrono::Utc;
use clap::{Parser, Subcommand};

use kpmon_service::alert::cooldown::{AlertStateStore, check_and_update};
use kpmon_service::analysis::evaluation::evaluate;
use kpmon_service::config::MonitorConfig;
use kpmon_service::dev_mode::DevMode;
use kpmon_service::ingest::{forecast, gfz};
use kpmon_service::logging::{self, Component, LogLevel};
use kpmon_service::model::{EvaluationResult, ForecastTimeline, MonitorError};
use kpmon_service::notify;

/// Pause before retrying after an errored cycle in continuous mode.
const ERROR_RETRY: StdDuration = StdDuration::from_secs(300);

#[derive(Parser)]
#[command(name = "kpmon", about = "Kp Index Space Weather Monitor", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "kpmon.toml")]
    config: PathBuf,

    /// Replay a saved forecast CSV instead of fetching from GFZ
    #[arg(long)]
    file: Option<PathBuf>,

    /// With --file: evaluate as if "now" were this many days in the past
    #[arg(long, default_value_t = 0)]
    days_offset: i64,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run a single monitoring check and exit
    Once,
    /// Run continuous monitoring with the configured check interval
    Continuous,
    /// Send a current-conditions summary to one recipient
    Summary {
        /// Recipient address for the summary
        #[arg(long)]
        email: String,
    },
    /// Send a test mail to the configured recipients
    Test,
}

fn main() {
    let cli = Cli::parse();

    let config = match MonitorConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("kpmon: {}", e);
            std::process::exit(1);
        }
    };

    logging::init_logger(LogLevel::Info, Some(config.log_file.as_str()), true);

    let exit_code = match &cli.command {
        CliCommand::Once => match run_single_check(&config, &cli) {
            Ok(()) => 0,
            Err(e) => {
                logging::error(Component::System, None, &format!("check failed: {}", e));
                1
            }
        },
        CliCommand::Continuous => {
            run_continuous(&config, &cli);
            0
        }
        CliCommand::Summary { email } => match run_summary(&config, &cli, email) {
            Ok(()) => {
                println!("Summary email: SUCCESS");
                0
            }
            Err(e) => {
                logging::error(Component::System, None, &format!("summary failed: {}", e));
                println!("Summary email: FAILED");
                1
            }
        },
        CliCommand::Test => match run_mail_test(&config) {
            Ok(()) => {
                println!("Email test: SUCCESS");
                0
            }
            Err(e) => {
                logging::error(Component::Mail, None, &format!("mail test failed: {}", e));
                println!("Email test: FAILED");
                1
            }
        },
    };

    std::process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Forecast acquisition
// ---------------------------------------------------------------------------

/// Fetches (or replays) and parses the forecast, and picks the clock the
/// evaluation should run against.
fn acquire_timeline(
    config: &MonitorConfig,
    cli: &Cli,
) -> Result<(ForecastTimeline, chrono::DateTime<Utc>), MonitorError> {
    let (raw, now) = match &cli.file {
        Some(path) => {
            let dev = DevMode::new(path.clone()).with_days_offset(cli.days_offset);
            logging::info(
                Component::System,
                path.to_str(),
                "replaying forecast from local file",
            );
            (dev.read_forecast_csv()?, dev.simulated_now())
        }
        None => {
            logging::info(Component::Gfz, None, &format!("fetching {}", config.csv_url));
            let client = gfz::build_client()?;
            let raw = match gfz::fetch_forecast_csv(&client, &config.csv_url) {
                Ok(raw) => raw,
                Err(e) => {
                    logging::log_fetch_failure("forecast fetch", &e);
                    return Err(e);
                }
            };
            (raw, Utc::now())
        }
    };

    let timeline = forecast::parse(&raw)?;
    logging::info(
        Component::Parser,
        None,
        &format!(
            "parsed {} forecast rows ({} warnings)",
            timeline.len(),
            timeline.warnings.len()
        ),
    );
    Ok((timeline, now))
}

// ---------------------------------------------------------------------------
// Single check
// ---------------------------------------------------------------------------

fn run_single_check(config: &MonitorConfig, cli: &Cli) -> Result<(), MonitorError> {
    logging::info(Component::System, None, "starting Kp index monitoring check");

    let (timeline, now) = acquire_timeline(config, cli)?;
    let evaluation = evaluate(&timeline, config.threshold, config.statistic, now);

    log_evaluation(&evaluation);

    let store = AlertStateStore::new(&config.state_file);
    let decision = check_and_update(&store, &evaluation, now, config.cooldown());

    if decision.should_fire {
        let subject = notify::alert_subject(&evaluation);
        let body = notify::compose_alert_html(&evaluation, config, now);
        match notify::send_mail(config, &config.recipients, &subject, &body) {
            Ok(()) => logging::info(
                Component::Mail,
                None,
                &format!("alert sent to {} recipient(s)", config.recipients.len()),
            ),
            // The alert state is already persisted; a transport failure
            // must not re-arm the tracker.
            Err(e) => logging::error(Component::Mail, None, &e.to_string()),
        }
    } else {
        logging::info(
            Component::Alert,
            None,
            &format!("no alert sent: {:?}", decision.reason),
        );
    }

    logging::log_cycle_summary(
        timeline.len(),
        evaluation.breaching_rows.len(),
        evaluation.skipped_rows,
        decision.should_fire,
    );
    Ok(())
}

fn log_evaluation(evaluation: &EvaluationResult) {
    let current = evaluation
        .current_max
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "n/a".to_string());
    logging::info(
        Component::Eval,
        None,
        &format!(
            "analysis complete - current {}: {}, breaching rows: {}, aurora: {}",
            evaluation.statistic.name(),
            current,
            evaluation.breaching_rows.len(),
            evaluation.aurora_possible
        ),
    );
}

// ---------------------------------------------------------------------------
// Continuous mode
// ---------------------------------------------------------------------------

fn run_continuous(config: &MonitorConfig, cli: &Cli) {
    logging::info(Component::System, None, "starting continuous Kp index monitoring");
    logging::info(
        Component::System,
        None,
        &format!(
            "check interval: {} hours, alert threshold: {} ({})",
            config.check_interval_hours,
            config.threshold,
            config.statistic.name()
        ),
    );

    loop {
        match run_single_check(config, cli) {
            Ok(()) => {
                logging::info(
                    Component::System,
                    None,
                    &format!("waiting {} hours until next check", config.check_interval_hours),
                );
                std::thread::sleep(config.check_interval());
            }
            Err(e) => {
                // Skip this cycle; the upstream publishes again soon.
                logging::error(
                    Component::System,
                    None,
                    &format!("cycle failed, retrying in {}s: {}", ERROR_RETRY.as_secs(), e),
                );
                std::thread::sleep(ERROR_RETRY);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Summary and mail test
// ---------------------------------------------------------------------------

fn run_summary(config: &MonitorConfig, cli: &Cli, email: &str) -> Result<(), MonitorError> {
    logging::info(
        Component::System,
        None,
        &format!("generating Kp summary for {}", email),
    );

    let (timeline, now) = acquire_timeline(config, cli)?;
    let evaluation = evaluate(&timeline, config.threshold, config.statistic, now);

    let subject = notify::summary_subject(&evaluation);
    let body = notify::compose_summary_html(&timeline, &evaluation, config, now);
    notify::send_mail(config, &[email.to_string()], &subject, &body)
}

fn run_mail_test(config: &MonitorConfig) -> Result<(), MonitorError> {
    notify::send_mail(
        config,
        &config.recipients,
        "Kp Monitor Test Email",
        "<html><body><p>This is a test email from the Kp Index Monitoring System.</p></body></html>",
    )
}
