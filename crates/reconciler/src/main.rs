//! `docquery` -- console client for the document analytics service.
//!
//! Submits a natural-language query (or resumes a known job), then keeps
//! the job's status, agent messages and final result current on stdout
//! until the job completes or fails.
//!
//! ```text
//! docquery <query...>
//! docquery --resume <job-id>
//! ```
//!
//! # Environment variables
//!
//! | Variable                   | Required | Default            | Description                      |
//! |----------------------------|----------|--------------------|----------------------------------|
//! | `ANALYTICS_API_URL`        | yes      | --                 | GraphQL HTTP endpoint            |
//! | `ANALYTICS_REALTIME_URL`   | no       | API URL as `ws(s)` | GraphQL WebSocket endpoint       |
//! | `ANALYTICS_AUTH_TOKEN`     | no       | --                 | Authorization token              |
//! | `POLL_INTERVAL_MS`         | no       | `1000`             | Fallback poll period             |
//! | `IMMEDIATE_CHECK_DELAY_MS` | no       | `1000`             | Delay of the post-submit check   |

use std::process::ExitCode;
use std::sync::Arc;

use docquery_client::client::RealtimeClient;
use docquery_client::{AnalyticsApi, GraphqlNotificationChannel};
use docquery_core::job::JobStatus;
use docquery_reconciler::render::ViewPrinter;
use docquery_reconciler::{ClientConfig, JobView, Reconciler};

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: docquery <query...> | docquery --resume <job-id>";

enum Command {
    Submit(String),
    Resume(String),
}

fn parse_args(args: &[String]) -> Option<Command> {
    match args {
        [flag, job_id] if flag == "--resume" => Some(Command::Resume(job_id.clone())),
        [flag, ..] if flag == "--resume" => None,
        [] => None,
        words => Some(Command::Submit(words.join(" "))),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "docquery=info,docquery_reconciler=info,docquery_client=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = parse_args(&args) else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        api_url = %config.api_url,
        realtime_url = %config.realtime_url,
        poll_interval_ms = config.reconciler.poll_interval.as_millis() as u64,
        "Starting docquery",
    );

    let api = Arc::new(AnalyticsApi::new(
        config.api_url.clone(),
        config.auth_token.clone(),
    ));
    let channel = Arc::new(GraphqlNotificationChannel::new(RealtimeClient::new(
        config.realtime_url.clone(),
        config.auth_token.clone(),
    )));
    let mut reconciler = Reconciler::new(api, channel, config.reconciler);

    let printer = tokio::spawn(print_views(reconciler.watch()));

    let started = match command {
        Command::Submit(query) => reconciler.submit(&query).await.map_err(|e| e.to_string()),
        Command::Resume(job_id) => reconciler
            .resume_job(&job_id)
            .await
            .map_err(|e| e.to_string()),
    };

    let view = match started {
        Ok(_) => {
            let settled = tokio::select! {
                view = reconciler.run_until_settled() => Some(view),
                _ = tokio::signal::ctrl_c() => None,
            };
            settled.unwrap_or_else(|| {
                tracing::info!("Interrupted, tearing down session");
                reconciler.view()
            })
        }
        Err(e) => {
            tracing::error!(error = %e, "Could not start job");
            reconciler.view()
        }
    };

    reconciler.shutdown().await;
    // Dropping the reconciler closes the watch channel and ends the printer.
    drop(reconciler);
    let _ = printer.await;

    match view.status {
        Some(JobStatus::Completed) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

/// Print every view change until the reconciler goes away.
async fn print_views(mut views: watch::Receiver<JobView>) {
    let mut printer = ViewPrinter::new();
    loop {
        let view = views.borrow_and_update().clone();
        for line in printer.diff(&view) {
            println!("{line}");
        }
        if views.changed().await.is_err() {
            break;
        }
    }
}
