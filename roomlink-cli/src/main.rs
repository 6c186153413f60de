mod cli;
mod config;
mod error;
mod output;

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use challenge_solver::InteractiveSolver;
use room_extractor::{
    ExtractionOutcome, ExtractionSession, RecoveryPipeline, RoomTarget, default_client,
};

use crate::cli::Args;
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    run(args, config).await
}

async fn run(args: Args, config: AppConfig) -> ExitCode {
    let target = match RoomTarget::parse(&args.url) {
        Ok(target) => target,
        Err(e) => {
            error!("invalid target: {e}");
            return ExitCode::FAILURE;
        }
    };

    let pipeline_config = config.into_pipeline(&args);

    let mut session = ExtractionSession::new(default_client());
    if let Some(cookies) = &args.cookies {
        session.set_cookies_from_string(cookies);
    }

    let cancel = CancellationToken::new();
    let solver =
        InteractiveSolver::new(pipeline_config.solver_config()).with_cancellation(cancel.clone());

    // Ctrl-C aborts the browser wait and tears the window down.
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let mut pipeline = RecoveryPipeline::new(session, solver, &pipeline_config);
    info!(room = target.room_id(), "starting extraction");
    let outcome = pipeline.extract(&target).await;

    output::render(&outcome, args.output);
    exit_code(&outcome)
}

fn exit_code(outcome: &ExtractionOutcome) -> ExitCode {
    match outcome {
        ExtractionOutcome::Resolved(_) => ExitCode::SUCCESS,
        ExtractionOutcome::StillChallenged => ExitCode::from(2),
        ExtractionOutcome::TimedOut => ExitCode::from(3),
        ExtractionOutcome::BrowserUnavailable => ExitCode::from(4),
        ExtractionOutcome::Failed(_) => ExitCode::FAILURE,
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}
