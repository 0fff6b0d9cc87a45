use anyhow::Context;
use clap::Parser;
use hive_flows::{
    analyzer::{FlowAnalyzer, ProgressEvent},
    arguments::{Cli, Command},
    config::ConfigStore,
    logger::{self, LogTag},
    summary, FlowError,
};
use tokio::sync::broadcast::error::RecvError;

/// Exit code for rejected requests (bad flags, malformed mappings, bad config)
const EXIT_VALIDATION: i32 = 2;
/// Exit code for any other failure
const EXIT_RUNTIME: i32 = 1;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logger::init(cli.logger_config());

    let code = match run(&cli).await {
        Ok(()) => 0,
        Err(e) => {
            logger::error(LogTag::System, &format!("{:#}", e));
            match e.downcast_ref::<FlowError>() {
                Some(FlowError::Validation(_)) | Some(FlowError::Config(_)) => EXIT_VALIDATION,
                _ => EXIT_RUNTIME,
            }
        }
    };

    logger::flush();
    std::process::exit(code);
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = ConfigStore::load(&cli.config)?;
    let analyzer = FlowAnalyzer::with_http(config).context("Failed to build HTTP transport")?;

    let progress = tokio::spawn(log_progress(analyzer.subscribe()));
    analyzer.start().await;

    let output = match &cli.command {
        Command::Inbounds(args) => {
            let response = analyzer.inbounds(args.to_request()?).await;
            response.and_then(|r| {
                if cli.json {
                    summary::render_json(&r)
                } else {
                    Ok(summary::render_inbounds(&r))
                }
            })
        }
        Command::Outbounds(args) => {
            let response = analyzer.outbounds(args.to_request()).await;
            response.and_then(|r| {
                if cli.json {
                    summary::render_json(&r)
                } else {
                    Ok(summary::render_outbounds(&r))
                }
            })
        }
    };

    analyzer.shutdown().await;
    drop(analyzer);
    let _ = progress.await;

    println!("{}", output?);
    Ok(())
}

/// Mirror analysis progress into the log until the analyzer is dropped
async fn log_progress(mut events: tokio::sync::broadcast::Receiver<ProgressEvent>) {
    loop {
        match events.recv().await {
            Ok(ProgressEvent::AccountStarted { account, index, total }) => {
                logger::info(
                    LogTag::Cli,
                    &format!("[{}/{}] Scanning @{}", index + 1, total, account),
                );
            }
            Ok(ProgressEvent::PageScanned {
                account,
                ledger,
                page,
                records,
            }) => {
                logger::debug(
                    LogTag::Cli,
                    &format!("@{} {} page {}: {} records", account, ledger, page, records),
                );
            }
            Ok(ProgressEvent::AccountFinished { account }) => {
                logger::verbose(LogTag::Cli, &format!("@{} done", account));
            }
            Ok(ProgressEvent::AccountFailed { account, error }) => {
                logger::warning(LogTag::Cli, &format!("@{} failed: {}", account, error));
            }
            Err(RecvError::Lagged(skipped)) => {
                logger::debug(LogTag::Cli, &format!("Skipped {} progress events", skipped));
            }
            Err(RecvError::Closed) => break,
        }
    }
}
