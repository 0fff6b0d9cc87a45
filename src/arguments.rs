/// Command-line arguments for the hive-flows binary
///
/// Two subcommands mirror the two analyses. Window flags are parsed as
/// conflicting so `--hours` and `--days` together fail before any I/O.
use crate::analyzer::{CategoryMapping, InboundsRequest, OutboundsRequest};
use crate::config::CONFIG_FILE_PATH;
use crate::errors::FlowError;
use crate::logger::LoggerConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hive-flows")]
#[command(about = "Inbound and outbound value flows on the Hive and Hive-Engine ledgers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults apply when missing)
    #[arg(long, global = true, default_value = CONFIG_FILE_PATH)]
    pub config: PathBuf,

    /// Print the report as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable debug logs for tags (client,discovery,scanner,... or all)
    #[arg(long, global = true, value_delimiter = ',')]
    pub debug: Vec<String>,

    /// Append logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Value received by accounts, grouped by sender category
    Inbounds(InboundsArgs),

    /// Value sent by accounts, grouped by recipient
    Outbounds(OutboundsArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    /// Look back this many hours
    #[arg(long, conflicts_with = "days")]
    pub hours: Option<u64>,

    /// Look back this many days
    #[arg(long)]
    pub days: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct InboundsArgs {
    /// Receiving accounts
    #[arg(required = true, num_args = 1..)]
    pub receivers: Vec<String>,

    /// Native ledger sender category (key=account, repeatable)
    #[arg(long = "from", value_name = "KEY=ACCOUNT")]
    pub hive_senders: Vec<String>,

    /// Token ledger sender category (key=account, repeatable)
    #[arg(long = "token-from", value_name = "KEY=ACCOUNT")]
    pub token_senders: Vec<String>,

    #[command(flatten)]
    pub window: WindowArgs,
}

#[derive(Args, Debug, Clone)]
pub struct OutboundsArgs {
    /// Sending accounts
    #[arg(required = true, num_args = 1..)]
    pub senders: Vec<String>,

    /// Recipients to leave out of the report (repeatable or comma separated)
    #[arg(long = "ignore", value_delimiter = ',')]
    pub ignored: Vec<String>,

    #[command(flatten)]
    pub window: WindowArgs,
}

impl Cli {
    pub fn logger_config(&self) -> LoggerConfig {
        let mut config = LoggerConfig::from_flags(self.verbose, self.quiet, &self.debug);
        config.log_file = self.log_file.clone();
        config
    }
}

impl InboundsArgs {
    pub fn to_request(&self) -> Result<InboundsRequest, FlowError> {
        Ok(InboundsRequest {
            receivers: self.receivers.clone(),
            hive_senders: CategoryMapping::parse_assignments(&self.hive_senders)?,
            token_senders: CategoryMapping::parse_assignments(&self.token_senders)?,
            hours: self.window.hours,
            days: self.window.days,
        })
    }
}

impl OutboundsArgs {
    pub fn to_request(&self) -> OutboundsRequest {
        OutboundsRequest {
            senders: self.senders.clone(),
            ignored_receivers: self.ignored.clone(),
            hours: self.window.hours,
            days: self.window.days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("hive-flows").chain(args.iter().copied()))
    }

    #[test]
    fn test_inbounds_arguments() {
        let cli = parse(&[
            "inbounds",
            "alice",
            "bob",
            "--from",
            "rewards=payout",
            "--token-from",
            "rewards=payout-he",
            "--days",
            "2",
            "--json",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.config, PathBuf::from("data/config.toml"));
        let Command::Inbounds(args) = cli.command else {
            panic!("expected inbounds");
        };
        let request = args.to_request().unwrap();
        assert_eq!(request.receivers, vec!["alice", "bob"]);
        assert_eq!(request.hive_senders.account_for("rewards"), Some("payout"));
        assert_eq!(request.token_senders.account_for("rewards"), Some("payout-he"));
        assert_eq!(request.days, Some(2));
        assert_eq!(request.hours, None);
    }

    #[test]
    fn test_outbounds_ignore_list() {
        let cli = parse(&["outbounds", "alice", "--ignore", "x,y", "--ignore", "z"]).unwrap();
        let Command::Outbounds(args) = cli.command else {
            panic!("expected outbounds");
        };
        assert_eq!(args.to_request().ignored_receivers, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_hours_and_days_conflict() {
        assert!(parse(&["outbounds", "alice", "--hours", "2", "--days", "1"]).is_err());
    }

    #[test]
    fn test_malformed_assignment_is_validation_error() {
        let cli = parse(&["inbounds", "alice", "--from", "payout"]).unwrap();
        let Command::Inbounds(args) = cli.command else {
            panic!("expected inbounds");
        };
        assert!(args.to_request().unwrap_err().is_validation());
    }

    #[test]
    fn test_debug_tags_reach_logger() {
        let cli = parse(&["--debug", "client,scanner", "outbounds", "alice"]).unwrap();
        let config = cli.logger_config();
        assert_eq!(config.debug_tags.len(), 2);
    }
}
