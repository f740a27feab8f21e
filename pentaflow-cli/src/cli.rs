//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no I/O happens here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Pentaflow -- multi-backend security scan orchestration.
///
/// Use `pentaflow <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "pentaflow", version, about, long_about = None)]
pub struct Cli {
    /// Path to the pentaflow.toml configuration file.
    #[arg(short, long, default_value = "pentaflow.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a full scan session against one target.
    Scan(ScanArgs),

    /// Normalize the stored raw results of a session into findings.
    Findings(FindingsArgs),

    /// Show session metadata and per-backend progress.
    Status(StatusArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- scan ----

/// Run every backend of a profile against a target.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Target: IP literal, host name or URL.
    pub target: String,

    /// Scan profile (white, gray, black or one defined in the config).
    #[arg(short, long, default_value = "white")]
    pub profile: String,

    /// File holding a base64-encoded tunnel configuration.
    #[arg(long)]
    pub tunnel_config: Option<PathBuf>,

    /// Use this session id instead of generating one.
    #[arg(long)]
    pub session_id: Option<String>,

    /// Also normalize and print findings once the session ends.
    #[arg(long)]
    pub findings: bool,
}

// ---- findings ----

/// Normalize stored results.
#[derive(Args, Debug)]
pub struct FindingsArgs {
    /// Session id.
    pub session_id: String,

    /// Minimum severity to report (info, low, medium, high, critical).
    #[arg(long, default_value = "info")]
    pub min_severity: String,
}

// ---- status ----

/// Display session progress.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Session id.
    pub session_id: String,

    /// Include the full audit log.
    #[arg(short, long)]
    pub verbose: bool,
}

// ---- config ----

/// Manage pentaflow configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, store, dispatch, tunnel, profiles, backends).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_scan_defaults() {
        let cli = Cli::try_parse_from(["pentaflow", "scan", "example.com"]).expect("should parse");
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.target, "example.com");
                assert_eq!(args.profile, "white", "profile should default to white");
                assert!(args.tunnel_config.is_none());
                assert!(args.session_id.is_none());
                assert!(!args.findings);
            }
            _ => panic!("expected Scan command"),
        }
        assert_eq!(cli.output, OutputFormat::Text);
        assert_eq!(cli.config, PathBuf::from("pentaflow.toml"));
    }

    #[test]
    fn test_cli_parse_scan_all_options() {
        let cli = Cli::try_parse_from([
            "pentaflow",
            "scan",
            "https://example.com/login",
            "--profile",
            "gray",
            "--tunnel-config",
            "/tmp/client.b64",
            "--session-id",
            "abc123",
            "--findings",
        ])
        .expect("should parse");
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.profile, "gray");
                assert_eq!(args.tunnel_config, Some(PathBuf::from("/tmp/client.b64")));
                assert_eq!(args.session_id.as_deref(), Some("abc123"));
                assert!(args.findings);
            }
            _ => panic!("expected Scan command"),
        }
    }

    #[test]
    fn test_cli_parse_scan_requires_target() {
        assert!(Cli::try_parse_from(["pentaflow", "scan"]).is_err());
    }

    #[test]
    fn test_cli_parse_findings_min_severity() {
        let cli = Cli::try_parse_from(["pentaflow", "findings", "s1", "--min-severity", "high"])
            .expect("should parse");
        match cli.command {
            Commands::Findings(args) => {
                assert_eq!(args.session_id, "s1");
                assert_eq!(args.min_severity, "high");
            }
            _ => panic!("expected Findings command"),
        }
    }

    #[test]
    fn test_cli_parse_status_verbose() {
        let cli = Cli::try_parse_from(["pentaflow", "status", "s1", "-v"]).expect("should parse");
        match cli.command {
            Commands::Status(args) => assert!(args.verbose),
            _ => panic!("expected Status command"),
        }
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["pentaflow", "config", "show", "--section", "dispatch"])
            .expect("should parse");
        match cli.command {
            Commands::Config(args) => match args.action {
                ConfigAction::Show { section } => assert_eq!(section.as_deref(), Some("dispatch")),
                ConfigAction::Validate => panic!("expected Show action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_global_output_after_subcommand() {
        let cli = Cli::try_parse_from(["pentaflow", "status", "s1", "--output", "json"])
            .expect("global flag should be accepted after subcommand");
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_cli_rejects_unknown_output_format() {
        assert!(Cli::try_parse_from(["pentaflow", "--output", "yaml", "status", "s1"]).is_err());
    }

    #[test]
    fn test_cli_debug_assert() {
        Cli::command().debug_assert();
    }
}
