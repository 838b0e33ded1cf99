//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use kedastral_tui::cli::wizard;
use kedastral_tui::cli::{SetupGate, setup_gate, setup_required_error};
use kedastral_tui::core::config::{Config, ConfigOverrides, parse_duration};
use kedastral_tui::core::errors::{ErrorClass, KedastralError};
use kedastral_tui::logger::activity::spawn_logger;
use kedastral_tui::logger::jsonl::{JsonlConfig, Severity};
use kedastral_tui::tui::theme::{AccessibilityProfile, ThemeName};
use kedastral_tui::tui::{DashboardRuntimeConfig, run_dashboard};

/// Live terminal dashboard for the kedastral forecaster and scaler.
#[derive(Debug, Parser)]
#[command(
    name = "kedastral-tui",
    author,
    version,
    about = "Live terminal dashboard for kedastral forecasts and scaling decisions",
    long_about = None
)]
pub struct Cli {
    /// Forecaster base URL.
    #[arg(long, global = true, value_name = "URL")]
    forecaster_url: Option<String>,
    /// Scaler base URL (metrics and health).
    #[arg(long, global = true, value_name = "URL")]
    scaler_url: Option<String>,
    /// Workload to display.
    #[arg(long, global = true, value_name = "NAME")]
    workload: Option<String>,
    /// Time between refresh cycles (500ms, 5s, 1m, or bare seconds).
    #[arg(long, global = true, value_name = "DURATION", value_parser = parse_duration_arg)]
    refresh_interval: Option<Duration>,
    /// How far ahead the highlighted replica decision is.
    #[arg(long, global = true, value_name = "DURATION", value_parser = parse_duration_arg)]
    lead_time: Option<Duration>,
    /// Minimum severity written to the activity log.
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<Severity>,
    /// Color theme.
    #[arg(long, global = true, value_name = "dark|light", value_parser = parse_theme_arg)]
    theme: Option<ThemeName>,
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Never launch the setup wizard; fail when settings are missing.
    #[arg(long, global = true)]
    no_setup: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute; the dashboard runs when omitted.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the first-run wizard and write the config file.
    Setup,
    /// Print the effective configuration and where it was loaded from.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    /// Print JSON instead of TOML.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

fn parse_duration_arg(raw: &str) -> Result<Duration, String> {
    parse_duration(raw).map_err(|e| e.to_string())
}

fn parse_theme_arg(raw: &str) -> Result<ThemeName, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "dark" => Ok(ThemeName::Dark),
        "light" => Ok(ThemeName::Light),
        other => Err(format!("unknown theme {other:?} (expected dark or light)")),
    }
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid configuration or usage.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 2,
            Self::Runtime(_) | Self::Json(_) | Self::Io(_) => 1,
        }
    }
}

impl From<KedastralError> for CliError {
    fn from(err: KedastralError) -> Self {
        match err.class() {
            ErrorClass::Validation => Self::User(err.to_string()),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        None => run_live(cli),
        Some(Command::Setup) => run_setup(cli),
        Some(Command::Config(args)) => run_config(cli, args),
        Some(Command::Completions(args)) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            forecaster_url: self.forecaster_url.clone(),
            scaler_url: self.scaler_url.clone(),
            workload: self.workload.clone(),
            refresh_interval: self.refresh_interval,
            lead_time: self.lead_time,
            log_level: self.log_level,
            theme: self.theme,
        }
    }
}

/// Defaults → file → environment → flags.
fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_overrides(&cli.overrides());
    Ok(config)
}

fn run_live(cli: &Cli) -> Result<(), CliError> {
    let mut config = load_config(cli)?;

    match setup_gate(&config, cli.no_setup, io::stdin().is_terminal()) {
        SetupGate::Ready => {}
        SetupGate::Refuse => return Err(setup_required_error(&config).into()),
        SetupGate::RunWizard => {
            let stdin = io::stdin();
            let mut reader = stdin.lock();
            wizard::run_setup(&mut reader, &mut io::stdout(), &mut config)?;
        }
    }
    config.validate()?;

    let (logger, logger_join) = spawn_logger(JsonlConfig {
        path: config.activity_log_path(),
        min_severity: config.log_level,
        ..JsonlConfig::default()
    })?;

    let mut runtime = DashboardRuntimeConfig::new(config);
    if cli.no_color {
        runtime.accessibility = AccessibilityProfile::from_no_color_flag(true);
    }
    let outcome = run_dashboard(runtime, &logger);

    logger.shutdown();
    let _ = logger_join.join();
    outcome.map_err(CliError::from)
}

fn run_setup(cli: &Cli) -> Result<(), CliError> {
    let mut config = load_config(cli)?;
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut stdout = io::stdout();
    let path = wizard::run_setup(&mut reader, &mut stdout, &mut config)?;
    writeln!(
        stdout,
        "{} run {} to open the dashboard ({})",
        "Ready:".green().bold(),
        "kedastral-tui".bold(),
        path.display()
    )?;
    Ok(())
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let path = &config.config_file;
    let exists = path.exists();

    if args.json {
        let payload = json!({
            "path": path.to_string_lossy(),
            "exists": exists,
            "config": serde_json::to_value(&config)?,
        });
        write_json_line(&payload)
    } else {
        let mut stdout = io::stdout().lock();
        let origin = if exists {
            format!("# loaded from {}", path.display())
        } else {
            format!("# {} does not exist; defaults in use", path.display())
        };
        writeln!(stdout, "{}", origin.dimmed())?;
        write!(stdout, "{}", config.to_toml()?)?;
        Ok(())
    }
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}
