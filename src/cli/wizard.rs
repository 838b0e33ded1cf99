//! Guided first-run setup.
//!
//! The wizard asks for the forecaster URL, the scaler URL, and the workload,
//! shows a summary, and merges the answers into the configuration record.
//! Prompts run over generic `BufRead`/`Write` so tests can drive them.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use serde::Serialize;

use crate::core::config::{Config, ConfigOverrides, DEFAULT_SCALER_URL};
use crate::core::errors::{KedastralError, Result};

/// Empty or invalid answers to a required prompt are retried this many times.
pub const MAX_ATTEMPTS: usize = 3;

// ---------------------------------------------------------------------------
// Wizard output
// ---------------------------------------------------------------------------

/// Collected wizard answers ready to merge into a [`Config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WizardAnswers {
    pub forecaster_url: String,
    pub scaler_url: String,
    pub workload: String,
}

impl WizardAnswers {
    /// Layer the answers over `config`; other fields are left alone.
    pub fn apply_to(&self, config: &mut Config) {
        config.apply_overrides(&ConfigOverrides {
            forecaster_url: Some(self.forecaster_url.clone()),
            scaler_url: Some(self.scaler_url.clone()),
            workload: Some(self.workload.clone()),
            ..ConfigOverrides::default()
        });
    }
}

// ---------------------------------------------------------------------------
// Interactive flow
// ---------------------------------------------------------------------------

/// Run the interactive wizard, reading from `reader` and writing prompts to
/// `writer`. Values already in `current` are offered as defaults.
pub fn run_interactive<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    current: &Config,
) -> Result<WizardAnswers> {
    let _ = writeln!(writer, "\n  kedastral-tui: First-Run Setup\n");
    let _ = writeln!(writer, "  Point the dashboard at your forecaster and scaler.\n");

    let _ = writeln!(writer, "  [1/3] Forecaster");
    let forecaster_url = prompt_required(
        reader,
        writer,
        "Forecaster URL",
        &current.forecaster_url,
        check_url,
    )?;

    let _ = writeln!(writer);
    let _ = writeln!(writer, "  [2/3] Scaler");
    let scaler_default = if current.scaler_url.is_empty() {
        DEFAULT_SCALER_URL
    } else {
        &current.scaler_url
    };
    let scaler_url = prompt_required(reader, writer, "Scaler URL", scaler_default, check_url)?;

    let _ = writeln!(writer);
    let _ = writeln!(writer, "  [3/3] Workload");
    let workload = prompt_required(reader, writer, "Workload name", &current.workload, |_| Ok(()))?;

    let answers = WizardAnswers {
        forecaster_url,
        scaler_url,
        workload,
    };

    let _ = writeln!(writer);
    display_summary(writer, &answers);

    if !prompt_confirm(reader, writer, "Save this configuration?")? {
        return Err(KedastralError::SetupRequired {
            details: "setup cancelled by user".to_string(),
        });
    }
    Ok(answers)
}

/// Run the wizard, merge the answers into `config`, and save it to
/// `config.config_file`. Returns the written path.
pub fn run_setup<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    config: &mut Config,
) -> Result<PathBuf> {
    let answers = run_interactive(reader, writer, config)?;
    answers.apply_to(config);
    let path = config.save(&config.config_file)?;
    let _ = writeln!(writer, "\n  Configuration saved to {}\n", path.display());
    Ok(path)
}

fn prompt_required<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    label: &str,
    default: &str,
    check: impl Fn(&str) -> std::result::Result<(), String>,
) -> Result<String> {
    for _ in 0..MAX_ATTEMPTS {
        if default.is_empty() {
            let _ = write!(writer, "    {label}: ");
        } else {
            let _ = write!(writer, "    {label} [{default}]: ");
        }
        writer.flush().map_err(stdio_error)?;

        let Some(input) = read_line(reader).map_err(stdio_error)? else {
            return Err(KedastralError::SetupRequired {
                details: format!("input closed before {label} was given"),
            });
        };
        let answer = if input.trim().is_empty() {
            default.trim()
        } else {
            input.trim()
        };
        if answer.is_empty() {
            let _ = writeln!(writer, "    A value is required.");
            continue;
        }
        match check(answer) {
            Ok(()) => return Ok(answer.trim_end_matches('/').to_string()),
            Err(reason) => {
                let _ = writeln!(writer, "    {reason}");
            }
        }
    }
    Err(KedastralError::SetupRequired {
        details: format!("no valid {label} after {MAX_ATTEMPTS} attempts"),
    })
}

fn check_url(raw: &str) -> std::result::Result<(), String> {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        Ok(())
    } else {
        Err("URL must start with http:// or https://".to_string())
    }
}

fn prompt_confirm<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    message: &str,
) -> Result<bool> {
    let _ = write!(writer, "  {message} [Y/n]: ");
    writer.flush().map_err(stdio_error)?;

    let input = read_line(reader).map_err(stdio_error)?.unwrap_or_default();
    Ok(!input.trim().eq_ignore_ascii_case("n"))
}

fn display_summary<W: Write>(writer: &mut W, answers: &WizardAnswers) {
    let _ = writeln!(writer, "  Configuration summary");
    let _ = writeln!(writer, "    Forecaster: {}", answers.forecaster_url);
    let _ = writeln!(writer, "    Scaler:     {}", answers.scaler_url);
    let _ = writeln!(writer, "    Workload:   {}", answers.workload);
}

/// One line without its terminator, or `None` at end of input.
fn read_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(
        line.trim_end_matches('\n').trim_end_matches('\r').to_string(),
    ))
}

fn stdio_error(source: io::Error) -> KedastralError {
    KedastralError::io("<stdio>", source)
}
