//! CLI-side helpers shared by the binary: the first-run wizard and the
//! rules for when it may run.
#![allow(missing_docs)]

pub mod wizard;

use crate::core::config::Config;
use crate::core::errors::KedastralError;

/// What startup does about a configuration that is missing required fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupGate {
    /// Nothing is missing.
    Ready,
    /// Prompt on the terminal.
    RunWizard,
    /// Missing fields and no way to ask for them.
    Refuse,
}

/// Decide whether startup can prompt for missing fields.
///
/// The wizard runs only when something is missing, `--no-setup` was not
/// given, and stdin is a terminal.
#[must_use]
pub fn setup_gate(config: &Config, no_setup: bool, interactive: bool) -> SetupGate {
    if !config.needs_setup() {
        SetupGate::Ready
    } else if no_setup || !interactive {
        SetupGate::Refuse
    } else {
        SetupGate::RunWizard
    }
}

/// Validation error naming the fields that still need values.
#[must_use]
pub fn setup_required_error(config: &Config) -> KedastralError {
    let mut missing = Vec::new();
    if config.forecaster_url.is_empty() {
        missing.push("--forecaster-url");
    }
    if config.workload.is_empty() {
        missing.push("--workload");
    }
    KedastralError::SetupRequired {
        details: format!(
            "missing {} (pass the flags, set them in {}, or run `kedastral-tui setup`)",
            missing.join(" and "),
            config.config_file.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorClass;

    fn configured() -> Config {
        Config {
            forecaster_url: "http://forecaster:8081".to_string(),
            workload: "api".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn complete_config_never_prompts() {
        assert_eq!(setup_gate(&configured(), false, true), SetupGate::Ready);
        assert_eq!(setup_gate(&configured(), true, false), SetupGate::Ready);
    }

    #[test]
    fn wizard_needs_a_terminal_and_permission() {
        let empty = Config::default();
        assert_eq!(setup_gate(&empty, false, true), SetupGate::RunWizard);
        assert_eq!(setup_gate(&empty, true, true), SetupGate::Refuse);
        assert_eq!(setup_gate(&empty, false, false), SetupGate::Refuse);
    }

    #[test]
    fn refusal_names_missing_flags() {
        let mut config = configured();
        config.workload.clear();
        let err = setup_required_error(&config);
        assert_eq!(err.class(), ErrorClass::Validation);
        let text = err.to_string();
        assert!(text.contains("--workload"));
        assert!(!text.contains("--forecaster-url"));
    }
}
