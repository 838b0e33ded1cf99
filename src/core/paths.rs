//! Well-known filesystem locations: config file, activity log, export target.

use std::env;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "KEDASTRAL_TUI_CONFIG";

const APP_DIR: &str = "kedastral-tui";

/// Current user's home directory, if `HOME` is set.
pub fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

/// Default config file: `$KEDASTRAL_TUI_CONFIG`, else
/// `~/.config/kedastral-tui/config.toml`.
#[must_use]
pub fn default_config_path() -> PathBuf {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV).filter(|raw| !raw.is_empty()) {
        return PathBuf::from(path);
    }
    config_path_under(home_dir().as_deref())
}

fn config_path_under(home: Option<&Path>) -> PathBuf {
    home.map_or_else(
        || env::temp_dir().join(APP_DIR),
        |home| home.join(".config").join(APP_DIR),
    )
    .join("config.toml")
}

/// Default JSONL activity log: `~/.local/state/kedastral-tui/activity.jsonl`.
#[must_use]
pub fn default_activity_log_path() -> PathBuf {
    home_dir()
        .map_or_else(
            || env::temp_dir().join(APP_DIR),
            |home| home.join(".local").join("state").join(APP_DIR),
        )
        .join("activity.jsonl")
}

/// Directory that exports land in: `~/Downloads` when it exists, else the
/// home directory, else the current directory.
#[must_use]
pub fn export_dir() -> PathBuf {
    export_dir_under(home_dir().as_deref())
}

/// [`export_dir`] with an explicit home directory.
#[must_use]
pub fn export_dir_under(home: Option<&Path>) -> PathBuf {
    match home {
        Some(home) => {
            let downloads = home.join("Downloads");
            if downloads.is_dir() {
                downloads
            } else {
                home.to_path_buf()
            }
        }
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_lives_under_dot_config() {
        let path = config_path_under(Some(Path::new("/home/op")));
        assert_eq!(
            path,
            PathBuf::from("/home/op/.config/kedastral-tui/config.toml")
        );
    }

    #[test]
    fn export_prefers_downloads_when_present() {
        let home = tempfile::tempdir().unwrap();
        assert_eq!(export_dir_under(Some(home.path())), home.path());

        std::fs::create_dir(home.path().join("Downloads")).unwrap();
        assert_eq!(
            export_dir_under(Some(home.path())),
            home.path().join("Downloads")
        );
    }
}
