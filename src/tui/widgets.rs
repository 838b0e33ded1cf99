//! Small formatting primitives shared by the panels and the export paths.

#![allow(missing_docs)]

use std::time::Duration;

/// Braille spinner shown while a refresh cycle is in flight.
pub const SPINNER_FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
const SPINNER_FRAME_MS: u128 = 100;

/// Spinner glyph for a cycle that has been loading for `elapsed`.
#[must_use]
pub fn spinner(elapsed: Duration) -> char {
    let idx = (elapsed.as_millis() / SPINNER_FRAME_MS) % SPINNER_FRAMES.len() as u128;
    SPINNER_FRAMES[usize::try_from(idx).unwrap_or(0)]
}

/// Compact age: `42s`, `5m`, `3h`, `2d`.
#[must_use]
pub fn human_age(age: Duration) -> String {
    let secs = age.as_secs();
    match secs {
        0..60 => format!("{secs}s"),
        60..3_600 => format!("{}m", secs / 60),
        3_600..86_400 => format!("{}h", secs / 3_600),
        _ => format!("{}d", secs / 86_400),
    }
}

/// Replica table offset label: `Now`, `+30s`, `+5m`.
#[must_use]
pub fn step_offset(offset_secs: u64) -> String {
    match offset_secs {
        0 => "Now".to_string(),
        1..60 => format!("+{offset_secs}s"),
        _ => format!("+{}m", offset_secs / 60),
    }
}

#[must_use]
pub const fn health_mark(healthy: bool) -> char {
    if healthy { '✓' } else { '✗' }
}

/// Cut `text` to at most `width` chars, ending in `…` when shortened.
#[must_use]
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push('…');
    out
}

/// Left-align `text` in exactly `width` chars.
#[must_use]
pub fn fit(text: &str, width: usize) -> String {
    format!("{:<width$}", truncate(text, width))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ages_pick_the_largest_whole_unit() {
        assert_eq!(human_age(Duration::from_secs(0)), "0s");
        assert_eq!(human_age(Duration::from_secs(59)), "59s");
        assert_eq!(human_age(Duration::from_secs(60)), "1m");
        assert_eq!(human_age(Duration::from_secs(7_200)), "2h");
        assert_eq!(human_age(Duration::from_secs(200_000)), "2d");
    }

    #[test]
    fn offsets_switch_to_minutes_at_sixty_seconds() {
        assert_eq!(step_offset(0), "Now");
        assert_eq!(step_offset(30), "+30s");
        assert_eq!(step_offset(60), "+1m");
        assert_eq!(step_offset(330), "+5m");
    }

    #[test]
    fn spinner_advances_every_100ms() {
        assert_eq!(spinner(Duration::ZERO), '⠋');
        assert_eq!(spinner(Duration::from_millis(150)), '⠙');
        assert_eq!(spinner(Duration::from_millis(1_000)), '⠋');
    }

    #[test]
    fn truncate_and_fit() {
        assert_eq!(truncate("workload", 4), "wor…");
        assert_eq!(truncate("api", 4), "api");
        assert_eq!(truncate("api", 0), "");
        assert_eq!(fit("api", 5), "api  ");
        assert_eq!(fit("kedastral", 5).chars().count(), 5);
    }
}
