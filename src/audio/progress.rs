//! Progress maths for "now playing" replies. Pure functions, no clock access.

use chrono::{DateTime, Utc};
use std::time::Duration;

const FILLED: char = '▓';
const EMPTY: char = '░';

/// Progreso del track actual
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub elapsed_secs: u64,
    pub duration_secs: u64,
    pub percent: u8,
    pub bar: String,
}

impl Progress {
    /// `1:05 / 3:00 [▓▓▓░░░] 36%`
    pub fn render(&self) -> String {
        format!(
            "{} / {} [{}] {}%",
            format_duration(Duration::from_secs(self.elapsed_secs)),
            format_duration(Duration::from_secs(self.duration_secs)),
            self.bar,
            self.percent
        )
    }
}

/// Calcula el progreso; `None` si falta el inicio o la duración.
///
/// A zero duration counts as unknown.
///
/// Elapsed time is floored to whole seconds and clamped to
/// `[0, duration]` so a skewed clock or an inaccurate duration never
/// overshoots the bar.
pub fn calculate(
    started_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    duration_secs: Option<u64>,
    bar_length: usize,
) -> Option<Progress> {
    let started_at = started_at?;
    let duration_secs = duration_secs.filter(|&secs| secs > 0)?;

    let raw = now.signed_duration_since(started_at).num_seconds();
    let elapsed_secs = u64::try_from(raw).unwrap_or(0).min(duration_secs);

    let percent = (100 * elapsed_secs / duration_secs) as u8;
    let filled = (bar_length as u64 * elapsed_secs / duration_secs) as usize;

    let bar: String = std::iter::repeat(FILLED)
        .take(filled)
        .chain(std::iter::repeat(EMPTY).take(bar_length - filled))
        .collect();

    Some(Progress {
        elapsed_secs,
        duration_secs,
        percent,
        bar,
    })
}

/// Formatea una duración en formato legible
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    #[test]
    fn test_basic_progress() {
        let progress = calculate(Some(at(0)), at(30), Some(120), 20).unwrap();
        assert_eq!(
            progress,
            Progress {
                elapsed_secs: 30,
                duration_secs: 120,
                percent: 25,
                bar: "▓▓▓▓▓░░░░░░░░░░░░░░░".to_string(),
            }
        );
        assert_eq!(progress.render(), "0:30 / 2:00 [▓▓▓▓▓░░░░░░░░░░░░░░░] 25%");
    }

    #[test]
    fn test_percent_floors() {
        let progress = calculate(Some(at(0)), at(2), Some(3), 20).unwrap();
        assert_eq!(progress.percent, 66);
    }

    #[test]
    fn test_fractional_seconds_floor() {
        let now = at(10) + chrono::Duration::milliseconds(900);
        let progress = calculate(Some(at(0)), now, Some(100), 10).unwrap();
        assert_eq!(progress.elapsed_secs, 10);
        assert_eq!(progress.bar, "▓░░░░░░░░░");
    }

    #[test]
    fn test_clamped_to_duration_and_zero() {
        let over = calculate(Some(at(0)), at(500), Some(120), 20).unwrap();
        assert_eq!(over.elapsed_secs, 120);
        assert_eq!(over.percent, 100);
        assert_eq!(over.bar, "▓".repeat(20));

        let before = calculate(Some(at(10)), at(0), Some(120), 20).unwrap();
        assert_eq!(before.elapsed_secs, 0);
        assert_eq!(before.percent, 0);
    }

    #[test]
    fn test_unavailable_without_start_or_duration() {
        assert!(calculate(None, at(10), Some(120), 20).is_none());
        assert!(calculate(Some(at(0)), at(10), None, 20).is_none());
    }

    #[test]
    fn test_zero_duration_is_unknown() {
        assert!(calculate(Some(at(0)), at(10), Some(0), 4).is_none());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(5)), "0:05");
        assert_eq!(format_duration(Duration::from_secs(185)), "3:05");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1:02:05");
    }
}
