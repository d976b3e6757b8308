use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{str::FromStr, time::Duration};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Audio
    pub default_volume: f32,

    // Resolución (yt-dlp)
    pub resolve_attempts: u32,
    pub resolve_backoff_secs: u64,
    pub resolve_timeout_secs: u64,
    pub ytdlp_path: String,

    // Presentación
    pub progress_bar_length: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Construye la configuración a partir de una función de búsqueda de variables
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            // Discord
            discord_token: lookup("DISCORD_TOKEN")
                .ok_or_else(|| anyhow::anyhow!("DISCORD_TOKEN no está definido"))?,
            guild_id: lookup("GUILD_ID").and_then(|s| s.parse().ok()),

            // Audio
            default_volume: parse_or(&lookup, "DEFAULT_VOLUME", defaults.default_volume)?,

            // Resolución
            resolve_attempts: parse_or(&lookup, "RESOLVE_ATTEMPTS", defaults.resolve_attempts)?,
            resolve_backoff_secs: parse_or(
                &lookup,
                "RESOLVE_BACKOFF_SECS",
                defaults.resolve_backoff_secs,
            )?,
            resolve_timeout_secs: parse_or(
                &lookup,
                "RESOLVE_TIMEOUT_SECS",
                defaults.resolve_timeout_secs,
            )?,
            ytdlp_path: match lookup("YTDLP_PATH") {
                Some(path) if !path.trim().is_empty() => path,
                _ => defaults.ytdlp_path,
            },

            // Presentación
            progress_bar_length: parse_or(
                &lookup,
                "PROGRESS_BAR_LENGTH",
                defaults.progress_bar_length,
            )?,
        })
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Volume must be between 0.0 and 1.0
    /// - At least one resolution attempt
    /// - Timeout and progress bar length must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.default_volume) {
            anyhow::bail!(
                "Default volume must be between 0.0 and 1.0, got: {}",
                self.default_volume
            );
        }

        if self.resolve_attempts == 0 {
            anyhow::bail!("Resolve attempts must be at least 1");
        }

        if self.resolve_timeout_secs == 0 {
            anyhow::bail!("Resolve timeout must be greater than 0");
        }

        if self.progress_bar_length == 0 {
            anyhow::bail!("Progress bar length must be greater than 0");
        }

        Ok(())
    }

    pub fn resolve_backoff(&self) -> Duration {
        Duration::from_secs(self.resolve_backoff_secs)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The Discord token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: commands {}\n  \
            Audio: {}% default volume\n  \
            Resolver: {} ({} attempts, {}s backoff step, {}s timeout)\n  \
            Progress bar: {} segments",
            self.guild_id
                .map_or("global".to_string(), |id| format!("guild {}", id)),
            (self.default_volume * 100.0) as u32,
            self.ytdlp_path,
            self.resolve_attempts,
            self.resolve_backoff_secs,
            self.resolve_timeout_secs,
            self.progress_bar_length,
        )
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Valor inválido para {}: {}", key, e)),
        _ => Ok(default),
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            guild_id: None,

            default_volume: 0.5,

            resolve_attempts: 3,
            resolve_backoff_secs: 2, // 2s, luego 4s
            resolve_timeout_secs: 30,
            ytdlp_path: "yt-dlp".to_string(),

            progress_bar_length: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_only_token_is_set() {
        let config = Config::from_lookup(lookup_from(&[("DISCORD_TOKEN", "abc")])).unwrap();

        assert_eq!(config.discord_token, "abc");
        assert_eq!(config.default_volume, 0.5);
        assert_eq!(config.resolve_attempts, 3);
        assert_eq!(config.resolve_backoff(), Duration::from_secs(2));
        assert_eq!(config.ytdlp_path, "yt-dlp");
        assert!(config.guild_id.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_token_is_an_error() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = Config::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("GUILD_ID", "42"),
            ("DEFAULT_VOLUME", "0.8"),
            ("RESOLVE_ATTEMPTS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.guild_id, Some(42));
        assert_eq!(config.default_volume, 0.8);
        assert_eq!(config.resolve_attempts, 5);

        let bad = Config::from_lookup(lookup_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("RESOLVE_ATTEMPTS", "many"),
        ]));
        assert!(bad.is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_volume() {
        let config = Config {
            default_volume: 1.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            resolve_attempts: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_summary_hides_token() {
        let config = Config {
            discord_token: "super-secret".to_string(),
            ..Config::default()
        };
        let summary = config.summary();
        assert!(!summary.contains("super-secret"));
        assert!(summary.contains("50% default volume"));
    }
}
