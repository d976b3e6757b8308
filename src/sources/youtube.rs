use anyhow::{Context, Result};
use async_process::Command;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

use super::MediaResolver;
use crate::audio::Track;
use crate::config::Config;

/// Resolvedor basado en yt-dlp
pub struct YtDlpResolver {
    executable: String,
    timeout: Duration,
    // Limitar procesos concurrentes para evitar rate limiting
    rate_limiter: Semaphore,
}

/// Información extraída de yt-dlp
#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    url: Option<String>,
    uploader: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    view_count: Option<u64>,
    webpage_url: Option<String>,
}

impl YtDlpResolver {
    pub fn new(executable: impl Into<String>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            timeout,
            rate_limiter: Semaphore::new(3),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.ytdlp_path.clone(), config.resolve_timeout())
    }

    /// Las URLs http(s) se pasan tal cual; el resto se busca en YouTube
    pub fn search_target(query: &str) -> String {
        let query = query.trim();
        match Url::parse(query) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => query.to_string(),
            _ => format!("ytsearch1:{}", query),
        }
    }

    /// Una línea JSON por entrada; las líneas que no parsean se ignoran
    fn parse_output(stdout: &str) -> Vec<Track> {
        stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<YtDlpInfo>(line) {
                Ok(info) => Some(Self::info_to_track(info)),
                Err(e) => {
                    debug!("Línea de yt-dlp ignorada: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Convierte YtDlpInfo a Track
    fn info_to_track(info: YtDlpInfo) -> Track {
        let mut track = Track::new(info.title.unwrap_or_else(|| "Untitled".to_string()));
        track.stream_url = info.url;
        track.uploader = info.uploader;
        track.duration_secs = info.duration.map(|d| d.max(0.0).floor() as u64);
        track.thumbnail_url = info.thumbnail;
        track.view_count = info.view_count;
        track.webpage_url = info.webpage_url;
        track
    }
}

#[async_trait]
impl MediaResolver for YtDlpResolver {
    async fn search(&self, query: &str) -> Result<Vec<Track>> {
        let _permit = self.rate_limiter.acquire().await?;

        let target = Self::search_target(query);
        info!("🔍 Buscando con yt-dlp: {}", target);

        let mut command = Command::new(&self.executable);
        command
            .args([
                "--dump-json",
                "--no-playlist",
                "-f",
                "bestaudio/best",
                "--no-warnings",
            ])
            .arg(&target)
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| anyhow::anyhow!("yt-dlp no respondió en {:?}", self.timeout))?
            .context("Error al ejecutar yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            warn!("⚠️ yt-dlp terminó con error: {}", error.trim());
            anyhow::bail!("yt-dlp error: {}", error.trim());
        }

        let tracks = Self::parse_output(&String::from_utf8_lossy(&output.stdout));
        debug!("yt-dlp devolvió {} candidatos", tracks.len());
        Ok(tracks)
    }

    fn source_name(&self) -> &'static str {
        "yt-dlp"
    }
}
