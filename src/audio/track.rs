use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Track resuelto y listo para reproducir
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub stream_url: Option<String>,
    pub uploader: Option<String>,
    pub duration_secs: Option<u64>,
    pub thumbnail_url: Option<String>,
    pub view_count: Option<u64>,
    pub webpage_url: Option<String>,
}

impl Track {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            stream_url: None,
            uploader: None,
            duration_secs: None,
            thumbnail_url: None,
            view_count: None,
            webpage_url: None,
        }
    }

    // Setters

    pub fn with_stream_url(mut self, stream_url: impl Into<String>) -> Self {
        self.stream_url = Some(stream_url.into());
        self
    }

    pub fn with_uploader(mut self, uploader: impl Into<String>) -> Self {
        self.uploader = Some(uploader.into());
        self
    }

    pub fn with_duration_secs(mut self, duration_secs: u64) -> Self {
        self.duration_secs = Some(duration_secs);
        self
    }

    pub fn with_thumbnail(mut self, thumbnail_url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(thumbnail_url.into());
        self
    }

    pub fn with_view_count(mut self, view_count: u64) -> Self {
        self.view_count = Some(view_count);
        self
    }

    pub fn with_webpage_url(mut self, webpage_url: impl Into<String>) -> Self {
        self.webpage_url = Some(webpage_url.into());
        self
    }

    /// Duración como `Duration`, si se conoce (0 cuenta como desconocida)
    pub fn duration(&self) -> Option<Duration> {
        self.duration_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }

    /// Un track sin URL de stream no se puede enviar al sink
    pub fn is_playable(&self) -> bool {
        self.stream_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playable_requires_non_blank_stream_url() {
        assert!(!Track::new("A").is_playable());
        assert!(!Track::new("A").with_stream_url("  ").is_playable());
        assert!(Track::new("A").with_stream_url("http://x/a").is_playable());
    }

    #[test]
    fn test_duration_conversion() {
        let track = Track::new("A").with_duration_secs(125);
        assert_eq!(track.duration(), Some(Duration::from_secs(125)));
        assert_eq!(Track::new("B").duration(), None);
        assert_eq!(Track::new("C").with_duration_secs(0).duration(), None);
    }
}
