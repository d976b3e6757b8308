pub mod youtube;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::audio::Track;
use crate::config::Config;
use crate::error::{PlaybackError, PlaybackResult};

pub use youtube::YtDlpResolver;

/// Trait común para los backends de búsqueda
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Devuelve los candidatos para `query`, el mejor primero. Una lista
    /// vacía significa "sin resultados", no un error.
    async fn search(&self, query: &str) -> Result<Vec<Track>>;

    /// Nombre de la fuente
    fn source_name(&self) -> &'static str;
}

/// Convierte una consulta en un [`Track`] con reintentos.
///
/// Each attempt runs on its own task so a slow or blocking backend never
/// stalls the caller's runtime thread or any guild scheduler. Failed
/// attempts back off linearly (`step * attempt`); an empty result list is
/// final and is not retried.
pub struct TrackResolver {
    source: Arc<dyn MediaResolver>,
    max_attempts: u32,
    backoff_step: Duration,
}

impl TrackResolver {
    pub fn new(source: Arc<dyn MediaResolver>) -> Self {
        Self {
            source,
            max_attempts: 3,
            backoff_step: Duration::from_secs(2),
        }
    }

    pub fn from_config(source: Arc<dyn MediaResolver>, config: &Config) -> Self {
        Self::new(source).with_retry_policy(config.resolve_attempts, config.resolve_backoff())
    }

    pub fn with_retry_policy(mut self, max_attempts: u32, backoff_step: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff_step = backoff_step;
        self
    }

    pub async fn resolve(&self, query: &str) -> PlaybackResult<Track> {
        for attempt in 1..=self.max_attempts {
            let source = self.source.clone();
            let owned_query = query.to_string();
            let outcome = tokio::spawn(async move { source.search(&owned_query).await }).await;

            match outcome {
                Ok(Ok(candidates)) => {
                    return match candidates.into_iter().next() {
                        Some(track) => {
                            info!(
                                "✅ Resuelto con {}: {} (intento {})",
                                self.source.source_name(),
                                track.title,
                                attempt
                            );
                            Ok(track)
                        }
                        None => {
                            info!("🔍 Sin resultados para: {}", query);
                            Err(PlaybackError::ResolutionFailed {
                                query: query.to_string(),
                                attempts: attempt,
                            })
                        }
                    };
                }
                Ok(Err(e)) => {
                    warn!(
                        "❌ Error en búsqueda (intento {}/{}): {:?}",
                        attempt, self.max_attempts, e
                    );
                }
                Err(e) => {
                    warn!(
                        "❌ Tarea de búsqueda abortada (intento {}/{}): {}",
                        attempt, self.max_attempts, e
                    );
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.backoff_step * attempt).await;
            }
        }

        error!("❌ Todos los intentos de búsqueda fallaron para: {}", query);
        Err(PlaybackError::ResolutionFailed {
            query: query.to_string(),
            attempts: self.max_attempts,
        })
    }
}
