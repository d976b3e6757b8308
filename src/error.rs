//! Structured outcomes of the playback core.
//!
//! Expected "nothing is playing" situations are plain values
//! ([`InvalidOperation`]) so the command layer can turn them into replies
//! without treating them as faults.

use serenity::model::id::GuildId;
use thiserror::Error;

/// Errores del núcleo de reproducción
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// Se agotaron los intentos de resolución o no hubo candidatos
    #[error("no results found for `{query}` after {attempts} attempt(s)")]
    ResolutionFailed { query: String, attempts: u32 },

    /// El sink de audio no pudo iniciar el track
    #[error("could not start `{title}`: {reason}")]
    TransportStartFailed { title: String, reason: String },

    /// Comando de control sin sentido en el estado actual
    #[error("{0}")]
    InvalidOperation(InvalidOperation),

    /// Volumen fuera de `[0.0, 1.0]`
    #[error("volume must be between 0.0 and 1.0, got {0}")]
    InvalidVolume(f32),

    /// El sink reportó un error a mitad del stream
    #[error("playback of `{title}` failed: {reason}")]
    TransportRuntimeFailed { title: String, reason: String },

    /// No se pudo entrar o moverse al canal de voz
    #[error("failed to connect to voice channel: {0}")]
    ConnectFailed(String),

    /// El actor del guild ya no recibe mensajes
    #[error("playback worker for guild {0} is not running")]
    WorkerGone(GuildId),
}

/// Motivo por el que un comando de control fue un no-op
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidOperation {
    #[error("not connected to a voice channel")]
    NotConnected,
    #[error("nothing is currently playing")]
    NothingPlaying,
    #[error("nothing to skip")]
    NothingToSkip,
    #[error("playback is already paused")]
    AlreadyPaused,
    #[error("playback is not paused")]
    NotPaused,
}

impl From<InvalidOperation> for PlaybackError {
    fn from(op: InvalidOperation) -> Self {
        PlaybackError::InvalidOperation(op)
    }
}

pub type PlaybackResult<T> = std::result::Result<T, PlaybackError>;
