use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tracing::{debug, info};

use super::{
    progress::{self, Progress},
    sink::{ConnectionHandle, PlaybackHandle},
    track::Track,
};
use crate::error::{PlaybackError, PlaybackResult};

/// Estado del reproductor de un guild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    /// Sin conexión ni track
    Idle,
    Playing,
    Paused,
    /// Transitorio: entre el fin de un track y el inicio del siguiente
    Advancing,
    /// Conexión cerrada y cola limpiada por un stop explícito
    Stopped,
}

/// Estado de reproducción de un guild.
///
/// Owned exclusively by the guild's scheduler task; nothing else holds a
/// mutable reference to it.
#[derive(Debug)]
pub struct GuildPlaybackState {
    queue: VecDeque<Track>,
    current: Option<Track>,
    current_handle: Option<PlaybackHandle>,
    volume: f32,
    playback_started_at: Option<DateTime<Utc>>,
    paused_at: Option<DateTime<Utc>>,
    connection: Option<ConnectionHandle>,
    status: PlayerStatus,
    epoch: u64,
}

impl GuildPlaybackState {
    pub fn new(default_volume: f32) -> Self {
        Self {
            queue: VecDeque::new(),
            current: None,
            current_handle: None,
            volume: default_volume.clamp(0.0, 1.0),
            playback_started_at: None,
            paused_at: None,
            connection: None,
            status: PlayerStatus::Idle,
            epoch: 0,
        }
    }

    /// Agrega un track al final de la cola y devuelve su posición (1-based)
    pub fn push_track(&mut self, track: Track) -> usize {
        info!("➕ Agregado a la cola: {}", track.title);
        self.queue.push_back(track);
        self.queue.len()
    }

    /// Saca el siguiente track (FIFO estricto)
    pub fn pop_next(&mut self) -> Option<Track> {
        let next = self.queue.pop_front();
        if let Some(ref track) = next {
            debug!("➡️ Siguiente en cola (FIFO): {}", track.title);
        }
        next
    }

    /// Marca `track` como el actual, recién iniciado en `now`
    pub fn begin_track(&mut self, track: Track, handle: PlaybackHandle, now: DateTime<Utc>) {
        self.current = Some(track);
        self.current_handle = Some(handle);
        self.playback_started_at = Some(now);
        self.paused_at = None;
        self.status = PlayerStatus::Playing;
    }

    /// Limpia el track actual y sus tiempos; devuelve el handle que tenía
    pub fn clear_current(&mut self) -> Option<PlaybackHandle> {
        self.current = None;
        self.playback_started_at = None;
        self.paused_at = None;
        self.current_handle.take()
    }

    pub fn mark_paused(&mut self, now: DateTime<Utc>) {
        self.paused_at = Some(now);
        self.status = PlayerStatus::Paused;
    }

    /// Reanuda; el intervalo en pausa no cuenta como tiempo transcurrido
    pub fn mark_resumed(&mut self, now: DateTime<Utc>) {
        if let (Some(started), Some(paused)) = (self.playback_started_at, self.paused_at.take()) {
            let paused_for = now.signed_duration_since(paused);
            if paused_for > chrono::Duration::zero() {
                self.playback_started_at = Some(started + paused_for);
            }
        }
        self.status = PlayerStatus::Playing;
    }

    /// Valida y guarda el volumen; fuera de `[0, 1]` no cambia nada
    pub fn set_volume(&mut self, volume: f32) -> PlaybackResult<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlaybackError::InvalidVolume(volume));
        }
        self.volume = volume;
        Ok(())
    }

    /// Vacía cola y track actual e invalida resoluciones en curso.
    ///
    /// Returns the handle that was streaming and the connection that was
    /// open so the caller can release them.
    pub fn reset(&mut self) -> (Option<PlaybackHandle>, Option<ConnectionHandle>) {
        let cleared = self.queue.len();
        self.queue.clear();
        let handle = self.clear_current();
        let connection = self.connection.take();
        self.epoch += 1;
        self.status = PlayerStatus::Stopped;
        info!("🗑️ Cola limpiada: {} tracks removidos", cleared);
        (handle, connection)
    }

    pub fn set_status(&mut self, status: PlayerStatus) {
        self.status = status;
    }

    pub fn set_connection(&mut self, connection: Option<ConnectionHandle>) {
        self.connection = connection;
    }

    pub fn take_connection(&mut self) -> Option<ConnectionHandle> {
        self.connection.take()
    }

    // Getters

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn current_handle(&self) -> Option<PlaybackHandle> {
        self.current_handle
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn connection(&self) -> Option<&ConnectionHandle> {
        self.connection.as_ref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn snapshot(&self) -> GuildSnapshot {
        GuildSnapshot {
            status: self.status,
            current: self.current.clone(),
            queue: self.queue.iter().cloned().collect(),
            volume: self.volume,
            playback_started_at: self.playback_started_at,
            paused_at: self.paused_at,
            connected: self.connection.is_some(),
            epoch: self.epoch,
        }
    }
}

/// Copia inmutable del estado para consultas (now playing, queue)
#[derive(Debug, Clone, PartialEq)]
pub struct GuildSnapshot {
    pub status: PlayerStatus,
    pub current: Option<Track>,
    pub queue: Vec<Track>,
    pub volume: f32,
    pub playback_started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub connected: bool,
    pub epoch: u64,
}

impl GuildSnapshot {
    /// Progreso del track actual; congelado mientras está en pausa
    pub fn progress(&self, now: DateTime<Utc>, bar_length: usize) -> Option<Progress> {
        let current = self.current.as_ref()?;
        let effective_now = self.paused_at.unwrap_or(now);
        progress::calculate(
            self.playback_started_at,
            effective_now,
            current.duration_secs,
            bar_length,
        )
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlayerStatus::Playing
    }
}
