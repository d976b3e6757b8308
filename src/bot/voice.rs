//! Songbird-backed implementations of the audio sink and voice transport.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{HttpRequest, Input},
    tracks::{Track as SongbirdTrack, TrackHandle},
    Event, Songbird, TrackEvent,
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::{debug, info, warn};

use super::events::TrackCompletionHandler;
use crate::audio::{AudioSink, CompletionNotifier, ConnectionHandle, PlaybackHandle, VoiceTransport};

/// Conexiones de voz vía Songbird
pub struct SongbirdTransport {
    manager: Arc<Songbird>,
}

impl SongbirdTransport {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<ConnectionHandle> {
        self.manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| anyhow!("Error al conectar al canal de voz: {:?}", e))?;

        info!("🔊 Conectado al canal de voz en guild {}", guild_id);
        Ok(ConnectionHandle {
            guild_id,
            channel_id,
        })
    }

    async fn move_to(
        &self,
        connection: &ConnectionHandle,
        channel_id: ChannelId,
    ) -> Result<ConnectionHandle> {
        // join sobre una llamada existente solo cambia de canal
        self.connect(connection.guild_id, channel_id).await
    }

    async fn disconnect(&self, connection: &ConnectionHandle) -> Result<()> {
        self.manager.remove(connection.guild_id).await?;
        info!("👋 Desconectado del canal de voz en guild {}", connection.guild_id);
        Ok(())
    }
}

/// Reproduce streams HTTP en la llamada de Songbird del guild
pub struct SongbirdSink {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    next_id: AtomicU64,
    tracks: Arc<DashMap<PlaybackHandle, TrackHandle>>,
}

impl SongbirdSink {
    pub fn new(manager: Arc<Songbird>, http: reqwest::Client) -> Self {
        Self {
            manager,
            http,
            next_id: AtomicU64::new(1),
            tracks: Arc::new(DashMap::new()),
        }
    }

    fn track(&self, handle: PlaybackHandle) -> Result<TrackHandle> {
        self.tracks
            .get(&handle)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| anyhow!("El stream {:?} ya terminó", handle))
    }
}

/// Track con el volumen guardado aplicado desde el primer frame
fn prepared_track(input: Input, volume: f32) -> SongbirdTrack {
    SongbirdTrack::new(input).volume(volume)
}

#[async_trait]
impl AudioSink for SongbirdSink {
    async fn start(
        &self,
        connection: &ConnectionHandle,
        stream_url: &str,
        volume: f32,
        notifier: CompletionNotifier,
    ) -> Result<PlaybackHandle> {
        let call = self
            .manager
            .get(connection.guild_id)
            .ok_or_else(|| anyhow!("No hay llamada de voz en guild {}", connection.guild_id))?;

        let input: Input = HttpRequest::new(self.http.clone(), stream_url.to_string()).into();
        let handle = PlaybackHandle(self.next_id.fetch_add(1, Ordering::Relaxed));

        let track = {
            let mut call = call.lock().await;
            call.play(prepared_track(input, volume))
        };

        self.tracks.insert(handle, track.clone());
        let completion = TrackCompletionHandler::new(handle, notifier, self.tracks.clone());

        // Sin el evento de fin el scheduler nunca avanzaría
        if let Err(e) = track.add_event(Event::Track(TrackEvent::End), completion.clone()) {
            self.tracks.remove(&handle);
            let _ = track.stop();
            return Err(anyhow!("No se pudo registrar el fin del track: {:?}", e));
        }
        if let Err(e) = track.add_event(Event::Track(TrackEvent::Error), completion) {
            warn!("⚠️ No se pudo registrar el handler de errores: {:?}", e);
        }

        debug!("Stream {:?} iniciado en guild {}", handle, connection.guild_id);
        Ok(handle)
    }

    async fn stop(&self, handle: PlaybackHandle) -> Result<()> {
        // Tras desconectar, el evento de fin puede no llegar nunca
        let (_, track) = self
            .tracks
            .remove(&handle)
            .ok_or_else(|| anyhow!("El stream {:?} ya terminó", handle))?;
        track.stop()?;
        Ok(())
    }

    async fn pause(&self, handle: PlaybackHandle) -> Result<()> {
        self.track(handle)?.pause()?;
        Ok(())
    }

    async fn resume(&self, handle: PlaybackHandle) -> Result<()> {
        self.track(handle)?.play()?;
        Ok(())
    }

    async fn set_volume(&self, handle: PlaybackHandle, volume: f32) -> Result<()> {
        self.track(handle)?.set_volume(volume)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use songbird::{Config as DriverConfig, Driver};

    fn http_input(http: &reqwest::Client) -> Input {
        HttpRequest::new(http.clone(), "http://127.0.0.1:9/silence".to_string()).into()
    }

    #[test]
    fn test_prepared_track_carries_volume() {
        let http = reqwest::Client::new();
        let track = prepared_track(http_input(&http), 0.25);
        assert_eq!(track.volume, 0.25);
    }

    #[tokio::test]
    async fn test_stop_forgets_track_without_end_event() {
        let http = reqwest::Client::new();
        let sink = SongbirdSink::new(Songbird::serenity(), http.clone());

        let mut driver = Driver::new(DriverConfig::default());
        let track = driver.play(prepared_track(http_input(&http), 0.5));
        let handle = PlaybackHandle(7);
        sink.tracks.insert(handle, track);

        // El resultado de detener no importa: la entrada se suelta antes
        let _ = sink.stop(handle).await;

        assert!(sink.tracks.is_empty());
        assert!(sink.stop(handle).await.is_err());
    }
}
