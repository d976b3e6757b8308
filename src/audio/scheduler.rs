//! Per-guild playback scheduler.
//!
//! Each guild runs one [`PlaybackScheduler`] task that owns its
//! [`GuildPlaybackState`] and consumes a mailbox of [`GuildMessage`]s. User
//! commands arrive through a [`GuildHandle`]; completion notifications from
//! the audio sink arrive through a [`CompletionNotifier`]. Both end up as
//! messages in the same mailbox, so every mutation of a guild's state
//! happens sequentially on its own task while different guilds run in
//! parallel.

use chrono::Utc;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::{
    sink::{AudioSink, CompletionNotifier, PlaybackHandle, VoiceTransport},
    state::{GuildPlaybackState, GuildSnapshot, PlayerStatus},
    track::Track,
};
use crate::error::{InvalidOperation, PlaybackError, PlaybackResult};

/// Notificaciones de reproducción para la capa de chat
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    TrackStarted { guild_id: GuildId, track: Track },
    /// El sink no pudo iniciar el track; la cola siguió avanzando
    StartFailed { guild_id: GuildId, error: PlaybackError },
    /// El sink reportó un error a mitad del stream
    PlaybackFailed { guild_id: GuildId, error: PlaybackError },
    QueueFinished { guild_id: GuildId },
}

pub type EventSender = mpsc::UnboundedSender<PlaybackEvent>;

/// Resultado de agregar un track
#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOutcome {
    /// La cola estaba vacía y el track empezó a sonar
    Started(Track),
    /// Quedó detrás de otros tracks (posición 1-based)
    Queued { track: Track, position: usize },
    /// Resolución vieja: el guild fue detenido mientras se resolvía
    Discarded(Track),
}

type Reply<T> = oneshot::Sender<PlaybackResult<T>>;

#[derive(Debug)]
pub(crate) enum GuildMessage {
    Connect {
        channel_id: ChannelId,
        reply: Reply<u64>,
    },
    Enqueue {
        track: Track,
        channel_id: ChannelId,
        epoch: Option<u64>,
        reply: Reply<EnqueueOutcome>,
    },
    Skip {
        reply: Reply<()>,
    },
    Pause {
        reply: Reply<()>,
    },
    Resume {
        reply: Reply<()>,
    },
    Stop {
        reply: Reply<()>,
    },
    SetVolume {
        volume: f32,
        reply: Reply<()>,
    },
    Snapshot {
        reply: oneshot::Sender<GuildSnapshot>,
    },
    Disconnected,
    PlaybackComplete {
        handle: PlaybackHandle,
        error: Option<String>,
    },
}

/// Handle clonable hacia el scheduler de un guild
#[derive(Debug, Clone)]
pub struct GuildHandle {
    guild_id: GuildId,
    mailbox: mpsc::UnboundedSender<GuildMessage>,
}

impl GuildHandle {
    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Conecta (o mueve) la conexión de voz y devuelve la época actual
    pub async fn connect(&self, channel_id: ChannelId) -> PlaybackResult<u64> {
        self.request(|reply| GuildMessage::Connect { channel_id, reply })
            .await?
    }

    /// Agrega un track ya resuelto
    pub async fn enqueue(&self, track: Track, channel_id: ChannelId) -> PlaybackResult<EnqueueOutcome> {
        self.request(|reply| GuildMessage::Enqueue {
            track,
            channel_id,
            epoch: None,
            reply,
        })
        .await?
    }

    /// Agrega un track resuelto durante la época `epoch`; se descarta si el
    /// guild fue detenido mientras tanto
    pub async fn enqueue_tagged(
        &self,
        track: Track,
        channel_id: ChannelId,
        epoch: u64,
    ) -> PlaybackResult<EnqueueOutcome> {
        self.request(|reply| GuildMessage::Enqueue {
            track,
            channel_id,
            epoch: Some(epoch),
            reply,
        })
        .await?
    }

    pub async fn skip(&self) -> PlaybackResult<()> {
        self.request(|reply| GuildMessage::Skip { reply }).await?
    }

    pub async fn pause(&self) -> PlaybackResult<()> {
        self.request(|reply| GuildMessage::Pause { reply }).await?
    }

    pub async fn resume(&self) -> PlaybackResult<()> {
        self.request(|reply| GuildMessage::Resume { reply }).await?
    }

    pub async fn stop(&self) -> PlaybackResult<()> {
        self.request(|reply| GuildMessage::Stop { reply }).await?
    }

    pub async fn set_volume(&self, volume: f32) -> PlaybackResult<()> {
        self.request(|reply| GuildMessage::SetVolume { volume, reply })
            .await?
    }

    pub async fn volume(&self) -> PlaybackResult<f32> {
        Ok(self.snapshot().await?.volume)
    }

    pub async fn snapshot(&self) -> PlaybackResult<GuildSnapshot> {
        self.request(|reply| GuildMessage::Snapshot { reply }).await
    }

    /// El gateway avisó que el bot fue sacado del canal de voz
    pub fn notify_disconnected(&self) {
        if self.mailbox.send(GuildMessage::Disconnected).is_err() {
            warn!("📭 Scheduler del guild {} no disponible", self.guild_id);
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> GuildMessage,
    ) -> PlaybackResult<T> {
        let (tx, rx) = oneshot::channel();
        self.mailbox
            .send(build(tx))
            .map_err(|_| PlaybackError::WorkerGone(self.guild_id))?;
        rx.await.map_err(|_| PlaybackError::WorkerGone(self.guild_id))
    }
}

/// Crea el estado del guild y lanza su tarea
pub(crate) fn spawn(
    guild_id: GuildId,
    default_volume: f32,
    sink: Arc<dyn AudioSink>,
    transport: Arc<dyn VoiceTransport>,
    events: Option<EventSender>,
) -> GuildHandle {
    let (tx, rx) = mpsc::unbounded_channel();

    let scheduler = PlaybackScheduler {
        guild_id,
        state: GuildPlaybackState::new(default_volume),
        sink,
        transport,
        events,
        mailbox: tx.downgrade(),
    };
    tokio::spawn(scheduler.run(rx));

    GuildHandle {
        guild_id,
        mailbox: tx,
    }
}

pub(crate) struct PlaybackScheduler {
    guild_id: GuildId,
    state: GuildPlaybackState,
    sink: Arc<dyn AudioSink>,
    transport: Arc<dyn VoiceTransport>,
    events: Option<EventSender>,
    mailbox: mpsc::WeakUnboundedSender<GuildMessage>,
}

impl PlaybackScheduler {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<GuildMessage>) {
        info!("🎛️ Scheduler iniciado para guild {}", self.guild_id);

        while let Some(message) = rx.recv().await {
            self.handle(message).await;
        }

        debug!("Scheduler del guild {} finalizado", self.guild_id);
    }

    async fn handle(&mut self, message: GuildMessage) {
        match message {
            GuildMessage::Connect { channel_id, reply } => {
                let result = self
                    .ensure_connected(channel_id)
                    .await
                    .map(|_| self.state.epoch());
                let _ = reply.send(result);
            }
            GuildMessage::Enqueue {
                track,
                channel_id,
                epoch,
                reply,
            } => {
                let result = self.enqueue(track, channel_id, epoch).await;
                let _ = reply.send(result);
            }
            GuildMessage::Skip { reply } => {
                let result = self.skip().await;
                let _ = reply.send(result);
            }
            GuildMessage::Pause { reply } => {
                let result = self.pause().await;
                let _ = reply.send(result);
            }
            GuildMessage::Resume { reply } => {
                let result = self.resume().await;
                let _ = reply.send(result);
            }
            GuildMessage::Stop { reply } => {
                let result = self.stop().await;
                let _ = reply.send(result);
            }
            GuildMessage::SetVolume { volume, reply } => {
                let result = self.set_volume(volume).await;
                let _ = reply.send(result);
            }
            GuildMessage::Snapshot { reply } => {
                let _ = reply.send(self.state.snapshot());
            }
            GuildMessage::Disconnected => self.on_disconnected().await,
            GuildMessage::PlaybackComplete { handle, error } => {
                self.on_playback_complete(handle, error).await
            }
        }
    }

    async fn ensure_connected(&mut self, channel_id: ChannelId) -> PlaybackResult<()> {
        match self.state.connection().copied() {
            None => {
                let connection = self
                    .transport
                    .connect(self.guild_id, channel_id)
                    .await
                    .map_err(|e| {
                        error!("❌ Error al conectar en guild {}: {:?}", self.guild_id, e);
                        PlaybackError::ConnectFailed(e.to_string())
                    })?;
                self.state.set_connection(Some(connection));
                if self.state.status() == PlayerStatus::Stopped {
                    self.state.set_status(PlayerStatus::Idle);
                }
                info!("🔊 Conectado al canal {} en guild {}", channel_id, self.guild_id);
            }
            Some(connection) if connection.channel_id != channel_id => {
                let moved = self
                    .transport
                    .move_to(&connection, channel_id)
                    .await
                    .map_err(|e| PlaybackError::ConnectFailed(e.to_string()))?;
                self.state.set_connection(Some(moved));
                info!("🔀 Movido al canal {} en guild {}", channel_id, self.guild_id);
            }
            Some(_) => {}
        }
        Ok(())
    }

    async fn enqueue(
        &mut self,
        track: Track,
        channel_id: ChannelId,
        epoch: Option<u64>,
    ) -> PlaybackResult<EnqueueOutcome> {
        if let Some(epoch) = epoch {
            if epoch != self.state.epoch() {
                warn!(
                    "🗑️ Resolución vieja descartada en guild {}: {} (época {} != {})",
                    self.guild_id,
                    track.title,
                    epoch,
                    self.state.epoch()
                );
                return Ok(EnqueueOutcome::Discarded(track));
            }
        }

        self.ensure_connected(channel_id).await?;

        let position = self.state.push_track(track.clone());
        if self.state.current().is_some() {
            return Ok(EnqueueOutcome::Queued { track, position });
        }

        self.advance_queue().await;

        if position == 1 {
            Ok(EnqueueOutcome::Started(track))
        } else {
            Ok(EnqueueOutcome::Queued {
                track,
                position: position - 1,
            })
        }
    }

    /// Saca tracks de la cola hasta que uno arranque o la cola se vacíe
    async fn advance_queue(&mut self) {
        self.state.set_status(PlayerStatus::Advancing);
        self.state.clear_current();

        loop {
            let Some(track) = self.state.pop_next() else {
                self.go_idle().await;
                return;
            };

            let Some(stream_url) = track.stream_url.clone().filter(|_| track.is_playable()) else {
                warn!("⚠️ {} no tiene URL de stream, saltando", track.title);
                continue;
            };

            let Some(connection) = self.state.connection().copied() else {
                self.report_start_failure(&track, "not connected to a voice channel");
                continue;
            };

            let Some(mailbox) = self.mailbox.upgrade() else {
                warn!("📭 Mailbox del guild {} cerrado", self.guild_id);
                self.go_idle().await;
                return;
            };
            let notifier = CompletionNotifier::new(self.guild_id, mailbox);

            match self
                .sink
                .start(&connection, &stream_url, self.state.volume(), notifier)
                .await
            {
                Ok(handle) => {
                    info!("🎵 Reproduciendo: {} en guild {}", track.title, self.guild_id);
                    self.state.begin_track(track.clone(), handle, Utc::now());
                    self.emit(PlaybackEvent::TrackStarted {
                        guild_id: self.guild_id,
                        track,
                    });
                    return;
                }
                Err(e) => {
                    self.report_start_failure(&track, &e.to_string());
                }
            }
        }
    }

    fn report_start_failure(&self, track: &Track, reason: &str) {
        error!("❌ Error al iniciar {}: {}", track.title, reason);
        self.emit(PlaybackEvent::StartFailed {
            guild_id: self.guild_id,
            error: PlaybackError::TransportStartFailed {
                title: track.title.clone(),
                reason: reason.to_string(),
            },
        });
    }

    async fn go_idle(&mut self) {
        self.state.clear_current();
        self.state.set_status(PlayerStatus::Idle);

        if let Some(connection) = self.state.take_connection() {
            if let Err(e) = self.transport.disconnect(&connection).await {
                warn!("⚠️ Error al desconectar guild {}: {:?}", self.guild_id, e);
            }
        }

        info!("📭 Cola vacía en guild {}, desconectado", self.guild_id);
        self.emit(PlaybackEvent::QueueFinished {
            guild_id: self.guild_id,
        });
    }

    async fn on_playback_complete(&mut self, handle: PlaybackHandle, error: Option<String>) {
        if self.state.current_handle() != Some(handle) {
            debug!("Finalización vieja ignorada en guild {}: {:?}", self.guild_id, handle);
            return;
        }

        let title = self
            .state
            .current()
            .map(|t| t.title.clone())
            .unwrap_or_default();

        if let Some(reason) = error {
            error!("❌ Error reproduciendo {}: {}", title, reason);
            self.emit(PlaybackEvent::PlaybackFailed {
                guild_id: self.guild_id,
                error: PlaybackError::TransportRuntimeFailed { title, reason },
            });
        } else {
            debug!("Track terminado en guild {}: {}", self.guild_id, title);
        }

        // Siempre avanza, con o sin error
        self.advance_queue().await;
    }

    async fn skip(&mut self) -> PlaybackResult<()> {
        let handle = match (self.state.status(), self.state.current_handle()) {
            (PlayerStatus::Playing | PlayerStatus::Paused, Some(handle)) => handle,
            _ => return Err(InvalidOperation::NothingToSkip.into()),
        };

        info!("⏭️ Saltando track en guild {}", self.guild_id);

        // El avance llega por la notificación de finalización del sink
        if let Err(e) = self.sink.stop(handle).await {
            warn!("⚠️ El sink no pudo detener {:?}: {:?}, avanzando directo", handle, e);
            self.advance_queue().await;
        }

        Ok(())
    }

    async fn pause(&mut self) -> PlaybackResult<()> {
        if self.state.connection().is_none() {
            return Err(InvalidOperation::NotConnected.into());
        }

        match (self.state.status(), self.state.current_handle()) {
            (PlayerStatus::Playing, Some(handle)) => {
                self.sink
                    .pause(handle)
                    .await
                    .map_err(|e| self.runtime_failure(e))?;
                self.state.mark_paused(Utc::now());
                info!("⏸️ Reproducción pausada en guild {}", self.guild_id);
                Ok(())
            }
            (PlayerStatus::Paused, _) => Err(InvalidOperation::AlreadyPaused.into()),
            _ => Err(InvalidOperation::NothingPlaying.into()),
        }
    }

    async fn resume(&mut self) -> PlaybackResult<()> {
        if self.state.connection().is_none() {
            return Err(InvalidOperation::NotConnected.into());
        }

        match (self.state.status(), self.state.current_handle()) {
            (PlayerStatus::Paused, Some(handle)) => {
                self.sink
                    .resume(handle)
                    .await
                    .map_err(|e| self.runtime_failure(e))?;
                self.state.mark_resumed(Utc::now());
                info!("▶️ Reproducción reanudada en guild {}", self.guild_id);
                Ok(())
            }
            _ => Err(InvalidOperation::NotPaused.into()),
        }
    }

    async fn stop(&mut self) -> PlaybackResult<()> {
        if self.state.connection().is_none() {
            return Err(InvalidOperation::NotConnected.into());
        }

        let (handle, connection) = self.state.reset();

        if let Some(handle) = handle {
            if let Err(e) = self.sink.stop(handle).await {
                warn!("⚠️ El sink no pudo detener {:?}: {:?}", handle, e);
            }
        }

        if let Some(connection) = connection {
            if let Err(e) = self.transport.disconnect(&connection).await {
                warn!("⚠️ Error al desconectar guild {}: {:?}", self.guild_id, e);
            }
        }

        info!("⏹️ Reproducción detenida en guild {}", self.guild_id);
        Ok(())
    }

    async fn on_disconnected(&mut self) {
        // Si ya no hay conexión fue una desconexión propia
        if self.state.connection().is_none() {
            return;
        }

        info!("🔌 Bot desconectado externamente en guild {}", self.guild_id);
        let (handle, _) = self.state.reset();
        if let Some(handle) = handle {
            if let Err(e) = self.sink.stop(handle).await {
                warn!("⚠️ El sink no pudo detener {:?}: {:?}", handle, e);
            }
        }
    }

    async fn set_volume(&mut self, volume: f32) -> PlaybackResult<()> {
        self.state.set_volume(volume)?;

        if let Some(handle) = self.state.current_handle() {
            if let Err(e) = self.sink.set_volume(handle, volume).await {
                warn!("⚠️ No se pudo aplicar el volumen en vivo: {:?}", e);
            }
        }

        info!(
            "🔊 Volumen ajustado a {}% en guild {}",
            (volume * 100.0).round() as u8,
            self.guild_id
        );
        Ok(())
    }

    fn runtime_failure(&self, e: anyhow::Error) -> PlaybackError {
        warn!("⚠️ Error del sink en guild {}: {:?}", self.guild_id, e);
        PlaybackError::TransportRuntimeFailed {
            title: self
                .state
                .current()
                .map(|t| t.title.clone())
                .unwrap_or_default(),
            reason: e.to_string(),
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}
