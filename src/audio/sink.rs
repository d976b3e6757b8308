//! Capabilities the scheduler drives but does not implement: the audio sink
//! that streams a URL into a voice connection, and the voice transport that
//! owns the connection itself.

use anyhow::Result;
use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use tokio::sync::mpsc;
use tracing::warn;

use super::scheduler::GuildMessage;

/// Identificador opaco de un stream iniciado en el sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(pub u64);

/// Conexión de voz activa de un guild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionHandle {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
}

/// Canal de vuelta para avisar que un stream terminó.
///
/// The sink may call [`CompletionNotifier::notify`] from any thread or task;
/// it only posts a message into the guild's mailbox, the guild actor does
/// the actual state change.
#[derive(Debug, Clone)]
pub struct CompletionNotifier {
    guild_id: GuildId,
    mailbox: mpsc::UnboundedSender<GuildMessage>,
}

impl CompletionNotifier {
    pub(crate) fn new(guild_id: GuildId, mailbox: mpsc::UnboundedSender<GuildMessage>) -> Self {
        Self { guild_id, mailbox }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Publica la finalización de `handle` (con error opcional)
    pub fn notify(&self, handle: PlaybackHandle, error: Option<String>) {
        if self
            .mailbox
            .send(GuildMessage::PlaybackComplete { handle, error })
            .is_err()
        {
            warn!(
                "📭 Scheduler del guild {} ya no existe, finalización de {:?} descartada",
                self.guild_id, handle
            );
        }
    }
}

/// Sink de audio: reproduce una URL en la conexión de voz del guild
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Inicia el stream. `notifier` debe recibir exactamente una notificación
    /// por cada `start` exitoso.
    async fn start(
        &self,
        connection: &ConnectionHandle,
        stream_url: &str,
        volume: f32,
        notifier: CompletionNotifier,
    ) -> Result<PlaybackHandle>;

    async fn stop(&self, handle: PlaybackHandle) -> Result<()>;

    async fn pause(&self, handle: PlaybackHandle) -> Result<()>;

    async fn resume(&self, handle: PlaybackHandle) -> Result<()>;

    async fn set_volume(&self, handle: PlaybackHandle, volume: f32) -> Result<()>;
}

/// Transporte de voz: dueño de la conexión al canal
#[async_trait]
pub trait VoiceTransport: Send + Sync {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<ConnectionHandle>;

    async fn move_to(
        &self,
        connection: &ConnectionHandle,
        channel_id: ChannelId,
    ) -> Result<ConnectionHandle>;

    async fn disconnect(&self, connection: &ConnectionHandle) -> Result<()>;
}
