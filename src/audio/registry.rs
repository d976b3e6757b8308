use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tracing::{debug, info};

use super::{
    scheduler::{self, EnqueueOutcome, EventSender, GuildHandle},
    sink::{AudioSink, VoiceTransport},
};
use crate::error::PlaybackResult;
use crate::sources::TrackResolver;

/// Registro de schedulers por guild.
///
/// A guild's scheduler is created lazily on first use and lives for the
/// rest of the process; two concurrent first uses for the same guild still
/// end up sharing one scheduler.
pub struct GuildRegistry {
    guilds: DashMap<GuildId, GuildHandle>,
    resolver: Arc<TrackResolver>,
    sink: Arc<dyn AudioSink>,
    transport: Arc<dyn VoiceTransport>,
    default_volume: f32,
    events: Option<EventSender>,
}

impl GuildRegistry {
    pub fn new(
        resolver: Arc<TrackResolver>,
        sink: Arc<dyn AudioSink>,
        transport: Arc<dyn VoiceTransport>,
        default_volume: f32,
    ) -> Self {
        Self {
            guilds: DashMap::new(),
            resolver,
            sink,
            transport,
            default_volume,
            events: None,
        }
    }

    /// Los schedulers creados a partir de aquí publican sus eventos en `events`
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Obtiene o crea el scheduler del guild
    pub fn get_or_create(&self, guild_id: GuildId) -> GuildHandle {
        self.guilds
            .entry(guild_id)
            .or_insert_with(|| {
                info!("🆕 Creando estado de reproducción para guild {}", guild_id);
                scheduler::spawn(
                    guild_id,
                    self.default_volume,
                    self.sink.clone(),
                    self.transport.clone(),
                    self.events.clone(),
                )
            })
            .clone()
    }

    /// Scheduler existente, sin crearlo
    pub fn get(&self, guild_id: GuildId) -> Option<GuildHandle> {
        self.guilds.get(&guild_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.guilds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guilds.is_empty()
    }

    /// Conecta, resuelve la consulta y la encola.
    ///
    /// Resolution runs on the caller's task, so the guild keeps handling
    /// other commands while the lookup is in flight. If the guild is stopped
    /// before resolution completes, the result is discarded.
    pub async fn play(
        &self,
        guild_id: GuildId,
        query: &str,
        channel_id: ChannelId,
    ) -> PlaybackResult<EnqueueOutcome> {
        let guild = self.get_or_create(guild_id);
        let epoch = guild.connect(channel_id).await?;

        debug!("Resolviendo '{}' para guild {} (época {})", query, guild_id, epoch);
        let track = self.resolver.resolve(query).await?;

        guild.enqueue_tagged(track, channel_id, epoch).await
    }
}
