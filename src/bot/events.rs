use dashmap::DashMap;
use serenity::{
    async_trait,
    builder::CreateMessage,
    http::Http,
    model::id::{ChannelId, GuildId},
};
use songbird::{
    tracks::{PlayMode, TrackHandle},
    Event as VoiceEvent, EventContext, EventHandler as VoiceEventHandler,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::audio::{CompletionNotifier, PlaybackEvent, PlaybackHandle};
use crate::error::PlaybackError;
use crate::ui::embeds;

/// Handler para el fin (o error) de un track.
///
/// Registered for both `TrackEvent::End` and `TrackEvent::Error`; the shared
/// flag makes sure the scheduler hears about each stream exactly once.
#[derive(Clone)]
pub struct TrackCompletionHandler {
    handle: PlaybackHandle,
    notifier: CompletionNotifier,
    fired: Arc<AtomicBool>,
    tracks: Arc<DashMap<PlaybackHandle, TrackHandle>>,
}

impl TrackCompletionHandler {
    pub fn new(
        handle: PlaybackHandle,
        notifier: CompletionNotifier,
        tracks: Arc<DashMap<PlaybackHandle, TrackHandle>>,
    ) -> Self {
        Self {
            handle,
            notifier,
            fired: Arc::new(AtomicBool::new(false)),
            tracks,
        }
    }

    fn fire(&self, error: Option<String>) {
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }
        self.tracks.remove(&self.handle);
        self.notifier.notify(self.handle, error);
    }
}

#[async_trait]
impl VoiceEventHandler for TrackCompletionHandler {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<VoiceEvent> {
        let mut error = None;

        if let EventContext::Track(track_list) = ctx {
            for (state, _handle) in *track_list {
                if let PlayMode::Errored(e) = &state.playing {
                    error!(
                        "❌ Error en track para guild {}: {:?}",
                        self.notifier.guild_id(),
                        e
                    );
                    error = Some(format!("{:?}", e));
                }
            }
        }

        debug!("🎵 Track terminó en guild {}", self.notifier.guild_id());
        self.fire(error);

        None
    }
}

/// Canal de texto donde se anuncian los eventos de cada guild
pub type AnnounceChannels = Arc<DashMap<GuildId, ChannelId>>;

/// Publica en el chat los eventos de reproducción
pub fn spawn_announcer(
    http: Arc<Http>,
    channels: AnnounceChannels,
    mut events: mpsc::UnboundedReceiver<PlaybackEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let guild_id = match &event {
                PlaybackEvent::TrackStarted { guild_id, .. }
                | PlaybackEvent::StartFailed { guild_id, .. }
                | PlaybackEvent::PlaybackFailed { guild_id, .. }
                | PlaybackEvent::QueueFinished { guild_id } => *guild_id,
            };

            let Some(message) = announcement(&event) else {
                continue;
            };

            let Some(channel_id) = channels.get(&guild_id).map(|c| *c.value()) else {
                debug!("Sin canal de anuncios para guild {}", guild_id);
                continue;
            };

            if let Err(e) = channel_id.send_message(&http, message).await {
                warn!("⚠️ No se pudo enviar anuncio en guild {}: {:?}", guild_id, e);
            }
        }

        info!("📪 Canal de eventos cerrado, anunciador finalizado");
    })
}

/// Mensaje de chat para un evento; `None` si no se anuncia
pub fn announcement(event: &PlaybackEvent) -> Option<CreateMessage> {
    match event {
        PlaybackEvent::TrackStarted { track, .. } => {
            Some(CreateMessage::new().embed(embeds::track_started_embed(track)))
        }
        PlaybackEvent::StartFailed { error, .. } | PlaybackEvent::PlaybackFailed { error, .. } => {
            failure_text(error).map(|text| CreateMessage::new().content(text))
        }
        PlaybackEvent::QueueFinished { .. } => None,
    }
}

fn failure_text(error: &PlaybackError) -> Option<String> {
    match error {
        PlaybackError::TransportStartFailed { title, reason } => {
            Some(format!("Could not play {}: {}", title, reason))
        }
        PlaybackError::TransportRuntimeFailed { title, .. } => {
            Some(format!("Error playing {}", title))
        }
        _ => None,
    }
}
