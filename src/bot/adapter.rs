//! Translates chat commands into scheduler operations and scheduler outcomes
//! into reply text. Nothing here touches Discord directly, so the whole
//! command surface is testable without a gateway connection.

use chrono::Utc;
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tracing::{info, warn};

use crate::audio::{EnqueueOutcome, GuildRegistry, Progress, Track};
use crate::error::{InvalidOperation, PlaybackError};

/// Quién y desde dónde se invocó un comando
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    pub guild_id: GuildId,
    pub user_mention: String,
    /// Canal de voz del usuario, si está en uno
    pub voice_channel: Option<ChannelId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MusicCommand {
    Greet,
    Play { query: String },
    Skip,
    Pause,
    Resume,
    Stop,
    /// Porcentaje tal cual lo escribió el usuario
    Volume { percent: i64 },
    NowPlaying,
    Queue,
}

impl MusicCommand {
    /// `/play` resuelve en red; hay que diferir la respuesta
    pub fn is_slow(&self) -> bool {
        matches!(self, MusicCommand::Play { .. })
    }
}

/// Datos para el embed de "now playing"
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlayingView {
    pub track: Track,
    pub progress: Option<Progress>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    NowPlaying(NowPlayingView),
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }
}

pub struct CommandAdapter {
    registry: Arc<GuildRegistry>,
    progress_bar_length: usize,
}

impl CommandAdapter {
    pub fn new(registry: Arc<GuildRegistry>, progress_bar_length: usize) -> Self {
        Self {
            registry,
            progress_bar_length,
        }
    }

    pub fn registry(&self) -> &Arc<GuildRegistry> {
        &self.registry
    }

    pub async fn execute(&self, ctx: &CommandContext, command: MusicCommand) -> Reply {
        match command {
            MusicCommand::Greet => Reply::Text(format!("Nyahello, {}", ctx.user_mention)),
            MusicCommand::Play { query } => self.play(ctx, &query).await,
            MusicCommand::Skip => self.skip(ctx).await,
            MusicCommand::Pause => self.pause(ctx).await,
            MusicCommand::Resume => self.resume(ctx).await,
            MusicCommand::Stop => self.stop(ctx).await,
            MusicCommand::Volume { percent } => self.volume(ctx, percent).await,
            MusicCommand::NowPlaying => self.now_playing(ctx).await,
            MusicCommand::Queue => self.queue(ctx).await,
        }
    }

    async fn play(&self, ctx: &CommandContext, query: &str) -> Reply {
        let Some(channel_id) = ctx.voice_channel else {
            return Reply::text("You must be in a voice channel to use this command.");
        };

        match self.registry.play(ctx.guild_id, query, channel_id).await {
            Ok(EnqueueOutcome::Started(track)) => {
                Reply::Text(format!("Now playing: **{}**", track.title))
            }
            Ok(EnqueueOutcome::Queued { track, .. }) => {
                Reply::Text(format!("Added to queue: **{}**", track.title))
            }
            Ok(EnqueueOutcome::Discarded(track)) => Reply::Text(format!(
                "Playback was stopped before **{}** could be queued.",
                track.title
            )),
            Err(PlaybackError::ResolutionFailed { .. }) => {
                Reply::text("No results found. Try a different search.")
            }
            Err(PlaybackError::ConnectFailed(reason)) => {
                Reply::Text(format!("Failed to connect to voice channel: {}", reason))
            }
            Err(e) => unexpected(ctx, e),
        }
    }

    async fn skip(&self, ctx: &CommandContext) -> Reply {
        let Some(guild) = self.registry.get(ctx.guild_id) else {
            return Reply::text("Not playing anything to skip.");
        };

        match guild.skip().await {
            Ok(()) => Reply::text("Skipped the current song."),
            Err(PlaybackError::InvalidOperation(_)) => Reply::text("Not playing anything to skip."),
            Err(e) => unexpected(ctx, e),
        }
    }

    async fn pause(&self, ctx: &CommandContext) -> Reply {
        let Some(guild) = self.registry.get(ctx.guild_id) else {
            return Reply::text("I'm not in a voice channel.");
        };

        match guild.pause().await {
            Ok(()) => Reply::text("Playback paused!"),
            Err(PlaybackError::InvalidOperation(InvalidOperation::NotConnected)) => {
                Reply::text("I'm not in a voice channel.")
            }
            Err(PlaybackError::InvalidOperation(_)) => Reply::text("Nothing is currently playing."),
            Err(e) => unexpected(ctx, e),
        }
    }

    async fn resume(&self, ctx: &CommandContext) -> Reply {
        let Some(guild) = self.registry.get(ctx.guild_id) else {
            return Reply::text("I'm not in a voice channel.");
        };

        match guild.resume().await {
            Ok(()) => Reply::text("Playback resumed!"),
            Err(PlaybackError::InvalidOperation(InvalidOperation::NotConnected)) => {
                Reply::text("I'm not in a voice channel.")
            }
            Err(PlaybackError::InvalidOperation(_)) => Reply::text("I'm not paused right now."),
            Err(e) => unexpected(ctx, e),
        }
    }

    async fn stop(&self, ctx: &CommandContext) -> Reply {
        let Some(guild) = self.registry.get(ctx.guild_id) else {
            return Reply::text("I'm not connected to any voice channel.");
        };

        match guild.stop().await {
            Ok(()) => Reply::text("Stopped playback and disconnected!"),
            Err(PlaybackError::InvalidOperation(_)) => {
                Reply::text("I'm not connected to any voice channel.")
            }
            Err(e) => unexpected(ctx, e),
        }
    }

    async fn volume(&self, ctx: &CommandContext, percent: i64) -> Reply {
        if !(0..=100).contains(&percent) {
            return Reply::text("Volume must be between 0 and 100.");
        }

        let guild = self.registry.get_or_create(ctx.guild_id);
        match guild.set_volume(percent as f32 / 100.0).await {
            Ok(()) => Reply::Text(format!("Volume set to {}%", percent)),
            Err(PlaybackError::InvalidVolume(_)) => Reply::text("Volume must be between 0 and 100."),
            Err(e) => unexpected(ctx, e),
        }
    }

    async fn now_playing(&self, ctx: &CommandContext) -> Reply {
        let snapshot = match self.registry.get(ctx.guild_id) {
            Some(guild) => match guild.snapshot().await {
                Ok(snapshot) => snapshot,
                Err(e) => return unexpected(ctx, e),
            },
            None => return Reply::text("Nothing is currently playing."),
        };

        let progress = snapshot.progress(Utc::now(), self.progress_bar_length);
        match snapshot.current {
            Some(track) => Reply::NowPlaying(NowPlayingView { track, progress }),
            None => Reply::text("Nothing is currently playing."),
        }
    }

    async fn queue(&self, ctx: &CommandContext) -> Reply {
        let queue = match self.registry.get(ctx.guild_id) {
            Some(guild) => match guild.snapshot().await {
                Ok(snapshot) => snapshot.queue,
                Err(e) => return unexpected(ctx, e),
            },
            None => Vec::new(),
        };

        if queue.is_empty() {
            return Reply::text("The queue is empty!");
        }

        Reply::Text(format_queue(&queue))
    }
}

/// `**Current Queue:**` seguido de una línea numerada por track
pub fn format_queue(queue: &[Track]) -> String {
    let lines: Vec<String> = queue
        .iter()
        .enumerate()
        .map(|(i, track)| format!("{}. {}", i + 1, track.title))
        .collect();

    format!("**Current Queue:**\n{}", lines.join("\n"))
}

fn unexpected(ctx: &CommandContext, error: PlaybackError) -> Reply {
    warn!("⚠️ Error inesperado en guild {}: {}", ctx.guild_id, error);
    Reply::Text(format!("Something went wrong: {}", error))
}

/// Log de auditoría por comando
pub fn log_command(ctx: &CommandContext, command: &MusicCommand) {
    info!(
        "📝 Comando {:?} de {} en guild {}",
        command, ctx.user_mention, ctx.guild_id
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::{playable, FakeSink, FakeTransport};
    use crate::sources::{MockMediaResolver, TrackResolver};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    struct Fixture {
        adapter: CommandAdapter,
        sink: Arc<FakeSink>,
    }

    fn fixture() -> Fixture {
        let mut mock = MockMediaResolver::new();
        mock.expect_source_name().return_const("mock");
        mock.expect_search().returning(|query| {
            if query == "nothing" {
                Ok(vec![])
            } else {
                Ok(vec![playable(query, 120)
                    .with_uploader("Uploader")
                    .with_view_count(1_000)])
            }
        });

        let sink = Arc::new(FakeSink::default());
        let resolver = TrackResolver::new(Arc::new(mock)).with_retry_policy(3, Duration::from_secs(2));
        let registry = GuildRegistry::new(
            Arc::new(resolver),
            sink.clone(),
            Arc::new(FakeTransport::default()),
            0.5,
        );

        Fixture {
            adapter: CommandAdapter::new(Arc::new(registry), 20),
            sink,
        }
    }

    fn in_voice() -> CommandContext {
        CommandContext {
            guild_id: GuildId::new(1),
            user_mention: "<@99>".to_string(),
            voice_channel: Some(ChannelId::new(5)),
        }
    }

    fn not_in_voice() -> CommandContext {
        CommandContext {
            voice_channel: None,
            ..in_voice()
        }
    }

    fn text(reply: Reply) -> String {
        match reply {
            Reply::Text(text) => text,
            other => panic!("expected text reply, got {:?}", other),
        }
    }

    fn play(query: &str) -> MusicCommand {
        MusicCommand::Play {
            query: query.to_string(),
        }
    }

    #[tokio::test]
    async fn test_greet() {
        let f = fixture();
        let reply = f.adapter.execute(&in_voice(), MusicCommand::Greet).await;
        assert_eq!(text(reply), "Nyahello, <@99>");
    }

    #[tokio::test]
    async fn test_play_then_queue_messages() {
        let f = fixture();
        let ctx = in_voice();

        assert_eq!(text(f.adapter.execute(&ctx, play("A")).await), "Now playing: **A**");
        assert_eq!(text(f.adapter.execute(&ctx, play("B")).await), "Added to queue: **B**");
        assert_eq!(text(f.adapter.execute(&ctx, play("C")).await), "Added to queue: **C**");

        assert_eq!(
            text(f.adapter.execute(&ctx, MusicCommand::Queue).await),
            "**Current Queue:**\n1. B\n2. C"
        );
    }

    #[tokio::test]
    async fn test_play_requires_voice_channel() {
        let f = fixture();
        let reply = f.adapter.execute(&not_in_voice(), play("A")).await;
        assert_eq!(text(reply), "You must be in a voice channel to use this command.");
        assert!(f.adapter.registry().get(GuildId::new(1)).is_none());
    }

    #[tokio::test]
    async fn test_play_without_results() {
        let f = fixture();
        let reply = f.adapter.execute(&in_voice(), play("nothing")).await;
        assert_eq!(text(reply), "No results found. Try a different search.");
        assert!(f.sink.started_urls().is_empty());
    }

    #[tokio::test]
    async fn test_control_commands_before_any_playback() {
        let f = fixture();
        let ctx = in_voice();

        let cases = [
            (MusicCommand::Skip, "Not playing anything to skip."),
            (MusicCommand::Pause, "I'm not in a voice channel."),
            (MusicCommand::Resume, "I'm not in a voice channel."),
            (MusicCommand::Stop, "I'm not connected to any voice channel."),
            (MusicCommand::NowPlaying, "Nothing is currently playing."),
            (MusicCommand::Queue, "The queue is empty!"),
        ];
        for (command, expected) in cases {
            assert_eq!(text(f.adapter.execute(&ctx, command).await), expected);
        }
    }

    #[tokio::test]
    async fn test_pause_resume_stop_flow() {
        let f = fixture();
        let ctx = in_voice();
        f.adapter.execute(&ctx, play("A")).await;

        assert_eq!(text(f.adapter.execute(&ctx, MusicCommand::Resume).await), "I'm not paused right now.");
        assert_eq!(text(f.adapter.execute(&ctx, MusicCommand::Pause).await), "Playback paused!");
        assert_eq!(text(f.adapter.execute(&ctx, MusicCommand::Pause).await), "Nothing is currently playing.");
        assert_eq!(text(f.adapter.execute(&ctx, MusicCommand::Resume).await), "Playback resumed!");
        assert_eq!(text(f.adapter.execute(&ctx, MusicCommand::Skip).await), "Skipped the current song.");

        f.adapter.execute(&ctx, play("B")).await;
        assert_eq!(
            text(f.adapter.execute(&ctx, MusicCommand::Stop).await),
            "Stopped playback and disconnected!"
        );
        assert_eq!(
            text(f.adapter.execute(&ctx, MusicCommand::Stop).await),
            "I'm not connected to any voice channel."
        );
        assert_eq!(
            text(f.adapter.execute(&ctx, MusicCommand::Pause).await),
            "I'm not in a voice channel."
        );
    }

    #[tokio::test]
    async fn test_volume_bounds_and_conversion() {
        let f = fixture();
        let ctx = in_voice();

        for bad in [-1, 101, 1000] {
            assert_eq!(
                text(f.adapter.execute(&ctx, MusicCommand::Volume { percent: bad }).await),
                "Volume must be between 0 and 100."
            );
        }

        assert_eq!(
            text(f.adapter.execute(&ctx, MusicCommand::Volume { percent: 30 }).await),
            "Volume set to 30%"
        );
        let guild = f.adapter.registry().get(ctx.guild_id).unwrap();
        assert_eq!(guild.volume().await.unwrap(), 0.3);

        assert_eq!(
            text(f.adapter.execute(&ctx, MusicCommand::Volume { percent: 0 }).await),
            "Volume set to 0%"
        );
        assert_eq!(guild.volume().await.unwrap(), 0.0);
    }

    #[tokio::test]
    async fn test_now_playing_view() {
        let f = fixture();
        let ctx = in_voice();
        f.adapter.execute(&ctx, play("A")).await;

        match f.adapter.execute(&ctx, MusicCommand::NowPlaying).await {
            Reply::NowPlaying(view) => {
                assert_eq!(view.track.title, "A");
                assert_eq!(view.track.uploader.as_deref(), Some("Uploader"));
                let progress = view.progress.unwrap();
                assert_eq!(progress.duration_secs, 120);
                assert_eq!(progress.bar.chars().count(), 20);
            }
            other => panic!("expected now playing view, got {:?}", other),
        }
    }

    #[test]
    fn test_format_queue_numbering() {
        let queue = vec![Track::new("one"), Track::new("two"), Track::new("three")];
        assert_eq!(
            format_queue(&queue),
            "**Current Queue:**\n1. one\n2. two\n3. three"
        );
    }

    #[test]
    fn test_only_play_is_slow() {
        assert!(play("x").is_slow());
        assert!(!MusicCommand::Queue.is_slow());
        assert!(!MusicCommand::Volume { percent: 5 }.is_slow());
    }
}
