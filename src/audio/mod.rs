//! # Audio Module
//!
//! Multi-guild playback core for Kaori.
//!
//! ## Architecture
//!
//! ### [`registry`] - Guild Registry
//! - Lazily creates one scheduler per guild and hands out cloneable handles
//! - Composes connect, resolve and enqueue for `/play`
//!
//! ### [`scheduler`] - Playback Scheduler
//! - One task per guild, fed by a mailbox of user commands and sink
//!   completion notifications
//! - FIFO queue, auto-advance, skip/pause/resume/stop and live volume
//! - Stale completions and stale resolutions are ignored
//!
//! ### [`sink`] - Audio Sink and Voice Transport
//! - The capabilities the scheduler drives; the Discord implementation lives
//!   in `bot::voice`
//!
//! ### [`progress`] - Progress Calculator
//! - Elapsed time, percentage and text bar for "now playing"
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use kaori::audio::GuildRegistry;
//! use serenity::all::{ChannelId, GuildId};
//!
//! # async fn example(registry: GuildRegistry) -> anyhow::Result<()> {
//! let guild_id = GuildId::new(123456789);
//!
//! // Resolve, connect and queue
//! registry.play(guild_id, "lofi hip hop", ChannelId::new(42)).await?;
//!
//! // Control playback
//! let guild = registry.get_or_create(guild_id);
//! guild.pause().await?;
//! guild.resume().await?;
//! guild.skip().await?;
//! # Ok(())
//! # }
//! ```

pub mod progress;
pub mod registry;
pub mod scheduler;
pub mod sink;
pub mod state;
pub mod track;

#[cfg(test)]
pub(crate) mod testing;

pub use progress::Progress;
pub use registry::GuildRegistry;
pub use scheduler::{EnqueueOutcome, EventSender, GuildHandle, PlaybackEvent};
pub use sink::{AudioSink, CompletionNotifier, ConnectionHandle, PlaybackHandle, VoiceTransport};
pub use state::{GuildSnapshot, PlayerStatus};
pub use track::Track;
