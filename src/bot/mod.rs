//! # Bot Module
//!
//! Discord glue for Kaori.
//!
//! This module contains:
//! - Slash command registration ([`commands`]) and dispatch ([`handlers`])
//! - The Discord-free command layer ([`adapter`])
//! - Songbird implementations of the audio sink and voice transport ([`voice`])
//! - Track completion handlers and chat announcements ([`events`])
//!
//! ## Architecture
//!
//! [`KaoriBot`] implements Serenity's [`EventHandler`]. Every slash command
//! is turned into a [`adapter::MusicCommand`] and executed by the
//! [`adapter::CommandAdapter`], which talks to the per-guild schedulers
//! through the [`GuildRegistry`].

use dashmap::DashMap;
use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Interaction, Ready, VoiceState},
    async_trait,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod adapter;
pub mod commands;
pub mod events;
pub mod handlers;
pub mod voice;

use crate::{audio::GuildRegistry, config::Config};
use adapter::CommandAdapter;
use events::AnnounceChannels;

/// Main Discord event handler.
///
/// ## Fields
///
/// - `config`: Bot configuration (token, dev guild, presentation)
/// - `adapter`: Command layer over the guild registry
/// - `announce_channels`: Last text channel used per guild, where playback
///   announcements are posted
pub struct KaoriBot {
    config: Arc<Config>,
    adapter: CommandAdapter,
    announce_channels: AnnounceChannels,
}

impl KaoriBot {
    pub fn new(config: Arc<Config>, registry: Arc<GuildRegistry>) -> Self {
        let adapter = CommandAdapter::new(registry, config.progress_bar_length);

        Self {
            config,
            adapter,
            announce_channels: Arc::new(DashMap::new()),
        }
    }

    pub fn adapter(&self) -> &CommandAdapter {
        &self.adapter
    }

    /// Mapa compartido con el anunciador de eventos
    pub fn announce_channels(&self) -> AnnounceChannels {
        self.announce_channels.clone()
    }

    pub fn remember_channel(&self, guild_id: GuildId, channel_id: ChannelId) {
        self.announce_channels.insert(guild_id, channel_id);
    }

    /// Registers slash commands with Discord.
    ///
    /// Commands are registered per-guild when `GUILD_ID` is configured
    /// (updates propagate in about a second, useful for development) and
    /// globally otherwise.
    async fn register_commands(&self, ctx: &Context) -> anyhow::Result<()> {
        info!("📝 Registrando comandos slash...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                info!("🏠 Registrando comandos para guild específica: {}", guild_id);
                commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                info!("🌐 Registrando comandos globalmente");
                commands::register_global_commands(ctx).await?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for KaoriBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("❌ Error al registrar comandos: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command_interaction) = interaction {
            if let Err(e) = handlers::handle_command(&ctx, command_interaction, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    /// Detects the bot being disconnected from voice by someone else and
    /// resets that guild's playback.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        let Some(guild_id) = new.guild_id else {
            return;
        };

        info!("🔌 Bot desconectado en guild {}", guild_id);
        match self.adapter.registry().get(guild_id) {
            Some(guild) => guild.notify_disconnected(),
            None => warn!("⚠️ Desconexión en guild {} sin estado de reproducción", guild_id),
        }
    }
}
