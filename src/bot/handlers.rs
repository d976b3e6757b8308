use anyhow::Result;
use serenity::{
    builder::{CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse},
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
        mention::Mentionable,
    },
    prelude::Context,
};
use tracing::info;

use super::{
    adapter::{self, CommandContext, Reply},
    commands::{self, QUERY_OPTION, VOLUME_OPTION},
    KaoriBot,
};
use crate::ui::embeds;

/// Maneja comandos slash
pub async fn handle_command(ctx: &Context, command: CommandInteraction, bot: &KaoriBot) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    // Los anuncios de reproducción van al último canal donde se usó un comando
    bot.remember_channel(guild_id, command.channel_id);

    let query = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == QUERY_OPTION)
        .and_then(|opt| opt.value.as_str());
    let volume = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == VOLUME_OPTION)
        .and_then(|opt| opt.value.as_i64());

    let Some(music_command) = commands::parse_command(&command.data.name, query, volume) else {
        command
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content("❌ Comando no reconocido")
                        .ephemeral(true),
                ),
            )
            .await?;
        return Ok(());
    };

    let context = CommandContext {
        guild_id,
        user_mention: command.user.mention().to_string(),
        voice_channel: get_user_voice_channel(ctx, guild_id, command.user.id),
    };
    adapter::log_command(&context, &music_command);

    if music_command.is_slow() {
        // Defer la respuesta ya que puede tomar tiempo
        command
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
            )
            .await?;

        let reply = bot.adapter().execute(&context, music_command).await;
        command.edit_response(&ctx.http, edit_for(reply)).await?;
    } else {
        let reply = bot.adapter().execute(&context, music_command).await;
        command
            .create_response(&ctx.http, CreateInteractionResponse::Message(message_for(reply)))
            .await?;
    }

    Ok(())
}

fn message_for(reply: Reply) -> CreateInteractionResponseMessage {
    match reply {
        Reply::Text(text) => CreateInteractionResponseMessage::new().content(text),
        Reply::NowPlaying(view) => {
            CreateInteractionResponseMessage::new().embed(embeds::now_playing_embed(&view))
        }
    }
}

fn edit_for(reply: Reply) -> EditInteractionResponse {
    match reply {
        Reply::Text(text) => EditInteractionResponse::new().content(text),
        Reply::NowPlaying(view) => EditInteractionResponse::new().embed(embeds::now_playing_embed(&view)),
    }
}

/// Canal de voz del usuario según la caché del gateway
fn get_user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;

    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}
