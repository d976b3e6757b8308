use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{application::CommandOptionType, id::GuildId},
    prelude::Context,
};

use super::adapter::MusicCommand;

/// Nombre de la opción de `/play`
pub const QUERY_OPTION: &str = "song_query";
/// Nombre de la opción de `/volume`
pub const VOLUME_OPTION: &str = "volume";

fn all_commands() -> Vec<CreateCommand> {
    vec![
        greet_command(),
        play_command(),
        skip_command(),
        pause_command(),
        resume_command(),
        stop_command(),
        volume_command(),
        nowplaying_command(),
        queue_command(),
    ]
}

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in all_commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, all_commands()).await?;

    Ok(())
}

/// Convierte un slash command en [`MusicCommand`]; `None` si no se reconoce
/// o falta una opción obligatoria
pub fn parse_command(name: &str, query: Option<&str>, volume: Option<i64>) -> Option<MusicCommand> {
    let command = match name {
        "greet" => MusicCommand::Greet,
        "play" => MusicCommand::Play {
            query: query?.trim().to_string(),
        },
        "skip" => MusicCommand::Skip,
        "pause" => MusicCommand::Pause,
        "resume" => MusicCommand::Resume,
        "stop" => MusicCommand::Stop,
        "volume" => MusicCommand::Volume { percent: volume? },
        "nowplaying" => MusicCommand::NowPlaying,
        "queue" => MusicCommand::Queue,
        _ => return None,
    };

    Some(command)
}

fn greet_command() -> CreateCommand {
    CreateCommand::new("greet").description("Sends a greeting to the user")
}

// Comandos de reproducción

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Play a song or add it to the queue.")
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, QUERY_OPTION, "Search query")
                .required(true),
        )
}

// Comandos de control

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Skips the current playing song")
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pause the currently playing song.")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Resume the currently paused song.")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Stop playback and clear the queue.")
}

fn volume_command() -> CreateCommand {
    // Sin min/max: el rango se valida al ejecutar para responder con un mensaje
    CreateCommand::new("volume")
        .description("Change the playback volume (0-100)")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, VOLUME_OPTION, "Volume level (0-100)")
                .required(true),
        )
}

// Comandos de información

fn nowplaying_command() -> CreateCommand {
    CreateCommand::new("nowplaying").description("Show information about the currently playing song")
}

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue").description("Show the current song queue")
}
