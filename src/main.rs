use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::{SerenityInit, Songbird};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use kaori::audio::GuildRegistry;
use kaori::bot::{
    events,
    voice::{SongbirdSink, SongbirdTransport},
    KaoriBot,
};
use kaori::config::Config;
use kaori::sources::{TrackResolver, YtDlpResolver};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kaori=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Kaori v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Arc::new(Config::load()?);
    info!("⚙️ {}", config.summary());

    // Manejar health check si es necesario
    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&config).await;
    }

    // Resolución de tracks
    let source = Arc::new(YtDlpResolver::from_config(&config));
    let resolver = Arc::new(TrackResolver::from_config(source, &config));

    // Voz y audio
    let songbird = Songbird::serenity();
    // Solo timeout de conexión: el cuerpo es un stream largo
    let http_client = reqwest::Client::builder()
        .connect_timeout(config.resolve_timeout())
        .build()?;
    let sink = Arc::new(SongbirdSink::new(songbird.clone(), http_client));
    let transport = Arc::new(SongbirdTransport::new(songbird.clone()));

    // Registro de guilds; los eventos se anuncian en el chat
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let registry = Arc::new(
        GuildRegistry::new(resolver, sink, transport, config.default_volume).with_events(events_tx),
    );

    // Configurar intents mínimos necesarios
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    // Crear handler del bot
    let handler = KaoriBot::new(config.clone(), registry);
    let announce_channels = handler.announce_channels();

    // Construir cliente
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .register_songbird_with(songbird)
        .await?;

    events::spawn_announcer(client.http.clone(), announce_channels, events_rx);

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        shard_manager.shutdown_all().await;
    });

    // Iniciar bot
    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

async fn health_check(config: &Config) -> Result<()> {
    // Verificar dependencias críticas
    let yt_dlp = async_process::Command::new(&config.ytdlp_path)
        .arg("--version")
        .output()
        .await?;

    if yt_dlp.status.success() {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("Dependencias faltantes: {}", config.ytdlp_path);
    }
}
