use num_format::{Locale, ToFormattedString};
use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};

use crate::audio::{progress::format_duration, Track};
use crate::bot::adapter::NowPlayingView;

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Kaori";

/// Campo de embed: (nombre, valor, inline)
type Field = (&'static str, String, bool);

/// Embed de `/nowplaying`
pub fn now_playing_embed(view: &NowPlayingView) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("Now Playing")
        .color(colors::INFO_BLUE)
        .fields(now_playing_fields(view));

    if let Some(thumbnail) = &view.track.thumbnail_url {
        embed = embed.thumbnail(thumbnail);
    }

    embed.footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Anuncio cuando un track empieza a sonar
pub fn track_started_embed(track: &Track) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("🎵 Reproduciendo Ahora")
        .description(format!("**{}**", track.title))
        .color(colors::SUCCESS_GREEN)
        .fields(track_fields(track));

    if let Some(thumbnail) = &track.thumbnail_url {
        embed = embed.thumbnail(thumbnail);
    }

    if let Some(url) = &track.webpage_url {
        embed = embed.url(url);
    }

    embed
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

fn now_playing_fields(view: &NowPlayingView) -> Vec<Field> {
    let track = &view.track;
    let mut fields = vec![("Title", track.title.clone(), false)];

    if let Some(uploader) = &track.uploader {
        fields.push(("Channel", uploader.clone(), true));
    }

    if let Some(views) = track.view_count.filter(|&views| views > 0) {
        fields.push(("Views", format_views(views), true));
    }

    if let Some(progress) = &view.progress {
        fields.push(("Progress", progress.render(), false));
    }

    fields
}

fn track_fields(track: &Track) -> Vec<Field> {
    let mut fields = vec![(
        "🎤 Artista",
        track
            .uploader
            .clone()
            .unwrap_or_else(|| "Desconocido".to_string()),
        true,
    )];

    match track.duration() {
        Some(duration) => fields.push(("⏱️ Duración", format_duration(duration), true)),
        None => fields.push(("⏱️ Duración", "🔴 En vivo".to_string(), true)),
    }

    fields
}

/// `1234567` -> `1,234,567`
pub fn format_views(views: u64) -> String {
    views.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Progress;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_views() {
        assert_eq!(format_views(0), "0");
        assert_eq!(format_views(999), "999");
        assert_eq!(format_views(1_234_567), "1,234,567");
    }

    #[test]
    fn test_now_playing_fields_with_everything() {
        let view = NowPlayingView {
            track: Track::new("Song")
                .with_uploader("Band")
                .with_view_count(12_000)
                .with_duration_secs(120),
            progress: Some(Progress {
                elapsed_secs: 30,
                duration_secs: 120,
                percent: 25,
                bar: "▓░░░".to_string(),
            }),
        };

        assert_eq!(
            now_playing_fields(&view),
            vec![
                ("Title", "Song".to_string(), false),
                ("Channel", "Band".to_string(), true),
                ("Views", "12,000".to_string(), true),
                ("Progress", "0:30 / 2:00 [▓░░░] 25%".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_now_playing_fields_omit_unknowns() {
        let view = NowPlayingView {
            track: Track::new("Bare"),
            progress: None,
        };
        assert_eq!(
            now_playing_fields(&view),
            vec![("Title", "Bare".to_string(), false)]
        );
    }

    #[test]
    fn test_zero_views_and_duration_are_hidden() {
        let track = Track::new("Fresh").with_view_count(0).with_duration_secs(0);
        let view = NowPlayingView {
            track: track.clone(),
            progress: None,
        };

        assert_eq!(
            now_playing_fields(&view),
            vec![("Title", "Fresh".to_string(), false)]
        );
        assert_eq!(track_fields(&track)[1], ("⏱️ Duración", "🔴 En vivo".to_string(), true));
    }

    #[test]
    fn test_live_track_fields() {
        let fields = track_fields(&Track::new("Live"));
        assert_eq!(fields[0], ("🎤 Artista", "Desconocido".to_string(), true));
        assert_eq!(fields[1], ("⏱️ Duración", "🔴 En vivo".to_string(), true));
    }
}
