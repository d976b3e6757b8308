//! # Kaori
//!
//! Multi-guild Discord music bot. Every guild gets its own playback
//! scheduler (an actor task with a mailbox) that owns the queue, drives
//! sequential playback and reacts to completion notifications coming from
//! the voice driver.
//!
//! - [`audio`] - per-guild state, scheduler, registry and progress maths
//! - [`sources`] - media resolution with retry (yt-dlp backed)
//! - [`bot`] - serenity/songbird glue and the command adapter
//! - [`ui`] - embeds for "now playing" style replies

pub mod audio;
pub mod bot;
pub mod config;
pub mod error;
pub mod sources;
pub mod ui;
