//! Fakes de sink y transporte para los tests del scheduler y del registro.

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use super::{
    sink::{AudioSink, CompletionNotifier, ConnectionHandle, PlaybackHandle, VoiceTransport},
    track::Track,
};

/// Track con URL `http://x/<title>`
pub fn playable(title: &str, duration_secs: u64) -> Track {
    Track::new(title)
        .with_stream_url(format!("http://x/{}", title))
        .with_duration_secs(duration_secs)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Start { url: String, volume: f32 },
    Stop(PlaybackHandle),
    Pause(PlaybackHandle),
    Resume(PlaybackHandle),
    SetVolume(PlaybackHandle, f32),
}

/// Sink en memoria. `stop` notifica la finalización igual que un sink real.
#[derive(Default)]
pub struct FakeSink {
    next_id: AtomicU64,
    last: Mutex<Option<PlaybackHandle>>,
    calls: Mutex<Vec<SinkCall>>,
    notifiers: Mutex<HashMap<PlaybackHandle, CompletionNotifier>>,
    failing_urls: Mutex<HashSet<String>>,
}

impl FakeSink {
    pub fn fail_url(&self, url: &str) {
        self.failing_urls.lock().insert(url.to_string());
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().clone()
    }

    pub fn started_urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                SinkCall::Start { url, .. } => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_handle(&self) -> Option<PlaybackHandle> {
        *self.last.lock()
    }

    /// Termina el stream desde otro hilo, como lo haría el driver de audio
    pub fn finish(&self, handle: PlaybackHandle, error: Option<&str>) {
        let notifier = self.notifiers.lock().remove(&handle);
        if let Some(notifier) = notifier {
            let error = error.map(str::to_string);
            std::thread::spawn(move || notifier.notify(handle, error))
                .join()
                .unwrap();
        }
    }
}

#[async_trait]
impl AudioSink for FakeSink {
    async fn start(
        &self,
        _connection: &ConnectionHandle,
        stream_url: &str,
        volume: f32,
        notifier: CompletionNotifier,
    ) -> Result<PlaybackHandle> {
        self.calls.lock().push(SinkCall::Start {
            url: stream_url.to_string(),
            volume,
        });

        if self.failing_urls.lock().contains(stream_url) {
            bail!("cannot decode {}", stream_url);
        }

        let handle = PlaybackHandle(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.notifiers.lock().insert(handle, notifier);
        *self.last.lock() = Some(handle);
        Ok(handle)
    }

    async fn stop(&self, handle: PlaybackHandle) -> Result<()> {
        self.calls.lock().push(SinkCall::Stop(handle));
        let notifier = self.notifiers.lock().remove(&handle);
        if let Some(notifier) = notifier {
            notifier.notify(handle, None);
        }
        Ok(())
    }

    async fn pause(&self, handle: PlaybackHandle) -> Result<()> {
        self.calls.lock().push(SinkCall::Pause(handle));
        Ok(())
    }

    async fn resume(&self, handle: PlaybackHandle) -> Result<()> {
        self.calls.lock().push(SinkCall::Resume(handle));
        Ok(())
    }

    async fn set_volume(&self, handle: PlaybackHandle, volume: f32) -> Result<()> {
        self.calls.lock().push(SinkCall::SetVolume(handle, volume));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTransport {
    connects: AtomicUsize,
    moves: AtomicUsize,
    disconnects: AtomicUsize,
    fail_connect: AtomicBool,
}

impl FakeTransport {
    pub fn fail_connect(&self) {
        self.fail_connect.store(true, Ordering::SeqCst);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn moves(&self) -> usize {
        self.moves.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceTransport for FakeTransport {
    async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<ConnectionHandle> {
        if self.fail_connect.load(Ordering::SeqCst) {
            bail!("voice gateway timed out");
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(ConnectionHandle {
            guild_id,
            channel_id,
        })
    }

    async fn move_to(
        &self,
        connection: &ConnectionHandle,
        channel_id: ChannelId,
    ) -> Result<ConnectionHandle> {
        self.moves.fetch_add(1, Ordering::SeqCst);
        Ok(ConnectionHandle {
            guild_id: connection.guild_id,
            channel_id,
        })
    }

    async fn disconnect(&self, _connection: &ConnectionHandle) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
