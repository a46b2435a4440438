//! # Playback Session
//!
//! Wraps one native player and turns its callbacks and the transport
//! commands issued against it into an ordered stream of status events.
//!
//! ## State Machine
//!
//! ```text
//! idle → preparing → ready → playing ⇄ paused → stopped / ended
//!                 (any) → error → stopped
//! ```
//!
//! `buffering` and `seeking` ride beside the primary state as a transient
//! sub-state. Every change of the primary state emits exactly one event,
//! except entering `preparing` (the channel protocol has no message for it)
//! and `release`, which is silent.
//!
//! ## Concurrency
//!
//! Native callbacks arrive on arbitrary threads through a
//! [`PlayerCallbackSender`] and are applied by a single driver task in arrival
//! order. Transport commands, auto-play included, are serialized by an async
//! command lock so one native call is in flight at a time. Native callbacks
//! do not take that lock. Every transition bumps a generation counter, and a
//! command only commits its own transition if the generation it observed
//! before awaiting the player is still current.
//!
//! State lives behind a `parking_lot::Mutex`; every transition updates state
//! and enqueues its event while holding the lock, so the queue order always
//! matches the transition order. The progress ticker checks the state and
//! enqueues `Progress` under the same lock, which is why no `Progress` can
//! follow a `Stop` or `Error`.

use crate::error::{PlaybackError, Result};
use crate::status::StatusSink;
use crate::types::{MediaInfo, PlaybackSessionId, PlaybackState};
use bridge_traits::player::{
    MediaPlayer, MediaPlayerFactory, PlayerCallback, PlayerCallbackReceiver, PlayerCallbackSender,
};
use core_runtime::events::PlaybackEvent;
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument, Span};

// ============================================================================
// Session State
// ============================================================================

struct SessionState {
    primary: PlaybackState,
    /// Bumped on every primary transition and by a `pause` that cancels a
    /// pending auto-play.
    generation: u64,
    transient: Option<PlaybackState>,
    /// Start playback as soon as preparation finishes.
    play_when_ready: bool,
    duration_ms: u64,
    lyrics: Option<String>,
    released: bool,
}

struct SessionInner {
    id: PlaybackSessionId,
    media: Arc<MediaInfo>,
    player: Box<dyn MediaPlayer>,
    state: Mutex<SessionState>,
    /// Serializes transport commands against the native player.
    commands: tokio::sync::Mutex<()>,
    status: StatusSink,
}

impl SessionInner {
    /// Change the primary state and enqueue its event. Caller holds the lock.
    fn transition(
        &self,
        state: &mut SessionState,
        to: PlaybackState,
        event: Option<PlaybackEvent>,
    ) {
        debug!(from = %state.primary, to = %to, "Playback state transition");
        state.primary = to;
        state.generation = state.generation.wrapping_add(1);
        if let Some(event) = event {
            self.status.emit(Some(Arc::clone(&self.media)), event);
        }
    }

    fn is_playing(&self) -> bool {
        let state = self.state.lock();
        !state.released && state.primary.is_playing()
    }

    fn ensure_not_released(&self) -> Result<()> {
        if self.state.lock().released {
            return Err(PlaybackError::Released);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Native callbacks
    // ------------------------------------------------------------------------

    async fn handle_callback(&self, callback: PlayerCallback) {
        match callback {
            PlayerCallback::Prepared { duration_ms } => {
                if let Some(generation) = self.on_prepared(duration_ms) {
                    if let Err(err) = self.resume(Some(generation)).await {
                        debug!(error = %err, "Auto-play did not start");
                    }
                }
            }
            PlayerCallback::BufferingUpdate { percent } => self.on_buffering(percent),
            PlayerCallback::SeekComplete { position_ms } => self.on_seek_complete(position_ms),
            PlayerCallback::Completion => self.on_completion(),
            PlayerCallback::Error { message } => self.fail_stop(message).await,
        }
    }

    /// Returns the generation of the `ready` transition if playback should
    /// start right away.
    fn on_prepared(&self, duration_ms: u64) -> Option<u64> {
        let mut state = self.state.lock();
        if state.released || state.primary != PlaybackState::Preparing {
            debug!(state = %state.primary, "Ignoring prepared callback");
            return None;
        }

        state.duration_ms = duration_ms;
        self.transition(
            &mut state,
            PlaybackState::Ready,
            Some(PlaybackEvent::Ready { duration_ms }),
        );
        std::mem::take(&mut state.play_when_ready).then_some(state.generation)
    }

    fn on_buffering(&self, percent: u8) {
        let mut state = self.state.lock();
        if state.released || state.primary.is_terminal() {
            return;
        }

        let percent = percent.min(100);
        if state.transient != Some(PlaybackState::Seeking) {
            state.transient = if percent == 100 {
                None
            } else {
                Some(PlaybackState::Buffering(percent))
            };
        }

        let buffering = !state.primary.is_playing();
        self.status.emit(
            Some(Arc::clone(&self.media)),
            PlaybackEvent::Buffering { buffering, percent },
        );
    }

    fn on_seek_complete(&self, position_ms: u64) {
        let mut state = self.state.lock();
        if state.released || state.primary.is_terminal() {
            return;
        }

        if state.transient == Some(PlaybackState::Seeking) {
            state.transient = None;
        }
        self.status.emit(
            Some(Arc::clone(&self.media)),
            PlaybackEvent::SeekComplete { position_ms },
        );
    }

    fn on_completion(&self) {
        let mut state = self.state.lock();
        if state.released {
            return;
        }

        if matches!(
            state.primary,
            PlaybackState::Playing | PlaybackState::Paused | PlaybackState::Ready
        ) {
            state.transient = None;
            info!("Media completed");
            self.transition(&mut state, PlaybackState::Ended, Some(PlaybackEvent::Ended));
        }
    }

    // ------------------------------------------------------------------------
    // Failure handling
    // ------------------------------------------------------------------------

    /// Enter the error state. Returns `false` if the failure must be ignored.
    fn enter_error(&self, message: &str) -> bool {
        let mut state = self.state.lock();
        if state.released || matches!(state.primary, PlaybackState::Error(_)) {
            return false;
        }

        state.play_when_ready = false;
        state.transient = None;
        self.transition(
            &mut state,
            PlaybackState::Error(message.to_string()),
            Some(PlaybackEvent::Error {
                message: message.to_string(),
            }),
        );
        true
    }

    fn leave_error(&self) {
        let mut state = self.state.lock();
        if !state.released && matches!(state.primary, PlaybackState::Error(_)) {
            self.transition(&mut state, PlaybackState::Stopped, Some(PlaybackEvent::Stop));
        }
    }

    /// Fail-stop: emit `Error`, stop the player, then `Stop`. No retries.
    async fn fail_stop(&self, message: String) {
        if !self.enter_error(&message) {
            return;
        }
        error!(%message, "Playback failed");

        if let Err(err) = self.player.stop().await {
            warn!(error = %err, "Failed to stop player after error");
        }
        self.leave_error();
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    /// Enter `playing` unless another transition happened since `generation`.
    /// Returns the state that won otherwise.
    fn mark_playing(&self, generation: u64) -> Option<PlaybackState> {
        let mut state = self.state.lock();
        if state.released {
            return None;
        }
        if state.generation != generation {
            return Some(state.primary.clone());
        }
        self.transition(
            &mut state,
            PlaybackState::Playing,
            Some(PlaybackEvent::PlayStatus { is_playing: true }),
        );
        None
    }

    /// Start the native player from a loaded state.
    ///
    /// `expected` pins auto-play to the `ready` transition that requested it;
    /// any later transition cancels it.
    async fn resume(&self, expected: Option<u64>) -> Result<()> {
        let _command = self.commands.lock().await;

        let generation = {
            let state = self.state.lock();
            if state.released {
                return Err(PlaybackError::Released);
            }
            if expected.is_some_and(|generation| generation != state.generation) {
                debug!(state = %state.primary, "Auto-play superseded");
                return Ok(());
            }
            match &state.primary {
                PlaybackState::Playing => return Ok(()),
                PlaybackState::Ready
                | PlaybackState::Paused
                | PlaybackState::Ended
                | PlaybackState::Stopped => state.generation,
                other => {
                    return Err(PlaybackError::InvalidState {
                        operation: "play",
                        state: other.to_string(),
                    })
                }
            }
        };

        if let Err(err) = self.player.play().await {
            self.fail_stop(err.to_string()).await;
            return Err(err.into());
        }

        if let Some(current) = self.mark_playing(generation) {
            debug!(state = %current, "Play superseded while in flight");
            self.settle_player(&current).await;
        }
        Ok(())
    }

    /// Bring the native player back in line with `state` after a superseded
    /// play.
    async fn settle_player(&self, state: &PlaybackState) {
        let result = match state {
            PlaybackState::Ready | PlaybackState::Paused => self.player.pause().await,
            PlaybackState::Stopped | PlaybackState::Ended | PlaybackState::Error(_) => {
                self.player.stop().await
            }
            _ => Ok(()),
        };
        if let Err(err) = result {
            warn!(error = %err, "Failed to settle player");
        }
    }

    fn emit_progress(&self, position_ms: u64, duration_ms: u64) {
        let state = self.state.lock();
        if state.released || !state.primary.is_playing() {
            return;
        }
        self.status.emit(
            Some(Arc::clone(&self.media)),
            PlaybackEvent::Progress {
                position_ms,
                duration_ms,
            },
        );
    }

    fn cached_duration(&self) -> u64 {
        self.state.lock().duration_ms
    }
}

// ============================================================================
// Background tasks
// ============================================================================

async fn drive_callbacks(
    inner: Arc<SessionInner>,
    mut callbacks: PlayerCallbackReceiver,
    cancel: CancellationToken,
) {
    loop {
        let callback = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            callback = callbacks.recv() => match callback {
                Some(callback) => callback,
                None => break,
            },
        };
        inner.handle_callback(callback).await;
    }
    debug!("Callback driver stopped");
}

async fn tick_progress(inner: Arc<SessionInner>, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        if !inner.is_playing() {
            continue;
        }

        let position_ms = match inner.player.position_ms().await {
            Ok(position) => position,
            Err(err) => {
                debug!(error = %err, "Skipping progress tick");
                continue;
            }
        };
        let duration_ms = match inner.player.duration_ms().await {
            Ok(duration) if duration > 0 => duration,
            _ => inner.cached_duration(),
        };

        inner.emit_progress(position_ms, duration_ms);
    }
    debug!("Progress ticker stopped");
}

// ============================================================================
// Playback Session
// ============================================================================

/// A single playback of one [`MediaInfo`] on one native player.
///
/// Created by [`PlaybackSession::start`]; ends with
/// [`release`](PlaybackSession::release). Dropping a session stops its
/// background tasks but does not release the native player.
pub struct PlaybackSession {
    inner: Arc<SessionInner>,
    cancel: CancellationToken,
    span: Span,
}

impl PlaybackSession {
    /// Create a native player and begin loading `media`.
    ///
    /// Returns as soon as loading has been initiated. The session is in
    /// `preparing` until the player reports `Prepared`; with
    /// `media.auto_play` playback starts right after `ready`.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::Bridge`] if the player cannot be created or
    /// refuses the source. The player is released before returning; no
    /// events are emitted.
    pub async fn start(
        factory: &dyn MediaPlayerFactory,
        media: Arc<MediaInfo>,
        status: StatusSink,
        progress_interval: Duration,
    ) -> Result<Self> {
        let id = PlaybackSessionId::new();
        let span = info_span!("playback_session", session_id = %id);

        let player = factory.create_player().instrument(span.clone()).await?;
        let (callbacks, receiver) = PlayerCallbackSender::channel();

        let inner = Arc::new(SessionInner {
            id,
            media: Arc::clone(&media),
            player,
            state: Mutex::new(SessionState {
                primary: PlaybackState::Preparing,
                generation: 0,
                transient: None,
                play_when_ready: media.auto_play,
                duration_ms: 0,
                lyrics: None,
                released: false,
            }),
            commands: tokio::sync::Mutex::new(()),
            status,
        });

        let cancel = CancellationToken::new();
        tokio::spawn(
            drive_callbacks(Arc::clone(&inner), receiver, cancel.child_token())
                .instrument(span.clone()),
        );
        tokio::spawn(
            tick_progress(Arc::clone(&inner), progress_interval, cancel.child_token())
                .instrument(span.clone()),
        );

        let session = Self {
            inner,
            cancel,
            span,
        };

        info!(
            parent: &session.span,
            title = %media.title,
            url = %redact_url(&media.url),
            auto_play = media.auto_play,
            "Loading media"
        );

        let load = session
            .inner
            .player
            .load(media.source(), callbacks)
            .instrument(session.span.clone())
            .await;

        if let Err(err) = load {
            warn!(parent: &session.span, error = %err, "Player rejected media");
            session.release().await;
            return Err(err.into());
        }

        Ok(session)
    }

    pub fn id(&self) -> PlaybackSessionId {
        self.inner.id
    }

    pub fn media(&self) -> Arc<MediaInfo> {
        Arc::clone(&self.inner.media)
    }

    /// Primary state (never `Buffering` or `Seeking`).
    pub fn state(&self) -> PlaybackState {
        self.inner.state.lock().primary.clone()
    }

    /// Transient sub-state, if a seek or network buffering is in progress.
    pub fn transient(&self) -> Option<PlaybackState> {
        self.inner.state.lock().transient.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.inner.is_playing()
    }

    pub fn is_released(&self) -> bool {
        self.inner.state.lock().released
    }

    /// Start or resume playback.
    ///
    /// While preparing, playback is deferred until the media is ready.
    #[instrument(skip(self), fields(session_id = %self.inner.id))]
    pub async fn play(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if state.released {
                return Err(PlaybackError::Released);
            }
            match &state.primary {
                PlaybackState::Preparing => {
                    state.play_when_ready = true;
                    return Ok(());
                }
                PlaybackState::Playing => return Ok(()),
                PlaybackState::Idle | PlaybackState::Error(_) => {
                    return Err(PlaybackError::InvalidState {
                        operation: "play",
                        state: state.primary.to_string(),
                    })
                }
                _ => {}
            }
        }

        self.inner.resume(None).await
    }

    /// Pause playback, keeping the position.
    #[instrument(skip(self), fields(session_id = %self.inner.id))]
    pub async fn pause(&self) -> Result<()> {
        let _command = self.inner.commands.lock().await;
        {
            let mut state = self.inner.state.lock();
            if state.released {
                return Err(PlaybackError::Released);
            }
            match state.primary {
                PlaybackState::Preparing => {
                    state.play_when_ready = false;
                    return Ok(());
                }
                PlaybackState::Playing => {}
                _ => {
                    // Cancels an auto-play still waiting for the command lock.
                    state.generation = state.generation.wrapping_add(1);
                    return Ok(());
                }
            }
        }

        if let Err(err) = self.inner.player.pause().await {
            self.inner.fail_stop(err.to_string()).await;
            return Err(err.into());
        }

        let mut state = self.inner.state.lock();
        if !state.released && state.primary.is_playing() {
            self.inner.transition(
                &mut state,
                PlaybackState::Paused,
                Some(PlaybackEvent::PlayStatus { is_playing: false }),
            );
        }
        Ok(())
    }

    /// Toggle between playing and paused. Returns [`is_playing`](Self::is_playing)
    /// afterwards.
    pub async fn play_or_pause(&self) -> Result<bool> {
        let toggled_pending = {
            let mut state = self.inner.state.lock();
            if state.primary == PlaybackState::Preparing && !state.released {
                state.play_when_ready = !state.play_when_ready;
                true
            } else {
                false
            }
        };

        if !toggled_pending {
            if self.is_playing() {
                self.pause().await?;
            } else {
                self.play().await?;
            }
        }
        Ok(self.is_playing())
    }

    /// Stop playback. Aborts loading when called while preparing.
    ///
    /// Safe in any state; a stopped or released session ignores the call.
    #[instrument(skip(self), fields(session_id = %self.inner.id))]
    pub async fn stop(&self) {
        let _command = self.inner.commands.lock().await;
        {
            let mut state = self.inner.state.lock();
            state.play_when_ready = false;
            if state.released || state.primary.is_terminal() {
                return;
            }
        }

        if let Err(err) = self.inner.player.stop().await {
            warn!(error = %err, "Player failed to stop");
        }

        let mut state = self.inner.state.lock();
        if !state.released && !state.primary.is_terminal() {
            state.transient = None;
            self.inner
                .transition(&mut state, PlaybackState::Stopped, Some(PlaybackEvent::Stop));
        }
    }

    /// Seek to `position_ms`, clamped to the known duration.
    ///
    /// Completion is reported with a `SeekComplete` event.
    #[instrument(skip(self), fields(session_id = %self.inner.id))]
    pub async fn seek_to(&self, position_ms: u64) -> Result<()> {
        let _command = self.inner.commands.lock().await;
        let target = {
            let mut state = self.inner.state.lock();
            if state.released {
                return Err(PlaybackError::Released);
            }
            if !state.primary.is_loaded() {
                return Err(PlaybackError::InvalidState {
                    operation: "seek",
                    state: state.primary.to_string(),
                });
            }
            state.transient = Some(PlaybackState::Seeking);
            match state.duration_ms {
                0 => position_ms,
                duration => position_ms.min(duration),
            }
        };

        if let Err(err) = self.inner.player.seek_to(target).await {
            self.inner.fail_stop(err.to_string()).await;
            return Err(err.into());
        }
        Ok(())
    }

    /// Set the playback speed multiplier.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::InvalidArgument`] unless `rate` is finite and > 0.
    #[instrument(skip(self), fields(session_id = %self.inner.id))]
    pub async fn set_speed(&self, rate: f32) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(PlaybackError::InvalidArgument(format!(
                "Playback rate must be a positive number, got {}",
                rate
            )));
        }
        self.inner.ensure_not_released()?;

        let _command = self.inner.commands.lock().await;
        if let Err(err) = self.inner.player.set_speed(rate).await {
            self.inner.fail_stop(err.to_string()).await;
            return Err(err.into());
        }
        Ok(())
    }

    /// Media duration in milliseconds, `0` when unknown.
    pub async fn duration(&self) -> Result<u64> {
        self.inner.ensure_not_released()?;
        match self.inner.player.duration_ms().await? {
            0 => Ok(self.inner.cached_duration()),
            duration => Ok(duration),
        }
    }

    /// Current position in milliseconds.
    pub async fn position(&self) -> Result<u64> {
        self.inner.ensure_not_released()?;
        Ok(self.inner.player.position_ms().await?)
    }

    /// Store lyric text for display. The text is opaque to the session.
    pub fn update_lyrics(&self, lyrics: impl Into<String>) {
        let lyrics = lyrics.into();
        debug!(session_id = %self.inner.id, len = lyrics.len(), "Lyrics updated");
        self.inner.state.lock().lyrics = Some(lyrics);
    }

    pub fn lyrics(&self) -> Option<String> {
        self.inner.state.lock().lyrics.clone()
    }

    /// Free the native player and stop background tasks.
    ///
    /// Emits nothing; events already queued keep their order. Safe to call
    /// repeatedly and in any state.
    #[instrument(skip(self), fields(session_id = %self.inner.id))]
    pub async fn release(&self) {
        self.cancel.cancel();

        {
            let mut state = self.inner.state.lock();
            if state.released {
                return;
            }
            state.released = true;
            state.play_when_ready = false;
            state.transient = None;
            state.primary = PlaybackState::Idle;
        }

        if let Err(err) = self.inner.player.release().await {
            warn!(error = %err, "Player failed to release");
        }
        info!("Playback session released");
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("PlaybackSession")
            .field("id", &self.inner.id)
            .field("title", &self.inner.media.title)
            .field("state", &state.primary)
            .field("transient", &state.transient)
            .field("released", &state.released)
            .finish()
    }
}
