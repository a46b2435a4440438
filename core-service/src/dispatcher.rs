//! # Command Dispatcher
//!
//! Turns named method-channel calls into playback operations.
//!
//! Every command runs behind one async mutex guarding the active
//! [`PlaybackSession`], so a `start` (teardown then rebuild) never interleaves
//! with another command. Commands return as soon as the operation has been
//! initiated; playback failures surface later as `error` events on the status
//! queue, never through the response.
//!
//! Numeric arguments may arrive as JSON numbers or strings. Both are coerced
//! through their string form; anything that does not parse yields
//! [`MethodResponse::ArgumentError`] and leaves playback untouched.

use crate::error::{CoreError, Result};
use bridge_traits::{
    AssetResolver, MediaPlayerFactory, MethodCall, NotificationAction, VolumeController,
};
use core_playback::{MediaInfo, PlaybackError, PlaybackSession, StatusSink};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, SessionEvent};
use core_runtime::logging::redact_url;
use core_runtime::CoreConfig;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

// ============================================================================
// Response
// ============================================================================

/// Result of one dispatched call, mirrored back to the application layer.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    /// The command ran (or was initiated); carries its return value.
    Success(Value),
    /// The call was malformed or not allowed right now. State is unchanged.
    ArgumentError(String),
    /// Unknown method name.
    NotImplemented,
}

impl MethodResponse {
    pub fn null() -> Self {
        MethodResponse::Success(Value::Null)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MethodResponse::Success(_))
    }

    /// Return value of a successful call.
    pub fn value(&self) -> Option<&Value> {
        match self {
            MethodResponse::Success(value) => Some(value),
            _ => None,
        }
    }
}

impl From<CoreError> for MethodResponse {
    fn from(err: CoreError) -> Self {
        MethodResponse::ArgumentError(err.to_string())
    }
}

// ============================================================================
// Argument Coercion
// ============================================================================

/// Parse a numeric argument through its string form.
fn parse_argument<T: FromStr>(call: &MethodCall, name: &'static str) -> Result<T> {
    let text = call
        .string_argument(name)
        .ok_or_else(|| CoreError::missing(name))?;

    text.trim()
        .parse::<T>()
        .map_err(|_| CoreError::MalformedArgument {
            name,
            message: format!("cannot parse {:?} as a number", text),
        })
}

/// Arguments of `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub url: String,
    pub title: String,
    pub description: String,
    pub cover: Option<String>,
    pub is_local: bool,
    pub is_local_cover: bool,
    pub auto_play: bool,
}

impl StartRequest {
    pub fn from_call(call: &MethodCall) -> Result<Self> {
        let url = call
            .string_argument("url")
            .filter(|url| !url.is_empty())
            .ok_or_else(|| CoreError::missing("url"))?;

        Ok(Self {
            url,
            title: call.string_argument("title").unwrap_or_default(),
            description: call.string_argument("desc").unwrap_or_default(),
            cover: call.string_argument("cover").filter(|cover| !cover.is_empty()),
            is_local: call.bool_argument("isLocal", false),
            is_local_cover: call.bool_argument("isLocalCover", false),
            auto_play: call.bool_argument("isAuto", false),
        })
    }

    /// Media as requested, before any asset resolution.
    fn unresolved(&self) -> MediaInfo {
        let mut media = MediaInfo::new(self.title.clone(), self.url.clone())
            .with_description(self.description.clone())
            .with_local_asset(self.is_local)
            .with_local_cover(self.is_local_cover)
            .with_auto_play(self.auto_play);
        media.cover = self.cover.clone();
        media
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes method calls to the single active playback session.
pub struct CommandDispatcher {
    player_factory: Arc<dyn MediaPlayerFactory>,
    asset_resolver: Option<Arc<dyn AssetResolver>>,
    volume_controller: Option<Arc<dyn VolumeController>>,
    progress_interval: Duration,
    platform_version: String,
    session: Mutex<Option<PlaybackSession>>,
    status: StatusSink,
    events: EventBus,
}

impl CommandDispatcher {
    pub fn new(config: &CoreConfig, status: StatusSink, events: EventBus) -> Self {
        Self {
            player_factory: Arc::clone(&config.player_factory),
            asset_resolver: config.asset_resolver.clone(),
            volume_controller: config.volume_controller.clone(),
            progress_interval: config.progress_interval,
            platform_version: config.platform_version.clone(),
            session: Mutex::new(None),
            status,
            events,
        }
    }

    /// Handle one call from the application layer.
    #[instrument(skip(self, call), fields(method = %call.method))]
    pub async fn dispatch(&self, call: MethodCall) -> MethodResponse {
        debug!("Dispatching method call");
        match call.method.as_str() {
            "getPlatformVersion" => MethodResponse::Success(json!(self.platform_version)),
            "start" => match StartRequest::from_call(&call) {
                Ok(request) => {
                    self.start(request).await;
                    MethodResponse::null()
                }
                Err(err) => err.into(),
            },
            "playOrPause" => self.toggle().await,
            "play" => self.transport(Transport::Play).await,
            "pause" => self.transport(Transport::Pause).await,
            "stop" => {
                self.stop().await;
                MethodResponse::null()
            }
            "release" => {
                self.release().await;
                MethodResponse::null()
            }
            "updateLrc" => match call.string_argument("lrc") {
                Some(lyrics) => {
                    if let Some(session) = self.session.lock().await.as_ref() {
                        session.update_lyrics(lyrics);
                    }
                    MethodResponse::null()
                }
                None => CoreError::missing("lrc").into(),
            },
            "seekTo" => match parse_argument::<i64>(&call, "position") {
                Ok(position) => self.seek(position.max(0) as u64).await,
                Err(err) => err.into(),
            },
            "rate" => match parse_argument::<f64>(&call, "rate") {
                Ok(rate) => self.set_rate(rate).await,
                Err(err) => err.into(),
            },
            "setVolume" => match parse_argument::<f64>(&call, "value") {
                Ok(volume) => self.set_volume(volume).await,
                Err(err) => err.into(),
            },
            "currentVolume" => self.current_volume().await,
            other => {
                debug!(method = other, "Method not implemented");
                MethodResponse::NotImplemented
            }
        }
    }

    /// Handle a notification button press.
    #[instrument(skip(self, action), fields(action = action.id()))]
    pub async fn dispatch_action(&self, action: NotificationAction) {
        match action {
            NotificationAction::PlayOrPause => {
                self.toggle().await;
            }
            NotificationAction::Stop => self.stop().await,
            NotificationAction::Next => self.emit_navigation(PlaybackEvent::Next).await,
            NotificationAction::Previous => self.emit_navigation(PlaybackEvent::Previous).await,
        }
    }

    /// Whether a session currently exists.
    pub async fn has_session(&self) -> bool {
        self.session.lock().await.is_some()
    }

    // ------------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------------

    async fn start(&self, request: StartRequest) {
        let mut slot = self.session.lock().await;

        if let Some(previous) = slot.take() {
            self.discard(previous).await;
        }

        let media = match self.resolve_media(&request).await {
            Ok(media) => Arc::new(media),
            Err(err) => {
                warn!(error = %err, "Cannot resolve media");
                self.status
                    .fail(Some(Arc::new(request.unresolved())), err.to_string());
                return;
            }
        };

        match PlaybackSession::start(
            self.player_factory.as_ref(),
            Arc::clone(&media),
            self.status.clone(),
            self.progress_interval,
        )
        .await
        {
            Ok(session) => {
                info!(session_id = %session.id(), title = %media.title, "Playback session started");
                let _ = self.events.emit(CoreEvent::Session(SessionEvent::Started {
                    session_id: session.id().to_string(),
                    title: media.title.clone(),
                }));
                *slot = Some(session);
            }
            Err(err) => {
                warn!(error = %err, "Playback session failed to start");
                self.status.fail(Some(media), err.to_string());
            }
        }
    }

    async fn resolve_media(&self, request: &StartRequest) -> Result<MediaInfo> {
        let mut media = request.unresolved();

        if request.is_local {
            let resolver = self.resolver()?;
            media.url = resolver.lookup_asset(&request.url).await?;
            debug!(
                asset = %request.url,
                resolved = %redact_url(&media.url),
                "Resolved media asset"
            );
        }

        if let (Some(cover), true) = (&request.cover, request.is_local_cover) {
            media.cover = self.resolve_cover(cover).await;
        }

        Ok(media)
    }

    /// A cover already in the data directory is kept; an unresolvable cover
    /// is dropped without failing the start.
    async fn resolve_cover(&self, cover: &str) -> Option<String> {
        let resolver = match self.resolver() {
            Ok(resolver) => resolver,
            Err(err) => {
                warn!(error = %err, "Dropping local cover");
                return None;
            }
        };

        if resolver.is_data_dir_file(cover) {
            return Some(cover.to_string());
        }

        match resolver.lookup_asset(cover).await {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(error = %err, "Dropping unresolvable cover");
                None
            }
        }
    }

    fn resolver(&self) -> Result<&Arc<dyn AssetResolver>> {
        self.asset_resolver.as_ref().ok_or_else(|| {
            CoreError::capability("AssetResolver", "local assets require an asset resolver")
        })
    }

    async fn discard(&self, session: PlaybackSession) {
        let session_id = session.id();
        session.release().await;
        let _ = self.events.emit(CoreEvent::Session(SessionEvent::Released {
            session_id: session_id.to_string(),
        }));
    }

    async fn stop(&self) {
        if let Some(session) = self.session.lock().await.as_ref() {
            session.stop().await;
        }
    }

    async fn release(&self) {
        let previous = self.session.lock().await.take();
        if let Some(session) = previous {
            self.discard(session).await;
        }
    }

    /// Release the active session, if any. Used on shutdown.
    pub async fn release_session(&self) {
        self.release().await;
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    async fn toggle(&self) -> MethodResponse {
        let slot = self.session.lock().await;
        let Some(session) = slot.as_ref() else {
            return MethodResponse::Success(json!(false));
        };

        if let Err(err) = session.play_or_pause().await {
            debug!(error = %err, "Toggle did not complete");
        }
        MethodResponse::Success(json!(session.is_playing()))
    }

    async fn transport(&self, transport: Transport) -> MethodResponse {
        let slot = self.session.lock().await;
        let Some(session) = slot.as_ref() else {
            return MethodResponse::Success(json!(false));
        };

        let result = match transport {
            Transport::Play => session.play().await,
            Transport::Pause => session.pause().await,
        };
        if let Err(err) = result {
            debug!(error = %err, ?transport, "Transport command did not complete");
        }
        MethodResponse::Success(json!(session.is_playing()))
    }

    async fn seek(&self, position_ms: u64) -> MethodResponse {
        let slot = self.session.lock().await;
        match slot.as_ref() {
            Some(session) => respond(session.seek_to(position_ms).await),
            None => {
                debug!("Seek without active session");
                MethodResponse::null()
            }
        }
    }

    async fn set_rate(&self, rate: f64) -> MethodResponse {
        if !rate.is_finite() || rate <= 0.0 {
            return CoreError::MalformedArgument {
                name: "rate",
                message: format!("rate must be a positive number, got {}", rate),
            }
            .into();
        }

        let slot = self.session.lock().await;
        match slot.as_ref() {
            Some(session) => respond(session.set_speed(rate as f32).await),
            None => {
                debug!("Rate change without active session");
                MethodResponse::null()
            }
        }
    }

    async fn emit_navigation(&self, event: PlaybackEvent) {
        let media = self.session.lock().await.as_ref().map(PlaybackSession::media);
        self.status.emit(media, event);
    }

    // ------------------------------------------------------------------------
    // Volume
    // ------------------------------------------------------------------------

    fn volume_controller(&self) -> Result<&Arc<dyn VolumeController>> {
        self.volume_controller.as_ref().ok_or_else(|| {
            CoreError::capability("VolumeController", "volume control is not available")
        })
    }

    async fn set_volume(&self, volume: f64) -> MethodResponse {
        if !volume.is_finite() {
            return CoreError::MalformedArgument {
                name: "value",
                message: format!("volume must be a finite number, got {}", volume),
            }
            .into();
        }

        let result: Result<()> = async {
            let controller = self.volume_controller()?;
            controller.set_volume(volume.clamp(0.0, 1.0)).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => MethodResponse::null(),
            Err(err) => err.into(),
        }
    }

    async fn current_volume(&self) -> MethodResponse {
        let result: Result<f64> = async {
            let controller = self.volume_controller()?;
            Ok(controller.current_volume().await?)
        }
        .await;

        match result {
            Ok(volume) => MethodResponse::Success(json!(volume)),
            Err(err) => err.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Transport {
    Play,
    Pause,
}

/// Map a session command result onto a response.
///
/// Rejected arguments and state conflicts are reported synchronously. Player
/// failures have already been reported as `error` + `stop` events.
fn respond(result: std::result::Result<(), PlaybackError>) -> MethodResponse {
    match result {
        Ok(()) => MethodResponse::null(),
        Err(err @ (PlaybackError::InvalidArgument(_) | PlaybackError::InvalidState { .. })) => {
            MethodResponse::ArgumentError(err.to_string())
        }
        Err(err) => {
            debug!(error = %err, "Command failed, reported through status events");
            MethodResponse::null()
        }
    }
}
