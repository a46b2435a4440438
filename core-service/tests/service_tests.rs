//! End-to-end tests for the audio manager service
//!
//! This test suite verifies:
//! - Method dispatch and argument coercion
//! - Outbound message order for playback transitions
//! - Session replacement, stop and release semantics
//! - Notification sync and notification button handling
//! - Volume forwarding and capability errors

use async_trait::async_trait;
use bridge_desktop::{LoggingNotificationHost, SoftwareVolumeController};
use bridge_traits::{
    error::Result as BridgeResult, AssetResolver, BridgeError, MediaPlayer, MediaPlayerFactory,
    MediaSource, MethodCall, MethodChannel, NotificationAction, PlayerCallback,
    PlayerCallbackSender, VolumeChangeStream, VolumeController,
};
use core_runtime::events::{CoreEvent, PlaybackEvent, SessionEvent};
use core_runtime::{CoreConfig, FeatureFlags};
use core_service::{AudioManagerService, MethodResponse};
use mockall::mock;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const DURATION_MS: u64 = 180_000;

// ============================================================================
// Fakes
// ============================================================================

/// Method channel that records every outbound message.
struct RecordingChannel {
    sender: mpsc::UnboundedSender<(String, Value)>,
}

#[async_trait]
impl MethodChannel for RecordingChannel {
    fn name(&self) -> &str {
        "audio_manager"
    }

    async fn invoke_method(&self, method: &str, arguments: Value) -> BridgeResult<()> {
        let _ = self.sender.send((method.to_string(), arguments));
        Ok(())
    }
}

#[derive(Default)]
struct PlayerLog {
    entries: Vec<String>,
    created: usize,
    current: Option<PlayerCallbackSender>,
}

#[derive(Clone, Default)]
struct Players {
    log: Arc<Mutex<PlayerLog>>,
}

impl Players {
    fn entries(&self) -> Vec<String> {
        self.log.lock().entries.clone()
    }

    fn fire(&self, callback: PlayerCallback) {
        if let Some(sender) = self.log.lock().current.as_ref() {
            sender.send(callback);
        }
    }
}

/// Player that prepares instantly unless the url contains `slow`, and
/// rejects urls containing `broken`.
struct FakePlayer {
    id: usize,
    players: Players,
}

impl FakePlayer {
    fn record(&self, call: &str) {
        self.players
            .log
            .lock()
            .entries
            .push(format!("{}:{}", self.id, call));
    }
}

#[async_trait]
impl MediaPlayer for FakePlayer {
    async fn load(&self, source: MediaSource, callbacks: PlayerCallbackSender) -> BridgeResult<()> {
        let location = match &source {
            MediaSource::LocalFile { path } => path.display().to_string(),
            MediaSource::Remote { url } => url.clone(),
        };
        self.record(&format!("load {}", location));

        if location.contains("broken") {
            return Err(BridgeError::Player("unsupported format".to_string()));
        }
        if !location.contains("slow") {
            callbacks.send(PlayerCallback::Prepared {
                duration_ms: DURATION_MS,
            });
        }
        self.players.log.lock().current = Some(callbacks);
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        self.record("play");
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.record("pause");
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        self.record("stop");
        Ok(())
    }

    async fn seek_to(&self, position_ms: u64) -> BridgeResult<()> {
        self.record(&format!("seek {}", position_ms));
        Ok(())
    }

    async fn set_speed(&self, rate: f32) -> BridgeResult<()> {
        self.record(&format!("speed {}", rate));
        Ok(())
    }

    async fn position_ms(&self) -> BridgeResult<u64> {
        Ok(1_000)
    }

    async fn duration_ms(&self) -> BridgeResult<u64> {
        Ok(DURATION_MS)
    }

    async fn is_playing(&self) -> BridgeResult<bool> {
        Ok(false)
    }

    async fn release(&self) -> BridgeResult<()> {
        self.record("release");
        Ok(())
    }
}

#[async_trait]
impl MediaPlayerFactory for Players {
    async fn create_player(&self) -> BridgeResult<Box<dyn MediaPlayer>> {
        let id = {
            let mut log = self.log.lock();
            log.created += 1;
            log.created
        };
        Ok(Box::new(FakePlayer {
            id,
            players: self.clone(),
        }))
    }
}

/// Bundled assets live under `/assets`; files under `/data` are already local.
struct FakeResolver;

#[async_trait]
impl AssetResolver for FakeResolver {
    async fn lookup_asset(&self, name: &str) -> BridgeResult<String> {
        if name.starts_with("missing") {
            return Err(BridgeError::AssetNotFound(name.to_string()));
        }
        Ok(format!("/assets/{}", name))
    }

    fn is_data_dir_file(&self, path: &str) -> bool {
        path.starts_with("/data/")
    }
}

mock! {
    Volume {}

    #[async_trait]
    impl VolumeController for Volume {
        async fn current_volume(&self) -> BridgeResult<f64>;
        async fn set_volume(&self, volume: f64) -> BridgeResult<()>;
        async fn subscribe_changes(&self) -> BridgeResult<Box<dyn VolumeChangeStream>>;
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    service: AudioManagerService,
    outbound: mpsc::UnboundedReceiver<(String, Value)>,
    players: Players,
    host: Arc<LoggingNotificationHost>,
    volume: Arc<SoftwareVolumeController>,
}

impl Harness {
    async fn new() -> Self {
        Self::with_progress(Duration::from_secs(60)).await
    }

    async fn with_progress(progress_interval: Duration) -> Self {
        let (sender, outbound) = mpsc::unbounded_channel();
        let players = Players::default();
        let host = Arc::new(LoggingNotificationHost::new());
        let volume = Arc::new(SoftwareVolumeController::new(0.5));

        let config = CoreConfig::builder()
            .player_factory(Arc::new(players.clone()))
            .method_channel(Arc::new(RecordingChannel { sender }))
            .asset_resolver(Arc::new(FakeResolver))
            .notification_host(host.clone())
            .volume_controller(volume.clone())
            .progress_interval(progress_interval)
            .platform_version("TestOS 1.0")
            .build()
            .expect("valid config");

        let service = AudioManagerService::new(config)
            .await
            .expect("service should start");

        Self {
            service,
            outbound,
            players,
            host,
            volume,
        }
    }

    async fn call(&self, method: &str, arguments: Value) -> MethodResponse {
        self.service
            .dispatch(MethodCall::new(method, arguments))
            .await
    }

    async fn start(&self, url: &str, auto_play: bool) -> MethodResponse {
        self.call(
            "start",
            json!({
                "url": url,
                "title": "Song",
                "desc": "Artist",
                "cover": "/data/cover.jpg",
                "isLocal": true,
                "isLocalCover": true,
                "isAuto": auto_play,
            }),
        )
        .await
    }

    async fn next_message(&mut self) -> (String, Value) {
        tokio::time::timeout(Duration::from_secs(2), self.outbound.recv())
            .await
            .expect("timed out waiting for outbound message")
            .expect("channel closed")
    }

    /// Next message, skipping periodic `timeupdate`.
    async fn next_transition(&mut self) -> (String, Value) {
        loop {
            let message = self.next_message().await;
            if message.0 != "timeupdate" {
                return message;
            }
        }
    }

    async fn assert_quiet(&mut self) {
        let result = tokio::time::timeout(Duration::from_millis(150), self.outbound.recv()).await;
        if let Ok(Some(message)) = result {
            panic!("unexpected outbound message: {:?}", message);
        }
    }

    /// Start with auto-play and consume `ready` + `playstatus`.
    async fn start_playing(&mut self, url: &str) {
        self.start(url, true).await;
        assert_eq!(self.next_message().await.0, "ready");
        assert_eq!(
            self.next_message().await,
            ("playstatus".to_string(), json!(true))
        );
    }
}

async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_platform_version_and_unknown_methods() {
    let harness = Harness::new().await;

    assert_eq!(
        harness.call("getPlatformVersion", Value::Null).await,
        MethodResponse::Success(json!("TestOS 1.0"))
    );
    assert_eq!(
        harness.call("shuffle", Value::Null).await,
        MethodResponse::NotImplemented
    );
}

#[tokio::test]
async fn test_commands_without_session_are_safe() {
    let mut harness = Harness::new().await;

    assert_eq!(
        harness.call("playOrPause", Value::Null).await,
        MethodResponse::Success(json!(false))
    );
    assert_eq!(
        harness.call("play", Value::Null).await,
        MethodResponse::Success(json!(false))
    );
    assert_eq!(harness.call("stop", Value::Null).await, MethodResponse::null());
    assert_eq!(harness.call("release", Value::Null).await, MethodResponse::null());
    assert_eq!(
        harness.call("seekTo", json!({ "position": 10 })).await,
        MethodResponse::null()
    );
    harness.assert_quiet().await;
}

#[tokio::test]
async fn test_start_requires_url() {
    let mut harness = Harness::new().await;

    let response = harness.call("start", json!({ "title": "Song" })).await;

    assert!(matches!(response, MethodResponse::ArgumentError(ref message) if message.contains("url")));
    assert!(harness.players.entries().is_empty());
    harness.assert_quiet().await;
}

// ============================================================================
// Playback Flow
// ============================================================================

#[tokio::test]
async fn test_auto_play_start_reports_ready_then_playing() {
    let mut harness = Harness::new().await;

    let response = harness.start("a.mp3", true).await;

    assert_eq!(response, MethodResponse::null());
    assert_eq!(
        harness.next_message().await,
        ("ready".to_string(), json!(DURATION_MS))
    );
    assert_eq!(
        harness.next_message().await,
        ("playstatus".to_string(), json!(true))
    );
    assert_eq!(harness.players.entries()[0], "1:load /assets/a.mp3");
}

#[tokio::test]
async fn test_notification_follows_playback() {
    let mut harness = Harness::new().await;
    harness.start_playing("a.mp3").await;

    let host = harness.host.clone();
    wait_until(|| host.content().is_some_and(|content| content.is_playing)).await;
    let content = host.content().unwrap();
    assert_eq!(content.title, "Song");
    assert_eq!(content.description, "Artist");

    // Data-directory covers are passed through untouched.
    let cover = host.cover().expect("cover pushed on ready");
    assert_eq!(cover.reference, "/data/cover.jpg");
    assert!(cover.is_local);

    harness.call("pause", Value::Null).await;
    assert_eq!(
        harness.next_message().await,
        ("playstatus".to_string(), json!(false))
    );
    wait_until(|| host.content().is_some_and(|content| !content.is_playing)).await;
}

#[tokio::test]
async fn test_play_or_pause_returns_is_playing() {
    let mut harness = Harness::new().await;
    harness.start_playing("a.mp3").await;

    assert_eq!(
        harness.call("playOrPause", Value::Null).await,
        MethodResponse::Success(json!(false))
    );
    assert_eq!(
        harness.next_message().await,
        ("playstatus".to_string(), json!(false))
    );

    assert_eq!(
        harness.call("playOrPause", Value::Null).await,
        MethodResponse::Success(json!(true))
    );
    assert_eq!(
        harness.next_message().await,
        ("playstatus".to_string(), json!(true))
    );
}

#[tokio::test]
async fn test_start_releases_previous_session_first() {
    let mut harness = Harness::new().await;
    harness.start_playing("a.mp3").await;

    harness.start("b.mp3", false).await;
    assert_eq!(harness.next_message().await.0, "ready");

    let entries = harness.players.entries();
    let released = entries.iter().position(|e| e == "1:release").unwrap();
    let loaded = entries
        .iter()
        .position(|e| e == "2:load /assets/b.mp3")
        .unwrap();
    assert!(released < loaded, "entries: {:?}", entries);
}

#[tokio::test]
async fn test_stop_and_release_are_distinct() {
    let mut harness = Harness::new().await;
    harness.start_playing("a.mp3").await;

    harness.call("stop", Value::Null).await;
    assert_eq!(
        harness.next_message().await,
        ("stop".to_string(), Value::Null)
    );
    assert!(harness.service.dispatcher().has_session().await);
    assert!(!harness.players.entries().contains(&"1:release".to_string()));

    harness.call("release", Value::Null).await;
    harness.assert_quiet().await;
    assert!(!harness.service.dispatcher().has_session().await);
    assert!(harness.players.entries().contains(&"1:release".to_string()));
}

#[tokio::test]
async fn test_seek_reports_completion() {
    let mut harness = Harness::new().await;
    harness.start_playing("a.mp3").await;

    let response = harness.call("seekTo", json!({ "position": "-20" })).await;
    assert_eq!(response, MethodResponse::null());
    assert!(harness.players.entries().contains(&"1:seek 0".to_string()));

    harness
        .players
        .fire(PlayerCallback::SeekComplete { position_ms: 0 });
    assert_eq!(
        harness.next_message().await,
        ("seekComplete".to_string(), json!(0))
    );
}

#[tokio::test]
async fn test_buffering_message_shape() {
    let mut harness = Harness::new().await;
    harness.start_playing("a.mp3").await;

    harness
        .players
        .fire(PlayerCallback::BufferingUpdate { percent: 60 });

    assert_eq!(
        harness.next_message().await,
        (
            "buffering".to_string(),
            json!({ "buffering": false, "buffer": 60 })
        )
    );
}

// ============================================================================
// Malformed Arguments
// ============================================================================

#[tokio::test]
async fn test_malformed_numbers_leave_state_unchanged() {
    let mut harness = Harness::new().await;
    harness.start_playing("a.mp3").await;
    let before = harness.players.entries();

    for (method, arguments) in [
        ("seekTo", json!({ "position": "abc" })),
        ("rate", json!({ "rate": "fast" })),
        ("rate", json!({ "rate": 0 })),
        ("setVolume", json!({ "value": "loud" })),
        ("seekTo", Value::Null),
    ] {
        let response = harness.call(method, arguments).await;
        assert!(
            matches!(response, MethodResponse::ArgumentError(_)),
            "{} should be rejected, got {:?}",
            method,
            response
        );
    }

    harness.assert_quiet().await;
    assert_eq!(harness.players.entries(), before);
    assert_eq!(harness.volume.current_volume().await.unwrap(), 0.5);
    assert_eq!(
        harness.call("playOrPause", Value::Null).await,
        MethodResponse::Success(json!(false))
    );
}

#[tokio::test]
async fn test_rate_accepts_string_encoded_numbers() {
    let mut harness = Harness::new().await;
    harness.start_playing("a.mp3").await;

    let response = harness.call("rate", json!({ "rate": "1.5" })).await;

    assert_eq!(response, MethodResponse::null());
    assert!(harness.players.entries().contains(&"1:speed 1.5".to_string()));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_native_error_stops_without_further_timeupdates() {
    let mut harness = Harness::with_progress(Duration::from_millis(50)).await;
    harness.start_playing("a.mp3").await;

    loop {
        if harness.next_message().await.0 == "timeupdate" {
            break;
        }
    }

    harness.players.fire(PlayerCallback::Error {
        message: "MEDIA_ERROR_SERVER_DIED".to_string(),
    });

    assert_eq!(
        harness.next_transition().await,
        ("error".to_string(), json!("MEDIA_ERROR_SERVER_DIED"))
    );
    assert_eq!(
        harness.next_message().await,
        ("stop".to_string(), Value::Null)
    );

    tokio::time::sleep(Duration::from_millis(200)).await;
    harness.assert_quiet().await;
}

#[tokio::test]
async fn test_missing_asset_is_reported_as_error_event() {
    let mut harness = Harness::new().await;

    let response = harness.start("missing.mp3", true).await;

    assert_eq!(response, MethodResponse::null());
    let (method, message) = harness.next_message().await;
    assert_eq!(method, "error");
    assert!(message.as_str().unwrap().contains("missing.mp3"));
    assert_eq!(
        harness.next_message().await,
        ("stop".to_string(), Value::Null)
    );
    assert!(!harness.service.dispatcher().has_session().await);
}

#[tokio::test]
async fn test_rejected_load_is_reported_as_error_event() {
    let mut harness = Harness::new().await;

    harness.start("broken.mp3", true).await;

    assert_eq!(harness.next_message().await.0, "error");
    assert_eq!(harness.next_message().await.0, "stop");
    assert!(harness
        .players
        .entries()
        .contains(&"1:release".to_string()));
}

// ============================================================================
// Notification Buttons
// ============================================================================

#[tokio::test]
async fn test_notification_buttons_reenter_dispatcher() {
    let mut harness = Harness::new().await;
    harness.start_playing("a.mp3").await;

    assert!(harness.host.press(NotificationAction::Next));
    assert_eq!(
        harness.next_message().await,
        ("next".to_string(), Value::Null)
    );

    harness.host.press(NotificationAction::PlayOrPause);
    assert_eq!(
        harness.next_message().await,
        ("playstatus".to_string(), json!(false))
    );

    harness.service.dispatch_action(NotificationAction::Previous).await;
    assert_eq!(
        harness.next_message().await,
        ("previous".to_string(), Value::Null)
    );

    harness.host.press(NotificationAction::Stop);
    assert_eq!(
        harness.next_message().await,
        ("stop".to_string(), Value::Null)
    );
}

// ============================================================================
// Volume
// ============================================================================

#[tokio::test]
async fn test_set_volume_is_clamped_and_forwarded() {
    let mut harness = Harness::new().await;

    assert_eq!(
        harness.call("setVolume", json!({ "value": "0.25" })).await,
        MethodResponse::null()
    );
    assert_eq!(
        harness.next_message().await,
        ("volumeChange".to_string(), json!(0.25))
    );

    harness.call("setVolume", json!({ "value": 3 })).await;
    assert_eq!(
        harness.next_message().await,
        ("volumeChange".to_string(), json!(1.0))
    );
    assert_eq!(
        harness.call("currentVolume", Value::Null).await,
        MethodResponse::Success(json!(1.0))
    );
}

#[tokio::test]
async fn test_system_volume_changes_are_forwarded() {
    let mut harness = Harness::new().await;

    harness.volume.set_volume(0.8).await.unwrap();

    assert_eq!(
        harness.next_message().await,
        ("volumeChange".to_string(), json!(0.8))
    );
    assert!(harness.host.content().is_none());
}

#[tokio::test]
async fn test_volume_without_controller_reports_capability() {
    let (sender, _outbound) = mpsc::unbounded_channel();
    let config = CoreConfig {
        player_factory: Arc::new(Players::default()),
        method_channel: Arc::new(RecordingChannel { sender }),
        asset_resolver: None,
        notification_host: None,
        volume_controller: None,
        features: FeatureFlags::none(),
        progress_interval: Duration::from_secs(1),
        event_buffer_size: 16,
        platform_version: "TestOS 1.0".to_string(),
    };
    let service = AudioManagerService::new(config).await.unwrap();

    let response = service
        .dispatch(MethodCall::bare("currentVolume"))
        .await;

    assert!(
        matches!(response, MethodResponse::ArgumentError(ref message) if message.contains("VolumeController"))
    );
}

#[tokio::test]
async fn test_volume_bridge_failure_is_reported() {
    let mut volume = MockVolume::new();
    volume
        .expect_current_volume()
        .times(1)
        .returning(|| Err(BridgeError::OperationFailed("audio service died".to_string())));

    let (sender, _outbound) = mpsc::unbounded_channel();
    let config = CoreConfig {
        player_factory: Arc::new(Players::default()),
        method_channel: Arc::new(RecordingChannel { sender }),
        asset_resolver: None,
        notification_host: None,
        volume_controller: Some(Arc::new(volume)),
        features: FeatureFlags::none(),
        progress_interval: Duration::from_secs(1),
        event_buffer_size: 16,
        platform_version: "TestOS 1.0".to_string(),
    };
    let service = AudioManagerService::new(config).await.unwrap();

    let response = service
        .dispatch(MethodCall::bare("currentVolume"))
        .await;

    assert!(
        matches!(response, MethodResponse::ArgumentError(ref message) if message.contains("audio service died"))
    );
}

// ============================================================================
// Events & Shutdown
// ============================================================================

#[tokio::test]
async fn test_events_are_published_on_the_bus() {
    let mut harness = Harness::new().await;
    let mut events = harness.service.subscribe();

    harness.start_playing("a.mp3").await;

    let mut seen = Vec::new();
    while seen.len() < 3 {
        let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        if matches!(event, CoreEvent::Session(_) | CoreEvent::Playback(_)) {
            seen.push(event);
        }
    }

    // Session lifecycle and playback status travel on different tasks; only
    // the playback events are ordered relative to each other.
    assert!(seen.iter().any(|event| matches!(
        event,
        CoreEvent::Session(SessionEvent::Started { title, .. }) if title == "Song"
    )));
    let playback: Vec<_> = seen
        .into_iter()
        .filter(|event| matches!(event, CoreEvent::Playback(_)))
        .collect();
    assert_eq!(
        playback,
        vec![
            CoreEvent::Playback(PlaybackEvent::Ready {
                duration_ms: DURATION_MS
            }),
            CoreEvent::Playback(PlaybackEvent::PlayStatus { is_playing: true }),
        ]
    );
}

#[tokio::test]
async fn test_shutdown_releases_and_clears_notification() {
    let mut harness = Harness::new().await;
    harness.start_playing("a.mp3").await;
    let host = harness.host.clone();
    wait_until(|| host.content().is_some()).await;

    harness.service.shutdown().await;

    assert!(harness.players.entries().contains(&"1:release".to_string()));
    assert!(host.content().is_none());
    assert!(!harness.service.dispatcher().has_session().await);
}
