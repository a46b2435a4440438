//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (native player,
//! method channel, asset resolver, notification host, volume controller) into
//! the audio manager core. Desktop hosts typically enable the `desktop-shims`
//! feature, which fills in the optional bridges from `bridge-desktop`.
//!
//! ```no_run
//! # async fn example(config: core_runtime::CoreConfig) -> core_service::Result<()> {
//! use bridge_traits::MethodCall;
//! use core_service::AudioManagerService;
//! use serde_json::json;
//!
//! let service = AudioManagerService::new(config).await?;
//! service
//!     .dispatch(MethodCall::new(
//!         "start",
//!         json!({ "url": "https://example.com/a.mp3", "title": "A", "isAuto": true }),
//!     ))
//!     .await;
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
pub mod error;
pub mod relay;

pub use dispatcher::{CommandDispatcher, MethodResponse, StartRequest};
pub use error::{CoreError, Result};
pub use relay::{OutboundMessage, StatusRelay};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;

use std::sync::Arc;

use bridge_traits::{MethodCall, NotificationAction, NotificationActionStream, NotificationHost};
use core_playback::StatusSink;
use core_runtime::events::{CoreEvent, EventBus, EventStream, NotificationEvent};
use core_runtime::CoreConfig;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

/// Primary façade exposed to host applications.
///
/// Owns the dispatcher, the status relay task and the background observers.
/// Must be created inside a Tokio runtime.
pub struct AudioManagerService {
    dispatcher: Arc<CommandDispatcher>,
    events: EventBus,
    notification: Option<Arc<dyn NotificationHost>>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl AudioManagerService {
    /// Validate `config` and start the background tasks.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or a bridge refuses to provide
    /// its change stream.
    pub async fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let events = EventBus::new(config.event_buffer_size);
        let cancel = CancellationToken::new();
        let (status, receiver) = StatusSink::channel();
        let mut tasks = Vec::new();

        let notification = if config.features.enable_notification {
            config.notification_host.clone()
        } else {
            None
        };

        let volume = match (&config.volume_controller, config.features.enable_volume_observer) {
            (Some(controller), true) => Some(controller.subscribe_changes().await?),
            _ => None,
        };

        let relay = StatusRelay::new(
            Arc::clone(&config.method_channel),
            notification.clone(),
            events.clone(),
        );
        tasks.push(tokio::spawn(
            relay
                .run(receiver, volume, cancel.child_token())
                .instrument(tracing::info_span!("status_relay")),
        ));

        let dispatcher = Arc::new(CommandDispatcher::new(&config, status, events.clone()));

        if let Some(host) = &notification {
            let actions = host.subscribe_actions().await?;
            tasks.push(tokio::spawn(
                listen_actions(
                    Arc::clone(&dispatcher),
                    actions,
                    events.clone(),
                    cancel.child_token(),
                )
                .instrument(tracing::info_span!("notification_actions")),
            ));
        }

        info!(
            channel = config.method_channel.name(),
            notification = notification.is_some(),
            volume_observer = config.features.enable_volume_observer,
            "Audio manager service started"
        );

        Ok(Self {
            dispatcher,
            events,
            notification,
            cancel,
            tasks: Mutex::new(tasks),
        })
    }

    /// Handle one call from the application layer.
    pub async fn dispatch(&self, call: MethodCall) -> MethodResponse {
        self.dispatcher.dispatch(call).await
    }

    /// Handle a notification button press.
    pub async fn dispatch_action(&self, action: NotificationAction) {
        self.dispatcher.dispatch_action(action).await
    }

    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    /// Subscribe to in-process events.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    /// Release the active session, deliver queued status updates, stop the
    /// background tasks and remove the notification.
    pub async fn shutdown(&self) {
        self.dispatcher.release_session().await;
        self.cancel.cancel();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "Background task ended abnormally");
            }
        }

        if let Some(host) = &self.notification {
            if let Err(err) = host.cancel().await {
                warn!(error = %err, "Failed to cancel notification");
            }
        }
        info!("Audio manager service stopped");
    }
}

impl Drop for AudioManagerService {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn listen_actions(
    dispatcher: Arc<CommandDispatcher>,
    mut actions: Box<dyn NotificationActionStream>,
    events: EventBus,
    cancel: CancellationToken,
) {
    loop {
        let action = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            action = actions.next() => match action {
                Some(action) => action,
                None => break,
            },
        };

        debug!(action = action.id(), "Notification action received");
        let _ = events.emit(CoreEvent::Notification(NotificationEvent::ActionPressed {
            action: action.id().to_string(),
        }));
        dispatcher.dispatch_action(action).await;
    }
    debug!("Notification action listener stopped");
}
