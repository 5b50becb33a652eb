//! `PlayerController` - the single writer of one media element.
//!
//! The actor owns a [`PlayerMachine`] and performs the effects it returns:
//! attaching sources, constructing and destroying the decoder, starting
//! playback and scheduling timers.
//!
//! # Event sources
//!
//! The select loop polls, in order:
//! 1. the actor's `CancellationToken` (unmount)
//! 2. backend callbacks and timer expiries (unbounded, never blocks a backend)
//! 3. the bounded command mailbox fed by [`PlayerControllerHandle`]
//!
//! # Timers
//!
//! Each session gets a child token of the actor's token. Timers select on it,
//! so teardown cancels every pending timer at once; anything that still slips
//! through carries a stale generation and is dropped by the machine.

use super::messages::ControllerMessage;
use crate::backend::{EventSink, HlsDecoder, HlsDecoderFactory, MediaElement};
use crate::config::{HlsTuning, PlayerConfig};
use crate::errors::PlayerError;
use crate::machine::{BackendEvent, Effect, FatalError, PlayerEvent, PlayerMachine, TimerKind};
use crate::observability::metrics;
use crate::state::{Capabilities, PlaybackStatus, PlayerSnapshot};

use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Default channel buffer size for the controller mailbox.
const CONTROLLER_CHANNEL_BUFFER: usize = 64;

/// Handle to a `PlayerController`.
#[derive(Clone, Debug)]
pub struct PlayerControllerHandle {
    sender: mpsc::Sender<ControllerMessage>,
    snapshots: watch::Receiver<PlayerSnapshot>,
    cancel_token: CancellationToken,
    player_id: Uuid,
    reconnect_max: u32,
}

impl PlayerControllerHandle {
    #[must_use]
    pub fn player_id(&self) -> Uuid {
        self.player_id
    }

    /// Supply new inputs. Identical inputs are ignored.
    pub async fn set_source(
        &self,
        stream_url: Option<String>,
        is_live: bool,
    ) -> Result<(), PlayerError> {
        self.send(ControllerMessage::SetSource {
            stream_url,
            is_live,
        })
        .await
    }

    /// Tap-to-unmute.
    pub async fn user_tap(&self) -> Result<(), PlayerError> {
        self.send(ControllerMessage::UserTap).await
    }

    /// "Try again" after an error.
    pub async fn retry(&self) -> Result<(), PlayerError> {
        self.send(ControllerMessage::Retry).await
    }

    /// Ask the actor for its current snapshot.
    ///
    /// Unlike [`current`](Self::current), this observes every command sent
    /// before it.
    pub async fn snapshot(&self) -> Result<PlayerSnapshot, PlayerError> {
        let (tx, rx) = oneshot::channel();
        self.send(ControllerMessage::GetSnapshot { respond_to: tx })
            .await?;

        rx.await
            .map_err(|e| PlayerError::Internal(format!("response receive failed: {e}")))
    }

    /// Last published snapshot.
    #[must_use]
    pub fn current(&self) -> PlayerSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Indicator text for the last published snapshot.
    #[must_use]
    pub fn status_label(&self) -> String {
        self.snapshots.borrow().status_label(self.reconnect_max)
    }

    /// Receiver that wakes on every published change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.snapshots.clone()
    }

    /// Tear down and stop the actor, waiting for teardown to finish.
    pub async fn shutdown(&self) -> Result<(), PlayerError> {
        let (tx, rx) = oneshot::channel();
        self.send(ControllerMessage::Shutdown { respond_to: tx })
            .await?;

        rx.await
            .map_err(|e| PlayerError::Internal(format!("response receive failed: {e}")))
    }

    /// Cancel the actor without waiting.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    async fn send(&self, message: ControllerMessage) -> Result<(), PlayerError> {
        self.sender
            .send(message)
            .await
            .map_err(|e| PlayerError::Internal(format!("channel send failed: {e}")))
    }
}

/// The `PlayerController` actor.
pub struct PlayerController<E: MediaElement, F: HlsDecoderFactory> {
    player_id: Uuid,
    machine: PlayerMachine,
    element: E,
    factory: F,
    /// Live decoder, if the current session attached through one.
    decoder: Option<F::Decoder>,
    tuning: HlsTuning,
    receiver: mpsc::Receiver<ControllerMessage>,
    events_tx: mpsc::UnboundedSender<PlayerEvent>,
    events_rx: mpsc::UnboundedReceiver<PlayerEvent>,
    cancel_token: CancellationToken,
    /// Child of `cancel_token`, replaced on every teardown.
    session_token: CancellationToken,
    snapshots: watch::Sender<PlayerSnapshot>,
}

impl<E: MediaElement, F: HlsDecoderFactory> PlayerController<E, F> {
    /// Spawn a controller for `element`.
    ///
    /// Capabilities are probed once here. The controller sits in `offline`
    /// until the first `set_source`.
    pub fn spawn(
        config: PlayerConfig,
        element: E,
        factory: F,
        cancel_token: CancellationToken,
    ) -> (PlayerControllerHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(CONTROLLER_CHANNEL_BUFFER);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let capabilities = Capabilities {
            native_hls: element.can_play_native_hls(),
            software_hls: factory.is_supported(),
        };
        let machine = PlayerMachine::new(&config, capabilities);
        let (snapshots_tx, snapshots_rx) = watch::channel(machine.snapshot());
        let player_id = Uuid::new_v4();

        let actor = Self {
            player_id,
            machine,
            element,
            factory,
            decoder: None,
            tuning: config.hls.clone(),
            receiver,
            events_tx,
            events_rx,
            session_token: cancel_token.child_token(),
            cancel_token: cancel_token.clone(),
            snapshots: snapshots_tx,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = PlayerControllerHandle {
            sender,
            snapshots: snapshots_rx,
            cancel_token,
            player_id,
            reconnect_max: config.reconnect.max_attempts,
        };

        (handle, task_handle)
    }

    #[instrument(skip_all, name = "live_player.controller", fields(player_id = %self.player_id))]
    async fn run(mut self) {
        let capabilities = self.machine.capabilities();
        info!(
            target: "live_player.controller",
            native_hls = capabilities.native_hls,
            software_hls = capabilities.software_hls,
            "PlayerController started"
        );

        loop {
            tokio::select! {
                biased;

                () = self.cancel_token.cancelled() => {
                    debug!(
                        target: "live_player.controller",
                        "PlayerController received cancellation signal"
                    );
                    self.dispatch(PlayerEvent::Shutdown);
                    break;
                }

                Some(event) = self.events_rx.recv() => {
                    self.dispatch(event);
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            if self.handle_message(message) {
                                break;
                            }
                        }
                        None => {
                            // All handles dropped
                            debug!(
                                target: "live_player.controller",
                                "Mailbox closed, shutting down"
                            );
                            self.dispatch(PlayerEvent::Shutdown);
                            break;
                        }
                    }
                }
            }
        }

        info!(target: "live_player.controller", "PlayerController stopped");
    }

    /// Handle one mailbox message. Returns `true` when the actor should exit.
    fn handle_message(&mut self, message: ControllerMessage) -> bool {
        debug!(
            target: "live_player.controller",
            message = message.kind(),
            "Handling message"
        );

        match message {
            ControllerMessage::SetSource {
                stream_url,
                is_live,
            } => {
                self.dispatch(PlayerEvent::SourceChanged {
                    stream_url,
                    is_live,
                });
                false
            }
            ControllerMessage::UserTap => {
                self.dispatch(PlayerEvent::UserTap);
                false
            }
            ControllerMessage::Retry => {
                self.dispatch(PlayerEvent::RetryRequested);
                false
            }
            ControllerMessage::GetSnapshot { respond_to } => {
                let _ = respond_to.send(self.machine.snapshot());
                false
            }
            ControllerMessage::Shutdown { respond_to } => {
                self.dispatch(PlayerEvent::Shutdown);
                let _ = respond_to.send(());
                true
            }
        }
    }

    /// Run one transition and perform its effects.
    fn dispatch(&mut self, event: PlayerEvent) {
        let before = self.machine.status();

        for effect in self.machine.handle(event) {
            self.apply(effect);
        }

        self.publish(before);
    }

    fn publish(&mut self, before: PlaybackStatus) {
        let after = self.machine.status();
        if before != after {
            debug!(
                target: "live_player.controller",
                from = before.as_str(),
                to = after.as_str(),
                generation = self.machine.generation(),
                "Status changed"
            );
            metrics::record_status_transition(before, after);
            if let Some(err) = self.machine.error() {
                metrics::record_terminal_error(err.reason());
            }
        }

        let snapshot = self.machine.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Teardown => self.teardown(),
            Effect::AttachNative { generation, url } => self.attach_native(generation, &url),
            Effect::AttachDecoder { generation, url } => self.attach_decoder(generation, &url),
            Effect::StartLoad { generation } => self.start_load(generation),
            Effect::RecoverMediaError { generation } => self.recover_media_error(generation),
            Effect::Play { muted, .. } => {
                self.element.set_muted(muted);
                self.element.play();
            }
            Effect::Unmute { volume } => {
                self.element.set_muted(false);
                self.element.set_volume(volume);
            }
            Effect::ScheduleTimer {
                generation,
                timer,
                delay,
            } => self.schedule_timer(generation, timer, delay),
        }
    }

    /// Cancel timers, destroy the decoder and reset the element.
    fn teardown(&mut self) {
        self.session_token.cancel();
        self.session_token = self.cancel_token.child_token();

        if let Some(mut decoder) = self.decoder.take() {
            decoder.destroy();
            metrics::record_decoder_destroyed();
        }

        self.element.reset();
    }

    fn attach_native(&mut self, generation: u64, url: &str) {
        debug!(
            target: "live_player.controller",
            generation,
            "Attaching source to media element"
        );
        self.element
            .bind_events(EventSink::new(generation, self.events_tx.clone()));

        if let Err(e) = self.element.set_source(url) {
            warn!(
                target: "live_player.controller",
                error = %e,
                "Media element rejected source"
            );
            self.report(generation, BackendEvent::AttachFailed(e));
        }
    }

    fn attach_decoder(&mut self, generation: u64, url: &str) {
        debug!(
            target: "live_player.controller",
            generation,
            "Attaching software decoder"
        );
        let sink = EventSink::new(generation, self.events_tx.clone());
        self.element.bind_events(sink.clone());

        let mut decoder = match self.factory.create(&self.tuning, sink) {
            Ok(decoder) => decoder,
            Err(e) => {
                error!(
                    target: "live_player.controller",
                    error = %e,
                    "Failed to construct decoder"
                );
                self.report(generation, BackendEvent::AttachFailed(e));
                return;
            }
        };
        metrics::record_decoder_created();

        let result = decoder
            .load_source(url)
            .and_then(|()| decoder.attach_media());
        // Kept even on failure so the next teardown destroys it
        self.decoder = Some(decoder);

        if let Err(e) = result {
            error!(
                target: "live_player.controller",
                error = %e,
                "Failed to attach decoder"
            );
            self.report(generation, BackendEvent::AttachFailed(e));
        }
    }

    fn start_load(&mut self, generation: u64) {
        let Some(decoder) = self.decoder.as_mut() else {
            return;
        };
        metrics::record_soft_retry();

        if let Err(e) = decoder.start_load() {
            self.report(
                generation,
                BackendEvent::Fatal(FatalError::Network(e.to_string())),
            );
        }
    }

    fn recover_media_error(&mut self, generation: u64) {
        let result = match self.decoder.as_mut() {
            Some(decoder) => decoder.recover_media_error().map_err(|e| e.to_string()),
            None => Err("no decoder attached".to_string()),
        };

        if let Err(reason) = result {
            self.report(generation, BackendEvent::MediaRecoveryFailed { reason });
        }
    }

    fn schedule_timer(&mut self, generation: u64, timer: TimerKind, delay: Duration) {
        if timer == TimerKind::Reconnect {
            metrics::record_reconnect();
        }

        let token = self.session_token.clone();
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let _ = events.send(PlayerEvent::TimerFired { generation, timer });
                }
            }
        });
    }

    /// Queue a backend outcome observed by the actor itself.
    fn report(&self, generation: u64, event: BackendEvent) {
        // The actor holds the receiver, so this only fails during drop
        let _ = self
            .events_tx
            .send(PlayerEvent::Backend { generation, event });
    }
}
