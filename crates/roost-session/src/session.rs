//! The per-identity session state machine.
//!
//! A session is one tokio task that exclusively owns its connection handle
//! and timer set. Everything that can touch the connection — operator
//! commands, timer ticks, burst steps — arrives on the session's own mpsc
//! channel and is merged with the protocol event stream via `select!`, so
//! the single-writer-per-identity rule holds with no locks inside the
//! session. Lifecycle: Connecting → Connected → Spawned, with kicked/died
//! as non-terminal detours, and every exit routed through the one
//! termination path that cancels timers, emits the terminal status,
//! unregisters, and consults the reconnect policy.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use roost_core::{Account, BotStatus, Event, ServerInfo, Settings};
use roost_core::settings::AntiIdlePhysical;

use crate::client::{AuthMode, ClientEvent, ClientHandle, ConnectOptions, Connector, Control};
use crate::error::{ClientError, SessionError};
use crate::events::EventBus;
use crate::registry::Registry;
use crate::supervisor::ReconnectSupervisor;
use crate::timers::TimerSet;

/// How long pulsed anti-idle controls stay asserted.
const CONTROL_PULSE: Duration = Duration::from_millis(500);
/// Delay before the persistent sneak control is set after login.
const SNEAK_DELAY: Duration = Duration::from_millis(500);

/// Everything a session task can be asked to do, including its own timer
/// ticks. Processing is strictly sequential.
#[derive(Debug)]
pub(crate) enum SessionMsg {
    /// Operator chat, fire-and-forget
    Chat(String),
    /// Arm or clear the spam loop
    ToggleSpam {
        text: String,
        interval: Duration,
        enable: bool,
    },
    /// One staggered step of a message burst
    BurstSend(String),
    /// Recurring anti-idle tick
    AntiIdleTick,
    /// Recurring spam tick
    SpamTick(String),
    /// Set the persistent sneak control
    Sneak,
    /// Graceful stop; acknowledged once all timers are cancelled
    Stop { ack: oneshot::Sender<()> },
}

/// Immutable snapshot of everything one session needs, assembled from the
/// store at start time. Later store mutations never affect a running
/// session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Connection parameters
    pub connect: ConnectOptions,
    /// Wait before the connection attempt
    pub login_delay: Duration,
    /// Hold sneak after login
    pub sneak: bool,
    /// Anti-idle behavior, `None` when disabled
    pub anti_idle: Option<AntiIdleConfig>,
    /// Post-login burst, `None` when disabled
    pub join_burst: Option<BurstConfig>,
    /// Post-spawn burst, `None` when disabled
    pub world_burst: Option<BurstConfig>,
    /// Reconnect delay after unplanned termination, `None` when disabled
    pub reconnect_delay: Option<Duration>,
}

/// Anti-idle behavior snapshot.
#[derive(Debug, Clone)]
pub struct AntiIdleConfig {
    /// Tick interval
    pub interval: Duration,
    /// Which physical actions fire each tick
    pub physical: AntiIdlePhysical,
    /// Chat ping sent each tick, when configured
    pub chat: Option<String>,
}

/// One lifecycle-triggered message burst.
#[derive(Debug, Clone)]
pub struct BurstConfig {
    /// Wait between the lifecycle milestone and the first send
    pub delay: Duration,
    /// Messages in send order
    pub messages: Vec<String>,
}

impl SessionConfig {
    /// Assemble a snapshot from the store's current state. The password is
    /// included only when not in offline mode and one is on file.
    pub fn assemble(info: &ServerInfo, settings: &Settings, account: &Account) -> Self {
        let auth = if settings.offline_mode {
            AuthMode::Offline
        } else {
            AuthMode::Authenticated
        };
        let password = match auth {
            AuthMode::Offline => None,
            AuthMode::Authenticated => account.password.clone(),
        };

        Self {
            connect: ConnectOptions {
                host: info.server_ip.clone(),
                port: info.server_port,
                username: account.username.clone(),
                version: info.version.clone(),
                auth,
                password,
                physics: settings.bot_physics,
            },
            login_delay: Duration::from_secs(info.login_delay),
            sneak: settings.sneak,
            anti_idle: settings.anti_afk.then(|| AntiIdleConfig {
                interval: Duration::from_secs(settings.anti_afk_interval * 60),
                physical: settings.anti_afk_physical.clone(),
                chat: (settings.anti_afk_chat.send && !settings.anti_afk_chat.message.is_empty())
                    .then(|| settings.anti_afk_chat.message.clone()),
            }),
            join_burst: settings.join_messages.then(|| BurstConfig {
                delay: Duration::from_secs(settings.join_message_delay),
                messages: settings.join_messages_list.clone(),
            }),
            world_burst: settings.world_change_messages.then(|| BurstConfig {
                delay: Duration::from_secs(settings.world_change_message_delay),
                messages: settings.world_change_messages_list.clone(),
            }),
            reconnect_delay: settings
                .auto_reconnect
                .then(|| Duration::from_secs(settings.auto_reconnect_delay)),
        }
    }
}

/// Cheap clonable handle to a live session, stored in the registry.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    identity: String,
    tx: mpsc::Sender<SessionMsg>,
    status: watch::Receiver<BotStatus>,
    created_at: DateTime<Utc>,
}

impl SessionHandle {
    /// The identity this session runs for.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Current lifecycle status.
    pub fn status(&self) -> BotStatus {
        *self.status.borrow()
    }

    /// When the session was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Stop the session and wait until its timers are cancelled and the
    /// terminal status has been emitted. Idempotent; a session that is
    /// already gone acknowledges by dropping the channel.
    pub async fn stop(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(SessionMsg::Stop { ack }).await.is_ok() {
            let _ = done.await;
        }
    }

    /// Fire-and-forget command. Dropped if the session is gone.
    pub(crate) async fn send(&self, msg: SessionMsg) {
        let _ = self.tx.send(msg).await;
    }

    #[cfg(test)]
    pub(crate) fn stub(identity: &str) -> Self {
        let (tx, _rx) = mpsc::channel(1);
        let (_status_tx, status) = watch::channel(BotStatus::Connecting);
        Self {
            identity: identity.to_string(),
            tx,
            status,
            created_at: Utc::now(),
        }
    }
}

/// Collaborators a new session needs.
pub(crate) struct SessionParams {
    pub identity: String,
    pub config: SessionConfig,
    pub connector: Arc<dyn Connector>,
    pub registry: Arc<Registry>,
    pub bus: EventBus,
    pub supervisor: Arc<ReconnectSupervisor>,
    pub command_buffer: usize,
}

/// Claim the identity's registry slot and spawn the session task.
///
/// The handle is fully constructed before it is registered, and the
/// `connecting` event is emitted before the task starts, so observers see
/// transitions in order and `lookup` never yields a partial session.
pub(crate) async fn launch(params: SessionParams) -> Result<SessionHandle, SessionError> {
    let (tx, rx) = mpsc::channel(params.command_buffer.max(1));
    let (status_tx, status_rx) = watch::channel(BotStatus::Connecting);

    let handle = SessionHandle {
        identity: params.identity.clone(),
        tx: tx.clone(),
        status: status_rx,
        created_at: Utc::now(),
    };

    params.registry.register(handle.clone()).await?;
    params.bus.emit(Event::status(
        &params.identity,
        BotStatus::Connecting,
        "Connecting...",
    ));
    info!(identity = %params.identity, host = %params.config.connect.host, "Session starting");

    let task = SessionTask {
        identity: params.identity,
        config: params.config,
        connector: params.connector,
        registry: params.registry,
        bus: params.bus,
        supervisor: params.supervisor,
        rx,
        self_tx: tx,
        status_tx,
        timers: TimerSet::new(),
        client: None,
    };
    tokio::spawn(task.run());

    Ok(handle)
}

struct SessionTask {
    identity: String,
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    registry: Arc<Registry>,
    bus: EventBus,
    supervisor: Arc<ReconnectSupervisor>,
    rx: mpsc::Receiver<SessionMsg>,
    self_tx: mpsc::Sender<SessionMsg>,
    status_tx: watch::Sender<BotStatus>,
    timers: TimerSet,
    client: Option<Arc<dyn ClientHandle>>,
}

impl SessionTask {
    async fn run(mut self) {
        if !self.wait_login_delay().await {
            return;
        }

        debug!(identity = %self.identity, "Opening connection");
        let mut events = match self.connector.connect(self.config.connect.clone()).await {
            Ok((client, events)) => {
                self.client = Some(client);
                events
            }
            Err(e) => {
                self.bus
                    .emit(Event::error(&self.identity, format!("Connect failed: {}", e)));
                self.terminate(format!("Disconnected: {}", e), true).await;
                return;
            }
        };

        loop {
            tokio::select! {
                ev = events.recv() => match ev {
                    Some(ev) => {
                        if self.handle_client_event(ev).await.is_break() {
                            return;
                        }
                    }
                    None => {
                        self.terminate("Disconnected: connection closed".to_string(), true)
                            .await;
                        return;
                    }
                },
                msg = self.rx.recv() => {
                    // The registry holds a sender, so recv() outliving it
                    // means termination is already underway.
                    let Some(msg) = msg else { continue };
                    if self.handle_msg(msg).await.is_break() {
                        return;
                    }
                }
            }
        }
    }

    /// Non-blocking login delay; other sessions keep running. Returns false
    /// when a stop arrived mid-delay and the session is already terminated.
    async fn wait_login_delay(&mut self) -> bool {
        if self.config.login_delay.is_zero() {
            return true;
        }
        let deadline = Instant::now() + self.config.login_delay;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return true,
                msg = self.rx.recv() => match msg {
                    Some(SessionMsg::Stop { ack }) => {
                        self.terminate("Disconnected".to_string(), false).await;
                        let _ = ack.send(());
                        return false;
                    }
                    // Spam can be armed before the connection exists; its
                    // ticks stay suppressed by the open-connection guard.
                    Some(SessionMsg::ToggleSpam { text, interval, enable }) => {
                        self.apply_spam_toggle(text, interval, enable);
                    }
                    // Not connected yet: other commands are silently dropped.
                    Some(_) | None => {}
                },
            }
        }
    }

    async fn handle_client_event(&mut self, ev: ClientEvent) -> ControlFlow<()> {
        match ev {
            ClientEvent::LoggedIn => {
                self.set_status(BotStatus::Connected, "Connected");
                if let Some(burst) = self.config.join_burst.clone() {
                    self.timers
                        .arm_burst(self.self_tx.clone(), burst.delay, burst.messages);
                }
                if self.config.sneak {
                    self.timers
                        .arm_delayed(self.self_tx.clone(), SNEAK_DELAY, SessionMsg::Sneak);
                }
            }
            ClientEvent::Spawned => {
                self.set_status(BotStatus::Spawned, "Spawned");
                if let Some(burst) = self.config.world_burst.clone() {
                    self.timers
                        .arm_burst(self.self_tx.clone(), burst.delay, burst.messages);
                }
                if let Some(anti_idle) = &self.config.anti_idle {
                    self.timers
                        .arm_anti_idle(self.self_tx.clone(), anti_idle.interval);
                }
            }
            ClientEvent::Chat { username, text } => {
                self.bus.emit(Event::Chat {
                    identity: self.identity.clone(),
                    username,
                    text,
                });
            }
            ClientEvent::ServerMessage { text } => {
                self.bus.emit(Event::Chat {
                    identity: self.identity.clone(),
                    username: "Server".to_string(),
                    text,
                });
            }
            ClientEvent::Kicked { reason } => {
                self.set_status(BotStatus::Kicked, format!("Kicked: {}", reason));
            }
            ClientEvent::Died => {
                self.set_status(BotStatus::Died, "Died and respawned");
            }
            ClientEvent::Error { message } => {
                self.bus.emit(Event::error(&self.identity, message));
            }
            ClientEvent::Ended { reason } => {
                let reason = if reason.is_empty() {
                    "Unknown".to_string()
                } else {
                    reason
                };
                self.terminate(format!("Disconnected: {}", reason), true).await;
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn handle_msg(&mut self, msg: SessionMsg) -> ControlFlow<()> {
        match msg {
            SessionMsg::Chat(text) => {
                // Silently ignored when the connection is not open.
                if let Some(client) = self.open_client() {
                    self.report_action(client.chat(&text).await);
                }
            }
            SessionMsg::ToggleSpam {
                text,
                interval,
                enable,
            } => self.apply_spam_toggle(text, interval, enable),
            SessionMsg::BurstSend(text) => {
                if let Some(client) = self.open_client() {
                    self.report_action(client.chat(&text).await);
                }
            }
            SessionMsg::AntiIdleTick => match self.open_client() {
                Some(client) => self.anti_idle_tick(client).await,
                // Guard rule: a tick against a dead connection cancels the
                // timer instead of acting.
                None => self.timers.clear_anti_idle(),
            },
            SessionMsg::SpamTick(text) => match self.open_client() {
                Some(client) => self.report_action(client.chat(&text).await),
                None => self.timers.clear_spam(),
            },
            SessionMsg::Sneak => {
                if let Some(client) = self.open_client() {
                    self.report_action(client.set_control_state(Control::Sneak, true).await);
                }
            }
            SessionMsg::Stop { ack } => {
                self.terminate("Disconnected".to_string(), false).await;
                let _ = ack.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn apply_spam_toggle(&mut self, text: String, interval: Duration, enable: bool) {
        if enable {
            if self.timers.spam_armed() {
                debug!(identity = %self.identity, "Replacing armed spam loop");
            }
            debug!(identity = %self.identity, interval = ?interval, "Arming spam loop");
            self.timers.arm_spam(self.self_tx.clone(), text, interval);
        } else {
            debug!(identity = %self.identity, "Clearing spam loop");
            self.timers.clear_spam();
        }
    }

    /// One anti-idle tick. Each action failure is a non-fatal error event;
    /// the timer keeps firing.
    async fn anti_idle_tick(&mut self, client: Arc<dyn ClientHandle>) {
        let Some(cfg) = self.config.anti_idle.clone() else {
            return;
        };
        if cfg.physical.forward {
            self.pulse_control(client.clone(), Control::Forward).await;
        }
        if cfg.physical.jump {
            self.pulse_control(client.clone(), Control::Jump).await;
        }
        if cfg.physical.head {
            // Resampled every tick, not interpolated. Keep the rng out of
            // scope across the await; ThreadRng is not Send.
            let (yaw, pitch) = {
                let mut rng = rand::thread_rng();
                (
                    rng.gen::<f32>() * std::f32::consts::TAU,
                    (rng.gen::<f32>() - 0.5) * std::f32::consts::PI,
                )
            };
            self.report_action(client.look(yaw, pitch).await);
        }
        if cfg.physical.arm {
            self.report_action(client.swing_arm().await);
        }
        if let Some(message) = &cfg.chat {
            self.report_action(client.chat(message).await);
        }
    }

    /// Assert a control now and release it after the fixed pulse, without
    /// holding up the session loop.
    async fn pulse_control(&mut self, client: Arc<dyn ClientHandle>, control: Control) {
        self.report_action(client.set_control_state(control, true).await);
        tokio::spawn(async move {
            tokio::time::sleep(CONTROL_PULSE).await;
            if client.is_open() {
                let _ = client.set_control_state(control, false).await;
            }
        });
    }

    fn open_client(&self) -> Option<Arc<dyn ClientHandle>> {
        self.client.as_ref().filter(|c| c.is_open()).cloned()
    }

    fn report_action(&self, result: Result<(), ClientError>) {
        if let Err(e) = result {
            warn!(identity = %self.identity, error = %e, "Session action failed");
            self.bus
                .emit(Event::error(&self.identity, format!("Action failed: {}", e)));
        }
    }

    fn set_status(&mut self, status: BotStatus, message: impl Into<String>) {
        let _ = self.status_tx.send(status);
        self.bus.emit(Event::status(&self.identity, status, message));
    }

    /// The single termination path: cancel every owned timer, release the
    /// connection, emit the terminal status, unregister, and consult the
    /// reconnect policy exactly once. `reconnect_eligible` is false for
    /// explicit stops.
    async fn terminate(&mut self, message: String, reconnect_eligible: bool) {
        self.timers.cancel_all();
        if let Some(client) = self.client.take() {
            let _ = client.quit().await;
        }
        self.set_status(BotStatus::Disconnected, message);
        self.registry.unregister(&self.identity).await;

        if reconnect_eligible {
            if let Some(delay) = self.config.reconnect_delay {
                self.supervisor.schedule(self.identity.clone(), delay).await;
            }
        }
        info!(identity = %self.identity, "Session terminated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(username: &str, password: Option<&str>) -> Account {
        Account {
            username: username.to_string(),
            password: password.map(str::to_string),
        }
    }

    #[test]
    fn test_assemble_offline_strips_password() {
        let mut settings = Settings::default();
        settings.offline_mode = true;
        let config = SessionConfig::assemble(
            &ServerInfo::default(),
            &settings,
            &account("steve", Some("hunter2")),
        );
        assert_eq!(config.connect.auth, AuthMode::Offline);
        assert!(config.connect.password.is_none());
    }

    #[test]
    fn test_assemble_authenticated_keeps_password() {
        let settings = Settings::default();
        let config = SessionConfig::assemble(
            &ServerInfo::default(),
            &settings,
            &account("steve", Some("hunter2")),
        );
        assert_eq!(config.connect.auth, AuthMode::Authenticated);
        assert_eq!(config.connect.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn test_assemble_disabled_features_are_none() {
        let mut settings = Settings::default();
        settings.anti_afk = false;
        settings.join_messages = false;
        settings.world_change_messages = false;
        settings.auto_reconnect = false;
        let config = SessionConfig::assemble(
            &ServerInfo::default(),
            &settings,
            &account("steve", None),
        );
        assert!(config.anti_idle.is_none());
        assert!(config.join_burst.is_none());
        assert!(config.world_burst.is_none());
        assert!(config.reconnect_delay.is_none());
    }

    #[test]
    fn test_assemble_anti_idle_interval_is_minutes() {
        let mut settings = Settings::default();
        settings.anti_afk_interval = 2;
        let config = SessionConfig::assemble(
            &ServerInfo::default(),
            &settings,
            &account("steve", None),
        );
        let anti_idle = config.anti_idle.unwrap();
        assert_eq!(anti_idle.interval, Duration::from_secs(120));
        // Chat ping defaults to configured-but-disabled.
        assert!(anti_idle.chat.is_none());
    }

    #[test]
    fn test_assemble_chat_ping_when_enabled() {
        let mut settings = Settings::default();
        settings.anti_afk_chat.send = true;
        let config = SessionConfig::assemble(
            &ServerInfo::default(),
            &settings,
            &account("steve", None),
        );
        assert_eq!(config.anti_idle.unwrap().chat.as_deref(), Some("/ping"));
    }
}
