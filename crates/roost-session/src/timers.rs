//! Per-session timer set.
//!
//! Every recurring or deferred behavior a session owns (anti-idle loop, spam
//! loop, message bursts, deferred sneak) runs as a small tokio task that
//! feeds ticks back into the session's own command channel. The session task
//! is the only thing that ever touches the connection, so timers stay
//! trivially race-free. All handles die in one `cancel_all` sweep on any
//! termination path; no timer outlives its session.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::session::SessionMsg;

/// Fixed spacing between messages within one burst, to stay under
/// server-side anti-spam thresholds.
pub(crate) const BURST_STAGGER: Duration = Duration::from_millis(300);

/// The timers owned by one session.
#[derive(Default)]
pub(crate) struct TimerSet {
    anti_idle: Option<JoinHandle<()>>,
    spam: Option<JoinHandle<()>>,
    oneshots: Vec<JoinHandle<()>>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)arm the recurring anti-idle timer, replacing any prior one.
    pub fn arm_anti_idle(&mut self, tx: mpsc::Sender<SessionMsg>, interval: Duration) {
        if let Some(old) = self.anti_idle.take() {
            old.abort();
        }
        self.anti_idle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick of a tokio interval fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.send(SessionMsg::AntiIdleTick).await.is_err() {
                    return;
                }
            }
        }));
    }

    /// Cancel the anti-idle timer if armed.
    pub fn clear_anti_idle(&mut self) {
        if let Some(handle) = self.anti_idle.take() {
            handle.abort();
        }
    }

    /// (Re)arm the recurring spam timer, replacing any prior one.
    pub fn arm_spam(&mut self, tx: mpsc::Sender<SessionMsg>, text: String, interval: Duration) {
        self.clear_spam();
        self.spam = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.send(SessionMsg::SpamTick(text.clone())).await.is_err() {
                    return;
                }
            }
        }));
    }

    /// Cancel the spam timer if armed.
    pub fn clear_spam(&mut self) {
        if let Some(handle) = self.spam.take() {
            handle.abort();
        }
    }

    /// Whether a spam timer is currently armed.
    pub fn spam_armed(&self) -> bool {
        self.spam.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    /// Arm a one-shot message burst: wait `delay`, then feed each non-empty
    /// message to the session in order with the fixed stagger between sends.
    pub fn arm_burst(&mut self, tx: mpsc::Sender<SessionMsg>, delay: Duration, messages: Vec<String>) {
        self.oneshots.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut first = true;
            for message in messages {
                let message = message.trim();
                if message.is_empty() {
                    continue;
                }
                if !first {
                    tokio::time::sleep(BURST_STAGGER).await;
                }
                first = false;
                if tx
                    .send(SessionMsg::BurstSend(message.to_string()))
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }));
    }

    /// Arm a one-shot deferred message.
    pub fn arm_delayed(&mut self, tx: mpsc::Sender<SessionMsg>, delay: Duration, msg: SessionMsg) {
        self.oneshots.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(msg).await;
        }));
    }

    /// Cancel every owned timer. Pending burst sends are dropped, not fired.
    pub fn cancel_all(&mut self) {
        self.clear_anti_idle();
        self.clear_spam();
        for handle in self.oneshots.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
