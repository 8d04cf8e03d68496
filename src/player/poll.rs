// Transport position poll timer
// One timer at most: armed while (track, readiness) is present, re-armed
// whenever the identity of that pair changes, stopped on shutdown.

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

// Identity of the active track: which track list, which position in it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollKey {
    pub revision: u64,
    pub index: usize,
}

pub struct PollTimer<E> {
    tx: UnboundedSender<E>,
    tick: fn() -> E,
    interval: Duration,
    active: Option<(PollKey, JoinHandle<()>)>,
}

impl<E: Send + 'static> PollTimer<E> {
    pub fn new(tx: UnboundedSender<E>, tick: fn() -> E, interval: Duration) -> Self {
        PollTimer {
            tx,
            tick,
            interval,
            active: None,
        }
    }

    // Brings the timer in line with the wanted key. Same key: nothing.
    // Different key: the old task is aborted before a new one is armed.
    pub fn sync(&mut self, wanted: Option<PollKey>) {
        if self.active_key() == wanted {
            return;
        }
        self.stop();

        if let Some(key) = wanted {
            tracing::debug!(?key, "poll timer armed");
            let handle = tokio::spawn(tick_loop(self.tx.clone(), self.tick, self.interval));
            self.active = Some((key, handle));
        }
    }

    pub fn stop(&mut self) {
        if let Some((key, handle)) = self.active.take() {
            tracing::debug!(?key, "poll timer stopped");
            handle.abort();
        }
    }

    pub fn active_key(&self) -> Option<PollKey> {
        self.active.as_ref().map(|(key, _)| *key)
    }
}

impl<E> Drop for PollTimer<E> {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.active.take() {
            handle.abort();
        }
    }
}

async fn tick_loop<E>(tx: UnboundedSender<E>, tick: fn() -> E, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // the first tick of an interval fires immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if tx.send(tick()).is_err() {
            break;
        }
    }
}
