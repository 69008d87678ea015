use chrono::Duration;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at, sleep};

use crate::clock::Clock;
use crate::config::ObserverSettings;
use crate::db::PollStore;
use crate::lifecycle::{self, PollStatus};
use crate::models::Poll;
use crate::voting::{self, Tally};

/// One refresh of a poll's live results.
#[derive(Debug, Clone, PartialEq)]
pub struct TallySnapshot {
    pub title: String,
    pub tally: Tally,
    pub status: PollStatus,
    pub remaining: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    Snapshot(TallySnapshot),
    /// Countdown ticks left before the session expires.
    Countdown(u32),
    PollClosed,
    SessionExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    InvalidPoll,
    PollClosed,
    SessionExpired,
    ClosedByCaller,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Idle,
    Observing,
    Terminated(TerminationReason),
}

/// Live view of one poll for a bounded session.
///
/// A session re-reads the poll every refresh period and emits a
/// [`TallySnapshot`], counts down towards expiry once per time unit, and
/// keeps a single-shot timeout as a second route to [`ObserverEvent::SessionExpired`].
/// It ends when the poll closes, when the session expires, or when the
/// caller closes it; all three timers live in one task and die with it.
pub struct ResultObserver;

// The event sender, shared by the session and its handle. Taking it out
// under the lock is what ends the stream, so nothing is sent after close().
type Outbox = Arc<Mutex<Option<EventSender>>>;
type EventSender = mpsc::UnboundedSender<ObserverEvent>;

fn lock_outbox(outbox: &Outbox) -> MutexGuard<'_, Option<EventSender>> {
    outbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ResultObserver {
    pub fn start<S: PollStore>(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        poll: Option<Poll>,
        settings: ObserverSettings,
    ) -> (ObserverHandle, mpsc::UnboundedReceiver<ObserverEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ObserverState::Idle);
        let (stop_tx, stop_rx) = oneshot::channel();
        let outbox: Outbox = Arc::new(Mutex::new(None));

        let handle = |task: Option<JoinHandle<()>>, stop: Option<oneshot::Sender<()>>| ObserverHandle {
            state: state_rx.clone(),
            stop: Mutex::new(stop),
            outbox: Arc::clone(&outbox),
            task: Mutex::new(task),
        };

        let poll = match poll {
            Some(poll) if !poll.options.is_empty() => poll,
            _ => {
                warn!("Refusing to observe a missing or empty poll");
                state_tx.send_replace(ObserverState::Terminated(TerminationReason::InvalidPoll));
                // `event_tx` never reaches the outbox, so the receiver ends straight away.
                return (handle(None, None), event_rx);
            }
        };

        *lock_outbox(&outbox) = Some(event_tx);
        state_tx.send_replace(ObserverState::Observing);
        info!("Observing poll {:?}", poll.title);

        let session = Session {
            store,
            clock,
            title: poll.title,
            settings,
            outbox: Arc::clone(&outbox),
        };
        let task = tokio::spawn(async move {
            let reason = session.run(stop_rx).await;
            lock_outbox(&session.outbox).take();
            state_tx.send_replace(ObserverState::Terminated(reason));
            info!("Stopped observing poll {:?}: {:?}", session.title, reason);
        });

        (handle(Some(task), Some(stop_tx)), event_rx)
    }
}

struct Session<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    title: String,
    settings: ObserverSettings,
    outbox: Outbox,
}

impl<S: PollStore> Session<S> {
    async fn run(&self, mut stop_rx: oneshot::Receiver<()>) -> TerminationReason {
        let start = Instant::now();

        let mut refresh = interval(self.settings.refresh_period());
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let countdown_period = self.settings.countdown_period();
        let mut countdown = interval_at(start + countdown_period, countdown_period);
        let mut ticks_left = self.settings.countdown_ticks;

        let timeout = sleep(self.settings.session_timeout());
        tokio::pin!(timeout);

        loop {
            tokio::select! {
                biased;

                // Fires on close() and also when the handle is dropped.
                _ = &mut stop_rx => return TerminationReason::ClosedByCaller,

                _ = countdown.tick() => {
                    ticks_left = ticks_left.saturating_sub(1);
                    if ticks_left == 0 {
                        self.emit(ObserverEvent::SessionExpired);
                        return TerminationReason::SessionExpired;
                    }
                    self.emit(ObserverEvent::Countdown(ticks_left));
                }

                _ = &mut timeout => {
                    self.emit(ObserverEvent::SessionExpired);
                    return TerminationReason::SessionExpired;
                }

                _ = refresh.tick() => {
                    if let Some(status) = self.refresh().await {
                        if status == PollStatus::Closed {
                            self.emit(ObserverEvent::PollClosed);
                            return TerminationReason::PollClosed;
                        }
                    }
                    if lock_outbox(&self.outbox).is_none() {
                        return TerminationReason::ClosedByCaller;
                    }
                }
            }
        }
    }

    // Emits one snapshot; a failed read is skipped and retried on the next tick.
    async fn refresh(&self) -> Option<PollStatus> {
        let poll = match self.store.get(&self.title).await {
            Ok(poll) => poll,
            Err(e) => {
                warn!("Could not refresh poll {:?}: {}", self.title, e);
                return None;
            }
        };

        let now = self.clock.now();
        let snapshot = TallySnapshot {
            title: poll.title.clone(),
            tally: voting::tally(&poll),
            status: lifecycle::status(&poll, now),
            remaining: lifecycle::remaining(&poll, now),
        };
        debug!("Poll {:?} tally: {:?}", self.title, snapshot.tally.counts);

        let status = snapshot.status;
        self.emit(ObserverEvent::Snapshot(snapshot));
        Some(status)
    }

    fn emit(&self, event: ObserverEvent) {
        // Checked and sent under one lock, so close() seals the stream.
        if let Some(events) = lock_outbox(&self.outbox).as_ref() {
            // The caller may have stopped listening; the session still runs to its end.
            let _ = events.send(event);
        }
    }
}

pub struct ObserverHandle {
    state: watch::Receiver<ObserverState>,
    stop: Mutex<Option<oneshot::Sender<()>>>,
    outbox: Outbox,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ObserverHandle {
    pub fn state(&self) -> ObserverState {
        *self.state.borrow()
    }

    /// Ends the session. Safe to call any number of times; no event is
    /// emitted once this returns.
    pub fn close(&self) {
        lock_outbox(&self.outbox).take();
        let stop = self
            .stop
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(stop) = stop {
            let _ = stop.send(());
        }
    }

    /// Waits until the session has fully stopped and returns its final state.
    pub async fn terminated(&self) -> ObserverState {
        let task = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Observer task ended abnormally: {}", e);
            }
        }
        self.state()
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.close();
    }
}
