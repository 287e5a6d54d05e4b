use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// How long to block for input while no countdown is running.
const IDLE_WAIT: Duration = Duration::from_millis(500);

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum QuizEvent {
    Key(KeyEvent),
    Resize,
    /// One countdown interval elapsed.
    Tick,
    /// The event source is gone and no countdown is running.
    Closed,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait QuizEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<QuizEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<QuizEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let evt = match event::read() {
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => QuizEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => QuizEvent::Resize,
                Ok(_) => continue,
                Err(err) => {
                    tracing::warn!(%err, "terminal event reader stopped");
                    break;
                }
            };
            if tx.send(evt).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<QuizEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<QuizEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<QuizEvent>) -> Self {
        Self { rx }
    }
}

impl QuizEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<QuizEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// The one-second clock a quiz countdown runs on.
    pub fn per_second() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// A periodic deadline. Stopped countdowns never fire.
#[derive(Debug, Clone)]
pub struct Countdown {
    interval: Duration,
    next_due: Option<Instant>,
}

impl Countdown {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    /// (Re)starts the countdown; the first tick is one interval from `now`.
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }

    /// Returns true and schedules the next deadline if one is due at `now`.
    ///
    /// Deadlines advance by whole intervals, so a late caller gets one tick
    /// per missed interval rather than a drifting clock.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(due + self.interval);
                true
            }
            _ => false,
        }
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: QuizEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    countdown: Countdown,
}

impl<E: QuizEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        let countdown = Countdown::new(ticker.interval());
        Self {
            event_source,
            ticker,
            countdown,
        }
    }

    pub fn start_countdown(&mut self) {
        tracing::debug!(interval = ?self.ticker.interval(), "countdown started");
        self.countdown.start(Instant::now());
    }

    pub fn stop_countdown(&mut self) {
        if self.countdown.is_running() {
            tracing::debug!("countdown stopped");
        }
        self.countdown.stop();
    }

    pub fn countdown_running(&self) -> bool {
        self.countdown.is_running()
    }

    /// Blocks until the next input event or countdown tick.
    ///
    /// Input is delivered as it arrives; ticks are only produced while the
    /// countdown runs and keep their cadence regardless of input traffic.
    pub fn step(&mut self) -> QuizEvent {
        loop {
            let now = Instant::now();
            if self.countdown.fire(now) {
                return QuizEvent::Tick;
            }

            let timeout = self.countdown.time_until_due(now).unwrap_or(IDLE_WAIT);
            match self.event_source.recv_timeout(timeout) {
                Ok(ev) => return ev,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    if !self.countdown.is_running() {
                        return QuizEvent::Closed;
                    }
                    std::thread::sleep(timeout);
                }
            }
        }
    }
}
