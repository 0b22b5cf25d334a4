use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// The session timer ticks once a second
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum DrillEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait DrillEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<DrillEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<DrillEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // key release events would otherwise double every keystroke on some platforms
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    tx.send(DrillEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => tx.send(DrillEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forwarded.is_err() {
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

impl DrillEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<DrillEvent, RecvTimeoutError> {
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
}

impl Default for FixedTicker {
    fn default() -> Self {
        Self::new(TICK_INTERVAL)
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<DrillEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<DrillEvent>) -> Self {
        Self { rx }
    }
}

impl DrillEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<DrillEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Serialises key events and timer ticks into one stream
///
/// Ticks are scheduled against a fixed deadline, so a burst of key events
/// does not push the next tick back.
pub struct Runner<E: DrillEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    next_tick: Instant,
}

impl<E: DrillEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        let next_tick = Instant::now() + ticker.interval();
        Self {
            event_source,
            ticker,
            next_tick,
        }
    }

    /// Restart the tick schedule from now, e.g. when a new session starts
    pub fn reset_ticks(&mut self) {
        self.next_tick = Instant::now() + self.ticker.interval();
    }

    /// Blocks until the next event or the next tick deadline, whichever comes first
    pub fn step(&mut self) -> DrillEvent {
        let now = Instant::now();
        if now >= self.next_tick {
            return self.tick();
        }

        match self.event_source.recv_timeout(self.next_tick - now) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => self.tick(),
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(self.next_tick.saturating_duration_since(Instant::now()));
                self.tick()
            }
        }
    }

    fn tick(&mut self) -> DrillEvent {
        self.next_tick += self.ticker.interval();
        DrillEvent::Tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(1));
        let mut runner = Runner::new(es, ticker);

        assert!(matches!(runner.step(), DrillEvent::Tick));
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(DrillEvent::Resize).unwrap();
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(50));
        let mut runner = Runner::new(es, ticker);

        assert!(matches!(runner.step(), DrillEvent::Resize));
    }

    #[test]
    fn key_traffic_does_not_delay_ticks() {
        let (tx, rx) = mpsc::channel();
        for _ in 0..1000 {
            tx.send(DrillEvent::Resize).unwrap();
        }
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(20));
        let mut runner = Runner::new(es, ticker);

        std::thread::sleep(Duration::from_millis(25));
        // the deadline has passed, so the tick wins over queued events
        assert!(matches!(runner.step(), DrillEvent::Tick));
        assert!(matches!(runner.step(), DrillEvent::Resize));
    }

    #[test]
    fn disconnected_source_still_ticks_on_schedule() {
        let (tx, rx) = mpsc::channel::<DrillEvent>();
        drop(tx);
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(10));
        let mut runner = Runner::new(es, ticker);

        let started = Instant::now();
        for _ in 0..3 {
            assert!(matches!(runner.step(), DrillEvent::Tick));
        }
        assert!(started.elapsed() >= Duration::from_millis(25));
    }
}
