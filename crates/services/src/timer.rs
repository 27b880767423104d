//! Countdown and grace-delay primitives backed by tokio tasks.
//!
//! Both hand out a generation number on every arm. Callbacks carry it back so
//! the owner can discard anything queued before the latest `disarm`/`cancel`.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Periodic tick source. At most one task runs at a time.
#[derive(Debug)]
pub struct CountdownTimer {
    period: Duration,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl CountdownTimer {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            generation: 0,
            task: None,
        }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start ticking, replacing any running countdown. The first tick fires
    /// one period after arming. `on_tick` receives the generation and returns
    /// `false` to stop the task.
    ///
    /// Must be called inside a tokio runtime.
    pub fn arm<F>(&mut self, mut on_tick: F) -> u64
    where
        F: FnMut(u64) -> bool + Send + 'static,
    {
        self.disarm();
        self.generation += 1;
        let generation = self.generation;
        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !on_tick(generation) {
                    break;
                }
            }
        }));
        generation
    }

    pub fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }

    /// True if a tick stamped with `generation` came from the running countdown.
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_armed() && generation == self.generation
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// One-shot delay with the same generation discipline as `CountdownTimer`.
#[derive(Debug)]
pub struct GraceDelay {
    delay: Duration,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl GraceDelay {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            task: None,
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `on_elapsed` once after the delay, replacing any pending one.
    ///
    /// Must be called inside a tokio runtime.
    pub fn schedule<F>(&mut self, on_elapsed: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let delay = self.delay;
        self.task = Some(tokio::spawn(async move {
            time::sleep(delay).await;
            on_elapsed(generation);
        }));
        generation
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// True while the delay has neither elapsed nor been cancelled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// True if `generation` came from the latest `schedule` and no `cancel`
    /// followed, even once the delay has fired.
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.task.is_some() && generation == self.generation
    }
}

impl Drop for GraceDelay {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    const SECOND: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_once_per_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = CountdownTimer::new(SECOND);
        let generation = timer.arm(move |g| tx.send(g).is_ok());

        time::sleep(Duration::from_millis(3_500)).await;
        timer.disarm();

        let mut ticks = Vec::new();
        while let Ok(g) = rx.try_recv() {
            ticks.push(g);
        }
        assert_eq!(ticks, vec![generation; 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_previous_countdown() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = CountdownTimer::new(SECOND);
        let first_tx = tx.clone();
        let first = timer.arm(move |g| first_tx.send(g).is_ok());
        time::sleep(Duration::from_millis(500)).await;
        let second = timer.arm(move |g| tx.send(g).is_ok());

        time::sleep(Duration::from_millis(2_100)).await;
        timer.disarm();

        let mut ticks = Vec::new();
        while let Ok(g) = rx.try_recv() {
            ticks.push(g);
        }
        assert_ne!(first, second);
        assert_eq!(ticks, vec![second, second]);
        assert!(!timer.is_current(first));
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_stops_ticks_and_invalidates_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = CountdownTimer::new(SECOND);
        let generation = timer.arm(move |g| tx.send(g).is_ok());
        assert!(timer.is_current(generation));

        timer.disarm();
        time::sleep(Duration::from_secs(5)).await;

        assert!(rx.try_recv().is_err());
        assert!(!timer.is_current(generation));
    }

    #[tokio::test(start_paused = true)]
    async fn grace_delay_fires_once_unless_cancelled() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut grace = GraceDelay::new(Duration::from_millis(1_500));

        let cancelled_tx = tx.clone();
        grace.schedule(move |g| {
            let _ = cancelled_tx.send(g);
        });
        grace.cancel();

        let generation = grace.schedule(move |g| {
            let _ = tx.send(g);
        });
        time::sleep(Duration::from_millis(1_400)).await;
        assert!(rx.try_recv().is_err());

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(rx.try_recv().ok(), Some(generation));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn grace_delay_stops_pending_once_fired() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut grace = GraceDelay::new(Duration::from_millis(1_500));
        let generation = grace.schedule(move |g| {
            let _ = tx.send(g);
        });
        assert!(grace.is_pending());

        time::sleep(Duration::from_millis(1_600)).await;
        tokio::task::yield_now().await;
        assert_eq!(rx.try_recv().ok(), Some(generation));
        assert!(!grace.is_pending());
        assert!(grace.is_current(generation));

        grace.cancel();
        assert!(!grace.is_pending());
        assert!(!grace.is_current(generation));
    }
}
