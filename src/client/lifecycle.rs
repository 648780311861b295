//! The foreground loop: tick until the completion signal fires.

use std::fmt;
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::client::signal::CompletionSignal;
use crate::connection::MessageWriter;
use crate::message::Message;

/// Shortest tick period; `tokio::time::interval` rejects zero.
const MIN_TICK: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    #[default]
    Running,
    Terminated,
}

/// What a [`TickHook`] asks the controller to do on a tick.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TickAction {
    #[default]
    Idle,
    /// Write this message on the connection.
    Send(Message),
}

/// Called on every lifecycle tick, numbered from 1.
pub trait TickHook: Send {
    fn on_tick(&mut self, tick: u64) -> TickAction;
}

impl<F> TickHook for F
where
    F: FnMut(u64) -> TickAction + Send,
{
    fn on_tick(&mut self, tick: u64) -> TickAction {
        self(tick)
    }
}

/// The default hook: never does anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleHook;

impl TickHook for IdleHook {
    fn on_tick(&mut self, _tick: u64) -> TickAction {
        TickAction::Idle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LifecycleReport {
    /// Ticks observed before the signal fired.
    pub ticks: u64,
}

/// Waits on a repeating ticker and the [`CompletionSignal`], whichever
/// comes first, until the signal fires.
pub struct LifecycleController {
    period: Duration,
    hook: Box<dyn TickHook>,
    state: LifecycleState,
}

impl fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleController")
            .field("period", &self.period)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl LifecycleController {
    #[must_use]
    pub fn new(period: Duration, hook: Box<dyn TickHook>) -> Self {
        Self {
            period: period.max(MIN_TICK),
            hook,
            state: LifecycleState::Running,
        }
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Run until `signal` fires.
    ///
    /// The first tick comes one period after the call; ticks missed while
    /// the hook's write was pending are delayed rather than replayed. A
    /// failed hook write is logged and the loop continues.
    pub async fn run<T: AsyncWrite>(
        &mut self,
        signal: &CompletionSignal,
        writer: &MessageWriter<T>,
    ) -> LifecycleReport {
        let mut report = LifecycleReport::default();
        if self.state == LifecycleState::Terminated {
            return report;
        }

        let mut ticker = time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = signal.fired() => break,
                _ = ticker.tick() => {
                    report.ticks += 1;
                    if let TickAction::Send(message) = self.hook.on_tick(report.ticks) {
                        if let Err(e) = writer.send(message).await {
                            warn!("write: {e}");
                        }
                    }
                }
            }
        }

        drop(ticker);
        self.state = LifecycleState::Terminated;
        debug!(ticks = report.ticks, "lifecycle terminated");
        report
    }
}
