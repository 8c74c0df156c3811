//! Rest timer: countdown / stopwatch state and a cancellable periodic ticker.
//!
//! The state machine is driven by explicit `tick()` calls so it can be tested
//! without waiting on a clock; [`Ticker`] supplies the real one-second beat.

use std::fmt;
use std::ops::ControlFlow;
use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

pub const MAX_PICKER_MINUTES: u32 = 15;
pub const MAX_PICKER_SECONDS: u32 = 59;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remaining {
    pub minutes: u32,
    pub seconds: u32,
}

impl Remaining {
    #[must_use]
    pub const fn from_seconds(total: u32) -> Self {
        Self {
            minutes: total / 60,
            seconds: total % 60,
        }
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes, self.seconds)
    }
}

/// Time left on a countdown of `total_seconds` after `elapsed` seconds.
#[must_use]
pub const fn remaining(total_seconds: u32, elapsed: u32) -> Remaining {
    Remaining::from_seconds(total_seconds.saturating_sub(elapsed))
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("Minutes must be between 0 and 15, got {0}")]
    MinutesOutOfRange(u32),
    #[error("Seconds must be between 0 and 59, got {0}")]
    SecondsOutOfRange(u32),
}

/// Countdown length as picked on the timer screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownSetting {
    minutes: u32,
    seconds: u32,
}

impl CountdownSetting {
    /// # Errors
    /// `TimerError` when a value is outside the picker range.
    pub const fn new(minutes: u32, seconds: u32) -> Result<Self, TimerError> {
        if minutes > MAX_PICKER_MINUTES {
            return Err(TimerError::MinutesOutOfRange(minutes));
        }
        if seconds > MAX_PICKER_SECONDS {
            return Err(TimerError::SecondsOutOfRange(seconds));
        }
        Ok(Self { minutes, seconds })
    }

    /// Splits a rest interval in seconds into picker values.
    /// # Errors
    /// `TimerError::MinutesOutOfRange` for intervals of 16 minutes or more.
    pub const fn from_total_seconds(total: u32) -> Result<Self, TimerError> {
        Self::new(total / 60, total % 60)
    }

    #[must_use]
    pub const fn total_seconds(self) -> u32 {
        self.minutes * 60 + self.seconds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    Countdown,
    Stopwatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Running(Remaining),
    /// The countdown reached zero on this tick. Reported once per run.
    Finished,
}

#[derive(Debug, Clone)]
pub struct RestTimer {
    mode: TimerMode,
    setting: CountdownSetting,
    running: bool,
    elapsed: u32,
}

impl RestTimer {
    #[must_use]
    pub const fn countdown(setting: CountdownSetting) -> Self {
        Self {
            mode: TimerMode::Countdown,
            setting,
            running: false,
            elapsed: 0,
        }
    }

    #[must_use]
    pub const fn stopwatch() -> Self {
        Self {
            mode: TimerMode::Stopwatch,
            setting: CountdownSetting {
                minutes: 0,
                seconds: 0,
            },
            running: false,
            elapsed: 0,
        }
    }

    pub const fn mode(&self) -> TimerMode {
        self.mode
    }

    pub const fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_countdown(&mut self, setting: CountdownSetting) {
        self.setting = setting;
    }

    /// Starts from zero elapsed. A zero-length countdown finishes right away.
    pub fn start(&mut self) -> TickOutcome {
        self.elapsed = 0;
        if self.mode == TimerMode::Countdown && self.setting.total_seconds() == 0 {
            self.running = false;
            return TickOutcome::Finished;
        }
        self.running = true;
        TickOutcome::Running(self.display())
    }

    /// Advances by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }
        self.elapsed += 1;
        match self.mode {
            TimerMode::Stopwatch => TickOutcome::Running(self.display()),
            TimerMode::Countdown => {
                if self.elapsed >= self.setting.total_seconds() {
                    self.running = false;
                    TickOutcome::Finished
                } else {
                    TickOutcome::Running(self.display())
                }
            }
        }
    }

    /// Stops and resets elapsed time.
    pub fn stop(&mut self) {
        self.running = false;
        self.elapsed = 0;
    }

    /// Switches between countdown and stopwatch, stopping any run in progress.
    pub fn switch_mode(&mut self) {
        self.stop();
        self.mode = match self.mode {
            TimerMode::Countdown => TimerMode::Stopwatch,
            TimerMode::Stopwatch => TimerMode::Countdown,
        };
    }

    #[must_use]
    pub const fn display(&self) -> Remaining {
        match self.mode {
            TimerMode::Countdown => remaining(self.setting.total_seconds(), self.elapsed),
            TimerMode::Stopwatch => Remaining::from_seconds(self.elapsed),
        }
    }
}

/// Side effect fired when a countdown completes (sound, bell, notification).
pub trait Alarm {
    fn ring(&mut self);
}

/// Background thread calling `on_tick` once per interval until stopped or
/// until the callback returns `ControlFlow::Break`.
pub struct Ticker {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn<F>(interval: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = channel();
        let handle = thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    if on_tick().is_break() {
                        break;
                    }
                }
            }
        });
        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Signals the thread and waits for it. No tick runs after this returns.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
