//! Polling loop
//!
//! A single tokio task owns the write side of the [`Loader`]. Timer expiry
//! and user commands are multiplexed with `select!`, so a tick and an edit
//! never run at the same time.
//!
//! ```text
//!   Idle ──start──▶ Scheduled ──timer──▶ Ticking ──▶ Scheduled ...
//!     └───────────────┴──────stop / all handles dropped──────▶ Stopped
//! ```

use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace};

use crate::data::{FanControl, SensorRef};
use crate::engine::loader::SharedLoader;
use crate::error::{FancontrolError, Result};
use crate::events::{Event, Subscription};

/// Where the loop is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Running but no tick scheduled
    Idle,
    /// Waiting for the next tick
    Scheduled,
    /// Reading sensors
    Ticking,
    /// Terminal
    Stopped,
}

enum Command {
    Start(oneshot::Sender<()>),
    Stop,
    SetInterval(i64, oneshot::Sender<Result<bool>>),
    Open(PathBuf, oneshot::Sender<Result<()>>),
    Save(Option<PathBuf>, oneshot::Sender<Result<PathBuf>>),
    Rediscover(oneshot::Sender<usize>),
    SetControl(SensorRef, Option<FanControl>, oneshot::Sender<Result<()>>),
}

fn period(secs: i64) -> Duration {
    Duration::from_secs(secs.max(1).unsigned_abs())
}

/// Cloneable handle to a running loop
#[derive(Debug, Clone)]
pub struct LoopHandle {
    tx: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<LoopState>,
    loader: SharedLoader,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::Start(_) => "Start",
            Command::Stop => "Stop",
            Command::SetInterval(..) => "SetInterval",
            Command::Open(..) => "Open",
            Command::Save(..) => "Save",
            Command::Rediscover(_) => "Rediscover",
            Command::SetControl(..) => "SetControl",
        };
        f.write_str(name)
    }
}

/// Spawn the loop on the current tokio runtime. It starts Idle.
pub fn spawn(loader: SharedLoader) -> LoopHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(LoopState::Idle);
    tokio::spawn(run(loader.clone(), rx, state_tx));
    LoopHandle {
        tx,
        state: state_rx,
        loader,
    }
}

async fn run(
    loader: SharedLoader,
    mut rx: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<LoopState>,
) {
    let bus = loader.read().bus().clone();
    let mut secs = loader.read().interval();
    let mut next: Option<Instant> = None;

    info!(interval = secs, "Polling loop started");

    loop {
        tokio::select! {
            biased;

            cmd = rx.recv() => {
                let Some(cmd) = cmd else { break };
                trace!(?cmd, "Loop command");
                match cmd {
                    Command::Stop => break,
                    Command::Start(reply) => {
                        if next.is_none() {
                            next = Some(Instant::now() + period(secs));
                            state.send_replace(LoopState::Scheduled);
                        }
                        let _ = reply.send(());
                    }
                    Command::SetInterval(n, reply) => {
                        let _ = reply.send(loader.write().set_interval(n));
                    }
                    Command::Open(path, reply) => {
                        let _ = reply.send(loader.write().open(&path));
                    }
                    Command::Save(path, reply) => {
                        let _ = reply.send(loader.write().save(path.as_deref()));
                    }
                    Command::Rediscover(reply) => {
                        let _ = reply.send(loader.write().parse_hwmons());
                    }
                    Command::SetControl(pwm, control, reply) => {
                        let _ = reply.send(loader.write().set_control(pwm, control));
                    }
                }

                // A new interval replaces the pending timer
                let current = loader.read().interval();
                if current != secs {
                    secs = current;
                    if next.is_some() {
                        next = Some(Instant::now() + period(secs));
                        debug!(interval = secs, "Timer rearmed");
                    }
                }
            }

            _ = sleep_until(next.unwrap_or_else(Instant::now)), if next.is_some() => {
                state.send_replace(LoopState::Ticking);
                let changed = loader.write().update_sensors();
                trace!(changed, "Tick finished");
                next = Some(Instant::now() + period(secs));
                state.send_replace(LoopState::Scheduled);
            }
        }
    }

    state.send_replace(LoopState::Stopped);
    bus.publish(Event::LoopStopped);
    info!("Polling loop stopped");
}

impl LoopHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .map_err(|_| FancontrolError::LoopStopped)?;
        reply_rx.await.map_err(|_| FancontrolError::LoopStopped)
    }

    /// Arm the timer; the first tick comes one interval later
    pub async fn start(&self) -> Result<()> {
        self.request(Command::Start).await
    }

    /// Stop the loop and wait until it has stopped. A tick in progress
    /// completes first.
    pub async fn stop(&self) {
        let _ = self.tx.send(Command::Stop);
        let mut state = self.state.clone();
        let _ = state.wait_for(|s| *s == LoopState::Stopped).await;
    }

    pub fn state(&self) -> LoopState {
        *self.state.borrow()
    }

    pub fn loader(&self) -> &SharedLoader {
        &self.loader
    }

    pub fn subscribe(&self) -> Subscription {
        self.loader.read().subscribe()
    }

    pub async fn set_interval(&self, secs: i64) -> Result<bool> {
        self.request(|r| Command::SetInterval(secs, r)).await?
    }

    pub async fn open(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        self.request(|r| Command::Open(path, r)).await?
    }

    pub async fn save(&self, path: Option<PathBuf>) -> Result<PathBuf> {
        self.request(|r| Command::Save(path, r)).await?
    }

    /// Re-run discovery; returns the number of devices
    pub async fn rediscover(&self) -> Result<usize> {
        self.request(Command::Rediscover).await
    }

    pub async fn set_control(&self, pwm: SensorRef, control: FanControl) -> Result<()> {
        self.request(|r| Command::SetControl(pwm, Some(control), r)).await?
    }

    pub async fn clear_control(&self, pwm: SensorRef) -> Result<()> {
        self.request(|r| Command::SetControl(pwm, None, r)).await?
    }
}
