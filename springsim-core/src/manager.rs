//! Single-active-run execution
//!
//! [`RunManager`] owns at most one sampling loop. A new request delivers its
//! init event, cancels the current loop, waits for that loop's thread to
//! exit and only then starts the next one, so two loops never push into a
//! sink at the same time.
//!
//! Each run carries a `RunControl`. The loop holds its lock while checking
//! the state and emitting a sample; the manager holds it while delivering
//! the next init event and moving the run to `Cancelling`. Once the new init
//! event has been delivered, the superseded run cannot emit again.

use crate::params::{Limits, SimulationParameters};
use crate::protocol::{InitEvent, RunEvent, RunId, Sample};
use crate::sink::Sink;
use crate::solver::{DampingRegime, Trajectory};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

/// Default wall-clock interval between samples
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Wall-clock interval between samples. Simulated time advances by the
    /// same amount per tick.
    pub tick_interval: Duration,
}

impl RunConfig {
    pub fn new(tick_interval: Duration) -> Self {
        Self { tick_interval }
    }

    /// Simulated seconds per tick
    pub fn time_step(&self) -> f64 {
        self.tick_interval.as_secs_f64()
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Cancelling,
    Terminated,
}

/// Cancellation state shared by a `RunHandle` and its loop
#[derive(Debug)]
pub(crate) struct RunControl {
    state: Mutex<RunState>,
    wake: Condvar,
}

impl RunControl {
    fn new() -> Self {
        Self {
            state: Mutex::new(RunState::Running),
            wake: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> RunState {
        *self.lock()
    }

    /// Request cancellation. Returns false if the run was already stopping.
    fn cancel(&self) -> bool {
        let mut state = self.lock();
        let changed = Self::begin_cancel(&mut state);
        drop(state);
        self.wake.notify_all();
        changed
    }

    fn begin_cancel(state: &mut RunState) -> bool {
        if *state == RunState::Running {
            *state = RunState::Cancelling;
            true
        } else {
            false
        }
    }

    /// Emit `event` through `sink` only if the run is still running.
    /// A run found stopping moves to `Terminated` instead.
    fn emit_if_running(&self, sink: &dyn Sink, event: &RunEvent) -> bool {
        let mut state = self.lock();
        if *state != RunState::Running {
            *state = RunState::Terminated;
            return false;
        }
        sink.deliver(event);
        true
    }

    /// Sleep for one tick. Returns early if cancellation is requested.
    fn wait_tick(&self, interval: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .wake
            .wait_timeout_while(state, interval, |s| *s == RunState::Running)
            .unwrap_or_else(PoisonError::into_inner);
        *state == RunState::Running
    }

    fn terminate(&self) {
        *self.lock() = RunState::Terminated;
    }
}

/// Result of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub id: RunId,
    /// Number of samples the run emitted
    pub samples: u64,
}

/// Snapshot of the active run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunInfo {
    pub id: RunId,
    pub params: SimulationParameters,
    pub regime: DampingRegime,
    pub state: RunState,
}

/// One active sampling loop. Owned by the [`RunManager`].
pub(crate) struct RunHandle {
    id: RunId,
    params: SimulationParameters,
    regime: DampingRegime,
    control: Arc<RunControl>,
    thread: JoinHandle<RunSummary>,
}

impl RunHandle {
    fn state(&self) -> RunState {
        self.control.state()
    }

    fn info(&self) -> RunInfo {
        RunInfo {
            id: self.id,
            params: self.params,
            regime: self.regime,
            state: self.state(),
        }
    }

    /// Deliver the next run's init event and cancel this run in one step
    fn supersede(&self, init: &RunEvent, sink: &dyn Sink) {
        let mut state = self.control.lock();
        sink.deliver(init);
        RunControl::begin_cancel(&mut state);
        drop(state);
        self.control.wake.notify_all();
    }

    /// Wait for the loop's thread to exit
    fn join(self) -> Option<RunSummary> {
        let id = self.id;
        match self.thread.join() {
            Ok(summary) => {
                debug!(run = %id, samples = summary.samples, "run terminated");
                Some(summary)
            }
            Err(_) => {
                self.control.terminate();
                error!(run = %id, "sampling loop panicked");
                None
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to spawn sampling thread: {0}")]
    Spawn(#[from] std::io::Error),
}

struct Slot {
    next_id: u64,
    current: Option<RunHandle>,
}

/// Owns the single run slot. Construct one per independent simulation.
pub struct RunManager {
    config: RunConfig,
    slot: Mutex<Slot>,
}

impl RunManager {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            slot: Mutex::new(Slot {
                next_id: 1,
                current: None,
            }),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a run for `params`, superseding the current one.
    ///
    /// The init event reaches `sink` before anything else happens. The
    /// prior run is then cancelled and joined, so this call may block for
    /// up to one tick. Parameters must already be validated.
    pub fn request_simulation(
        &self,
        params: SimulationParameters,
        limits: Limits,
        sink: Arc<dyn Sink>,
    ) -> Result<RunId, RunError> {
        let mut slot = self.lock();
        let id = RunId(slot.next_id);
        slot.next_id += 1;

        let init = RunEvent::Init(InitEvent {
            run: id,
            params,
            limits,
        });

        match slot.current.take() {
            Some(prior) => {
                prior.supersede(&init, sink.as_ref());
                info!(prior = %prior.id, run = %id, "superseding active run");
                prior.join();
            }
            None => sink.deliver(&init),
        }

        let handle = self.spawn(id, params, sink)?;
        info!(
            run = %id,
            mass = params.mass,
            spring_constant = params.spring_constant,
            initial_displacement = params.initial_displacement,
            damping = params.damping,
            regime = ?handle.regime,
            "run started"
        );
        slot.current = Some(handle);
        Ok(id)
    }

    /// Stop the current run, if any, and wait for it to exit
    pub fn cancel(&self) -> Option<RunSummary> {
        let mut slot = self.lock();
        let handle = slot.current.take()?;
        handle.control.cancel();
        info!(run = %handle.id, "run cancelled");
        handle.join()
    }

    pub fn current(&self) -> Option<RunInfo> {
        self.lock().current.as_ref().map(RunHandle::info)
    }

    fn spawn(
        &self,
        id: RunId,
        params: SimulationParameters,
        sink: Arc<dyn Sink>,
    ) -> Result<RunHandle, RunError> {
        let trajectory = Trajectory::new(&params);
        let control = Arc::new(RunControl::new());
        let loop_control = Arc::clone(&control);
        let config = self.config;

        let thread = thread::Builder::new()
            .name(format!("springsim-run-{}", id))
            .spawn(move || sampling_loop(id, trajectory, config, &loop_control, sink.as_ref()))?;

        Ok(RunHandle {
            id,
            params,
            regime: trajectory.regime(),
            control,
            thread,
        })
    }
}

impl Drop for RunManager {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Emit one sample per tick until cancelled. Time is tick-counted, so the
/// trajectory does not depend on scheduling jitter.
fn sampling_loop(
    id: RunId,
    trajectory: Trajectory,
    config: RunConfig,
    control: &RunControl,
    sink: &dyn Sink,
) -> RunSummary {
    let step = config.time_step();
    let mut tick: u64 = 0;

    loop {
        let time = tick as f64 * step;
        let sample = RunEvent::Sample(Sample {
            run: id,
            time,
            displacement: trajectory.displacement(time),
        });

        if !control.emit_if_running(sink, &sample) {
            break;
        }
        tick += 1;

        if !control.wait_tick(config.tick_interval) {
            control.terminate();
            break;
        }
    }

    RunSummary { id, samples: tick }
}
