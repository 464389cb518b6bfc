//! Episodic ON/OFF cycling controller with a dedicated worker thread.
//!
//! Provides [`EpisodicController`] which drives a single output device through
//! repeated ON/OFF phase pairs for as long as an episode is active, handling
//! episode start/stop, cadence changes and shutdown from other threads. Also
//! defines the [`PhaseDevice`] trait for hardware abstraction.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Trait for abstracting two-state output hardware.
///
/// Implement this for your device (GPIO buzzer, LCD backlight, relay, etc.)
/// to allow a controller to cycle it. The controller invokes both methods
/// from its worker thread only and never concurrently, so implementations
/// need no internal locking. Both methods must be safe to call repeatedly,
/// including twice in a row with the same phase.
pub trait PhaseDevice {
    /// Puts the device into its ON state.
    fn apply_on(&mut self) -> Result<(), DeviceError>;

    /// Puts the device into its OFF state.
    fn apply_off(&mut self) -> Result<(), DeviceError>;
}

/// A failed hardware write reported by a [`PhaseDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceError {
    message: String,
}

impl DeviceError {
    /// Creates a device error from a description of the failed write.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the failure description.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl core::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "device write failed: {}", self.message)
    }
}

impl std::error::Error for DeviceError {}

/// The commanded state of the device during an active episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Device is in its OFF state.
    Off,
    /// Device is in its ON state.
    On,
}

impl Phase {
    /// Returns the opposite phase.
    pub fn toggled(self) -> Self {
        match self {
            Phase::Off => Phase::On,
            Phase::On => Phase::Off,
        }
    }
}

/// Whether an episode is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No episode active. Device is off and the worker is parked.
    Suspended,
    /// Episode active. The worker is alternating the device ON and OFF.
    Running,
}

/// Controller shutdown progress. Internal to the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Alive,
    TerminationRequested,
    Terminated,
}

/// Errors that can occur during controller operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// `start_clean` was called more than once.
    AlreadyStarted,
    /// A control method was called after `terminate` returned.
    AlreadyTerminated,
    /// A zero half-cycle duration was supplied.
    InvalidDuration,
    /// A device write failed during a previous phase transition.
    ///
    /// Reported by the first control call after the failed write. The worker
    /// keeps cycling after a fault; a single failed write does not end the
    /// episode.
    Device(DeviceError),
}

impl core::fmt::Display for ControllerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ControllerError::AlreadyStarted => {
                write!(f, "controller worker was already started")
            }
            ControllerError::AlreadyTerminated => {
                write!(f, "controller has been terminated")
            }
            ControllerError::InvalidDuration => {
                write!(f, "half-cycle duration must be greater than zero")
            }
            ControllerError::Device(fault) => write!(f, "{}", fault),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<DeviceError> for ControllerError {
    fn from(fault: DeviceError) -> Self {
        ControllerError::Device(fault)
    }
}

/// State shared between the controlling thread(s) and the worker.
///
/// Everything the two sides exchange lives under the one mutex of [`Shared`];
/// there are no uncoordinated flags, so the worker can never observe a
/// suspend and an interrupt out of order.
struct ControlState {
    run: RunState,
    lifecycle: Lifecycle,
    phase: Phase,
    half_cycle: Duration,
    /// True while the worker sits in its between-episodes wait (or has not
    /// been spawned yet) with the device settled OFF.
    parked: bool,
    /// Most recent unreported device fault.
    fault: Option<DeviceError>,
}

/// The single monitor guarding [`ControlState`].
struct Shared {
    monitor: Mutex<ControlState>,
    signal: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ControlState> {
        // A poisoned monitor only means a panicking thread held it; the
        // state itself is always consistent between mutations.
        self.monitor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, ControlState>) -> MutexGuard<'a, ControlState> {
        self.signal
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_timeout<'a>(
        &self,
        guard: MutexGuard<'a, ControlState>,
        timeout: Duration,
    ) -> MutexGuard<'a, ControlState> {
        self.signal
            .wait_timeout(guard, timeout)
            .map(|(guard, _)| guard)
            .unwrap_or_else(|poisoned| poisoned.into_inner().0)
    }
}

/// Cycles a single output device through episodic ON/OFF phases.
///
/// Each controller owns a device and a dedicated worker thread. Between
/// episodes the worker is parked; while an episode is active it alternates
/// the device ON and OFF, spending one half-cycle in each phase. Episodes
/// always begin with an ON phase, and the device is guaranteed OFF whenever
/// no episode is active.
///
/// The control surface is safe to drive from a different thread than the
/// constructing one; all control methods synchronize on a single internal
/// monitor. Call [`start_clean`](Self::start_clean) once to launch the
/// (initially parked) worker, then [`begin_episode`](Self::begin_episode) and
/// [`end_episode`](Self::end_episode) any number of times, and finally
/// [`terminate`](Self::terminate) before disposing of the controller.
/// Dropping a controller without terminating it shuts the worker down as a
/// fallback.
///
/// # Type Parameters
/// * `D` - Device implementation type
pub struct EpisodicController<D: PhaseDevice> {
    shared: Arc<Shared>,
    device: Option<D>,
    worker: Option<JoinHandle<()>>,
}

impl<D: PhaseDevice> EpisodicController<D> {
    /// Creates a suspended controller bound to `device`.
    ///
    /// The worker thread is not spawned until [`start_clean`](Self::start_clean).
    ///
    /// # Errors
    /// Returns [`ControllerError::InvalidDuration`] if `half_cycle` is zero.
    pub fn new(half_cycle: Duration, device: D) -> Result<Self, ControllerError> {
        if half_cycle.is_zero() {
            return Err(ControllerError::InvalidDuration);
        }

        Ok(Self {
            shared: Arc::new(Shared {
                monitor: Mutex::new(ControlState {
                    run: RunState::Suspended,
                    lifecycle: Lifecycle::Alive,
                    phase: Phase::Off,
                    half_cycle,
                    parked: true,
                    fault: None,
                }),
                signal: Condvar::new(),
            }),
            device: Some(device),
            worker: None,
        })
    }

    /// Begins an episode.
    ///
    /// The worker wakes and starts the phase loop with an ON phase. Returns
    /// immediately; the ON write happens asynchronously on the worker thread.
    /// A no-op if an episode is already active.
    ///
    /// # Errors
    /// * [`ControllerError::AlreadyTerminated`] - Controller was terminated
    /// * [`ControllerError::Device`] - A device write failed since the last control call
    pub fn begin_episode(&mut self) -> Result<(), ControllerError> {
        let mut state = self.lock_alive()?;

        if state.run != RunState::Running {
            state.run = RunState::Running;
            self.shared.signal.notify_all();
        }

        Self::take_fault(&mut state)
    }

    /// Ends the active episode.
    ///
    /// Interrupts the worker even mid-sleep (it does not finish the current
    /// half-cycle) and blocks until the device has settled OFF and the worker
    /// has parked. The wait is bounded by signal latency plus one device
    /// write, never by the half-cycle duration. A no-op if no episode is
    /// active.
    ///
    /// # Errors
    /// * [`ControllerError::AlreadyTerminated`] - Controller was terminated
    /// * [`ControllerError::Device`] - A device write failed since the last control call
    pub fn end_episode(&mut self) -> Result<(), ControllerError> {
        let mut state = self.lock_alive()?;

        if state.run != RunState::Suspended {
            state.run = RunState::Suspended;
            self.shared.signal.notify_all();
        }

        // Wait for the worker to settle the device OFF and park. Also
        // satisfied trivially when the worker was never started, and
        // abandoned if a concurrent terminate wins the race.
        while !state.parked && state.lifecycle == Lifecycle::Alive {
            state = self.shared.wait(state);
        }

        Self::take_fault(&mut state)
    }

    /// Sets the half-cycle duration.
    ///
    /// Takes effect at the next phase boundary; a sleep already in progress
    /// keeps its original deadline and is not re-armed.
    ///
    /// # Errors
    /// * [`ControllerError::InvalidDuration`] - `half_cycle` is zero
    /// * [`ControllerError::AlreadyTerminated`] - Controller was terminated
    /// * [`ControllerError::Device`] - A device write failed since the last control call
    pub fn set_half_cycle(&mut self, half_cycle: Duration) -> Result<(), ControllerError> {
        if half_cycle.is_zero() {
            return Err(ControllerError::InvalidDuration);
        }

        let mut state = self.lock_alive()?;
        state.half_cycle = half_cycle;

        Self::take_fault(&mut state)
    }

    /// Shuts the controller down permanently.
    ///
    /// Wakes the worker from either suspension point (parked or mid-sleep),
    /// blocks until it has settled the device OFF and exited, then marks the
    /// controller terminated. Safe to call whether or not an episode is
    /// active, and whether or not the worker was ever started. Any control
    /// call after this returns signals
    /// [`ControllerError::AlreadyTerminated`], including a second terminate.
    pub fn terminate(&mut self) -> Result<(), ControllerError> {
        let mut state = self.lock_alive()?;
        state.lifecycle = Lifecycle::TerminationRequested;
        self.shared.signal.notify_all();
        drop(state);

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("episodic worker thread panicked");
            }
        }

        let mut state = self.shared.lock();
        state.lifecycle = Lifecycle::Terminated;
        // Release any end_episode caller still blocked on the monitor.
        self.shared.signal.notify_all();

        Self::take_fault(&mut state)
    }

    /// Returns whether an episode is currently active.
    pub fn is_running(&self) -> bool {
        self.shared.lock().run == RunState::Running
    }

    /// Returns the current run state.
    pub fn run_state(&self) -> RunState {
        self.shared.lock().run
    }

    /// Returns the commanded phase. Meaningful only while an episode is
    /// active; always [`Phase::Off`] when suspended.
    pub fn current_phase(&self) -> Phase {
        self.shared.lock().phase
    }

    /// Returns the current half-cycle duration.
    pub fn half_cycle(&self) -> Duration {
        self.shared.lock().half_cycle
    }

    /// Locks the monitor, failing if the controller is shut down.
    fn lock_alive(&self) -> Result<MutexGuard<'_, ControlState>, ControllerError> {
        let state = self.shared.lock();
        if state.lifecycle != Lifecycle::Alive {
            return Err(ControllerError::AlreadyTerminated);
        }
        Ok(state)
    }

    /// Reports and clears a fault recorded by the worker, if any.
    fn take_fault(state: &mut ControlState) -> Result<(), ControllerError> {
        match state.fault.take() {
            Some(fault) => Err(ControllerError::Device(fault)),
            None => Ok(()),
        }
    }
}

impl<D: PhaseDevice + Send + 'static> EpisodicController<D> {
    /// Spawns the worker thread, parked and ready to run episodes.
    ///
    /// Resets the run state to suspended first, so the worker always starts
    /// clean regardless of control calls made before this one. May be called
    /// exactly once.
    ///
    /// # Errors
    /// * [`ControllerError::AlreadyStarted`] - The worker was already spawned
    /// * [`ControllerError::AlreadyTerminated`] - Controller was terminated
    pub fn start_clean(&mut self) -> Result<(), ControllerError> {
        let mut state = self.lock_alive()?;
        if self.worker.is_some() {
            return Err(ControllerError::AlreadyStarted);
        }

        state.run = RunState::Suspended;
        state.phase = Phase::Off;
        state.parked = true;
        drop(state);

        let shared = Arc::clone(&self.shared);
        let device = self.device.take().ok_or(ControllerError::AlreadyStarted)?;
        self.worker = Some(thread::spawn(move || worker_loop(shared, device)));

        Ok(())
    }
}

impl<D: PhaseDevice> Drop for EpisodicController<D> {
    fn drop(&mut self) {
        // Fallback for callers that forget to terminate; never leak the worker.
        if self.worker.is_some() {
            let _ = self.terminate();
        }
    }
}

/// The worker's phase loop.
///
/// Parks between episodes, alternates the device ON/OFF during one, and
/// settles the device OFF before parking again or exiting. The monitor is
/// released around every device write so control calls are never blocked by
/// slow hardware.
fn worker_loop<D: PhaseDevice>(shared: Arc<Shared>, mut device: D) {
    let mut state = shared.lock();

    loop {
        // Park until an episode begins or shutdown is requested.
        while state.run == RunState::Suspended && state.lifecycle == Lifecycle::Alive {
            state = shared.wait(state);
        }
        if state.lifecycle != Lifecycle::Alive {
            break;
        }
        state.parked = false;

        // Phase loop. The phase is Off on entry, so the episode opens ON.
        while state.run == RunState::Running && state.lifecycle == Lifecycle::Alive {
            let phase = state.phase.toggled();
            state.phase = phase;
            let half_cycle = state.half_cycle;
            drop(state);

            let written = match phase {
                Phase::On => device.apply_on(),
                Phase::Off => device.apply_off(),
            };

            state = shared.lock();
            if let Err(fault) = written {
                log::warn!("{:?} phase write failed: {}", phase, fault.message());
                state.fault = Some(fault);
            }

            // Interruptible half-cycle sleep: wakes early on any state
            // change, re-checks the deadline on spurious wakeups.
            let deadline = Instant::now() + half_cycle;
            while state.run == RunState::Running && state.lifecycle == Lifecycle::Alive {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                state = shared.wait_timeout(state, deadline - now);
            }
        }

        // Settle OFF if the episode was interrupted mid-ON-phase.
        if state.phase == Phase::On {
            drop(state);
            let written = device.apply_off();
            state = shared.lock();
            state.phase = Phase::Off;
            if let Err(fault) = written {
                log::warn!("settling OFF write failed: {}", fault.message());
                state.fault = Some(fault);
            }
        }

        if state.lifecycle != Lifecycle::Alive {
            break;
        }
        state.parked = true;
        shared.signal.notify_all();
    }

    // Exiting; release anyone blocked on the park flag.
    state.parked = true;
    shared.signal.notify_all();
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Shared phase log written by [`MockDevice`] from the worker thread.
    #[derive(Clone, Default)]
    struct PhaseLog(Arc<Mutex<Vec<Phase>>>);

    impl PhaseLog {
        fn phases(&self) -> Vec<Phase> {
            self.0.lock().unwrap().clone()
        }

        fn last(&self) -> Option<Phase> {
            self.0.lock().unwrap().last().copied()
        }

        fn count(&self, phase: Phase) -> usize {
            self.0.lock().unwrap().iter().filter(|p| **p == phase).count()
        }
    }

    /// Mock device that records every phase write.
    struct MockDevice {
        log: PhaseLog,
        fail_on: Option<Phase>,
    }

    impl MockDevice {
        fn new(log: PhaseLog) -> Self {
            Self { log, fail_on: None }
        }

        fn failing_on(log: PhaseLog, phase: Phase) -> Self {
            Self {
                log,
                fail_on: Some(phase),
            }
        }

        fn write(&mut self, phase: Phase) -> Result<(), DeviceError> {
            self.log.0.lock().unwrap().push(phase);
            if self.fail_on == Some(phase) {
                return Err(DeviceError::new("injected fault"));
            }
            Ok(())
        }
    }

    impl PhaseDevice for MockDevice {
        fn apply_on(&mut self) -> Result<(), DeviceError> {
            self.write(Phase::On)
        }

        fn apply_off(&mut self) -> Result<(), DeviceError> {
            self.write(Phase::Off)
        }
    }

    fn started_controller(
        half_cycle: Duration,
    ) -> (EpisodicController<MockDevice>, PhaseLog) {
        let log = PhaseLog::default();
        let mut controller =
            EpisodicController::new(half_cycle, MockDevice::new(log.clone())).unwrap();
        controller.start_clean().unwrap();
        (controller, log)
    }

    fn sleep_ms(millis: u64) {
        thread::sleep(Duration::from_millis(millis));
    }

    #[test]
    fn new_rejects_zero_half_cycle() {
        let log = PhaseLog::default();
        let result = EpisodicController::new(Duration::ZERO, MockDevice::new(log));
        assert!(matches!(result, Err(ControllerError::InvalidDuration)));
    }

    #[test]
    fn set_half_cycle_rejects_zero() {
        let (mut controller, _log) = started_controller(Duration::from_millis(50));
        let result = controller.set_half_cycle(Duration::ZERO);
        assert!(matches!(result, Err(ControllerError::InvalidDuration)));
        controller.terminate().unwrap();
    }

    #[test]
    fn start_clean_is_not_reentrant() {
        let (mut controller, _log) = started_controller(Duration::from_millis(50));
        let result = controller.start_clean();
        assert!(matches!(result, Err(ControllerError::AlreadyStarted)));
        controller.terminate().unwrap();
    }

    #[test]
    fn control_calls_after_terminate_fail() {
        let (mut controller, _log) = started_controller(Duration::from_millis(50));
        controller.terminate().unwrap();

        assert!(matches!(
            controller.begin_episode(),
            Err(ControllerError::AlreadyTerminated)
        ));
        assert!(matches!(
            controller.end_episode(),
            Err(ControllerError::AlreadyTerminated)
        ));
        assert!(matches!(
            controller.set_half_cycle(Duration::from_millis(10)),
            Err(ControllerError::AlreadyTerminated)
        ));
        assert!(matches!(
            controller.start_clean(),
            Err(ControllerError::AlreadyTerminated)
        ));
        assert!(matches!(
            controller.terminate(),
            Err(ControllerError::AlreadyTerminated)
        ));
    }

    #[test]
    fn terminate_without_start_succeeds() {
        let log = PhaseLog::default();
        let mut controller =
            EpisodicController::new(Duration::from_millis(50), MockDevice::new(log.clone()))
                .unwrap();
        controller.terminate().unwrap();
        assert!(log.phases().is_empty());
    }

    #[test]
    fn suspended_worker_never_touches_device() {
        let (mut controller, log) = started_controller(Duration::from_millis(50));
        sleep_ms(120);
        assert!(log.phases().is_empty());
        assert_eq!(controller.run_state(), RunState::Suspended);
        controller.terminate().unwrap();
        assert!(log.phases().is_empty());
    }

    #[test]
    fn episode_opens_with_on_phase() {
        let (mut controller, log) = started_controller(Duration::from_millis(50));
        controller.begin_episode().unwrap();
        sleep_ms(20);
        assert_eq!(log.phases().first().copied(), Some(Phase::On));
        controller.terminate().unwrap();
    }

    #[test]
    fn end_episode_settles_device_off() {
        let (mut controller, log) = started_controller(Duration::from_millis(30));
        controller.begin_episode().unwrap();
        sleep_ms(100);
        controller.end_episode().unwrap();
        assert_eq!(log.last(), Some(Phase::Off));
        assert_eq!(controller.current_phase(), Phase::Off);
        controller.terminate().unwrap();
    }

    #[test]
    fn begin_episode_is_idempotent() {
        let (mut controller, log) = started_controller(Duration::from_millis(200));
        controller.begin_episode().unwrap();
        controller.begin_episode().unwrap();
        sleep_ms(80);
        assert_eq!(log.count(Phase::On), 1);
        controller.terminate().unwrap();
    }

    #[test]
    fn end_episode_is_idempotent() {
        let (mut controller, log) = started_controller(Duration::from_millis(30));
        controller.begin_episode().unwrap();
        sleep_ms(50);
        controller.end_episode().unwrap();
        let settled = log.phases().len();
        controller.end_episode().unwrap();
        assert_eq!(log.phases().len(), settled);
        controller.terminate().unwrap();
    }

    #[test]
    fn end_episode_interrupts_sleep_promptly() {
        let (mut controller, log) = started_controller(Duration::from_secs(10));
        controller.begin_episode().unwrap();
        sleep_ms(30);

        let before = Instant::now();
        controller.end_episode().unwrap();
        assert!(before.elapsed() < Duration::from_millis(100));
        assert_eq!(log.last(), Some(Phase::Off));
        controller.terminate().unwrap();
    }

    #[test]
    fn terminate_while_running_settles_off() {
        let (mut controller, log) = started_controller(Duration::from_secs(10));
        controller.begin_episode().unwrap();
        sleep_ms(30);

        let before = Instant::now();
        controller.terminate().unwrap();
        assert!(before.elapsed() < Duration::from_millis(100));
        assert_eq!(log.last(), Some(Phase::Off));
    }

    #[test]
    fn device_fault_reported_on_next_control_call_and_worker_survives() {
        let log = PhaseLog::default();
        let device = MockDevice::failing_on(log.clone(), Phase::On);
        let mut controller =
            EpisodicController::new(Duration::from_millis(20), device).unwrap();
        controller.start_clean().unwrap();

        controller.begin_episode().unwrap();
        sleep_ms(90);

        // The failed ON writes did not stop the cycling.
        assert!(log.count(Phase::On) >= 2);
        assert!(log.count(Phase::Off) >= 1);

        let result = controller.end_episode();
        assert!(matches!(result, Err(ControllerError::Device(_))));

        // Fault is cleared once reported; the stop itself still took effect.
        assert_eq!(controller.run_state(), RunState::Suspended);
        controller.terminate().unwrap();
    }

    #[test]
    fn drop_without_terminate_joins_worker() {
        let log = PhaseLog::default();
        {
            let mut controller =
                EpisodicController::new(Duration::from_secs(10), MockDevice::new(log.clone()))
                    .unwrap();
            controller.start_clean().unwrap();
            controller.begin_episode().unwrap();
            sleep_ms(30);
        }
        // Dropped mid-episode; the worker must have settled OFF and exited.
        assert_eq!(log.last(), Some(Phase::Off));
    }
}
