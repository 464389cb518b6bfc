//! Shared test infrastructure for episodic integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use episodic::{DeviceError, Phase, PhaseDevice};
use std::sync::{Arc, Mutex};
use std::time::Instant;

// ============================================================================
// Recording Device
// ============================================================================

/// One recorded device write with its wall-clock timestamp.
#[derive(Debug, Clone, Copy)]
pub struct PhaseEvent {
    pub phase: Phase,
    pub at: Instant,
}

/// Handle onto a [`RecordingDevice`]'s write log.
///
/// The device itself moves into the controller's worker thread, so tests
/// observe it through a clone of this handle.
#[derive(Clone)]
pub struct PhaseRecorder(Arc<Mutex<Vec<PhaseEvent>>>);

impl PhaseRecorder {
    pub fn events(&self) -> Vec<PhaseEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.events().iter().map(|event| event.phase).collect()
    }

    pub fn last_phase(&self) -> Option<Phase> {
        self.events().last().map(|event| event.phase)
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn count(&self, phase: Phase) -> usize {
        self.phases().iter().filter(|p| **p == phase).count()
    }
}

/// Mock device that records every phase write with a timestamp.
pub struct RecordingDevice {
    recorder: PhaseRecorder,
}

impl RecordingDevice {
    /// Creates a device and the recorder handle used to inspect its writes.
    pub fn new() -> (Self, PhaseRecorder) {
        let recorder = PhaseRecorder(Arc::new(Mutex::new(Vec::new())));
        (
            Self {
                recorder: recorder.clone(),
            },
            recorder,
        )
    }

    fn record(&mut self, phase: Phase) -> Result<(), DeviceError> {
        self.recorder.0.lock().unwrap().push(PhaseEvent {
            phase,
            at: Instant::now(),
        });
        Ok(())
    }
}

impl PhaseDevice for RecordingDevice {
    fn apply_on(&mut self) -> Result<(), DeviceError> {
        self.record(Phase::On)
    }

    fn apply_off(&mut self) -> Result<(), DeviceError> {
        self.record(Phase::Off)
    }
}

// ============================================================================
// Assertions
// ============================================================================

/// True if `phases` opens with ON and strictly alternates from there.
pub fn alternates_from_on(phases: &[Phase]) -> bool {
    phases.iter().enumerate().all(|(i, phase)| {
        let expected = if i % 2 == 0 { Phase::On } else { Phase::Off };
        *phase == expected
    })
}
