//! In-memory GPIO backend.
//!
//! Used by the default (non-`hardware`) build and by tests. Clones share the
//! same pin table, so a test can keep one handle for inspection while the
//! controller owns the other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use garage_traits::{BoxError, EdgeWatch, Gpio, LevelCallback};
use tracing::trace;

use crate::error::HwError;

/// A single recorded output write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinWrite {
    pub pin: u8,
    pub high: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line {
    Output(bool),
    Input(bool),
}

#[derive(Default)]
struct SimState {
    lines: HashMap<u8, Line>,
    // Levels driven on input lines before (or without) setup_input
    driven: HashMap<u8, bool>,
    writes: Vec<PinWrite>,
    watchers: Vec<(u8, LevelCallback)>,
    fail_writes: bool,
}

#[derive(Clone, Default)]
pub struct SimulatedGpio {
    state: Arc<Mutex<SimState>>,
}

impl std::fmt::Debug for SimulatedGpio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.lock();
        f.debug_struct("SimulatedGpio")
            .field("lines", &st.lines)
            .field("writes", &st.writes.len())
            .finish()
    }
}

impl SimulatedGpio {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panicking test thread must not hide the pin table from the others
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Drive an input line to `high` and notify watchers of that pin when the
    /// level changed.
    pub fn set_input(&self, pin: u8, high: bool) {
        let mut st = self.lock();
        let previous = match st.lines.get(&pin) {
            Some(Line::Input(level)) => Some(*level),
            _ => st.driven.get(&pin).copied(),
        };
        st.driven.insert(pin, high);
        if let Some(Line::Input(level)) = st.lines.get_mut(&pin) {
            *level = high;
        }
        if previous == Some(high) {
            return;
        }
        trace!(pin, high, "sim input edge");
        for (watched, cb) in st.watchers.iter_mut() {
            if *watched == pin {
                cb(pin, high);
            }
        }
    }

    /// Current level of an output line, None when the pin is not an output.
    pub fn output_level(&self, pin: u8) -> Option<bool> {
        match self.lock().lines.get(&pin) {
            Some(Line::Output(level)) => Some(*level),
            _ => None,
        }
    }

    pub fn writes(&self) -> Vec<PinWrite> {
        self.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    /// Number of writes that drove `pin` to its active level.
    pub fn pulses_on(&self, pin: u8, active_high: bool) -> usize {
        self.lock()
            .writes
            .iter()
            .filter(|w| w.pin == pin && w.high == active_high)
            .count()
    }

    /// Make every subsequent write fail (the level is left unchanged).
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }
}

impl Gpio for SimulatedGpio {
    fn setup_output(&mut self, pin: u8, initial_high: bool) -> Result<(), BoxError> {
        let mut st = self.lock();
        if let Some(Line::Input(_)) = st.lines.get(&pin) {
            return Err(Box::new(HwError::WrongDirection {
                pin,
                wanted: "output",
                actual: "input",
            }));
        }
        st.lines.insert(pin, Line::Output(initial_high));
        trace!(pin, initial_high, "sim output configured");
        Ok(())
    }

    fn setup_input(&mut self, pin: u8) -> Result<(), BoxError> {
        let mut st = self.lock();
        match st.lines.get(&pin) {
            Some(Line::Output(_)) => Err(Box::new(HwError::WrongDirection {
                pin,
                wanted: "input",
                actual: "output",
            })),
            Some(Line::Input(_)) => Ok(()),
            None => {
                let level = st.driven.get(&pin).copied().unwrap_or(false);
                st.lines.insert(pin, Line::Input(level));
                trace!(pin, level, "sim input configured");
                Ok(())
            }
        }
    }

    fn write(&mut self, pin: u8, high: bool) -> Result<(), BoxError> {
        let mut st = self.lock();
        if st.fail_writes {
            return Err(Box::new(HwError::InjectedFault(pin)));
        }
        match st.lines.get_mut(&pin) {
            Some(Line::Output(level)) => *level = high,
            Some(Line::Input(_)) => {
                return Err(Box::new(HwError::WrongDirection {
                    pin,
                    wanted: "output",
                    actual: "input",
                }));
            }
            None => return Err(Box::new(HwError::Unconfigured(pin))),
        }
        st.writes.push(PinWrite { pin, high });
        Ok(())
    }

    fn read(&mut self, pin: u8) -> Result<bool, BoxError> {
        match self.lock().lines.get(&pin) {
            Some(Line::Input(level)) | Some(Line::Output(level)) => Ok(*level),
            None => Err(Box::new(HwError::Unconfigured(pin))),
        }
    }
}

impl EdgeWatch for SimulatedGpio {
    fn watch_input(&mut self, pin: u8, on_change: LevelCallback) -> Result<(), BoxError> {
        let mut st = self.lock();
        if !matches!(st.lines.get(&pin), Some(Line::Input(_))) {
            return Err(Box::new(HwError::Unconfigured(pin)));
        }
        st.watchers.push((pin, on_change));
        Ok(())
    }
}
