//! Test and helper mocks for garage_core

use std::sync::{Arc, Mutex};

use crate::status::{StatusSink, StatusUpdate};

/// Sink that keeps every update; clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    updates: Arc<Mutex<Vec<StatusUpdate>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.updates.lock().map(|u| u.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut u) = self.updates.lock() {
            u.clear();
        }
    }
}

impl StatusSink for RecordingSink {
    fn publish(&self, update: StatusUpdate) {
        if let Ok(mut u) = self.updates.lock() {
            u.push(update);
        }
    }
}
