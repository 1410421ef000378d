#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Garage door control logic (hardware-agnostic).
//!
//! All pin access goes through `garage_traits::Gpio`, all durable state
//! through `garage_traits::StateStore`, all time through
//! `garage_traits::Clock`.
//!
//! ## Architecture
//!
//! - **State**: `DoorState` / `TargetState` and their persisted codes (`state`)
//! - **Signals**: total level/JSON to position mappings (`signal`)
//! - **Pulse driver**: one relay press on the shared output (`pulse`)
//! - **Persistence**: restart record over a key/value store (`store`)
//! - **Timers**: five named, cancellable deadlines (`timers`)
//! - **Controller**: the state machine (`controller`)
//! - **Runtime**: single-threaded event loop and `DoorHandle` (`runtime`)
//! - **Adapters**: input pin (`input`) and HTTP webhook (`webhook`)

pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod input;
pub mod mocks;
pub mod pulse;
pub mod runtime;
pub mod signal;
pub mod state;
pub mod status;
pub mod store;
pub mod timers;
pub mod webhook;

pub use config::{AutoCloseCfg, DoorCfg, InputCfg, WebhookCfg};
pub use controller::DoorController;
pub use error::{GarageError, WebhookError};
pub use runtime::{DoorHandle, Event, Runtime};
pub use state::{DoorState, DoorStatus, TargetState};
pub use status::{CommandOutcome, LogSink, StatusSink, StatusUpdate};
pub use store::{FileStore, MemoryStore, PersistedRecord, Persistence};
pub use timers::{TimerKind, TimerSet};
pub use webhook::{WebhookFilter, WebhookServer};
