//! Door position types and their persisted codes.
//!
//! Codes follow the HomeKit characteristic values so a record written by a
//! bridge-facing deployment reads back unchanged: current OPEN=0, CLOSED=1,
//! OPENING=2, CLOSING=3; target OPEN=0, CLOSED=1.

use std::fmt;
use std::str::FromStr;

/// Believed physical position right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoorState {
    Open,
    Closed,
    Opening,
    Closing,
}

impl DoorState {
    pub const fn code(self) -> u8 {
        match self {
            DoorState::Open => 0,
            DoorState::Closed => 1,
            DoorState::Opening => 2,
            DoorState::Closing => 3,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DoorState::Open),
            1 => Some(DoorState::Closed),
            2 => Some(DoorState::Opening),
            3 => Some(DoorState::Closing),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DoorState::Open => "open",
            DoorState::Closed => "closed",
            DoorState::Opening => "opening",
            DoorState::Closing => "closing",
        }
    }
}

/// Desired end position; never transitional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    Open,
    Closed,
}

impl TargetState {
    pub const fn code(self) -> u8 {
        match self {
            TargetState::Open => 0,
            TargetState::Closed => 1,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(TargetState::Open),
            1 => Some(TargetState::Closed),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TargetState::Open => "open",
            TargetState::Closed => "closed",
        }
    }
}

impl From<TargetState> for DoorState {
    fn from(t: TargetState) -> Self {
        match t {
            TargetState::Open => DoorState::Open,
            TargetState::Closed => DoorState::Closed,
        }
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown door command {0:?} (expected open or close)")]
pub struct ParseTargetError(pub String);

impl FromStr for TargetState {
    type Err = ParseTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(TargetState::Open),
            "close" | "closed" => Ok(TargetState::Closed),
            other => Err(ParseTargetError(other.to_string())),
        }
    }
}

/// Snapshot of everything the host can read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorStatus {
    pub current: DoorState,
    pub target: TargetState,
    pub obstruction: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        for s in [
            DoorState::Open,
            DoorState::Closed,
            DoorState::Opening,
            DoorState::Closing,
        ] {
            assert_eq!(DoorState::from_code(s.code()), Some(s));
        }
        assert_eq!(DoorState::from_code(4), None);
        assert_eq!(TargetState::from_code(TargetState::Closed.code()), Some(TargetState::Closed));
        assert_eq!(TargetState::from_code(2), None);
        // Stable positions share codes across the two enums
        assert_eq!(DoorState::from(TargetState::Open).code(), TargetState::Open.code());
        assert_eq!(DoorState::from(TargetState::Closed).code(), TargetState::Closed.code());
    }

    #[test]
    fn parses_commands() {
        assert_eq!("open".parse::<TargetState>(), Ok(TargetState::Open));
        assert_eq!(" Close\n".parse::<TargetState>(), Ok(TargetState::Closed));
        assert_eq!("closed".parse::<TargetState>(), Ok(TargetState::Closed));
        assert!("stop".parse::<TargetState>().is_err());
    }
}
