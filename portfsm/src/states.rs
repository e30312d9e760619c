// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::fmt;

use thiserror::Error;

use hal::HalError;

/// The individual states a port bring-up state machine may be in.  Each
/// table uses only a subset of these; no single mode visits them all.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::EnumIter,
    strum::IntoStaticStr,
    strum::EnumCount,
)]
pub enum FsmState {
    /// One-shot hardware configuration for the selected mode
    #[default]
    Idle,
    WaitPllReady,
    WaitSignalOk,
    WaitCdrLock,
    WaitRateChangeDone,
    WaitDfeDone,
    WaitRxReady,
    WaitAutonegDone,
    /// Pick the link-training clause implied by the negotiated HCD
    SelectLtClause,
    WaitAnLtDoneCl72,
    WaitAnLtDoneCl92,
    WaitAnLtDoneCl136,
    WaitAnLtDoneCl162,
    /// Combined autoneg/link-training wait used where the hardware
    /// sequences training itself
    WaitAutonegLtDone,
    WaitTestDone,
    MonitorPrbsErrors,
    BerCheckStart,
    BerCheckDone,
    LinkDown,
    LinkUp,
    RemoteFault,
    Abort,
    Disabled,
    End,
}

impl fmt::Display for FsmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The ways a handler invocation can fail, distinguished so that every
/// abnormal transition can be logged with its outcome class.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// A hardware access underneath the handler failed
    #[error("hardware access failed: {}", .0)]
    Hardware(#[from] HalError),
    /// The handler observed a value the protocol does not allow
    #[error("protocol error: {}", .0)]
    Protocol(String),
    /// The state exceeded its time-in-state budget
    #[error("timed out after {cycles} cycles")]
    Timeout { cycles: u32 },
    /// The state's descriptor has no handler bound
    #[error("no handler bound")]
    Unhandled,
}

impl HandlerError {
    /// A short classification used as a structured logging field.
    pub fn class(&self) -> &'static str {
        match self {
            HandlerError::Hardware(_) => "hardware",
            HandlerError::Protocol(_) => "protocol",
            HandlerError::Timeout { .. } => "timeout",
            HandlerError::Unhandled => "unhandled",
        }
    }
}

/// The outcome of one handler invocation: the only channel between a
/// handler and the engine.  `Alt2` and `Alt3` are named alternate
/// *successful* outcomes (e.g. "partner signalled remote fault" while
/// waiting for link-up); only `Error` routes down a failure path, and even
/// that is absorbed into the table's alternate transition rather than
/// surfaced to the caller.
#[derive(Debug)]
pub enum HandlerResult {
    /// The step completed; take the primary transition
    Success,
    /// The step has not completed yet; stay and poll again
    NotReady,
    /// First protocol-specific alternate outcome
    Alt2,
    /// Second protocol-specific alternate outcome
    Alt3,
    /// The step failed; take the alternate (error) transition
    Error(HandlerError),
}

impl HandlerResult {
    /// A short classification used as a structured logging field.
    pub fn class(&self) -> &'static str {
        match self {
            HandlerResult::Success => "success",
            HandlerResult::NotReady => "not-ready",
            HandlerResult::Alt2 => "alt2",
            HandlerResult::Alt3 => "alt3",
            HandlerResult::Error(e) => e.class(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FsmState;
    use strum::IntoEnumIterator;

    #[test]
    fn test_display_matches_static_str() {
        for state in FsmState::iter() {
            let s: &'static str = state.into();
            assert_eq!(state.to_string(), s);
        }
    }
}
