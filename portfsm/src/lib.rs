// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! The table-driven state machine engine that sequences hardware link
//! bring-up for the switch's ports.
//!
//! Bringing a link up means walking the hardware through a series of steps
//! (lane configuration, PLL settle, signal detect, receive-equalization
//! adaptation, optionally autonegotiation and link training) where each step
//! can take anywhere from microseconds to many seconds to complete.  Rather
//! than blocking in the driver while one port finishes, each port's
//! state machine is advanced one step at a time by [`StateTable::run`],
//! which returns how long the caller should wait before the next step.  An
//! external scheduler interleaves those steps across every active port, so
//! hundreds of ports bring up concurrently on a handful of threads.
//!
//! The per-mode tables (DFE, autoneg, PRBS, the loopback variants,
//! transmit-only, emulator) are registered per ASIC family in
//! [`tables::FsmTables`]; all of them drive the hardware exclusively through
//! the `hal::LinkOps` trait.

use std::collections::BTreeMap;

use thiserror::Error;

use hal::PortHdl;

mod context;
mod engine;
mod mode;
mod states;
pub mod tables;

pub use context::LinkConfig;
pub use context::LinkState;
pub use context::PortContext;
pub use engine::Handler;
pub use engine::PortFsmCursor;
pub use engine::StateDescriptor;
pub use engine::StateTable;
pub use engine::Tick;
pub use engine::TransitionFn;
pub use mode::AsicFamily;
pub use mode::Mode;
pub use states::FsmState;
pub use states::HandlerError;
pub use states::HandlerResult;
pub use tables::select_table;

#[cfg(test)]
pub(crate) mod testutil;

/// A specialized Result type for state machine operations
pub type FsmResult<T> = Result<T, FsmError>;

/// Errors surfaced to the caller of the engine.  Handler and timeout
/// failures are never reported this way; they are routed through each
/// table's alternate transitions instead.
#[derive(Error, Debug)]
pub enum FsmError {
    /// The port is not a live, allocated port.  No hardware was touched.
    #[error("no such port: {}", .0)]
    NoSuchPort(PortHdl),
    /// The named state is not an entry in this table.  Indicates
    /// misbehavior from the caller.
    #[error("state {state} is not in table {table}")]
    NoSuchState { table: String, state: FsmState },
    /// The engine detected an inconsistency in a table's construction.
    #[error("Internal error: {}", .0)]
    Internal(String),
}

/// Counters reflecting how many times each state has been entered, kept
/// per port so link-up failures can be diagnosed after the fact.
#[derive(Clone, Debug, Default)]
pub struct FsmStats(BTreeMap<FsmState, u32>);

impl FsmStats {
    /// Return an empty set of counters.
    pub fn new() -> Self {
        FsmStats(BTreeMap::new())
    }

    /// Returns the counter for a single state.
    pub fn get(&self, state: FsmState) -> u32 {
        *self.0.get(&state).unwrap_or(&0)
    }

    /// Increases the counter for a single state by 1.
    pub fn bump(&mut self, state: FsmState) {
        self.0
            .entry(state)
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    /// Returns all of the states entered at least once, giving the caller
    /// an easy way to iterate over the population.
    pub fn states(&self) -> Vec<FsmState> {
        self.0.keys().cloned().collect()
    }

    /// Discard all counts.
    pub fn clear(&mut self) {
        self.0.clear();
    }
}
