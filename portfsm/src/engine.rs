// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! The generic engine: state descriptors, validated tables, and the
//! single-step `run` operation that advances one port by one state.

use std::fmt;

use slog::debug;
use slog::error;
use slog::info;

use crate::context::PortContext;
use crate::mode::AsicFamily;
use crate::mode::Mode;
use crate::states::FsmState;
use crate::states::HandlerError;
use crate::states::HandlerResult;
use crate::FsmError;
use crate::FsmResult;
use crate::FsmStats;

/// A state's behavior: invoked once per `run` call while the port sits in
/// that state.
pub type Handler = fn(&mut PortContext<'_>) -> HandlerResult;

/// A hook fired when a transition out of a state is accepted.  The hook may
/// override the candidate next state and wait, supporting runtime branching
/// beyond the four static alternatives (e.g. selecting a link-training
/// clause from the negotiated HCD).
pub type TransitionFn = fn(&mut PortContext<'_>, &mut FsmState, &mut u32);

/// What the caller does next: the state the port is now in and how many
/// milliseconds to wait before calling `run` again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    pub state: FsmState,
    pub wait_ms: u32,
}

/// One state's handler and branching policy.  Owned by its table and
/// immutable once the table's one-time `bind_transition` window closes.
#[derive(Clone, Debug)]
pub struct StateDescriptor {
    state: FsmState,
    handler: Option<Handler>,
    wait_ms: u32,
    /// `None` means the state may wait forever (steady-state monitors)
    timeout: Option<u32>,
    next_state: FsmState,
    next_wait_ms: u32,
    alt_state: FsmState,
    alt_wait_ms: u32,
    /// Protocol branches; when absent the error path is taken instead
    alt2: Option<(FsmState, u32)>,
    alt3: Option<(FsmState, u32)>,
    transition_fn: Option<TransitionFn>,
}

impl StateDescriptor {
    /// A descriptor whose transitions all self-loop until refined with the
    /// `on_*` builders below.
    pub fn new(state: FsmState, handler: Handler, wait_ms: u32) -> Self {
        StateDescriptor {
            state,
            handler: Some(handler),
            wait_ms,
            timeout: None,
            next_state: state,
            next_wait_ms: wait_ms,
            alt_state: state,
            alt_wait_ms: wait_ms,
            alt2: None,
            alt3: None,
            transition_fn: None,
        }
    }

    /// A descriptor with no handler bound.  Running a port in such a state
    /// yields an immediate error outcome, which keeps an uninitialized
    /// entry from looping silently.  Used for the `End` sentinel.
    pub fn unhandled(state: FsmState, wait_ms: u32) -> Self {
        let mut desc = StateDescriptor::new(state, |_| HandlerResult::Success, wait_ms);
        desc.handler = None;
        desc
    }

    /// Bound the time spent in this state: after `cycles` consecutive
    /// `NotReady` results the engine forces an error outcome.
    pub fn timeout_cycles(mut self, cycles: u32) -> Self {
        self.timeout = Some(cycles);
        self
    }

    /// Where a `Success` outcome leads.
    pub fn on_success(mut self, state: FsmState, wait_ms: u32) -> Self {
        self.next_state = state;
        self.next_wait_ms = wait_ms;
        self
    }

    /// Where errors (including forced timeouts and disable preemption)
    /// lead.
    pub fn on_error(mut self, state: FsmState, wait_ms: u32) -> Self {
        self.alt_state = state;
        self.alt_wait_ms = wait_ms;
        self
    }

    /// Where an `Alt2` outcome leads.
    pub fn on_alt2(mut self, state: FsmState, wait_ms: u32) -> Self {
        self.alt2 = Some((state, wait_ms));
        self
    }

    /// Where an `Alt3` outcome leads.
    pub fn on_alt3(mut self, state: FsmState, wait_ms: u32) -> Self {
        self.alt3 = Some((state, wait_ms));
        self
    }

    pub fn state(&self) -> FsmState {
        self.state
    }

    // The transition targets this descriptor can reach.
    pub(crate) fn targets(&self) -> Vec<FsmState> {
        let mut targets = vec![self.next_state, self.alt_state];
        if let Some((state, _)) = self.alt2 {
            targets.push(state);
        }
        if let Some((state, _)) = self.alt3 {
            targets.push(state);
        }
        targets
    }
}

/// An ordered, validated collection of descriptors for one bring-up mode on
/// one ASIC family.  Built once, then shared read-only by every port using
/// that mode.
pub struct StateTable {
    name: String,
    mode: Mode,
    family: AsicFamily,
    entries: Vec<StateDescriptor>,
}

impl fmt::Display for StateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl StateTable {
    /// Validate and construct a table.  The invariants checked here are
    /// what `run` relies on: unique entries, exactly one `End` sentinel in
    /// the final slot, exactly one `Disabled` and one `Abort`, and every
    /// transition target present in the table.
    pub fn new(
        mode: Mode,
        family: AsicFamily,
        entries: Vec<StateDescriptor>,
    ) -> FsmResult<Self> {
        let name = format!("{family}-{mode}");
        let fault = |msg: String| FsmError::Internal(format!("table {name}: {msg}"));

        if entries.is_empty() {
            return Err(fault("no entries".to_string()));
        }
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.state == entry.state) {
                return Err(fault(format!("duplicate state {}", entry.state)));
            }
        }
        for singleton in
            [FsmState::End, FsmState::Disabled, FsmState::Abort]
        {
            let count =
                entries.iter().filter(|e| e.state == singleton).count();
            if count != 1 {
                return Err(fault(format!(
                    "{count} {singleton} entries, expected exactly 1"
                )));
            }
        }
        match entries.last() {
            Some(last) if last.state == FsmState::End => (),
            _ => return Err(fault("End sentinel is not last".to_string())),
        }
        for entry in &entries {
            for target in entry.targets() {
                if !entries.iter().any(|e| e.state == target) {
                    return Err(fault(format!(
                        "state {} names absent target {target}",
                        entry.state
                    )));
                }
            }
        }

        Ok(StateTable {
            name,
            mode,
            family,
            entries,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn family(&self) -> AsicFamily {
        self.family
    }

    /// The states present in this table, in table order.
    pub fn states(&self) -> impl Iterator<Item = FsmState> + '_ {
        self.entries.iter().map(|e| e.state)
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[StateDescriptor] {
        &self.entries
    }

    /// Look up a state's descriptor.  A miss means the cursor and the
    /// table disagree, which is an internal-consistency fault distinct
    /// from legitimately returning the `End` descriptor.
    pub fn find_state(&self, state: FsmState) -> FsmResult<&StateDescriptor> {
        self.entries.iter().find(|e| e.state == state).ok_or_else(|| {
            FsmError::Internal(format!(
                "table {}: no descriptor for state {state}",
                self.name
            ))
        })
    }

    /// Install a transition hook on one state.  Must complete before any
    /// `run` call touches the state; the `&mut self` receiver confines
    /// binding to the construction window, after which the table is
    /// shared immutably.
    pub fn bind_transition(
        &mut self,
        state: FsmState,
        hook: TransitionFn,
    ) -> FsmResult<()> {
        match self.entries.iter_mut().find(|e| e.state == state) {
            Some(entry) => {
                entry.transition_fn = Some(hook);
                Ok(())
            }
            None => Err(FsmError::NoSuchState {
                table: self.name.clone(),
                state,
            }),
        }
    }

    /// Advance one port by exactly one step.
    ///
    /// Never blocks, invokes at most one handler and at most one
    /// transition hook, and absorbs handler failures into the table's
    /// alternate transitions; the only errors returned are argument
    /// errors (dead port) and internal table-consistency faults.  Calls
    /// for a single port must be serialized by the caller, which the
    /// exclusive borrow on its cursor enforces.
    pub fn run(
        &self,
        ctx: &mut PortContext<'_>,
        cursor: &mut PortFsmCursor,
    ) -> FsmResult<Tick> {
        let enabled = ctx
            .ops
            .port_enabled(ctx.port)
            .map_err(|_| FsmError::NoSuchPort(ctx.port))?;

        let current = cursor.state;
        let (desc, preempted) = if enabled {
            (self.find_state(current)?, false)
        } else {
            // Administrative disable preempts whatever the port was
            // doing: substitute the teardown descriptor for the current
            // one.
            info!(
                ctx.log,
                "{self}: disabled while in {current}, tearing down"
            );
            (self.find_state(FsmState::Disabled)?, true)
        };

        let mut result = match desc.handler {
            Some(handler) => handler(ctx),
            None => HandlerResult::Error(HandlerError::Unhandled),
        };

        if let HandlerResult::NotReady = result {
            match desc.timeout {
                None => {
                    return Ok(Tick {
                        state: current,
                        wait_ms: desc.wait_ms,
                    })
                }
                Some(cycles) => {
                    cursor.cycles_in_state += 1;
                    if cursor.cycles_in_state < cycles {
                        return Ok(Tick {
                            state: current,
                            wait_ms: desc.wait_ms,
                        });
                    }
                    info!(
                        ctx.log,
                        "{self}: {current} timed out after {cycles} cycles"
                    );
                    result =
                        HandlerResult::Error(HandlerError::Timeout { cycles });
                }
            }
        }

        let (mut next, mut wait_ms) = if preempted {
            (desc.alt_state, desc.alt_wait_ms)
        } else {
            match &result {
                HandlerResult::Success => (desc.next_state, desc.next_wait_ms),
                HandlerResult::Alt2 => {
                    desc.alt2.unwrap_or((desc.alt_state, desc.alt_wait_ms))
                }
                HandlerResult::Alt3 => {
                    desc.alt3.unwrap_or((desc.alt_state, desc.alt_wait_ms))
                }
                _ => (desc.alt_state, desc.alt_wait_ms),
            }
        };

        if next != current {
            cursor.cycles_in_state = 0;
            if let Some(hook) = desc.transition_fn {
                hook(ctx, &mut next, &mut wait_ms);
            }
            if next != current {
                debug!(
                    ctx.log,
                    "{self}: {current} -> {next}";
                    "outcome" => result.class()
                );
                cursor.enter(next);
            }
        }

        Ok(Tick {
            state: next,
            wait_ms,
        })
    }

    /// Run the `Disabled` teardown handler directly, outside the normal
    /// polling cadence.  Used when a port is deleted rather than merely
    /// disabled, so the lanes are released without waiting for the next
    /// scheduled step.
    pub fn run_disabled(&self, ctx: &mut PortContext<'_>) -> FsmResult<()> {
        let desc = self.find_state(FsmState::Disabled)?;
        if let Some(handler) = desc.handler {
            if let HandlerResult::Error(e) = handler(ctx) {
                error!(ctx.log, "{self}: teardown failed: {e}");
            }
        }
        Ok(())
    }
}

/// Per-port mutable position within a table: the current state and how
/// many polls the port has spent in it, along with entry counters for
/// observability.  Created when a bring-up mode is selected and reset on
/// mode change; never shared between ports.
#[derive(Clone, Debug, Default)]
pub struct PortFsmCursor {
    state: FsmState,
    cycles_in_state: u32,
    stats: FsmStats,
    total_stats: FsmStats,
    linkup_count: u32,
    linkup_total: u32,
}

impl PortFsmCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The state the port is currently in.
    pub fn state(&self) -> FsmState {
        self.state
    }

    /// Consecutive `NotReady` polls spent in the current state.
    pub fn cycles_in_state(&self) -> u32 {
        self.cycles_in_state
    }

    /// Per-state entry counts since the cursor was last reset.
    pub fn stats(&self) -> &FsmStats {
        &self.stats
    }

    /// Per-state entry counts since the cursor was created.
    pub fn total_stats(&self) -> &FsmStats {
        &self.total_stats
    }

    /// LinkUp transitions since the last reset and since creation.
    pub fn linkup_counts(&self) -> (u32, u32) {
        (self.linkup_count, self.linkup_total)
    }

    /// Return to the initial state, clearing the time-in-state counter
    /// and the per-enable statistics.  Lifetime totals are preserved.
    pub fn reset(&mut self) {
        self.state = FsmState::default();
        self.cycles_in_state = 0;
        self.stats.clear();
        self.linkup_count = 0;
    }

    fn enter(&mut self, state: FsmState) {
        self.state = state;
        self.stats.bump(state);
        self.total_stats.bump(state);
        if state == FsmState::LinkUp {
            self.linkup_count += 1;
            self.linkup_total += 1;
        }
    }

    #[cfg(test)]
    pub(crate) fn set_state(&mut self, state: FsmState) {
        self.state = state;
        self.cycles_in_state = 0;
    }
}
