// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Bring-up tables for the second-generation ASIC: NRZ serdes, with link
//! training sequenced by the hardware as soon as autonegotiation resolves.

use crate::engine::StateDescriptor;
use crate::engine::StateTable;
use crate::mode::AsicFamily;
use crate::mode::Mode;
use crate::states::FsmState;
use crate::tables::handlers;
use crate::tables::handlers::BER_WINDOW_MS;
use crate::FsmResult;

const FAMILY: AsicFamily = AsicFamily::Gen2;

// Poll cadences, in milliseconds.
const IDLE_WAIT_MS: u32 = 10;
const PLL_POLL_MS: u32 = 10;
const SIGNAL_POLL_MS: u32 = 50;
const DFE_POLL_MS: u32 = 100;
const AN_POLL_MS: u32 = 100;
const LT_POLL_MS: u32 = 10;
const LINK_POLL_MS: u32 = 100;
const UP_POLL_MS: u32 = 1000;
const PRBS_POLL_MS: u32 = 1000;
const ABORT_WAIT_MS: u32 = 100;
const END_WAIT_MS: u32 = 1000;

// Time-in-state budgets, in poll cycles.  Each reflects the known
// worst-case hardware latency for the step with headroom.
const PLL_TIMEOUT: u32 = 10; // PLL settles within tens of ms
pub(crate) const SIGNAL_TIMEOUT: u32 = 100; // 5s; the far end may still be dark
const DFE_TIMEOUT: u32 = 100; // adaptation converges within ~10s
const AN_TIMEOUT: u32 = 50; // page exchange resolves within ~5s
const LT_TIMEOUT: u32 = 50; // clause 72/92 training budget ~500ms
const LINK_DN_TIMEOUT: u32 = 100; // 10s of down forces re-adaptation

pub(crate) fn dfe() -> FsmResult<StateTable> {
    StateTable::new(
        Mode::Dfe,
        FAMILY,
        vec![
            StateDescriptor::new(FsmState::Idle, handlers::idle_cfg, IDLE_WAIT_MS)
                .on_success(FsmState::WaitPllReady, PLL_POLL_MS)
                .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitPllReady,
                handlers::wait_pll_ready,
                PLL_POLL_MS,
            )
            .timeout_cycles(PLL_TIMEOUT)
            .on_success(FsmState::WaitSignalOk, SIGNAL_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitSignalOk,
                handlers::wait_signal_ok,
                SIGNAL_POLL_MS,
            )
            .timeout_cycles(SIGNAL_TIMEOUT)
            .on_success(FsmState::WaitDfeDone, DFE_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitDfeDone,
                handlers::wait_dfe_done,
                DFE_POLL_MS,
            )
            .timeout_cycles(DFE_TIMEOUT)
            .on_success(FsmState::BerCheckStart, IDLE_WAIT_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::BerCheckStart,
                handlers::ber_check_start,
                IDLE_WAIT_MS,
            )
            // The wait before BerCheckDone runs is the measurement window.
            .on_success(FsmState::BerCheckDone, BER_WINDOW_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::BerCheckDone,
                handlers::ber_check_done,
                IDLE_WAIT_MS,
            )
            .on_success(FsmState::LinkDown, LINK_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::LinkDown,
                handlers::link_down,
                LINK_POLL_MS,
            )
            .timeout_cycles(LINK_DN_TIMEOUT)
            .on_success(FsmState::LinkUp, UP_POLL_MS)
            .on_alt2(FsmState::RemoteFault, LINK_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(FsmState::LinkUp, handlers::link_up, UP_POLL_MS)
                .on_success(FsmState::LinkDown, LINK_POLL_MS)
                .on_alt3(FsmState::RemoteFault, LINK_POLL_MS)
                .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::RemoteFault,
                handlers::remote_fault,
                LINK_POLL_MS,
            )
            .on_success(FsmState::LinkUp, UP_POLL_MS)
            .on_alt2(FsmState::LinkDown, LINK_POLL_MS)
            .on_alt3(FsmState::LinkUp, UP_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            // Lanes stay configured across a quiesce, so adaptation
            // restarts from signal detect rather than Idle.
            StateDescriptor::new(
                FsmState::Abort,
                handlers::abort_readapt,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::WaitSignalOk, SIGNAL_POLL_MS),
            StateDescriptor::new(
                FsmState::Disabled,
                handlers::disabled,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::End, END_WAIT_MS)
            .on_error(FsmState::End, END_WAIT_MS),
            StateDescriptor::unhandled(FsmState::End, END_WAIT_MS),
        ],
    )
}

pub(crate) fn autoneg() -> FsmResult<StateTable> {
    StateTable::new(
        Mode::Autoneg,
        FAMILY,
        vec![
            StateDescriptor::new(
                FsmState::Idle,
                handlers::idle_autoneg,
                IDLE_WAIT_MS,
            )
            .on_success(FsmState::WaitAutonegDone, AN_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            // Resolution and the start of training happen together: the
            // hardware begins training on its own once the page exchange
            // completes.
            StateDescriptor::new(
                FsmState::WaitAutonegDone,
                handlers::an_done_start_lt,
                AN_POLL_MS,
            )
            .timeout_cycles(AN_TIMEOUT)
            .on_success(FsmState::WaitAutonegLtDone, LT_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitAutonegLtDone,
                handlers::wait_lt_done,
                LT_POLL_MS,
            )
            .timeout_cycles(LT_TIMEOUT)
            .on_success(FsmState::BerCheckStart, IDLE_WAIT_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::BerCheckStart,
                handlers::ber_check_start,
                IDLE_WAIT_MS,
            )
            .on_success(FsmState::BerCheckDone, BER_WINDOW_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::BerCheckDone,
                handlers::ber_check_done,
                IDLE_WAIT_MS,
            )
            .on_success(FsmState::LinkDown, LINK_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::LinkDown,
                handlers::link_down,
                LINK_POLL_MS,
            )
            .timeout_cycles(LINK_DN_TIMEOUT)
            .on_success(FsmState::LinkUp, UP_POLL_MS)
            .on_alt2(FsmState::RemoteFault, LINK_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(FsmState::LinkUp, handlers::link_up, UP_POLL_MS)
                .on_success(FsmState::LinkDown, LINK_POLL_MS)
                .on_alt3(FsmState::RemoteFault, LINK_POLL_MS)
                .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::RemoteFault,
                handlers::remote_fault,
                LINK_POLL_MS,
            )
            .on_success(FsmState::LinkUp, UP_POLL_MS)
            .on_alt2(FsmState::LinkDown, LINK_POLL_MS)
            .on_alt3(FsmState::LinkUp, UP_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            // Negotiation retries indefinitely: teardown releases the
            // lanes and the advertisement is re-armed from Idle.
            StateDescriptor::new(
                FsmState::Abort,
                handlers::abort_restart,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::Idle, IDLE_WAIT_MS),
            StateDescriptor::new(
                FsmState::Disabled,
                handlers::disabled,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::End, END_WAIT_MS)
            .on_error(FsmState::End, END_WAIT_MS),
            StateDescriptor::unhandled(FsmState::End, END_WAIT_MS),
        ],
    )
}

pub(crate) fn prbs() -> FsmResult<StateTable> {
    StateTable::new(
        Mode::Prbs,
        FAMILY,
        vec![
            StateDescriptor::new(FsmState::Idle, handlers::idle_prbs, IDLE_WAIT_MS)
                .on_success(FsmState::WaitPllReady, PLL_POLL_MS)
                .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitPllReady,
                handlers::wait_pll_ready,
                PLL_POLL_MS,
            )
            .timeout_cycles(PLL_TIMEOUT)
            .on_success(FsmState::WaitSignalOk, SIGNAL_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitSignalOk,
                handlers::wait_signal_ok,
                SIGNAL_POLL_MS,
            )
            .timeout_cycles(SIGNAL_TIMEOUT)
            .on_success(FsmState::WaitDfeDone, DFE_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitDfeDone,
                handlers::wait_dfe_done,
                DFE_POLL_MS,
            )
            .timeout_cycles(DFE_TIMEOUT)
            .on_success(FsmState::WaitTestDone, DFE_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitTestDone,
                handlers::wait_test_done,
                DFE_POLL_MS,
            )
            .timeout_cycles(DFE_TIMEOUT)
            .on_success(FsmState::MonitorPrbsErrors, PRBS_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::MonitorPrbsErrors,
                handlers::monitor_prbs,
                PRBS_POLL_MS,
            )
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::Abort,
                handlers::abort_readapt,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::WaitSignalOk, SIGNAL_POLL_MS),
            StateDescriptor::new(
                FsmState::Disabled,
                handlers::disabled,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::End, END_WAIT_MS)
            .on_error(FsmState::End, END_WAIT_MS),
            StateDescriptor::unhandled(FsmState::End, END_WAIT_MS),
        ],
    )
}

pub(crate) fn mac_near_loopback() -> FsmResult<StateTable> {
    StateTable::new(
        Mode::MacNearLoopback,
        FAMILY,
        vec![
            // The loop sits inside the MAC, so no serdes step gates the
            // PCS coming up.
            StateDescriptor::new(
                FsmState::Idle,
                handlers::idle_loopback,
                IDLE_WAIT_MS,
            )
            .on_success(FsmState::LinkDown, LINK_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::LinkDown,
                handlers::link_down,
                LINK_POLL_MS,
            )
            .timeout_cycles(LINK_DN_TIMEOUT)
            .on_success(FsmState::LinkUp, UP_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(FsmState::LinkUp, handlers::link_up, UP_POLL_MS)
                .on_success(FsmState::LinkDown, LINK_POLL_MS)
                .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::Abort,
                handlers::abort_readapt,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::LinkDown, LINK_POLL_MS),
            StateDescriptor::new(
                FsmState::Disabled,
                handlers::disabled,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::End, END_WAIT_MS)
            .on_error(FsmState::End, END_WAIT_MS),
            StateDescriptor::unhandled(FsmState::End, END_WAIT_MS),
        ],
    )
}

pub(crate) fn mac_far_loopback() -> FsmResult<StateTable> {
    StateTable::new(
        Mode::MacFarLoopback,
        FAMILY,
        vec![
            // Far loopback returns the partner's data at our MAC, so the
            // receive path has to adapt first.
            StateDescriptor::new(
                FsmState::Idle,
                handlers::idle_loopback,
                IDLE_WAIT_MS,
            )
            .on_success(FsmState::WaitSignalOk, SIGNAL_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitSignalOk,
                handlers::wait_signal_ok,
                SIGNAL_POLL_MS,
            )
            .timeout_cycles(SIGNAL_TIMEOUT)
            .on_success(FsmState::WaitDfeDone, DFE_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitDfeDone,
                handlers::wait_dfe_done,
                DFE_POLL_MS,
            )
            .timeout_cycles(DFE_TIMEOUT)
            .on_success(FsmState::LinkDown, LINK_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::LinkDown,
                handlers::link_down,
                LINK_POLL_MS,
            )
            .timeout_cycles(LINK_DN_TIMEOUT)
            .on_success(FsmState::LinkUp, UP_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(FsmState::LinkUp, handlers::link_up, UP_POLL_MS)
                .on_success(FsmState::LinkDown, LINK_POLL_MS)
                .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::Abort,
                handlers::abort_readapt,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::WaitSignalOk, SIGNAL_POLL_MS),
            StateDescriptor::new(
                FsmState::Disabled,
                handlers::disabled,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::End, END_WAIT_MS)
            .on_error(FsmState::End, END_WAIT_MS),
            StateDescriptor::unhandled(FsmState::End, END_WAIT_MS),
        ],
    )
}

pub(crate) fn pcs_loopback() -> FsmResult<StateTable> {
    StateTable::new(
        Mode::PcsLoopback,
        FAMILY,
        vec![
            StateDescriptor::new(
                FsmState::Idle,
                handlers::idle_loopback,
                IDLE_WAIT_MS,
            )
            .on_success(FsmState::WaitPllReady, PLL_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitPllReady,
                handlers::wait_pll_ready,
                PLL_POLL_MS,
            )
            .timeout_cycles(PLL_TIMEOUT)
            .on_success(FsmState::LinkDown, LINK_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::LinkDown,
                handlers::link_down,
                LINK_POLL_MS,
            )
            .timeout_cycles(LINK_DN_TIMEOUT)
            .on_success(FsmState::LinkUp, UP_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(FsmState::LinkUp, handlers::link_up, UP_POLL_MS)
                .on_success(FsmState::LinkDown, LINK_POLL_MS)
                .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::Abort,
                handlers::abort_readapt,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::LinkDown, LINK_POLL_MS),
            StateDescriptor::new(
                FsmState::Disabled,
                handlers::disabled,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::End, END_WAIT_MS)
            .on_error(FsmState::End, END_WAIT_MS),
            StateDescriptor::unhandled(FsmState::End, END_WAIT_MS),
        ],
    )
}

pub(crate) fn pipe_loopback() -> FsmResult<StateTable> {
    StateTable::new(
        Mode::PipeLoopback,
        FAMILY,
        vec![
            StateDescriptor::new(
                FsmState::Idle,
                handlers::idle_pipe_loopback,
                IDLE_WAIT_MS,
            )
            .on_success(FsmState::LinkUp, UP_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(FsmState::LinkUp, handlers::hold_up, UP_POLL_MS)
                .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::Abort,
                handlers::abort_readapt,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::Idle, IDLE_WAIT_MS),
            StateDescriptor::new(
                FsmState::Disabled,
                handlers::disabled,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::End, END_WAIT_MS)
            .on_error(FsmState::End, END_WAIT_MS),
            StateDescriptor::unhandled(FsmState::End, END_WAIT_MS),
        ],
    )
}

pub(crate) fn tx_only() -> FsmResult<StateTable> {
    StateTable::new(
        Mode::TxOnly,
        FAMILY,
        vec![
            StateDescriptor::new(
                FsmState::Idle,
                handlers::idle_tx_only,
                IDLE_WAIT_MS,
            )
            .on_success(FsmState::WaitPllReady, PLL_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitPllReady,
                handlers::wait_pll_ready,
                PLL_POLL_MS,
            )
            .timeout_cycles(PLL_TIMEOUT)
            .on_success(FsmState::LinkUp, UP_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(FsmState::LinkUp, handlers::hold_up, UP_POLL_MS)
                .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::Abort,
                handlers::abort_readapt,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::WaitPllReady, PLL_POLL_MS),
            StateDescriptor::new(
                FsmState::Disabled,
                handlers::disabled,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::End, END_WAIT_MS)
            .on_error(FsmState::End, END_WAIT_MS),
            StateDescriptor::unhandled(FsmState::End, END_WAIT_MS),
        ],
    )
}
