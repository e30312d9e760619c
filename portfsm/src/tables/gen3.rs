// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Bring-up tables for the third-generation ASIC: PAM4 serdes with
//! explicit rate-change and CDR-lock steps, and link training dispatched
//! per clause from the negotiated HCD.

use crate::engine::StateDescriptor;
use crate::engine::StateTable;
use crate::mode::AsicFamily;
use crate::mode::Mode;
use crate::states::FsmState;
use crate::tables::handlers;
use crate::tables::handlers::BER_WINDOW_MS;
use crate::FsmResult;

const FAMILY: AsicFamily = AsicFamily::Gen3;

// Poll cadences, in milliseconds.
const IDLE_WAIT_MS: u32 = 10;
const RATE_CHG_POLL_MS: u32 = 10;
const CDR_POLL_MS: u32 = 10;
const SIGNAL_POLL_MS: u32 = 50;
const DFE_POLL_MS: u32 = 100;
const RX_READY_POLL_MS: u32 = 10;
const AN_POLL_MS: u32 = 100;
const LT_POLL_MS: u32 = 10;
const LT_PAM4_POLL_MS: u32 = 100;
const LINK_POLL_MS: u32 = 100;
const UP_POLL_MS: u32 = 1000;
const PRBS_POLL_MS: u32 = 1000;
const ABORT_WAIT_MS: u32 = 100;
const END_WAIT_MS: u32 = 1000;

// Time-in-state budgets, in poll cycles.
const RATE_CHG_TIMEOUT: u32 = 20; // rate switch completes within ~200ms
const CDR_TIMEOUT: u32 = 100; // CDR locks within ~1s of signal
const SIGNAL_TIMEOUT: u32 = 100; // 5s; the far end may still be dark
const DFE_TIMEOUT: u32 = 100; // PAM4 adaptation budget ~10s
const RX_READY_TIMEOUT: u32 = 50;
const AN_TIMEOUT: u32 = 50; // page exchange resolves within ~5s
const LT_NRZ_TIMEOUT: u32 = 50; // clause 72/92 training budget ~500ms
const LT_CL136_TIMEOUT: u32 = 30; // clause 136 training budget ~3s
const LT_CL162_TIMEOUT: u32 = 150; // clause 162 training budget ~15s
const LINK_DN_TIMEOUT: u32 = 100; // 10s of down forces re-adaptation

pub(crate) fn dfe() -> FsmResult<StateTable> {
    StateTable::new(
        Mode::Dfe,
        FAMILY,
        vec![
            StateDescriptor::new(FsmState::Idle, handlers::idle_cfg, IDLE_WAIT_MS)
                .on_success(FsmState::WaitRateChangeDone, RATE_CHG_POLL_MS)
                .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitRateChangeDone,
                handlers::wait_rate_change_done,
                RATE_CHG_POLL_MS,
            )
            .timeout_cycles(RATE_CHG_TIMEOUT)
            .on_success(FsmState::WaitSignalOk, SIGNAL_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitSignalOk,
                handlers::wait_signal_ok,
                SIGNAL_POLL_MS,
            )
            .timeout_cycles(SIGNAL_TIMEOUT)
            .on_success(FsmState::WaitCdrLock, CDR_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitCdrLock,
                handlers::wait_cdr_lock,
                CDR_POLL_MS,
            )
            .timeout_cycles(CDR_TIMEOUT)
            .on_success(FsmState::WaitDfeDone, DFE_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitDfeDone,
                handlers::wait_dfe_done,
                DFE_POLL_MS,
            )
            .timeout_cycles(DFE_TIMEOUT)
            .on_success(FsmState::WaitRxReady, RX_READY_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitRxReady,
                handlers::wait_rx_ready,
                RX_READY_POLL_MS,
            )
            .timeout_cycles(RX_READY_TIMEOUT)
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
            // Full fault classification, identical to gen2.
            StateDescriptor::new(
                FsmState::RemoteFault,
                handlers::remote_fault,
                LINK_POLL_MS,
            )
            .on_success(FsmState::LinkUp, UP_POLL_MS)
            .on_alt2(FsmState::LinkDown, LINK_POLL_MS)
            .on_alt3(FsmState::LinkUp, UP_POLL_MS)
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

pub(crate) fn autoneg() -> FsmResult<StateTable> {
    let mut table = StateTable::new(
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
            StateDescriptor::new(
                FsmState::WaitAutonegDone,
                handlers::wait_an_done,
                AN_POLL_MS,
            )
            .timeout_cycles(AN_TIMEOUT)
            .on_success(FsmState::SelectLtClause, IDLE_WAIT_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            // The static successor is the clause-72 wait; the transition
            // hook bound below reroutes to the wait state matching the
            // clause implied by the negotiated HCD.
            StateDescriptor::new(
                FsmState::SelectLtClause,
                handlers::select_lt_clause,
                IDLE_WAIT_MS,
            )
            .on_success(FsmState::WaitAnLtDoneCl72, LT_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitAnLtDoneCl72,
                handlers::wait_lt_done,
                LT_POLL_MS,
            )
            .timeout_cycles(LT_NRZ_TIMEOUT)
            .on_success(FsmState::WaitRxReady, RX_READY_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitAnLtDoneCl92,
                handlers::wait_lt_done,
                LT_POLL_MS,
            )
            .timeout_cycles(LT_NRZ_TIMEOUT)
            .on_success(FsmState::WaitRxReady, RX_READY_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitAnLtDoneCl136,
                handlers::wait_lt_done,
                LT_PAM4_POLL_MS,
            )
            .timeout_cycles(LT_CL136_TIMEOUT)
            .on_success(FsmState::WaitRxReady, RX_READY_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitAnLtDoneCl162,
                handlers::wait_lt_done,
                LT_PAM4_POLL_MS,
            )
            .timeout_cycles(LT_CL162_TIMEOUT)
            .on_success(FsmState::WaitRxReady, RX_READY_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitRxReady,
                handlers::wait_rx_ready,
                RX_READY_POLL_MS,
            )
            .timeout_cycles(RX_READY_TIMEOUT)
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
            // Full fault classification, identical to gen2.
            StateDescriptor::new(
                FsmState::RemoteFault,
                handlers::remote_fault,
                LINK_POLL_MS,
            )
            .on_success(FsmState::LinkUp, UP_POLL_MS)
            .on_alt2(FsmState::LinkDown, LINK_POLL_MS)
            .on_alt3(FsmState::LinkUp, UP_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
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
    )?;

    table.bind_transition(
        FsmState::SelectLtClause,
        handlers::select_lt_clause_next,
    )?;
    Ok(table)
}

pub(crate) fn prbs() -> FsmResult<StateTable> {
    StateTable::new(
        Mode::Prbs,
        FAMILY,
        vec![
            StateDescriptor::new(FsmState::Idle, handlers::idle_prbs, IDLE_WAIT_MS)
                .on_success(FsmState::WaitRateChangeDone, RATE_CHG_POLL_MS)
                .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitRateChangeDone,
                handlers::wait_rate_change_done,
                RATE_CHG_POLL_MS,
            )
            .timeout_cycles(RATE_CHG_TIMEOUT)
            .on_success(FsmState::WaitSignalOk, SIGNAL_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitSignalOk,
                handlers::wait_signal_ok,
                SIGNAL_POLL_MS,
            )
            .timeout_cycles(SIGNAL_TIMEOUT)
            .on_success(FsmState::WaitCdrLock, CDR_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitCdrLock,
                handlers::wait_cdr_lock,
                CDR_POLL_MS,
            )
            .timeout_cycles(CDR_TIMEOUT)
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
            .on_success(FsmState::WaitCdrLock, CDR_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitCdrLock,
                handlers::wait_cdr_lock,
                CDR_POLL_MS,
            )
            .timeout_cycles(CDR_TIMEOUT)
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
            .on_success(FsmState::WaitRateChangeDone, RATE_CHG_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitRateChangeDone,
                handlers::wait_rate_change_done,
                RATE_CHG_POLL_MS,
            )
            .timeout_cycles(RATE_CHG_TIMEOUT)
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
            .on_success(FsmState::WaitRateChangeDone, RATE_CHG_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitRateChangeDone,
                handlers::wait_rate_change_done,
                RATE_CHG_POLL_MS,
            )
            .timeout_cycles(RATE_CHG_TIMEOUT)
            .on_success(FsmState::LinkUp, UP_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(FsmState::LinkUp, handlers::hold_up, UP_POLL_MS)
                .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::Abort,
                handlers::abort_readapt,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::WaitRateChangeDone, RATE_CHG_POLL_MS),
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
