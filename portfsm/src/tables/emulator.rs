// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Tables for the targets with no real serdes underneath: the software
//! model, where every hardware step completes instantly, and the RTL
//! emulator, where they complete eventually.  Both shapes are shared by
//! every ASIC family.

use crate::engine::StateDescriptor;
use crate::engine::StateTable;
use crate::mode::AsicFamily;
use crate::mode::Mode;
use crate::states::FsmState;
use crate::tables::handlers;
use crate::FsmResult;

const IDLE_WAIT_MS: u32 = 10;
const UP_POLL_MS: u32 = 1000;
const ABORT_WAIT_MS: u32 = 100;
const END_WAIT_MS: u32 = 1000;

// Emulated hardware runs orders of magnitude slower than silicon, so the
// polls are slow and the budgets enormous.
const EMU_POLL_MS: u32 = 1000;
const EMU_SIGNAL_TIMEOUT: u32 = 600; // 10 minutes
const EMU_LINK_DN_TIMEOUT: u32 = 600;

/// The software model has no hardware latencies at all: the link is
/// declared up as soon as the model is told about it.
pub(crate) fn sw_model(family: AsicFamily) -> FsmResult<StateTable> {
    StateTable::new(
        Mode::SwModel,
        family,
        vec![
            StateDescriptor::new(
                FsmState::Idle,
                handlers::idle_sw_model,
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

/// A reduced bring-up against the RTL emulator: configure, wait for the
/// emulated signal, then monitor.  No adaptation and no BER check; the
/// emulator models neither.
pub(crate) fn emulator(family: AsicFamily) -> FsmResult<StateTable> {
    StateTable::new(
        Mode::Emulator,
        family,
        vec![
            StateDescriptor::new(FsmState::Idle, handlers::idle_cfg, IDLE_WAIT_MS)
                .on_success(FsmState::WaitSignalOk, EMU_POLL_MS)
                .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::WaitSignalOk,
                handlers::wait_signal_ok,
                EMU_POLL_MS,
            )
            .timeout_cycles(EMU_SIGNAL_TIMEOUT)
            .on_success(FsmState::LinkDown, EMU_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::LinkDown,
                handlers::link_down,
                EMU_POLL_MS,
            )
            .timeout_cycles(EMU_LINK_DN_TIMEOUT)
            .on_success(FsmState::LinkUp, EMU_POLL_MS)
            .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(FsmState::LinkUp, handlers::link_up, EMU_POLL_MS)
                .on_success(FsmState::LinkDown, EMU_POLL_MS)
                .on_error(FsmState::Abort, ABORT_WAIT_MS),
            StateDescriptor::new(
                FsmState::Abort,
                handlers::abort_readapt,
                ABORT_WAIT_MS,
            )
            .on_success(FsmState::WaitSignalOk, EMU_POLL_MS),
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
