// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Test support: a controllable in-memory implementation of `LinkOps`
//! whose status flags the tests flip to walk a port through its table.

use std::sync::Mutex;

use slog::Drain;

use common::ports::LoopbackMode;
use common::ports::PortPrbsMode;
use hal::AnAdvertisement;
use hal::AnHcd;
use hal::Connector;
use hal::FecCounters;
use hal::HalError;
use hal::HalResult;
use hal::LaneConfig;
use hal::LinkOps;
use hal::LtClause;
use hal::PcsStatus;
use hal::PortHdl;
use hal::PortUpdate;

pub(crate) fn test_log() -> slog::Logger {
    let dec = slog_term::PlainSyncDecorator::new(slog_term::TestStdoutWriter);
    let drain = slog_term::FullFormat::new(dec).build().fuse();
    slog::Logger::root(drain, slog::o!())
}

pub(crate) fn test_port() -> PortHdl {
    PortHdl::new(Connector::Qsfp(1), 0)
}

/// The hardware state the fake exposes, plus a record of the calls the
/// handlers made against it.
pub(crate) struct FakeState {
    pub exists: bool,
    pub enabled: bool,
    pub pll_ready: bool,
    pub rate_change_done: bool,
    pub cdr_locked: bool,
    pub signal: bool,
    pub adapted: bool,
    pub rx_ready: bool,
    pub pcs: PcsStatus,
    pub oper_up: bool,
    pub an_done: bool,
    pub hcd: Option<AnHcd>,
    pub lt_done: bool,
    /// Returned (and cleared) by the next `fec_counters_take`
    pub fec: FecCounters,
    /// Returned (and cleared) by the next `prbs_errors`
    pub prbs_errors: u64,
    /// Name of a `LinkOps` method that should fail
    pub fail_op: Option<&'static str>,

    pub lane_cfgs: u32,
    pub lane_decfgs: u32,
    pub squelched: bool,
    pub loopback: LoopbackMode,
    pub prbs_mode: PortPrbsMode,
    pub an_starts: u32,
    pub lt_clause: Option<LtClause>,
    pub update_tx: Option<std::sync::mpsc::Sender<PortUpdate>>,
}

impl Default for FakeState {
    fn default() -> Self {
        FakeState {
            exists: true,
            enabled: true,
            pll_ready: false,
            rate_change_done: false,
            cdr_locked: false,
            signal: false,
            adapted: false,
            rx_ready: false,
            pcs: PcsStatus::default(),
            oper_up: false,
            an_done: false,
            hcd: None,
            lt_done: false,
            fec: FecCounters::default(),
            prbs_errors: 0,
            fail_op: None,
            lane_cfgs: 0,
            lane_decfgs: 0,
            squelched: false,
            loopback: LoopbackMode::None,
            prbs_mode: PortPrbsMode::Mission,
            an_starts: 0,
            lt_clause: None,
            update_tx: None,
        }
    }
}

pub(crate) struct FakeHw(Mutex<FakeState>);

impl FakeHw {
    pub fn new() -> Self {
        FakeHw(Mutex::new(FakeState::default()))
    }

    /// Mutate the fake's state.
    pub fn set(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.0.lock().unwrap())
    }

    /// Read something out of the fake's state.
    pub fn get<T>(&self, f: impl FnOnce(&FakeState) -> T) -> T {
        f(&self.0.lock().unwrap())
    }

    fn check(&self, op: &'static str) -> HalResult<()> {
        let state = self.0.lock().unwrap();
        if !state.exists {
            return Err(HalError::InvalidArg("no such port".to_string()));
        }
        if state.fail_op == Some(op) {
            return Err(HalError::driver(op, "induced failure"));
        }
        Ok(())
    }
}

impl LinkOps for FakeHw {
    fn port_enabled(&self, _port: PortHdl) -> HalResult<bool> {
        self.check("port_enabled")?;
        Ok(self.0.lock().unwrap().enabled)
    }

    fn lane_cfg_set(
        &self,
        _port: PortHdl,
        _cfg: &LaneConfig,
    ) -> HalResult<()> {
        self.check("lane_cfg_set")?;
        self.0.lock().unwrap().lane_cfgs += 1;
        Ok(())
    }

    fn lane_decfg(&self, _port: PortHdl) -> HalResult<()> {
        self.check("lane_decfg")?;
        self.0.lock().unwrap().lane_decfgs += 1;
        Ok(())
    }

    fn tx_squelch_set(&self, _port: PortHdl, squelch: bool) -> HalResult<()> {
        self.check("tx_squelch_set")?;
        self.0.lock().unwrap().squelched = squelch;
        Ok(())
    }

    fn loopback_set(
        &self,
        _port: PortHdl,
        mode: LoopbackMode,
    ) -> HalResult<()> {
        self.check("loopback_set")?;
        self.0.lock().unwrap().loopback = mode;
        Ok(())
    }

    fn pll_ready(&self, _port: PortHdl) -> HalResult<bool> {
        self.check("pll_ready")?;
        Ok(self.0.lock().unwrap().pll_ready)
    }

    fn rate_change_done(&self, _port: PortHdl) -> HalResult<bool> {
        self.check("rate_change_done")?;
        Ok(self.0.lock().unwrap().rate_change_done)
    }

    fn cdr_locked(&self, _port: PortHdl) -> HalResult<bool> {
        self.check("cdr_locked")?;
        Ok(self.0.lock().unwrap().cdr_locked)
    }

    fn signal_detect(&self, _port: PortHdl) -> HalResult<bool> {
        self.check("signal_detect")?;
        Ok(self.0.lock().unwrap().signal)
    }

    fn adapt_done(&self, _port: PortHdl) -> HalResult<bool> {
        self.check("adapt_done")?;
        Ok(self.0.lock().unwrap().adapted)
    }

    fn rx_ready(&self, _port: PortHdl) -> HalResult<bool> {
        self.check("rx_ready")?;
        Ok(self.0.lock().unwrap().rx_ready)
    }

    fn pcs_status(&self, _port: PortHdl) -> HalResult<PcsStatus> {
        self.check("pcs_status")?;
        Ok(self.0.lock().unwrap().pcs)
    }

    fn oper_state_set(&self, port: PortHdl, up: bool) -> HalResult<()> {
        self.check("oper_state_set")?;
        let mut state = self.0.lock().unwrap();
        state.oper_up = up;
        // Confirm the change the way real hardware does, through the
        // registered update handler.
        if let Some(tx) = state.update_tx.as_ref() {
            let _ = tx.send(PortUpdate::OperState { port, up });
        }
        Ok(())
    }

    fn oper_state_get(&self, _port: PortHdl) -> HalResult<bool> {
        self.check("oper_state_get")?;
        Ok(self.0.lock().unwrap().oper_up)
    }

    fn an_advert_set(
        &self,
        _port: PortHdl,
        _adv: &AnAdvertisement,
    ) -> HalResult<()> {
        self.check("an_advert_set")?;
        Ok(())
    }

    fn an_start(&self, _port: PortHdl) -> HalResult<()> {
        self.check("an_start")?;
        self.0.lock().unwrap().an_starts += 1;
        Ok(())
    }

    fn an_done(&self, _port: PortHdl) -> HalResult<bool> {
        self.check("an_done")?;
        Ok(self.0.lock().unwrap().an_done)
    }

    fn an_hcd(&self, _port: PortHdl) -> HalResult<AnHcd> {
        self.check("an_hcd")?;
        self.0
            .lock()
            .unwrap()
            .hcd
            .ok_or_else(|| HalError::Internal("no HCD resolved".to_string()))
    }

    fn lt_start(&self, _port: PortHdl, clause: LtClause) -> HalResult<()> {
        self.check("lt_start")?;
        self.0.lock().unwrap().lt_clause = Some(clause);
        Ok(())
    }

    fn lt_done(&self, _port: PortHdl) -> HalResult<bool> {
        self.check("lt_done")?;
        Ok(self.0.lock().unwrap().lt_done)
    }

    fn fec_counters_take(&self, _port: PortHdl) -> HalResult<FecCounters> {
        self.check("fec_counters_take")?;
        let mut state = self.0.lock().unwrap();
        Ok(std::mem::take(&mut state.fec))
    }

    fn prbs_cfg_set(
        &self,
        _port: PortHdl,
        mode: PortPrbsMode,
    ) -> HalResult<()> {
        self.check("prbs_cfg_set")?;
        self.0.lock().unwrap().prbs_mode = mode;
        Ok(())
    }

    fn prbs_errors(&self, _port: PortHdl) -> HalResult<u64> {
        self.check("prbs_errors")?;
        let mut state = self.0.lock().unwrap();
        Ok(std::mem::take(&mut state.prbs_errors))
    }

    fn register_port_update_handler(
        &self,
        updates: std::sync::mpsc::Sender<PortUpdate>,
    ) -> HalResult<()> {
        self.0.lock().unwrap().update_tx = Some(updates);
        Ok(())
    }
}
