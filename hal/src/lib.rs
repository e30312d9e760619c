// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! The hardware abstraction consumed by the port bring-up state machines.
//!
//! Everything the FSM handlers know about the serdes, MAC, and PCS hardware
//! is expressed through the [`LinkOps`] trait; the real register-level
//! implementation lives out of tree, next to the vendor driver.

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use common::ports::LaneEncoding;
use common::ports::LoopbackMode;
use common::ports::PortFec;
use common::ports::PortPrbsMode;
use common::ports::PortSpeed;

mod ports;
pub use ports::*;

/// A specialized Result type for hardware operations
pub type HalResult<T> = Result<T, HalError>;

/// Error type conveying additional information about hardware-layer errors
#[derive(Error, Debug)]
pub enum HalError {
    /// Error reported by the underlying device driver.  Reports both the
    /// location that detected the error and the driver's own message.
    #[error("driver error at {ctx}: {err}")]
    Driver { ctx: String, err: String },
    /// An argument passed to the hardware layer is invalid or inappropriate.
    /// This indicates misbehavior from the caller.
    #[error("Invalid argument: {}", .0)]
    InvalidArg(String),
    /// This operation is unsupported by the ASIC family being driven
    #[error("Operation unsupported by the ASIC")]
    OperationUnsupported,
    /// The hardware layer detected some internal inconsistency
    #[error("Internal error: {}", .0)]
    Internal(String),
}

impl HalError {
    /// Shorthand for wrapping a driver failure with its calling context.
    pub fn driver(ctx: impl ToString, err: impl ToString) -> Self {
        HalError::Driver {
            ctx: ctx.to_string(),
            err: err.to_string(),
        }
    }
}

/// Everything needed to configure the serdes lanes backing one port.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct LaneConfig {
    pub speed: PortSpeed,
    pub fec: PortFec,
    pub encoding: LaneEncoding,
    /// Number of serdes lanes consumed by the port
    pub lanes: u8,
}

/// Receive-side PCS status, read back as a unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PcsStatus {
    /// The PCS has block lock and is passing data
    pub up: bool,
    /// The local PCS is signalling fault toward the partner
    pub local_fault: bool,
    /// The link partner is signalling fault toward us
    pub remote_fault: bool,
}

/// What we advertise to the link partner during autonegotiation.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct AnAdvertisement {
    pub speeds: Vec<PortSpeed>,
    pub fec_modes: Vec<PortFec>,
    pub pause: bool,
    /// Raw next pages, transmitted in order after the base page exchange
    pub next_pages: Vec<u64>,
}

/// The highest common denominator resolved by a completed autonegotiation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnHcd {
    pub speed: PortSpeed,
    pub fec: PortFec,
    pub encoding: LaneEncoding,
}

/// Link-training protocol variants.  Which clause applies is a function of
/// the negotiated speed and encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LtClause {
    /// 10G/40G KR training
    Cl72,
    /// 100G (25G/lane NRZ) training
    Cl92,
    /// 50G PAM4 training
    Cl136,
    /// 100G+ PAM4 training
    Cl162,
}

impl LtClause {
    /// Select the training clause for a negotiated HCD.
    pub fn for_hcd(hcd: &AnHcd) -> LtClause {
        match (hcd.encoding, hcd.speed) {
            (LaneEncoding::Pam4, PortSpeed::Speed50G) => LtClause::Cl136,
            (LaneEncoding::Pam4, _) => LtClause::Cl162,
            (_, PortSpeed::Speed100G) => LtClause::Cl92,
            (_, _) => LtClause::Cl72,
        }
    }
}

/// FEC symbol-error counters, captured as a unit.  The hardware counters
/// clear on read, so each capture covers the window since the previous one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FecCounters {
    pub symbol_errors: u64,
    pub corrected: u64,
    pub uncorrected: u64,
}

/// When the hardware layer observes a state change for a port, it sends a
/// PortUpdate event to the registered handler informing it of the change.
/// Oper-state changes requested through [`LinkOps::oper_state_set`]
/// complete asynchronously and are confirmed with one of these.
#[derive(Clone, Copy, Debug)]
pub enum PortUpdate {
    /// Signal that a port's "enable" state has changed
    Enable { port: PortHdl, enabled: bool },
    /// Signal that a port's operational state has changed
    OperState { port: PortHdl, up: bool },
}

/// The `LinkOps` trait contains all of the per-port hardware operations the
/// bring-up state machines require.
pub trait LinkOps {
    /// Reports whether the administrator has enabled this port.  A port that
    /// was never allocated returns `InvalidArg`.
    fn port_enabled(&self, port: PortHdl) -> HalResult<bool>;

    /// Configure the serdes lanes backing this port and start their PLLs.
    fn lane_cfg_set(&self, port: PortHdl, cfg: &LaneConfig) -> HalResult<()>;

    /// Tear down the lane configuration, releasing the lanes.
    fn lane_decfg(&self, port: PortHdl) -> HalResult<()>;

    /// Squelch or unsquelch the transmitters on all of the port's lanes.
    fn tx_squelch_set(&self, port: PortHdl, squelch: bool) -> HalResult<()>;

    /// Route transmitted data back to the receiver at the given point in
    /// the datapath.
    fn loopback_set(&self, port: PortHdl, mode: LoopbackMode) -> HalResult<()>;

    /// Have the lane PLLs settled at the configured rate?
    fn pll_ready(&self, port: PortHdl) -> HalResult<bool>;

    /// Has an in-progress rate change completed on all lanes?
    fn rate_change_done(&self, port: PortHdl) -> HalResult<bool>;

    /// Have the receive CDRs locked on all lanes?
    fn cdr_locked(&self, port: PortHdl) -> HalResult<bool>;

    /// Is energy detected on all of the port's receive lanes?
    fn signal_detect(&self, port: PortHdl) -> HalResult<bool>;

    /// Has receive equalization (DFE) adaptation converged on all lanes?
    fn adapt_done(&self, port: PortHdl) -> HalResult<bool>;

    /// Is the receive datapath ready to pass data to the PCS?
    fn rx_ready(&self, port: PortHdl) -> HalResult<bool>;

    /// Read back the PCS status word for this port.
    fn pcs_status(&self, port: PortHdl) -> HalResult<PcsStatus>;

    /// Report the port's operational state up the stack.  Completion is
    /// asynchronous: the implementation confirms with a
    /// [`PortUpdate::OperState`] once the datapath has been updated.
    fn oper_state_set(&self, port: PortHdl, up: bool) -> HalResult<()>;

    /// The operational state most recently reported for this port.
    fn oper_state_get(&self, port: PortHdl) -> HalResult<bool>;

    /// Program the autonegotiation base and next pages.
    fn an_advert_set(
        &self,
        port: PortHdl,
        adv: &AnAdvertisement,
    ) -> HalResult<()>;

    /// Begin autonegotiation with the programmed advertisement.
    fn an_start(&self, port: PortHdl) -> HalResult<()>;

    /// Has the page exchange completed and a common denominator resolved?
    fn an_done(&self, port: PortHdl) -> HalResult<bool>;

    /// Read back the resolved highest common denominator.  Only meaningful
    /// once `an_done` has reported true.
    fn an_hcd(&self, port: PortHdl) -> HalResult<AnHcd>;

    /// Begin link training using the given clause.
    fn lt_start(&self, port: PortHdl, clause: LtClause) -> HalResult<()>;

    /// Has link training converged on all lanes?
    fn lt_done(&self, port: PortHdl) -> HalResult<bool>;

    /// Capture and clear the FEC symbol-error counters.
    fn fec_counters_take(&self, port: PortHdl) -> HalResult<FecCounters>;

    /// Set the pattern generated and checked by the port's lanes.
    fn prbs_cfg_set(
        &self,
        port: PortHdl,
        mode: PortPrbsMode,
    ) -> HalResult<()>;

    /// Accumulated PRBS bit errors across all lanes since the last call.
    fn prbs_errors(&self, port: PortHdl) -> HalResult<u64>;

    /// Register with the hardware layer to receive PortUpdate events.
    fn register_port_update_handler(
        &self,
        updates: std::sync::mpsc::Sender<PortUpdate>,
    ) -> HalResult<()>;
}

#[cfg(test)]
mod tests {
    use super::AnHcd;
    use super::LtClause;
    use common::ports::LaneEncoding;
    use common::ports::PortFec;
    use common::ports::PortSpeed;

    #[test]
    fn test_clause_selection() {
        let hcd = |speed, encoding| AnHcd {
            speed,
            fec: PortFec::Rs,
            encoding,
        };

        assert_eq!(
            LtClause::for_hcd(&hcd(PortSpeed::Speed10G, LaneEncoding::Nrz)),
            LtClause::Cl72
        );
        assert_eq!(
            LtClause::for_hcd(&hcd(PortSpeed::Speed100G, LaneEncoding::Nrz)),
            LtClause::Cl92
        );
        assert_eq!(
            LtClause::for_hcd(&hcd(PortSpeed::Speed50G, LaneEncoding::Pam4)),
            LtClause::Cl136
        );
        assert_eq!(
            LtClause::for_hcd(&hcd(PortSpeed::Speed400G, LaneEncoding::Pam4)),
            LtClause::Cl162
        );
    }
}
