// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Per-port state threaded through the handlers.  The state tables
//! themselves are shared and immutable; everything a handler may mutate
//! lives here and is exclusively owned by one port.

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

use common::ports::LaneEncoding;
use common::ports::LoopbackMode;
use common::ports::PortFec;
use common::ports::PortPrbsMode;
use common::ports::PortSpeed;
use hal::AnAdvertisement;
use hal::AnHcd;
use hal::LaneConfig;
use hal::LinkOps;
use hal::PortHdl;

/// The administratively configured parameters for one link.  Set when the
/// link is created and stable while a bring-up mode is active.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct LinkConfig {
    pub speed: PortSpeed,
    pub fec: PortFec,
    pub encoding: LaneEncoding,
    /// Number of serdes lanes backing the link
    pub lanes: u8,
    /// What to advertise when the link runs autonegotiation
    pub autoneg: AnAdvertisement,
    /// Pattern generated and checked in PRBS mode
    pub prbs_mode: PortPrbsMode,
    /// Datapath point looped in the loopback modes
    pub loopback: LoopbackMode,
}

impl LinkConfig {
    /// The lane-level rendering of this configuration.
    pub fn lane_config(&self) -> LaneConfig {
        LaneConfig {
            speed: self.speed,
            fec: self.fec,
            encoding: self.encoding,
            lanes: self.lanes,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            speed: PortSpeed::Speed100G,
            fec: PortFec::Rs,
            encoding: LaneEncoding::Nrz,
            lanes: 4,
            autoneg: AnAdvertisement::default(),
            prbs_mode: PortPrbsMode::Mission,
            loopback: LoopbackMode::None,
        }
    }
}

/// Mutable per-link state owned by the port object, updated only from
/// within that port's own `run` call.
#[derive(Clone, Debug, Default)]
pub struct LinkState {
    pub config: LinkConfig,
    /// The highest common denominator read back after autonegotiation
    pub negotiated: Option<AnHcd>,
    /// Bit error rate estimated by the most recent BER check
    pub last_ber: Option<f64>,
    /// PRBS errors accumulated while monitoring
    pub prbs_errors: u64,
}

/// Everything a handler can see: the hardware, the port identity, the
/// per-link mutable state, and a logger scoped to the port.
pub struct PortContext<'a> {
    pub log: slog::Logger,
    pub ops: &'a dyn LinkOps,
    pub port: PortHdl,
    pub link: &'a mut LinkState,
}

impl<'a> PortContext<'a> {
    pub fn new(
        log: &slog::Logger,
        ops: &'a dyn LinkOps,
        port: PortHdl,
        link: &'a mut LinkState,
    ) -> Self {
        PortContext {
            log: log.new(slog::o!("port" => port.to_string())),
            ops,
            port,
            link,
        }
    }
}
