// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::fmt;

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// The bring-up mode configured for a link.  Which state table drives the
/// link is a pure function of the mode and the ASIC family.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    JsonSchema,
    strum::EnumIter,
)]
pub enum Mode {
    /// Bring-up disabled; no table drives the link
    #[default]
    None,
    /// Fixed-speed bring-up with receive-equalization adaptation
    Dfe,
    /// IEEE autonegotiation and link training
    Autoneg,
    /// Pattern generation/checking for bit-error-rate qualification
    Prbs,
    PipeLoopback,
    MacNearLoopback,
    MacFarLoopback,
    PcsLoopback,
    /// Software model of the ASIC; no hardware latencies
    SwModel,
    /// Transmit enabled, receiver ignored
    TxOnly,
    /// RTL emulator; hardware latencies stretched by orders of magnitude
    Emulator,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::None => "none",
            Mode::Dfe => "dfe",
            Mode::Autoneg => "autoneg",
            Mode::Prbs => "prbs",
            Mode::PipeLoopback => "pipe-loopback",
            Mode::MacNearLoopback => "mac-near-loopback",
            Mode::MacFarLoopback => "mac-far-loopback",
            Mode::PcsLoopback => "pcs-loopback",
            Mode::SwModel => "sw-model",
            Mode::TxOnly => "tx-only",
            Mode::Emulator => "emulator",
        };
        write!(f, "{name}")
    }
}

/// The ASIC generations whose bring-up sequences differ enough to carry
/// separate tables.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    JsonSchema,
    strum::EnumIter,
)]
pub enum AsicFamily {
    /// Second-generation silicon: NRZ serdes, hardware-sequenced link
    /// training
    Gen2,
    /// Third-generation silicon: PAM4 serdes, per-clause link training,
    /// explicit rate-change and CDR-lock steps
    Gen3,
}

impl fmt::Display for AsicFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsicFamily::Gen2 => write!(f, "gen2"),
            AsicFamily::Gen3 => write!(f, "gen3"),
        }
    }
}
