// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Port-level configuration types shared between the hardware layer and the
//! bring-up state machines.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

/// The configured speed of a logical port.
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
    Deserialize,
    Serialize,
    JsonSchema,
    strum::EnumIter,
)]
pub enum PortSpeed {
    #[default]
    Speed0G,
    Speed1G,
    Speed10G,
    Speed25G,
    Speed40G,
    Speed50G,
    Speed100G,
    Speed200G,
    Speed400G,
}

impl PortSpeed {
    /// Nominal line rate in bits per second, summed across all lanes of the
    /// port.  Used when converting FEC symbol-error counts into an estimated
    /// bit error rate.
    pub fn bits_per_sec(&self) -> u64 {
        match self {
            PortSpeed::Speed0G => 0,
            PortSpeed::Speed1G => 1_000_000_000,
            PortSpeed::Speed10G => 10_000_000_000,
            PortSpeed::Speed25G => 25_000_000_000,
            PortSpeed::Speed40G => 40_000_000_000,
            PortSpeed::Speed50G => 50_000_000_000,
            PortSpeed::Speed100G => 100_000_000_000,
            PortSpeed::Speed200G => 200_000_000_000,
            PortSpeed::Speed400G => 400_000_000_000,
        }
    }
}

impl fmt::Display for PortSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSpeed::Speed0G => write!(f, "0G"),
            PortSpeed::Speed1G => write!(f, "1G"),
            PortSpeed::Speed10G => write!(f, "10G"),
            PortSpeed::Speed25G => write!(f, "25G"),
            PortSpeed::Speed40G => write!(f, "40G"),
            PortSpeed::Speed50G => write!(f, "50G"),
            PortSpeed::Speed100G => write!(f, "100G"),
            PortSpeed::Speed200G => write!(f, "200G"),
            PortSpeed::Speed400G => write!(f, "400G"),
        }
    }
}

impl FromStr for PortSpeed {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "0g" => Ok(PortSpeed::Speed0G),
            "1g" => Ok(PortSpeed::Speed1G),
            "10g" => Ok(PortSpeed::Speed10G),
            "25g" => Ok(PortSpeed::Speed25G),
            "40g" => Ok(PortSpeed::Speed40G),
            "50g" => Ok(PortSpeed::Speed50G),
            "100g" => Ok(PortSpeed::Speed100G),
            "200g" => Ok(PortSpeed::Speed200G),
            "400g" => Ok(PortSpeed::Speed400G),
            _ => Err("invalid port speed"),
        }
    }
}

/// Error-correction schemes a link may be configured with.
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
    Deserialize,
    Serialize,
    JsonSchema,
)]
pub enum PortFec {
    #[default]
    None,
    /// IEEE clause 74 Firecode
    Firecode,
    /// IEEE clause 91/134 Reed-Solomon
    Rs,
}

impl fmt::Display for PortFec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortFec::None => write!(f, "none"),
            PortFec::Firecode => write!(f, "firecode"),
            PortFec::Rs => write!(f, "rs"),
        }
    }
}

/// Test patterns the serdes lanes can generate and check in PRBS mode.
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
)]
pub enum PortPrbsMode {
    Prbs7,
    Prbs9,
    Prbs11,
    Prbs15,
    Prbs23,
    Prbs31,
    /// Normal operation, no test pattern
    #[default]
    Mission,
}

impl fmt::Display for PortPrbsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortPrbsMode::Prbs7 => write!(f, "prbs7"),
            PortPrbsMode::Prbs9 => write!(f, "prbs9"),
            PortPrbsMode::Prbs11 => write!(f, "prbs11"),
            PortPrbsMode::Prbs15 => write!(f, "prbs15"),
            PortPrbsMode::Prbs23 => write!(f, "prbs23"),
            PortPrbsMode::Prbs31 => write!(f, "prbs31"),
            PortPrbsMode::Mission => write!(f, "mission"),
        }
    }
}

/// Signal encoding
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
)]
pub enum LaneEncoding {
    /// Pulse Amplitude Modulation 4-level
    Pam4,
    /// Non-Return-to-Zero encoding
    Nrz,
    /// No encoding selected
    #[default]
    None,
}

impl fmt::Display for LaneEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneEncoding::Pam4 => write!(f, "pam4"),
            LaneEncoding::Nrz => write!(f, "nrz"),
            LaneEncoding::None => write!(f, "none"),
        }
    }
}

/// Points in the datapath at which transmitted data may be routed back to
/// the receiver for self-test.
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
)]
pub enum LoopbackMode {
    #[default]
    None,
    /// Loop inside the MAC, before the PCS
    MacNear,
    /// Loop received data back toward the partner at the MAC
    MacFar,
    /// Loop at the near-end PCS
    PcsNear,
    /// Loop inside the pipeline, never touching the MAC
    Pipe,
}

impl fmt::Display for LoopbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopbackMode::None => write!(f, "none"),
            LoopbackMode::MacNear => write!(f, "mac-near"),
            LoopbackMode::MacFar => write!(f, "mac-far"),
            LoopbackMode::PcsNear => write!(f, "pcs-near"),
            LoopbackMode::Pipe => write!(f, "pipe"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PortSpeed;

    #[test]
    fn test_parse_speed() {
        assert_eq!(PortSpeed::Speed100G, "100g".parse().unwrap());
        assert_eq!(PortSpeed::Speed100G, "100G".parse().unwrap());
        assert_eq!(PortSpeed::Speed25G, "25g".parse().unwrap());
        assert!("3g".parse::<PortSpeed>().is_err());
        assert!("".parse::<PortSpeed>().is_err());
    }

    #[test]
    fn test_speed_bits() {
        assert_eq!(PortSpeed::Speed0G.bits_per_sec(), 0);
        assert_eq!(PortSpeed::Speed25G.bits_per_sec(), 25_000_000_000);
        assert_eq!(PortSpeed::Speed400G.bits_per_sec(), 400_000_000_000);
    }
}
