// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

use std::fmt;
use std::str::FromStr;

/// A physical connector on the switch front panel or backplane.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Connector {
    Qsfp(u32),
    Cpu,
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Connector::Qsfp(x) => write!(f, "QSFP({x})"),
            Connector::Cpu => write!(f, "CPU"),
        }
    }
}

/// Identifies a single logical port: a connector and the first of the
/// serdes channels allocated to the port on that connector.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PortHdl {
    pub connector: Connector,
    pub channel: u8,
}

impl PortHdl {
    pub fn new(connector: Connector, channel: u8) -> Self {
        PortHdl { connector, channel }
    }

    pub fn is_cpu(&self) -> bool {
        self.connector == Connector::Cpu
    }
}

impl fmt::Display for PortHdl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.connector {
            Connector::Cpu => write!(f, "CPU"),
            Connector::Qsfp(port) => write!(f, "{}:{}", port, self.channel),
        }
    }
}

impl FromStr for PortHdl {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = "invalid port name";

        if s == "CPU" {
            return Ok(PortHdl::new(Connector::Cpu, 0));
        }
        let (port, channel) = s.split_once(':').ok_or(err)?;
        let port = port.parse::<u32>().map_err(|_| err)?;
        let channel = channel.parse::<u8>().map_err(|_| err)?;
        Ok(PortHdl::new(Connector::Qsfp(port), channel))
    }
}

#[cfg(test)]
mod tests {
    use super::Connector;
    use super::PortHdl;

    #[test]
    fn test_parse_port_hdl() {
        assert_eq!(
            PortHdl::new(Connector::Qsfp(12), 4),
            "12:4".parse().unwrap()
        );
        assert_eq!(PortHdl::new(Connector::Cpu, 0), "CPU".parse().unwrap());

        assert!("12".parse::<PortHdl>().is_err());
        assert!("cpu".parse::<PortHdl>().is_err());
        assert!("12:x".parse::<PortHdl>().is_err());
        assert!(":4".parse::<PortHdl>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        let hdl = PortHdl::new(Connector::Qsfp(3), 0);
        assert_eq!(hdl, hdl.to_string().parse().unwrap());
        let cpu = PortHdl::new(Connector::Cpu, 0);
        assert_eq!(cpu, cpu.to_string().parse().unwrap());
    }
}
