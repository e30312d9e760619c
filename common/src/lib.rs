// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! Vocabulary shared by every layer of the port manager: the port
//! configuration enums and the logging setup used by all of the daemons and
//! libraries in this workspace.

pub mod logging;
pub mod ports;
