// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! The per-family table registries.  Each registry is built exactly once,
//! binds its transition hooks while it is still exclusively owned, and is
//! then shared read-only by every port on the ASIC.

use lazy_static::lazy_static;

use crate::engine::StateTable;
use crate::mode::AsicFamily;
use crate::mode::Mode;

mod emulator;
mod gen2;
mod gen3;
pub(crate) mod handlers;

/// Every bring-up table for one ASIC family.
pub struct FsmTables {
    family: AsicFamily,
    dfe: StateTable,
    autoneg: StateTable,
    prbs: StateTable,
    pipe_loopback: StateTable,
    mac_near_loopback: StateTable,
    mac_far_loopback: StateTable,
    pcs_loopback: StateTable,
    sw_model: StateTable,
    tx_only: StateTable,
    emulator: StateTable,
}

impl FsmTables {
    /// Build and validate the full table set for one family.  The tables
    /// are compiled in, so a validation failure here is a build bug; it
    /// panics at first use rather than limping along with a bad table.
    pub fn new(family: AsicFamily) -> Self {
        let built = match family {
            AsicFamily::Gen2 => [
                gen2::dfe(),
                gen2::autoneg(),
                gen2::prbs(),
                gen2::pipe_loopback(),
                gen2::mac_near_loopback(),
                gen2::mac_far_loopback(),
                gen2::pcs_loopback(),
                gen2::tx_only(),
            ],
            AsicFamily::Gen3 => [
                gen3::dfe(),
                gen3::autoneg(),
                gen3::prbs(),
                gen3::pipe_loopback(),
                gen3::mac_near_loopback(),
                gen3::mac_far_loopback(),
                gen3::pcs_loopback(),
                gen3::tx_only(),
            ],
        };
        let [dfe, autoneg, prbs, pipe_loopback, mac_near_loopback, mac_far_loopback, pcs_loopback, tx_only] =
            built.map(|t| t.expect("statically defined table must validate"));

        FsmTables {
            family,
            dfe,
            autoneg,
            prbs,
            pipe_loopback,
            mac_near_loopback,
            mac_far_loopback,
            pcs_loopback,
            sw_model: emulator::sw_model(family)
                .expect("statically defined table must validate"),
            tx_only,
            emulator: emulator::emulator(family)
                .expect("statically defined table must validate"),
        }
    }

    pub fn family(&self) -> AsicFamily {
        self.family
    }

    /// The table driving the given bring-up mode.  Total over `Mode`;
    /// only `Mode::None` (bring-up disabled) has no table.
    pub fn select(&self, mode: Mode) -> Option<&StateTable> {
        match mode {
            Mode::None => None,
            Mode::Dfe => Some(&self.dfe),
            Mode::Autoneg => Some(&self.autoneg),
            Mode::Prbs => Some(&self.prbs),
            Mode::PipeLoopback => Some(&self.pipe_loopback),
            Mode::MacNearLoopback => Some(&self.mac_near_loopback),
            Mode::MacFarLoopback => Some(&self.mac_far_loopback),
            Mode::PcsLoopback => Some(&self.pcs_loopback),
            Mode::SwModel => Some(&self.sw_model),
            Mode::TxOnly => Some(&self.tx_only),
            Mode::Emulator => Some(&self.emulator),
        }
    }

    /// All of this family's tables, for validation sweeps.
    pub fn all(&self) -> impl Iterator<Item = &StateTable> {
        [
            &self.dfe,
            &self.autoneg,
            &self.prbs,
            &self.pipe_loopback,
            &self.mac_near_loopback,
            &self.mac_far_loopback,
            &self.pcs_loopback,
            &self.sw_model,
            &self.tx_only,
            &self.emulator,
        ]
        .into_iter()
    }
}

lazy_static! {
    static ref GEN2_TABLES: FsmTables = FsmTables::new(AsicFamily::Gen2);
    static ref GEN3_TABLES: FsmTables = FsmTables::new(AsicFamily::Gen3);
}

/// The process-wide table registry for one ASIC family.
pub fn tables_for(family: AsicFamily) -> &'static FsmTables {
    match family {
        AsicFamily::Gen2 => &GEN2_TABLES,
        AsicFamily::Gen3 => &GEN3_TABLES,
    }
}

/// Map a configured bring-up mode and ASIC family to the table that
/// drives it.
pub fn select_table(
    mode: Mode,
    family: AsicFamily,
) -> Option<&'static StateTable> {
    tables_for(family).select(mode)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    use common::ports::LaneEncoding;
    use common::ports::PortFec;
    use common::ports::PortSpeed;
    use hal::AnHcd;
    use hal::LtClause;
    use hal::PcsStatus;

    use super::select_table;
    use super::tables_for;
    use crate::context::LinkState;
    use crate::context::PortContext;
    use crate::engine::PortFsmCursor;
    use crate::engine::StateTable;
    use crate::mode::AsicFamily;
    use crate::mode::Mode;
    use crate::states::FsmState;
    use crate::testutil::test_log;
    use crate::testutil::test_port;
    use crate::testutil::FakeHw;

    #[test]
    fn test_selection_totality() {
        for family in AsicFamily::iter() {
            for mode in Mode::iter() {
                let table = select_table(mode, family);
                match mode {
                    Mode::None => assert!(table.is_none()),
                    _ => {
                        let table = table.unwrap();
                        assert_eq!(table.mode(), mode);
                        assert_eq!(table.family(), family);
                    }
                }
            }
        }
    }

    // Re-verify the invariants every registered table was validated
    // against at construction: one End sentinel in the final slot, one
    // Disabled, one Abort, and no transition naming an absent state.
    #[test]
    fn test_table_invariants() {
        for family in AsicFamily::iter() {
            for table in tables_for(family).all() {
                let states: Vec<FsmState> = table.states().collect();
                assert_eq!(
                    states.last(),
                    Some(&FsmState::End),
                    "{table}: End must be the sentinel"
                );
                for singleton in
                    [FsmState::End, FsmState::Disabled, FsmState::Abort]
                {
                    assert_eq!(
                        states.iter().filter(|s| **s == singleton).count(),
                        1,
                        "{table}: exactly one {singleton}"
                    );
                }
                for entry in table.entries() {
                    for target in entry.targets() {
                        assert!(
                            states.contains(&target),
                            "{table}: {} names absent {target}",
                            entry.state()
                        );
                    }
                }
                assert!(states.len() <= 30, "{table}: unexpectedly large");
            }
        }
    }

    struct Harness {
        hw: FakeHw,
        link: LinkState,
        log: slog::Logger,
        cursor: PortFsmCursor,
    }

    impl Harness {
        fn new() -> Self {
            Harness {
                hw: FakeHw::new(),
                link: LinkState::default(),
                log: test_log(),
                cursor: PortFsmCursor::new(),
            }
        }

        // One engine step; returns the state the port lands in.
        fn step(&mut self, table: &StateTable) -> FsmState {
            let mut ctx = PortContext::new(
                &self.log,
                &self.hw,
                test_port(),
                &mut self.link,
            );
            table.run(&mut ctx, &mut self.cursor).unwrap().state
        }
    }

    fn gen2_dfe() -> &'static StateTable {
        select_table(Mode::Dfe, AsicFamily::Gen2).unwrap()
    }

    #[test]
    fn test_dfe_happy_path() {
        let table = gen2_dfe();
        let mut h = Harness::new();

        assert_eq!(h.step(table), FsmState::WaitPllReady);
        assert_eq!(h.hw.get(|s| s.lane_cfgs), 1);

        // Hardware not ready: the port stays put.
        assert_eq!(h.step(table), FsmState::WaitPllReady);
        assert_eq!(h.step(table), FsmState::WaitPllReady);

        h.hw.set(|s| s.pll_ready = true);
        assert_eq!(h.step(table), FsmState::WaitSignalOk);

        h.hw.set(|s| s.signal = true);
        assert_eq!(h.step(table), FsmState::WaitDfeDone);

        h.hw.set(|s| s.adapted = true);
        assert_eq!(h.step(table), FsmState::BerCheckStart);
        assert_eq!(h.step(table), FsmState::BerCheckDone);

        // No symbol errors accumulated: the check passes.
        assert_eq!(h.step(table), FsmState::LinkDown);

        h.hw.set(|s| s.pcs = PcsStatus { up: true, ..Default::default() });
        assert_eq!(h.step(table), FsmState::LinkUp);
        assert!(h.hw.get(|s| s.oper_up));

        // Steady state.
        assert_eq!(h.step(table), FsmState::LinkUp);
        assert_eq!(h.cursor.linkup_counts(), (1, 1));
    }

    // A wait state that never completes must reach Abort via its timeout,
    // and Abort's success transition restarts adaptation at the
    // signal-detect wait rather than Idle.
    #[test]
    fn test_dfe_timeout_aborts_and_restarts() {
        let table = gen2_dfe();
        let mut h = Harness::new();

        assert_eq!(h.step(table), FsmState::WaitPllReady);
        h.hw.set(|s| s.pll_ready = true);
        assert_eq!(h.step(table), FsmState::WaitSignalOk);

        // The signal never arrives.  One call per timeout cycle; the
        // final one routes to Abort.
        let timeout = super::gen2::SIGNAL_TIMEOUT;
        for _ in 0..timeout - 1 {
            assert_eq!(h.step(table), FsmState::WaitSignalOk);
        }
        assert_eq!(h.step(table), FsmState::Abort);
        assert_eq!(h.cursor.stats().get(FsmState::Abort), 1);

        assert_eq!(h.step(table), FsmState::WaitSignalOk);
        assert_eq!(h.cursor.stats().get(FsmState::Abort), 1);
    }

    // Alt3 outcomes bounce the port between LinkUp and RemoteFault
    // without ever being treated as failures.
    #[test]
    fn test_remote_fault_oscillation() {
        let table = gen2_dfe();
        let mut h = Harness::new();
        h.cursor.set_state(FsmState::LinkUp);

        h.hw.set(|s| s.pcs = PcsStatus { up: true, remote_fault: true, ..Default::default() });
        assert_eq!(h.step(table), FsmState::RemoteFault);

        h.hw.set(|s| s.pcs = PcsStatus { up: true, ..Default::default() });
        assert_eq!(h.step(table), FsmState::LinkUp);

        h.hw.set(|s| s.pcs = PcsStatus { up: true, remote_fault: true, ..Default::default() });
        assert_eq!(h.step(table), FsmState::RemoteFault);

        assert_eq!(h.cursor.stats().get(FsmState::Abort), 0);
    }

    // A hardware failure under a handler is absorbed into the error
    // path, never surfaced to the run() caller.
    #[test]
    fn test_hardware_error_routes_to_abort() {
        let table = gen2_dfe();
        let mut h = Harness::new();
        h.cursor.set_state(FsmState::WaitSignalOk);
        h.hw.set(|s| s.fail_op = Some("signal_detect"));

        assert_eq!(h.step(table), FsmState::Abort);
    }

    #[test]
    fn test_remote_fault_local_fault_goes_down() {
        let table = gen2_dfe();
        let mut h = Harness::new();
        h.cursor.set_state(FsmState::RemoteFault);

        h.hw.set(|s| {
            s.pcs = PcsStatus { local_fault: true, ..Default::default() }
        });
        assert_eq!(h.step(table), FsmState::LinkDown);
    }

    #[test]
    fn test_ber_failure_forces_readaptation() {
        let table = gen2_dfe();
        let mut h = Harness::new();
        h.cursor.set_state(FsmState::BerCheckStart);

        assert_eq!(h.step(table), FsmState::BerCheckDone);

        // 1e8 symbol errors over a 100ms window at 100G is far past the
        // 1e-5 threshold.
        h.hw.set(|s| s.fec.symbol_errors = 100_000_000);
        assert_eq!(h.step(table), FsmState::Abort);
        assert!(h.link.last_ber.unwrap() > super::handlers::BER_THRESHOLD);
    }

    // Disabling the port preempts whatever it was doing: from any
    // reachable state, one run lands on the Disabled descriptor's
    // outcome.
    #[test]
    fn test_disable_preempts_every_state() {
        for family in AsicFamily::iter() {
            for table in tables_for(family).all() {
                let states: Vec<FsmState> = table.states().collect();
                for state in states {
                    let mut h = Harness::new();
                    h.cursor.set_state(state);
                    h.hw.set(|s| s.enabled = false);
                    assert_eq!(
                        h.step(table),
                        FsmState::End,
                        "{table}: disable in {state} must end the fsm"
                    );
                }
            }
        }
    }

    #[test]
    fn test_autoneg_gen2_resolves_and_trains() {
        let table = select_table(Mode::Autoneg, AsicFamily::Gen2).unwrap();
        let mut h = Harness::new();

        assert_eq!(h.step(table), FsmState::WaitAutonegDone);
        assert_eq!(h.hw.get(|s| s.an_starts), 1);

        // Page exchange still running.
        assert_eq!(h.step(table), FsmState::WaitAutonegDone);

        h.hw.set(|s| {
            s.an_done = true;
            s.hcd = Some(AnHcd {
                speed: PortSpeed::Speed100G,
                fec: PortFec::Rs,
                encoding: LaneEncoding::Nrz,
            });
        });
        assert_eq!(h.step(table), FsmState::WaitAutonegLtDone);
        assert_eq!(h.hw.get(|s| s.lt_clause), Some(LtClause::Cl92));

        h.hw.set(|s| s.lt_done = true);
        assert_eq!(h.step(table), FsmState::BerCheckStart);
    }

    // The gen3 transition hook must reroute to the wait state matching
    // the negotiated training clause.
    #[test]
    fn test_autoneg_gen3_clause_dispatch() {
        let cases = [
            (PortSpeed::Speed10G, LaneEncoding::Nrz, FsmState::WaitAnLtDoneCl72),
            (PortSpeed::Speed100G, LaneEncoding::Nrz, FsmState::WaitAnLtDoneCl92),
            (PortSpeed::Speed50G, LaneEncoding::Pam4, FsmState::WaitAnLtDoneCl136),
            (PortSpeed::Speed400G, LaneEncoding::Pam4, FsmState::WaitAnLtDoneCl162),
        ];
        let table = select_table(Mode::Autoneg, AsicFamily::Gen3).unwrap();

        for (speed, encoding, want) in cases {
            let mut h = Harness::new();
            h.cursor.set_state(FsmState::WaitAutonegDone);
            h.hw.set(|s| {
                s.an_done = true;
                s.hcd = Some(AnHcd { speed, fec: PortFec::Rs, encoding });
            });

            assert_eq!(h.step(table), FsmState::SelectLtClause);
            assert_eq!(h.step(table), want, "{speed} {encoding}");
        }
    }

    // A failed negotiation releases the lanes and re-arms from Idle.
    #[test]
    fn test_autoneg_abort_restarts_from_idle() {
        let table = select_table(Mode::Autoneg, AsicFamily::Gen2).unwrap();
        let mut h = Harness::new();
        h.cursor.set_state(FsmState::Abort);

        assert_eq!(h.step(table), FsmState::Idle);
        assert_eq!(h.hw.get(|s| s.lane_decfgs), 1);

        // And the next step re-runs the advertisement.
        assert_eq!(h.step(table), FsmState::WaitAutonegDone);
        assert_eq!(h.hw.get(|s| s.an_starts), 1);
    }

    #[test]
    fn test_prbs_monitors_until_disabled() {
        let table = select_table(Mode::Prbs, AsicFamily::Gen2).unwrap();
        let mut h = Harness::new();
        h.hw.set(|s| {
            s.pll_ready = true;
            s.signal = true;
            s.adapted = true;
            s.rx_ready = true;
        });

        assert_eq!(h.step(table), FsmState::WaitPllReady);
        assert_eq!(h.step(table), FsmState::WaitSignalOk);
        assert_eq!(h.step(table), FsmState::WaitDfeDone);
        assert_eq!(h.step(table), FsmState::WaitTestDone);
        assert_eq!(h.step(table), FsmState::MonitorPrbsErrors);
        assert_eq!(
            h.hw.get(|s| s.prbs_mode),
            common::ports::PortPrbsMode::Mission
        );

        // The monitor accumulates checker errors and never leaves on its
        // own.
        h.hw.set(|s| s.prbs_errors = 17);
        assert_eq!(h.step(table), FsmState::MonitorPrbsErrors);
        h.hw.set(|s| s.prbs_errors = 5);
        assert_eq!(h.step(table), FsmState::MonitorPrbsErrors);
        assert_eq!(h.link.prbs_errors, 22);

        h.hw.set(|s| s.enabled = false);
        assert_eq!(h.step(table), FsmState::End);
    }

    // Oper-state changes requested by the handlers complete through the
    // hardware layer's update channel, not synchronously in the caller.
    #[test]
    fn test_oper_state_confirmed_via_update_handler() {
        use hal::LinkOps;
        use hal::PortUpdate;

        let table = gen2_dfe();
        let mut h = Harness::new();
        let (tx, rx) = std::sync::mpsc::channel();
        h.hw.register_port_update_handler(tx).unwrap();

        h.cursor.set_state(FsmState::LinkDown);
        h.hw.set(|s| s.pcs = PcsStatus { up: true, ..Default::default() });
        assert_eq!(h.step(table), FsmState::LinkUp);

        match rx.try_recv() {
            Ok(PortUpdate::OperState { up, .. }) => assert!(up),
            other => panic!("expected an oper-state update, got {other:?}"),
        }
    }

    #[test]
    fn test_sw_model_comes_up_immediately() {
        let table = select_table(Mode::SwModel, AsicFamily::Gen3).unwrap();
        let mut h = Harness::new();

        assert_eq!(h.step(table), FsmState::LinkUp);
        assert!(h.hw.get(|s| s.oper_up));
        assert_eq!(h.step(table), FsmState::LinkUp);
    }

    #[test]
    fn test_pipe_loopback_forces_up() {
        let table =
            select_table(Mode::PipeLoopback, AsicFamily::Gen2).unwrap();
        let mut h = Harness::new();

        assert_eq!(h.step(table), FsmState::LinkUp);
        assert_eq!(
            h.hw.get(|s| s.loopback),
            common::ports::LoopbackMode::Pipe
        );
        assert!(h.hw.get(|s| s.oper_up));
    }

    #[test]
    fn test_run_disabled_out_of_band() {
        let table = gen2_dfe();
        let mut h = Harness::new();

        let mut ctx = PortContext::new(
            &h.log,
            &h.hw,
            test_port(),
            &mut h.link,
        );
        table.run_disabled(&mut ctx).unwrap();
        assert_eq!(h.hw.get(|s| s.lane_decfgs), 1);
        assert!(!h.hw.get(|s| s.oper_up));
        assert!(h.hw.get(|s| s.squelched));
    }

    // Setting the PRBS test pattern is confined to PRBS mode.
    #[test]
    fn test_prbs_pattern_restored_on_disable() {
        let table = select_table(Mode::Prbs, AsicFamily::Gen3).unwrap();
        let mut h = Harness::new();
        h.link.config.prbs_mode = common::ports::PortPrbsMode::Prbs31;

        assert_eq!(h.step(table), FsmState::WaitRateChangeDone);
        assert_eq!(
            h.hw.get(|s| s.prbs_mode),
            common::ports::PortPrbsMode::Prbs31
        );

        h.hw.set(|s| s.enabled = false);
        assert_eq!(h.step(table), FsmState::End);
        assert_eq!(
            h.hw.get(|s| s.prbs_mode),
            common::ports::PortPrbsMode::Mission
        );
    }
}
