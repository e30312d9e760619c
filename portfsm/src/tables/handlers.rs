// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/
//
// Copyright 2025 Oxide Computer Company

//! The handler vocabulary the per-mode tables are assembled from.  A
//! handler performs at most one step's worth of hardware access and
//! reports the outcome; all routing policy stays in the tables.

use slog::debug;

use common::ports::LoopbackMode;
use common::ports::PortPrbsMode;
use common::ports::PortSpeed;
use hal::HalResult;
use hal::LtClause;

use crate::context::PortContext;
use crate::states::FsmState;
use crate::states::HandlerError;
use crate::states::HandlerResult;

/// How long a BER check accumulates FEC symbol errors before estimating.
pub(crate) const BER_WINDOW_MS: u32 = 100;

/// Estimated bit error rate above which a BER check fails the link back
/// into re-adaptation instead of letting it come up.
pub(crate) const BER_THRESHOLD: f64 = 1e-5;

// Bits per FEC symbol, for converting symbol errors into bit errors.  A
// symbol error corrupts at most 10 bits.
const FEC_SYMBOL_BITS: u64 = 10;

macro_rules! hw {
    ($call:expr) => {
        match $call {
            Ok(val) => val,
            Err(e) => {
                return HandlerResult::Error(HandlerError::Hardware(e))
            }
        }
    };
}

// Collapse a boolean completion predicate into a handler outcome.
fn poll(result: HalResult<bool>) -> HandlerResult {
    match result {
        Ok(true) => HandlerResult::Success,
        Ok(false) => HandlerResult::NotReady,
        Err(e) => HandlerResult::Error(HandlerError::Hardware(e)),
    }
}

//
// Idle: one-shot mode configuration, unconditional onward transition.
//

pub(crate) fn idle_cfg(ctx: &mut PortContext<'_>) -> HandlerResult {
    hw!(ctx.ops.lane_cfg_set(ctx.port, &ctx.link.config.lane_config()));
    hw!(ctx.ops.tx_squelch_set(ctx.port, false));
    HandlerResult::Success
}

pub(crate) fn idle_autoneg(ctx: &mut PortContext<'_>) -> HandlerResult {
    ctx.link.negotiated = None;
    hw!(ctx.ops.lane_cfg_set(ctx.port, &ctx.link.config.lane_config()));
    hw!(ctx.ops.an_advert_set(ctx.port, &ctx.link.config.autoneg));
    hw!(ctx.ops.tx_squelch_set(ctx.port, false));
    hw!(ctx.ops.an_start(ctx.port));
    HandlerResult::Success
}

pub(crate) fn idle_prbs(ctx: &mut PortContext<'_>) -> HandlerResult {
    ctx.link.prbs_errors = 0;
    hw!(ctx.ops.lane_cfg_set(ctx.port, &ctx.link.config.lane_config()));
    hw!(ctx.ops.prbs_cfg_set(ctx.port, ctx.link.config.prbs_mode));
    hw!(ctx.ops.tx_squelch_set(ctx.port, false));
    HandlerResult::Success
}

pub(crate) fn idle_loopback(ctx: &mut PortContext<'_>) -> HandlerResult {
    hw!(ctx.ops.lane_cfg_set(ctx.port, &ctx.link.config.lane_config()));
    hw!(ctx.ops.loopback_set(ctx.port, ctx.link.config.loopback));
    hw!(ctx.ops.tx_squelch_set(ctx.port, false));
    HandlerResult::Success
}

/// Pipe loopback never leaves the pipeline, so there is no serdes state to
/// wait on; the link is operational as soon as the datapath is looped.
pub(crate) fn idle_pipe_loopback(ctx: &mut PortContext<'_>) -> HandlerResult {
    hw!(ctx.ops.loopback_set(ctx.port, LoopbackMode::Pipe));
    hw!(ctx.ops.oper_state_set(ctx.port, true));
    HandlerResult::Success
}

pub(crate) fn idle_sw_model(ctx: &mut PortContext<'_>) -> HandlerResult {
    hw!(ctx.ops.oper_state_set(ctx.port, true));
    HandlerResult::Success
}

pub(crate) fn idle_tx_only(ctx: &mut PortContext<'_>) -> HandlerResult {
    hw!(ctx.ops.lane_cfg_set(ctx.port, &ctx.link.config.lane_config()));
    hw!(ctx.ops.tx_squelch_set(ctx.port, false));
    HandlerResult::Success
}

//
// WaitX: poll an external completion predicate.
//

pub(crate) fn wait_pll_ready(ctx: &mut PortContext<'_>) -> HandlerResult {
    poll(ctx.ops.pll_ready(ctx.port))
}

pub(crate) fn wait_rate_change_done(
    ctx: &mut PortContext<'_>,
) -> HandlerResult {
    poll(ctx.ops.rate_change_done(ctx.port))
}

pub(crate) fn wait_cdr_lock(ctx: &mut PortContext<'_>) -> HandlerResult {
    poll(ctx.ops.cdr_locked(ctx.port))
}

pub(crate) fn wait_signal_ok(ctx: &mut PortContext<'_>) -> HandlerResult {
    poll(ctx.ops.signal_detect(ctx.port))
}

pub(crate) fn wait_dfe_done(ctx: &mut PortContext<'_>) -> HandlerResult {
    poll(ctx.ops.adapt_done(ctx.port))
}

pub(crate) fn wait_rx_ready(ctx: &mut PortContext<'_>) -> HandlerResult {
    poll(ctx.ops.rx_ready(ctx.port))
}

pub(crate) fn wait_test_done(ctx: &mut PortContext<'_>) -> HandlerResult {
    poll(ctx.ops.rx_ready(ctx.port))
}

pub(crate) fn wait_an_done(ctx: &mut PortContext<'_>) -> HandlerResult {
    poll(ctx.ops.an_done(ctx.port))
}

pub(crate) fn wait_lt_done(ctx: &mut PortContext<'_>) -> HandlerResult {
    poll(ctx.ops.lt_done(ctx.port))
}

//
// Autoneg specifics.
//

/// Gen2 combined autoneg wait: the hardware sequences link training itself
/// as soon as the page exchange resolves, so one state covers both.
pub(crate) fn an_done_start_lt(ctx: &mut PortContext<'_>) -> HandlerResult {
    if !hw!(ctx.ops.an_done(ctx.port)) {
        return HandlerResult::NotReady;
    }
    let hcd = hw!(ctx.ops.an_hcd(ctx.port));
    debug!(
        ctx.log,
        "autoneg resolved {} {} {}", hcd.speed, hcd.fec, hcd.encoding
    );
    hw!(ctx.ops.lt_start(ctx.port, LtClause::for_hcd(&hcd)));
    ctx.link.negotiated = Some(hcd);
    HandlerResult::Success
}

/// Gen3 clause selection: read back the HCD and kick off training.  The
/// transition hook bound on this state routes to the wait state matching
/// the clause chosen here.
pub(crate) fn select_lt_clause(ctx: &mut PortContext<'_>) -> HandlerResult {
    let hcd = hw!(ctx.ops.an_hcd(ctx.port));
    debug!(
        ctx.log,
        "autoneg resolved {} {} {}, training clause {:?}",
        hcd.speed,
        hcd.fec,
        hcd.encoding,
        LtClause::for_hcd(&hcd)
    );
    hw!(ctx.ops.lt_start(ctx.port, LtClause::for_hcd(&hcd)));
    ctx.link.negotiated = Some(hcd);
    HandlerResult::Success
}

/// The transition hook paired with `select_lt_clause`: override the static
/// next state with the per-clause wait state.
pub(crate) fn select_lt_clause_next(
    ctx: &mut PortContext<'_>,
    next: &mut FsmState,
    _wait_ms: &mut u32,
) {
    if let Some(hcd) = &ctx.link.negotiated {
        *next = match LtClause::for_hcd(hcd) {
            LtClause::Cl72 => FsmState::WaitAnLtDoneCl72,
            LtClause::Cl92 => FsmState::WaitAnLtDoneCl92,
            LtClause::Cl136 => FsmState::WaitAnLtDoneCl136,
            LtClause::Cl162 => FsmState::WaitAnLtDoneCl162,
        };
    }
}

//
// BER check: accumulate FEC symbol errors over a fixed window and fail
// the bring-up back into re-adaptation if the estimate is too high.
//

/// Estimated post-adaptation bit error rate from one window's symbol
/// errors.
pub(crate) fn estimated_ber(
    symbol_errors: u64,
    speed: PortSpeed,
    window_ms: u32,
) -> f64 {
    let bits =
        speed.bits_per_sec() as f64 * (window_ms as f64 / 1000.0);
    if bits == 0.0 {
        return 0.0;
    }
    (symbol_errors * FEC_SYMBOL_BITS) as f64 / bits
}

pub(crate) fn ber_check_start(ctx: &mut PortContext<'_>) -> HandlerResult {
    // The counters clear on read; taking them here opens the window.
    hw!(ctx.ops.fec_counters_take(ctx.port));
    HandlerResult::Success
}

pub(crate) fn ber_check_done(ctx: &mut PortContext<'_>) -> HandlerResult {
    let counters = hw!(ctx.ops.fec_counters_take(ctx.port));
    let ber = estimated_ber(
        counters.symbol_errors,
        ctx.link.config.speed,
        BER_WINDOW_MS,
    );
    ctx.link.last_ber = Some(ber);
    if ber > BER_THRESHOLD {
        return HandlerResult::Error(HandlerError::Protocol(format!(
            "estimated BER {ber:.2e} exceeds {BER_THRESHOLD:.0e}"
        )));
    }
    HandlerResult::Success
}

//
// Steady-state monitors.
//

/// Waiting for the PCS to come up.  `Alt2` peels off into RemoteFault when
/// the partner is signalling fault; that is a protocol outcome, not a
/// failure.
pub(crate) fn link_down(ctx: &mut PortContext<'_>) -> HandlerResult {
    let status = hw!(ctx.ops.pcs_status(ctx.port));
    if status.up {
        hw!(ctx.ops.oper_state_set(ctx.port, true));
        HandlerResult::Success
    } else if status.remote_fault {
        HandlerResult::Alt2
    } else {
        HandlerResult::NotReady
    }
}

/// Monitoring an up link for the down event.  `Success` is a clean down
/// (back to LinkDown), `Alt3` a remote fault report.
pub(crate) fn link_up(ctx: &mut PortContext<'_>) -> HandlerResult {
    let status = hw!(ctx.ops.pcs_status(ctx.port));
    if status.remote_fault {
        hw!(ctx.ops.oper_state_set(ctx.port, false));
        HandlerResult::Alt3
    } else if !status.up {
        hw!(ctx.ops.oper_state_set(ctx.port, false));
        HandlerResult::Success
    } else {
        HandlerResult::NotReady
    }
}

/// The partner is signalling fault while our own receive path is fine.
/// Distinguishes local fault (`Alt2`, back to LinkDown), still-faulted
/// (stay), and recovery (`Alt3` when the link is already passing data
/// again, `Success` otherwise).
pub(crate) fn remote_fault(ctx: &mut PortContext<'_>) -> HandlerResult {
    let status = hw!(ctx.ops.pcs_status(ctx.port));
    if status.local_fault {
        HandlerResult::Alt2
    } else if status.remote_fault {
        HandlerResult::NotReady
    } else if status.up {
        hw!(ctx.ops.oper_state_set(ctx.port, true));
        HandlerResult::Alt3
    } else {
        hw!(ctx.ops.oper_state_set(ctx.port, true));
        HandlerResult::Success
    }
}

/// Steady state for modes with nothing to monitor (transmit-only, forced
/// loopbacks, software model): hold position until disabled.
pub(crate) fn hold_up(_ctx: &mut PortContext<'_>) -> HandlerResult {
    HandlerResult::NotReady
}

/// PRBS steady state: accumulate checker errors until disabled.
pub(crate) fn monitor_prbs(ctx: &mut PortContext<'_>) -> HandlerResult {
    let errors = hw!(ctx.ops.prbs_errors(ctx.port));
    if errors > 0 {
        ctx.link.prbs_errors += errors;
        debug!(
            ctx.log,
            "prbs errors: {errors} new, {} total", ctx.link.prbs_errors
        );
    }
    HandlerResult::NotReady
}

//
// Teardown.
//

/// Quiesce after a failed bring-up attempt, leaving the lanes configured
/// so the table can restart from its signal-detect wait.  Idempotent.
pub(crate) fn abort_readapt(ctx: &mut PortContext<'_>) -> HandlerResult {
    hw!(ctx.ops.oper_state_set(ctx.port, false));
    hw!(ctx.ops.tx_squelch_set(ctx.port, true));
    hw!(ctx.ops.tx_squelch_set(ctx.port, false));
    HandlerResult::Success
}

/// Full teardown after a failed negotiation: the advertisement has to be
/// re-armed, so the lanes come down and the table restarts from Idle.
/// Idempotent.
pub(crate) fn abort_restart(ctx: &mut PortContext<'_>) -> HandlerResult {
    hw!(ctx.ops.oper_state_set(ctx.port, false));
    hw!(ctx.ops.tx_squelch_set(ctx.port, true));
    hw!(ctx.ops.lane_decfg(ctx.port));
    HandlerResult::Success
}

/// Terminal teardown for an administratively disabled port.  Runs from
/// any prior state, so every step tolerates already-released hardware.
pub(crate) fn disabled(ctx: &mut PortContext<'_>) -> HandlerResult {
    hw!(ctx.ops.oper_state_set(ctx.port, false));
    hw!(ctx.ops.tx_squelch_set(ctx.port, true));
    if ctx.link.config.prbs_mode != PortPrbsMode::Mission {
        hw!(ctx.ops.prbs_cfg_set(ctx.port, PortPrbsMode::Mission));
    }
    if ctx.link.config.loopback != LoopbackMode::None {
        hw!(ctx.ops.loopback_set(ctx.port, LoopbackMode::None));
    }
    hw!(ctx.ops.lane_decfg(ctx.port));
    HandlerResult::Success
}

#[cfg(test)]
mod tests {
    use super::estimated_ber;
    use super::BER_THRESHOLD;
    use common::ports::PortSpeed;

    #[test]
    fn test_ber_estimate() {
        // No errors, no BER.
        assert_eq!(estimated_ber(0, PortSpeed::Speed100G, 100), 0.0);

        // 100G for 100ms is 1e10 bits; one 10-bit symbol error is 1e-9.
        let ber = estimated_ber(1, PortSpeed::Speed100G, 100);
        assert!((ber - 1e-9).abs() < 1e-12, "ber = {ber}");

        // An unconfigured port can't divide by zero.
        assert_eq!(estimated_ber(5, PortSpeed::Speed0G, 100), 0.0);
    }

    #[test]
    fn test_ber_threshold_boundary() {
        // 1e5 symbol errors at 100G/100ms is exactly 1e-4: over.
        let ber = estimated_ber(100_000, PortSpeed::Speed100G, 100);
        assert!(ber > BER_THRESHOLD);

        // 100 symbol errors is 1e-7: under.
        let ber = estimated_ber(100, PortSpeed::Speed100G, 100);
        assert!(ber < BER_THRESHOLD);
    }
}
