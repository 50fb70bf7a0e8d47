//! Concrete state handler functions and table builder.
//!
//! Each state is defined by plain `fn` pointers: no closures, no dynamic
//! dispatch.
//!
//! ```text
//!  IDLE ──[engine start / restart]──▶ ARMED
//!                                      │   ▲
//!                    [N consecutive    │   │ [quiet period of
//!                     positives]       ▼   │  consecutive negatives]
//!                                   ALARM ACTIVE
//!
//!  Any state ──[hardware fault / shutdown]──▶ IDLE
//! ```
//!
//! Idle has no outgoing transitions of its own; only the engine leaves it.

use super::context::{Directives, FsmContext};
use super::{EngineState, StateDescriptor};
use log::info;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; EngineState::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: EngineState::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1: Armed
        StateDescriptor {
            id: EngineState::Armed,
            name: "Armed",
            on_enter: Some(armed_enter),
            on_exit: None,
            on_update: armed_update,
        },
        // Index 2: AlarmActive
        StateDescriptor {
            id: EngineState::AlarmActive,
            name: "AlarmActive",
            on_enter: Some(alarm_active_enter),
            on_exit: Some(alarm_active_exit),
            on_update: alarm_active_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE: not coordinating (before start, after a fault or shutdown)
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut FsmContext) {
    // Directives are left as they are: nothing is applied while idle.
    ctx.streaks.reset();
    info!("IDLE: coordination suspended");
}

fn idle_update(_ctx: &mut FsmContext) -> Option<EngineState> {
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  ARMED: sweeping, waiting for persistent motion
// ═══════════════════════════════════════════════════════════════════════════

fn armed_enter(ctx: &mut FsmContext) {
    ctx.directives = Directives::all_clear();
    ctx.streaks.reset();
    info!(
        "ARMED: watching, alarm after {} consecutive motion frames",
        ctx.thresholds.persistence_frames
    );
}

fn armed_update(ctx: &mut FsmContext) -> Option<EngineState> {
    if ctx.motion_confirmed() {
        return Some(EngineState::AlarmActive);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  ALARM ACTIVE: turret held, alarm sounding, clip open
// ═══════════════════════════════════════════════════════════════════════════

fn alarm_active_enter(ctx: &mut FsmContext) {
    ctx.directives = Directives::intruder();
    info!(
        "ALARM: motion persisted for {} frames, holding turret",
        ctx.streaks.positive
    );
}

fn alarm_active_exit(ctx: &mut FsmContext) {
    info!(
        "ALARM: cleared after {} frames in state",
        ctx.ticks_in_state
    );
}

fn alarm_active_update(ctx: &mut FsmContext) -> Option<EngineState> {
    if ctx.quiet_confirmed() {
        return Some(EngineState::Armed);
    }
    None
}
