//! One handler per opcode, each implementing the 10-step pipeline of
//! `spec.md` §4.3.
//!
//! Steps 1 (acquire a response buffer), 2/9 (fill and encode the
//! application header) and 10 (route early failures to the completion
//! queue) are identical across every opcode and are implemented once, in
//! [`crate::dispatcher`]; what lives in this module is steps 3-8 — decode
//! the per-opcode request object, acquire the Model lock, validate,
//! mutate or project, encode the response object, release the lock —
//! which is where each opcode actually differs.
//!
//! `MPC_TMC` is the one handler that does not fit this mold cleanly: it
//! must call an MCC handler while the Model lock from its own step 5 is
//! still held, never re-acquiring it (`spec.md` §9, "Tunneled dispatch
//! without re-entrant locking"). Every opcode family below is therefore
//! split into an **outer** function — registered in the dispatch table,
//! acquires/releases the lock — and an **inner** function that assumes
//! the lock is already held. `mpc::handle_mpc_tmc` (outer) calls
//! `mcc::dispatch_inner` directly instead of going through another
//! opcode's outer function.

pub mod isc;
pub mod mcc;
pub mod mpc;
pub mod psc;
pub mod vsc;

use crate::error::CoreResult;
use crate::model::switch::SwitchState;
use crate::model::Switch;
use crate::opcode::{MessageFamily, ReturnCode};

/// The result of steps 6-8: a return code, the background-started flag,
/// and an already-encoded response payload. `Err` is reserved for the
/// transient/programming failures of `spec.md` §7 that short-circuit to
/// the completion queue rather than producing a normal response.
pub struct HandlerEffect {
    pub rc: u16,
    pub background: bool,
    pub payload: Vec<u8>,
}

impl HandlerEffect {
    pub fn success(payload: Vec<u8>) -> Self {
        HandlerEffect {
            rc: ReturnCode::Success.as_u16(),
            background: false,
            payload,
        }
    }

    pub fn background_started(payload: Vec<u8>) -> Self {
        HandlerEffect {
            rc: ReturnCode::BackgroundOpStarted.as_u16(),
            background: true,
            payload,
        }
    }

    pub fn invalid_input() -> Self {
        HandlerEffect {
            rc: ReturnCode::InvalidInput.as_u16(),
            background: false,
            payload: Vec::new(),
        }
    }

    pub fn unsupported() -> Self {
        HandlerEffect {
            rc: ReturnCode::Unsupported.as_u16(),
            background: false,
            payload: Vec::new(),
        }
    }
}

/// Record the synchronously-completed background operation
/// (`spec.md` §4.3, `VSC_BIND`/`VSC_UNBIND`): the emulator always finishes
/// before responding but still reports background semantics on the wire.
pub fn record_bos(state: &mut SwitchState, opcode: u16) {
    state.bos.running = false;
    state.bos.pcnt = 100;
    state.bos.opcode = opcode;
    state.bos.rc = ReturnCode::Success.as_u16();
    state.bos.ext = 0;
}

pub type FmApiHandlerFn = fn(&Switch, &[u8]) -> CoreResult<HandlerEffect>;

/// Look up the outer handler for an FM-API opcode (`spec.md` §4.4 step 3).
pub fn fm_api_handler(opcode: u16) -> Option<FmApiHandlerFn> {
    use crate::opcode::{isc as o_isc, psc as o_psc, vsc as o_vsc, mpc as o_mpc};
    match opcode {
        o_isc::ID => Some(isc::handle_id),
        o_isc::BOS => Some(isc::handle_bos),
        o_isc::MSG_LIMIT_GET => Some(isc::handle_msg_limit_get),
        o_isc::MSG_LIMIT_SET => Some(isc::handle_msg_limit_set),
        o_psc::ID => Some(psc::handle_psc_id),
        o_psc::PORT => Some(psc::handle_psc_port),
        o_psc::PORT_CTRL => Some(psc::handle_psc_port_ctrl),
        o_psc::CFG => Some(psc::handle_psc_cfg),
        o_vsc::INFO => Some(vsc::handle_vsc_info),
        o_vsc::BIND => Some(vsc::handle_vsc_bind),
        o_vsc::UNBIND => Some(vsc::handle_vsc_unbind),
        o_vsc::AER => Some(vsc::handle_vsc_aer),
        o_mpc::CFG => Some(mpc::handle_mpc_cfg),
        o_mpc::MEM => Some(mpc::handle_mpc_mem),
        o_mpc::TMC => Some(mpc::handle_mpc_tmc),
        _ => None,
    }
}

pub type EmuHandlerFn = fn(&Switch, u8, u8, &[u8]) -> CoreResult<HandlerEffect>;

/// Look up the outer handler for an emulator-control opcode.
pub fn emu_handler(opcode: u8) -> Option<EmuHandlerFn> {
    use crate::opcode::emu;
    match opcode {
        emu::LIST_DEV => Some(crate::handlers::emu_ops::handle_list_dev),
        emu::CONN_DEV => Some(crate::handlers::emu_ops::handle_conn_dev),
        emu::DISCON_DEV => Some(crate::handlers::emu_ops::handle_discon_dev),
        _ => None,
    }
}

pub fn family_unsupported(_family: MessageFamily) -> HandlerEffect {
    HandlerEffect::unsupported()
}

pub mod emu_ops;
