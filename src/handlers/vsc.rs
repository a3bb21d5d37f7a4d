//! Virtual-switch (VSC) handlers (`spec.md` §4.3): VCS enumeration and
//! vPPB bind/unbind lifecycle.

use log::info;

use crate::codec::fmapi::{VcsInfoBlk, VscAerReq, VscBindReq, VscInfoReq, VscInfoResp, VscUnbindReq, FM_MAX_VCS_PER_RSP};
use crate::codec::{Cursor, Writer};
use crate::error::CoreResult;
use crate::model::constants::{BindStatus, LDID_UNBOUND, PortState};
use crate::model::{project_vcs, Switch};
use crate::opcode::vsc as op;

use super::{record_bos, HandlerEffect};

/// `VSC_INFO`: skip out-of-range VCS ids, cap the response at
/// `FM_MAX_VCS_PER_RSP` blocks.
pub fn handle_vsc_info(switch: &Switch, payload: &[u8]) -> CoreResult<HandlerEffect> {
    let mut c = Cursor::new(payload);
    let req = VscInfoReq::decode(&mut c)?;

    let state = switch.lock();
    let vcss: Vec<VcsInfoBlk> = req
        .vcss
        .iter()
        .filter_map(|&vcsid| state.vcss.get(vcsid as usize))
        .map(|vcs| project_vcs(vcs, req.vppbid_start, req.vppbid_limit))
        .take(FM_MAX_VCS_PER_RSP)
        .collect();
    drop(state);

    let resp = VscInfoResp { vcss };
    let mut w = Writer::new();
    resp.encode(&mut w);
    Ok(HandlerEffect::success(w.into_vec()))
}

/// `VSC_BIND`: completes synchronously but reports `BACKGROUND_OP_STARTED`
/// on the wire, per `spec.md` §4.3.
pub fn handle_vsc_bind(switch: &Switch, payload: &[u8]) -> CoreResult<HandlerEffect> {
    let mut c = Cursor::new(payload);
    let req = VscBindReq::decode(&mut c)?;

    let mut state = switch.lock();

    let Some(vcs) = state.vcss.get(req.vcsid as usize) else {
        return Ok(HandlerEffect::invalid_input());
    };
    if req.vppbid as usize >= vcs.num() {
        return Ok(HandlerEffect::invalid_input());
    }
    if vcs.vppbs[req.vppbid as usize].bind_status != BindStatus::Unbound {
        return Ok(HandlerEffect::invalid_input());
    }

    let Some(port) = state.ports.get(req.ppid as usize) else {
        return Ok(HandlerEffect::invalid_input());
    };
    if port.state == PortState::Disabled {
        return Ok(HandlerEffect::invalid_input());
    }

    let ld_scoped = req.ldid != LDID_UNBOUND;
    if ld_scoped && !port.is_type3() {
        return Ok(HandlerEffect::invalid_input());
    }
    if port.is_multi_ld() && !ld_scoped {
        return Ok(HandlerEffect::invalid_input());
    }
    if ld_scoped && !port.is_multi_ld() {
        return Ok(HandlerEffect::invalid_input());
    }

    let vcs = &mut state.vcss[req.vcsid as usize];
    let vppb = &mut vcs.vppbs[req.vppbid as usize];
    if ld_scoped {
        vppb.bind_status = BindStatus::BoundLd;
        vppb.ppid = req.ppid;
        vppb.ldid = req.ldid;
    } else {
        vppb.bind_status = BindStatus::BoundPort;
        vppb.ppid = req.ppid;
        vppb.ldid = 0;
    }
    state.ports[req.ppid as usize].state = PortState::Dsp;
    record_bos(&mut state, op::BIND);
    drop(state);

    Ok(HandlerEffect::background_started(Vec::new()))
}

/// `VSC_UNBIND`: restores the vPPB to `{UNBOUND, ppid=0, ldid=0}`
/// (`spec.md` §8 round-trip law).
pub fn handle_vsc_unbind(switch: &Switch, payload: &[u8]) -> CoreResult<HandlerEffect> {
    let mut c = Cursor::new(payload);
    let req = VscUnbindReq::decode(&mut c)?;

    let mut state = switch.lock();

    let Some(vcs) = state.vcss.get(req.vcsid as usize) else {
        return Ok(HandlerEffect::invalid_input());
    };
    if req.vppbid as usize >= vcs.num() {
        return Ok(HandlerEffect::invalid_input());
    }
    let vppb = vcs.vppbs[req.vppbid as usize];
    if matches!(vppb.bind_status, BindStatus::Unbound | BindStatus::InProgress) {
        return Ok(HandlerEffect::invalid_input());
    }
    if vppb.ppid as usize >= state.num_ports() {
        return Ok(HandlerEffect::invalid_input());
    }
    let port_state = state.ports[vppb.ppid as usize].state;
    if !matches!(
        port_state,
        PortState::Binding | PortState::Unbinding | PortState::Usp | PortState::Dsp
    ) {
        return Ok(HandlerEffect::invalid_input());
    }

    let vcs = &mut state.vcss[req.vcsid as usize];
    let vppb = &mut vcs.vppbs[req.vppbid as usize];
    vppb.bind_status = BindStatus::Unbound;
    vppb.ppid = 0;
    vppb.ldid = 0;
    record_bos(&mut state, op::UNBIND);
    drop(state);

    Ok(HandlerEffect::background_started(Vec::new()))
}

/// `VSC_AER`: log only, no error-injection emulation (`spec.md` §4.3).
pub fn handle_vsc_aer(switch: &Switch, payload: &[u8]) -> CoreResult<HandlerEffect> {
    let mut c = Cursor::new(payload);
    let req = VscAerReq::decode(&mut c)?;

    let state = switch.lock();
    let Some(vcs) = state.vcss.get(req.vcsid as usize) else {
        return Ok(HandlerEffect::invalid_input());
    };
    if req.vppbid as usize >= vcs.num() {
        return Ok(HandlerEffect::invalid_input());
    }
    info!("VSC_AER vcs={} vppb={}: no-op", req.vcsid, req.vppbid);
    drop(state);

    Ok(HandlerEffect::success(Vec::new()))
}
