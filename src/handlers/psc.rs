//! Physical-switch (PSC) handlers (`spec.md` §4.3): per-port identity,
//! enumeration, PERST control, and config-space access.

use crate::codec::fmapi::{CfgAccessReq, CfgAccessResp, PscPortCtrlReq, PscPortReq, PscPortResp};
use crate::codec::{Cursor, Writer};
use crate::error::CoreResult;
use crate::model::{project_identity, project_port, CFG_SPACE_SIZE};
use crate::model::Switch;
use crate::opcode::{CfgAccessType, PortCtrlOp};

use super::HandlerEffect;

pub fn handle_psc_id(switch: &Switch, _payload: &[u8]) -> CoreResult<HandlerEffect> {
    let state = switch.lock();
    let info = project_identity(&state);
    drop(state);

    let mut w = Writer::new();
    info.encode(&mut w);
    Ok(HandlerEffect::success(w.into_vec()))
}

/// `PSC_PORT`: out-of-range port ids are skipped, not rejected.
pub fn handle_psc_port(switch: &Switch, payload: &[u8]) -> CoreResult<HandlerEffect> {
    let mut c = Cursor::new(payload);
    let req = PscPortReq::decode(&mut c)?;

    let state = switch.lock();
    let ports = req
        .ports
        .iter()
        .filter_map(|&ppid| state.ports.get(ppid as usize).map(project_port))
        .collect();
    drop(state);

    let resp = PscPortResp { ports };
    let mut w = Writer::new();
    resp.encode(&mut w);
    Ok(HandlerEffect::success(w.into_vec()))
}

/// `PSC_PORT_CTRL`: `ppid < num_ports`; `RESET_PPB` is a no-op in the
/// emulator, the other two opcodes toggle `perst`.
pub fn handle_psc_port_ctrl(switch: &Switch, payload: &[u8]) -> CoreResult<HandlerEffect> {
    let mut c = Cursor::new(payload);
    let req = PscPortCtrlReq::decode(&mut c)?;

    let mut state = switch.lock();
    let Some(op) = PortCtrlOp::from_u8(req.op) else {
        return Ok(HandlerEffect::invalid_input());
    };
    let Some(port) = state.ports.get_mut(req.ppid as usize) else {
        return Ok(HandlerEffect::invalid_input());
    };

    match op {
        PortCtrlOp::AssertPerst => port.perst = true,
        PortCtrlOp::DeassertPerst => port.perst = false,
        PortCtrlOp::ResetPpb => {}
    }
    drop(state);

    Ok(HandlerEffect::success(Vec::new()))
}

/// `PSC_CFG`: byte-enable-masked access into a Port's own 4 KiB config
/// buffer (`spec.md` §4.3).
pub fn handle_psc_cfg(switch: &Switch, payload: &[u8]) -> CoreResult<HandlerEffect> {
    let mut c = Cursor::new(payload);
    let req = CfgAccessReq::decode(&mut c)?;

    let mut state = switch.lock();
    let Some(access) = CfgAccessType::from_u8(req.access_type) else {
        return Ok(HandlerEffect::invalid_input());
    };
    let Some(port) = state.ports.get_mut(req.ppid as usize) else {
        return Ok(HandlerEffect::invalid_input());
    };

    let addr = ((req.ext as u32) << 8 | req.reg as u32) as usize;
    if addr.saturating_add(4) > CFG_SPACE_SIZE {
        return Ok(HandlerEffect::invalid_input());
    }

    let mut data = [0u8; 4];
    match access {
        CfgAccessType::Read => {
            for i in 0..4usize {
                if req.fdbe & (1 << i) != 0 {
                    data[i] = port.cfg[addr + i];
                }
            }
        }
        CfgAccessType::Write => {
            for i in 0..4usize {
                if req.fdbe & (1 << i) != 0 {
                    port.cfg[addr + i] = req.data[i];
                }
            }
        }
    }
    drop(state);

    let resp = CfgAccessResp { data };
    let mut w = Writer::new();
    resp.encode(&mut w);
    Ok(HandlerEffect::success(w.into_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::ReturnCode;

    fn port_req_payload(ports: &[u16]) -> Vec<u8> {
        let mut w = Writer::new();
        PscPortReq { ports: ports.to_vec() }.encode(&mut w);
        w.into_vec()
    }

    /// `spec.md` §8: out-of-range port ids are skipped, not rejected.
    #[test]
    fn psc_port_skips_out_of_range_ids() {
        let switch = Switch::new(32, 4, 8);
        let payload = port_req_payload(&[0, 32, 33]);
        let effect = handle_psc_port(&switch, &payload).unwrap();
        assert_eq!(effect.rc, ReturnCode::Success.as_u16());

        let mut c = Cursor::new(&effect.payload);
        let resp = PscPortResp::decode(&mut c).unwrap();
        assert_eq!(resp.ports.len(), 1);
        assert_eq!(resp.ports[0].ppid, 0);
    }

    #[test]
    fn psc_port_ctrl_toggles_perst() {
        let switch = Switch::new(4, 1, 8);
        let mut w = Writer::new();
        PscPortCtrlReq { ppid: 1, op: 0 }.encode(&mut w);
        let effect = handle_psc_port_ctrl(&switch, &w.into_vec()).unwrap();
        assert_eq!(effect.rc, ReturnCode::Success.as_u16());
        assert!(switch.lock().ports[1].perst);

        let mut w = Writer::new();
        PscPortCtrlReq { ppid: 1, op: 1 }.encode(&mut w);
        handle_psc_port_ctrl(&switch, &w.into_vec()).unwrap();
        assert!(!switch.lock().ports[1].perst);
    }

    #[test]
    fn psc_port_ctrl_rejects_out_of_range_port() {
        let switch = Switch::new(4, 1, 8);
        let mut w = Writer::new();
        PscPortCtrlReq { ppid: 99, op: 0 }.encode(&mut w);
        let effect = handle_psc_port_ctrl(&switch, &w.into_vec()).unwrap();
        assert_eq!(effect.rc, ReturnCode::InvalidInput.as_u16());
    }

    #[test]
    fn psc_cfg_write_then_read_respects_byte_enables() {
        let switch = Switch::new(4, 1, 8);
        let write_req = CfgAccessReq {
            ppid: 0,
            ldid: 0,
            access_type: CfgAccessType::Write as u8,
            ext: 0,
            reg: 0x10,
            fdbe: 0b0011,
            data: [0x11, 0x22, 0x33, 0x44],
        };
        let mut w = Writer::new();
        write_req.encode(&mut w);
        let effect = handle_psc_cfg(&switch, &w.into_vec()).unwrap();
        assert_eq!(effect.rc, ReturnCode::Success.as_u16());

        let read_req = CfgAccessReq {
            ppid: 0,
            ldid: 0,
            access_type: CfgAccessType::Read as u8,
            ext: 0,
            reg: 0x10,
            fdbe: 0b1111,
            data: [0; 4],
        };
        let mut w = Writer::new();
        read_req.encode(&mut w);
        let effect = handle_psc_cfg(&switch, &w.into_vec()).unwrap();
        let mut c = Cursor::new(&effect.payload);
        let resp = CfgAccessResp::decode(&mut c).unwrap();
        // Only bytes 0 and 1 were write-enabled; bytes 2-3 stay zero.
        assert_eq!(resp.data, [0x11, 0x22, 0x00, 0x00]);
    }

    #[test]
    fn psc_cfg_rejects_out_of_range_port() {
        let switch = Switch::new(4, 1, 8);
        let req = CfgAccessReq {
            ppid: 99,
            ldid: 0,
            access_type: CfgAccessType::Read as u8,
            ext: 0,
            reg: 0,
            fdbe: 0xf,
            data: [0; 4],
        };
        let mut w = Writer::new();
        req.encode(&mut w);
        let effect = handle_psc_cfg(&switch, &w.into_vec()).unwrap();
        assert_eq!(effect.rc, ReturnCode::InvalidInput.as_u16());
    }
}
