//! Infrastructure (ISC) handlers (`spec.md` §4.3): switch-wide identity,
//! background-operation status, and the inbound message-size limit.

use crate::codec::fmapi::{BosResp, IscIdResp, MsgLimitGetResp, MsgLimitSetReq};
use crate::codec::{Cursor, Writer};
use crate::error::CoreResult;
use crate::model::Switch;

use super::HandlerEffect;

pub fn handle_id(switch: &Switch, _payload: &[u8]) -> CoreResult<HandlerEffect> {
    let state = switch.lock();
    let resp = IscIdResp {
        vid: state.vid,
        did: state.did,
        svid: state.svid,
        ssid: state.ssid,
        sn: state.sn,
        max_msg_size_n: state.max_msg_size_n,
    };
    drop(state);

    let mut w = Writer::new();
    resp.encode(&mut w);
    Ok(HandlerEffect::success(w.into_vec()))
}

pub fn handle_bos(switch: &Switch, _payload: &[u8]) -> CoreResult<HandlerEffect> {
    let state = switch.lock();
    let bos = state.bos;
    drop(state);

    let resp = BosResp {
        running: bos.running,
        pcnt: bos.pcnt,
        opcode: bos.opcode,
        rc: bos.rc,
        ext: bos.ext,
    };
    let mut w = Writer::new();
    resp.encode(&mut w);
    Ok(HandlerEffect::success(w.into_vec()))
}

pub fn handle_msg_limit_get(switch: &Switch, _payload: &[u8]) -> CoreResult<HandlerEffect> {
    let state = switch.lock();
    let resp = MsgLimitGetResp {
        msg_rsp_limit_n: state.msg_rsp_limit_n,
    };
    drop(state);

    let mut w = Writer::new();
    resp.encode(&mut w);
    Ok(HandlerEffect::success(w.into_vec()))
}

/// `MSG_LIMIT_SET`: `8 ≤ limit ≤ 20`.
pub fn handle_msg_limit_set(switch: &Switch, payload: &[u8]) -> CoreResult<HandlerEffect> {
    let mut c = Cursor::new(payload);
    let req = MsgLimitSetReq::decode(&mut c)?;

    let mut state = switch.lock();
    if !(8..=20).contains(&req.limit) {
        return Ok(HandlerEffect::invalid_input());
    }
    state.msg_rsp_limit_n = req.limit;
    drop(state);

    Ok(HandlerEffect::success(Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::ReturnCode;

    fn limit_set_payload(limit: u8) -> Vec<u8> {
        let mut w = Writer::new();
        MsgLimitSetReq { limit }.encode(&mut w);
        w.into_vec()
    }

    /// `spec.md` §8: `limit=7 → INVALID_INPUT`, `limit=20 → SUCCESS`,
    /// `limit=21 → INVALID_INPUT`.
    #[test]
    fn msg_limit_set_boundaries() {
        let switch = Switch::new(4, 1, 8);

        let effect = handle_msg_limit_set(&switch, &limit_set_payload(7)).unwrap();
        assert_eq!(effect.rc, ReturnCode::InvalidInput.as_u16());

        let effect = handle_msg_limit_set(&switch, &limit_set_payload(20)).unwrap();
        assert_eq!(effect.rc, ReturnCode::Success.as_u16());
        assert_eq!(switch.lock().msg_rsp_limit_n, 20);

        let effect = handle_msg_limit_set(&switch, &limit_set_payload(21)).unwrap();
        assert_eq!(effect.rc, ReturnCode::InvalidInput.as_u16());
        // A rejected SET must not mutate the model.
        assert_eq!(switch.lock().msg_rsp_limit_n, 20);
    }

    #[test]
    fn msg_limit_set_accepts_minimum() {
        let switch = Switch::new(4, 1, 8);
        let effect = handle_msg_limit_set(&switch, &limit_set_payload(8)).unwrap();
        assert_eq!(effect.rc, ReturnCode::Success.as_u16());
    }

    #[test]
    fn id_reports_switch_identity() {
        let switch = Switch::new(4, 1, 8);
        let effect = handle_id(&switch, &[]).unwrap();
        let mut c = Cursor::new(&effect.payload);
        let resp = IscIdResp::decode(&mut c).unwrap();
        assert_eq!(resp.vid, switch.lock().vid);
        assert_eq!(resp.max_msg_size_n, switch.lock().max_msg_size_n);
    }

    #[test]
    fn bos_reflects_synchronous_completion_record() {
        let switch = Switch::new(4, 1, 8);
        {
            let mut state = switch.lock();
            super::record_bos(&mut state, 0x5301);
        }
        let effect = handle_bos(&switch, &[]).unwrap();
        let mut c = Cursor::new(&effect.payload);
        let resp = BosResp::decode(&mut c).unwrap();
        assert!(!resp.running);
        assert_eq!(resp.pcnt, 100);
        assert_eq!(resp.opcode, 0x5301);
    }
}
