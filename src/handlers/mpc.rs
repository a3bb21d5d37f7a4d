//! MLD port-control (MPC) handlers (`spec.md` §4.3): per-LD config-space
//! access, the memory-mapped pass-through, and the `MPC_TMC` tunnel.

use crate::codec::fmapi::{CfgAccessReq, CfgAccessResp, FmHeader, MpcMemReq, MpcMemResp, MpcTmcReq, MCTP_TYPE_CXLCCI};
use crate::codec::{Cursor, Writer};
use crate::error::CoreResult;
use crate::model::CFG_SPACE_SIZE;
use crate::model::Switch;
use crate::opcode::CfgAccessType;

use super::{mcc, HandlerEffect};

/// `MPC_CFG`: the same byte-enable access pattern as `PSC_CFG`, but into
/// a specific logical device's config-space buffer.
pub fn handle_mpc_cfg(switch: &Switch, payload: &[u8]) -> CoreResult<HandlerEffect> {
    let mut c = Cursor::new(payload);
    let req = CfgAccessReq::decode(&mut c)?;

    let mut state = switch.lock();
    let Some(access) = CfgAccessType::from_u8(req.access_type) else {
        return Ok(HandlerEffect::invalid_input());
    };
    let Some(port) = state.ports.get_mut(req.ppid as usize) else {
        return Ok(HandlerEffect::invalid_input());
    };
    if !port.is_type3() {
        return Ok(HandlerEffect::invalid_input());
    }
    if req.ldid >= port.ld as u16 {
        return Ok(HandlerEffect::invalid_input());
    }
    let Some(mld) = port.mld.as_mut() else {
        return Ok(HandlerEffect::invalid_input());
    };
    let Some(ld_cfg) = mld.cfgspace.get_mut(req.ldid as usize) else {
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
                    data[i] = ld_cfg[addr + i];
                }
            }
        }
        CfgAccessType::Write => {
            for i in 0..4usize {
                if req.fdbe & (1 << i) != 0 {
                    ld_cfg[addr + i] = req.data[i];
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

/// `MPC_MEM`: 4 KiB-bounded memory pass-through via the backing map
/// (`spec.md` §4.3).
pub fn handle_mpc_mem(switch: &Switch, payload: &[u8]) -> CoreResult<HandlerEffect> {
    let mut c = Cursor::new(payload);
    let req = MpcMemReq::decode(&mut c)?;

    let mut state = switch.lock();
    let Some(port) = state.ports.get_mut(req.ppid as usize) else {
        return Ok(HandlerEffect::invalid_input());
    };
    if !port.is_type3() {
        return Ok(HandlerEffect::invalid_input());
    }
    if req.ldid >= port.ld as u16 {
        return Ok(HandlerEffect::invalid_input());
    }
    if req.len > 4096 {
        return Ok(HandlerEffect::invalid_input());
    }
    let Some(mld) = port.mld.as_mut() else {
        return Ok(HandlerEffect::invalid_input());
    };
    let Some(backing) = mld.backing.as_mut() else {
        return Ok(HandlerEffect::unsupported());
    };

    let (base, ld_size) = mld.ld_range(req.ldid as u8);
    let offset = req.offset;
    let len = req.len as u64;
    if offset + len >= ld_size {
        return Ok(HandlerEffect::invalid_input());
    }

    let start = (base + offset) as usize;
    let end = start + req.len as usize;
    let data = match CfgAccessType::from_u8(req.access_type) {
        Some(CfgAccessType::Read) => backing.mmap[start..end].to_vec(),
        Some(CfgAccessType::Write) => {
            backing.mmap[start..end].copy_from_slice(&req.data);
            Vec::new()
        }
        None => return Ok(HandlerEffect::invalid_input()),
    };
    drop(state);

    let resp = MpcMemResp { data };
    let mut w = Writer::new();
    resp.encode(&mut w);
    Ok(HandlerEffect::success(w.into_vec()))
}

/// `MPC_TMC`: tunnels an inner CCI-message envelope to the matching MCC
/// handler without re-acquiring the Model lock (`spec.md` §4.3, §9).
pub fn handle_mpc_tmc(switch: &Switch, payload: &[u8]) -> CoreResult<HandlerEffect> {
    let mut c = Cursor::new(payload);
    let req = MpcTmcReq::decode(&mut c, payload.len())?;

    let mut state = switch.lock();
    if req.inner_mctp_type != MCTP_TYPE_CXLCCI {
        return Ok(HandlerEffect::invalid_input());
    }
    let Some(port) = state.ports.get(req.ppid as usize) else {
        return Ok(HandlerEffect::invalid_input());
    };
    if !port.is_type3() {
        return Ok(HandlerEffect::invalid_input());
    }

    let mut ic = Cursor::new(&req.inner_payload);
    let inner_frame = match FmHeader::decode(&mut ic) {
        Ok(inner_header) => {
            let body_start = FmHeader::SIZE.min(req.inner_payload.len());
            let inner_body = &req.inner_payload[body_start..];
            let (rc, resp_payload) = mcc::dispatch_inner(&mut state, req.ppid, inner_header.opcode, inner_body);

            let resp_header = FmHeader::response(inner_header.tag, inner_header.opcode, false, resp_payload.len() as u32, rc);
            let mut iw = Writer::new();
            resp_header.encode(&mut iw);
            iw.bytes(&resp_payload);
            iw.into_vec()
        }
        Err(_) => {
            let resp_header = FmHeader::response(0, 0, false, 0, crate::opcode::ReturnCode::InvalidInput.as_u16());
            let mut iw = Writer::new();
            resp_header.encode(&mut iw);
            iw.into_vec()
        }
    };
    drop(state);

    Ok(HandlerEffect::success(inner_frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::fmapi::MccInfoResp;
    use crate::model::catalog::{DeviceCatalogEntry, MldTemplate};
    use crate::model::constants::{CxlDeviceType, Granularity, PcieLinkSpeed, CFG_SPACE_SIZE};
    use crate::opcode::ReturnCode;

    fn mld_entry(mmap: bool) -> DeviceCatalogEntry {
        DeviceCatalogEntry {
            name: "mld_5x8_2.0_4G".into(),
            rootport: false,
            dv: 0x01,
            dt: CxlDeviceType::CxlType3Pooled,
            cv: 0,
            mlw: 16,
            mls: PcieLinkSpeed::Pcie5,
            cfg: Box::new([0u8; CFG_SPACE_SIZE]),
            mld: Some(MldTemplate {
                memory_size: 4 * 1024 * 1024 * 1024,
                num: 4,
                epc: 0,
                ttr: 0,
                granularity: Granularity::Mb256,
                rng1: vec![0, 1, 2, 3],
                rng2: vec![0, 1, 2, 3],
                alloc_bw: vec![0; 4],
                bw_limit: vec![0xff; 4],
                mmap,
            }),
        }
    }

    fn switch_with_backed_mld(dir: &std::path::Path) -> Switch {
        let switch = Switch::new(4, 1, 8);
        {
            let mut state = switch.lock();
            state.connect(1, &mld_entry(true), Some(dir)).unwrap();
        }
        switch
    }

    fn mem_payload(ppid: u16, ldid: u16, access_type: u8, offset: u64, data: &[u8]) -> Vec<u8> {
        let mut w = Writer::new();
        MpcMemReq {
            ppid,
            ldid,
            access_type,
            offset,
            len: data.len() as u16,
            data: data.to_vec(),
        }
        .encode(&mut w);
        w.into_vec()
    }

    /// `spec.md` §8 scenario 4: write then read back the same bytes
    /// through the memory-mapped backing file.
    #[test]
    fn scenario_mpc_mem_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let switch = switch_with_backed_mld(tmp.path());

        let write = mem_payload(1, 0, CfgAccessType::Write as u8, 0x1000, &[0xDE, 0xAD, 0xBE, 0xEF]);
        let effect = handle_mpc_mem(&switch, &write).unwrap();
        assert_eq!(effect.rc, ReturnCode::Success.as_u16());

        let read = mem_payload(1, 0, CfgAccessType::Read as u8, 0x1000, &[0, 0, 0, 0]);
        let effect = handle_mpc_mem(&switch, &read).unwrap();
        let mut c = Cursor::new(&effect.payload);
        let resp = MpcMemResp::decode(&mut c, 4).unwrap();
        assert_eq!(resp.data, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn mpc_mem_without_backing_is_unsupported() {
        let switch = Switch::new(4, 1, 8);
        let mut state = switch.lock();
        state.connect(1, &mld_entry(false), None).unwrap();
        drop(state);

        let read = mem_payload(1, 0, CfgAccessType::Read as u8, 0, &[]);
        let effect = handle_mpc_mem(&switch, &read).unwrap();
        assert_eq!(effect.rc, ReturnCode::Unsupported.as_u16());
    }

    #[test]
    fn mpc_mem_rejects_out_of_range_offset() {
        let tmp = tempfile::tempdir().unwrap();
        let switch = switch_with_backed_mld(tmp.path());
        // LD 0 spans [0, 256MiB); an offset past that must be rejected.
        let read = mem_payload(1, 0, CfgAccessType::Read as u8, 256 * 1024 * 1024, &[0, 0, 0, 0]);
        let effect = handle_mpc_mem(&switch, &read).unwrap();
        assert_eq!(effect.rc, ReturnCode::InvalidInput.as_u16());
    }

    #[test]
    fn mpc_cfg_round_trips_into_ld_buffer() {
        let switch = Switch::new(4, 1, 8);
        {
            let mut state = switch.lock();
            state.connect(1, &mld_entry(false), None).unwrap();
        }

        let write_req = CfgAccessReq {
            ppid: 1,
            ldid: 2,
            access_type: CfgAccessType::Write as u8,
            ext: 0,
            reg: 0x20,
            fdbe: 0b1111,
            data: [1, 2, 3, 4],
        };
        let mut w = Writer::new();
        write_req.encode(&mut w);
        handle_mpc_cfg(&switch, &w.into_vec()).unwrap();

        let read_req = CfgAccessReq {
            ppid: 1,
            ldid: 2,
            access_type: CfgAccessType::Read as u8,
            ext: 0,
            reg: 0x20,
            fdbe: 0b1111,
            data: [0; 4],
        };
        let mut w = Writer::new();
        read_req.encode(&mut w);
        let effect = handle_mpc_cfg(&switch, &w.into_vec()).unwrap();
        let mut c = Cursor::new(&effect.payload);
        let resp = CfgAccessResp::decode(&mut c).unwrap();
        assert_eq!(resp.data, [1, 2, 3, 4]);

        // A different LD's buffer must be untouched.
        let other_read = CfgAccessReq {
            ppid: 1,
            ldid: 0,
            access_type: CfgAccessType::Read as u8,
            ext: 0,
            reg: 0x20,
            fdbe: 0b1111,
            data: [0; 4],
        };
        let mut w = Writer::new();
        other_read.encode(&mut w);
        let effect = handle_mpc_cfg(&switch, &w.into_vec()).unwrap();
        let mut c = Cursor::new(&effect.payload);
        let resp = CfgAccessResp::decode(&mut c).unwrap();
        assert_eq!(resp.data, [0, 0, 0, 0]);
    }

    #[test]
    fn mpc_cfg_rejects_non_type3_port() {
        let switch = Switch::new(4, 1, 8);
        let req = CfgAccessReq {
            ppid: 0,
            ldid: 0,
            access_type: CfgAccessType::Read as u8,
            ext: 0,
            reg: 0,
            fdbe: 0xf,
            data: [0; 4],
        };
        let mut w = Writer::new();
        req.encode(&mut w);
        let effect = handle_mpc_cfg(&switch, &w.into_vec()).unwrap();
        assert_eq!(effect.rc, ReturnCode::InvalidInput.as_u16());
    }

    /// `MPC_TMC` tunnels an `MCC_INFO` request to the MLD on port 1 while
    /// holding the Model lock throughout (`spec.md` §9).
    #[test]
    fn mpc_tmc_tunnels_mcc_info() {
        let switch = Switch::new(4, 1, 8);
        {
            let mut state = switch.lock();
            state.connect(1, &mld_entry(false), None).unwrap();
        }

        let inner_header = FmHeader::request(0, crate::opcode::mcc::INFO);
        let mut iw = Writer::new();
        inner_header.encode(&mut iw);
        let inner_payload = iw.into_vec();

        let outer = MpcTmcReq {
            ppid: 1,
            inner_mctp_type: MCTP_TYPE_CXLCCI,
            inner_payload,
        };
        let mut w = Writer::new();
        w.u16(outer.ppid);
        w.u8(outer.inner_mctp_type);
        w.bytes(&outer.inner_payload);

        let effect = handle_mpc_tmc(&switch, &w.into_vec()).unwrap();
        assert_eq!(effect.rc, ReturnCode::Success.as_u16());

        let mut c = Cursor::new(&effect.payload);
        let inner_resp_header = FmHeader::decode(&mut c).unwrap();
        assert_eq!(inner_resp_header.rc, ReturnCode::Success.as_u16());
        let resp = MccInfoResp::decode(&mut c).unwrap();
        assert_eq!(resp.num, 4);
    }
}
