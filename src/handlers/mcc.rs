//! MLD component-command (MCC) inner handlers (`spec.md` §4.3).
//!
//! Reachable only through `MPC_TMC` tunneling — never registered in the
//! main dispatch table — so every function here is an **inner** handler:
//! it assumes the Model lock is already held by the caller
//! (`spec.md` §9, "Tunneled dispatch without re-entrant locking") and
//! never calls [`crate::model::Switch::lock`] itself.

use crate::codec::fmapi::{
    BwListGetReq, BwListResp, BwListSetReq, MccAllocGetReq, MccAllocResp, MccAllocSetReq,
    MccInfoResp, QosCtrlBlock, QosStatResp,
};
use crate::codec::Writer;
use crate::codec::Cursor;
use crate::model::switch::SwitchState;
use crate::opcode::{mcc as op, ReturnCode};

fn invalid() -> (u16, Vec<u8>) {
    (ReturnCode::InvalidInput.as_u16(), Vec::new())
}

fn unsupported() -> (u16, Vec<u8>) {
    (ReturnCode::Unsupported.as_u16(), Vec::new())
}

fn ok(payload: Vec<u8>) -> (u16, Vec<u8>) {
    (ReturnCode::Success.as_u16(), payload)
}

/// Dispatch a decoded inner opcode to its MCC handler. Returns `(rc,
/// payload)` rather than a `Result`: every failure mode this family can
/// hit (bad request bytes, missing MLD, out-of-range indices) is an
/// application-level protocol error reported via `rc`, not a programming
/// fault, so there is nothing left for an outer `Result` to carry.
pub fn dispatch_inner(state: &mut SwitchState, ppid: u16, opcode: u16, payload: &[u8]) -> (u16, Vec<u8>) {
    match opcode {
        op::INFO => inner_info(state, ppid),
        op::ALLOC_GET => inner_alloc_get(state, ppid, payload),
        op::ALLOC_SET => inner_alloc_set(state, ppid, payload),
        op::QOS_CTRL_GET => inner_qos_ctrl_get(state, ppid),
        op::QOS_CTRL_SET => inner_qos_ctrl_set(state, ppid, payload),
        op::QOS_STAT => inner_qos_stat(state, ppid),
        op::QOS_BW_ALLOC_GET => inner_bw_get(state, ppid, payload, true),
        op::QOS_BW_ALLOC_SET => inner_bw_set(state, ppid, payload, true),
        op::QOS_BW_LIMIT_GET => inner_bw_get(state, ppid, payload, false),
        op::QOS_BW_LIMIT_SET => inner_bw_set(state, ppid, payload, false),
        _ => unsupported(),
    }
}

fn inner_info(state: &mut SwitchState, ppid: u16) -> (u16, Vec<u8>) {
    let Some(mld) = state.ports.get(ppid as usize).and_then(|p| p.mld.as_ref()) else {
        return invalid();
    };
    let resp = MccInfoResp {
        memory_size: mld.memory_size,
        num: mld.num,
        epc: mld.epc,
        ttr: mld.ttr,
    };
    let mut w = Writer::new();
    resp.encode(&mut w);
    ok(w.into_vec())
}

/// `MCC_ALLOC_GET`: truncate to the available tail past `start`.
fn inner_alloc_get(state: &mut SwitchState, ppid: u16, payload: &[u8]) -> (u16, Vec<u8>) {
    let mut c = Cursor::new(payload);
    let Ok(req) = MccAllocGetReq::decode(&mut c) else {
        return invalid();
    };
    let Some(mld) = state.ports.get(ppid as usize).and_then(|p| p.mld.as_ref()) else {
        return invalid();
    };
    if req.start > mld.num {
        return invalid();
    }
    let start = req.start as usize;
    let emitted = (req.limit as usize).min((mld.num - req.start) as usize);
    let resp = MccAllocResp {
        total: mld.num,
        granularity: mld.granularity as u8,
        start: req.start,
        num: emitted as u8,
        rng1: mld.rng1[start..start + emitted].to_vec(),
        rng2: mld.rng2[start..start + emitted].to_vec(),
    };
    let mut w = Writer::new();
    resp.encode(&mut w);
    ok(w.into_vec())
}

fn inner_alloc_set(state: &mut SwitchState, ppid: u16, payload: &[u8]) -> (u16, Vec<u8>) {
    let mut c = Cursor::new(payload);
    let Ok(req) = MccAllocSetReq::decode(&mut c) else {
        return invalid();
    };
    let Some(mld) = state.ports.get_mut(ppid as usize).and_then(|p| p.mld.as_mut()) else {
        return invalid();
    };
    if req.num > mld.num || req.start > mld.num || req.start + req.num > mld.num {
        return invalid();
    }
    let start = req.start as usize;
    let num = req.num as usize;
    mld.rng1[start..start + num].copy_from_slice(&req.rng1[..num]);
    mld.rng2[start..start + num].copy_from_slice(&req.rng2[..num]);

    let resp = MccAllocResp {
        total: mld.num,
        granularity: mld.granularity as u8,
        start: req.start,
        num: req.num,
        rng1: mld.rng1[start..start + num].to_vec(),
        rng2: mld.rng2[start..start + num].to_vec(),
    };
    let mut w = Writer::new();
    resp.encode(&mut w);
    ok(w.into_vec())
}

fn inner_qos_ctrl_get(state: &mut SwitchState, ppid: u16) -> (u16, Vec<u8>) {
    let Some(mld) = state.ports.get(ppid as usize).and_then(|p| p.mld.as_ref()) else {
        return invalid();
    };
    let resp = QosCtrlBlock {
        epc_en: mld.epc_en,
        ttr_en: mld.ttr_en,
        egress_mod_pcnt: mld.egress_mod_pcnt,
        egress_sev_pcnt: mld.egress_sev_pcnt,
        sample_interval: mld.sample_interval,
        rcb: mld.rcb,
        comp_interval: mld.comp_interval,
    };
    let mut w = Writer::new();
    resp.encode(&mut w);
    ok(w.into_vec())
}

/// `MCC_QOS_CTRL_SET`: no range validation beyond request decoding — the
/// scalar domains of `spec.md` §3 are not enforced here, matching the
/// documented source behavior (`spec.md` §9).
fn inner_qos_ctrl_set(state: &mut SwitchState, ppid: u16, payload: &[u8]) -> (u16, Vec<u8>) {
    let mut c = Cursor::new(payload);
    let Ok(req) = QosCtrlBlock::decode(&mut c) else {
        return invalid();
    };
    let Some(mld) = state.ports.get_mut(ppid as usize).and_then(|p| p.mld.as_mut()) else {
        return invalid();
    };
    mld.epc_en = req.epc_en;
    mld.ttr_en = req.ttr_en;
    mld.egress_mod_pcnt = req.egress_mod_pcnt;
    mld.egress_sev_pcnt = req.egress_sev_pcnt;
    mld.sample_interval = req.sample_interval;
    mld.rcb = req.rcb;
    mld.comp_interval = req.comp_interval;
    ok(Vec::new())
}

fn inner_qos_stat(state: &mut SwitchState, ppid: u16) -> (u16, Vec<u8>) {
    let Some(mld) = state.ports.get(ppid as usize).and_then(|p| p.mld.as_ref()) else {
        return invalid();
    };
    let resp = QosStatResp {
        bp_avg_pcnt: mld.bp_avg_pcnt,
    };
    let mut w = Writer::new();
    resp.encode(&mut w);
    ok(w.into_vec())
}

fn inner_bw_get(state: &mut SwitchState, ppid: u16, payload: &[u8], alloc: bool) -> (u16, Vec<u8>) {
    let mut c = Cursor::new(payload);
    let Ok(req) = BwListGetReq::decode(&mut c) else {
        return invalid();
    };
    let Some(mld) = state.ports.get(ppid as usize).and_then(|p| p.mld.as_ref()) else {
        return invalid();
    };
    let list = if alloc { &mld.alloc_bw } else { &mld.bw_limit };
    let total = list.len() as u8;
    if req.start > total {
        return invalid();
    }
    let start = req.start as usize;
    let emitted = (req.limit as usize).min((total - req.start) as usize);
    let resp = BwListResp {
        total,
        start: req.start,
        num: emitted as u8,
        list: list[start..start + emitted].to_vec(),
    };
    let mut w = Writer::new();
    resp.encode(&mut w);
    ok(w.into_vec())
}

fn inner_bw_set(state: &mut SwitchState, ppid: u16, payload: &[u8], alloc: bool) -> (u16, Vec<u8>) {
    let mut c = Cursor::new(payload);
    let Ok(req) = BwListSetReq::decode(&mut c) else {
        return invalid();
    };
    let Some(mld) = state.ports.get_mut(ppid as usize).and_then(|p| p.mld.as_mut()) else {
        return invalid();
    };
    let list = if alloc { &mut mld.alloc_bw } else { &mut mld.bw_limit };
    let total = list.len() as u8;
    if req.start > total || req.num > total || req.start + req.num > total {
        return invalid();
    }
    let start = req.start as usize;
    let num = req.num as usize;
    list[start..start + num].copy_from_slice(&req.list[..num]);

    let resp = BwListResp {
        total,
        start: req.start,
        num: req.num,
        list: list[start..start + num].to_vec(),
    };
    let mut w = Writer::new();
    resp.encode(&mut w);
    ok(w.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::catalog::{DeviceCatalogEntry, MldTemplate};
    use crate::model::constants::{CxlDeviceType, Granularity, PcieLinkSpeed, CFG_SPACE_SIZE};
    use crate::model::Switch;

    fn mld_entry() -> DeviceCatalogEntry {
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
                alloc_bw: vec![0x10, 0x20, 0x30, 0x40],
                bw_limit: vec![0xff; 4],
                mmap: false,
            }),
        }
    }

    fn switch_with_mld_on_port2() -> Switch {
        let switch = Switch::new(4, 1, 8);
        {
            let mut state = switch.lock();
            state.connect(2, &mld_entry(), None).unwrap();
        }
        switch
    }

    /// `spec.md` §8: `MCC_ALLOC_GET(start=num)` returns `num=0,
    /// rc=SUCCESS`.
    #[test]
    fn alloc_get_at_tail_returns_empty() {
        let switch = switch_with_mld_on_port2();
        let mut state = switch.lock();
        let mut w = Writer::new();
        MccAllocGetReq { start: 4, limit: 10 }.encode(&mut w);
        let (rc, payload) = dispatch_inner(&mut state, 2, op::ALLOC_GET, &w.into_vec());
        assert_eq!(rc, ReturnCode::Success.as_u16());
        let mut c = Cursor::new(&payload);
        let resp = MccAllocResp::decode(&mut c).unwrap();
        assert_eq!(resp.num, 0);
    }

    #[test]
    fn alloc_get_truncates_to_tail() {
        let switch = switch_with_mld_on_port2();
        let mut state = switch.lock();
        let mut w = Writer::new();
        MccAllocGetReq { start: 2, limit: 10 }.encode(&mut w);
        let (rc, payload) = dispatch_inner(&mut state, 2, op::ALLOC_GET, &w.into_vec());
        assert_eq!(rc, ReturnCode::Success.as_u16());
        let mut c = Cursor::new(&payload);
        let resp = MccAllocResp::decode(&mut c).unwrap();
        assert_eq!(resp.num, 2);
        assert_eq!(resp.rng1, vec![2, 3]);
    }

    #[test]
    fn alloc_set_then_get_round_trips() {
        let switch = switch_with_mld_on_port2();
        let mut state = switch.lock();

        let mut w = Writer::new();
        MccAllocSetReq {
            start: 1,
            num: 2,
            rng1: vec![9, 10],
            rng2: vec![9, 10],
        }
        .encode(&mut w);
        let (rc, _) = dispatch_inner(&mut state, 2, op::ALLOC_SET, &w.into_vec());
        assert_eq!(rc, ReturnCode::Success.as_u16());

        let mut w = Writer::new();
        MccAllocGetReq { start: 0, limit: 4 }.encode(&mut w);
        let (_, payload) = dispatch_inner(&mut state, 2, op::ALLOC_GET, &w.into_vec());
        let mut c = Cursor::new(&payload);
        let resp = MccAllocResp::decode(&mut c).unwrap();
        assert_eq!(resp.rng1, vec![0, 9, 10, 3]);
    }

    /// `spec.md` §8 scenario 5: set bandwidth allocations at `start=1,
    /// num=2`, then read back the whole list.
    #[test]
    fn scenario_qos_bw_alloc_set_then_get() {
        let switch = switch_with_mld_on_port2();
        let mut state = switch.lock();

        let mut w = Writer::new();
        BwListSetReq {
            start: 1,
            num: 2,
            list: vec![0x40, 0x80],
        }
        .encode(&mut w);
        let (rc, _) = dispatch_inner(&mut state, 2, op::QOS_BW_ALLOC_SET, &w.into_vec());
        assert_eq!(rc, ReturnCode::Success.as_u16());

        let mut w = Writer::new();
        BwListGetReq { start: 0, limit: 4 }.encode(&mut w);
        let (_, payload) = dispatch_inner(&mut state, 2, op::QOS_BW_ALLOC_GET, &w.into_vec());
        let mut c = Cursor::new(&payload);
        let resp = BwListResp::decode(&mut c).unwrap();
        assert_eq!(resp.list, vec![0x10, 0x40, 0x80, 0x40]);
    }

    #[test]
    fn qos_ctrl_set_then_get_round_trips() {
        let switch = switch_with_mld_on_port2();
        let mut state = switch.lock();

        let mut w = Writer::new();
        QosCtrlBlock {
            epc_en: true,
            ttr_en: false,
            egress_mod_pcnt: 50,
            egress_sev_pcnt: 90,
            sample_interval: 3,
            rcb: 1,
            comp_interval: 7,
        }
        .encode(&mut w);
        let (rc, _) = dispatch_inner(&mut state, 2, op::QOS_CTRL_SET, &w.into_vec());
        assert_eq!(rc, ReturnCode::Success.as_u16());

        let (_, payload) = dispatch_inner(&mut state, 2, op::QOS_CTRL_GET, &[]);
        let mut c = Cursor::new(&payload);
        let resp = QosCtrlBlock::decode(&mut c).unwrap();
        assert!(resp.epc_en);
        assert_eq!(resp.egress_mod_pcnt, 50);
        assert_eq!(resp.sample_interval, 3);
    }

    /// `spec.md` §9: out-of-domain QoS scalars are accepted without
    /// validation, matching the documented source laxity.
    #[test]
    fn qos_ctrl_set_accepts_out_of_domain_values() {
        let switch = switch_with_mld_on_port2();
        let mut state = switch.lock();

        let mut w = Writer::new();
        QosCtrlBlock {
            epc_en: false,
            ttr_en: false,
            egress_mod_pcnt: 0,
            egress_sev_pcnt: 0,
            sample_interval: 255,
            rcb: 0,
            comp_interval: 0,
        }
        .encode(&mut w);
        let (rc, _) = dispatch_inner(&mut state, 2, op::QOS_CTRL_SET, &w.into_vec());
        assert_eq!(rc, ReturnCode::Success.as_u16());
        assert_eq!(state.ports[2].mld.as_ref().unwrap().sample_interval, 255);
    }

    #[test]
    fn unknown_inner_opcode_is_unsupported() {
        let switch = switch_with_mld_on_port2();
        let mut state = switch.lock();
        let (rc, payload) = dispatch_inner(&mut state, 2, 0x5499, &[]);
        assert_eq!(rc, ReturnCode::Unsupported.as_u16());
        assert!(payload.is_empty());
    }

    #[test]
    fn mcc_handlers_reject_port_without_mld() {
        let switch = Switch::new(4, 1, 8);
        let mut state = switch.lock();
        let (rc, _) = dispatch_inner(&mut state, 0, op::INFO, &[]);
        assert_eq!(rc, ReturnCode::InvalidInput.as_u16());
    }
}
