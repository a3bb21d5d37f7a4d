//! CXL Fabric Management API header and per-opcode payload shapes
//! (`spec.md` §4.1, §6).

use crate::error::{CoreError, CoreResult};
use crate::model::{
    BindStatus, CxlDeviceType, IdentityInfo, LtssmState, PcieLinkSpeed, PcieSpeedVector, PortInfo,
    VcsInfoBlk, VppbInfo,
};

use super::{Cursor, Writer};

/// Maximum number of VCS info blocks returned from a single `VSC_INFO`
/// response (`spec.md` §4.3, `FM_MAX_VCS_PER_RSP`).
pub const FM_MAX_VCS_PER_RSP: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Category {
    Req = 0,
    Resp = 1,
}

impl Category {
    fn from_u8(v: u8) -> CoreResult<Self> {
        match v {
            0 => Ok(Category::Req),
            1 => Ok(Category::Resp),
            other => Err(CoreError::Config(format!("bad FM header category {other}"))),
        }
    }
}

/// 12-byte Fabric Management header (`spec.md` §6):
///
/// ```text
/// byte 0: category[3:0] | tag[7:4]
/// byte 1: reserved
/// bytes 2-3: opcode (le16)
/// bytes 4-6: background[0] | length[23:1] (le24)
/// byte 7: reserved
/// bytes 8-9: rc (le16)
/// bytes 10-11: ext (le16)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FmHeader {
    pub category: Category,
    pub tag: u8,
    pub opcode: u16,
    pub background: bool,
    pub length: u32,
    pub rc: u16,
    pub ext: u16,
}

impl FmHeader {
    pub const SIZE: usize = 12;

    pub fn request(tag: u8, opcode: u16) -> Self {
        FmHeader {
            category: Category::Req,
            tag,
            opcode,
            background: false,
            length: 0,
            rc: 0,
            ext: 0,
        }
    }

    pub fn response(tag: u8, opcode: u16, background: bool, length: u32, rc: u16) -> Self {
        FmHeader {
            category: Category::Resp,
            tag,
            opcode,
            background,
            length,
            rc,
            ext: 0,
        }
    }

    pub fn encode(&self, w: &mut Writer) {
        w.u8((self.category as u8 & 0x0f) | ((self.tag & 0x0f) << 4));
        w.u8(0);
        w.u16(self.opcode);

        let bg_len: u32 = (self.background as u32) | ((self.length & 0x007f_ffff) << 1);
        let b = bg_len.to_le_bytes();
        w.u8(b[0]);
        w.u8(b[1]);
        w.u8(b[2]);
        w.u8(0); // reserved byte 7

        w.u16(self.rc);
        w.u16(self.ext);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        let b0 = c.u8()?;
        let category = Category::from_u8(b0 & 0x0f)?;
        let tag = (b0 >> 4) & 0x0f;
        let _rsvd = c.u8()?;
        let opcode = c.u16()?;

        let lo = c.u8()? as u32;
        let mid = c.u8()? as u32;
        let hi = c.u8()? as u32;
        let _rsvd2 = c.u8()?;
        let bg_len = lo | (mid << 8) | (hi << 16);
        let background = bg_len & 0x1 != 0;
        let length = (bg_len >> 1) & 0x007f_ffff;

        let rc = c.u16()?;
        let ext = c.u16()?;

        Ok(FmHeader {
            category,
            tag,
            opcode,
            background,
            length,
            rc,
            ext,
        })
    }
}

// --- ISC -----------------------------------------------------------

pub struct IscIdResp {
    pub vid: u16,
    pub did: u16,
    pub svid: u16,
    pub ssid: u16,
    pub sn: u64,
    pub max_msg_size_n: u8,
}

impl IscIdResp {
    pub fn encode(&self, w: &mut Writer) {
        w.u16(self.vid);
        w.u16(self.did);
        w.u16(self.svid);
        w.u16(self.ssid);
        w.u64(self.sn);
        w.u8(self.max_msg_size_n);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        Ok(IscIdResp {
            vid: c.u16()?,
            did: c.u16()?,
            svid: c.u16()?,
            ssid: c.u16()?,
            sn: c.u64()?,
            max_msg_size_n: c.u8()?,
        })
    }
}

pub struct BosResp {
    pub running: bool,
    pub pcnt: u8,
    pub opcode: u16,
    pub rc: u16,
    pub ext: u16,
}

impl BosResp {
    pub fn encode(&self, w: &mut Writer) {
        w.bool_u8(self.running);
        w.u8(self.pcnt);
        w.u16(self.opcode);
        w.u16(self.rc);
        w.u16(self.ext);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        Ok(BosResp {
            running: c.bool_u8()?,
            pcnt: c.u8()?,
            opcode: c.u16()?,
            rc: c.u16()?,
            ext: c.u16()?,
        })
    }
}

pub struct MsgLimitGetResp {
    pub msg_rsp_limit_n: u8,
}

impl MsgLimitGetResp {
    pub fn encode(&self, w: &mut Writer) {
        w.u8(self.msg_rsp_limit_n);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        Ok(MsgLimitGetResp {
            msg_rsp_limit_n: c.u8()?,
        })
    }
}

pub struct MsgLimitSetReq {
    pub limit: u8,
}

impl MsgLimitSetReq {
    pub fn encode(&self, w: &mut Writer) {
        w.u8(self.limit);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        Ok(MsgLimitSetReq { limit: c.u8()? })
    }
}

// --- PSC -------------------------------------------------------------

impl IdentityInfo {
    pub fn encode(&self, w: &mut Writer) {
        w.u16(self.vid);
        w.u16(self.did);
        w.u16(self.svid);
        w.u16(self.ssid);
        w.u64(self.sn);
        w.u8(self.ingress_port);
        w.u8(self.num_ports);
        w.u8(self.num_vcss);
        w.u8(self.num_vppbs);
        w.u16(self.num_decoders);
        w.u8(self.max_msg_size_n);
        w.u8(self.msg_rsp_limit_n);
        w.bytes(&self.active_port_bitmap);
        w.bytes(&self.active_vcs_bitmap);
        // Reserved trailer padding out to the documented 44-byte PSC_ID
        // response length for the scenario fixture in `spec.md` §8.
        let written = 16 + 4 + 2 + 1 + 1 + self.active_port_bitmap.len() + self.active_vcs_bitmap.len();
        if written < 44 {
            w.pad(44 - written);
        }
    }
}

pub struct PscPortReq {
    pub ports: Vec<u16>,
}

impl PscPortReq {
    pub fn encode(&self, w: &mut Writer) {
        w.u8(self.ports.len() as u8);
        for &p in &self.ports {
            w.u16(p);
        }
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        let num = c.u8()? as usize;
        let mut ports = Vec::with_capacity(num);
        for _ in 0..num {
            ports.push(c.u16()?);
        }
        Ok(PscPortReq { ports })
    }
}

impl PortInfo {
    pub fn encode(&self, w: &mut Writer) {
        w.u16(self.ppid);
        w.u8(self.state);
        w.u8(self.dv);
        w.u8(self.dt as u8);
        w.u8(self.cv);
        w.u8(self.mlw);
        w.u8(self.nlw);
        w.u8(self.speeds.bits());
        w.u8(self.mls as u8);
        w.u8(self.cls);
        w.u8(self.ltssm as u8);
        w.u8(self.lane);
        w.bool_u8(self.lane_rev);
        w.bool_u8(self.perst);
        w.bool_u8(self.prsnt);
        w.bool_u8(self.pwrctrl);
        w.u8(self.num_ld);
    }

    pub const ENCODED_SIZE: usize = 17;

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        Ok(PortInfo {
            ppid: c.u16()?,
            state: c.u8()?,
            dv: c.u8()?,
            dt: cxl_device_type(c.u8()?)?,
            cv: c.u8()?,
            mlw: c.u8()?,
            nlw: c.u8()?,
            speeds: PcieSpeedVector::from_bits_truncate(c.u8()?),
            mls: pcie_link_speed(c.u8()?)?,
            cls: c.u8()?,
            ltssm: ltssm_state(c.u8()?)?,
            lane: c.u8()?,
            lane_rev: c.bool_u8()?,
            perst: c.bool_u8()?,
            prsnt: c.bool_u8()?,
            pwrctrl: c.bool_u8()?,
            num_ld: c.u8()?,
        })
    }
}

fn cxl_device_type(v: u8) -> CoreResult<CxlDeviceType> {
    Ok(match v {
        0 => CxlDeviceType::None,
        1 => CxlDeviceType::CxlType1,
        2 => CxlDeviceType::CxlType2,
        3 => CxlDeviceType::CxlType3,
        4 => CxlDeviceType::CxlType3Pooled,
        5 => CxlDeviceType::PcieDevice,
        other => return Err(CoreError::Config(format!("bad device type {other}"))),
    })
}

fn pcie_link_speed(v: u8) -> CoreResult<PcieLinkSpeed> {
    PcieLinkSpeed::from_u8(v).ok_or_else(|| CoreError::Config(format!("bad link speed {v}")))
}

fn ltssm_state(v: u8) -> CoreResult<LtssmState> {
    Ok(match v {
        0 => LtssmState::Disabled,
        1 => LtssmState::Detect,
        2 => LtssmState::Polling,
        3 => LtssmState::Configuration,
        4 => LtssmState::Recovery,
        5 => LtssmState::L0,
        6 => LtssmState::L0s,
        7 => LtssmState::L1,
        8 => LtssmState::L2,
        9 => LtssmState::LoopBack,
        10 => LtssmState::HotReset,
        other => return Err(CoreError::Config(format!("bad ltssm state {other}"))),
    })
}

pub struct PscPortResp {
    pub ports: Vec<PortInfo>,
}

impl PscPortResp {
    pub fn encode(&self, w: &mut Writer) {
        w.u8(self.ports.len() as u8);
        for p in &self.ports {
            p.encode(w);
        }
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        let num = c.u8()? as usize;
        let mut ports = Vec::with_capacity(num);
        for _ in 0..num {
            ports.push(PortInfo::decode(c)?);
        }
        Ok(PscPortResp { ports })
    }
}

pub struct PscPortCtrlReq {
    pub ppid: u16,
    pub op: u8,
}

impl PscPortCtrlReq {
    pub fn encode(&self, w: &mut Writer) {
        w.u16(self.ppid);
        w.u8(self.op);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        Ok(PscPortCtrlReq {
            ppid: c.u16()?,
            op: c.u8()?,
        })
    }
}

/// Shared request/response shape for `PSC_CFG` and `MPC_CFG`: a
/// byte-enable-masked access into a 4-byte config-space word.
pub struct CfgAccessReq {
    pub ppid: u16,
    pub ldid: u16,
    pub access_type: u8,
    pub ext: u8,
    pub reg: u16,
    pub fdbe: u8,
    pub data: [u8; 4],
}

impl CfgAccessReq {
    pub fn encode(&self, w: &mut Writer) {
        w.u16(self.ppid);
        w.u16(self.ldid);
        w.u8(self.access_type);
        w.u8(self.ext);
        w.u16(self.reg);
        w.u8(self.fdbe);
        w.bytes(&self.data);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        let ppid = c.u16()?;
        let ldid = c.u16()?;
        let access_type = c.u8()?;
        let ext = c.u8()?;
        let reg = c.u16()?;
        let fdbe = c.u8()?;
        let data_bytes = c.bytes(4)?;
        let mut data = [0u8; 4];
        data.copy_from_slice(data_bytes);
        Ok(CfgAccessReq {
            ppid,
            ldid,
            access_type,
            ext,
            reg,
            fdbe,
            data,
        })
    }
}

pub struct CfgAccessResp {
    pub data: [u8; 4],
}

impl CfgAccessResp {
    pub fn encode(&self, w: &mut Writer) {
        w.bytes(&self.data);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        let b = c.bytes(4)?;
        let mut data = [0u8; 4];
        data.copy_from_slice(b);
        Ok(CfgAccessResp { data })
    }
}

// --- VSC ---------------------------------------------------------------

pub struct VscInfoReq {
    pub vcss: Vec<u16>,
    pub vppbid_start: u16,
    pub vppbid_limit: u16,
}

impl VscInfoReq {
    pub fn encode(&self, w: &mut Writer) {
        w.u8(self.vcss.len() as u8);
        w.u16(self.vppbid_start);
        w.u16(self.vppbid_limit);
        for &v in &self.vcss {
            w.u16(v);
        }
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        let num = c.u8()? as usize;
        let vppbid_start = c.u16()?;
        let vppbid_limit = c.u16()?;
        let mut vcss = Vec::with_capacity(num);
        for _ in 0..num {
            vcss.push(c.u16()?);
        }
        Ok(VscInfoReq {
            vcss,
            vppbid_start,
            vppbid_limit,
        })
    }
}

impl VppbInfo {
    pub fn encode(&self, w: &mut Writer) {
        w.u16(self.vppbid);
        w.u8(self.bind_status as u8);
        w.u16(self.ppid);
        w.u16(self.ldid);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        Ok(VppbInfo {
            vppbid: c.u16()?,
            bind_status: bind_status(c.u8()?)?,
            ppid: c.u16()?,
            ldid: c.u16()?,
        })
    }
}

fn bind_status(v: u8) -> CoreResult<BindStatus> {
    Ok(match v {
        0 => BindStatus::Unbound,
        1 => BindStatus::InProgress,
        2 => BindStatus::BoundPort,
        3 => BindStatus::BoundLd,
        other => return Err(CoreError::Config(format!("bad bind status {other}"))),
    })
}

impl VcsInfoBlk {
    pub fn encode(&self, w: &mut Writer) {
        w.u16(self.vcsid);
        w.u8(self.state);
        w.u16(self.uspid);
        w.u16(self.total_vppbs);
        w.u16(self.vppb_start);
        w.u8(self.vppbs.len() as u8);
        for v in &self.vppbs {
            v.encode(w);
        }
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        let vcsid = c.u16()?;
        let state = c.u8()?;
        let uspid = c.u16()?;
        let total_vppbs = c.u16()?;
        let vppb_start = c.u16()?;
        let num = c.u8()? as usize;
        let mut vppbs = Vec::with_capacity(num);
        for _ in 0..num {
            vppbs.push(VppbInfo::decode(c)?);
        }
        Ok(VcsInfoBlk {
            vcsid,
            state,
            uspid,
            total_vppbs,
            vppb_start,
            vppbs,
        })
    }
}

pub struct VscInfoResp {
    pub vcss: Vec<VcsInfoBlk>,
}

impl VscInfoResp {
    pub fn encode(&self, w: &mut Writer) {
        w.u8(self.vcss.len() as u8);
        for v in &self.vcss {
            v.encode(w);
        }
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        let num = c.u8()? as usize;
        let mut vcss = Vec::with_capacity(num);
        for _ in 0..num {
            vcss.push(VcsInfoBlk::decode(c)?);
        }
        Ok(VscInfoResp { vcss })
    }
}


pub struct VscBindReq {
    pub vcsid: u16,
    pub vppbid: u16,
    pub ppid: u16,
    pub ldid: u16,
}

impl VscBindReq {
    pub fn encode(&self, w: &mut Writer) {
        w.u16(self.vcsid);
        w.u16(self.vppbid);
        w.u16(self.ppid);
        w.u16(self.ldid);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        Ok(VscBindReq {
            vcsid: c.u16()?,
            vppbid: c.u16()?,
            ppid: c.u16()?,
            ldid: c.u16()?,
        })
    }
}

pub struct VscUnbindReq {
    pub vcsid: u16,
    pub vppbid: u16,
}

impl VscUnbindReq {
    pub fn encode(&self, w: &mut Writer) {
        w.u16(self.vcsid);
        w.u16(self.vppbid);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        Ok(VscUnbindReq {
            vcsid: c.u16()?,
            vppbid: c.u16()?,
        })
    }
}

pub struct VscAerReq {
    pub vcsid: u16,
    pub vppbid: u16,
}

impl VscAerReq {
    pub fn encode(&self, w: &mut Writer) {
        w.u16(self.vcsid);
        w.u16(self.vppbid);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        Ok(VscAerReq {
            vcsid: c.u16()?,
            vppbid: c.u16()?,
        })
    }
}

// --- MPC_MEM ---------------------------------------------------------

pub struct MpcMemReq {
    pub ppid: u16,
    pub ldid: u16,
    pub access_type: u8,
    pub offset: u64,
    pub len: u16,
    pub data: Vec<u8>,
}

impl MpcMemReq {
    pub fn encode(&self, w: &mut Writer) {
        w.u16(self.ppid);
        w.u16(self.ldid);
        w.u8(self.access_type);
        w.u64(self.offset);
        w.u16(self.len);
        w.bytes(&self.data);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        let ppid = c.u16()?;
        let ldid = c.u16()?;
        let access_type = c.u8()?;
        let offset = c.u64()?;
        let len = c.u16()?;
        let data = if access_type == crate::opcode::CfgAccessType::Write as u8 {
            c.bytes(len as usize)?.to_vec()
        } else {
            Vec::new()
        };
        Ok(MpcMemReq {
            ppid,
            ldid,
            access_type,
            offset,
            len,
            data,
        })
    }
}

pub struct MpcMemResp {
    pub data: Vec<u8>,
}

impl MpcMemResp {
    pub fn encode(&self, w: &mut Writer) {
        w.bytes(&self.data);
    }

    pub fn decode(c: &mut Cursor<'_>, len: usize) -> CoreResult<Self> {
        Ok(MpcMemResp {
            data: c.bytes(len)?.to_vec(),
        })
    }
}

// --- MPC_TMC -----------------------------------------------------------

/// Inner MCTP type tag for `MPC_TMC`'s tunneled payload; the only value
/// the emulator accepts is `CXLCCI`.
pub const MCTP_TYPE_CXLCCI: u8 = 0x01;

pub struct MpcTmcReq {
    pub ppid: u16,
    pub inner_mctp_type: u8,
    pub inner_payload: Vec<u8>,
}

impl MpcTmcReq {
    pub fn decode(c: &mut Cursor<'_>, remaining_len: usize) -> CoreResult<Self> {
        let ppid = c.u16()?;
        let inner_mctp_type = c.u8()?;
        let consumed = 3;
        let inner_len = remaining_len.saturating_sub(consumed);
        let inner_payload = c.bytes(inner_len)?.to_vec();
        Ok(MpcTmcReq {
            ppid,
            inner_mctp_type,
            inner_payload,
        })
    }
}

pub struct MpcTmcResp {
    pub inner_payload: Vec<u8>,
}

impl MpcTmcResp {
    pub fn encode(&self, w: &mut Writer) {
        w.bytes(&self.inner_payload);
    }
}

// --- MCC (tunneled via MPC_TMC) ----------------------------------------

pub struct MccInfoResp {
    pub memory_size: u64,
    pub num: u8,
    pub epc: u16,
    pub ttr: u16,
}

impl MccInfoResp {
    pub fn encode(&self, w: &mut Writer) {
        w.u64(self.memory_size);
        w.u8(self.num);
        w.u16(self.epc);
        w.u16(self.ttr);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        Ok(MccInfoResp {
            memory_size: c.u64()?,
            num: c.u8()?,
            epc: c.u16()?,
            ttr: c.u16()?,
        })
    }
}

pub struct MccAllocGetReq {
    pub start: u8,
    pub limit: u8,
}

impl MccAllocGetReq {
    pub fn encode(&self, w: &mut Writer) {
        w.u8(self.start);
        w.u8(self.limit);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        Ok(MccAllocGetReq {
            start: c.u8()?,
            limit: c.u8()?,
        })
    }
}

pub struct MccAllocResp {
    pub total: u8,
    pub granularity: u8,
    pub start: u8,
    pub num: u8,
    pub rng1: Vec<u8>,
    pub rng2: Vec<u8>,
}

impl MccAllocResp {
    pub fn encode(&self, w: &mut Writer) {
        w.u8(self.total);
        w.u8(self.granularity);
        w.u8(self.start);
        w.u8(self.num);
        for i in 0..self.num as usize {
            w.u8(self.rng1[i]);
            w.u8(self.rng2[i]);
        }
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        let total = c.u8()?;
        let granularity = c.u8()?;
        let start = c.u8()?;
        let num = c.u8()?;
        let mut rng1 = Vec::with_capacity(num as usize);
        let mut rng2 = Vec::with_capacity(num as usize);
        for _ in 0..num {
            rng1.push(c.u8()?);
            rng2.push(c.u8()?);
        }
        Ok(MccAllocResp {
            total,
            granularity,
            start,
            num,
            rng1,
            rng2,
        })
    }
}

pub struct MccAllocSetReq {
    pub start: u8,
    pub num: u8,
    pub rng1: Vec<u8>,
    pub rng2: Vec<u8>,
}

impl MccAllocSetReq {
    pub fn encode(&self, w: &mut Writer) {
        w.u8(self.start);
        w.u8(self.num);
        for i in 0..self.num as usize {
            w.u8(self.rng1[i]);
            w.u8(self.rng2[i]);
        }
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        let start = c.u8()?;
        let num = c.u8()?;
        let mut rng1 = Vec::with_capacity(num as usize);
        let mut rng2 = Vec::with_capacity(num as usize);
        for _ in 0..num {
            rng1.push(c.u8()?);
            rng2.push(c.u8()?);
        }
        Ok(MccAllocSetReq {
            start,
            num,
            rng1,
            rng2,
        })
    }
}

pub struct QosCtrlBlock {
    pub epc_en: bool,
    pub ttr_en: bool,
    pub egress_mod_pcnt: u8,
    pub egress_sev_pcnt: u8,
    pub sample_interval: u8,
    pub rcb: u8,
    pub comp_interval: u8,
}

impl QosCtrlBlock {
    pub fn encode(&self, w: &mut Writer) {
        w.bool_u8(self.epc_en);
        w.bool_u8(self.ttr_en);
        w.u8(self.egress_mod_pcnt);
        w.u8(self.egress_sev_pcnt);
        w.u8(self.sample_interval);
        w.u8(self.rcb);
        w.u8(self.comp_interval);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        Ok(QosCtrlBlock {
            epc_en: c.bool_u8()?,
            ttr_en: c.bool_u8()?,
            egress_mod_pcnt: c.u8()?,
            egress_sev_pcnt: c.u8()?,
            sample_interval: c.u8()?,
            rcb: c.u8()?,
            comp_interval: c.u8()?,
        })
    }
}

pub struct QosStatResp {
    pub bp_avg_pcnt: u8,
}

impl QosStatResp {
    pub fn encode(&self, w: &mut Writer) {
        w.u8(self.bp_avg_pcnt);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        Ok(QosStatResp {
            bp_avg_pcnt: c.u8()?,
        })
    }
}

pub struct BwListGetReq {
    pub start: u8,
    pub limit: u8,
}

impl BwListGetReq {
    pub fn encode(&self, w: &mut Writer) {
        w.u8(self.start);
        w.u8(self.limit);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        Ok(BwListGetReq {
            start: c.u8()?,
            limit: c.u8()?,
        })
    }
}

pub struct BwListResp {
    pub total: u8,
    pub start: u8,
    pub num: u8,
    pub list: Vec<u8>,
}

impl BwListResp {
    pub fn encode(&self, w: &mut Writer) {
        w.u8(self.total);
        w.u8(self.start);
        w.u8(self.num);
        w.bytes(&self.list);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        let total = c.u8()?;
        let start = c.u8()?;
        let num = c.u8()?;
        let list = super::decode_u8_list(c, num as usize)?;
        Ok(BwListResp {
            total,
            start,
            num,
            list,
        })
    }
}

pub struct BwListSetReq {
    pub start: u8,
    pub num: u8,
    pub list: Vec<u8>,
}

impl BwListSetReq {
    pub fn encode(&self, w: &mut Writer) {
        w.u8(self.start);
        w.u8(self.num);
        w.bytes(&self.list);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        let start = c.u8()?;
        let num = c.u8()?;
        let list = super::decode_u8_list(c, num as usize)?;
        Ok(BwListSetReq { start, num, list })
    }
}
