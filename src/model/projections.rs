//! Read-only projections of Model state into the plain shapes the codec
//! encodes onto the wire (`spec.md` §4.2: `project_identity`,
//! `project_port`, `project_vcs`).

use super::constants::{BindStatus, CxlDeviceType, LtssmState, PcieLinkSpeed, PcieSpeedVector};
use super::port::Port;
use super::switch::SwitchState;
use super::vcs::Vcs;

/// `project_identity(switch)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityInfo {
    pub vid: u16,
    pub did: u16,
    pub svid: u16,
    pub ssid: u16,
    pub sn: u64,
    pub ingress_port: u8,
    pub num_ports: u8,
    pub num_vcss: u8,
    pub num_vppbs: u8,
    pub num_decoders: u16,
    pub max_msg_size_n: u8,
    pub msg_rsp_limit_n: u8,
    /// `ceil(num_ports/8)` bytes, bit `i` set iff port `i` is present.
    pub active_port_bitmap: Vec<u8>,
    /// `ceil(num_vcss/8)` bytes, bit `i` set iff VCS `i` is enabled.
    pub active_vcs_bitmap: Vec<u8>,
}

fn bitmap<I: Iterator<Item = bool>>(flags: I, count: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; count.div_ceil(8)];
    for (i, set) in flags.enumerate() {
        if set {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

/// Build the identity projection from the current switch state.
pub fn project_identity(state: &SwitchState) -> IdentityInfo {
    let num_ports = state.ports.len();
    let num_vcss = state.vcss.len();
    let num_vppbs: usize = state.vcss.iter().map(|v| v.num()).sum();

    let active_port_bitmap = bitmap(state.ports.iter().map(|p| p.prsnt), num_ports);
    let active_vcs_bitmap = bitmap(
        state
            .vcss
            .iter()
            .map(|v| !matches!(v.state, super::constants::VcsState::Disabled)),
        num_vcss,
    );

    IdentityInfo {
        vid: state.vid,
        did: state.did,
        svid: state.svid,
        ssid: state.ssid,
        sn: state.sn,
        ingress_port: state.ingress_port,
        num_ports: num_ports as u8,
        num_vcss: num_vcss as u8,
        num_vppbs: num_vppbs as u8,
        num_decoders: state.num_decoders,
        max_msg_size_n: state.max_msg_size_n,
        msg_rsp_limit_n: state.msg_rsp_limit_n,
        active_port_bitmap,
        active_vcs_bitmap,
    }
}

/// `project_port(port)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub ppid: u16,
    pub state: u8,
    pub dv: u8,
    pub dt: CxlDeviceType,
    pub cv: u8,
    pub mlw: u8,
    pub nlw: u8,
    pub speeds: PcieSpeedVector,
    pub mls: PcieLinkSpeed,
    pub cls: u8,
    pub ltssm: LtssmState,
    pub lane: u8,
    pub lane_rev: bool,
    pub perst: bool,
    pub prsnt: bool,
    pub pwrctrl: bool,
    pub num_ld: u8,
}

pub fn project_port(port: &Port) -> PortInfo {
    PortInfo {
        ppid: port.ppid,
        state: port.state as u8,
        dv: port.dv,
        dt: port.dt,
        cv: port.cv,
        mlw: port.mlw,
        nlw: port.nlw,
        speeds: port.speeds,
        mls: port.mls,
        cls: port.cls.map(|c| c as u8).unwrap_or(0),
        ltssm: port.ltssm,
        lane: port.lane,
        lane_rev: port.lane_rev,
        perst: port.perst,
        prsnt: port.prsnt,
        pwrctrl: port.pwrctrl,
        num_ld: port.ld,
    }
}

/// `project_vcs(vcs, vppb_start, vppb_limit)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VppbInfo {
    pub vppbid: u16,
    pub bind_status: BindStatus,
    pub ppid: u16,
    pub ldid: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsInfoBlk {
    pub vcsid: u16,
    pub state: u8,
    pub uspid: u16,
    pub total_vppbs: u16,
    pub vppb_start: u16,
    pub vppbs: Vec<VppbInfo>,
}

/// Project a window `[vppb_start, vppb_start+vppb_limit)` of a VCS's
/// vPPB array (`spec.md` §4.2, used by `VSC_INFO`).
pub fn project_vcs(vcs: &Vcs, vppb_start: u16, vppb_limit: u16) -> VcsInfoBlk {
    let total = vcs.num() as u16;
    let start = vppb_start.min(total) as usize;
    let end = (start + vppb_limit as usize).min(vcs.vppbs.len());

    let vppbs = vcs.vppbs[start..end]
        .iter()
        .map(|v| VppbInfo {
            vppbid: v.vppbid,
            bind_status: v.bind_status,
            ppid: v.ppid,
            ldid: v.ldid,
        })
        .collect();

    VcsInfoBlk {
        vcsid: vcs.vcsid,
        state: vcs.state as u8,
        uspid: vcs.uspid,
        total_vppbs: total,
        vppb_start: start as u16,
        vppbs,
    }
}
