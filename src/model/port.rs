use super::constants::{
    CFG_SPACE_SIZE, CxlDeviceType, DV_NOT_CXL, LtssmState, PcieLinkSpeed, PcieSpeedVector,
    PortState,
};
use super::mld::Mld;

/// A physical port, indexed `0..num_ports` (`spec.md` §3).
#[derive(Debug)]
pub struct Port {
    pub ppid: u16,
    pub state: PortState,

    pub dv: u8,
    pub dt: CxlDeviceType,
    pub cv: u8,

    pub mlw: u8,
    pub nlw: u8,
    pub speeds: PcieSpeedVector,
    pub mls: PcieLinkSpeed,
    pub cls: Option<PcieLinkSpeed>,
    pub ltssm: LtssmState,
    pub lane: u8,
    pub lane_rev: bool,

    pub perst: bool,
    pub prsnt: bool,
    pub pwrctrl: bool,

    /// Additional logical devices beyond the first; `0` for non-MLD ports.
    pub ld: u8,

    pub cfg: Box<[u8; CFG_SPACE_SIZE]>,
    pub mld: Option<Mld>,
    pub device_name: Option<String>,
}

impl Port {
    /// Construct a freshly reset port with the switch-wide per-port
    /// defaults applied (`spec.md` §4.2 `Switch::new`).
    pub fn new(ppid: u16, mlw: u8, speeds: PcieSpeedVector, mls: PcieLinkSpeed) -> Self {
        Port {
            ppid,
            state: PortState::Disabled,
            dv: DV_NOT_CXL,
            dt: CxlDeviceType::None,
            cv: 0,
            mlw,
            nlw: 0,
            speeds,
            mls,
            cls: None,
            ltssm: LtssmState::Disabled,
            lane: 0,
            lane_rev: false,
            perst: false,
            prsnt: false,
            pwrctrl: false,
            ld: 0,
            cfg: Box::new([0u8; CFG_SPACE_SIZE]),
            mld: None,
            device_name: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.prsnt
    }

    /// True if this port is a CXL Type-3 or Type-3-Pooled endpoint,
    /// the gate `MPC_CFG`/`MPC_MEM`/`MPC_TMC` validate against.
    pub fn is_type3(&self) -> bool {
        self.dt.is_type3()
    }

    /// True if the port hosts multiple logical devices.
    pub fn is_multi_ld(&self) -> bool {
        self.ld > 0
    }
}
