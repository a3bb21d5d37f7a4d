use bitflags::bitflags;

pub const MAX_PORTS: usize = 256;
pub const MAX_VCSS: usize = 256;
pub const MAX_VPPBS_PER_VCS: usize = 256;
pub const MAX_LDS_PER_MLD: u8 = 16;
pub const CFG_SPACE_SIZE: usize = 4096;
pub const LDID_UNBOUND: u16 = 0xFFFF;

/// `NOT_CXL` sentinel for `Port::dv` on a disconnected / non-CXL port.
pub const DV_NOT_CXL: u8 = 0x00;

bitflags! {
    /// Supported-speed vector, one bit per PCIe generation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PcieSpeedVector: u8 {
        const PCIE1 = 0b0000_0001;
        const PCIE2 = 0b0000_0010;
        const PCIE3 = 0b0000_0100;
        const PCIE4 = 0b0000_1000;
        const PCIE5 = 0b0001_0000;
    }
}

impl Default for PcieSpeedVector {
    fn default() -> Self {
        // PCIE1..PCIE5
        Self::PCIE1 | Self::PCIE2 | Self::PCIE3 | Self::PCIE4 | Self::PCIE5
    }
}

/// A single PCIe link speed, used for `mls`/`cls`/per-catalog-entry `mls`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum PcieLinkSpeed {
    Pcie1 = 1,
    Pcie2 = 2,
    Pcie3 = 3,
    Pcie4 = 4,
    Pcie5 = 5,
}

impl PcieLinkSpeed {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Pcie1),
            2 => Some(Self::Pcie2),
            3 => Some(Self::Pcie3),
            4 => Some(Self::Pcie4),
            5 => Some(Self::Pcie5),
            _ => None,
        }
    }

    pub fn min(self, other: Self) -> Self {
        if self < other {
            self
        } else {
            other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PortState {
    Disabled = 0,
    Binding = 1,
    Unbinding = 2,
    Dsp = 3,
    Usp = 4,
    Fabric = 5,
    Invalid = 6,
}

impl PortState {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Disabled),
            1 => Some(Self::Binding),
            2 => Some(Self::Unbinding),
            3 => Some(Self::Dsp),
            4 => Some(Self::Usp),
            5 => Some(Self::Fabric),
            6 => Some(Self::Invalid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LtssmState {
    Disabled = 0,
    Detect = 1,
    Polling = 2,
    Configuration = 3,
    Recovery = 4,
    L0 = 5,
    L0s = 6,
    L1 = 7,
    L2 = 8,
    LoopBack = 9,
    HotReset = 10,
}

/// Device descriptor type (`dt`): whether and how a connected endpoint
/// speaks CXL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CxlDeviceType {
    None = 0,
    CxlType1 = 1,
    CxlType2 = 2,
    CxlType3 = 3,
    CxlType3Pooled = 4,
    PcieDevice = 5,
}

impl CxlDeviceType {
    /// True for the device types `MPC_CFG`/`MPC_MEM`/`MPC_TMC` require.
    pub fn is_type3(self) -> bool {
        matches!(self, Self::CxlType3 | Self::CxlType3Pooled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VcsState {
    Disabled = 0,
    Enabled = 1,
    Invalid = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BindStatus {
    Unbound = 0,
    InProgress = 1,
    BoundPort = 2,
    BoundLd = 3,
}

/// MLD allocation granularity (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Granularity {
    Mb256 = 0,
    Mb512 = 1,
    Gb1 = 2,
}

impl Granularity {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Mb256),
            1 => Some(Self::Mb512),
            2 => Some(Self::Gb1),
            _ => None,
        }
    }

    /// Allocation quantum in bytes.
    pub fn bytes(self) -> u64 {
        match self {
            Self::Mb256 => 256 * 1024 * 1024,
            Self::Mb512 => 512 * 1024 * 1024,
            Self::Gb1 => 1024 * 1024 * 1024,
        }
    }
}
