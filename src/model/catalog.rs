use super::constants::{CFG_SPACE_SIZE, CxlDeviceType, Granularity, PcieLinkSpeed};

/// Template for an MLD, used to construct a [`super::mld::Mld`] at
/// `connect` time.
#[derive(Debug, Clone)]
pub struct MldTemplate {
    pub memory_size: u64,
    pub num: u8,
    pub epc: u16,
    pub ttr: u16,
    pub granularity: Granularity,
    pub rng1: Vec<u8>,
    pub rng2: Vec<u8>,
    pub alloc_bw: Vec<u8>,
    pub bw_limit: Vec<u8>,
    /// Whether `connect` should additionally map a backing file.
    pub mmap: bool,
}

/// A device catalog entry, created by the YAML loader and immutable
/// while the switch is serving requests (`spec.md` §3).
#[derive(Debug, Clone)]
pub struct DeviceCatalogEntry {
    pub name: String,
    pub rootport: bool,
    pub dv: u8,
    pub dt: CxlDeviceType,
    pub cv: u8,
    pub mlw: u8,
    pub mls: PcieLinkSpeed,
    pub cfg: Box<[u8; CFG_SPACE_SIZE]>,
    pub mld: Option<MldTemplate>,
}
