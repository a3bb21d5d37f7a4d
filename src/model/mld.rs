use std::fs::File;
use std::path::PathBuf;

use memmap2::MmapMut;

use super::constants::{CFG_SPACE_SIZE, Granularity, MAX_LDS_PER_MLD};

/// Memory-mapped backing store for an MLD's address space (`spec.md` §3,
/// §4.2 `connect`). Modeled on the teacher's `MmioRegion`, which likewise
/// pairs a mapping handle with the metadata needed to tear it down.
pub struct BackingMap {
    pub path: PathBuf,
    pub file: File,
    pub mmap: MmapMut,
}

impl std::fmt::Debug for BackingMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackingMap")
            .field("path", &self.path)
            .field("len", &self.mmap.len())
            .finish()
    }
}

/// A Multi-Logical Device owned by a [`super::port::Port`].
#[derive(Debug)]
pub struct Mld {
    pub memory_size: u64,
    pub num: u8,
    pub epc: u16,
    pub ttr: u16,
    pub granularity: Granularity,
    pub rng1: Vec<u8>,
    pub rng2: Vec<u8>,
    pub alloc_bw: Vec<u8>,
    pub bw_limit: Vec<u8>,

    pub epc_en: bool,
    pub ttr_en: bool,
    pub egress_mod_pcnt: u8,
    pub egress_sev_pcnt: u8,
    pub sample_interval: u8,
    pub rcb: u8,
    pub comp_interval: u8,
    pub bp_avg_pcnt: u8,

    pub cfgspace: Vec<Box<[u8; CFG_SPACE_SIZE]>>,
    pub backing: Option<BackingMap>,
}

impl Mld {
    /// Construct an MLD from its template values, clamping `num` to the
    /// 16-LD maximum and allocating per-LD config-space buffers.
    pub fn new(
        memory_size: u64,
        num: u8,
        epc: u16,
        ttr: u16,
        granularity: Granularity,
        rng1: Vec<u8>,
        rng2: Vec<u8>,
        alloc_bw: Vec<u8>,
        bw_limit: Vec<u8>,
    ) -> Self {
        let num = num.min(MAX_LDS_PER_MLD);
        let cfgspace = (0..num)
            .map(|_| Box::new([0u8; CFG_SPACE_SIZE]))
            .collect();

        Mld {
            memory_size,
            num,
            epc,
            ttr,
            granularity,
            rng1,
            rng2,
            alloc_bw,
            bw_limit,
            epc_en: false,
            ttr_en: false,
            egress_mod_pcnt: 1,
            egress_sev_pcnt: 1,
            sample_interval: 0,
            rcb: 0,
            comp_interval: 0,
            bp_avg_pcnt: 0,
            cfgspace,
            backing: None,
        }
    }

    /// Base and size, in bytes, of logical device `ldid`'s address range
    /// (`spec.md` §4.3, `MPC_MEM`).
    pub fn ld_range(&self, ldid: u8) -> (u64, u64) {
        let g = self.granularity.bytes();
        let base = g * self.rng1[ldid as usize] as u64;
        let max = g * (self.rng2[ldid as usize] as u64 + 1);
        (base, max - base)
    }
}
