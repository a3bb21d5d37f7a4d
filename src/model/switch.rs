use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::{debug, warn};
use memmap2::MmapMut;

use super::catalog::DeviceCatalogEntry;
use super::constants::{
    CFG_SPACE_SIZE, LtssmState, MAX_PORTS, MAX_VCSS, MAX_VPPBS_PER_VCS, PcieLinkSpeed,
    PcieSpeedVector, PortState,
};
use super::mld::{BackingMap, Mld};
use super::port::Port;
use super::vcs::Vcs;
use crate::error::{CoreError, CoreResult};

/// Background-operation status block (`spec.md` §3).
#[derive(Debug, Clone, Copy, Default)]
pub struct BackgroundOp {
    pub running: bool,
    pub pcnt: u8,
    pub opcode: u16,
    pub rc: u16,
    pub ext: u16,
}

/// Per-port default values applied at construction and overridable by the
/// loader (`spec.md` §4.2).
#[derive(Debug, Clone, Copy)]
pub struct PortDefaults {
    pub mlw: u8,
    pub speeds: PcieSpeedVector,
    pub mls: PcieLinkSpeed,
}

impl Default for PortDefaults {
    fn default() -> Self {
        PortDefaults {
            mlw: 16,
            speeds: PcieSpeedVector::default(),
            mls: PcieLinkSpeed::Pcie5,
        }
    }
}

/// The mutable switch state guarded by [`Switch`]'s lock. This is the
/// "Model" of `spec.md` §4.2, split from its mutex the way idiomatic Rust
/// expresses "one exclusive owner, many borrowing readers/writers" rather
/// than a self-referential lock field.
pub struct SwitchState {
    pub version: u8,
    pub vid: u16,
    pub did: u16,
    pub svid: u16,
    pub ssid: u16,
    pub sn: u64,
    pub max_msg_size_n: u8,
    pub msg_rsp_limit_n: u8,
    pub bos: BackgroundOp,
    pub ingress_port: u8,
    pub num_decoders: u16,
    pub port_defaults: PortDefaults,
    pub dir: Option<PathBuf>,
    pub catalog: Vec<DeviceCatalogEntry>,
    pub ports: Vec<Port>,
    pub vcss: Vec<Vcs>,
}

/// Documented identity constants applied at construction
/// (`spec.md` §4.2: "Switch identity is set to documented constants").
pub mod defaults {
    pub const VID: u16 = 0x1E2D;
    pub const DID: u16 = 0x0001;
    pub const SVID: u16 = 0x1E2D;
    pub const SSID: u16 = 0x0001;
    pub const SN: u64 = 0;
    pub const VERSION: u8 = 1;
    pub const MAX_MSG_SIZE_N: u8 = 13;
    pub const MSG_RSP_LIMIT_N: u8 = 8;
    pub const NUM_DECODERS: u16 = 42;
    pub const INGRESS_PORT: u8 = 1;
}

impl SwitchState {
    pub fn num_ports(&self) -> usize {
        self.ports.len()
    }

    pub fn num_vcss(&self) -> usize {
        self.vcss.len()
    }

    /// Connect a catalog device to `ppid` (`spec.md` §4.2 `connect`).
    pub fn connect(&mut self, ppid: u16, entry: &DeviceCatalogEntry, dir: Option<&Path>) -> CoreResult<()> {
        let port = self
            .ports
            .get_mut(ppid as usize)
            .ok_or_else(|| CoreError::Config(format!("connect: no such port {ppid}")))?;

        port.dv = entry.dv;
        port.dt = entry.dt;
        port.cv = entry.cv;
        port.ltssm = LtssmState::L0;
        port.lane = 0;
        port.lane_rev = false;
        port.perst = false;
        port.pwrctrl = false;
        port.state = if entry.rootport {
            PortState::Usp
        } else {
            PortState::Dsp
        };
        port.nlw = entry.mlw.min(port.mlw) << 4;
        port.cls = Some(entry.mls.min(port.mls));
        port.prsnt = true;
        port.cfg = entry.cfg.clone();

        if let Some(tmpl) = &entry.mld {
            let mut mld = Mld::new(
                tmpl.memory_size,
                tmpl.num,
                tmpl.epc,
                tmpl.ttr,
                tmpl.granularity,
                tmpl.rng1.clone(),
                tmpl.rng2.clone(),
                tmpl.alloc_bw.clone(),
                tmpl.bw_limit.clone(),
            );
            port.ld = mld.num;

            if tmpl.mmap {
                if let Some(dir) = dir {
                    let path = dir.join(format!("port{ppid}"));
                    let file = std::fs::OpenOptions::new()
                        .read(true)
                        .write(true)
                        .create(true)
                        .truncate(false)
                        .open(&path)?;
                    file.set_len(mld.memory_size)?;
                    // SAFETY: the file is exclusively owned by this port's
                    // backing map for the lifetime of the mapping.
                    let mmap = unsafe { MmapMut::map_mut(&file)? };
                    mld.backing = Some(BackingMap { path, file, mmap });
                }
            }

            port.mld = Some(mld);
        } else {
            port.ld = 0;
        }

        debug!("port {ppid} connected to device {:?}", entry.name);
        Ok(())
    }

    /// Disconnect whatever device is attached to `ppid` (`spec.md` §4.2
    /// `disconnect`). Per the documented ambiguity in `spec.md` §9, `state`
    /// is not itself reset here.
    pub fn disconnect(&mut self, ppid: u16) -> CoreResult<()> {
        let port = self
            .ports
            .get_mut(ppid as usize)
            .ok_or_else(|| CoreError::Config(format!("disconnect: no such port {ppid}")))?;

        port.dv = super::constants::DV_NOT_CXL;
        port.dt = super::constants::CxlDeviceType::None;
        port.cv = 0;
        port.nlw = 0;
        port.cls = None;
        port.ltssm = LtssmState::Disabled;
        port.lane = 0;
        port.lane_rev = false;
        port.perst = false;
        port.prsnt = false;
        port.pwrctrl = false;
        port.ld = 0;
        port.cfg = Box::new([0u8; CFG_SPACE_SIZE]);
        port.device_name = None;

        if let Some(mld) = port.mld.take() {
            // Drop the mapping before the MLD itself; `munmap`/flush
            // happens in `BackingMap`'s `Drop`.
            drop(mld.backing);
        }

        debug!("port {ppid} disconnected");
        Ok(())
    }

    /// Connect every port whose configured `device_name` matches a
    /// catalog entry (`spec.md` §4.2, loader contract, final step).
    pub fn connect_named_ports(&mut self) -> CoreResult<()> {
        let dir = self.dir.clone();
        let assignments: Vec<(u16, DeviceCatalogEntry)> = self
            .ports
            .iter()
            .filter_map(|p| {
                let name = p.device_name.as_ref()?;
                self.catalog
                    .iter()
                    .find(|e| &e.name == name)
                    .map(|e| (p.ppid, e.clone()))
            })
            .collect();

        for (ppid, entry) in assignments {
            self.connect(ppid, &entry, dir.as_deref())?;
        }
        Ok(())
    }

    /// Look up a catalog entry by device id, used by the emulator
    /// `CONN_DEV` opcode (`spec.md` §6).
    pub fn catalog_entry(&self, devid: usize) -> Option<&DeviceCatalogEntry> {
        self.catalog.get(devid)
    }

    // --- Loader contract (`spec.md` §4.2) -----------------------------
    //
    // The YAML loader (`crate::config`) never touches Switch/Port fields
    // directly; it overlays configured values through these setters, then
    // calls `connect_named_ports`.

    #[allow(clippy::too_many_arguments)]
    pub fn set_identity(
        &mut self,
        vid: u16,
        did: u16,
        svid: u16,
        ssid: u16,
        sn: u64,
        max_msg_size_n: u8,
        msg_rsp_limit_n: u8,
    ) {
        self.vid = vid;
        self.did = did;
        self.svid = svid;
        self.ssid = ssid;
        self.sn = sn;
        self.max_msg_size_n = max_msg_size_n;
        self.msg_rsp_limit_n = msg_rsp_limit_n;
    }

    pub fn set_dir(&mut self, dir: PathBuf) {
        self.dir = Some(dir);
    }

    pub fn set_catalog(&mut self, catalog: Vec<DeviceCatalogEntry>) {
        self.catalog = catalog;
    }

    pub fn set_port_override(
        &mut self,
        ppid: u16,
        mlw: Option<u8>,
        mls: Option<PcieLinkSpeed>,
        state: Option<PortState>,
        device_name: Option<String>,
    ) -> CoreResult<()> {
        let port = self
            .ports
            .get_mut(ppid as usize)
            .ok_or_else(|| CoreError::Config(format!("set_port_override: no such port {ppid}")))?;
        if let Some(mlw) = mlw {
            port.mlw = mlw;
        }
        if let Some(mls) = mls {
            port.mls = mls;
        }
        if let Some(state) = state {
            port.state = state;
        }
        if device_name.is_some() {
            port.device_name = device_name;
        }
        Ok(())
    }

    pub fn set_vcs(&mut self, vcsid: u16, uspid: u16) -> CoreResult<()> {
        let vcs = self
            .vcss
            .get_mut(vcsid as usize)
            .ok_or_else(|| CoreError::Config(format!("set_vcs: no such vcs {vcsid}")))?;
        vcs.uspid = uspid;
        vcs.state = super::constants::VcsState::Enabled;
        Ok(())
    }

    /// Pre-bind a vPPB at load time, bypassing `VSC_BIND` validation
    /// since the loader is trusted and runs before the dispatcher starts.
    pub fn set_vppb_binding(
        &mut self,
        vcsid: u16,
        vppbid: u16,
        ppid: u16,
        ldid: u16,
    ) -> CoreResult<()> {
        let vcs = self
            .vcss
            .get_mut(vcsid as usize)
            .ok_or_else(|| CoreError::Config(format!("set_vppb_binding: no such vcs {vcsid}")))?;
        let vppb = vcs
            .vppbs
            .get_mut(vppbid as usize)
            .ok_or_else(|| CoreError::Config(format!("set_vppb_binding: no such vppb {vppbid}")))?;
        vppb.ppid = ppid;
        vppb.ldid = ldid;
        vppb.bind_status = if ldid == super::constants::LDID_UNBOUND {
            super::constants::BindStatus::BoundPort
        } else {
            super::constants::BindStatus::BoundLd
        };
        Ok(())
    }
}

/// The switch singleton: state plus the exclusive lock guarding it
/// (`spec.md` §3, §5). Handlers receive `&Switch` and must hold the guard
/// across every read and write of Switch/Port/VCS/vPPB/MLD fields.
pub struct Switch {
    state: Mutex<SwitchState>,
}

impl Switch {
    /// `new(ports, vcss, vppbs)`: clamp each count to its maximum,
    /// allocate arrays, and apply documented defaults (`spec.md` §4.2).
    pub fn new(ports: usize, vcss: usize, vppbs_per_vcs: usize) -> Self {
        let num_ports = ports.min(MAX_PORTS);
        let num_vcss = vcss.min(MAX_VCSS);
        let vppbs_per_vcs = vppbs_per_vcs.min(MAX_VPPBS_PER_VCS);

        let port_defaults = PortDefaults::default();
        let ports = (0..num_ports as u16)
            .map(|ppid| {
                Port::new(
                    ppid,
                    port_defaults.mlw,
                    port_defaults.speeds,
                    port_defaults.mls,
                )
            })
            .collect();
        let vcss = (0..num_vcss as u16)
            .map(|vcsid| Vcs::new(vcsid, vppbs_per_vcs))
            .collect();

        let state = SwitchState {
            version: defaults::VERSION,
            vid: defaults::VID,
            did: defaults::DID,
            svid: defaults::SVID,
            ssid: defaults::SSID,
            sn: defaults::SN,
            max_msg_size_n: defaults::MAX_MSG_SIZE_N,
            msg_rsp_limit_n: defaults::MSG_RSP_LIMIT_N,
            bos: BackgroundOp::default(),
            ingress_port: defaults::INGRESS_PORT,
            num_decoders: defaults::NUM_DECODERS,
            port_defaults,
            dir: None,
            catalog: Vec::new(),
            ports,
            vcss,
        };

        Switch {
            state: Mutex::new(state),
        }
    }

    /// Acquire the Model lock (`spec.md` §4.3 step 5 / §5). Every field
    /// read or write against Switch/Port/VCS/vPPB/MLD must happen while
    /// the returned guard is held.
    pub fn lock(&self) -> MutexGuard<'_, SwitchState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("switch lock poisoned; recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl std::fmt::Debug for Switch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Switch {{ .. }}")
    }
}
