//! YAML configuration loader (`spec.md` §6 "Configuration (input)",
//! `SPEC_FULL.md` §4.5). Deserializes the on-disk document into plain
//! `serde` structs, then drives the Model exclusively through its public
//! `set_*`/`connect` operations — the loader never reaches into
//! Switch/Port/VCS fields directly, the same separation the teacher
//! keeps between `PciConfiguration` (owned, mutated via accessor
//! methods) and the raw config-space bytes it wraps.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{CoreError, CoreResult};
use crate::model::constants::{CxlDeviceType, Granularity, PcieLinkSpeed, PortState, CFG_SPACE_SIZE};
use crate::model::{DeviceCatalogEntry, MldTemplate, Switch};

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    emulator: EmulatorSection,
    #[serde(default)]
    switch: SwitchSection,
    #[serde(default)]
    ports: Vec<PortEntry>,
    #[serde(default)]
    devices: Vec<DeviceEntry>,
    #[serde(default)]
    vcss: Vec<VcsEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct EmulatorSection {
    mmap_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct SwitchSection {
    #[serde(default = "defaults::vid")]
    vid: u16,
    #[serde(default = "defaults::did")]
    did: u16,
    #[serde(default = "defaults::svid")]
    svid: u16,
    #[serde(default = "defaults::ssid")]
    ssid: u16,
    #[serde(default)]
    sn: u64,
    #[serde(default = "defaults::max_msg_size_n")]
    max_msg_size_n: u8,
    #[serde(default = "defaults::msg_rsp_limit_n")]
    msg_rsp_limit_n: u8,
}

impl Default for SwitchSection {
    fn default() -> Self {
        SwitchSection {
            vid: defaults::vid(),
            did: defaults::did(),
            svid: defaults::svid(),
            ssid: defaults::ssid(),
            sn: 0,
            max_msg_size_n: defaults::max_msg_size_n(),
            msg_rsp_limit_n: defaults::msg_rsp_limit_n(),
        }
    }
}

mod defaults {
    pub fn vid() -> u16 {
        crate::model::switch::defaults::VID
    }
    pub fn did() -> u16 {
        crate::model::switch::defaults::DID
    }
    pub fn svid() -> u16 {
        crate::model::switch::defaults::SVID
    }
    pub fn ssid() -> u16 {
        crate::model::switch::defaults::SSID
    }
    pub fn max_msg_size_n() -> u8 {
        crate::model::switch::defaults::MAX_MSG_SIZE_N
    }
    pub fn msg_rsp_limit_n() -> u8 {
        crate::model::switch::defaults::MSG_RSP_LIMIT_N
    }
}

/// One entry in the `ports:` list. Either a single `count:` record
/// (total port count) or a per-port override record.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortEntry {
    Count { count: usize },
    Override {
        ppid: u16,
        device: Option<String>,
        mlw: Option<u8>,
        mls: Option<String>,
        state: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct DeviceEntry {
    name: String,
    #[serde(default)]
    rootport: bool,
    dv: String,
    dt: String,
    #[serde(default)]
    cv: u8,
    #[serde(default = "defaults_16")]
    mlw: u8,
    mls: String,
    mld: Option<MldEntry>,
}

fn defaults_16() -> u8 {
    16
}

fn defaults_8() -> u8 {
    8
}

#[derive(Debug, Deserialize)]
struct MldEntry {
    memory_size: u64,
    num: u8,
    #[serde(default)]
    epc: u16,
    #[serde(default)]
    ttr: u16,
    granularity: u8,
    #[serde(default)]
    mmap: bool,
}

#[derive(Debug, Deserialize)]
struct VcsEntry {
    vcsid: u16,
    #[serde(default = "defaults_8")]
    num_vppbs: u8,
    #[serde(default)]
    uspid: u16,
    #[serde(default)]
    bindings: Vec<BindingEntry>,
}

#[derive(Debug, Deserialize)]
struct BindingEntry {
    vppbid: u16,
    ppid: u16,
    ldid: u16,
}

fn device_type(name: &str) -> CoreResult<CxlDeviceType> {
    Ok(match name {
        "NONE" => CxlDeviceType::None,
        "CXL_TYPE_1" => CxlDeviceType::CxlType1,
        "CXL_TYPE_2" => CxlDeviceType::CxlType2,
        "CXL_TYPE_3" => CxlDeviceType::CxlType3,
        "CXL_TYPE_3_POOLED" => CxlDeviceType::CxlType3Pooled,
        "PCIE_DEVICE" => CxlDeviceType::PcieDevice,
        other => return Err(CoreError::Config(format!("unknown device type {other}"))),
    })
}

fn dv_byte(name: &str) -> CoreResult<u8> {
    // `dv` carries the same vocabulary as `dt`, encoded as its raw byte
    // value, matching how `spec.md` §3 describes `dv` as a device-variant
    // code parallel to `dt`.
    Ok(device_type(name)? as u8)
}

fn link_speed(name: &str) -> CoreResult<PcieLinkSpeed> {
    Ok(match name {
        "PCIE1" => PcieLinkSpeed::Pcie1,
        "PCIE2" => PcieLinkSpeed::Pcie2,
        "PCIE3" => PcieLinkSpeed::Pcie3,
        "PCIE4" => PcieLinkSpeed::Pcie4,
        "PCIE5" => PcieLinkSpeed::Pcie5,
        other => return Err(CoreError::Config(format!("unknown link speed {other}"))),
    })
}

fn port_state(name: &str) -> CoreResult<PortState> {
    Ok(match name {
        "DISABLED" => PortState::Disabled,
        "BINDING" => PortState::Binding,
        "UNBINDING" => PortState::Unbinding,
        "DSP" => PortState::Dsp,
        "USP" => PortState::Usp,
        "FABRIC" => PortState::Fabric,
        "INVALID" => PortState::Invalid,
        other => return Err(CoreError::Config(format!("unknown port state {other}"))),
    })
}

/// Parse and apply a YAML configuration document, returning the
/// constructed [`Switch`].
pub fn load(path: &Path) -> CoreResult<Switch> {
    let text = std::fs::read_to_string(path)?;
    let doc: Document = serde_yaml::from_str(&text).map_err(|e| CoreError::Config(e.to_string()))?;

    let num_ports = doc
        .ports
        .iter()
        .find_map(|p| match p {
            PortEntry::Count { count } => Some(*count),
            _ => None,
        })
        .unwrap_or(1);
    let num_vcss = doc.vcss.len().max(1);
    let max_vppbs = doc
        .vcss
        .iter()
        .map(|v| v.num_vppbs as usize)
        .max()
        .unwrap_or(8);

    let switch = Switch::new(num_ports, num_vcss, max_vppbs);
    {
        let mut state = switch.lock();
        state.set_identity(
            doc.switch.vid,
            doc.switch.did,
            doc.switch.svid,
            doc.switch.ssid,
            doc.switch.sn,
            doc.switch.max_msg_size_n,
            doc.switch.msg_rsp_limit_n,
        );

        if let Some(dir) = &doc.emulator.mmap_dir {
            std::fs::create_dir_all(dir)?;
            state.set_dir(dir.clone());
        }

        let mut catalog = Vec::with_capacity(doc.devices.len());
        for d in &doc.devices {
            let mld = match &d.mld {
                Some(m) => Some(MldTemplate {
                    memory_size: m.memory_size,
                    num: m.num,
                    epc: m.epc,
                    ttr: m.ttr,
                    granularity: Granularity::from_u8(m.granularity)
                        .ok_or_else(|| CoreError::Config(format!("bad granularity {}", m.granularity)))?,
                    rng1: (0..m.num).collect(),
                    rng2: (0..m.num).collect(),
                    alloc_bw: vec![0; m.num as usize],
                    bw_limit: vec![0xff; m.num as usize],
                    mmap: m.mmap,
                }),
                None => None,
            };
            catalog.push(DeviceCatalogEntry {
                name: d.name.clone(),
                rootport: d.rootport,
                dv: dv_byte(&d.dv)?,
                dt: device_type(&d.dt)?,
                cv: d.cv,
                mlw: d.mlw,
                mls: link_speed(&d.mls)?,
                cfg: Box::new([0u8; CFG_SPACE_SIZE]),
                mld,
            });
        }
        state.set_catalog(catalog);

        for p in &doc.ports {
            if let PortEntry::Override {
                ppid,
                device,
                mlw,
                mls,
                state: st,
            } = p
            {
                let mls = mls.as_deref().map(link_speed).transpose()?;
                let state_enum = st.as_deref().map(port_state).transpose()?;
                state.set_port_override(*ppid, *mlw, mls, state_enum, device.clone())?;
            }
        }

        for v in &doc.vcss {
            state.set_vcs(v.vcsid, v.uspid)?;
            for b in &v.bindings {
                state.set_vppb_binding(v.vcsid, b.vppbid, b.ppid, b.ldid)?;
            }
        }

        state.connect_named_ports()?;
    }

    Ok(switch)
}
