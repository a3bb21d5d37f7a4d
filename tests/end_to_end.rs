//! Multi-opcode end-to-end tests driving the real `Transport` +
//! `Dispatcher` pair together, the way the teacher's own
//! `device.rs::tests::common` helper exercises `PciAdapter` and the
//! channel plumbing as one unit rather than calling handler functions
//! directly. Each scenario here corresponds to one of the walkthroughs
//! in `spec.md` §8, but goes the long way around: wire-encode a
//! request, push it onto `Transport::inbound_tx`, let a dispatcher
//! thread drain it, and decode whatever comes back off
//! `Transport::outbound_rx`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cxl_switch_core::codec::emu::EmuHeader;
use cxl_switch_core::codec::fmapi::{
    BwListGetReq, BwListResp, BwListSetReq, FmHeader, MpcMemReq, MpcMemResp, VscBindReq,
    VscInfoReq, VscInfoResp, MCTP_TYPE_CXLCCI,
};
use cxl_switch_core::codec::{Cursor, Writer};
use cxl_switch_core::model::catalog::{DeviceCatalogEntry, MldTemplate};
use cxl_switch_core::model::constants::{
    BindStatus, CxlDeviceType, Granularity, PcieLinkSpeed, CFG_SPACE_SIZE,
};
use cxl_switch_core::model::Switch;
use cxl_switch_core::opcode::{emu as emu_op, mcc, mpc, psc, vsc, CfgAccessType, MessageFamily, ReturnCode};
use cxl_switch_core::transport::{RequestAction, ResponseFrame, Transport};
use cxl_switch_core::Dispatcher;

const LOCAL_EID: u8 = 1;
const FM_EID: u8 = 9;

/// Spin up a dispatcher thread over a fresh transport, returning the
/// pieces a test needs to drive it and a guard that stops the thread on
/// drop so a panicking assertion doesn't leak it.
struct Harness {
    transport: Arc<Transport>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Harness {
    fn new(switch: Switch) -> Self {
        let transport = Arc::new(Transport::new(4));
        let stop = Arc::new(AtomicBool::new(false));
        let dispatcher = Dispatcher::new(Arc::new(switch), transport.clone(), LOCAL_EID);
        let stop_flag = stop.clone();
        let handle = thread::spawn(move || dispatcher.run(&stop_flag));
        Harness {
            transport,
            stop,
            handle: Some(handle),
        }
    }

    fn send_fm(&self, tag: u8, opcode: u16, body: &[u8]) {
        let header = FmHeader::request(tag, opcode);
        let mut w = Writer::new();
        header.encode(&mut w);
        w.bytes(body);
        self.transport
            .inbound_tx
            .send(RequestAction {
                src: FM_EID,
                dst: LOCAL_EID,
                tag,
                family: MessageFamily::CxlFmApi,
                payload: w.into_vec(),
            })
            .unwrap();
    }

    fn send_emu(&self, tag: u8, opcode: u8, a: u8, b: u8, body: &[u8]) {
        let header = EmuHeader::request(tag, opcode, a, b);
        let mut w = Writer::new();
        header.encode(&mut w);
        w.bytes(body);
        self.transport
            .inbound_tx
            .send(RequestAction {
                src: FM_EID,
                dst: LOCAL_EID,
                tag,
                family: MessageFamily::Cse,
                payload: w.into_vec(),
            })
            .unwrap();
    }

    fn recv(&self) -> ResponseFrame {
        self.transport
            .outbound_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("dispatcher produced no response within timeout")
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            h.join().ok();
        }
    }
}

fn mld_catalog_entry(mmap: bool) -> DeviceCatalogEntry {
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

/// `spec.md` §8 scenario 1: `PSC_ID` returns the switch's identity block
/// over the full transport+dispatcher path, byte for byte against the
/// documented fixture.
#[test]
fn scenario_1_identify_switch_over_transport() {
    let switch = Switch::new(32, 4, 8);
    {
        let mut state = switch.lock();
        state.set_identity(0xB1B2, 0xC1C2, 0xD1D2, 0xE1E2, 0xA1A2A3A4A5A6A7A8, 13, 8);
    }
    let harness = Harness::new(switch);

    harness.send_fm(3, psc::ID, &[]);
    let frame = harness.recv();
    assert_eq!(frame.dst, FM_EID);
    assert_eq!(frame.tag, 3);

    let mut c = Cursor::new(&frame.payload);
    let header = FmHeader::decode(&mut c).unwrap();
    assert_eq!(header.opcode, psc::ID);
    assert_eq!(header.rc, ReturnCode::Success.as_u16());
    assert_eq!(header.length, 44);

    let body = &frame.payload[FmHeader::SIZE..];
    assert_eq!(
        &body[0..16],
        &[
            0xB2, 0xB1, 0xC2, 0xC1, 0xD2, 0xD1, 0xE2, 0xE1, 0xA8, 0xA7, 0xA6, 0xA5, 0xA4, 0xA3,
            0xA2, 0xA1
        ]
    );
    assert_eq!(body[16], 1); // ingress_port
    assert_eq!(body[17], 32); // num_ports
    assert_eq!(body[18], 4); // num_vcss
}

/// `spec.md` §8 scenario 2: bind vPPB 1 of VCS 0 to LD 0 of port 1 via
/// `VSC_BIND`, then list VCS 0 via `VSC_INFO` and see the bound entry.
#[test]
fn scenario_2_bind_then_list_vcs_over_transport() {
    let switch = Switch::new(4, 1, 8);
    {
        let mut state = switch.lock();
        state.connect(1, &mld_catalog_entry(false), None).unwrap();
    }
    let harness = Harness::new(switch);

    let mut w = Writer::new();
    VscBindReq {
        vcsid: 0,
        vppbid: 1,
        ppid: 1,
        ldid: 0,
    }
    .encode(&mut w);
    harness.send_fm(1, vsc::BIND, &w.into_vec());

    let frame = harness.recv();
    let mut c = Cursor::new(&frame.payload);
    let header = FmHeader::decode(&mut c).unwrap();
    assert_eq!(header.rc, ReturnCode::BackgroundOpStarted.as_u16());
    assert!(header.background);

    let mut w = Writer::new();
    VscInfoReq {
        vcss: vec![0],
        vppbid_start: 0,
        vppbid_limit: 8,
    }
    .encode(&mut w);
    harness.send_fm(2, vsc::INFO, &w.into_vec());

    let frame = harness.recv();
    let mut c = Cursor::new(&frame.payload);
    let header = FmHeader::decode(&mut c).unwrap();
    assert_eq!(header.rc, ReturnCode::Success.as_u16());
    let mut body = Cursor::new(&frame.payload[FmHeader::SIZE..]);
    let resp = VscInfoResp::decode(&mut body).unwrap();
    let vppb = &resp.vcss[0].vppbs[1];
    assert_eq!(vppb.bind_status, BindStatus::BoundLd);
    assert_eq!(vppb.ppid, 1);
    assert_eq!(vppb.ldid, 0);
}

/// `spec.md` §8 scenario 3: binding an out-of-range VCS id is rejected
/// and leaves every vPPB untouched.
#[test]
fn scenario_3_invalid_bind_rejected_over_transport() {
    let switch = Switch::new(4, 1, 8);
    {
        let mut state = switch.lock();
        state.connect(1, &mld_catalog_entry(false), None).unwrap();
    }
    let harness = Harness::new(switch);

    let mut w = Writer::new();
    VscBindReq {
        vcsid: 99,
        vppbid: 0,
        ppid: 1,
        ldid: 0,
    }
    .encode(&mut w);
    harness.send_fm(1, vsc::BIND, &w.into_vec());

    let frame = harness.recv();
    let mut c = Cursor::new(&frame.payload);
    let header = FmHeader::decode(&mut c).unwrap();
    assert_eq!(header.rc, ReturnCode::InvalidInput.as_u16());
}

/// `spec.md` §8 scenario 4: write then read back the same bytes through
/// an MLD's memory-mapped backing file via `MPC_MEM`.
#[test]
fn scenario_4_mpc_mem_round_trip_over_transport() {
    let tmp = tempfile::tempdir().unwrap();
    let switch = Switch::new(4, 1, 8);
    {
        let mut state = switch.lock();
        state
            .connect(1, &mld_catalog_entry(true), Some(tmp.path()))
            .unwrap();
    }
    let harness = Harness::new(switch);

    let mut w = Writer::new();
    MpcMemReq {
        ppid: 1,
        ldid: 0,
        access_type: CfgAccessType::Write as u8,
        offset: 0x1000,
        len: 4,
        data: vec![0xDE, 0xAD, 0xBE, 0xEF],
    }
    .encode(&mut w);
    harness.send_fm(1, mpc::MEM, &w.into_vec());
    let frame = harness.recv();
    let mut c = Cursor::new(&frame.payload);
    let header = FmHeader::decode(&mut c).unwrap();
    assert_eq!(header.rc, ReturnCode::Success.as_u16());

    let mut w = Writer::new();
    MpcMemReq {
        ppid: 1,
        ldid: 0,
        access_type: CfgAccessType::Read as u8,
        offset: 0x1000,
        len: 4,
        data: Vec::new(),
    }
    .encode(&mut w);
    harness.send_fm(2, mpc::MEM, &w.into_vec());
    let frame = harness.recv();
    let mut c = Cursor::new(&frame.payload);
    FmHeader::decode(&mut c).unwrap();
    let mut body = Cursor::new(&frame.payload[FmHeader::SIZE..]);
    let resp = MpcMemResp::decode(&mut body, 4).unwrap();
    assert_eq!(resp.data, vec![0xDE, 0xAD, 0xBE, 0xEF]);
}

/// `spec.md` §8 scenario 5: set the QoS bandwidth allocation list at
/// `start=1, num=2` and read the whole list back, both tunneled through
/// `MPC_TMC` to the MCC family.
#[test]
fn scenario_5_qos_bw_alloc_via_mpc_tmc_over_transport() {
    let switch = Switch::new(4, 1, 8);
    {
        let mut state = switch.lock();
        state.connect(2, &mld_catalog_entry(false), None).unwrap();
    }
    let harness = Harness::new(switch);

    let mut inner = Writer::new();
    FmHeader::request(0, mcc::QOS_BW_ALLOC_SET).encode(&mut inner);
    BwListSetReq {
        start: 1,
        num: 2,
        list: vec![0x40, 0x80],
    }
    .encode(&mut inner);
    let mut outer = Writer::new();
    outer.u16(2);
    outer.u8(MCTP_TYPE_CXLCCI);
    outer.bytes(&inner.into_vec());
    harness.send_fm(1, mpc::TMC, &outer.into_vec());

    let frame = harness.recv();
    let mut c = Cursor::new(&frame.payload);
    let outer_header = FmHeader::decode(&mut c).unwrap();
    assert_eq!(outer_header.opcode, mpc::TMC);
    assert_eq!(outer_header.rc, ReturnCode::Success.as_u16());

    let inner_bytes = &frame.payload[FmHeader::SIZE..];
    let mut ic = Cursor::new(inner_bytes);
    let inner_header = FmHeader::decode(&mut ic).unwrap();
    assert_eq!(inner_header.opcode, mcc::QOS_BW_ALLOC_SET);
    assert_eq!(inner_header.rc, ReturnCode::Success.as_u16());

    let mut inner = Writer::new();
    FmHeader::request(0, mcc::QOS_BW_ALLOC_GET).encode(&mut inner);
    BwListGetReq { start: 0, limit: 4 }.encode(&mut inner);
    let mut outer = Writer::new();
    outer.u16(2);
    outer.u8(MCTP_TYPE_CXLCCI);
    outer.bytes(&inner.into_vec());
    harness.send_fm(2, mpc::TMC, &outer.into_vec());

    let frame = harness.recv();
    let mut c = Cursor::new(&frame.payload);
    FmHeader::decode(&mut c).unwrap();
    let inner_bytes = &frame.payload[FmHeader::SIZE..];
    let mut ic = Cursor::new(inner_bytes);
    let inner_header = FmHeader::decode(&mut ic).unwrap();
    assert_eq!(inner_header.rc, ReturnCode::Success.as_u16());
    let inner_body = &inner_bytes[FmHeader::SIZE..];
    let mut bc = Cursor::new(inner_body);
    let resp = BwListResp::decode(&mut bc).unwrap();
    assert_eq!(resp.list, vec![0x00, 0x40, 0x80, 0x00]);
}

/// `spec.md` §8 scenario 6: connect port 10 to a catalog MLD via the
/// emulator control (CSE) family, observe it through `LIST_DEV`'s sibling
/// `PSC_PORT`, then disconnect and see the port return to its defaults.
#[test]
fn scenario_6_emulator_connect_then_disconnect_over_transport() {
    let switch = Switch::new(32, 4, 8);
    switch.lock().set_catalog(vec![mld_catalog_entry(false)]);
    let harness = Harness::new(switch);

    harness.send_emu(1, emu_op::CONN_DEV, 10, 0, &[]);
    let frame = harness.recv();
    let mut c = Cursor::new(&frame.payload);
    let header = EmuHeader::decode(&mut c).unwrap();
    assert_eq!(header.rc, ReturnCode::Success.as_u16());

    let mut w = Writer::new();
    cxl_switch_core::codec::fmapi::PscPortReq { ports: vec![10] }.encode(&mut w);
    harness.send_fm(2, psc::PORT, &w.into_vec());
    let frame = harness.recv();
    let mut c = Cursor::new(&frame.payload);
    FmHeader::decode(&mut c).unwrap();
    let mut body = Cursor::new(&frame.payload[FmHeader::SIZE..]);
    let resp = cxl_switch_core::codec::fmapi::PscPortResp::decode(&mut body).unwrap();
    assert!(resp.ports[0].prsnt);
    assert_eq!(resp.ports[0].num_ld, 4);

    harness.send_emu(3, emu_op::DISCON_DEV, 10, 0, &[]);
    let frame = harness.recv();
    let mut c = Cursor::new(&frame.payload);
    let header = EmuHeader::decode(&mut c).unwrap();
    assert_eq!(header.rc, ReturnCode::Success.as_u16());

    let mut w = Writer::new();
    cxl_switch_core::codec::fmapi::PscPortReq { ports: vec![10] }.encode(&mut w);
    harness.send_fm(4, psc::PORT, &w.into_vec());
    let frame = harness.recv();
    let mut body = Cursor::new(&frame.payload[FmHeader::SIZE..]);
    let resp = cxl_switch_core::codec::fmapi::PscPortResp::decode(&mut body).unwrap();
    assert!(!resp.ports[0].prsnt);
    assert_eq!(resp.ports[0].num_ld, 0);
}

/// An unsupported opcode on the FM-API side must still round a response
/// back through the transport, with `UNSUPPORTED` rather than silence.
#[test]
fn unsupported_opcode_still_produces_a_response() {
    let switch = Switch::new(4, 1, 8);
    let harness = Harness::new(switch);

    harness.send_fm(1, 0x9999, &[]);
    let frame = harness.recv();
    let mut c = Cursor::new(&frame.payload);
    let header = FmHeader::decode(&mut c).unwrap();
    assert_eq!(header.rc, ReturnCode::Unsupported.as_u16());
}
