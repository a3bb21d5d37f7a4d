//! Opcode space and return codes for both message families.
//!
//! Values are fixed by the CXL 2.0 Fabric Management API specification
//! (the FM-API family) and by the emulator's own control API (the CSE
//! family); an implementation must match the numeric values exactly since
//! they travel on the wire.

/// MCTP message type byte identifying which payload family a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageFamily {
    /// CXL Fabric Management API.
    CxlFmApi,
    /// Emulator-specific control API.
    Cse,
}

impl MessageFamily {
    pub const MCMT_CXLFMAPI: u8 = 0x00;
    pub const MCMT_CSE: u8 = 0x7f;

    pub fn from_mctp_type(ty: u8) -> Option<Self> {
        match ty {
            Self::MCMT_CXLFMAPI => Some(Self::CxlFmApi),
            Self::MCMT_CSE => Some(Self::Cse),
            _ => None,
        }
    }

    pub fn mctp_type(self) -> u8 {
        match self {
            Self::CxlFmApi => Self::MCMT_CXLFMAPI,
            Self::Cse => Self::MCMT_CSE,
        }
    }
}

/// Return codes for the FM-API family's response header `rc` field.
///
/// Numeric values are fixed by the CXL 2.0 specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ReturnCode {
    Success = 0x0000,
    BackgroundOpStarted = 0x0001,
    InvalidInput = 0x0002,
    Unsupported = 0x0003,
    InternalError = 0x0004,
}

impl ReturnCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Infrastructure (ISC) opcodes.
pub mod isc {
    pub const ID: u16 = 0x0001;
    pub const BOS: u16 = 0x0002;
    pub const MSG_LIMIT_GET: u16 = 0x0003;
    pub const MSG_LIMIT_SET: u16 = 0x0004;
}

/// Physical-switch (PSC) opcodes.
pub mod psc {
    pub const ID: u16 = 0x5100;
    pub const PORT: u16 = 0x5101;
    pub const PORT_CTRL: u16 = 0x5102;
    pub const CFG: u16 = 0x5103;
}

/// Virtual-switch (VSC) opcodes.
pub mod vsc {
    pub const INFO: u16 = 0x5300;
    pub const BIND: u16 = 0x5301;
    pub const UNBIND: u16 = 0x5302;
    pub const AER: u16 = 0x5303;
}

/// MLD port-control (MPC) opcodes.
pub mod mpc {
    pub const CFG: u16 = 0x5400;
    pub const MEM: u16 = 0x5401;
    pub const TMC: u16 = 0x5402;
}

/// MLD component-command (MCC) opcodes. Reachable only via `mpc::TMC`
/// tunneling, never dispatched directly off the inbound transport queue.
pub mod mcc {
    pub const INFO: u16 = 0x5400;
    pub const ALLOC_GET: u16 = 0x5401;
    pub const ALLOC_SET: u16 = 0x5402;
    pub const QOS_CTRL_GET: u16 = 0x5403;
    pub const QOS_CTRL_SET: u16 = 0x5404;
    pub const QOS_STAT: u16 = 0x5405;
    pub const QOS_BW_ALLOC_GET: u16 = 0x5406;
    pub const QOS_BW_ALLOC_SET: u16 = 0x5407;
    pub const QOS_BW_LIMIT_GET: u16 = 0x5408;
    pub const QOS_BW_LIMIT_SET: u16 = 0x5409;
}

/// Emulator control (CSE) opcodes.
pub mod emu {
    pub const EVENT: u8 = 0x00;
    pub const LIST_DEV: u8 = 0x01;
    pub const CONN_DEV: u8 = 0x02;
    pub const DISCON_DEV: u8 = 0x03;
}

/// Port-control sub-opcode carried in `PSC_PORT_CTRL` requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PortCtrlOp {
    AssertPerst = 0,
    DeassertPerst = 1,
    ResetPpb = 2,
}

impl PortCtrlOp {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::AssertPerst),
            1 => Some(Self::DeassertPerst),
            2 => Some(Self::ResetPpb),
            _ => None,
        }
    }
}

/// Access direction for `PSC_CFG` / `MPC_CFG` config-space transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CfgAccessType {
    Read = 0,
    Write = 1,
}

impl CfgAccessType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Read),
            1 => Some(Self::Write),
            _ => None,
        }
    }
}
