//! Emulator control API header and payload shapes (`spec.md` §6).

use crate::error::{CoreError, CoreResult};

use super::{Cursor, Writer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EmuCategory {
    Req = 0,
    Resp = 1,
}

impl EmuCategory {
    fn from_u8(v: u8) -> CoreResult<Self> {
        match v {
            0 => Ok(EmuCategory::Req),
            1 => Ok(EmuCategory::Resp),
            other => Err(CoreError::Config(format!("bad emulator header category {other}"))),
        }
    }
}

/// 12-byte emulator header (`spec.md` §6):
///
/// ```text
/// byte 0: category[3:0] | tag[7:4]
/// byte 1: reserved
/// bytes 2-3: opcode (le16)
/// bytes 4-6: length (le24)
/// byte 7: a
/// byte 8: b
/// byte 9: reserved
/// bytes 10-11: rc (le16)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmuHeader {
    pub category: EmuCategory,
    pub tag: u8,
    pub opcode: u8,
    pub length: u32,
    pub a: u8,
    pub b: u8,
    pub rc: u16,
}

impl EmuHeader {
    pub const SIZE: usize = 12;

    pub fn request(tag: u8, opcode: u8, a: u8, b: u8) -> Self {
        EmuHeader {
            category: EmuCategory::Req,
            tag,
            opcode,
            length: 0,
            a,
            b,
            rc: 0,
        }
    }

    pub fn response(tag: u8, opcode: u8, length: u32, rc: u16) -> Self {
        EmuHeader {
            category: EmuCategory::Resp,
            tag,
            opcode,
            length,
            a: 0,
            b: 0,
            rc,
        }
    }

    pub fn encode(&self, w: &mut Writer) {
        w.u8((self.category as u8 & 0x0f) | ((self.tag & 0x0f) << 4));
        w.u8(0);
        w.u16(self.opcode as u16);

        let b = self.length.to_le_bytes();
        w.u8(b[0]);
        w.u8(b[1]);
        w.u8(b[2]);

        w.u8(self.a);
        w.u8(self.b);
        w.u8(0); // reserved

        w.u16(self.rc);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        let b0 = c.u8()?;
        let category = EmuCategory::from_u8(b0 & 0x0f)?;
        let tag = (b0 >> 4) & 0x0f;
        let _rsvd = c.u8()?;
        let opcode = c.u16()? as u8;

        let lo = c.u8()? as u32;
        let mid = c.u8()? as u32;
        let hi = c.u8()? as u32;
        let length = lo | (mid << 8) | (hi << 16);

        let a = c.u8()?;
        let b = c.u8()?;
        let _rsvd2 = c.u8()?;
        let rc = c.u16()?;

        Ok(EmuHeader {
            category,
            tag,
            opcode,
            length,
            a,
            b,
            rc,
        })
    }
}

/// Fixed-width device name field in `LIST_DEV` entries.
pub const DEVICE_NAME_LEN: usize = 32;

pub struct DeviceListEntry {
    pub devid: u8,
    pub name: String,
    pub rootport: bool,
}

impl DeviceListEntry {
    pub fn encode(&self, w: &mut Writer) {
        w.u8(self.devid);
        w.bool_u8(self.rootport);
        let mut name_bytes = [0u8; DEVICE_NAME_LEN];
        let src = self.name.as_bytes();
        let n = src.len().min(DEVICE_NAME_LEN);
        name_bytes[..n].copy_from_slice(&src[..n]);
        w.bytes(&name_bytes);
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        let devid = c.u8()?;
        let rootport = c.bool_u8()?;
        let name_bytes = c.bytes(DEVICE_NAME_LEN)?;
        let end = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_bytes.len());
        let name = String::from_utf8_lossy(&name_bytes[..end]).into_owned();
        Ok(DeviceListEntry {
            devid,
            name,
            rootport,
        })
    }
}

pub struct ListDevResp {
    pub entries: Vec<DeviceListEntry>,
}

impl ListDevResp {
    pub fn encode(&self, w: &mut Writer) {
        w.u8(self.entries.len() as u8);
        for e in &self.entries {
            e.encode(w);
        }
    }

    pub fn decode(c: &mut Cursor<'_>) -> CoreResult<Self> {
        let num = c.u8()? as usize;
        let mut entries = Vec::with_capacity(num);
        for _ in 0..num {
            entries.push(DeviceListEntry::decode(c)?);
        }
        Ok(ListDevResp { entries })
    }
}
