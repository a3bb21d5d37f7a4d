//! Emulator control (CSE family) handlers: device-catalog enumeration
//! and connect/disconnect (`spec.md` §6).

use crate::codec::emu::{DeviceListEntry, ListDevResp};
use crate::codec::Writer;
use crate::error::CoreResult;
use crate::model::Switch;

use super::HandlerEffect;

/// `LIST_DEV`: `a=num_requested`, `b=start`.
pub fn handle_list_dev(switch: &Switch, a: u8, b: u8, _payload: &[u8]) -> CoreResult<HandlerEffect> {
    let state = switch.lock();
    let start = b as usize;
    let num_requested = a as usize;

    let entries: Vec<DeviceListEntry> = state
        .catalog
        .iter()
        .skip(start)
        .take(num_requested)
        .enumerate()
        .map(|(i, e)| DeviceListEntry {
            devid: (start + i) as u8,
            name: e.name.clone(),
            rootport: e.rootport,
        })
        .collect();
    drop(state);

    let resp = ListDevResp { entries };
    let mut w = Writer::new();
    resp.encode(&mut w);
    Ok(HandlerEffect::success(w.into_vec()))
}

/// `CONN_DEV`: `a=ppid`, `b=devid`.
pub fn handle_conn_dev(switch: &Switch, a: u8, b: u8, _payload: &[u8]) -> CoreResult<HandlerEffect> {
    let ppid = a as u16;
    let devid = b as usize;

    let mut state = switch.lock();
    if ppid as usize >= state.num_ports() {
        return Ok(HandlerEffect::invalid_input());
    }
    let Some(entry) = state.catalog_entry(devid).cloned() else {
        return Ok(HandlerEffect::invalid_input());
    };
    let dir = state.dir.clone();
    state.connect(ppid, &entry, dir.as_deref())?;
    drop(state);

    Ok(HandlerEffect::success(Vec::new()))
}

/// `DISCON_DEV`: `a=ppid`, `b=all` (unused by this emulator).
pub fn handle_discon_dev(switch: &Switch, a: u8, _b: u8, _payload: &[u8]) -> CoreResult<HandlerEffect> {
    let ppid = a as u16;

    let mut state = switch.lock();
    if ppid as usize >= state.num_ports() {
        return Ok(HandlerEffect::invalid_input());
    }
    state.disconnect(ppid)?;
    drop(state);

    Ok(HandlerEffect::success(Vec::new()))
}
