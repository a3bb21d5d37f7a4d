//! The dispatcher (`spec.md` §4.4): drains the transport's inbound queue,
//! looks up each request's handler in the static per-family table, and
//! routes the result to the outbound or completion-code queue per the
//! 10-step pipeline of §4.3 (steps 1, 2, 9 and 10 live here; steps 3-8
//! live in [`crate::handlers`]).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{trace, warn};

use crate::codec::emu::EmuHeader;
use crate::codec::fmapi::{Category, FmHeader};
use crate::codec::{Cursor, Writer};
use crate::handlers::{emu_handler, fm_api_handler};
use crate::model::Switch;
use crate::opcode::{MessageFamily, ReturnCode};
use crate::transport::{CompletionRecord, RequestAction, ResponseBuffer, ResponseFrame, Transport};

/// Poll interval for the inbound queue, so the dispatch loop can notice a
/// cooperative stop request without blocking forever on `recv`.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct Dispatcher {
    switch: Arc<Switch>,
    transport: Arc<Transport>,
    local_eid: u8,
}

impl Dispatcher {
    pub fn new(switch: Arc<Switch>, transport: Arc<Transport>, local_eid: u8) -> Self {
        Dispatcher {
            switch,
            transport,
            local_eid,
        }
    }

    /// Run until `stop` is set or the inbound queue's sender is dropped.
    pub fn run(&self, stop: &AtomicBool) {
        loop {
            if stop.load(Ordering::Relaxed) {
                return;
            }
            match self.transport.inbound_rx.recv_timeout(POLL_INTERVAL) {
                Ok(req) => self.handle_request(req),
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
            }
        }
    }

    fn handle_request(&self, req: RequestAction) {
        trace!("dispatch request tag={} family={:?}", req.tag, req.family);

        // Step 1: acquire a response-frame buffer from the free pool.
        let Some(buf) = self.transport.acquire_buffer() else {
            self.fail(req.tag, None);
            return;
        };

        match req.family {
            MessageFamily::CxlFmApi => self.dispatch_fm(req, buf),
            MessageFamily::Cse => self.dispatch_emu(req, buf),
        }
    }

    fn dispatch_fm(&self, req: RequestAction, buf: ResponseBuffer) {
        let mut c = Cursor::new(&req.payload);
        let header = match FmHeader::decode(&mut c) {
            Ok(h) => h,
            Err(_) => {
                self.fail(req.tag, Some(buf));
                return;
            }
        };
        if header.category != Category::Req {
            self.fail(req.tag, Some(buf));
            return;
        }

        let Some(handler) = fm_api_handler(header.opcode) else {
            self.respond_fm(&req, buf, header.tag, header.opcode, false, ReturnCode::Unsupported.as_u16(), Vec::new());
            return;
        };

        let body_start = FmHeader::SIZE.min(req.payload.len());
        match handler(&self.switch, &req.payload[body_start..]) {
            Ok(effect) => {
                self.respond_fm(&req, buf, header.tag, header.opcode, effect.background, effect.rc, effect.payload)
            }
            Err(e) => {
                warn!("fm-api handler failure opcode={:#06x}: {e}", header.opcode);
                self.fail(req.tag, Some(buf));
            }
        }
    }

    fn dispatch_emu(&self, req: RequestAction, buf: ResponseBuffer) {
        let mut c = Cursor::new(&req.payload);
        let header = match EmuHeader::decode(&mut c) {
            Ok(h) => h,
            Err(_) => {
                self.fail(req.tag, Some(buf));
                return;
            }
        };
        if header.category != crate::codec::emu::EmuCategory::Req {
            self.fail(req.tag, Some(buf));
            return;
        }

        let Some(handler) = emu_handler(header.opcode) else {
            self.respond_emu(&req, buf, header.tag, header.opcode, ReturnCode::Unsupported.as_u16(), Vec::new());
            return;
        };

        let body_start = EmuHeader::SIZE.min(req.payload.len());
        match handler(&self.switch, header.a, header.b, &req.payload[body_start..]) {
            Ok(effect) => self.respond_emu(&req, buf, header.tag, header.opcode, effect.rc, effect.payload),
            Err(e) => {
                warn!("emulator handler failure opcode={:#04x}: {e}", header.opcode);
                self.fail(req.tag, Some(buf));
            }
        }
    }

    fn respond_fm(&self, req: &RequestAction, buf: ResponseBuffer, tag: u8, opcode: u16, background: bool, rc: u16, payload: Vec<u8>) {
        let resp_header = FmHeader::response(tag, opcode, background, payload.len() as u32, rc);
        let mut w = Writer::new();
        resp_header.encode(&mut w);
        w.bytes(&payload);

        let frame = ResponseFrame {
            dst: req.src,
            src: self.local_eid,
            tag,
            family: req.family,
            payload: w.into_vec(),
        };
        self.transport.outbound_tx.send(frame).ok();
        self.transport.release_buffer(buf);
    }

    fn respond_emu(&self, req: &RequestAction, buf: ResponseBuffer, tag: u8, opcode: u8, rc: u16, payload: Vec<u8>) {
        let resp_header = EmuHeader::response(tag, opcode, payload.len() as u32, rc);
        let mut w = Writer::new();
        resp_header.encode(&mut w);
        w.bytes(&payload);

        let frame = ResponseFrame {
            dst: req.src,
            src: self.local_eid,
            tag,
            family: req.family,
            payload: w.into_vec(),
        };
        self.transport.outbound_tx.send(frame).ok();
        self.transport.release_buffer(buf);
    }

    /// Step 10: route an early failure to the completion-code queue. The
    /// response buffer, if one was acquired, is returned to the free pool
    /// unused.
    fn fail(&self, tag: u8, buf: Option<ResponseBuffer>) {
        self.transport
            .completion_tx
            .send(CompletionRecord { tag, completion_code: 1 })
            .ok();
        if let Some(buf) = buf {
            self.transport.release_buffer(buf);
        }
    }
}
