//! The queue-based boundary between the dispatcher and the MCTP
//! transport (`spec.md` §2, §6). The transport itself — framing frames
//! onto and off of an MCTP binding — is an external collaborator; this
//! module only specifies the shape of what crosses that boundary, the
//! same way the teacher's [`crate::transport`] equivalent, `PciLane`,
//! only specifies a full-duplex channel pair and leaves what drives it
//! (a hypervisor vcpu thread) external.

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::opcode::MessageFamily;

/// An inbound request as handed to the dispatcher by the transport.
#[derive(Debug, Clone)]
pub struct RequestAction {
    pub src: u8,
    pub dst: u8,
    pub tag: u8,
    pub family: MessageFamily,
    pub payload: Vec<u8>,
}

/// A successfully produced response frame, destined for the transport's
/// outbound queue.
#[derive(Debug, Clone)]
pub struct ResponseFrame {
    pub dst: u8,
    pub src: u8,
    pub tag: u8,
    pub family: MessageFamily,
    pub payload: Vec<u8>,
}

/// An early-failure record, destined for the transport's completion-code
/// queue (`spec.md` §4.3 step 10, §7).
#[derive(Debug, Clone)]
pub struct CompletionRecord {
    pub tag: u8,
    pub completion_code: u32,
}

/// A response-frame buffer drawn from the transport's free pool
/// (`spec.md` §4.3 step 1). Reference-weak: the dispatcher never retains
/// it after enqueueing a response or a completion record.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    pub bytes: Vec<u8>,
}

/// The transport contract: one inbound queue of requests, and two
/// outbound queues (successful responses, early-failure completions),
/// plus a free pool of response buffers. Modeled on the teacher's
/// `PciLane { tx, rx }` full-duplex channel pair, generalized here to
/// the dispatcher's three distinct queues.
pub struct Transport {
    pub inbound_rx: Receiver<RequestAction>,
    pub inbound_tx: Sender<RequestAction>,
    pub outbound_tx: Sender<ResponseFrame>,
    pub outbound_rx: Receiver<ResponseFrame>,
    pub completion_tx: Sender<CompletionRecord>,
    pub completion_rx: Receiver<CompletionRecord>,
    pub free_pool_rx: Receiver<ResponseBuffer>,
    pub free_pool_tx: Sender<ResponseBuffer>,
}

impl Transport {
    /// Build a transport with `pool_size` pre-populated response buffers.
    pub fn new(pool_size: usize) -> Self {
        let (inbound_tx, inbound_rx) = unbounded();
        let (outbound_tx, outbound_rx) = unbounded();
        let (completion_tx, completion_rx) = unbounded();
        let (free_pool_tx, free_pool_rx) = unbounded();

        for _ in 0..pool_size {
            free_pool_tx.send(ResponseBuffer::default()).ok();
        }

        Transport {
            inbound_rx,
            inbound_tx,
            outbound_tx,
            outbound_rx,
            completion_tx,
            completion_rx,
            free_pool_rx,
            free_pool_tx,
        }
    }

    /// Acquire a response buffer from the free pool without blocking
    /// (`spec.md` §4.3 step 1: "if unavailable, fail the request").
    pub fn acquire_buffer(&self) -> Option<ResponseBuffer> {
        self.free_pool_rx.try_recv().ok()
    }

    /// Return a buffer to the free pool once a response has been copied
    /// out of it (or never taken, on the failure path).
    pub fn release_buffer(&self, buf: ResponseBuffer) {
        self.free_pool_tx.send(buf).ok();
    }
}
