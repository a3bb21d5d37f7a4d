use crate::opcode::MessageFamily;

/// Errors surfaced from the codec and dispatch path.
///
/// These map onto the failure taxonomy of the management-plane protocol:
/// framing errors and transient resource errors route a request to the
/// transport's completion-code queue (see [`crate::dispatcher`]);
/// application-level protocol errors are instead reported as a normal
/// response carrying a non-`SUCCESS` return code and never construct this
/// type at all.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("truncated payload: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },

    #[error("unknown opcode {opcode:#06x} for family {family:?}")]
    UnknownOpcode {
        family: MessageFamily,
        opcode: u16,
    },

    #[error("no free response buffer")]
    NoFreeBuffer,

    #[error("encode failed for opcode {opcode:#06x}")]
    EncodeFailed { opcode: u16 },

    #[error("opcode table miss for family {family:?} opcode {opcode:#06x}")]
    OpcodeMiss {
        family: MessageFamily,
        opcode: u16,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
