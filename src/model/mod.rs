//! The canonical switch state: ports, VCSs, vPPBs, MLDs, a device
//! catalog, and switch-wide identity/background-operation status
//! (`spec.md` §3, §4.2).

pub mod catalog;
pub mod constants;
pub mod mld;
pub mod port;
pub mod projections;
pub mod switch;
pub mod vcs;

pub use catalog::{DeviceCatalogEntry, MldTemplate};
pub use constants::*;
pub use mld::{BackingMap, Mld};
pub use port::Port;
pub use projections::{IdentityInfo, PortInfo, VcsInfoBlk, VppbInfo};
pub use switch::{BackgroundOp, PortDefaults, Switch, SwitchState};
pub use vcs::{Vcs, Vppb};
