use super::constants::{BindStatus, LDID_UNBOUND, VcsState};

/// A bindable slot within a VCS (`spec.md` §3).
#[derive(Debug, Clone, Copy)]
pub struct Vppb {
    pub vppbid: u16,
    pub bind_status: BindStatus,
    pub ppid: u16,
    pub ldid: u16,
}

impl Vppb {
    pub fn new(vppbid: u16) -> Self {
        Vppb {
            vppbid,
            bind_status: BindStatus::Unbound,
            ppid: 0,
            ldid: LDID_UNBOUND,
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.bind_status, BindStatus::BoundPort | BindStatus::BoundLd)
    }
}

/// A Virtual CXL Switch, indexed `0..num_vcss` (`spec.md` §3).
#[derive(Debug)]
pub struct Vcs {
    pub vcsid: u16,
    pub state: VcsState,
    pub uspid: u16,
    pub vppbs: Vec<Vppb>,
}

impl Vcs {
    pub fn new(vcsid: u16, num_vppbs: usize) -> Self {
        let vppbs = (0..num_vppbs as u16).map(Vppb::new).collect();
        Vcs {
            vcsid,
            state: VcsState::Disabled,
            uspid: 0,
            vppbs,
        }
    }

    pub fn num(&self) -> usize {
        self.vppbs.len()
    }

    pub fn active_vppbs(&self) -> usize {
        self.vppbs.iter().filter(|v| v.is_bound()).count()
    }
}
