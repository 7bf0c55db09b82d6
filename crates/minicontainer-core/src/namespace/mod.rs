//! Linux namespace management for container isolation.
//!
//! A [`NamespaceSpec`] names the isolation domains a launch creates and the
//! UID/GID maps installed into its user namespace. The launcher turns it
//! into `clone(2)` flags.

pub mod user;
pub mod uts;

pub use user::IdMap;

/// Which namespaces to create for a new container, and how IDs map into it.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceSpec {
    /// Isolate PID namespace.
    pub pid: bool,
    /// Isolate UTS (hostname) namespace.
    pub uts: bool,
    /// Isolate mount namespace.
    pub mount: bool,
    /// Isolate network namespace.
    pub network: bool,
    /// Isolate IPC namespace.
    pub ipc: bool,
    /// Isolate user namespace.
    pub user: bool,
    /// Isolate cgroup namespace.
    pub cgroup: bool,
    /// Single-range UID map installed into the user namespace.
    pub uid_map: IdMap,
    /// Single-range GID map installed into the user namespace.
    pub gid_map: IdMap,
}

impl NamespaceSpec {
    /// Creates all seven namespaces with container root mapped to the given host IDs.
    #[must_use]
    pub const fn isolated(host_uid: u32, host_gid: u32) -> Self {
        Self {
            pid: true,
            uts: true,
            mount: true,
            network: true,
            ipc: true,
            user: true,
            cgroup: true,
            uid_map: IdMap::root_to(host_uid),
            gid_map: IdMap::root_to(host_gid),
        }
    }

    /// Creates all seven namespaces, mapping container root to the invoking user.
    #[cfg(target_os = "linux")]
    #[must_use]
    pub fn for_invoking_user() -> Self {
        let uid = nix::unistd::getuid().as_raw();
        let gid = nix::unistd::getgid().as_raw();
        Self::isolated(uid, gid)
    }

    /// Returns the `clone(2)` flags requesting the configured namespaces.
    #[cfg(target_os = "linux")]
    #[must_use]
    pub fn clone_flags(&self) -> nix::sched::CloneFlags {
        use nix::sched::CloneFlags;

        let mut flags = CloneFlags::empty();
        flags.set(CloneFlags::CLONE_NEWPID, self.pid);
        flags.set(CloneFlags::CLONE_NEWUTS, self.uts);
        flags.set(CloneFlags::CLONE_NEWNS, self.mount);
        flags.set(CloneFlags::CLONE_NEWNET, self.network);
        flags.set(CloneFlags::CLONE_NEWIPC, self.ipc);
        flags.set(CloneFlags::CLONE_NEWUSER, self.user);
        flags.set(CloneFlags::CLONE_NEWCGROUP, self.cgroup);
        flags
    }
}
