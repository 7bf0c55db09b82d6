//! Filesystem management for container isolation.
//!
//! Provides the `chroot` transition into the rootfs and the mount
//! utilities run inside the container's mount namespace.

pub mod chroot;
pub mod mount;
