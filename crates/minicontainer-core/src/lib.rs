//! # minicontainer-core
//!
//! Low-level Linux isolation primitives for the minicontainer runtime.
//!
//! This crate provides safe abstractions over:
//! - **Namespaces**: the clone flags of a launch and its UID/GID maps.
//! - **UTS**: setting the container hostname.
//! - **Filesystem**: `chroot` into the rootfs and the `/proc` mount.
//! - **Cgroups v2**: memory and CPU limits plus process enrollment.
//!
//! No function here uses `unsafe`; the raw `clone(2)` call lives in the
//! runtime crate.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cgroup;
pub mod filesystem;
pub mod namespace;
