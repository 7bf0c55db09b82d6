//! Launch orchestration for the minicontainer runtime.
//!
//! [`launcher`] is the parent side of a launch: it clones the child into
//! fresh namespaces and prepares it from outside. [`init`] is the child
//! side, run after the re-exec. [`process`] runs the container command.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod init;
pub mod launcher;
pub mod process;
