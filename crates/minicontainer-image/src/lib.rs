//! # minicontainer-image
//!
//! Root filesystem provisioning for the minicontainer runtime.
//!
//! Handles:
//! - **Sources**: the image URL and the cached archive path derived from it.
//! - **Fetching**: streaming the archive over HTTP(S).
//! - **Extraction**: unpacking gzip-compressed tar archives with every
//!   entry confined to the extraction root.
//! - **Provisioning**: the idempotent download, extract, and clean-up
//!   sequence behind `minicontainer init`.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod extract;
pub mod fetch;
pub mod provision;
pub mod source;

#[cfg(test)]
mod test_archive;
