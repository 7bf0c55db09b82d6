//! Builds small gzip tarballs for unit tests.
//!
//! Names are written straight into the header bytes so entries such as
//! `../escape` can be produced; `tar::Header::set_path` refuses them.

use std::fs::File;
use std::io;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use tar::{EntryType, Header};

/// An entry to place in a test archive.
pub(crate) enum Item<'a> {
    Dir(&'a str, u32),
    File(&'a str, u32, &'a [u8]),
    Symlink(&'a str, &'a str),
    Fifo(&'a str),
}

fn raw_header(name: &str, kind: EntryType, mode: u32, size: u64) -> Header {
    let mut header = Header::new_old();
    let bytes = name.as_bytes();
    header.as_old_mut().name[..bytes.len()].copy_from_slice(bytes);
    header.set_entry_type(kind);
    header.set_mode(mode);
    header.set_size(size);
    header.set_mtime(0);
    header
}

pub(crate) fn write_archive(path: &Path, items: &[Item<'_>]) {
    let file = File::create(path).expect("create archive");
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    for item in items {
        match item {
            Item::Dir(name, mode) => {
                let mut header = raw_header(name, EntryType::Directory, *mode, 0);
                header.set_cksum();
                builder.append(&header, io::empty()).expect("append dir");
            }
            Item::File(name, mode, data) => {
                let mut header = raw_header(name, EntryType::Regular, *mode, data.len() as u64);
                header.set_cksum();
                builder.append(&header, *data).expect("append file");
            }
            Item::Symlink(name, target) => {
                let mut header = raw_header(name, EntryType::Symlink, 0o777, 0);
                let link = target.as_bytes();
                header.as_old_mut().linkname[..link.len()].copy_from_slice(link);
                header.set_cksum();
                builder.append(&header, io::empty()).expect("append symlink");
            }
            Item::Fifo(name) => {
                let mut header = raw_header(name, EntryType::Fifo, 0o644, 0);
                header.set_cksum();
                builder.append(&header, io::empty()).expect("append fifo");
            }
        }
    }

    let encoder = builder.into_inner().expect("finish tar");
    let _ = encoder.finish().expect("finish gzip");
}
