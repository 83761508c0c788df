//! Prints a file from a FAT image to stdout.
//!
//! Run with: `cargo run --example cat --no-default-features
//! --features std -- <image> <path>`

use std::io::Write;

use fat_ro::storage::mem::MemDisk;
use fat_ro::{close, open, read};

fn main() {
    let mut args = std::env::args().skip(1);
    let image_path = args.next().expect("usage: cat <image> <path>");
    let file_path = args.next().expect("usage: cat <image> <path>");

    let bytes = std::fs::read(&image_path).expect("reading image file");
    let mut disk = MemDisk::new(bytes);

    let mut file = open(&mut disk, &file_path).expect("opening file");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let mut offset = 0u64;
    let mut buf = [0u8; 4096];
    loop {
        let n = read(&mut disk, &mut file, offset, &mut buf, None).expect("reading file");
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n]).expect("writing stdout");
        offset += n as u64;
    }

    close(file);
}
