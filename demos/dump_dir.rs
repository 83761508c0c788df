//! Lists a directory on a FAT image loaded from disk.
//!
//! Run with: `cargo run --example dump_dir --no-default-features
//! --features std -- <image> [path]`

use fat_ro::storage::mem::MemDisk;
use fat_ro::{dir, label};

fn main() {
    let mut args = std::env::args().skip(1);
    let image_path = args.next().expect("usage: dump_dir <image> [path]");
    let dir_path = args.next().unwrap_or_default();

    let bytes = std::fs::read(&image_path).expect("reading image file");
    let mut disk = MemDisk::new(bytes);

    if let Ok(Some(name)) = label(&mut disk) {
        let name = String::from_utf8_lossy(&name);
        println!("volume label: {}", name.trim_end());
    }

    dir(&mut disk, &dir_path, &mut |name, is_dir| {
        println!("{}{}", name, if is_dir { "/" } else { "" });
        false
    })
    .expect("listing directory");
}
