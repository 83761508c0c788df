//! The public facade: `mount`/`dir`/`open`/`read`/`close`/`label`, each
//! a thin, stateless wrapper around the BPB decoder, chain walker, and
//! directory scanner in [`crate::fat`].

use crate::error::Error;
use crate::fat::{self, Cursor, Volume};
use crate::storage::{BlockDevice, ReadObserver};

/// A file opened by [`open`]. Carries its own `Volume`/`Cursor` rather
/// than a reference to the mount, since nothing here keeps the disk
/// handle around between calls — the host re-presents it on every
/// operation, per the driver's synchronous, single-threaded contract.
#[derive(Debug, Clone, Copy)]
pub struct File {
    volume: Volume,
    cursor: Cursor,
}

impl File {
    pub fn size(&self) -> u32 {
        self.cursor.file_size
    }
}

/// Reads the BPB and validates it into a [`Volume`] plus a
/// root-positioned [`Cursor`].
pub fn mount<D: BlockDevice>(disk: &mut D) -> Result<(Volume, Cursor), Error<D::Error>> {
    fat::mount(disk)
}

fn walk_path<D: BlockDevice>(
    disk: &mut D,
    volume: &Volume,
    cursor: &mut Cursor,
    path: &str,
) -> Result<(), Error<D::Error>> {
    let mut remaining = path;
    while !remaining.is_empty() {
        match fat::dir::resolve_component(disk, volume, cursor, remaining)? {
            Some(rest) => remaining = rest,
            None => break,
        }
    }
    Ok(())
}

/// Mounts, resolves `path` down to its terminal directory, then visits
/// every entry of that directory via `hook(name, is_dir)`. An empty
/// `path` lists the root.
pub fn dir<D: BlockDevice>(
    disk: &mut D,
    path: &str,
    hook: &mut dyn FnMut(&str, bool) -> bool,
) -> Result<(), Error<D::Error>> {
    let (volume, mut cursor) = fat::mount(disk)?;
    walk_path(disk, &volume, &mut cursor, path)?;
    fat::dir::list_directory(disk, &volume, &mut cursor, hook)
}

/// Mounts and resolves `path` to a file, failing if it names a
/// directory instead.
pub fn open<D: BlockDevice>(disk: &mut D, path: &str) -> Result<File, Error<D::Error>> {
    let (volume, mut cursor) = fat::mount(disk)?;
    walk_path(disk, &volume, &mut cursor, path)?;

    if cursor.is_directory() {
        return Err(Error::BadFileType("not a file"));
    }

    Ok(File { volume, cursor })
}

/// Reads up to `buf.len()` bytes from `file` at `offset` (maintained
/// by the host, not by `File`). Delegates to the cluster-chain walker.
pub fn read<D: BlockDevice>(
    disk: &mut D,
    file: &mut File,
    offset: u64,
    buf: &mut [u8],
    observer: Option<ReadObserver<'_>>,
) -> Result<usize, Error<D::Error>> {
    fat::table::read(disk, &file.volume, &mut file.cursor, offset, buf, observer)
}

/// Releases `file`. There's nothing to flush or free — a read-only
/// driver holds no buffers past the end of a single `read` call — so
/// this just drops the handle.
pub fn close(_file: File) {}

/// Mounts and scans the root directory's raw entries for a volume
/// label, returning its 11-byte short name verbatim.
pub fn label<D: BlockDevice>(disk: &mut D) -> Result<Option<[u8; 11]>, Error<D::Error>> {
    let (volume, mut cursor) = fat::mount(disk)?;
    fat::dir::label(disk, &volume, &mut cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mem::MemDisk;

    /// Builds a minimal FAT16 image: BPB, one FAT, a fixed root with a
    /// single file entry pointing at cluster 2, whose only cluster
    /// holds known bytes.
    fn fat16_image_with_one_file(contents: &[u8]) -> MemDisk {
        let sector = 512usize;
        let reserved = 1u64;
        let num_fats = 1u64;
        let sectors_per_fat = 1u64;
        let root_entries = 16u64;
        let root_sectors = (root_entries * 32 + sector as u64 - 1) / sector as u64;
        let fat_start = reserved;
        let root_start = fat_start + num_fats * sectors_per_fat;
        let cluster_region_start = root_start + root_sectors;
        // Enough trailing clusters to push `num_clusters` past the
        // FAT12/FAT16 threshold (4087), so this mounts as FAT16 and
        // the FAT entries below can use the plain 16-bit-per-entry
        // layout instead of FAT12's nibble-packed one.
        let total_sectors = cluster_region_start + 4100;

        let mut disk = MemDisk::zeroed(total_sectors as usize * sector);
        let bytes = disk.bytes_mut();

        // BPB.
        bytes[0x00B..0x00D].copy_from_slice(&512u16.to_le_bytes());
        bytes[0x00D] = 1; // sectors per cluster
        bytes[0x00E..0x010].copy_from_slice(&(reserved as u16).to_le_bytes());
        bytes[0x010] = num_fats as u8;
        bytes[0x011..0x013].copy_from_slice(&(root_entries as u16).to_le_bytes());
        bytes[0x013..0x015].copy_from_slice(&(total_sectors as u16).to_le_bytes());
        bytes[0x015] = 0xF8;
        bytes[0x016..0x018].copy_from_slice(&(sectors_per_fat as u16).to_le_bytes());

        // FAT: entry 0 sentinel, entry 1 reserved, entry 2 = EOF (one-cluster file).
        let fat_off = (fat_start as usize) * sector;
        bytes[fat_off..fat_off + 2].copy_from_slice(&0xFFF8u16.to_le_bytes());
        bytes[fat_off + 2..fat_off + 4].copy_from_slice(&0xFFFFu16.to_le_bytes());
        bytes[fat_off + 4..fat_off + 6].copy_from_slice(&0xFFFFu16.to_le_bytes());

        // Root entry: "HELLO   TXT", cluster 2, size = contents.len().
        let root_off = (root_start as usize) * sector;
        bytes[root_off..root_off + 11].copy_from_slice(b"HELLO   TXT");
        bytes[root_off + 11] = 0; // attributes
        bytes[root_off + 20..root_off + 22].copy_from_slice(&0u16.to_le_bytes());
        bytes[root_off + 26..root_off + 28].copy_from_slice(&2u16.to_le_bytes());
        bytes[root_off + 28..root_off + 32].copy_from_slice(&(contents.len() as u32).to_le_bytes());

        // Cluster 2 contents.
        let cluster_off = (cluster_region_start as usize) * sector;
        bytes[cluster_off..cluster_off + contents.len()].copy_from_slice(contents);

        disk
    }

    #[test]
    fn open_and_read_round_trips_file_contents() {
        let mut disk = fat16_image_with_one_file(b"hello, world");
        let mut file = open(&mut disk, "hello.txt").unwrap();
        assert_eq!(file.size(), 12);

        let mut buf = [0u8; 12];
        let n = read(&mut disk, &mut file, 0, &mut buf, None).unwrap();
        assert_eq!(n, 12);
        assert_eq!(&buf, b"hello, world");

        close(file);
    }

    #[test]
    fn open_rejects_missing_file() {
        let mut disk = fat16_image_with_one_file(b"x");
        let err = open(&mut disk, "nope.txt").unwrap_err();
        assert!(matches!(err, Error::FileNotFound));
    }

    #[test]
    fn dir_lists_root_entries() {
        let mut disk = fat16_image_with_one_file(b"x");
        let mut names = alloc_vec();
        dir(&mut disk, "", &mut |name, is_dir| {
            names.push((std::string::String::from(name), is_dir));
            false
        })
        .unwrap();
        assert_eq!(names, [(std::string::String::from("hello.txt"), false)]);
    }

    fn alloc_vec() -> std::vec::Vec<(std::string::String, bool)> {
        std::vec::Vec::new()
    }
}
