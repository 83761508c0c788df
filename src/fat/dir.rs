//! Short-name/long-name directory entry parsing and the scanner that
//! walks a directory's 32-byte entries to resolve a path component or
//! list its contents.
//!
//! Entries past byte 90 of a record that this crate doesn't interpret
//! (creation/access/modification timestamps) are skipped over rather
//! than decoded — reading them is out of scope for a read-only driver
//! that only needs names, attributes, size, and the start cluster.

use super::table;
use super::{Cursor, Start, Volume, ATTR_DIRECTORY, ATTR_LFN, ATTR_VALID_MASK, ATTR_VOLUME_ID};
use crate::error::Error;
use crate::storage::BlockDevice;
use crate::util::charset;

use core::convert::TryInto;

/// FAT allows up to 20 LFN entries (13 UTF-16 code units each) to spell
/// a single long name; this bounds the assembly buffer.
const MAX_LFN_SLOTS: usize = 20;
const NAME_BUF_LEN: usize = MAX_LFN_SLOTS * 13 * 3;

/// A decoded 32-byte short-name entry.
#[derive(Debug, Clone, Copy)]
struct RawEntry {
    name: [u8; 11],
    attributes: u8,
    first_cluster_high: u16,
    first_cluster_low: u16,
    file_size: u32,
}

impl RawEntry {
    fn parse(buf: &[u8; 32]) -> Self {
        Self {
            name: buf[0..11].try_into().unwrap(),
            attributes: buf[11],
            first_cluster_high: u16::from_le_bytes(buf[20..22].try_into().unwrap()),
            first_cluster_low: u16::from_le_bytes(buf[26..28].try_into().unwrap()),
            file_size: u32::from_le_bytes(buf[28..32].try_into().unwrap()),
        }
    }

    fn first_cluster(&self) -> u32 {
        ((self.first_cluster_high as u32) << 16) | self.first_cluster_low as u32
    }
}

/// Overlay of the same 32 bytes when `attributes == ATTR_LFN`.
struct RawLfnEntry {
    ord: u8,
    checksum: u8,
    fragment: [u16; 13],
}

impl RawLfnEntry {
    fn parse(buf: &[u8; 32]) -> Self {
        let mut fragment = [0u16; 13];
        for i in 0..5 {
            fragment[i] = u16::from_le_bytes(buf[1 + i * 2..3 + i * 2].try_into().unwrap());
        }
        for i in 0..6 {
            fragment[5 + i] = u16::from_le_bytes(buf[14 + i * 2..16 + i * 2].try_into().unwrap());
        }
        for i in 0..2 {
            fragment[11 + i] = u16::from_le_bytes(buf[28 + i * 2..30 + i * 2].try_into().unwrap());
        }
        Self { ord: buf[0], checksum: buf[13], fragment }
    }
}

/// Rotate-right-1, sum-of-bytes checksum linking a run of LFN entries
/// to the short-name entry that terminates them.
fn short_name_checksum(name: &[u8; 11]) -> u8 {
    let mut sum = 0u8;
    for &b in name {
        sum = sum.rotate_right(1).wrapping_add(b);
    }
    sum
}

/// Assembles a long name out of a run of LFN entries scanned in
/// on-disk (highest-ordinal-first) order.
struct LfnAssembler {
    expected_slot: u8,
    total_slots: u8,
    checksum: Option<u8>,
    units: [u16; MAX_LFN_SLOTS * 13],
}

impl LfnAssembler {
    fn new() -> Self {
        Self {
            expected_slot: 0,
            total_slots: 0,
            checksum: None,
            units: [0; MAX_LFN_SLOTS * 13],
        }
    }

    fn reset(&mut self) {
        self.expected_slot = 0;
        self.total_slots = 0;
        self.checksum = None;
    }

    fn accept(&mut self, entry: &RawLfnEntry) {
        let ord = entry.ord & 0x3F;

        if entry.ord & 0x40 != 0 {
            if ord == 0 || ord as usize > MAX_LFN_SLOTS {
                self.reset();
                return;
            }
            self.total_slots = ord;
            self.expected_slot = ord;
            self.checksum = Some(entry.checksum);
        }

        let checksum_mismatch = match self.checksum {
            Some(c) => c != entry.checksum,
            None => true,
        };
        if ord != self.expected_slot || self.expected_slot == 0 || checksum_mismatch {
            self.reset();
            return;
        }

        self.expected_slot -= 1;
        let base = self.expected_slot as usize * 13;
        self.units[base..base + 13].copy_from_slice(&entry.fragment);
    }

    fn pending(&self) -> bool {
        self.expected_slot == 0 && self.checksum.is_some()
    }

    /// Consumes the pending run: if its checksum matches `short_name`,
    /// decodes it into `out` and returns the byte length. Invalidates
    /// the run either way, per the scanner contract.
    fn take_if_checksum_matches(&mut self, short_name: &[u8; 11], out: &mut [u8]) -> Option<usize> {
        let expected = self.checksum?;
        let total = self.total_slots as usize;
        self.reset();

        if short_name_checksum(short_name) != expected {
            log::warn!(
                "LFN run checksum mismatch: expected {:#04x}, short name gives {:#04x}",
                expected,
                short_name_checksum(short_name)
            );
            return None;
        }

        Some(charset::utf16le_units_to_utf8(&self.units[..total * 13], out))
    }
}

/// Lowercases bytes 0..7 (stopping at NUL/space), then bytes 8..10,
/// joined by a `.` that's dropped if there's no extension.
fn synthesize_short_name(short: &[u8; 11], out: &mut [u8]) -> usize {
    let mut len = 0;
    for &b in &short[0..8] {
        if b == 0x00 || charset::is_ascii_space(b) {
            break;
        }
        out[len] = charset::ascii_lowercase(b);
        len += 1;
    }

    let before_dot = len;
    out[len] = b'.';
    len += 1;

    let mut ext_len = 0;
    for &b in &short[8..11] {
        if b == 0x00 || charset::is_ascii_space(b) {
            break;
        }
        out[len] = charset::ascii_lowercase(b);
        len += 1;
        ext_len += 1;
    }

    if ext_len == 0 {
        len = before_dot;
    }

    len
}

/// What a directory scan is looking for.
pub enum Lookup<'a> {
    /// Resolve a single named component (`resolve_component`).
    Named(&'a str),
    /// Visit every entry (`list_directory`); stops early if the hook
    /// returns `true`.
    List(&'a mut dyn FnMut(&str, bool) -> bool),
}

/// Reads one 32-byte directory entry at `offset`, with no LFN
/// interpretation — shared by `scan_directory` (which layers LFN
/// assembly on top) and `label` (which doesn't need it at all).
/// `None` at end-of-directory (an explicit `0x00` marker, or the
/// chain running out before one is seen).
fn next_raw_entry<D: BlockDevice>(
    disk: &mut D,
    volume: &Volume,
    cursor: &mut Cursor,
    offset: u64,
) -> Result<Option<[u8; 32]>, Error<D::Error>> {
    let mut raw = [0u8; 32];
    let n = table::read(disk, volume, cursor, offset, &mut raw, None)?;
    if n < 32 || raw[0] == 0x00 {
        Ok(None)
    } else {
        Ok(Some(raw))
    }
}

/// The shared body of `resolve_component` and `list_directory`: walks
/// a directory's raw 32-byte entries, assembling long names as it
/// goes, and either matches a single component or visits every entry.
fn scan_directory<D: BlockDevice>(
    disk: &mut D,
    volume: &Volume,
    cursor: &mut Cursor,
    mut lookup: Lookup<'_>,
) -> Result<(), Error<D::Error>> {
    if !cursor.is_directory() {
        return Err(Error::BadFileType("not a directory"));
    }

    let mut lfn = LfnAssembler::new();
    let mut name_buf = [0u8; NAME_BUF_LEN];
    let mut offset = 0u64;

    loop {
        let raw = match next_raw_entry(disk, volume, cursor, offset)? {
            Some(raw) => raw,
            None => {
                return match lookup {
                    Lookup::List(_) => Ok(()),
                    Lookup::Named(_) => Err(Error::FileNotFound),
                };
            }
        };

        let entry = RawEntry::parse(&raw);

        if entry.attributes == ATTR_LFN {
            lfn.accept(&RawLfnEntry::parse(&raw));
            offset += 32;
            continue;
        }

        if entry.name[0] == 0xE5 || (entry.attributes & !ATTR_VALID_MASK) != 0 {
            lfn.reset();
            offset += 32;
            continue;
        }

        let mut short_name = entry.name;
        if short_name[0] == 0x05 {
            log::warn!("0x05-escaped directory entry (real first byte is 0xE5)");
            short_name[0] = 0xE5;
        }

        let produced = if lfn.pending() {
            lfn.take_if_checksum_matches(&short_name, &mut name_buf)
        } else {
            None
        };
        lfn.reset();

        let name_len = match produced {
            Some(len) => len,
            None => synthesize_short_name(&short_name, &mut name_buf),
        };
        let name = core::str::from_utf8(&name_buf[..name_len]).unwrap_or("");
        let is_dir = entry.attributes & ATTR_DIRECTORY != 0;

        match &mut lookup {
            Lookup::List(hook) => {
                if hook(name, is_dir) {
                    return Ok(());
                }
            }
            Lookup::Named(component) => {
                if charset::compare(name.as_bytes(), component.as_bytes()) {
                    cursor.attributes = entry.attributes;
                    cursor.file_size = entry.file_size;
                    cursor.start = Start::Cluster(entry.first_cluster());
                    cursor.cached_logical_index = None;
                    return Ok(());
                }
            }
        }

        offset += 32;
    }
}

/// Consumes the leading `/`-delimited component of `path`, updating
/// `cursor` to refer to its directory entry. Returns the remaining
/// path (after the next `/`), or `None` if `component` was the last
/// one in `path`.
pub fn resolve_component<'p, D: BlockDevice>(
    disk: &mut D,
    volume: &Volume,
    cursor: &mut Cursor,
    path: &'p str,
) -> Result<Option<&'p str>, Error<D::Error>> {
    let path = path.strip_prefix('/').unwrap_or(path);
    let (component, rest) = match path.find('/') {
        Some(idx) => (&path[..idx], Some(&path[idx + 1..])),
        None => (path, None),
    };

    scan_directory(disk, volume, cursor, Lookup::Named(component))?;

    Ok(rest)
}

/// Visits every entry of the directory `cursor` refers to, in on-disk
/// order, calling `hook(name, is_dir)` for each. Stops early if `hook`
/// returns `true`.
pub fn list_directory<D: BlockDevice>(
    disk: &mut D,
    volume: &Volume,
    cursor: &mut Cursor,
    hook: &mut dyn FnMut(&str, bool) -> bool,
) -> Result<(), Error<D::Error>> {
    scan_directory(disk, volume, cursor, Lookup::List(hook))
}

/// Scans a directory's *raw* entries — no LFN assembly — for the
/// first one whose attribute byte is exactly `VOLUME_ID`, returning
/// its 11-byte short name. `None` at end-of-directory.
pub fn label<D: BlockDevice>(
    disk: &mut D,
    volume: &Volume,
    cursor: &mut Cursor,
) -> Result<Option<[u8; 11]>, Error<D::Error>> {
    let mut offset = 0u64;
    loop {
        let raw = match next_raw_entry(disk, volume, cursor, offset)? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        if raw[11] == ATTR_VOLUME_ID {
            let mut name = [0u8; 11];
            name.copy_from_slice(&raw[0..11]);
            return Ok(Some(name));
        }

        offset += 32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fat::{FatVariant, Volume};
    use crate::storage::mem::MemDisk;
    use std::string::{String, ToString};
    use std::vec::Vec;

    /// One-cluster-per-sector FAT16 disk whose cluster 2 is a
    /// directory we fill in by hand.
    fn disk_with_one_dir_cluster() -> (MemDisk, Volume, Cursor) {
        let sector = 512u64;
        let fat_start = 1u64;
        let fat_sectors = 1u64;
        let cluster_region_start = fat_start + fat_sectors;
        let total_sectors = cluster_region_start + 2;

        let mut disk = MemDisk::zeroed((total_sectors * sector) as usize);
        let bytes = disk.bytes_mut();
        let fat_off = (fat_start * sector) as usize;
        bytes[fat_off..fat_off + 2].copy_from_slice(&0xFFF8u16.to_le_bytes());
        bytes[fat_off + 2..fat_off + 4].copy_from_slice(&0xFFFFu16.to_le_bytes());
        bytes[fat_off + 4..fat_off + 6].copy_from_slice(&0xFFFFu16.to_le_bytes());

        let volume = Volume {
            fat_variant: FatVariant::Fat16,
            logical_sector_bits: 0,
            cluster_bits: 0,
            fat_start_sector: fat_start,
            sectors_per_fat: fat_sectors,
            num_fats: 1,
            root_start_sector: 0,
            num_root_sectors: 0,
            cluster_region_start_sector: cluster_region_start,
            num_clusters: 5000,
            cluster_eof_mark: 0xFFF8,
        };

        let cursor = Cursor {
            start: Start::Cluster(2),
            attributes: ATTR_DIRECTORY,
            file_size: 0,
            cached_logical_index: None,
            cached_cluster: 0,
        };

        (disk, volume, cursor)
    }

    fn dir_cluster_mut<'d>(disk: &'d mut MemDisk, cluster_region_start_sector: u64) -> &'d mut [u8] {
        let off = (cluster_region_start_sector * 512) as usize;
        &mut disk.bytes_mut()[off..off + 512]
    }

    fn write_short_entry(buf: &mut [u8], idx: usize, name: &[u8; 11], attr: u8, cluster: u32, size: u32) {
        let base = idx * 32;
        buf[base..base + 11].copy_from_slice(name);
        buf[base + 11] = attr;
        buf[base + 20..base + 22].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
        buf[base + 26..base + 28].copy_from_slice(&(cluster as u16).to_le_bytes());
        buf[base + 28..base + 32].copy_from_slice(&size.to_le_bytes());
    }

    #[test]
    fn matches_short_name_case_insensitively_via_lowercase_synthesis() {
        let (mut disk, volume, mut cursor) = disk_with_one_dir_cluster();
        {
            let cl = dir_cluster_mut(&mut disk, volume.cluster_region_start_sector);
            write_short_entry(cl, 0, b"README  TXT", 0, 5, 123);
        }

        let rest = resolve_component(&mut disk, &volume, &mut cursor, "readme.txt").unwrap();
        assert_eq!(rest, None);
        assert_eq!(cursor.file_size, 123);
        assert_eq!(cursor.start, Start::Cluster(5));
    }

    #[test]
    fn end_of_directory_without_match_is_file_not_found() {
        let (mut disk, volume, mut cursor) = disk_with_one_dir_cluster();
        let err = resolve_component(&mut disk, &volume, &mut cursor, "missing").unwrap_err();
        assert!(matches!(err, Error::FileNotFound));
    }

    #[test]
    fn listing_visits_every_entry_until_hook_stops() {
        let (mut disk, volume, mut cursor) = disk_with_one_dir_cluster();
        {
            let cl = dir_cluster_mut(&mut disk, volume.cluster_region_start_sector);
            write_short_entry(cl, 0, b"A       TXT", 0, 5, 1);
            write_short_entry(cl, 1, b"B          ", ATTR_DIRECTORY, 6, 0);
        }

        let mut seen = alloc_vec();
        list_directory(&mut disk, &volume, &mut cursor, &mut |name, is_dir| {
            seen.push((name.to_string(), is_dir));
            false
        })
        .unwrap();

        assert_eq!(
            seen,
            [("a.txt".to_string(), false), ("b".to_string(), true)]
        );
    }

    fn alloc_vec() -> Vec<(String, bool)> {
        Vec::new()
    }

    #[test]
    fn leading_0x05_is_unescaped_to_0xe5() {
        // The scanner rewrites a leading 0x05 (Japanese 0xE5-as-data
        // workaround) to 0xE5 before synthesizing the display name.
        let mut short = *b"\x05OULDER TXT";
        if short[0] == 0x05 {
            short[0] = 0xE5;
        }

        let mut out = [0u8; 32];
        let len = synthesize_short_name(&short, &mut out);
        assert_eq!(&out[..len][..1], &[0xE5]);
    }

    #[test]
    fn label_finds_volume_id_entry() {
        let (mut disk, volume, root) = disk_with_one_dir_cluster();
        {
            let cl = dir_cluster_mut(&mut disk, volume.cluster_region_start_sector);
            write_short_entry(cl, 0, b"NO NAME    ", ATTR_VOLUME_ID, 0, 0);
        }
        let mut cursor = root;
        let found = label(&mut disk, &volume, &mut cursor).unwrap();
        assert_eq!(found.unwrap(), *b"NO NAME    ");
    }

    #[test]
    fn checksum_matches_reference_algorithm() {
        // Known vector: short name "README  TXT" (11 bytes).
        let name = *b"README  TXT";
        let sum = short_name_checksum(&name);
        // Recompute by hand to cross-check the rotate/add order.
        let mut expected = 0u8;
        for &b in &name {
            expected = expected.rotate_right(1).wrapping_add(b);
        }
        assert_eq!(sum, expected);
    }
}
