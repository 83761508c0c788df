//! Parsing for the BIOS Parameter Block (BPB) and its FAT32 extension.
//!
//! Field offsets and names follow the DOS 2.0 / DOS 3.31 / FAT32 EBPB
//! layout; see <https://en.wikipedia.org/wiki/Design_of_the_FAT_file_system>.
//! Time/date fields and the volume-label/filesystem-type strings that sit
//! past byte 90 aren't read — interpreting them is explicitly out of
//! scope.

use core::convert::TryInto;

/// The first 90 bytes of sector 0, decoded but not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiosParameterBlock {
    // From the DOS 2.0 BPB:
    /// Bytes per logical sector; must be a power of two.
    // Offset: 0x00B
    pub bytes_per_logical_sector: u16,

    /// Logical sectors per cluster; must be a power of two.
    // Offset: 0x00D
    pub logical_sectors_per_cluster: u8,

    // Offset: 0x00E
    pub num_reserved_logical_sectors: u16,

    // Offset: 0x010
    pub num_file_alloc_tables: u8,

    /// Zero for FAT32.
    // Offset: 0x011
    pub max_root_dir_entries: u16,

    /// Zero when the sector count doesn't fit in 16 bits (see
    /// `total_logical_sectors_extended`).
    // Offset: 0x013
    pub total_logical_sectors: u16,

    // Offset: 0x015
    pub media_descriptor: u8,

    /// Zero for FAT32 (`logical_sectors_per_fat_extended` is used instead).
    // Offset: 0x016
    pub logical_sectors_per_fat: u16,

    // From the DOS 3.31 BPB:
    // Offset: 0x018
    pub phys_sectors_per_track: u16,
    // Offset: 0x01A
    pub num_heads: u16,
    // Offset: 0x01C
    pub hidden_preceeding_sectors: u32,
    // Offset: 0x020
    pub total_logical_sectors_extended: u32,

    // FAT32 extension:
    /// Logical sectors per FAT, FAT32 only.
    // Offset: 0x024
    pub logical_sectors_per_fat_extended: u32,

    /// Bit 7: FAT mirroring disabled, bits 3-0 name the active FAT.
    // Offset: 0x028
    pub extended_flags: u16,

    /// Should be zero; FAT32 drivers should refuse unknown versions.
    // Offset: 0x02A
    pub fs_version: u16,

    /// First cluster of the root directory, FAT32 only.
    // Offset: 0x02C
    pub root_cluster: u32,

    // Offset: 0x030
    pub fs_info_sector: u16,
    // Offset: 0x032
    pub backup_boot_sector: u16,
}

impl BiosParameterBlock {
    /// Parses the first 90 bytes of sector 0. Does not validate anything —
    /// see `fat::Volume::mount` for the checks that turn this into a
    /// trustworthy `Volume`.
    pub fn read(sector0_prefix: &[u8; 90]) -> Self {
        let b = sector0_prefix;

        macro_rules! e {
            ($ty:tt, $offset:literal) => {
                $ty::from_le_bytes(
                    b[$offset..($offset + core::mem::size_of::<$ty>())]
                        .try_into()
                        .unwrap(),
                )
            };
        }

        Self {
            bytes_per_logical_sector: e!(u16, 0x00B),
            logical_sectors_per_cluster: e!(u8, 0x00D),
            num_reserved_logical_sectors: e!(u16, 0x00E),
            num_file_alloc_tables: e!(u8, 0x010),
            max_root_dir_entries: e!(u16, 0x011),
            total_logical_sectors: e!(u16, 0x013),
            media_descriptor: e!(u8, 0x015),
            logical_sectors_per_fat: e!(u16, 0x016),

            phys_sectors_per_track: e!(u16, 0x018),
            num_heads: e!(u16, 0x01A),
            hidden_preceeding_sectors: e!(u32, 0x01C),
            total_logical_sectors_extended: e!(u32, 0x020),

            logical_sectors_per_fat_extended: e!(u32, 0x024),
            extended_flags: e!(u16, 0x028),
            fs_version: e!(u16, 0x02A),
            root_cluster: e!(u32, 0x02C),
            fs_info_sector: e!(u16, 0x030),
            backup_boot_sector: e!(u16, 0x032),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fields_at_documented_offsets() {
        let mut raw = [0u8; 90];
        raw[0x00B..0x00D].copy_from_slice(&512u16.to_le_bytes());
        raw[0x00D] = 4;
        raw[0x00E..0x010].copy_from_slice(&1u16.to_le_bytes());
        raw[0x010] = 2;
        raw[0x015] = 0xF8;
        raw[0x02C..0x030].copy_from_slice(&2u32.to_le_bytes());

        let bpb = BiosParameterBlock::read(&raw);
        assert_eq!(bpb.bytes_per_logical_sector, 512);
        assert_eq!(bpb.logical_sectors_per_cluster, 4);
        assert_eq!(bpb.num_reserved_logical_sectors, 1);
        assert_eq!(bpb.num_file_alloc_tables, 2);
        assert_eq!(bpb.media_descriptor, 0xF8);
        assert_eq!(bpb.root_cluster, 2);
    }
}
