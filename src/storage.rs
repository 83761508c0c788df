//! The block-device abstraction this driver is built against.
//!
//! This is the external collaborator from the spec: the driver never
//! touches a disk directly, it only ever goes through [`BlockDevice`].
//! The concrete device (a real disk, a ramdisk, a file on a host OS) is
//! the host's problem.

use core::fmt::Debug;

/// Observer invoked once per underlying physical-sector read a call to
/// [`BlockDevice::read`] performs, as `(sector, offset_in_sector, len)`.
///
/// Used by the cluster-chain walker to let a host instrument which
/// sectors a read actually touched; registered only for the duration of
/// a single data read and cleared immediately after, regardless of
/// outcome.
pub type ReadObserver<'a> = &'a mut dyn FnMut(u64, u32, u32);

/// A sector-addressed, byte-range-readable storage medium.
///
/// Implementors provide the other half of the read-only contract: the
/// driver works out *which* bytes it needs (a BPB, a FAT entry, a
/// directory entry, a run of cluster data) and hands off the actual I/O
/// here. `sector` is in units of [`BlockDevice::PHYSICAL_SECTOR_BITS`]
/// (2^9 = 512 bytes by default, i.e. `GRUB_DISK_SECTOR_BITS`); `len` is
/// not required to fit within a single physical sector — an
/// implementation that needs to fan a request out across several sectors
/// is expected to do so transparently, invoking `observer` once per
/// sector it touches.
pub trait BlockDevice {
    type Error: Debug;

    /// log2 of the physical sector size in bytes.
    const PHYSICAL_SECTOR_BITS: u32 = 9;

    fn read(
        &mut self,
        sector: u64,
        offset_in_sector: u32,
        buf: &mut [u8],
        observer: Option<ReadObserver<'_>>,
    ) -> Result<(), Self::Error>;
}

#[inline]
pub(crate) fn sector_and_offset(physical_sector_bits: u32, abs_byte_offset: u64) -> (u64, u32) {
    let sector_size = 1u64 << physical_sector_bits;
    (
        abs_byte_offset >> physical_sector_bits,
        (abs_byte_offset & (sector_size - 1)) as u32,
    )
}

#[cfg(feature = "std")]
pub mod mem {
    //! A `Vec<u8>`-backed [`BlockDevice`], used by this crate's own tests
    //! and by host programs that have loaded an image into memory.
    //!
    //! Grounded in the teacher's `FileBackedStorage` (used throughout
    //! `tests/file_backed.rs` and the `examples/` binaries).

    use super::{BlockDevice, ReadObserver};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OutOfRange {
        pub requested_offset: u64,
    }

    /// A whole disk image kept in a `Vec<u8>`, addressed in 512-byte
    /// physical sectors.
    #[derive(Debug, Clone)]
    pub struct MemDisk {
        bytes: Vec<u8>,
    }

    impl MemDisk {
        pub fn new(bytes: Vec<u8>) -> Self {
            Self { bytes }
        }

        pub fn zeroed(len: usize) -> Self {
            Self { bytes: vec![0u8; len] }
        }

        pub fn bytes_mut(&mut self) -> &mut [u8] {
            &mut self.bytes
        }

        pub fn into_inner(self) -> Vec<u8> {
            self.bytes
        }
    }

    impl BlockDevice for MemDisk {
        type Error = OutOfRange;

        fn read(
            &mut self,
            sector: u64,
            offset_in_sector: u32,
            buf: &mut [u8],
            observer: Option<ReadObserver<'_>>,
        ) -> Result<(), Self::Error> {
            let start = sector * (1u64 << Self::PHYSICAL_SECTOR_BITS) + offset_in_sector as u64;
            let end = start + buf.len() as u64;

            if end > self.bytes.len() as u64 {
                return Err(OutOfRange { requested_offset: start });
            }

            buf.copy_from_slice(&self.bytes[start as usize..end as usize]);

            if let Some(observer) = observer {
                let sector_size = 1u64 << Self::PHYSICAL_SECTOR_BITS;
                let mut remaining = buf.len() as u32;
                let mut cur_sector = sector;
                let mut cur_offset = offset_in_sector;

                while remaining > 0 {
                    let in_this_sector = remaining.min((sector_size as u32) - cur_offset);
                    observer(cur_sector, cur_offset, in_this_sector);

                    remaining -= in_this_sector;
                    cur_sector += 1;
                    cur_offset = 0;
                }
            }

            Ok(())
        }
    }
}
