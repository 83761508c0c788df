//! The C-ABI surface: a filesystem registration record (`{name, dir,
//! open, read, close, label, next}`) and the `extern "C"` entry points
//! a host-managed registry calls during module init/fini.
//!
//! Per Design Note 1 in the spec this drops the module-global
//! refcounting state GRUB-style loaders keep for unloading a module —
//! that's loader policy, not part of this driver.

use crate::fs;

use core::ffi::c_void;

pub mod edisk {
    //! An FFI-backed [`BlockDevice`], grounded in the teacher's
    //! `eDisk_*` C calls (the disk primitives a small BIOS/bootloader
    //! exposes) — one `eDisk_Read` per 512-byte sector touched.

    use super::BlockDevice;
    use crate::storage::ReadObserver;

    #[repr(C)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum DResult {
        ResOk = 0,
        ResError = 1,
        ResWrPrt = 2,
        ResNotRdy = 3,
        ResParErr = 4,
    }

    extern "C" {
        fn eDisk_Read(drv: u8, buff: *mut u8, sector: u32, count: u32) -> DResult;
    }

    #[repr(C)]
    #[derive(Debug, Clone, Copy)]
    pub struct EDiskStorage {
        pub drive_num: u8,
    }

    impl BlockDevice for EDiskStorage {
        type Error = DResult;

        fn read(
            &mut self,
            sector: u64,
            offset_in_sector: u32,
            buf: &mut [u8],
            mut observer: Option<ReadObserver<'_>>,
        ) -> Result<(), Self::Error> {
            let sector_size = 1u32 << Self::PHYSICAL_SECTOR_BITS;
            let mut remaining = buf.len() as u32;
            let mut written = 0usize;
            let mut cur_sector = sector;
            let mut cur_offset = offset_in_sector;
            let mut scratch = [0u8; 512];

            while remaining > 0 {
                let in_this_sector = remaining.min(sector_size - cur_offset);

                match unsafe { eDisk_Read(self.drive_num, scratch.as_mut_ptr(), cur_sector as u32, 1) } {
                    DResult::ResOk => {}
                    e => return Err(e),
                }

                buf[written..written + in_this_sector as usize].copy_from_slice(
                    &scratch[cur_offset as usize..cur_offset as usize + in_this_sector as usize],
                );

                if let Some(obs) = observer.as_mut() {
                    obs(cur_sector, cur_offset, in_this_sector);
                }

                written += in_this_sector as usize;
                remaining -= in_this_sector;
                cur_sector += 1;
                cur_offset = 0;
            }

            Ok(())
        }
    }
}

use edisk::EDiskStorage;

/// Caller-allocated handle for an open file; `fat_open` fills one in,
/// `fat_read`/`fat_close` operate on it by pointer. No heap allocation
/// happens on this side of the boundary.
#[repr(C)]
pub struct FileHandle {
    drive_num: u8,
    inner: fs::File,
}

unsafe fn str_from_raw<'a>(ptr: *const u8, len: u32) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    core::str::from_utf8(core::slice::from_raw_parts(ptr, len as usize)).ok()
}

pub type DirHook = extern "C" fn(name: *const u8, name_len: u32, is_dir: i32, ctx: *mut c_void) -> i32;

extern "C" fn fat_dir(drive_num: u8, path: *const u8, path_len: u32, hook: DirHook, ctx: *mut c_void) -> i32 {
    let path = match unsafe { str_from_raw(path, path_len) } {
        Some(p) => p,
        None => return -1,
    };
    let mut disk = EDiskStorage { drive_num };

    let result = fs::dir(&mut disk, path, &mut |name, is_dir| {
        hook(name.as_ptr(), name.len() as u32, is_dir as i32, ctx) != 0
    });

    match result {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

extern "C" fn fat_open(drive_num: u8, path: *const u8, path_len: u32, out: *mut FileHandle) -> i32 {
    let path = match unsafe { str_from_raw(path, path_len) } {
        Some(p) => p,
        None => return -1,
    };
    if out.is_null() {
        return -1;
    }

    let mut disk = EDiskStorage { drive_num };
    match fs::open(&mut disk, path) {
        Ok(file) => {
            unsafe { out.write(FileHandle { drive_num, inner: file }) };
            0
        }
        Err(_) => -1,
    }
}

extern "C" fn fat_read(file: *mut FileHandle, buf: *mut u8, len: u32, offset: u64) -> i64 {
    if file.is_null() || buf.is_null() {
        return -1;
    }

    let handle = unsafe { &mut *file };
    let mut disk = EDiskStorage { drive_num: handle.drive_num };
    let out = unsafe { core::slice::from_raw_parts_mut(buf, len as usize) };

    match fs::read(&mut disk, &mut handle.inner, offset, out, None) {
        Ok(n) => n as i64,
        Err(_) => -1,
    }
}

extern "C" fn fat_close(file: *mut FileHandle) {
    if !file.is_null() {
        let handle = unsafe { core::ptr::read(file) };
        fs::close(handle.inner);
    }
}

extern "C" fn fat_label(drive_num: u8, out: *mut u8) -> i32 {
    if out.is_null() {
        return -1;
    }
    let mut disk = EDiskStorage { drive_num };
    match fs::label(&mut disk) {
        Ok(Some(name)) => {
            unsafe { core::ptr::copy_nonoverlapping(name.as_ptr(), out, 11) };
            0
        }
        Ok(None) => 1,
        Err(_) => -1,
    }
}

/// The registration record published to the host's filesystem
/// registry: `{ name = "fat", dir, open, read, close, label, next }`.
#[repr(C)]
pub struct FsOps {
    pub name: *const u8,
    pub dir: extern "C" fn(u8, *const u8, u32, DirHook, *mut c_void) -> i32,
    pub open: extern "C" fn(u8, *const u8, u32, *mut FileHandle) -> i32,
    pub read: extern "C" fn(*mut FileHandle, *mut u8, u32, u64) -> i64,
    pub close: extern "C" fn(*mut FileHandle),
    pub label: extern "C" fn(u8, *mut u8) -> i32,
    pub next: *mut FsOps,
}

unsafe impl Sync for FsOps {}

const FS_NAME: &[u8] = b"fat\0";

static mut FAT_FS_OPS: FsOps = FsOps {
    name: FS_NAME.as_ptr(),
    dir: fat_dir,
    open: fat_open,
    read: fat_read,
    close: fat_close,
    label: fat_label,
    next: core::ptr::null_mut(),
};

extern "C" {
    fn fs_register(fs: *mut FsOps);
    fn fs_unregister(fs: *mut FsOps);
}

#[no_mangle]
pub extern "C" fn fat_mod_init() {
    unsafe { fs_register(core::ptr::addr_of_mut!(FAT_FS_OPS)) };
}

#[no_mangle]
pub extern "C" fn fat_mod_fini() {
    unsafe { fs_unregister(core::ptr::addr_of_mut!(FAT_FS_OPS)) };
}
