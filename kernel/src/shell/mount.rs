/// Mount resolver and automount prober.
///
/// The mount slot is the single system-wide reference to the active root
/// filesystem. A mount attempt owns its device descriptor and volume as
/// values, so every failure path releases them by dropping — there is no
/// close call to forget after an early return.
use alloc::boxed::Box;
use core::fmt;

use crate::fs::{DirHandle, FsError, Volume};
use super::ShellContext;
use crate::con_println;

#[derive(Debug)]
pub enum MountError {
    /// The mount slot is already populated.
    AlreadyMounted,
    /// No device registered under that name and unit.
    DeviceNotFound,
    /// No filesystem driver registered under that type name.
    UnknownFsType,
    /// The driver refused to open a volume on the device.
    VolumeOpenFailed(FsError),
    /// The volume opened but has no root directory.
    NoRootDirectory(FsError),
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountError::AlreadyMounted => write!(f, "root filesystem already mounted"),
            MountError::DeviceNotFound => write!(f, "device not found"),
            MountError::UnknownFsType => write!(f, "unknown filesystem type"),
            MountError::VolumeOpenFailed(e) => write!(f, "volume open failed: {}", e),
            MountError::NoRootDirectory(e) => write!(f, "no root directory: {}", e),
        }
    }
}

/// The single mount slot. At most one populated at any time.
pub struct MountSlot {
    slot: Option<Mounted>,
}

/// A mounted volume and its root. Field order drops the root handle before
/// the volume that produced it.
struct Mounted {
    root: Box<dyn DirHandle>,
    _volume: Box<dyn Volume>,
}

impl MountSlot {
    pub const fn empty() -> Self {
        Self { slot: None }
    }

    pub fn is_mounted(&self) -> bool {
        self.slot.is_some()
    }

    /// The mounted root directory, if any.
    pub fn root_mut(&mut self) -> Option<&mut (dyn DirHandle + 'static)> {
        self.slot.as_mut().map(|m| m.root.as_mut())
    }

    /// Release the slot. Returns whether it was populated; releasing an
    /// empty slot is a no-op, never an error.
    pub fn clear(&mut self) -> bool {
        self.slot.take().is_some()
    }

    fn install(&mut self, volume: Box<dyn Volume>, root: Box<dyn DirHandle>) {
        self.slot = Some(Mounted {
            root,
            _volume: volume,
        });
    }
}

/// Resolve and install a root filesystem:
/// open device -> look up driver -> open volume -> resolve root -> install.
pub fn mount(
    ctx: &mut ShellContext,
    device: &str,
    unit: u32,
    fstype: &str,
) -> Result<(), MountError> {
    if ctx.mount.is_mounted() {
        return Err(MountError::AlreadyMounted);
    }

    // The descriptor is scoped to this attempt; each `?` below drops and
    // thereby releases it.
    let dev = ctx
        .devices
        .open(device, unit)
        .map_err(|_| MountError::DeviceNotFound)?;
    let driver = ctx.fs.lookup(fstype).ok_or(MountError::UnknownFsType)?;
    let mut volume = driver
        .open_volume(dev)
        .map_err(MountError::VolumeOpenFailed)?;
    let root = volume.root().map_err(MountError::NoRootDirectory)?;

    ctx.mount.install(volume, root);
    Ok(())
}

/// Release the mount slot, reporting either way.
pub fn unmount(ctx: &mut ShellContext) {
    if ctx.mount.clear() {
        con_println!(ctx.console, "unmounting root directory");
    } else {
        con_println!(ctx.console, "nothing currently mounted");
    }
}

/// Candidate device classes with their filesystem type, probed in order.
pub const AUTOMOUNT_CANDIDATES: &[(&str, &str)] = &[("atapi", "cdromfs"), ("ata", "simplefs")];

/// Units probed per device class.
pub const AUTOMOUNT_UNITS: u32 = 4;

/// Probe the fixed candidate list once, stopping at the first success.
/// Returns whether anything mounted.
pub fn automount(ctx: &mut ShellContext) -> bool {
    for &(device, fstype) in AUTOMOUNT_CANDIDATES {
        for unit in 0..AUTOMOUNT_UNITS {
            con_println!(ctx.console, "automount: trying {} unit {}", device, unit);
            if mount(ctx, device, unit, fstype).is_ok() {
                con_println!(
                    ctx.console,
                    "automount: mounted {} on {} unit {}",
                    fstype,
                    device,
                    unit
                );
                return true;
            }
        }
    }
    con_println!(ctx.console, "automount: no bootable devices available");
    false
}
