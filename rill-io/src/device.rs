//! Byte-device abstraction at the bottom of the stream stack.

use bitflags::bitflags;

use crate::error::{
    DeviceError,
    Result,
};
use crate::state::SeekDir;

bitflags! {
    /// Capability bits advertised by a device.
    pub struct DevCaps: u8 {
        /// Mutating operations are refused.
        const READ_ONLY = 0x1;
        /// `map`/`map_mut` expose spans directly inside the device.
        const MAPPABLE = 0x2;
        /// `seek` repositions instead of failing.
        const SEEKABLE = 0x4;
    }
}

/// Raw byte channel: an OS file, an in-memory byte sequence, an archive
/// entry, or a process stream.
///
/// Every method reports failure by value; nothing here panics across the
/// boundary. Partial reads and writes are normal and the buffered layer
/// retries the remainder.
pub trait Device {
    /// Capability bits of this device.
    fn caps(&self) -> DevCaps {
        DevCaps::empty()
    }

    /// Pulls up to `buf.len()` bytes; `Ok(0)` is a clean end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Pushes up to `buf.len()` bytes, returning how many were accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Repositions the byte cursor, returning the new absolute offset.
    fn seek(&mut self, _off: i64, _dir: SeekDir) -> Result<u64> {
        Err(DeviceError::Unsupported)
    }

    /// Commits previously accepted bytes.
    fn flush(&mut self) -> Result<()>;

    /// Maps a readable span at the cursor without copying; pair with
    /// [`Device::advance`]. `None` when unmappable or exhausted.
    fn map(&mut self) -> Option<&[u8]> {
        None
    }

    /// Maps a writable span at the cursor, growing the device if needed.
    fn map_mut(&mut self) -> Option<&mut [u8]> {
        None
    }

    /// Moves the cursor past `n` mapped bytes.
    fn advance(&mut self, _n: usize) {}

    /// Cuts the device at the current cursor position.
    fn truncate(&mut self) -> Result<()> {
        Err(DeviceError::Unsupported)
    }

    /// Receives the numeric parameters of a recognized SGR sequence.
    fn color_escape(&mut self, _codes: &[u8]) {}
}

impl<D: Device + ?Sized> Device for &mut D {
    fn caps(&self) -> DevCaps {
        (**self).caps()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn seek(&mut self, off: i64, dir: SeekDir) -> Result<u64> {
        (**self).seek(off, dir)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn map(&mut self) -> Option<&[u8]> {
        (**self).map()
    }

    fn map_mut(&mut self) -> Option<&mut [u8]> {
        (**self).map_mut()
    }

    fn advance(&mut self, n: usize) {
        (**self).advance(n)
    }

    fn truncate(&mut self) -> Result<()> {
        (**self).truncate()
    }

    fn color_escape(&mut self, codes: &[u8]) {
        (**self).color_escape(codes)
    }
}

/// Pushes all of `data`, retrying partial writes.
///
/// A device that accepts zero bytes while data remains is treated as
/// failed rather than spun on.
pub(crate) fn write_all<D: Device + ?Sized>(dev: &mut D, mut data: &[u8]) -> Result<()> {
    while !data.is_empty() {
        let n = dev.write(data)?;
        if n == 0 {
            return Err(DeviceError::WriteZero);
        }
        data = &data[n..];
    }
    Ok(())
}
