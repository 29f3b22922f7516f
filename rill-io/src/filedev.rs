//! OS file device.

use std::fs::{
    File,
    OpenOptions,
};
use std::io::{
    Read,
    Seek,
    SeekFrom,
    Write,
};
use std::path::Path;

use crate::device::{
    DevCaps,
    Device,
};
use crate::error::{
    DeviceError,
    Result,
};
use crate::state::{
    IoMode,
    SeekDir,
};

/// Byte device over an owned OS file handle; the handle closes on drop.
pub struct FileDevice {
    file: File,
    caps: DevCaps,
}

impl FileDevice {
    /// Opens `path` honoring the direction, creation, truncation, append
    /// and exclusive bits of `mode`.
    pub fn open(path: &Path, mode: IoMode) -> Result<Self> {
        let mut opts = OpenOptions::new();
        opts.read(mode.contains(IoMode::IN))
            .write(mode.contains(IoMode::OUT))
            .truncate(mode.contains(IoMode::TRUNCATE))
            .append(mode.contains(IoMode::APPEND));
        if mode.contains(IoMode::EXCLUSIVE) {
            opts.create_new(true);
        } else {
            opts.create(mode.contains(IoMode::CREATE));
        }
        let file = opts.open(path)?;
        tracing::debug!(path = %path.display(), ?mode, "file opened");
        let mut caps = DevCaps::SEEKABLE;
        if !mode.contains(IoMode::OUT) {
            caps |= DevCaps::READ_ONLY;
        }
        Ok(Self { file, caps })
    }

    /// Wraps an already-open handle.
    pub fn from_file(file: File) -> Self {
        Self { file, caps: DevCaps::SEEKABLE }
    }

    /// Releases the handle without closing the stream abstraction above.
    pub fn into_file(self) -> File {
        self.file
    }
}

impl Device for FileDevice {
    fn caps(&self) -> DevCaps {
        self.caps
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.file.read(buf)?)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        Ok(self.file.write(buf)?)
    }

    fn seek(&mut self, off: i64, dir: SeekDir) -> Result<u64> {
        let from = match dir {
            SeekDir::Beg => {
                if off < 0 {
                    return Err(DeviceError::SeekRange);
                }
                SeekFrom::Start(off as u64)
            }
            SeekDir::Curr => SeekFrom::Current(off),
            SeekDir::End => SeekFrom::End(off),
        };
        Ok(self.file.seek(from)?)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.file.flush()?)
    }
}
