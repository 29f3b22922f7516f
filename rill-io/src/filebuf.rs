//! Buffered file stream: a device buffer owning its file device.

use std::ops::{
    Deref,
    DerefMut,
};
use std::path::Path;

use crate::devbuf::DevBuf;
use crate::error::Result;
use crate::filedev::FileDevice;
use crate::state::{
    mode_from_str,
    IoMode,
};

/// Buffered stream over an owned OS file.
///
/// All stream operations come from the wrapped [`DevBuf`]; this type adds
/// opening and closing.
pub struct FileBuf {
    inner: DevBuf<FileDevice>,
}

impl FileBuf {
    /// Opens `path` with an explicit mode.
    pub fn open(path: impl AsRef<Path>, mode: IoMode) -> Result<Self> {
        let dev = FileDevice::open(path.as_ref(), mode)?;
        Ok(Self { inner: DevBuf::new(dev, mode) })
    }

    /// Opens `path` with a POSIX-like mode string (`"r"`, `"w+"`, `"at"`,
    /// `"wz9"`, ...). Text translation defaults to the platform
    /// convention.
    pub fn open_with(path: impl AsRef<Path>, mode: &str) -> Result<Self> {
        Self::open(path, mode_from_str(mode, IoMode::text_default()))
    }

    /// Flushes and closes, reporting the flush outcome that a plain drop
    /// would swallow.
    pub fn close(mut self) -> Result<()> {
        self.inner.flush_and_check()
    }
}

impl Deref for FileBuf {
    type Target = DevBuf<FileDevice>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for FileBuf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
