//! Process standard streams.
//!
//! Three buffered character streams over the inherited process handles:
//! `in`, `out` and `err` (`log` is an alias of `err`). On the platform
//! whose native newline is CRLF they default to text mode. Escape
//! recognition is on for the output streams; when a stream is not attached
//! to a terminal the sequences are suppressed, so redirected output stays
//! free of SGR noise.
//!
//! The input stream is tied to `out`, and `err` is tied to `out`: touching
//! the device through one of them first flushes the tied peer. The
//! underlying handles are never closed; dropping the thread flushes its
//! buffers.

use std::cell::RefCell;
use std::io::{
    IsTerminal,
    Read,
    Write,
};

use crate::buf::OutBuf;
use crate::devbuf::DevBuf;
use crate::device::Device;
use crate::error::Result;
use crate::state::IoMode;

/// Device over the process standard output handle.
pub struct StdOutDevice;

impl Device for StdOutDevice {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(crate::DeviceError::Unsupported)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        Ok(std::io::stdout().lock().write(buf)?)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(std::io::stdout().lock().flush()?)
    }
}

/// Device over the process standard error handle; tied to `out` at the
/// device edge so interleaved output keeps its order.
pub struct StdErrDevice;

impl Device for StdErrDevice {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(crate::DeviceError::Unsupported)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        with_out(|out| out.flush());
        Ok(std::io::stderr().lock().write(buf)?)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(std::io::stderr().lock().flush()?)
    }
}

/// Device over the process standard input handle; flushes the tied `out`
/// stream before every pull.
pub struct StdInDevice;

impl Device for StdInDevice {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        with_out(|out| out.flush());
        Ok(std::io::stdin().lock().read(buf)?)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(crate::DeviceError::Unsupported)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

fn out_mode(terminal: bool) -> IoMode {
    let mut mode = IoMode::OUT | IoMode::APPEND | IoMode::CTRL_ESC | IoMode::text_default();
    if !terminal {
        mode |= IoMode::SKIP_CTRL_ESC;
    }
    mode
}

thread_local! {
    static STDOUT: RefCell<Option<DevBuf<StdOutDevice>>> = const { RefCell::new(None) };
    static STDERR: RefCell<Option<DevBuf<StdErrDevice>>> = const { RefCell::new(None) };
    static STDIN: RefCell<Option<DevBuf<StdInDevice>>> = const { RefCell::new(None) };
}

/// Runs `f` with the buffered standard output stream.
///
/// The stdio accessors must not be nested for the same stream; the tied
/// flushes only ever touch `out` from `in` and `err`.
pub fn with_out<R>(f: impl FnOnce(&mut DevBuf<StdOutDevice>) -> R) -> R {
    STDOUT.with(|cell| {
        let mut slot = cell.borrow_mut();
        let buf = slot.get_or_insert_with(|| {
            DevBuf::new(StdOutDevice, out_mode(std::io::stdout().is_terminal()))
        });
        f(buf)
    })
}

/// Runs `f` with the buffered standard error stream.
pub fn with_err<R>(f: impl FnOnce(&mut DevBuf<StdErrDevice>) -> R) -> R {
    STDERR.with(|cell| {
        let mut slot = cell.borrow_mut();
        let buf = slot.get_or_insert_with(|| {
            DevBuf::new(StdErrDevice, out_mode(std::io::stderr().is_terminal()))
        });
        f(buf)
    })
}

/// Runs `f` with the log stream (an alias of `err`).
pub fn with_log<R>(f: impl FnOnce(&mut DevBuf<StdErrDevice>) -> R) -> R {
    with_err(f)
}

/// Runs `f` with the buffered standard input stream.
pub fn with_in<R>(f: impl FnOnce(&mut DevBuf<StdInDevice>) -> R) -> R {
    STDIN.with(|cell| {
        let mut slot = cell.borrow_mut();
        let buf = slot.get_or_insert_with(|| {
            DevBuf::new(StdInDevice, IoMode::IN | IoMode::text_default())
        });
        f(buf)
    })
}

/// Flushes the buffered output streams; exit paths that bypass thread
/// teardown should call this.
pub fn flush_all() {
    with_out(|out| out.flush());
    with_err(|err| err.flush());
}
