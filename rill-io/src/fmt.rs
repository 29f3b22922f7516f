//! Numeric output into buffered streams.
//!
//! The conversion engine writes through [`rill_cvt::Sink`]; the writers
//! here implement it directly over their fill window, so formatted numbers
//! land in the stream without an intermediate string.

use rill_cvt::{
    FmtOpts,
    FormatError,
    Sink,
    ToChars,
};

use crate::buf::OutBuf;
use crate::devbuf::DevBuf;
use crate::device::Device;
use crate::ostringbuf::OStringBuf;

impl<D: Device> Sink for DevBuf<D> {
    fn put(&mut self, c: u8) {
        OutBuf::put(self, c);
    }

    fn append(&mut self, s: &[u8]) {
        OutBuf::write(self, s);
    }

    fn fill(&mut self, n: usize, c: u8) {
        OutBuf::fill_n(self, n, c);
    }
}

impl Sink for OStringBuf {
    fn put(&mut self, c: u8) {
        OutBuf::put(self, c);
    }

    fn append(&mut self, s: &[u8]) {
        OutBuf::write(self, s);
    }

    fn fill(&mut self, n: usize, c: u8) {
        OutBuf::fill_n(self, n, c);
    }
}

/// Formatted numeric output for any sink, streams included.
pub trait PutNum: Sink + Sized {
    /// Formats `v` straight into the fill window.
    fn put_num<T: ToChars>(&mut self, v: &T, fmt: &FmtOpts) -> Result<(), FormatError> {
        v.to_chars(self, fmt)
    }
}

impl<S: Sink + Sized> PutNum for S {}
