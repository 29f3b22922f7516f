//! Growing in-memory output buffer.

use crate::buf::{
    Cursor,
    InBuf,
    OutBuf,
};
use crate::error::{
    DeviceError,
    Result,
};
use crate::state::{
    IoMode,
    IoState,
    SeekDir,
};

const MIN_CAPACITY: usize = 256;

/// Output stream backed by an owned growable character array; the string
/// formatting workhorse.
///
/// Seeks may position past the accumulated top: the gap is zero-filled on
/// the next write, so sparse assembly works.
pub struct OStringBuf {
    st: IoState,
    cur: Cursor,
    buf: Vec<u8>,
    /// High-water mark of written content.
    top: usize,
}

impl Default for OStringBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl OStringBuf {
    /// An empty buffer.
    pub fn new() -> Self {
        Self {
            st: IoState::new(IoMode::OUT),
            cur: Cursor::default(),
            buf: Vec::new(),
            top: 0,
        }
    }

    /// An empty buffer with reserved capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut s = Self::new();
        s.grow_to(capacity.max(1));
        s
    }

    fn high_water(&self) -> usize {
        self.top.max(self.cur.curr)
    }

    /// Accumulated length in characters.
    pub fn len(&self) -> usize {
        self.high_water()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The accumulated content.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.high_water()]
    }

    /// Consumes the buffer, returning the accumulated bytes.
    pub fn into_bytes(mut self) -> Vec<u8> {
        let len = self.high_water();
        let mut buf = std::mem::take(&mut self.buf);
        buf.truncate(len);
        buf
    }

    /// Consumes the buffer, returning the content as a string; non-UTF-8
    /// bytes are replaced.
    pub fn into_string(self) -> String {
        match String::from_utf8(self.into_bytes()) {
            Ok(s) => s,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        }
    }

    /// Caps the logical size at `n`, keeping capacity.
    pub fn truncate(&mut self, n: usize) {
        let len = self.high_water();
        if n < len {
            self.top = n;
            self.cur.curr = self.cur.curr.min(n);
        }
    }

    /// Grows storage so at least `extra` more characters fit, at least by
    /// half of the current size.
    fn grow(&mut self, extra: usize) {
        self.top = self.high_water();
        let sz = self.top;
        let new_sz = (sz + extra.max(sz / 2)).max(MIN_CAPACITY);
        self.grow_to(new_sz);
    }

    fn grow_to(&mut self, new_sz: usize) {
        if new_sz > self.buf.len() {
            self.buf.resize(new_sz, 0);
        }
        self.cur.last = self.buf.len();
    }
}

impl InBuf for OStringBuf {
    fn state(&self) -> &IoState {
        &self.st
    }

    fn state_mut(&mut self) -> &mut IoState {
        &mut self.st
    }

    fn cursor(&self) -> &Cursor {
        &self.cur
    }

    fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cur
    }

    fn storage(&self) -> &[u8] {
        &self.buf
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn seek_impl(&mut self, off: i64, dir: SeekDir) -> Result<u64> {
        self.top = self.high_water();
        let sz = self.top as i64;
        let pos = self.cur.curr as i64;
        let target = match dir {
            SeekDir::Beg => off,
            SeekDir::Curr => {
                if off == 0 {
                    return Ok(pos as u64);
                }
                pos.checked_add(off).ok_or(DeviceError::SeekRange)?
            }
            SeekDir::End => sz.checked_add(off).ok_or(DeviceError::SeekRange)?,
        };
        if target < 0 {
            return Err(DeviceError::SeekRange);
        }
        let target = target as usize;
        if target > self.buf.len() {
            self.grow(target - self.top);
            self.grow_to(target);
        }
        // Writing past the top zero-fills the gap.
        if target > self.top {
            self.buf[self.top..target].fill(0);
        }
        self.cur.curr = target;
        Ok(target as u64)
    }
}

impl OutBuf for OStringBuf {
    fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    fn overflow(&mut self) -> Result<()> {
        self.grow(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_past_any_initial_capacity() {
        let mut s = OStringBuf::new();
        for chunk in [b"abc".as_slice(), b"defghij", b"k"] {
            s.write(chunk);
        }
        s.fill_n(1000, b'x');
        assert_eq!(s.len(), 11 + 1000);
        assert!(s.as_bytes().starts_with(b"abcdefghijk"));
        assert!(s.as_bytes().ends_with(b"xxx"));
    }

    #[test]
    fn sparse_seek_zero_fills() {
        let mut s = OStringBuf::new();
        s.write(b"ab");
        assert_eq!(s.seek(6, SeekDir::Beg), Some(6));
        s.write(b"z");
        assert_eq!(s.as_bytes(), b"ab\0\0\0\0z");
    }

    #[test]
    fn seek_back_and_overwrite_keeps_top() {
        let mut s = OStringBuf::new();
        s.write(b"hello world");
        assert_eq!(s.seek(0, SeekDir::Beg), Some(0));
        s.write(b"H");
        assert_eq!(s.as_bytes(), b"Hello world");
        assert_eq!(s.seek(-5, SeekDir::End), Some(6));
        s.write(b"W");
        assert_eq!(s.as_bytes(), b"Hello World");
    }

    #[test]
    fn truncate_caps_the_logical_size() {
        let mut s = OStringBuf::new();
        s.write(b"abcdef");
        s.truncate(3);
        assert_eq!(s.as_bytes(), b"abc");
        s.write(b"Z");
        assert_eq!(s.as_bytes(), b"abcZ");
    }

    #[test]
    fn into_string_round_trips() {
        let mut s = OStringBuf::new();
        s.write(b"12.5 parsecs");
        assert_eq!(s.into_string(), "12.5 parsecs");
    }
}
