//! Buffered stream traits.
//!
//! A stream is a character window `first <= curr <= last` over some
//! storage, with overridable hooks at the edges: `underflow` refills an
//! exhausted input window, `overflow` drains a full output window, `sync`
//! pushes pending output to the device, `seek_impl` repositions. Default
//! hooks fail, so a type only implements what its direction supports.
//!
//! Failures never propagate as values out of the stream operations; they
//! land in the sticky state bits: end of stream sets `EOF | FAIL`, device
//! errors on the write path set `BAD`.

use crate::error::Result;
use crate::state::{
    IoMode,
    IoState,
    IoStateBits,
    SeekDir,
};
use crate::DeviceError;

/// Window indices into a stream's storage.
#[derive(Debug, Default, Clone, Copy)]
pub struct Cursor {
    /// First character of the window.
    pub first: usize,
    /// Next character to read or write.
    pub curr: usize,
    /// One past the window.
    pub last: usize,
}

/// Character-typed pull cursor over buffered storage.
pub trait InBuf {
    /// Mode and sticky state.
    fn state(&self) -> &IoState;
    /// Mutable mode and sticky state.
    fn state_mut(&mut self) -> &mut IoState;
    /// Window indices.
    fn cursor(&self) -> &Cursor;
    /// Mutable window indices.
    fn cursor_mut(&mut self) -> &mut Cursor;
    /// Backing storage the window indexes into.
    fn storage(&self) -> &[u8];

    /// Refills the window; `Ok(n)` made `n > 0` characters available,
    /// `Ok(0)` is a clean end of stream.
    fn underflow(&mut self) -> Result<usize> {
        Err(DeviceError::Unsupported)
    }

    /// Makes room for one pushed-back character in front of `curr`. Most
    /// sources are not reversible.
    fn ungetfail(&mut self) -> Result<()> {
        Err(DeviceError::Unsupported)
    }

    /// Repositions the stream; see [`InBuf::seek`].
    fn seek_impl(&mut self, _off: i64, _dir: SeekDir) -> Result<u64> {
        Err(DeviceError::Unsupported)
    }

    /// Pushes pending output to the device (output streams only).
    fn sync(&mut self) -> Result<()> {
        Err(DeviceError::Unsupported)
    }

    /// Characters available without refilling.
    fn avail(&self) -> usize {
        self.cursor().last - self.cursor().curr
    }

    /// The available window as a slice.
    fn view_avail(&self) -> &[u8] {
        &self.storage()[self.cursor().curr..self.cursor().last]
    }

    /// Runs `underflow`, folding the outcome into the state bits: clean
    /// end of stream sets `EOF | FAIL`, a device error sets `BAD`.
    fn pull(&mut self) -> bool {
        if !self.state().good() {
            self.state_mut().set(IoStateBits::EOF | IoStateBits::FAIL);
            return false;
        }
        match self.underflow() {
            Ok(n) if n > 0 => true,
            Ok(_) => {
                self.state_mut().set(IoStateBits::EOF | IoStateBits::FAIL);
                false
            }
            Err(_) => {
                self.state_mut().set(IoStateBits::BAD);
                false
            }
        }
    }

    /// True when at least one character is at hand, refilling if needed.
    fn fill_window(&mut self) -> bool {
        self.avail() > 0 || self.pull()
    }

    /// Next character without consuming it; `None` at end of stream.
    fn peek(&mut self) -> Option<u8> {
        if !self.fill_window() {
            return None;
        }
        Some(self.storage()[self.cursor().curr])
    }

    /// Consumes and returns the next character; `None` at end of stream.
    fn get(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.cursor_mut().curr += 1;
        Some(c)
    }

    /// Pushes the last consumed character back; sets `FAIL` when the
    /// source cannot back up.
    fn unget(&mut self) {
        self.state_mut().unset(IoStateBits::EOF);
        let at_start = self.cursor().curr == self.cursor().first;
        if !at_start || (self.state().good() && self.ungetfail().is_ok()) {
            self.cursor_mut().curr -= 1;
        } else {
            self.state_mut().set(IoStateBits::FAIL);
        }
    }

    /// Reads up to `out.len()` characters, refilling as needed; a short
    /// count means end of stream (state gets `EOF | FAIL`).
    fn read(&mut self, out: &mut [u8]) -> usize {
        let mut p = 0;
        while p < out.len() {
            let avail = self.avail();
            let need = out.len() - p;
            if need <= avail {
                let c = self.cursor().curr;
                out[p..].copy_from_slice(&self.storage()[c..c + need]);
                self.cursor_mut().curr += need;
                return out.len();
            }
            if avail > 0 {
                let c = self.cursor().curr;
                out[p..p + avail].copy_from_slice(&self.storage()[c..c + avail]);
                self.cursor_mut().curr += avail;
                p += avail;
            }
            if !self.pull() {
                break;
            }
        }
        p
    }

    /// [`InBuf::read`] with element groups byte-swapped when the stream
    /// carries [`IoMode::INVERT_ENDIAN`]; the trailing partial group is
    /// reversed as a unit.
    fn read_endian(&mut self, out: &mut [u8], element_sz: usize) -> usize {
        let n = self.read(out);
        if self.state().mode().contains(IoMode::INVERT_ENDIAN) && element_sz > 1 {
            for group in out[..n].chunks_mut(element_sz) {
                group.reverse();
            }
        }
        n
    }

    /// Consumes up to `n` characters, returning how many went by.
    fn skip(&mut self, n: usize) -> usize {
        let mut left = n;
        loop {
            let avail = self.avail();
            if left <= avail {
                self.cursor_mut().curr += left;
                return n;
            }
            self.cursor_mut().curr += avail;
            left -= avail;
            if !self.pull() {
                return n - left;
            }
        }
    }

    /// Repositions the stream, clearing `EOF` and syncing pending output
    /// first. `None` on failure (state gets `FAIL`).
    fn seek(&mut self, off: i64, dir: SeekDir) -> Option<u64> {
        self.state_mut().unset(IoStateBits::EOF);
        if self.state().fail() {
            return None;
        }
        if self.state().mode().contains(IoMode::OUT) && self.sync().is_err() {
            self.state_mut().set(IoStateBits::FAIL);
            return None;
        }
        match self.seek_impl(off, dir) {
            Ok(pos) => Some(pos),
            Err(_) => {
                self.state_mut().set(IoStateBits::FAIL);
                None
            }
        }
    }

    /// Current logical position in characters, without side effects on the
    /// device.
    fn tell(&mut self) -> Option<u64> {
        if self.state().fail() {
            return None;
        }
        self.seek_impl(0, SeekDir::Curr).ok()
    }
}

/// Character-typed push cursor; extends the pull side the way a
/// bidirectional stream presents both.
pub trait OutBuf: InBuf {
    /// Mutable backing storage.
    fn storage_mut(&mut self) -> &mut [u8];

    /// Drains or grows a full output window so at least one character fits.
    fn overflow(&mut self) -> Result<()> {
        Err(DeviceError::Unsupported)
    }

    /// Appends one character; on failure the stream goes `BAD` and output
    /// is discarded from then on.
    fn put(&mut self, c: u8) {
        if self.cursor().curr == self.cursor().last {
            if !self.state().good() || self.overflow().is_err() {
                self.state_mut().set(IoStateBits::BAD);
                return;
            }
        }
        let at = self.cursor().curr;
        self.storage_mut()[at] = c;
        self.cursor_mut().curr += 1;
    }

    /// Appends a run of characters, draining the window as it fills.
    fn write(&mut self, mut s: &[u8]) {
        while !s.is_empty() {
            let free = self.cursor().last - self.cursor().curr;
            let take = free.min(s.len());
            if take > 0 {
                let at = self.cursor().curr;
                self.storage_mut()[at..at + take].copy_from_slice(&s[..take]);
                self.cursor_mut().curr += take;
                s = &s[take..];
            }
            if s.is_empty() {
                break;
            }
            if !self.state().good() || self.overflow().is_err() {
                self.state_mut().set(IoStateBits::BAD);
                return;
            }
        }
    }

    /// [`OutBuf::write`] with element groups byte-swapped when the stream
    /// carries [`IoMode::INVERT_ENDIAN`].
    fn write_endian(&mut self, s: &[u8], element_sz: usize) {
        if !self.state().mode().contains(IoMode::INVERT_ENDIAN) || element_sz <= 1 {
            return self.write(s);
        }
        for group in s.chunks(element_sz) {
            for &c in group.iter().rev() {
                self.put(c);
            }
        }
    }

    /// Appends `n` copies of `c`.
    fn fill_n(&mut self, n: usize, c: u8) {
        for _ in 0..n {
            if self.state().bad() {
                return;
            }
            self.put(c);
        }
    }

    /// Pushes everything through to the device; on failure the stream goes
    /// `BAD`. Flushing twice is the same as flushing once.
    fn flush(&mut self) {
        if !self.state().good() || self.sync().is_err() {
            self.state_mut().set(IoStateBits::BAD);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal reader over a fixed slice for exercising the defaults.
    struct SliceIn<'a> {
        st: IoState,
        cur: Cursor,
        data: &'a [u8],
    }

    impl<'a> SliceIn<'a> {
        fn new(data: &'a [u8]) -> Self {
            Self {
                st: IoState::new(IoMode::IN),
                cur: Cursor { first: 0, curr: 0, last: data.len() },
                data,
            }
        }
    }

    impl InBuf for SliceIn<'_> {
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
            self.data
        }
    }

    #[test]
    fn get_peek_and_eof_are_sticky() {
        let mut b = SliceIn::new(b"ab");
        assert_eq!(b.peek(), Some(b'a'));
        assert_eq!(b.get(), Some(b'a'));
        assert_eq!(b.get(), Some(b'b'));
        assert_eq!(b.get(), None);
        assert!(b.state().eof() && b.state().fail());
        assert_eq!(b.get(), None);
    }

    #[test]
    fn unget_at_start_fails() {
        let mut b = SliceIn::new(b"xy");
        assert_eq!(b.get(), Some(b'x'));
        b.unget();
        assert_eq!(b.get(), Some(b'x'));
        b.unget();
        assert!(b.state().good());
        b.unget();
        assert!(b.state().fail());
    }

    #[test]
    fn short_read_reports_count() {
        let mut b = SliceIn::new(b"abcd");
        let mut out = [0u8; 8];
        assert_eq!(b.read(&mut out), 4);
        assert!(b.state().eof());
    }

    #[test]
    fn skip_counts_consumed() {
        let mut b = SliceIn::new(b"abcdef");
        assert_eq!(b.skip(4), 4);
        assert_eq!(b.get(), Some(b'e'));
        assert_eq!(b.skip(10), 1);
        assert!(b.state().eof());
    }
}
