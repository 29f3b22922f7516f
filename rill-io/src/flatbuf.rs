//! Non-owning reader over a fixed character span.

use crate::buf::{
    Cursor,
    InBuf,
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

/// Pull cursor over a borrowed slice; the workhorse of in-memory parsing.
///
/// There is nothing to refill from: exhausting the span is the end of the
/// stream. Seeks clamp to the span.
pub struct FlatBuf<'a> {
    st: IoState,
    cur: Cursor,
    data: &'a [u8],
}

impl<'a> FlatBuf<'a> {
    /// A reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            st: IoState::new(IoMode::IN),
            cur: Cursor { first: 0, curr: 0, last: data.len() },
            data,
        }
    }

    /// The unconsumed remainder of the span.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.cur.curr..]
    }
}

impl InBuf for FlatBuf<'_> {
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

    fn seek_impl(&mut self, off: i64, dir: SeekDir) -> Result<u64> {
        let sz = self.data.len() as i64;
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
        let target = target.clamp(0, sz);
        self.cur.curr = target as usize;
        Ok(target as u64)
    }
}
