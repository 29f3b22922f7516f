//! Device buffer: the bidirectional bridge between a raw byte device and a
//! buffered character stream.
//!
//! Three transformations happen at this edge, in a fixed order: newline
//! translation (`\n` <-> `\r\n`), ANSI escape recognition with SGR
//! dispatch to the device color sink, and optional deflate framing. The
//! byte stream entering and leaving the device is always the transformed
//! one; everything above this layer sees plain characters.

use std::cell::RefCell;
use std::rc::{
    Rc,
    Weak,
};

use flate2::{
    Compress,
    Compression,
    Decompress,
    FlushCompress,
    FlushDecompress,
    Status,
};

use crate::buf::{
    Cursor,
    InBuf,
    OutBuf,
};
use crate::device::{
    write_all,
    Device,
};
use crate::error::{
    DeviceError,
    Result,
};
use crate::state::{
    IoMode,
    IoState,
    IoStateBits,
    SeekDir,
};

const MIN_BUF_SIZE: usize = 256;
const MAX_BUF_SIZE: usize = 1 << 22;
const CR_RESERVE_RATIO: usize = 16;
const ESC: u8 = 0x1b;

/// Non-owning back-reference to a stream that must be flushed whenever this
/// one touches the device.
pub type Tie = Weak<RefCell<dyn OutBuf>>;

/// Deflate staging ring occupying the upper half of the buffer.
struct ZRing {
    compress: Option<Compress>,
    decompress: Option<Decompress>,
    /// Write cursor within the staging area (deflate output).
    out_pos: usize,
    /// Unconsumed inflate input within the staging area.
    in_pos: usize,
    in_len: usize,
    /// The device reported end of stream; inflate drains what it has.
    finished: bool,
}

/// Buffered character stream over a byte [`Device`].
///
/// Direction is fixed when the buffer is set up: `OUT` wins over `IN`.
/// The device is taken by value; pass `&mut dev` to keep ownership outside
/// (the device must then outlive the buffer).
pub struct DevBuf<D: Device> {
    dev: D,
    st: IoState,
    cur: Cursor,
    buf: Vec<u8>,
    /// End of the character window region; the deflate staging area lives
    /// above it.
    win_end: usize,
    /// Deferred `\r` from a fill that ended between `\r` and `\n`.
    pending_cr: bool,
    /// Device position in characters.
    pos: u64,
    z: Option<ZRing>,
    tie: Option<Tie>,
}

impl<D: Device> DevBuf<D> {
    /// Buffers `dev` with the default window size.
    pub fn new(dev: D, mode: IoMode) -> Self {
        Self::with_capacity(dev, mode, 4096)
    }

    /// Buffers `dev` with a window of at least `bufsz` characters.
    pub fn with_capacity(dev: D, mode: IoMode, bufsz: usize) -> Self {
        let mut buf = Self {
            dev,
            st: IoState::new(IoMode::empty()),
            cur: Cursor::default(),
            buf: Vec::new(),
            win_end: 0,
            pending_cr: false,
            pos: 0,
            z: None,
            tie: None,
        };
        buf.init_buf(mode, bufsz);
        buf
    }

    /// The wrapped device.
    pub fn device(&self) -> &D {
        &self.dev
    }

    /// Mutable access to the wrapped device.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.dev
    }

    /// Ties `peer` to this stream: it is flushed before every refill,
    /// drain or sync here. The reference is weak; a dropped peer simply
    /// stops participating.
    pub fn set_tie(&mut self, peer: &Rc<RefCell<dyn OutBuf>>) {
        self.tie = Some(Rc::downgrade(peer));
    }

    /// Flushes pending output and reports failure as a value; closing
    /// paths use this so a plain drop does not swallow errors. A stream
    /// already failed reports without touching the device again.
    pub fn flush_and_check(&mut self) -> Result<()> {
        if !self.st.good() {
            return Err(DeviceError::StreamFailed);
        }
        if self.st.mode().contains(IoMode::OUT) {
            self.sync_impl()?;
        }
        Ok(())
    }

    /// Releases and reinitializes the buffer for a new mode.
    ///
    /// Without a direction bit the stream stays failed. `OUT` clears `IN`;
    /// `SKIP_CTRL_ESC` implies `CTRL_ESC`.
    pub fn init_buf(&mut self, mut mode: IoMode, bufsz: usize) {
        self.release();
        if !mode.intersects(IoMode::IN | IoMode::OUT) {
            self.st = IoState::new(IoMode::empty());
            self.st.set(IoStateBits::FAIL);
            return;
        }
        if mode.contains(IoMode::OUT) {
            mode.remove(IoMode::IN);
        }
        if mode.contains(IoMode::SKIP_CTRL_ESC) {
            mode.insert(IoMode::CTRL_ESC);
        }
        let bufsz = bufsz.clamp(MIN_BUF_SIZE, MAX_BUF_SIZE);
        self.buf = vec![0u8; bufsz];
        self.win_end = bufsz;

        if mode.contains(IoMode::Z_COMPR) {
            self.win_end = bufsz / 2;
            let level = match mode.compression_level() {
                0 => Compression::default(),
                lvl => Compression::new(u32::from(lvl)),
            };
            self.z = Some(ZRing {
                compress: mode.contains(IoMode::OUT).then(|| Compress::new(level, true)),
                decompress: (!mode.contains(IoMode::OUT)).then(|| Decompress::new(true)),
                out_pos: 0,
                in_pos: 0,
                in_len: 0,
                finished: false,
            });
        }

        self.pending_cr = false;
        if mode.contains(IoMode::OUT) {
            let reserve = if mode.contains(IoMode::CR_LF) {
                self.win_end / CR_RESERVE_RATIO
            } else {
                0
            };
            self.cur = Cursor { first: reserve, curr: reserve, last: self.win_end };
        } else {
            self.cur = Cursor::default();
        }

        self.pos = self.dev.seek(0, SeekDir::Curr).unwrap_or(0);
        self.st = IoState::new(mode);
        tracing::debug!(
            mode = ?mode,
            bufsz,
            pos = self.pos,
            "device buffer initialized"
        );
    }

    /// Flushes pending output, terminates the deflate stream, and drops
    /// the window. The stream is failed afterwards until reinitialized.
    fn release(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        if self.st.mode().contains(IoMode::OUT) {
            self.flush();
            if self.z.is_some() {
                if let Err(err) = self.finish_compressed() {
                    tracing::warn!(%err, "deflate terminator was not written");
                }
            }
        }
        self.buf = Vec::new();
        self.z = None;
        self.cur = Cursor::default();
        let mut st = IoState::new(IoMode::empty());
        st.set(IoStateBits::FAIL);
        self.st = st;
    }

    fn flush_tie(&mut self) {
        if let Some(peer) = self.tie.as_ref().and_then(Weak::upgrade) {
            peer.borrow_mut().flush();
        }
    }

    // ---- raw transfer through the optional deflate ring

    fn write_raw(&mut self, from: usize, to: usize) -> Result<()> {
        let n = to - from;
        if let Some(z) = self.z.as_mut() {
            let (chars, staging) = self.buf.split_at_mut(self.win_end);
            compress_into(&mut self.dev, z, &chars[from..to], staging)?;
        } else {
            write_all(&mut self.dev, &self.buf[from..to])?;
        }
        self.pos += n as u64;
        Ok(())
    }

    /// Fills `buf[from..limit]` with device bytes; `Ok(0)` is end of
    /// stream.
    fn read_raw(&mut self, from: usize, limit: usize) -> Result<usize> {
        let n = if let Some(z) = self.z.as_mut() {
            let (chars, staging) = self.buf.split_at_mut(self.win_end);
            inflate_into(&mut self.dev, z, &mut chars[from..limit], staging)?
        } else {
            self.dev.read(&mut self.buf[from..limit])?
        };
        self.pos += n as u64;
        Ok(n)
    }

    fn finish_compressed(&mut self) -> Result<()> {
        let Some(z) = self.z.as_mut() else {
            return Ok(());
        };
        let (_, staging) = self.buf.split_at_mut(self.win_end);
        let c = z.compress.as_mut().ok_or(DeviceError::Compression)?;
        loop {
            let before_out = c.total_out();
            let status = c
                .compress(&[], &mut staging[z.out_pos..], FlushCompress::Finish)
                .map_err(|_| DeviceError::Compression)?;
            z.out_pos += (c.total_out() - before_out) as usize;
            write_all(&mut self.dev, &staging[..z.out_pos])?;
            z.out_pos = 0;
            if status == Status::StreamEnd {
                return Ok(());
            }
        }
    }

    // ---- escape scanning

    /// Dispatches the numeric parameters of an SGR sequence (`CSI .. m`)
    /// to the device color sink. Other sequences are ignored.
    fn parse_ctrl_esc(&mut self, first: usize, last: usize) {
        let seq = &self.buf[first..last];
        if seq.len() < 2 || seq[0] != b'[' || seq[seq.len() - 1] != b'm' {
            return;
        }
        let mut v = [0u8; 16];
        let mut n = 0usize;
        for &c in &seq[1..] {
            match c {
                b';' => {
                    if n + 1 >= v.len() {
                        break;
                    }
                    n += 1;
                }
                b'0'..=b'9' => v[n] = v[n].wrapping_mul(10).wrapping_add(c - b'0'),
                _ => break,
            }
        }
        self.dev.color_escape(&v[..n + 1]);
    }

    // ---- the write pipeline

    /// Drains `first..curr` through the transformation pipeline and
    /// resets the window. An escape sequence cut off by the window edge is
    /// carried over to the next flush.
    fn flush_buffer(&mut self) -> Result<()> {
        let mode = self.st.mode();
        let from0 = self.cur.first;
        let top = self.cur.curr;
        if !mode.intersects(IoMode::CR_LF | IoMode::CTRL_ESC) {
            self.write_raw(from0, top)?;
            self.cur.curr = self.cur.first;
            return Ok(());
        }

        let crlf = mode.contains(IoMode::CR_LF);
        let skip_esc = mode.contains(IoMode::SKIP_CTRL_ESC);
        let mut from = from0;
        let mut mid = top;
        loop {
            // Transform into the slack in front of the window; `to` never
            // passes `from`, and when it catches up the accumulated bytes
            // are pushed out and the copy restarts with fresh slack.
            let mut to = 0usize;
            while from != top {
                let c = self.buf[from];
                if c == b'\n' && crlf {
                    if to == from {
                        break;
                    }
                    self.buf[to] = b'\r';
                    self.buf[to + 1] = b'\n';
                    to += 2;
                    from += 1;
                    continue;
                }
                if c == ESC && mode.contains(IoMode::CTRL_ESC) {
                    let end = find_esc_end(&self.buf, from + 1, top);
                    if end == from + 1 {
                        // Cut off mid-sequence: retry on the next flush.
                        mid = from;
                        from = top;
                        break;
                    }
                    // The device sees everything up to the escape before
                    // the color callback fires.
                    self.write_raw(0, to)?;
                    to = 0;
                    self.parse_ctrl_esc(from + 1, end);
                    if skip_esc {
                        from = end;
                    } else {
                        while from < end {
                            self.buf[to] = self.buf[from];
                            to += 1;
                            from += 1;
                        }
                    }
                    continue;
                }
                self.buf[to] = c;
                to += 1;
                from += 1;
            }
            self.write_raw(0, to)?;
            if from == top {
                break;
            }
        }
        // Park the unfinished tail at the window start.
        self.buf.copy_within(mid..top, self.cur.first);
        self.cur.curr = self.cur.first + (top - mid);
        Ok(())
    }

    // ---- the read pipeline

    fn underflow_impl(&mut self) -> Result<usize> {
        if !self.st.mode().contains(IoMode::IN) {
            return Err(DeviceError::Unsupported);
        }
        self.flush_tie();
        if !self.st.mode().contains(IoMode::CR_LF) {
            let n = self.read_raw(0, self.win_end)?;
            self.cur = Cursor { first: 0, curr: 0, last: n };
            return Ok(n);
        }
        // One cell is reserved for a `\r` deferred by the previous fill so
        // a pair split across reads still collapses.
        loop {
            let mut start = 0;
            if self.pending_cr {
                self.buf[0] = b'\r';
                start = 1;
            }
            let n = self.read_raw(start, self.win_end)?;
            if n == 0 {
                // End of stream; a parked `\r` is still delivered.
                let kept = start;
                self.pending_cr = false;
                self.cur = Cursor { first: 0, curr: 0, last: kept };
                return Ok(kept);
            }
            let mut kept = remove_crlf(&mut self.buf[..start + n]);
            self.pending_cr = kept > 0 && self.buf[kept - 1] == b'\r';
            if self.pending_cr {
                kept -= 1;
            }
            if kept > 0 {
                self.cur = Cursor { first: 0, curr: 0, last: kept };
                return Ok(kept);
            }
            // Everything read was a lone `\r`; pull more to decide.
        }
    }

    fn overflow_impl(&mut self) -> Result<()> {
        if !self.st.mode().contains(IoMode::OUT) {
            return Err(DeviceError::Unsupported);
        }
        self.flush_tie();
        self.flush_buffer()
    }

    fn sync_impl(&mut self) -> Result<()> {
        if !self.st.mode().contains(IoMode::OUT) {
            return Err(DeviceError::Unsupported);
        }
        self.flush_tie();
        self.flush_buffer()?;
        self.dev.flush()
    }

    fn seek_impl_inner(&mut self, mut off: i64, dir: SeekDir) -> Result<u64> {
        let mode = self.st.mode();
        if dir != SeekDir::End {
            let delta = if mode.contains(IoMode::OUT) {
                self.cur.curr as i64 - self.cur.first as i64
            } else {
                self.cur.curr as i64 - self.cur.last as i64
            };
            let pos = self.pos as i64 + delta;
            if dir == SeekDir::Curr {
                if off == 0 {
                    return Ok(pos.max(0) as u64);
                }
                off += delta;
            } else if pos == off {
                return Ok(pos.max(0) as u64);
            }
        }
        if mode.intersects(IoMode::APPEND | IoMode::Z_COMPR) {
            // Only the report-current-position form is allowed here.
            return Err(DeviceError::Unsupported);
        }
        let abs = self.dev.seek(off, dir)?;
        self.pos = abs;
        if mode.contains(IoMode::IN) {
            self.cur = Cursor { first: 0, curr: 0, last: 0 };
        }
        Ok(self.pos)
    }
}

impl<D: Device> Drop for DevBuf<D> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<D: Device> InBuf for DevBuf<D> {
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

    fn underflow(&mut self) -> Result<usize> {
        self.underflow_impl()
    }

    fn seek_impl(&mut self, off: i64, dir: SeekDir) -> Result<u64> {
        self.seek_impl_inner(off, dir)
    }

    fn sync(&mut self) -> Result<()> {
        self.sync_impl()
    }
}

impl<D: Device> OutBuf for DevBuf<D> {
    fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    fn overflow(&mut self) -> Result<()> {
        self.overflow_impl()
    }
}

/// Locates the end of an escape sequence starting right after `ESC`.
///
/// CSI sequences run until a final byte in `0x40..=0x7e`; any other
/// sequence is `ESC` plus exactly one byte. Returns `first` when the
/// sequence is not complete within `first..last`.
fn find_esc_end(buf: &[u8], first: usize, last: usize) -> usize {
    if first == last {
        return first;
    }
    if buf[first] != b'[' {
        return first + 1;
    }
    let mut p = first + 1;
    while p != last {
        if (0x40..=0x7e).contains(&buf[p]) {
            return p + 1;
        }
        p += 1;
    }
    first
}

/// Collapses every `\r\n` in `window` to `\n`, returning the kept length.
/// A trailing lone `\r` stays and is the caller's to defer.
fn remove_crlf(window: &mut [u8]) -> usize {
    let len = window.len();
    let mut src = match window
        .windows(2)
        .position(|pair| pair == b"\r\n")
    {
        Some(at) => at,
        None => return len,
    };
    let mut dst = src;
    while src < len {
        if window[src] == b'\r' && src + 1 < len && window[src + 1] == b'\n' {
            src += 1;
        }
        window[dst] = window[src];
        dst += 1;
        src += 1;
    }
    dst
}

// ---- deflate plumbing

fn compress_into<D: Device>(
    dev: &mut D,
    z: &mut ZRing,
    mut input: &[u8],
    staging: &mut [u8],
) -> Result<()> {
    let c = z.compress.as_mut().ok_or(DeviceError::Compression)?;
    while !input.is_empty() {
        let before_in = c.total_in();
        let before_out = c.total_out();
        c.compress(input, &mut staging[z.out_pos..], FlushCompress::None)
            .map_err(|_| DeviceError::Compression)?;
        let consumed = (c.total_in() - before_in) as usize;
        let produced = (c.total_out() - before_out) as usize;
        input = &input[consumed..];
        z.out_pos += produced;
        if z.out_pos == staging.len() {
            write_all(dev, staging)?;
            z.out_pos = 0;
        } else if consumed == 0 && produced == 0 {
            return Err(DeviceError::Compression);
        }
    }
    Ok(())
}

fn inflate_into<D: Device>(
    dev: &mut D,
    z: &mut ZRing,
    dst: &mut [u8],
    staging: &mut [u8],
) -> Result<usize> {
    let d = z.decompress.as_mut().ok_or(DeviceError::Compression)?;
    let mut n = 0;
    while n < dst.len() {
        if z.in_len == 0 && !z.finished {
            let got = dev.read(staging)?;
            if got == 0 {
                z.finished = true;
            } else {
                z.in_pos = 0;
                z.in_len = got;
            }
        }
        let before_in = d.total_in();
        let before_out = d.total_out();
        let flush = if z.finished { FlushDecompress::Finish } else { FlushDecompress::None };
        let status = d
            .decompress(&staging[z.in_pos..z.in_pos + z.in_len], &mut dst[n..], flush)
            .map_err(|_| DeviceError::Compression)?;
        let consumed = (d.total_in() - before_in) as usize;
        let produced = (d.total_out() - before_out) as usize;
        z.in_pos += consumed;
        z.in_len -= consumed;
        n += produced;
        if status == Status::StreamEnd {
            break;
        }
        // A truncated deflate stream yields what was decoded.
        if z.finished && produced == 0 {
            break;
        }
    }
    Ok(n)
}
