//! Chunked byte-sequence store and the mappable device over it.

use crate::device::{
    DevCaps,
    Device,
};
use crate::error::{
    DeviceError,
    Result,
};
use crate::state::SeekDir;

const FIRST_CHUNK_SIZE: usize = 512;
const MAX_CHUNK_SIZE: usize = 64 * 1024;

struct Chunk {
    data: Box<[u8]>,
    len: usize,
}

impl Chunk {
    fn capacity(&self) -> usize {
        self.data.len()
    }
}

/// Growable append-oriented byte sequence.
///
/// Storage is a run of chunks where every chunk before the head is full and
/// only the head may be partially filled. Readers and writers address it
/// through [`ByteSeqDevice`], which maps chunk spans in place instead of
/// copying.
#[derive(Default)]
pub struct ByteSeq {
    chunks: Vec<Chunk>,
    size: usize,
}

impl ByteSeq {
    /// An empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a sequence holding a copy of `data`.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut seq = Self::new();
        if !data.is_empty() {
            let mut chunk = vec![0u8; data.len().max(FIRST_CHUNK_SIZE)].into_boxed_slice();
            chunk[..data.len()].copy_from_slice(data);
            seq.chunks.push(Chunk { data: chunk, len: data.len() });
            seq.size = data.len();
        }
        seq
    }

    /// Logical size in bytes.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the sequence holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Drops the content, keeping nothing allocated.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.size = 0;
    }

    /// Copies the content into one contiguous vector.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size);
        for chunk in &self.chunks {
            out.extend_from_slice(&chunk.data[..chunk.len]);
        }
        out
    }

    fn next_capacity(&self) -> usize {
        match self.chunks.last() {
            Some(c) => (c.capacity() * 2).min(MAX_CHUNK_SIZE),
            None => FIRST_CHUNK_SIZE,
        }
    }

    /// Appends a fresh zeroed head chunk; the previous head must be full.
    fn grow_head(&mut self) {
        debug_assert!(self
            .chunks
            .last()
            .map(|c| c.len == c.capacity())
            .unwrap_or(true));
        let cap = self.next_capacity();
        self.chunks.push(Chunk { data: vec![0u8; cap].into_boxed_slice(), len: 0 });
    }

    /// Grows (zero-filling) or shrinks the sequence to `new_size`.
    fn resize(&mut self, new_size: usize) {
        if new_size >= self.size {
            let mut grow = new_size - self.size;
            while grow > 0 {
                if self.chunks.last().map(|c| c.len == c.capacity()).unwrap_or(true) {
                    self.grow_head();
                }
                let head = match self.chunks.last_mut() {
                    Some(h) => h,
                    None => break,
                };
                let take = grow.min(head.capacity() - head.len);
                head.data[head.len..head.len + take].fill(0);
                head.len += take;
                grow -= take;
            }
        } else {
            let mut drop = self.size - new_size;
            while drop > 0 {
                let Some(head) = self.chunks.last_mut() else {
                    break;
                };
                if head.len <= drop {
                    drop -= head.len;
                    self.chunks.pop();
                } else {
                    head.len -= drop;
                    drop = 0;
                }
            }
        }
        self.size = new_size;
    }
}

/// Cursor-carrying device over a [`ByteSeq`].
///
/// The cursor is `(chunk, pos0, pos)` where `pos0` is the logical offset of
/// the chunk's first byte and `pos - pos0` stays within the chunk.
pub struct ByteSeqDevice<'a> {
    seq: SeqRef<'a>,
    chunk: usize,
    pos0: usize,
    pos: usize,
}

enum SeqRef<'a> {
    Mut(&'a mut ByteSeq),
    Ref(&'a ByteSeq),
}

impl<'a> SeqRef<'a> {
    fn get(&self) -> &ByteSeq {
        match self {
            SeqRef::Mut(s) => s,
            SeqRef::Ref(s) => s,
        }
    }
}

impl<'a> ByteSeqDevice<'a> {
    /// Read-write device positioned at the start.
    pub fn new(seq: &'a mut ByteSeq) -> Self {
        Self { seq: SeqRef::Mut(seq), chunk: 0, pos0: 0, pos: 0 }
    }

    /// Read-only view positioned at the start.
    pub fn new_ro(seq: &'a ByteSeq) -> Self {
        Self { seq: SeqRef::Ref(seq), chunk: 0, pos0: 0, pos: 0 }
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Drops the underlying content and rewinds; refused on read-only
    /// views.
    pub fn clear(&mut self) -> Result<()> {
        match &mut self.seq {
            SeqRef::Mut(seq) => {
                seq.clear();
                self.chunk = 0;
                self.pos0 = 0;
                self.pos = 0;
                Ok(())
            }
            SeqRef::Ref(_) => Err(DeviceError::Unsupported),
        }
    }

    /// Walks the chunk list so `chunk`/`pos0` match `pos`; `pos` must not
    /// exceed the sequence size.
    fn reposition(&mut self) {
        let seq = self.seq.get();
        while self.pos < self.pos0 {
            self.chunk -= 1;
            self.pos0 -= seq.chunks[self.chunk].len;
        }
        while self.chunk < seq.chunks.len() {
            let chunk_len = seq.chunks[self.chunk].len;
            let is_head = self.chunk + 1 == seq.chunks.len();
            if is_head || self.pos - self.pos0 < chunk_len {
                break;
            }
            self.pos0 += chunk_len;
            self.chunk += 1;
        }
    }
}

impl Device for ByteSeqDevice<'_> {
    fn caps(&self) -> DevCaps {
        let base = DevCaps::MAPPABLE | DevCaps::SEEKABLE;
        match self.seq {
            SeqRef::Mut(_) => base,
            SeqRef::Ref(_) => base | DevCaps::READ_ONLY,
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            let Some(span) = self.map() else {
                break;
            };
            if span.is_empty() {
                break;
            }
            let take = span.len().min(buf.len() - n);
            buf[n..n + take].copy_from_slice(&span[..take]);
            self.advance(take);
            n += take;
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut n = 0;
        while n < buf.len() {
            let Some(span) = self.map_mut() else {
                return Err(DeviceError::Unsupported);
            };
            let take = span.len().min(buf.len() - n);
            span[..take].copy_from_slice(&buf[n..n + take]);
            self.advance(take);
            n += take;
        }
        Ok(buf.len())
    }

    fn map(&mut self) -> Option<&[u8]> {
        let seq = self.seq.get();
        let chunk = seq.chunks.get(self.chunk)?;
        let off = self.pos - self.pos0;
        if off >= chunk.len {
            return Some(&[]);
        }
        Some(&chunk.data[off..chunk.len])
    }

    fn map_mut(&mut self) -> Option<&mut [u8]> {
        let SeqRef::Mut(seq) = &mut self.seq else {
            return None;
        };
        let is_head = self.chunk + 1 >= seq.chunks.len();
        if !is_head {
            // Overwriting the middle of the sequence: expose the filled
            // part of the current chunk.
            let chunk = &mut seq.chunks[self.chunk];
            let off = self.pos - self.pos0;
            return Some(&mut chunk.data[off..chunk.len]);
        }
        // At the head: expose the remaining capacity, allocating a next
        // chunk once it fills up.
        let exhausted = match seq.chunks.last() {
            None => true,
            Some(c) => self.pos - self.pos0 >= c.capacity(),
        };
        if exhausted {
            if let Some(last) = seq.chunks.last() {
                self.pos0 += last.capacity();
            }
            seq.grow_head();
            self.chunk = seq.chunks.len() - 1;
        }
        let chunk = &mut seq.chunks[self.chunk];
        let off = self.pos - self.pos0;
        Some(&mut chunk.data[off..])
    }

    fn advance(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.pos += n;
        let SeqRef::Mut(seq) = &mut self.seq else {
            self.reposition();
            return;
        };
        if self.pos > seq.size {
            // Writing past the end extends the head chunk.
            let head = self.chunk;
            debug_assert_eq!(head + 1, seq.chunks.len());
            let extra = self.pos - seq.size;
            seq.chunks[head].len += extra;
            seq.size = self.pos;
        }
        self.reposition();
    }

    fn seek(&mut self, off: i64, dir: SeekDir) -> Result<u64> {
        let size = self.seq.get().len();
        let base = match dir {
            SeekDir::Beg => 0i64,
            SeekDir::Curr => {
                if off == 0 {
                    return Ok(self.pos as u64);
                }
                self.pos as i64
            }
            SeekDir::End => size as i64,
        };
        let target = base.checked_add(off).ok_or(DeviceError::SeekRange)?;
        if target < 0 {
            return Err(DeviceError::SeekRange);
        }
        let mut target = target as usize;
        match &mut self.seq {
            SeqRef::Ref(_) => target = target.min(size),
            SeqRef::Mut(seq) => {
                if target > size {
                    // Seek past the end grows and zero-fills.
                    seq.resize(target);
                }
            }
        }
        self.pos = target;
        // The chunk walk needs pos within the sequence; clamp the cursor
        // anchor when everything shrank away.
        if self.chunk >= self.seq.get().chunks.len() {
            self.chunk = 0;
            self.pos0 = 0;
        }
        self.reposition();
        Ok(self.pos as u64)
    }

    fn truncate(&mut self) -> Result<()> {
        match &mut self.seq {
            SeqRef::Mut(seq) => {
                seq.resize(self.pos);
            }
            SeqRef::Ref(_) => return Err(DeviceError::Unsupported),
        }
        if self.chunk >= self.seq.get().chunks.len() {
            self.chunk = 0;
            self.pos0 = 0;
        }
        self.reposition();
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
