//! Stream mode and state bitfields.

use bitflags::bitflags;

bitflags! {
    /// Open mode of a stream.
    pub struct IoMode: u16 {
        /// Readable.
        const IN = 0x1;
        /// Writable. A buffer is a source or a sink, never both at once;
        /// `OUT` wins at initialization.
        const OUT = 0x2;
        /// Truncate the target on open.
        const TRUNCATE = 0x4;
        /// Position writes at the end.
        const APPEND = 0x8;
        /// Create the target if missing.
        const CREATE = 0x10;
        /// Fail if the target already exists.
        const EXCLUSIVE = 0x20;
        /// Deflate on write, inflate on read.
        const Z_COMPR = 0x40;
        /// CRLF<->LF translation (the `text` mode of the open string).
        const CR_LF = 0x80;
        /// Recognize `ESC [ .. final` sequences and dispatch SGR parameters
        /// to the device color sink.
        const CTRL_ESC = 0x100;
        /// Drop recognized escape sequences from the byte stream. Implies
        /// `CTRL_ESC`; the combination is normalized at buffer setup.
        const SKIP_CTRL_ESC = 0x200;
        /// Byte-swap element groups on read and write.
        const INVERT_ENDIAN = 0x8000;

        /// Deflate level storage, see [`IoMode::with_compression_level`].
        const Z_LEVEL_MASK = 0x3c00;
    }
}

const Z_LEVEL_SHIFT: u16 = 10;

impl IoMode {
    /// Platform text default: CRLF translation where the native newline is
    /// CRLF, nothing elsewhere.
    pub fn text_default() -> Self {
        if cfg!(windows) {
            IoMode::CR_LF
        } else {
            IoMode::empty()
        }
    }

    /// Stores a deflate level (0..=9) into the mode word.
    pub fn with_compression_level(self, level: u8) -> Self {
        let bits = (self.bits() & !IoMode::Z_LEVEL_MASK.bits())
            | (u16::from(level.min(9)) << Z_LEVEL_SHIFT);
        IoMode::from_bits_truncate(bits)
    }

    /// Deflate level previously stored, if any (0 means default).
    pub fn compression_level(self) -> u8 {
        ((self.bits() & IoMode::Z_LEVEL_MASK.bits()) >> Z_LEVEL_SHIFT) as u8
    }
}

/// Parses a POSIX-like open mode string.
///
/// `r` read, `w` write+create+truncate, `a` write+create+append, a
/// following `+` adds the opposite direction, `x` exclusive, `t` text,
/// `b` binary, `z` deflate with an optional `0..9` level digit. Unknown
/// characters are ignored.
pub fn mode_from_str(mode: &str, default: IoMode) -> IoMode {
    let mut result = default;
    let bytes = mode.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'r' => {
                result |= IoMode::IN;
                if bytes.get(i + 1) == Some(&b'+') {
                    result |= IoMode::OUT;
                    i += 1;
                }
            }
            b'w' => {
                result |= IoMode::OUT | IoMode::CREATE | IoMode::TRUNCATE;
                if bytes.get(i + 1) == Some(&b'+') {
                    result |= IoMode::IN;
                    i += 1;
                }
            }
            b'a' => {
                result |= IoMode::OUT | IoMode::CREATE | IoMode::APPEND;
                if bytes.get(i + 1) == Some(&b'+') {
                    result |= IoMode::IN;
                    i += 1;
                }
            }
            b'x' => result |= IoMode::EXCLUSIVE,
            b't' => result |= IoMode::CR_LF,
            b'b' => result.remove(IoMode::CR_LF),
            b'z' => {
                result |= IoMode::Z_COMPR;
                if let Some(lvl @ b'0'..=b'9') = bytes.get(i + 1).copied() {
                    result = result.with_compression_level(lvl - b'0');
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    result
}

bitflags! {
    /// Sticky stream state bits; an empty set is the good state.
    pub struct IoStateBits: u8 {
        /// Unrecoverable device failure.
        const BAD = 0x1;
        /// Last operation failed.
        const FAIL = 0x2;
        /// End of stream was observed.
        const EOF = 0x4;
    }
}

/// Mode plus sticky state carried by every buffered stream.
#[derive(Debug, Clone, Copy)]
pub struct IoState {
    mode: IoMode,
    bits: IoStateBits,
}

impl IoState {
    /// A good-state holder for the given mode.
    pub fn new(mode: IoMode) -> Self {
        Self { mode, bits: IoStateBits::empty() }
    }

    /// The stream's open mode.
    pub fn mode(&self) -> IoMode {
        self.mode
    }

    pub(crate) fn set_mode(&mut self, mode: IoMode) {
        self.mode = mode;
    }

    /// Current state bits.
    pub fn bits(&self) -> IoStateBits {
        self.bits
    }

    /// No failure bits set.
    pub fn good(&self) -> bool {
        self.bits.is_empty()
    }

    /// Hard device failure was recorded.
    pub fn bad(&self) -> bool {
        self.bits.contains(IoStateBits::BAD)
    }

    /// Operation failure (includes `bad`).
    pub fn fail(&self) -> bool {
        self.bits.intersects(IoStateBits::FAIL | IoStateBits::BAD)
    }

    /// End of stream was reached.
    pub fn eof(&self) -> bool {
        self.bits.contains(IoStateBits::EOF)
    }

    /// Sets the given sticky bits.
    pub fn set(&mut self, bits: IoStateBits) {
        self.bits |= bits;
    }

    /// Clears the given bits, keeping the rest.
    pub fn unset(&mut self, bits: IoStateBits) {
        self.bits.remove(bits);
    }

    /// Resets to the good state.
    pub fn clear(&mut self) {
        self.bits = IoStateBits::empty();
    }
}

/// Seek origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDir {
    /// From the beginning of the stream.
    Beg,
    /// From the current position.
    Curr,
    /// From the end of the stream.
    End,
}
