//! Layered buffered character streams over byte devices.
//!
//! A [`Device`] is a raw byte channel: an OS file, a growable in-memory
//! [`ByteSeq`], or a process stream. A [`DevBuf`] turns one into a
//! buffered character stream and is the only layer touching on-wire
//! bytes: it translates line endings, recognizes ANSI escape sequences
//! (dispatching SGR parameters to the device color sink), and can deflate
//! or inflate at the buffer edge. [`FlatBuf`] and [`OStringBuf`] provide
//! the same stream surface over borrowed spans and owned strings.
//!
//! Stream operations never return errors by value; failures become sticky
//! state bits cleared only explicitly, in the tradition of character
//! stream stacks.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

mod buf;
mod byteseq;
mod devbuf;
mod device;
mod error;
mod filebuf;
mod filedev;
mod flatbuf;
mod fmt;
mod ostringbuf;
mod state;
pub mod stdio;

pub use buf::{
    Cursor,
    InBuf,
    OutBuf,
};
pub use byteseq::{
    ByteSeq,
    ByteSeqDevice,
};
pub use devbuf::{
    DevBuf,
    Tie,
};
pub use device::{
    DevCaps,
    Device,
};
pub use error::{
    DeviceError,
    Result,
};
pub use filebuf::FileBuf;
pub use filedev::FileDevice;
pub use flatbuf::FlatBuf;
pub use fmt::PutNum;
pub use ostringbuf::OStringBuf;
pub use state::{
    mode_from_str,
    IoMode,
    IoState,
    IoStateBits,
    SeekDir,
};
