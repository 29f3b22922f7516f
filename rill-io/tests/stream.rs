//! End-to-end stream scenarios: newline translation, escape handling,
//! compression, endian grouping, ties, and seek coherence.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rill_io::{
    ByteSeq,
    ByteSeqDevice,
    DevBuf,
    DevCaps,
    Device,
    DeviceError,
    InBuf,
    IoMode,
    OutBuf,
    Result,
    SeekDir,
};

/// Byte-sequence device that also records SGR parameter deliveries.
struct ColorDev<'a> {
    inner: ByteSeqDevice<'a>,
    colors: Vec<Vec<u8>>,
}

impl<'a> ColorDev<'a> {
    fn new(seq: &'a mut ByteSeq) -> Self {
        Self { inner: ByteSeqDevice::new(seq), colors: Vec::new() }
    }
}

impl Device for ColorDev<'_> {
    fn caps(&self) -> DevCaps {
        self.inner.caps()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.inner.write(buf)
    }

    fn seek(&mut self, off: i64, dir: SeekDir) -> Result<u64> {
        self.inner.seek(off, dir)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }

    fn color_escape(&mut self, codes: &[u8]) {
        self.colors.push(codes.to_vec());
    }
}

/// Replays a script of read chunks; useful for splitting interesting byte
/// pairs across device reads.
struct ChunkedDev {
    chunks: VecDeque<Vec<u8>>,
}

impl ChunkedDev {
    fn new<const N: usize>(chunks: [&[u8]; N]) -> Self {
        Self { chunks: chunks.iter().map(|c| c.to_vec()).collect() }
    }
}

impl Device for ChunkedDev {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.chunks.pop_front() {
            Some(chunk) => {
                assert!(chunk.len() <= buf.len());
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
            None => Ok(0),
        }
    }

    fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(DeviceError::Unsupported)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Write-only device collecting bytes into a shared vector.
#[derive(Clone)]
struct SharedVecDev(Rc<RefCell<Vec<u8>>>);

impl Device for SharedVecDev {
    fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(DeviceError::Unsupported)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[test]
fn text_mode_writer_expands_newlines() {
    let mut seq = ByteSeq::new();
    {
        let mut dev = ByteSeqDevice::new(&mut seq);
        let mut out = DevBuf::new(&mut dev, IoMode::OUT | IoMode::CR_LF);
        out.write(b"hello\nworld\n");
        out.flush();
        assert!(out.state().good());
    }
    assert_eq!(
        seq.to_vec(),
        b"hello\x0d\x0aworld\x0d\x0a".to_vec(),
        "12 characters become 14 bytes"
    );
}

#[test]
fn text_mode_reader_collapses_newlines() {
    let mut seq = ByteSeq::new();
    {
        let mut dev = ByteSeqDevice::new(&mut seq);
        let mut out = DevBuf::new(&mut dev, IoMode::OUT | IoMode::CR_LF);
        out.write(b"hello\nworld\n");
    }
    let mut dev = ByteSeqDevice::new(&mut seq);
    let mut input = DevBuf::new(&mut dev, IoMode::IN | IoMode::CR_LF);
    let mut chars = [0u8; 12];
    assert_eq!(input.read(&mut chars), 12);
    assert_eq!(&chars, b"hello\nworld\n");
    assert_eq!(input.get(), None);
}

#[test]
fn skipped_escapes_reach_the_color_sink_only() {
    let mut seq = ByteSeq::new();
    let colors;
    {
        let mut dev = ColorDev::new(&mut seq);
        {
            let mut out = DevBuf::new(
                &mut dev,
                IoMode::OUT | IoMode::CTRL_ESC | IoMode::SKIP_CTRL_ESC,
            );
            out.write(b"\x1b[31mA\x1b[0m");
            out.flush();
            assert!(out.state().good());
        }
        colors = dev.colors;
    }
    assert_eq!(seq.to_vec(), b"A");
    assert_eq!(colors, vec![vec![31], vec![0]]);
}

#[test]
fn forwarded_escapes_keep_the_bytes_and_dispatch() {
    let mut seq = ByteSeq::new();
    let colors;
    {
        let mut dev = ColorDev::new(&mut seq);
        {
            let mut out = DevBuf::new(&mut dev, IoMode::OUT | IoMode::CTRL_ESC);
            out.write(b"x\x1b[1;32my");
            out.flush();
        }
        colors = dev.colors;
    }
    assert_eq!(seq.to_vec(), b"x\x1b[1;32my");
    assert_eq!(colors, vec![vec![1, 32]]);
}

#[test]
fn escape_split_across_flushes_is_one_sequence() {
    let mut seq = ByteSeq::new();
    let colors;
    {
        let mut dev = ColorDev::new(&mut seq);
        {
            let mut out = DevBuf::new(
                &mut dev,
                IoMode::OUT | IoMode::CTRL_ESC | IoMode::SKIP_CTRL_ESC,
            );
            out.write(b"A\x1b[3");
            out.flush();
            out.write(b"1mB");
            out.flush();
        }
        colors = dev.colors;
    }
    assert_eq!(seq.to_vec(), b"AB");
    assert_eq!(colors, vec![vec![31]]);
}

#[test]
fn non_csi_escape_is_two_characters() {
    let mut seq = ByteSeq::new();
    {
        let mut dev = ByteSeqDevice::new(&mut seq);
        let mut out = DevBuf::new(
            &mut dev,
            IoMode::OUT | IoMode::CTRL_ESC | IoMode::SKIP_CTRL_ESC,
        );
        out.write(b"a\x1bcb");
        out.flush();
    }
    assert_eq!(seq.to_vec(), b"ab");
}

#[test]
fn crlf_split_across_device_reads() {
    let dev = ChunkedDev::new([b"line1\r".as_slice(), b"\nline2\r\n"]);
    let mut input = DevBuf::new(dev, IoMode::IN | IoMode::CR_LF);
    let mut chars = [0u8; 12];
    assert_eq!(input.read(&mut chars), 12);
    assert_eq!(&chars, b"line1\nline2\n");
}

#[test]
fn trailing_carriage_return_is_not_lost_at_eof() {
    let dev = ChunkedDev::new([b"tail\r".as_slice()]);
    let mut input = DevBuf::new(dev, IoMode::IN | IoMode::CR_LF);
    let mut chars = Vec::new();
    while let Some(c) = input.get() {
        chars.push(c);
    }
    assert_eq!(chars, b"tail\r");
}

#[test]
fn compressed_round_trip() {
    let mut seq = ByteSeq::new();
    let payload: Vec<u8> = (0..50_000u32)
        .flat_map(|v| [(v % 251) as u8, b'-'])
        .collect();
    {
        let mut dev = ByteSeqDevice::new(&mut seq);
        let mut out = DevBuf::new(
            &mut dev,
            (IoMode::OUT | IoMode::Z_COMPR).with_compression_level(6),
        );
        out.write(&payload);
        // Dropping the buffer flushes and emits the deflate terminator.
    }
    assert!(seq.len() < payload.len(), "the staging ring actually deflates");

    let mut dev = ByteSeqDevice::new(&mut seq);
    let mut input = DevBuf::new(&mut dev, IoMode::IN | IoMode::Z_COMPR);
    let mut back = vec![0u8; payload.len()];
    assert_eq!(input.read(&mut back), payload.len());
    assert_eq!(back, payload);
    assert_eq!(input.get(), None);
}

#[test]
fn compressed_streams_refuse_repositioning() {
    let mut seq = ByteSeq::new();
    let mut dev = ByteSeqDevice::new(&mut seq);
    let mut out = DevBuf::new(&mut dev, IoMode::OUT | IoMode::Z_COMPR);
    out.write(b"abc");
    assert_eq!(out.tell(), Some(3));
    assert_eq!(out.seek(0, SeekDir::Beg), None);
    assert!(out.state().fail());
}

#[test]
fn endian_inversion_reverses_element_groups() {
    let mut seq = ByteSeq::new();
    {
        let mut dev = ByteSeqDevice::new(&mut seq);
        let mut out = DevBuf::new(&mut dev, IoMode::OUT | IoMode::INVERT_ENDIAN);
        out.write_endian(&[1, 2, 3, 4, 5, 6, 7], 4);
        out.flush();
    }
    assert_eq!(seq.to_vec(), vec![4, 3, 2, 1, 7, 6, 5]);

    let mut dev = ByteSeqDevice::new(&mut seq);
    let mut input = DevBuf::new(&mut dev, IoMode::IN | IoMode::INVERT_ENDIAN);
    let mut back = [0u8; 7];
    assert_eq!(input.read_endian(&mut back, 4), 7);
    assert_eq!(back, [1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn tied_stream_flushes_before_the_peer_pulls() {
    let shared = Rc::new(RefCell::new(Vec::new()));
    let peer: Rc<RefCell<dyn OutBuf>> = Rc::new(RefCell::new(DevBuf::new(
        SharedVecDev(shared.clone()),
        IoMode::OUT,
    )));
    peer.borrow_mut().write(b"ping");
    assert!(shared.borrow().is_empty(), "the peer buffers until flushed");

    let mut input = DevBuf::new(ChunkedDev::new([b"x".as_slice()]), IoMode::IN);
    input.set_tie(&peer);
    assert_eq!(input.get(), Some(b'x'));
    assert_eq!(shared.borrow().as_slice(), b"ping");
}

#[test]
fn reader_seeks_stay_coherent_with_the_window() {
    let mut seq = ByteSeq::new();
    {
        let mut dev = ByteSeqDevice::new(&mut seq);
        let mut out = DevBuf::new(&mut dev, IoMode::OUT);
        out.write(b"abcdefghij");
    }
    let mut dev = ByteSeqDevice::new(&mut seq);
    let mut input = DevBuf::new(&mut dev, IoMode::IN);
    assert_eq!(input.get(), Some(b'a'));
    assert_eq!(input.tell(), Some(1));
    assert_eq!(input.seek(6, SeekDir::Beg), Some(6));
    assert_eq!(input.get(), Some(b'g'));
    // Seeking to the position already at hand does no device work and
    // reports the same offset.
    assert_eq!(input.seek(8, SeekDir::Beg), Some(8));
    assert_eq!(input.seek(0, SeekDir::Curr), Some(8));
    assert_eq!(input.get(), Some(b'i'));
}

#[test]
fn bad_writer_discards_further_output() {
    struct FailingDev;
    impl Device for FailingDev {
        fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
            Err(DeviceError::Unsupported)
        }
        fn write(&mut self, _buf: &[u8]) -> Result<usize> {
            Ok(0) // accepts nothing: a device error per the write contract
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }
    let mut out = DevBuf::new(FailingDev, IoMode::OUT);
    out.write(b"data");
    out.flush();
    assert!(out.state().bad());
    // Flushing again does not re-enter the device.
    out.flush();
    assert!(out.state().bad());
}

#[test]
fn write_seek_read_through_buffers() {
    // Write [1,2,3,4,5], overwrite at 2 with [9,9], read it all back.
    let mut seq = ByteSeq::new();
    {
        let mut dev = ByteSeqDevice::new(&mut seq);
        let mut out = DevBuf::new(&mut dev, IoMode::OUT);
        out.write(&[1, 2, 3, 4, 5]);
        assert_eq!(out.seek(2, SeekDir::Beg), Some(2));
        out.write(&[9, 9]);
    }
    let mut dev = ByteSeqDevice::new(&mut seq);
    let mut input = DevBuf::new(&mut dev, IoMode::IN);
    let mut back = [0u8; 5];
    assert_eq!(input.read(&mut back), 5);
    assert_eq!(back, [1, 2, 9, 9, 5]);
}
