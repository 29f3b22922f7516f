//! Property tests over the store and the text-mode pipeline.

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{
    Rng,
    SeedableRng,
};
use rstest::rstest;

use rill_io::{
    mode_from_str,
    ByteSeq,
    ByteSeqDevice,
    DevBuf,
    Device,
    InBuf,
    IoMode,
    OutBuf,
    SeekDir,
};

proptest! {
    /// Random seek+write traffic against a flat vector model.
    #[test]
    fn byteseq_matches_a_flat_model(
        ops in proptest::collection::vec(
            (0usize..5000, proptest::collection::vec(any::<u8>(), 1..50)),
            1..40,
        )
    ) {
        let mut seq = ByteSeq::new();
        let mut model: Vec<u8> = Vec::new();
        {
            let mut dev = ByteSeqDevice::new(&mut seq);
            for (off, data) in &ops {
                dev.seek(*off as i64, SeekDir::Beg).unwrap();
                if model.len() < *off {
                    model.resize(*off, 0);
                }
                dev.write(data).unwrap();
                if model.len() < off + data.len() {
                    model.resize(off + data.len(), 0);
                }
                model[*off..off + data.len()].copy_from_slice(data);
            }
        }
        prop_assert_eq!(seq.to_vec(), model);
    }

    /// Every `\n` fed to a text writer becomes exactly one `\r\n` on the
    /// device, and reading the device back restores the original.
    #[test]
    fn text_mode_round_trips(text in "[a-zA-Z0-9 .\n]{0,400}") {
        let bytes = text.as_bytes();
        let mut seq = ByteSeq::new();
        {
            let mut dev = ByteSeqDevice::new(&mut seq);
            let mut out = DevBuf::with_capacity(&mut dev, IoMode::OUT | IoMode::CR_LF, 256);
            out.write(bytes);
            out.flush();
            prop_assert!(out.state().good());
        }
        let raw = seq.to_vec();
        let pairs = raw.windows(2).filter(|w| *w == b"\r\n").count();
        let newlines = bytes.iter().filter(|&&c| c == b'\n').count();
        prop_assert_eq!(pairs, newlines);

        let mut dev = ByteSeqDevice::new(&mut seq);
        let mut input = DevBuf::with_capacity(&mut dev, IoMode::IN | IoMode::CR_LF, 256);
        let mut back = vec![0u8; bytes.len()];
        prop_assert_eq!(input.read(&mut back), bytes.len());
        prop_assert_eq!(back.as_slice(), bytes);
    }
}

#[rstest]
#[case("r", IoMode::IN)]
#[case("w", IoMode::OUT | IoMode::CREATE | IoMode::TRUNCATE)]
#[case("r+", IoMode::IN | IoMode::OUT)]
#[case("at", IoMode::OUT | IoMode::CREATE | IoMode::APPEND | IoMode::CR_LF)]
#[case("w?b", IoMode::OUT | IoMode::CREATE | IoMode::TRUNCATE)]
fn mode_strings(#[case] text: &str, #[case] expected: IoMode) {
    assert_eq!(mode_from_str(text, IoMode::empty()), expected);
}

#[test]
fn deflate_round_trips_a_random_payload() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let payload: Vec<u8> = (0..37_000).map(|_| rng.gen_range(b'a'..=b'z')).collect();

    let mut seq = ByteSeq::new();
    {
        let mut dev = ByteSeqDevice::new(&mut seq);
        let mut out = DevBuf::new(&mut dev, IoMode::OUT | IoMode::Z_COMPR);
        out.write(&payload);
    }
    let mut dev = ByteSeqDevice::new(&mut seq);
    let mut input = DevBuf::new(&mut dev, IoMode::IN | IoMode::Z_COMPR);
    let mut back = vec![0u8; payload.len()];
    assert_eq!(input.read(&mut back), payload.len());
    assert_eq!(back, payload);
}
