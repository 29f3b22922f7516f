//! Round-trip laws over the full value domains.

use proptest::prelude::*;
use rill_cvt::{
    from_chars_radix,
    parse,
    to_text,
    FmtFlags,
    FmtOpts,
};

fn fmt(flags: FmtFlags) -> FmtOpts {
    FmtOpts::with_flags(flags)
}

proptest! {
    #![proptest_config(ProptestConfig { max_global_rejects: 1_000_000, ..ProptestConfig::with_cases(4096) })]

    #[test]
    fn f64_shortest_reparses_bit_for_bit(bits in any::<u64>()) {
        let v = f64::from_bits(bits);
        prop_assume!(v.is_finite());
        let s = to_text(&v, &FmtOpts::default()).unwrap();
        let back: f64 = parse(&s).unwrap();
        prop_assert_eq!(back.to_bits(), v.to_bits(), "text was {}", s);
    }

    #[test]
    fn f32_shortest_reparses_bit_for_bit(bits in any::<u32>()) {
        let v = f32::from_bits(bits);
        prop_assume!(v.is_finite());
        let s = to_text(&v, &FmtOpts::default()).unwrap();
        let back: f32 = parse(&s).unwrap();
        prop_assert_eq!(back.to_bits(), v.to_bits(), "text was {}", s);
    }

    #[test]
    fn i64_reparses_in_every_base(v in any::<i64>()) {
        for (flags, base) in [
            (FmtFlags::empty(), 10),
            (FmtFlags::BIN, 2),
            (FmtFlags::OCT, 8),
            (FmtFlags::HEX, 16),
        ] {
            let s = to_text(&v, &fmt(flags)).unwrap();
            let (back, consumed) = from_chars_radix::<i64>(s.as_bytes(), base).unwrap();
            prop_assert_eq!(back, v);
            prop_assert_eq!(consumed, s.len());
        }
    }

    #[test]
    fn u64_reparses_with_alternate_prefixes(v in any::<u64>()) {
        for (flags, base) in [
            (FmtFlags::BIN | FmtFlags::ALTERNATE, 2),
            (FmtFlags::HEX | FmtFlags::ALTERNATE, 16),
        ] {
            let s = to_text(&v, &fmt(flags)).unwrap();
            let (back, consumed) = from_chars_radix::<u64>(s.as_bytes(), base).unwrap();
            prop_assert_eq!(back, v);
            prop_assert_eq!(consumed, s.len());
        }
    }

    #[test]
    fn u32_width_padding_never_drops_digits(v in any::<u32>(), width in 0u32..40) {
        let s = to_text(&v, &FmtOpts::default().width(width)).unwrap();
        prop_assert!(s.len() >= width as usize);
        let back: u32 = parse(&s).unwrap();
        prop_assert_eq!(back, v);
    }

    #[test]
    fn f64_fixed_output_stays_close(bits in any::<u64>()) {
        let v = f64::from_bits(bits);
        prop_assume!(v.is_finite() && v.abs() < 1e12);
        let s = to_text(&v, &fmt(FmtFlags::FIXED).prec(6)).unwrap();
        let back: f64 = parse(&s).unwrap();
        // Half a unit in the sixth fraction digit plus the re-parse ulp.
        let tol = 1e-6 + v.abs() * 1e-15;
        prop_assert!((back - v).abs() <= tol, "{} -> {} -> {}", v, s, back);
    }
}

#[test]
fn canonicalization_is_idempotent() {
    for s in ["0.1", "1000", "2.5e-10", "-42", "1e+25", "5e-324"] {
        let v: f64 = parse(s).unwrap();
        let text = to_text(&v, &FmtOpts::default()).unwrap();
        let v2: f64 = parse(&text).unwrap();
        let text2 = to_text(&v2, &FmtOpts::default()).unwrap();
        assert_eq!(text, text2);
        assert_eq!(v.to_bits(), v2.to_bits());
    }
}
