//! IEEE-754 conversion pipelines.

mod format;
mod parse;
mod tables;

use crate::FmtOpts;
use crate::FormatError;
use crate::FromChars;
use crate::Sink;
use crate::ToChars;

/// Raw access to an IEEE-754 bit pattern widened to 64 bits.
pub(crate) trait RawFloat: Copy {
    /// Mantissa width in bits.
    const MANTISSA_BITS: u32;
    /// Sign bit position in the widened pattern.
    const SIGN_BIT: u64;
    /// Mask of the mantissa bits.
    const MANTISSA_MASK: u64;
    /// Biased exponent of infinities and NaNs.
    const EXP_MAX: i32;

    /// Reassembles the value from the widened bit pattern.
    fn from_bits64(bits: u64) -> Self;
    /// Widens the value's bit pattern to 64 bits.
    fn to_bits64(self) -> u64;
}

impl RawFloat for f64 {
    const MANTISSA_BITS: u32 = 52;
    const SIGN_BIT: u64 = 1 << 63;
    const MANTISSA_MASK: u64 = (1 << 52) - 1;
    const EXP_MAX: i32 = 0x7ff;

    fn from_bits64(bits: u64) -> Self {
        f64::from_bits(bits)
    }

    fn to_bits64(self) -> u64 {
        self.to_bits()
    }
}

impl RawFloat for f32 {
    const MANTISSA_BITS: u32 = 23;
    const SIGN_BIT: u64 = 1 << 31;
    const MANTISSA_MASK: u64 = (1 << 23) - 1;
    const EXP_MAX: i32 = 0xff;

    fn from_bits64(bits: u64) -> Self {
        f32::from_bits(bits as u32)
    }

    fn to_bits64(self) -> u64 {
        u64::from(self.to_bits())
    }
}

macro_rules! impl_float_conv {
    ($($ty:ty),*) => {$(
        impl FromChars for $ty {
            fn from_chars(s: &[u8]) -> Option<(Self, usize)> {
                parse::float_from_chars::<$ty>(s)
            }
        }

        impl ToChars for $ty {
            fn to_chars<S: Sink + ?Sized>(
                &self,
                out: &mut S,
                fmt: &FmtOpts,
            ) -> Result<(), FormatError> {
                format::fmt_float_common::<$ty, S>(out, self.to_bits64(), fmt);
                Ok(())
            }
        }
    )*};
}

impl_float_conv!(f32, f64);
