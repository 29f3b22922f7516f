//! Locale-independent numeric string conversion.
//!
//! This crate converts between textual representations and integer or
//! IEEE-754 floating point values without consulting the process locale.
//! Formatting is round-trip correct: for every finite non-zero float `x`,
//! parsing the default (shortest) rendition of `x` recovers `x` bit for bit.
//!
//! The exact decimal/binary mantissa conversion is driven by a precomputed
//! table of 96-bit power-of-ten coefficients, with half-to-even rounding and
//! explicit tracking of the bits the table cannot make reliable.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

mod digits;
mod fp;
mod int;
mod opts;
mod sink;

pub use int::{
    from_chars_radix,
    IntChars,
};
pub use opts::{
    FmtFlags,
    FmtOpts,
    Grouping,
};
pub use sink::Sink;

/// Formatting request that the target representation cannot satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// Character-base formatting of an integral value outside the character
    /// range.
    #[error("integral value cannot be represented as a character")]
    NotACharacter,
}

/// Value to text conversion honoring [`FmtOpts`].
pub trait ToChars {
    /// Render `self` into `out`.
    ///
    /// All output is ASCII except for [`char`] values themselves.
    fn to_chars<S: Sink + ?Sized>(
        &self,
        out: &mut S,
        fmt: &FmtOpts,
    ) -> Result<(), FormatError>;
}

/// Text to value conversion with the no-consumption failure contract.
pub trait FromChars: Sized {
    /// Parse a value from the front of `s`, skipping leading ASCII
    /// whitespace.
    ///
    /// Returns the value together with the number of bytes consumed
    /// (whitespace included). `None` means the field was not parsed and no
    /// input was consumed; in particular an overflowing integer literal
    /// consumes nothing.
    fn from_chars(s: &[u8]) -> Option<(Self, usize)>;
}

/// Formats `v` into a fresh `String`.
pub fn to_text<T: ToChars>(v: &T, fmt: &FmtOpts) -> Result<String, FormatError> {
    let mut s = String::new();
    v.to_chars(&mut s, fmt)?;
    Ok(s)
}

/// Parses a complete string into a value.
///
/// Unlike [`FromChars::from_chars`] the whole input must be consumed, apart
/// from leading and trailing ASCII whitespace.
pub fn parse<T: FromChars>(s: &str) -> Option<T> {
    let bytes = s.as_bytes();
    let (value, consumed) = T::from_chars(bytes)?;
    if bytes[consumed..].iter().all(|c| c.is_ascii_whitespace()) {
        Some(value)
    } else {
        None
    }
}

pub(crate) fn skip_spaces(s: &[u8]) -> usize {
    s.iter().take_while(|c| c.is_ascii_whitespace()).count()
}

/// Case-insensitive match of `word` at the front of `s`; returns the number
/// of bytes matched (0 or `word.len()`).
pub(crate) fn starts_with_nocase(s: &[u8], word: &[u8]) -> usize {
    if s.len() < word.len() {
        return 0;
    }
    let matched = s
        .iter()
        .zip(word)
        .all(|(a, b)| a.to_ascii_lowercase() == *b);
    if matched {
        word.len()
    } else {
        0
    }
}
