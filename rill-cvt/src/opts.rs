//! Format options shared by the integer and floating point pipelines.

use bitflags::bitflags;

bitflags! {
    /// Formatting flags.
    ///
    /// Some named values are multi-bit fields rather than single bits; test
    /// them with the matching `*_FIELD` mask, e.g.
    /// `fmt.flags & FmtFlags::BASE_FIELD == FmtFlags::HEX`.
    pub struct FmtFlags: u32 {
        /// Mask of the numeric base field. An empty field means decimal.
        const BASE_FIELD = 0x7;
        /// Base 2.
        const BIN = 0x1;
        /// Base 8.
        const OCT = 0x2;
        /// Base 16.
        const HEX = 0x3;
        /// Render the integral value as a single character.
        const CHARACTER = 0x4;

        /// Mask of the field-adjustment bits. An empty field means right.
        const ADJUST_FIELD = 0x18;
        /// Pad on the right.
        const LEFT = 0x8;
        /// Pad on the left.
        const RIGHT = 0x10;
        /// Pad between the numeric prefix and the digits.
        const INTERNAL = 0x18;

        /// Mask of the sign-display bits. An empty field shows `-` only.
        const SIGN_FIELD = 0x60;
        /// Always show a sign.
        const SIGN_POS = 0x20;
        /// Show a space in place of a positive sign.
        const SIGN_ALIGN = 0x40;

        /// Mask of the float-notation bits. An empty field selects the
        /// shortest round-trip form.
        const FLOAT_FIELD = 0x180;
        /// Fixed-point notation.
        const FIXED = 0x80;
        /// Scientific notation.
        const SCIENTIFIC = 0x100;

        /// Upper-case digits, exponent markers and special-value names.
        const UPPERCASE = 0x200;
        /// Alternate form: base prefix (`0b`, `0`, `0x`).
        const ALTERNATE = 0x400;
        /// Pad with `0` after the prefix instead of the fill character.
        const LEADING_ZEROES = 0x800;
        /// Always emit the decimal point.
        const SHOW_POINT = 0x1000;
        /// Apply digit grouping from [`FmtOpts::grouping`].
        const LOCALIZE = 0x2000;
        /// Escape the value the way a debug dump would.
        const DEBUG_FORMAT = 0x4000;
        /// Restrict special values to JSON-compatible spellings.
        const JSON_COMPAT = 0x8000;
    }
}

/// Digit grouping rule.
///
/// `groups` lists group sizes starting from the least significant digit; the
/// last element repeats. A zero element disables grouping from that point
/// on, matching the usual locale grouping-string convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grouping {
    /// Group separator character.
    pub sep: u8,
    /// Run-length list of group sizes.
    pub groups: Vec<u8>,
}

impl Grouping {
    /// Groups of three separated by `sep`.
    pub fn thousands(sep: u8) -> Self {
        Self { sep, groups: vec![3] }
    }

    pub(crate) fn is_active(&self) -> bool {
        !self.groups.is_empty() && self.groups[0] != 0
    }
}

/// Numeric format options.
#[derive(Debug, Clone, PartialEq)]
pub struct FmtOpts {
    /// Formatting flags.
    pub flags: FmtFlags,
    /// Minimum field width in characters; 0 disables padding.
    pub width: u32,
    /// Precision; negative selects the type's default.
    pub prec: i32,
    /// Fill character for width adjustment.
    pub fill: u8,
    /// Grouping rule consulted when [`FmtFlags::LOCALIZE`] is set.
    pub grouping: Option<Grouping>,
}

impl Default for FmtOpts {
    fn default() -> Self {
        Self {
            flags: FmtFlags::empty(),
            width: 0,
            prec: -1,
            fill: b' ',
            grouping: None,
        }
    }
}

impl FmtOpts {
    /// Options with the given flags and everything else defaulted.
    pub fn with_flags(flags: FmtFlags) -> Self {
        Self { flags, ..Self::default() }
    }

    /// Sets the minimum field width.
    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Sets the precision.
    pub fn prec(mut self, prec: i32) -> Self {
        self.prec = prec;
        self
    }

    /// Sets the fill character.
    pub fn fill(mut self, fill: u8) -> Self {
        self.fill = fill;
        self
    }

    /// Sets the grouping rule (the `LOCALIZE` flag still gates its use).
    pub fn grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = Some(grouping);
        self
    }

    pub(crate) fn active_grouping(&self) -> Option<&Grouping> {
        if !self.flags.contains(FmtFlags::LOCALIZE) {
            return None;
        }
        self.grouping.as_ref().filter(|g| g.is_active())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_bit_fields_compose() {
        let f = FmtFlags::HEX | FmtFlags::UPPERCASE;
        assert_eq!(f & FmtFlags::BASE_FIELD, FmtFlags::HEX);
        assert_ne!(f & FmtFlags::BASE_FIELD, FmtFlags::BIN);
        assert_eq!(FmtFlags::INTERNAL, FmtFlags::LEFT | FmtFlags::RIGHT);
    }

    #[test]
    fn grouping_activity() {
        assert!(Grouping::thousands(b',').is_active());
        assert!(!Grouping { sep: b',', groups: vec![] }.is_active());
        assert!(!Grouping { sep: b',', groups: vec![0] }.is_active());
    }
}
