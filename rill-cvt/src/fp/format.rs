//! IEEE-754 to string conversion.
//!
//! The binary mantissa is multiplied by a 96-bit power-of-ten coefficient
//! chosen so the integer part of the product carries exactly the requested
//! digit count. Rounding is half to even over the reliable bits of the
//! product. In the default mode the digits are then trimmed while the
//! accumulated error stays inside the round-trip interval of the value.

use crate::digits::{
    dec_len,
    gen_digits,
    ulog2,
    DIGITS_LOWER,
    DIGITS_UPPER,
    DIGIT_PAIRS,
};
use crate::fp::tables::{
    tables,
    POW10_MAX,
    POW2_MAX,
    PREC_LIMIT,
};
use crate::fp::RawFloat;
use crate::int::{
    emit_adjusted,
    grouped_len,
    weave_groups,
    Prefix,
};
use crate::opts::Grouping;
use crate::FmtFlags;
use crate::FmtOpts;
use crate::Sink;

/// Decimal mantissa and exponent of the first digit.
struct FpDec {
    mantissa: u64,
    exp: i32,
}

/// Default significant-digit precision for a mantissa of `log + 1` bits;
/// enough to make the shortest form unambiguous before trimming.
const DEFAULT_PREC: [i32; 53] = [
    2, 2, 2, 3, 3, 3, 4, 4, 4, 5, 5, 5, 5, 6, 6, 6, 7, 7, //
    7, 8, 8, 8, 8, 9, 9, 9, 10, 10, 10, 11, 11, 11, 11, 12, 12, 12, //
    13, 13, 13, 14, 14, 14, 14, 15, 15, 15, 16, 16, 16, 17, 17, 17, 17,
];

pub(crate) fn fmt_float_common<F: RawFloat, S: Sink + ?Sized>(
    out: &mut S,
    bits: u64,
    fmt: &FmtOpts,
) {
    let bpm = F::MANTISSA_BITS;
    let exp_max = F::EXP_MAX;
    let exp_bias = exp_max >> 1;
    let upper = fmt.flags.contains(FmtFlags::UPPERCASE);

    let neg = bits & F::SIGN_BIT != 0;
    let prefix = Prefix::sign_for(neg, fmt.flags);

    let exp_field = (bits >> bpm) as i32 & exp_max;
    let mut mantissa = bits & F::MANTISSA_MASK;

    if exp_field == exp_max {
        let word: &[u8] = match (mantissa == 0, upper) {
            (true, false) => b"inf",
            (true, true) => b"INF",
            (false, false) => b"nan",
            (false, true) => b"NAN",
        };
        emit_adjusted(out, fmt, &prefix, 3, false, |s| s.append(word));
        return;
    }

    if fmt.flags & FmtFlags::BASE_FIELD == FmtFlags::HEX {
        return fmt_float_hex::<F, S>(out, prefix, mantissa, exp_field, fmt);
    }

    let mut exp = exp_field - exp_bias;
    let mut fp10 = FpDec { mantissa: 0, exp: 0 };
    let mut fp_fmt = fmt.flags & FmtFlags::FLOAT_FIELD;
    let mut prec = fmt.prec;
    let mut optimal = false;

    // Shift the MSB of the binary mantissa into bit 63.
    let mut log: i32;
    if exp == -exp_bias {
        // Denormal: the leading 1 is wherever the highest set bit is.
        log = ulog2(mantissa) as i32;
        mantissa <<= 63 - log as u32;
        exp -= bpm as i32 - log - 1;
    } else {
        mantissa = (mantissa << (63 - bpm)) | (1u64 << 63);
        log = bpm as i32;
    }

    if prec < 0 {
        prec = DEFAULT_PREC[log as usize];
        optimal = fp_fmt.is_empty();
    }

    let tbl = tables();
    if mantissa != 0 {
        fp10.exp = tbl.exp2to10[(POW2_MAX + exp) as usize];

        // The integer part of the decimal mantissa is the digits to output;
        // its fractional part is rounded away.
        if fp_fmt.is_empty() {
            prec = (prec - 1).max(0);
        }
        let mut n_digs = 1 + prec;
        if fp_fmt == FmtFlags::FIXED {
            n_digs += fp10.exp;
        }

        if n_digs >= 0 {
            let n_digs = n_digs.min(PREC_LIMIT);

            // Walking `n_digs - 1` rows up the coefficient table multiplies
            // the product by the matching power of ten.
            let coef = &tbl.coef10to2[(POW10_MAX - fp10.exp + n_digs - 1) as usize];
            let prod = coef.mul_hi128(mantissa);
            let mut hi = (prod >> 64) as u64;
            let mut lo = prod as u64;
            hi = hi.wrapping_add(mantissa);

            // Only 96 product bits are reliable; fold a half at the cutoff
            // so a trailing `0111…` tail reads the same as `1000…`.
            let lsb_half = 0x8000_0000u64;
            lo = lo.wrapping_add(lsb_half);
            if lo < lsb_half {
                hi = hi.wrapping_add(1);
            }
            lo &= !0xffff_ffffu64;

            // Carry out of bit 127, either from the implicit 1 or from
            // rounding; it is the 65th significand bit from here on.
            let higher_bit = u64::from(hi < mantissa);

            let shift = 63 - exp - coef.exp;
            let mut err: i128 = 0;
            let mut err_shift: u32 = 0;
            let mut emi = 0usize;

            if shift == 0 && higher_bit != 0 {
                debug_assert_eq!(n_digs, PREC_LIMIT);
                // 65 significant bits: one decimal digit more than u64 can
                // carry. Divide the 65-bit value by ten, reusing the known
                // quotient of the 2^64 summand.
                fp10.exp += 1;
                const DIV64: u64 = 1_844_674_407_370_955_161;
                const MOD64: u64 = 6;
                fp10.mantissa = DIV64 + hi.wrapping_add(MOD64) / 10;
                let rem = hi.wrapping_sub(10u64.wrapping_mul(fp10.mantissa)) as i64;
                if rem > 5 || (rem == 5 && (lo != 0 || fp10.mantissa & 1 != 0)) {
                    fp10.mantissa += 1;
                }
            } else {
                // Align the fractional part with the 64-bit boundary and
                // capture the bits below it as the initial error.
                if shift >= 46 {
                    lo = (lo >> 32) | (hi << 32);
                    hi = (hi >> 32) | (higher_bit << 32);
                    err_shift = (shift - 32) as u32;
                    err = i128::from(hi & ((1u64 << err_shift) - 1));
                    hi >>= err_shift;
                    log += 32;
                } else {
                    err_shift = (shift + 4) as u32;
                    err = i128::from(((hi << 4) | (lo >> 60)) & ((1u64 << err_shift) - 1));
                    hi = (hi >> shift as u32)
                        | higher_bit.checked_shl(64 - shift as u32).unwrap_or(0);
                    lo <<= 4;
                    log -= 4;
                }

                if fp_fmt != FmtFlags::FIXED && hi >= tbl.ten_pows[n_digs as usize] {
                    // One excess digit: remove it, rounding half to even.
                    fp10.exp += 1;
                    fp10.mantissa = hi / 10;
                    let mut rem = i128::from(hi - 10 * fp10.mantissa);
                    if rem > 5 || (rem == 5 && (err != 0 || lo != 0 || fp10.mantissa & 1 != 0)) {
                        fp10.mantissa += 1;
                        rem -= 10;
                    }
                    err += rem << err_shift;
                    emi += 10;
                } else {
                    let half: i128 = 1i128 << (err_shift - 1);
                    fp10.mantissa = hi;
                    if err > half || (err == half && (lo != 0 || hi & 1 != 0)) {
                        fp10.mantissa += 1;
                        err -= half << 1;
                    }
                    if fp10.mantissa >= tbl.ten_pows[n_digs as usize] {
                        fp10.exp += 1; // one excess digit
                        if fp_fmt != FmtFlags::FIXED {
                            // The mantissa is an exact power of ten here.
                            fp10.mantissa /= 10;
                        }
                    }
                }
            }

            if fp10.mantissa != 0 {
                if optimal {
                    // Error interval inside which any decimal re-parses to
                    // the same value; the lower neighbor is twice as close
                    // right above a power of two.
                    let dm = if log + 1 >= 64 { 0 } else { coef.hi >> (log + 1) as u32 };
                    let da = if log > 63 { 0 } else { 1u64 << (63 - log) as u32 };
                    let delta_minus = u128::from(dm) + u128::from(da);
                    let mut delta_plus = delta_minus;
                    if exp > -exp_bias + 1 && mantissa == 1u64 << 63 {
                        delta_plus = (delta_plus >> 1) + (delta_plus & 1);
                    }
                    err <<= 1;
                    err_shift += 1;
                    if lo >= 0x8000_0000 {
                        err += 1;
                    }

                    // Trim digits while one of the round directions keeps
                    // the accumulated error inside the interval; prefer the
                    // nearer direction, half to even.
                    let max_err_mul = delta_minus << 1;
                    loop {
                        let mut t = fp10.mantissa / 10;
                        let rem = (fp10.mantissa - 10 * t) as usize;
                        if rem > 0 {
                            let mul = tbl.decimal_mul.get(emi + rem).copied().unwrap_or(u64::MAX);
                            err += i128::from(mul) << err_shift;
                            emi += 10;
                            let mul0 =
                                tbl.decimal_mul.get(emi).copied().unwrap_or(u64::MAX);
                            let err2 = (i128::from(mul0) << err_shift) - err;
                            let down_ok = err >= 0 && (err as u128) < delta_plus;
                            let up_ok = err2 >= 0 && (err2 as u128) < delta_minus;
                            if down_ok {
                                if up_ok && (err > err2 || (err == err2 && t & 1 != 0)) {
                                    t += 1;
                                    err = -err2;
                                }
                            } else if up_ok {
                                t += 1;
                                err = -err2;
                            } else {
                                break;
                            }
                        } else {
                            emi += 10;
                        }
                        prec -= 1;
                        fp10.mantissa = t;
                        let mul0 = tbl.decimal_mul.get(emi).copied().unwrap_or(u64::MAX);
                        if (u128::from(mul0) << err_shift) >= max_err_mul {
                            // Nothing further can stay inside the interval;
                            // only exact trailing zeroes may still go.
                            loop {
                                let t = fp10.mantissa / 10;
                                if fp10.mantissa > 10 * t {
                                    break;
                                }
                                prec -= 1;
                                fp10.mantissa = t;
                            }
                            break;
                        }
                    }
                    if prec < 0 {
                        fp10.exp += 1;
                        prec = 0;
                    }
                    if fp10.exp >= -4 && fp10.exp <= prec + 4 {
                        fp_fmt = FmtFlags::FIXED;
                        prec = (prec - fp10.exp).max(0);
                    }
                } else if fp_fmt.is_empty() {
                    let prec0 = prec;
                    prec = n_digs - 1;
                    loop {
                        let t = fp10.mantissa / 10;
                        if fp10.mantissa > 10 * t {
                            break;
                        }
                        prec -= 1;
                        fp10.mantissa = t;
                    }
                    if fp10.exp >= -4 && fp10.exp <= prec0 {
                        fp_fmt = FmtFlags::FIXED;
                        prec = (prec - fp10.exp).max(0);
                    }
                }
            }
        }
    }

    if fp10.mantissa == 0 {
        fp10.exp = 0;
        if fp_fmt.is_empty() {
            fp_fmt = FmtFlags::FIXED;
            prec = 0;
        }
    }

    let show_point = prec > 0 || fmt.flags.contains(FmtFlags::SHOW_POINT);
    let prec = prec as usize;
    if fp_fmt == FmtFlags::FIXED {
        let grouping = fmt.active_grouping();
        let int_len = 1 + fp10.exp.max(0) as usize;
        let int_len_out = match grouping {
            Some(g) => grouped_len(int_len, g),
            None => int_len,
        };
        let body_len = int_len_out + usize::from(show_point) + prec;
        emit_adjusted(out, fmt, &prefix, body_len, true, |s| {
            gen_fixed(s, &fp10, show_point, prec, grouping)
        });
    } else {
        let exp_len = if fp10.exp <= -100 || fp10.exp >= 100 { 5 } else { 4 };
        let body_len = 1 + usize::from(show_point) + prec + exp_len;
        emit_adjusted(out, fmt, &prefix, body_len, true, |s| {
            gen_scientific(s, &fp10, upper, show_point, prec)
        });
    }
}

fn gen_scientific<S: Sink + ?Sized>(
    out: &mut S,
    fp10: &FpDec,
    upper: bool,
    show_point: bool,
    prec: usize,
) {
    let mut buf = [0u8; 24];
    let p = gen_digits(&mut buf, 20, fp10.mantissa);
    let digits = &buf[p..20];
    out.put(digits[0]);
    if show_point {
        out.put(b'.');
    }
    let frac = &digits[1..];
    out.append(frac);
    out.fill(prec.saturating_sub(frac.len()), b'0');

    out.put(if upper { b'E' } else { b'e' });
    let (sign, e) = if fp10.exp < 0 {
        (b'-', -fp10.exp as usize)
    } else {
        (b'+', fp10.exp as usize)
    };
    out.put(sign);
    if e >= 100 {
        out.put(b'0' + (e / 100) as u8);
    }
    let r = e % 100;
    out.append(&DIGIT_PAIRS[2 * r..2 * r + 2]);
}

fn gen_fixed<S: Sink + ?Sized>(
    out: &mut S,
    fp10: &FpDec,
    show_point: bool,
    prec: usize,
    grouping: Option<&Grouping>,
) {
    let mut buf = [0u8; 24];
    let p = if fp10.mantissa == 0 {
        20
    } else {
        gen_digits(&mut buf, 20, fp10.mantissa)
    };
    let digits = &buf[p..20];

    if fp10.exp >= 0 {
        let int_len = fp10.exp as usize + 1;
        let (int_digits, frac_digits) = if digits.len() <= int_len {
            (digits, &[][..])
        } else {
            digits.split_at(int_len)
        };
        let int_zeros = int_len - int_digits.len();
        match grouping {
            Some(g) => {
                let mut ibuf = [0u8; 320];
                ibuf[..int_digits.len()].copy_from_slice(int_digits);
                ibuf[int_digits.len()..int_len].fill(b'0');
                let mut woven = [0u8; 640];
                let wp = weave_groups(&ibuf[..int_len], &mut woven, 640, g);
                out.append(&woven[wp..]);
            }
            None => {
                out.append(int_digits);
                out.fill(int_zeros, b'0');
            }
        }
        if show_point {
            out.put(b'.');
        }
        out.append(frac_digits);
        out.fill(prec.saturating_sub(frac_digits.len()), b'0');
    } else {
        out.put(b'0');
        if show_point {
            out.put(b'.');
        }
        let lead = (-fp10.exp - 1) as usize;
        out.fill(lead, b'0');
        out.append(digits);
        out.fill(prec.saturating_sub(lead + digits.len()), b'0');
    }
}

/// Hex-float: `[0x]h.hhhp±exp` with the binary exponent in decimal.
fn fmt_float_hex<F: RawFloat, S: Sink + ?Sized>(
    out: &mut S,
    mut prefix: Prefix,
    mantissa: u64,
    exp_field: i32,
    fmt: &FmtOpts,
) {
    let bpm = F::MANTISSA_BITS;
    let exp_bias = F::EXP_MAX >> 1;
    let upper = fmt.flags.contains(FmtFlags::UPPERCASE);
    let digs = if upper { DIGITS_UPPER } else { DIGITS_LOWER };

    if fmt.flags.contains(FmtFlags::ALTERNATE) {
        prefix.push(b'0');
        prefix.push(if upper { b'X' } else { b'x' });
    }

    let nibbles = (bpm + 3) / 4;
    let mut frac = mantissa << (4 * nibbles - bpm);
    let (mut lead, exp2) = if exp_field == 0 {
        (0u64, if mantissa == 0 { 0 } else { 1 - exp_bias })
    } else {
        (1u64, exp_field - exp_bias)
    };

    let mut prec = fmt.prec;
    let mut n_zeroes = 0usize;
    if prec < 0 {
        // Default precision: trim trailing zero nibbles.
        prec = nibbles as i32;
        while prec > 0 && frac & 0xf == 0 {
            frac >>= 4;
            prec -= 1;
        }
    } else if (prec as u32) < nibbles {
        // Round at the nibble boundary, half to even.
        let drop = (nibbles - prec as u32) * 4;
        let mut kept = frac >> drop;
        let rem = frac & ((1u64 << drop) - 1);
        let half = 1u64 << (drop - 1);
        if rem > half || (rem == half && kept & 1 != 0) {
            kept += 1;
        }
        if kept >> (4 * prec as u32) != 0 {
            kept = 0;
            lead += 1;
        }
        frac = kept;
    } else {
        n_zeroes = prec as usize - nibbles as usize;
    }

    let show_point = prec > 0 || fmt.flags.contains(FmtFlags::SHOW_POINT);
    let prec = prec as usize;
    let e_abs = u64::from(exp2.unsigned_abs());
    let body_len = 1 + usize::from(show_point) + prec + 2 + dec_len(e_abs) as usize;
    emit_adjusted(out, fmt, &prefix, body_len, true, |s| {
        s.put(digs[lead as usize]);
        if show_point {
            s.put(b'.');
        }
        let n_frac = prec - n_zeroes;
        for k in (0..n_frac).rev() {
            s.put(digs[((frac >> (4 * k as u32)) & 0xf) as usize]);
        }
        s.fill(n_zeroes, b'0');
        s.put(if upper { b'P' } else { b'p' });
        s.put(if exp2 < 0 { b'-' } else { b'+' });
        let mut ebuf = [0u8; 12];
        let ep = gen_digits(&mut ebuf, 12, e_abs);
        s.append(&ebuf[ep..12]);
    });
}
