//! The complex format mini-language.
//!
//! A format specification is scanned left to right exactly once by an
//! explicit state machine. The grammar, every field optional except that a
//! conversion letter ends the scan:
//!
//! ```text
//! [<|>|^] [+| |-] [width] [.real_prec] [.imag_prec] [U|D|Y|Z|N] [P|M] [conv]
//! ```
//!
//! where `conv` is one of `a A b e E f F g G` (default `f`), `P` renders
//! Python style `a+bj` (default), and `M` renders the parenthesized pair
//! `(a b)`. A width with no alignment implies `>`. Encountering a field out
//! of order, a third `.`, or an unrecognized character fails immediately;
//! characters after a valid conversion letter are not scanned.
//!
//! Rendering formats the two parts independently (Python style forces the
//! imaginary sign to always print), appends `.0` to a short all-digit
//! component so it reads as a float, joins the parts, and applies the outer
//! alignment/width template to the combined string.

use num_bigint::BigUint;
use num_traits::One;

use crate::{
    context::RoundMode,
    error::{Error, OpResult},
    fp::{self, Fp},
    types::Complex,
};

/// Output style for the combined string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    /// `a+bj`
    Python,
    /// `(a b)`
    Mpc,
}

/// Conversion letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Hex,
    HexUpper,
    Binary,
    Sci,
    SciUpper,
    Fixed,
    FixedUpper,
    General,
    GeneralUpper,
}

impl Conversion {
    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'a' => Some(Self::Hex),
            'A' => Some(Self::HexUpper),
            'b' => Some(Self::Binary),
            'e' => Some(Self::Sci),
            'E' => Some(Self::SciUpper),
            'f' => Some(Self::Fixed),
            'F' => Some(Self::FixedUpper),
            'g' => Some(Self::General),
            'G' => Some(Self::GeneralUpper),
            _ => None,
        }
    }

    fn uppercase(self) -> bool {
        matches!(self, Self::HexUpper | Self::SciUpper | Self::FixedUpper | Self::GeneralUpper)
    }
}

/// Scanner position; fields must appear in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Section {
    Align,
    Sign,
    Width,
    RealPrec,
    ImagPrec,
    Round,
    Style,
    Done,
}

/// A fully parsed complex format specification: the outer template plus an
/// independent numeric format for each component.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ComplexFormat {
    align: Option<char>,
    width: usize,
    sign: char,
    real_prec: Option<usize>,
    imag_prec: Option<usize>,
    round: RoundMode,
    style: Style,
    conversion: Conversion,
}

fn invalid_spec() -> Error {
    Error::value_error("Invalid conversion specification")
}

/// Parses a format specification string.
fn parse_spec(spec: &str) -> OpResult<ComplexFormat> {
    let mut out = ComplexFormat {
        align: None,
        width: 0,
        sign: '-',
        real_prec: None,
        imag_prec: None,
        round: RoundMode::Nearest,
        style: Style::Python,
        conversion: Conversion::Fixed,
    };
    let mut section = Section::Align;

    for ch in spec.chars() {
        match ch {
            '<' | '>' | '^' => {
                if section > Section::Align {
                    return Err(invalid_spec());
                }
                out.align = Some(ch);
                section = Section::Sign;
            }
            '+' | ' ' | '-' => {
                if section > Section::Sign {
                    return Err(invalid_spec());
                }
                out.sign = ch;
                section = Section::Width;
            }
            '.' => {
                if section <= Section::Width {
                    out.real_prec = Some(0);
                    section = Section::RealPrec;
                } else if section == Section::RealPrec {
                    out.imag_prec = Some(0);
                    section = Section::ImagPrec;
                } else {
                    return Err(invalid_spec());
                }
            }
            '0'..='9' => {
                let digit = ch as usize - '0' as usize;
                if section <= Section::Width {
                    out.width = out.width * 10 + digit;
                    section = Section::Width;
                } else if section == Section::RealPrec {
                    out.real_prec = Some(out.real_prec.unwrap_or(0) * 10 + digit);
                } else if section == Section::ImagPrec {
                    out.imag_prec = Some(out.imag_prec.unwrap_or(0) * 10 + digit);
                } else {
                    return Err(invalid_spec());
                }
            }
            'U' | 'D' | 'Y' | 'Z' | 'N' => {
                if section > Section::Round {
                    return Err(invalid_spec());
                }
                out.round = RoundMode::from_letter(ch).unwrap_or(RoundMode::Nearest);
                section = Section::Style;
            }
            'P' | 'M' => {
                if section > Section::Style {
                    return Err(invalid_spec());
                }
                out.style = if ch == 'M' { Style::Mpc } else { Style::Python };
                section = Section::Done;
            }
            _ => match Conversion::from_letter(ch) {
                Some(conv) => {
                    out.conversion = conv;
                    break;
                }
                None => return Err(invalid_spec()),
            },
        }
    }

    // A single precision group applies to both components.
    if out.imag_prec.is_none() {
        out.imag_prec = out.real_prec;
    }
    Ok(out)
}

/// Formats a complex value per the mini-language; see the module docs.
pub(crate) fn format_complex(value: &Complex, spec: &str) -> OpResult<String> {
    let f = parse_spec(spec)?;

    let real = render_part(value.real().fp(), value.real().prec(), f.real_prec, f.sign, f.round, f.conversion);
    // Python style always shows the sign between the parts.
    let imag_sign = match f.style {
        Style::Python => '+',
        Style::Mpc => f.sign,
    };
    let imag = render_part(value.imag().fp(), value.imag().prec(), f.imag_prec, imag_sign, f.round, f.conversion);

    let mut combined = String::with_capacity(real.len() + imag.len() + 6);
    if f.style == Style::Mpc {
        combined.push('(');
    }
    combined.push_str(&real);
    if needs_float_marker(&real) {
        combined.push_str(".0");
    }
    if f.style == Style::Mpc {
        combined.push(' ');
    }
    combined.push_str(&imag);
    if needs_float_marker(&imag) {
        combined.push_str(".0");
    }
    combined.push(if f.style == Style::Mpc { ')' } else { 'j' });

    Ok(apply_outer(combined, f.align, f.width))
}

/// A short component with no decimal point reads as an integer; `.0` marks it
/// as a float rendering.
fn needs_float_marker(s: &str) -> bool {
    s.len() < 50 && s.chars().all(|c| matches!(c, '+' | '-' | ' ' | '0'..='9'))
}

/// Applies the outer alignment/width template (space fill). A width with no
/// alignment right-aligns.
fn apply_outer(s: String, align: Option<char>, width: usize) -> String {
    let len = s.chars().count();
    if width <= len {
        return s;
    }
    let pad = width - len;
    match align.unwrap_or('>') {
        '<' => format!("{s}{}", " ".repeat(pad)),
        '^' => {
            let left = pad / 2;
            format!("{}{s}{}", " ".repeat(left), " ".repeat(pad - left))
        }
        _ => format!("{}{s}", " ".repeat(pad)),
    }
}

/// Renders one component: sign prefix plus conversion-specific body.
fn render_part(value: &Fp, value_prec: u32, prec: Option<usize>, sign: char, rnd: RoundMode, conv: Conversion) -> String {
    let body = match value {
        Fp::Nan => "nan".to_string(),
        Fp::Inf { .. } => "inf".to_string(),
        finite => match conv {
            Conversion::Fixed | Conversion::FixedUpper => render_fixed(finite, prec, rnd),
            Conversion::Sci | Conversion::SciUpper => render_sci(finite, value_prec, prec, rnd),
            Conversion::General | Conversion::GeneralUpper => render_general(finite, value_prec, prec, rnd),
            Conversion::Hex | Conversion::HexUpper => render_pow2(finite, prec, rnd, true),
            Conversion::Binary => render_pow2(finite, prec, rnd, false),
        },
    };
    let prefix = if value.is_neg() && !value.is_nan() {
        "-"
    } else {
        match sign {
            '+' => "+",
            ' ' => " ",
            _ => "",
        }
    };
    let rendered = format!("{prefix}{body}");
    if conv.uppercase() { rendered.to_uppercase() } else { rendered }
}

/// Fixed-point body. Without an explicit precision the expansion is exact
/// (a binary fraction terminates in decimal); precision 0 drops the point.
fn render_fixed(value: &Fp, prec: Option<usize>, rnd: RoundMode) -> String {
    let frac = prec.map_or_else(|| value.exact_frac_digits(), |p| p as i64);
    let digits = value.scaled_decimal(frac, rnd).unwrap_or_default();
    if frac <= 0 {
        return digits;
    }
    let frac = frac as usize;
    let padded = if digits.len() <= frac {
        format!("{}{digits}", "0".repeat(frac + 1 - digits.len()))
    } else {
        digits
    };
    let split = padded.len() - frac;
    format!("{}.{}", &padded[..split], &padded[split..])
}

/// Scientific body `d.ddde±XX`; precision counts digits after the point.
fn render_sci(value: &Fp, value_prec: u32, prec: Option<usize>, rnd: RoundMode) -> String {
    if value.is_zero() {
        let frac = prec.unwrap_or_else(|| fp::default_digits(value_prec, 10) - 1);
        return if frac == 0 {
            "0e+00".to_string()
        } else {
            format!("0.{}e+00", "0".repeat(frac))
        };
    }
    let sig = prec.map_or_else(|| fp::default_digits(value_prec, 10), |p| p + 1);
    let Some((digits, point)) = value.to_digits(10, sig, rnd) else {
        return String::new();
    };
    let exp = point - 1;
    if digits.len() == 1 {
        format!("{digits}e{exp:+03}")
    } else {
        let (first, rest) = digits.split_at(1);
        format!("{first}.{rest}e{exp:+03}")
    }
}

/// General body: fixed or scientific by magnitude, trailing zeros stripped.
fn render_general(value: &Fp, value_prec: u32, prec: Option<usize>, rnd: RoundMode) -> String {
    if value.is_zero() {
        return "0".to_string();
    }
    let sig = prec.unwrap_or_else(|| fp::default_digits(value_prec, 10)).max(1);
    let Some((digits, point)) = value.to_digits(10, sig, rnd) else {
        return String::new();
    };
    let exp = point - 1;
    if exp >= -4 && exp < sig as i64 {
        let body = if point <= 0 {
            format!("0.{}{digits}", "0".repeat((-point) as usize))
        } else if (point as usize) >= digits.len() {
            format!("{digits}{}", "0".repeat(point as usize - digits.len()))
        } else {
            let (int_part, frac_part) = digits.split_at(point as usize);
            format!("{int_part}.{frac_part}")
        };
        strip_trailing_fraction(body)
    } else {
        let mantissa = {
            let trimmed = digits.trim_end_matches('0');
            if trimmed.is_empty() { "0" } else { trimmed }
        };
        if mantissa.len() == 1 {
            format!("{mantissa}e{exp:+03}")
        } else {
            let (first, rest) = mantissa.split_at(1);
            format!("{first}.{rest}e{exp:+03}")
        }
    }
}

/// Removes trailing fractional zeros and an orphaned decimal point.
fn strip_trailing_fraction(body: String) -> String {
    if !body.contains('.') {
        return body;
    }
    let stripped = body.trim_end_matches('0').trim_end_matches('.');
    stripped.to_string()
}

/// Hex (`0x1.8p+1`) or binary (`1.1p+1`) body; precision counts digits after
/// the point, rounded in binary at the digit boundary.
fn render_pow2(value: &Fp, prec: Option<usize>, rnd: RoundMode, hex: bool) -> String {
    let prefix = if hex { "0x" } else { "" };
    if value.is_zero() {
        return format!("{prefix}0p+0");
    }
    let digit_bits = if hex { 4u64 } else { 1 };

    let rounded;
    let value = if let Some(p) = prec {
        let bits = 1 + digit_bits * p as u64;
        rounded = value.round(bits.min(u64::from(u32::MAX)) as u32, rnd).0;
        &rounded
    } else {
        value
    };

    let Some((_, exp, mant)) = value.parts() else {
        return format!("{prefix}0p+0");
    };
    let width = mant.bits() - 1;
    let pow_exp = exp + mant.bits() as i64 - 1;
    let ndigits = prec.map_or_else(|| (width + digit_bits - 1) / digit_bits, |p| p as u64);

    if ndigits == 0 {
        return format!("{prefix}1p{pow_exp:+}");
    }
    // Clear the leading bit and left-align the fraction on a digit boundary.
    let frac = (mant - (BigUint::one() << width as usize)) << (ndigits * digit_bits - width) as usize;
    let mut digits = if hex {
        format!("{frac:x}")
    } else {
        let bits: String = (0..ndigits).rev().map(|i| if frac.bit(i) { '1' } else { '0' }).collect();
        bits
    };
    let want = ndigits as usize;
    if digits.len() < want {
        digits = format!("{}{digits}", "0".repeat(want - digits.len()));
    }
    format!("{prefix}1.{digits}p{pow_exp:+}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::Context, types::Complex};

    fn z(re: &str, im: &str) -> Complex {
        let ctx = Context::new();
        Complex::from_parts(re, im, &ctx).unwrap()
    }

    #[test]
    fn test_default_spec() {
        assert_eq!(z("1.5", "2.25").format("").unwrap(), "1.5+2.25j");
        assert_eq!(z("1", "2").format("").unwrap(), "1.0+2.0j");
        assert_eq!(z("1.5", "-2.25").format("").unwrap(), "1.5-2.25j");
    }

    #[test]
    fn test_width_precision_scenario() {
        // real to 3 fractional digits, imag to 2, explicit sign, width 10.
        let s = z("1.5", "-2.25").format("+10.3.2f").unwrap();
        assert_eq!(s, "+1.500-2.25j");

        let s = z("1.5", "-2.25").format("+14.3.2f").unwrap();
        assert_eq!(s, "  +1.500-2.25j");
    }

    #[test]
    fn test_single_precision_group_applies_to_both() {
        assert_eq!(z("1.5", "2.25").format(".3f").unwrap(), "1.500+2.250j");
    }

    #[test]
    fn test_mpc_style() {
        assert_eq!(z("1.5", "-2.25").format(".3Mf").unwrap(), "(1.500 -2.250)");
        assert_eq!(z("1", "2").format("Mf").unwrap(), "(1.0 2.0)");
        // MPC style keeps the plain sign mode on the imaginary part.
        assert_eq!(z("1", "2").format("M").unwrap(), "(1.0 2.0)");
    }

    #[test]
    fn test_forced_imag_sign_for_specials() {
        assert_eq!(z("0", "nan").format("f").unwrap(), "0.0+nanj");
        assert_eq!(z("0", "inf").format("f").unwrap(), "0.0+infj");
        assert_eq!(z("0", "-inf").format("f").unwrap(), "0.0-infj");
        assert_eq!(z("0", "nan").format("Mf").unwrap(), "(0.0 nan)");
    }

    #[test]
    fn test_alignment() {
        assert_eq!(z("1", "1").format("<12f").unwrap(), "1.0+1.0j    ");
        assert_eq!(z("1", "1").format(">12f").unwrap(), "    1.0+1.0j");
        assert_eq!(z("1", "1").format("^12f").unwrap(), "  1.0+1.0j  ");
        // A width with no alignment right-aligns.
        assert_eq!(z("1", "1").format("12f").unwrap(), "    1.0+1.0j");
    }

    #[test]
    fn test_rounding_letters() {
        // Precision 0 drops the point, so the float marker kicks in.
        assert_eq!(z("0.15", "0").format(".0Uf").unwrap(), "1.0+0.0j");
        assert_eq!(z("0.15", "0").format(".0Df").unwrap(), "0.0+0.0j");
        assert_eq!(z("0.15", "0").format(".1Zf").unwrap(), "0.1+0.0j");
    }

    #[test]
    fn test_sci_and_general() {
        assert_eq!(z("12500", "0").format(".2e").unwrap(), "1.25e+04+0.00e+00j");
        assert_eq!(z("12500", "0").format(".2E").unwrap(), "1.25E+04+0.00E+00j");
        assert_eq!(z("0.0001", "0").format(".6g").unwrap(), "0.0001+0.0j");
        assert_eq!(z("1e20", "0").format(".6g").unwrap(), "1e+20+0.0j");
    }

    #[test]
    fn test_hex_and_binary() {
        assert_eq!(z("1.5", "0").format("a").unwrap(), "0x1.8p+0+0x0p+0j");
        // The 'j' marker is structural, not part of the component rendering.
        assert_eq!(z("1.5", "0").format("A").unwrap(), "0X1.8P+0+0X0P+0j");
        assert_eq!(z("5", "0").format("b").unwrap(), "1.01p+2+0p+0j");
    }

    #[test]
    fn test_invalid_specs() {
        for bad in ["q", "??", "+<f", "1.2.3.4f", "P5f", "5Pq", "fP"] {
            let result = z("1", "1").format(bad);
            if bad == "fP" {
                // 'f' ends the scan; the trailing 'P' is never seen.
                assert!(result.is_ok(), "{bad:?} should parse");
            } else {
                let err = result.unwrap_err();
                assert_eq!(err.kind(), crate::error::ExcKind::ValueError, "{bad:?}");
                assert_eq!(err.message(), "Invalid conversion specification");
            }
        }
    }

    #[test]
    fn test_exact_fixed_expansion() {
        // Without a precision the fixed expansion is exact.
        let s = z("0.1", "0").format("f").unwrap();
        assert_eq!(
            s,
            "0.1000000000000000055511151231257827021181583404541015625+0.0j"
        );
    }

    #[test]
    fn test_round_trip_fixed() {
        let ctx = Context::new();
        let v = z("1.5", "-2.25");
        let s = v.format(".10f").unwrap();
        let back = Complex::from_str_base(&s, 10, &ctx).unwrap();
        assert_eq!(&back, &v);
    }
}
