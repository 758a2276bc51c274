//! Exact conversion between decimal amounts and smallest-unit integers.
//!
//! All arithmetic is done on decimal digit strings so that amounts survive
//! the round trip without floating-point loss: parsing concatenates the
//! integer and zero-padded fractional digits into one `u128`, formatting
//! splits the digits back apart and trims trailing fractional zeros.

use thiserror::Error;

/// A decimal amount could not be represented in the target integer unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("not a decimal number: {0}")]
    Malformed(String),

    #[error("amount {0} has more fractional digits than the {1}-decimal precision")]
    PrecisionLoss(String, u32),

    #[error("amount {0} does not fit in the smallest unit")]
    Overflow(String),
}

/// Scale a decimal string to the smallest integer unit of a ledger with the
/// given decimal precision (`"0.5"` with 18 decimals -> `5 * 10^17`).
///
/// Fractional digits beyond the precision are rejected unless they are all
/// zero. Nothing is rounded.
pub fn parse_token_amount(amount: &str, decimals: u32) -> Result<u128, ConvertError> {
    let trimmed = amount.trim();
    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (trimmed, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(ConvertError::Malformed(amount.to_string()));
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(ConvertError::Malformed(amount.to_string()));
    }

    let precision = decimals as usize;
    let frac_part = if frac_part.len() > precision {
        let (kept, excess) = frac_part.split_at(precision);
        if excess.bytes().any(|b| b != b'0') {
            return Err(ConvertError::PrecisionLoss(amount.to_string(), decimals));
        }
        kept
    } else {
        frac_part
    };

    let mut digits = String::with_capacity(int_part.len() + precision);
    digits.push_str(int_part);
    digits.push_str(frac_part);
    for _ in frac_part.len()..precision {
        digits.push('0');
    }

    if digits.is_empty() {
        return Ok(0);
    }
    digits
        .parse::<u128>()
        .map_err(|_| ConvertError::Overflow(amount.to_string()))
}

/// Format a smallest-unit integer as an exact decimal string
/// (`420_000_000_000_000` with 18 decimals -> `"0.00042"`).
pub fn format_token_amount(amount: u128, decimals: u32) -> String {
    let digits = amount.to_string();
    let precision = decimals as usize;

    let (int_part, frac_part) = if digits.len() > precision {
        let split = digits.len() - precision;
        (digits[..split].to_string(), digits[split..].to_string())
    } else {
        (
            "0".to_string(),
            format!("{:0>width$}", digits, width = precision),
        )
    };

    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}
