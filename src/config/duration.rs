// src/config/duration.rs

use std::time::Duration;

/// Parse a duration string such as `"100ms"`, `"1.5s"`, or `"1m30s"`.
///
/// A bare number is taken as seconds; `"0"` means "no limit" where the
/// caller allows it. Each component may carry a decimal fraction.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    if s.chars().all(|c| c.is_ascii_digit() || c == '.') {
        let nanos = scaled_nanos(s, NANOS_PER_SEC)?;
        return Ok(duration_from_nanos(nanos));
    }

    let mut total: u128 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let idx = rest
            .chars()
            .position(|c| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| format!("duration '{}' is missing a unit suffix", s))?;
        if idx == 0 {
            return Err(format!("invalid duration '{}': expected a number", s));
        }
        let (num_part, tail) = rest.split_at(idx);

        let unit_len = tail
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() || *c == '.')
            .map(|(i, _)| i)
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);

        let unit_nanos: u128 = match unit.to_lowercase().as_str() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 60 * 60 * NANOS_PER_SEC,
            other => {
                return Err(format!(
                    "unsupported duration unit '{}'; expected ns, us, ms, s, m, or h",
                    other
                ));
            }
        };
        total = total.saturating_add(scaled_nanos(num_part, unit_nanos)?);
        rest = next;
    }

    Ok(duration_from_nanos(total))
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Fractional digits beyond this are ignored.
const MAX_FRACTION_DIGITS: usize = 12;

/// `number * unit_nanos`, where `number` is `123`, `1.5` or `.25`.
fn scaled_nanos(number: &str, unit_nanos: u128) -> Result<u128, String> {
    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (number, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(format!("invalid duration number '{}'", number));
    }
    if fraction.contains('.') {
        return Err(format!("invalid duration number '{}'", number));
    }

    let whole_value: u128 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|e| format!("invalid duration number '{}': {}", number, e))?
    };

    let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
    let fraction_nanos = if fraction.is_empty() {
        0
    } else {
        let digits: u128 = fraction
            .parse()
            .map_err(|e| format!("invalid duration number '{}': {}", number, e))?;
        let scale = 10u128.pow(fraction.len() as u32);
        digits.saturating_mul(unit_nanos) / scale
    };

    Ok(whole_value
        .saturating_mul(unit_nanos)
        .saturating_add(fraction_nanos))
}

fn duration_from_nanos(nanos: u128) -> Duration {
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_units() {
        assert_eq!(parse_duration("100ms"), Ok(Duration::from_millis(100)));
        assert_eq!(parse_duration("2s"), Ok(Duration::from_secs(2)));
        assert_eq!(parse_duration("3m"), Ok(Duration::from_secs(180)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("250us"), Ok(Duration::from_micros(250)));
        assert_eq!(parse_duration("7ns"), Ok(Duration::from_nanos(7)));
    }

    #[test]
    fn bare_number_is_seconds() {
        assert_eq!(parse_duration("5"), Ok(Duration::from_secs(5)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
    }

    #[test]
    fn parses_compound_durations() {
        assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse_duration("1s500ms"), Ok(Duration::from_millis(1500)));
    }

    #[test]
    fn parses_fractional_durations() {
        assert_eq!(parse_duration("1.5s"), Ok(Duration::from_millis(1500)));
        assert_eq!(parse_duration(".25s"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("1.5h"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("2.5"), Ok(Duration::from_millis(2500)));
        assert_eq!(parse_duration("1m0.5s"), Ok(Duration::from_millis(60_500)));
        assert_eq!(parse_duration("0.1ms"), Ok(Duration::from_micros(100)));
    }

    #[test]
    fn rejects_malformed_fractions() {
        assert!(parse_duration(".s").is_err());
        assert!(parse_duration("1.2.3s").is_err());
        assert!(parse_duration("..").is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("ms").is_err());
        assert!(parse_duration("10 parsecs").is_err());
        assert!(parse_duration("1s5").is_err());
        assert!(parse_duration("-1s").is_err());
    }
}
