//! Human-readable durations for the `elapsed` field.
//!
//! Rendering and parsing follow the `1h2m3.5s` / `500ms` / `1.5µs` notation,
//! so traces stay readable and compatible with recordings made by other
//! tooling that uses the same notation.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;
const NANOS_PER_MIN: u128 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MIN;

static COMPONENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<int>[0-9]*)(?:\.(?P<frac>[0-9]*))?(?P<unit>ns|us|µs|μs|ms|s|m|h)")
        .expect("duration component pattern is valid")
});

/// Formats `d` like `1h2m3.5s`, `1.203s`, `500ms`, `1.5µs` or `0s`.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < NANOS_PER_MICRO {
        return format!("{}ns", nanos);
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{}µs", with_fraction(nanos, NANOS_PER_MICRO, 3));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", with_fraction(nanos, NANOS_PER_MILLI, 6));
    }

    let hours = nanos / NANOS_PER_HOUR;
    let minutes = (nanos % NANOS_PER_HOUR) / NANOS_PER_MIN;
    let seconds = with_fraction(nanos % NANOS_PER_MIN, NANOS_PER_SEC, 9);
    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

fn with_fraction(value: u128, unit: u128, digits: usize) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = digits);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Parses a duration written in the notation produced by [`format_duration`].
///
/// A bare `0` and a leading `+` are accepted; negative values are rejected
/// because an elapsed time can never be negative.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let mut rest = input.trim();
    if rest.is_empty() {
        return Err("empty duration".to_string());
    }
    if rest.starts_with('-') {
        return Err(format!("negative duration '{}'", input));
    }
    rest = rest.strip_prefix('+').unwrap_or(rest);
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(format!("invalid duration '{}'", input));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let caps = COMPONENT
            .captures(rest)
            .ok_or_else(|| format!("invalid duration '{}'", input))?;
        let int = caps.name("int").map_or("", |m| m.as_str());
        let frac = caps.name("frac").map_or("", |m| m.as_str());
        if int.is_empty() && frac.is_empty() {
            return Err(format!("invalid duration '{}'", input));
        }
        let unit = match caps.name("unit").map_or("", |m| m.as_str()) {
            "ns" => 1,
            "us" | "µs" | "μs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SEC,
            "m" => NANOS_PER_MIN,
            "h" => NANOS_PER_HOUR,
            other => return Err(format!("unknown unit '{}' in '{}'", other, input)),
        };

        let whole: u128 = if int.is_empty() {
            0
        } else {
            int.parse()
                .map_err(|_| format!("invalid duration '{}'", input))?
        };
        let mut component = whole
            .checked_mul(unit)
            .ok_or_else(|| format!("duration '{}' overflows", input))?;

        // Digits past nanosecond precision for the largest unit carry nothing.
        let frac = &frac[..frac.len().min(13)];
        if !frac.is_empty() {
            let scale = 10u128.pow(frac.len() as u32);
            let value: u128 = frac
                .parse()
                .map_err(|_| format!("invalid duration '{}'", input))?;
            component += value * unit / scale;
        }

        total = total
            .checked_add(component)
            .ok_or_else(|| format!("duration '{}' overflows", input))?;
        rest = &rest[caps.get(0).map_or(0, |m| m.end())..];
    }

    let total = u64::try_from(total).map_err(|_| format!("duration '{}' overflows", input))?;
    Ok(Duration::from_nanos(total))
}
