use chrono::FixedOffset;

/// Parses a `+HH:MM` / `-HH:MM` offset string (as read from `TZ_OFFSET`), defaulting
/// to `+02:00` (South African Standard Time) on anything unparseable.
pub fn parse_offset(s: &str) -> FixedOffset {
    try_parse_offset(s).unwrap_or_else(|| FixedOffset::east_opt(2 * 3600).unwrap())
}

fn try_parse_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    let (sign, rest) = match s.chars().next()? {
        '+' => (1, &s[1..]),
        '-' => (-1, &s[1..]),
        _ => return None,
    };
    let rest = rest.replace(':', "");
    if rest.len() != 4 {
        return None;
    }
    let hours: i32 = rest[0..2].parse().ok()?;
    let minutes: i32 = rest[2..4].parse().ok()?;
    let seconds = sign * (hours * 3600 + minutes * 60);
    FixedOffset::east_opt(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plus_two() {
        assert_eq!(parse_offset("+02:00").local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn parses_negative_offset() {
        assert_eq!(parse_offset("-05:00").local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn falls_back_on_garbage() {
        assert_eq!(parse_offset("nonsense").local_minus_utc(), 2 * 3600);
    }
}
