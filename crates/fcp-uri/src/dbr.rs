/// Default DBR increment: one day, in seconds (`0x15180`).
pub const DEFAULT_INCREMENT: u32 = 0x0001_5180;

/// Default DBR offset: midnight GMT.
pub const DEFAULT_OFFSET: u32 = 0;

/// Computes a date-based-redirect prefix.
///
/// `prefix = lowerMultiple((now - offset) / increment) * increment + offset +
/// future * increment`, rendered as lowercase hex with no leading `0x`.
///
/// `now` is the number of whole seconds since the Unix epoch. Passing it in
/// explicitly (rather than sampling the wall clock here) keeps this function
/// pure and testable; callers needing "now" use [`unix_now`].
pub fn dbr_at(future: i64, increment: u32, offset: u32, now: i64) -> String {
    let increment = increment as i64;
    let offset = offset as i64;
    let since_offset = now - offset;
    let last_hit = since_offset.div_euclid(increment) * increment + offset;
    let wanted = last_hit + future * increment;
    format!("{wanted:x}")
}

/// Computes a date-based-redirect prefix for the current wall-clock time.
pub fn dbr(future: i64, increment: u32, offset: u32) -> String {
    dbr_at(future, increment, offset, unix_now())
}

/// Current wall-clock time as whole seconds since the Unix epoch.
pub fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_future_does_not_exceed_now() {
        let now = 0x6000_0000i64;
        let d = dbr_at(0, DEFAULT_INCREMENT, DEFAULT_OFFSET, now);
        let d = i64::from_str_radix(&d, 16).unwrap();
        assert!(d <= now);
    }

    #[test]
    fn increment_step_matches_future_offset() {
        let now = 0x6000_0000i64;
        let d0 = i64::from_str_radix(&dbr_at(0, DEFAULT_INCREMENT, DEFAULT_OFFSET, now), 16).unwrap();
        let d1 = i64::from_str_radix(&dbr_at(1, DEFAULT_INCREMENT, DEFAULT_OFFSET, now), 16).unwrap();
        assert_eq!(d1 - d0, DEFAULT_INCREMENT as i64);
    }

    #[test]
    fn scenario_3_from_spec() {
        // increment=0x15180, offset=0, now=0x60000000
        let now = 0x6000_0000i64;
        let expected = (now / 0x15180) * 0x15180;
        let got = dbr_at(0, 0x15180, 0, now);
        assert_eq!(got, format!("{expected:x}"));
    }

    #[test]
    fn renders_lowercase_hex_only() {
        let d = dbr_at(3, DEFAULT_INCREMENT, DEFAULT_OFFSET, 123_456_789);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
