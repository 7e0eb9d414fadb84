//! Expiration headers and epoch arithmetic
//!
//! Uploads may carry one of three expiration forms. Each resolves into a
//! duration until expiry, which is then converted into a network epoch using
//! a fresh [`NetworkInfo`] snapshot.

use crate::{CoreError, NetworkInfo, Result};
use chrono::{DateTime, TimeDelta, Utc};

/// Expiration header flavours, ordered by priority (lowest first)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExpirationForm {
    /// Absolute RFC3339 instant
    Rfc3339,
    /// Absolute Unix timestamp in seconds
    Timestamp,
    /// Relative duration such as `1h30m`
    Duration,
}

impl ExpirationForm {
    /// Recognize an expiration header by the part of its name that follows
    /// `X-Attribute-`. Both `Expiration-Duration` and
    /// `Neofs-Expiration-Duration` spellings are accepted, case-insensitively.
    pub fn from_header_suffix(suffix: &str) -> Option<Self> {
        let lower = suffix.to_ascii_lowercase();
        let name = lower.strip_prefix("neofs-").unwrap_or(&lower);
        match name {
            "expiration-rfc3339" => Some(Self::Rfc3339),
            "expiration-timestamp" => Some(Self::Timestamp),
            "expiration-duration" => Some(Self::Duration),
            _ => None,
        }
    }

    /// Canonical system attribute spelling, used in logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rfc3339 => "__NEOFS__EXPIRATION_RFC3339",
            Self::Timestamp => "__NEOFS__EXPIRATION_TIMESTAMP",
            Self::Duration => "__NEOFS__EXPIRATION_DURATION",
        }
    }

    /// Parse `value` and return the time left until expiry, measured from
    /// `now`. Fails unless the result is strictly positive.
    pub fn time_until(self, value: &str, now: DateTime<Utc>) -> Result<TimeDelta> {
        let invalid = |reason: String| CoreError::InvalidExpiration {
            header: self.as_str().to_string(),
            reason,
        };

        let until = match self {
            Self::Rfc3339 => {
                let at = DateTime::parse_from_rfc3339(value).map_err(|e| invalid(e.to_string()))?;
                at.with_timezone(&Utc) - now
            }
            Self::Timestamp => {
                let secs: i64 = value.parse().map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;
                let at = DateTime::from_timestamp(secs, 0)
                    .ok_or_else(|| invalid(format!("timestamp {secs} out of range")))?;
                at - now
            }
            Self::Duration => parse_duration(value).map_err(invalid)?,
        };

        if until <= TimeDelta::zero() {
            return Err(CoreError::ExpirationNotInFuture);
        }

        Ok(until)
    }
}

/// Tracks expiration headers seen during one upload and applies the priority
/// rule: duration > timestamp > RFC3339.
///
/// A header is evaluated only while no expiration epoch attribute has been
/// written directly, and only when its form ranks at least as high as the
/// form already recorded. An evaluated header replaces the recorded value.
#[derive(Debug, Default, Clone)]
pub struct ExpirationResolver {
    recorded: Option<(ExpirationForm, TimeDelta)>,
    epoch_written: bool,
}

impl ExpirationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note that the epoch attribute itself was supplied by the client
    pub fn mark_epoch_written(&mut self) {
        self.epoch_written = true;
    }

    pub fn epoch_written(&self) -> bool {
        self.epoch_written
    }

    /// Offer an expiration header. Returns `Ok(true)` when the header was
    /// evaluated and recorded, `Ok(false)` when the priority rule skipped it.
    pub fn offer(&mut self, form: ExpirationForm, value: &str, now: DateTime<Utc>) -> Result<bool> {
        if self.epoch_written {
            return Ok(false);
        }
        if matches!(self.recorded, Some((recorded, _)) if form < recorded) {
            return Ok(false);
        }

        let until = form.time_until(value, now)?;
        self.recorded = Some((form, until));
        Ok(true)
    }

    /// Form of the recorded header, if any
    pub fn form(&self) -> Option<ExpirationForm> {
        self.recorded.map(|(form, _)| form)
    }

    /// Duration still to be converted into an epoch attribute
    pub fn pending(&self) -> Option<TimeDelta> {
        if self.epoch_written {
            return None;
        }
        self.recorded.map(|(_, until)| until)
    }
}

/// Convert a duration until expiry into an absolute epoch:
/// `current_epoch + duration_ms * epoch_duration / ms_per_block`, rounded
/// down. A missing epoch duration parameter yields the current epoch.
pub fn expiration_epoch(info: &NetworkInfo, until: TimeDelta) -> Result<u64> {
    if info.ms_per_block <= 0 {
        return Err(CoreError::InvalidNetworkInfo(format!(
            "non-positive ms per block: {}",
            info.ms_per_block
        )));
    }

    let ms = u128::try_from(until.num_milliseconds()).map_err(|_| CoreError::ExpirationNotInFuture)?;
    let epochs = ms * u128::from(info.epoch_duration()) / info.ms_per_block as u128;
    let epochs = u64::try_from(epochs).unwrap_or(u64::MAX);

    Ok(info.current_epoch.saturating_add(epochs))
}

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Parse a duration string such as `300ms`, `1.5h` or `2h45m`.
///
/// Accepted units: `ns`, `us` (`µs`), `ms`, `s`, `m`, `h`. A leading sign is
/// allowed; a bare `0` needs no unit.
pub fn parse_duration(s: &str) -> std::result::Result<TimeDelta, String> {
    let invalid = || format!("invalid duration {s:?}");

    let (negative, mut rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    if rest == "0" {
        return Ok(TimeDelta::zero());
    }
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let int_part = &rest[..int_len];
        rest = &rest[int_len..];

        let mut frac_part = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
            frac_part = &after_dot[..frac_len];
            rest = &after_dot[frac_len..];
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }

        let unit_len = rest
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let unit_nanos = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SECOND,
            "m" => 60 * NANOS_PER_SECOND,
            "h" => 3600 * NANOS_PER_SECOND,
            "" => return Err(format!("missing unit in duration {s:?}")),
            other => return Err(format!("unknown unit {other:?} in duration {s:?}")),
        };

        let int_value: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        let mut value = int_value.checked_mul(unit_nanos).ok_or_else(invalid)?;

        if !frac_part.is_empty() {
            let digits = &frac_part[..frac_part.len().min(18)];
            let frac: u128 = digits.parse().map_err(|_| invalid())?;
            value += frac * unit_nanos / 10u128.pow(digits.len() as u32);
        }

        total = total.checked_add(value).ok_or_else(invalid)?;
    }

    let nanos = i64::try_from(total).map_err(|_| invalid())?;
    Ok(TimeDelta::nanoseconds(if negative { -nanos } else { nanos }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NetworkParameter;
    use crate::netinfo::EPOCH_DURATION_PARAMETER;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn net_info(current_epoch: u64, ms_per_block: i64, epoch_duration: Option<u64>) -> NetworkInfo {
        NetworkInfo {
            current_epoch,
            ms_per_block,
            parameters: epoch_duration
                .map(|d| vec![NetworkParameter::from_u64(EPOCH_DURATION_PARAMETER, d)])
                .unwrap_or_default(),
        }
    }

    #[rstest]
    #[case("1h", 3_600_000)]
    #[case("30m", 1_800_000)]
    #[case("1h30m", 5_400_000)]
    #[case("1.5h", 5_400_000)]
    #[case("300ms", 300)]
    #[case("2s500ms", 2_500)]
    #[case(".5s", 500)]
    #[case("0", 0)]
    #[case("-1m", -60_000)]
    fn test_parse_duration(#[case] input: &str, #[case] expected_ms: i64) {
        assert_eq!(parse_duration(input).unwrap().num_milliseconds(), expected_ms);
    }

    #[rstest]
    #[case("")]
    #[case("1")]
    #[case("h")]
    #[case("1d")]
    #[case("1h-")]
    #[case(".h")]
    fn test_parse_duration_rejects(#[case] input: &str) {
        assert!(parse_duration(input).is_err());
    }

    #[test]
    fn test_form_recognition() {
        assert_eq!(
            ExpirationForm::from_header_suffix("expiration-duration"),
            Some(ExpirationForm::Duration)
        );
        assert_eq!(
            ExpirationForm::from_header_suffix("Neofs-Expiration-Timestamp"),
            Some(ExpirationForm::Timestamp)
        );
        assert_eq!(
            ExpirationForm::from_header_suffix("NEOFS-EXPIRATION-RFC3339"),
            Some(ExpirationForm::Rfc3339)
        );
        assert_eq!(ExpirationForm::from_header_suffix("Neofs-Expiration-Epoch"), None);
    }

    #[test]
    fn test_time_until_each_form() {
        let hour = TimeDelta::hours(1);
        assert_eq!(
            ExpirationForm::Duration.time_until("1h", now()).unwrap(),
            hour
        );
        assert_eq!(
            ExpirationForm::Timestamp
                .time_until(&(now().timestamp() + 3600).to_string(), now())
                .unwrap(),
            hour
        );
        assert_eq!(
            ExpirationForm::Rfc3339
                .time_until(&(now() + hour).to_rfc3339(), now())
                .unwrap(),
            hour
        );
    }

    #[test]
    fn test_time_until_must_be_future() {
        assert_eq!(
            ExpirationForm::Duration.time_until("-5m", now()),
            Err(CoreError::ExpirationNotInFuture)
        );
        assert_eq!(
            ExpirationForm::Timestamp.time_until(&now().timestamp().to_string(), now()),
            Err(CoreError::ExpirationNotInFuture)
        );
        assert!(matches!(
            ExpirationForm::Rfc3339.time_until("yesterday", now()),
            Err(CoreError::InvalidExpiration { .. })
        ));
    }

    #[test]
    fn test_priority_duration_wins_in_any_order() {
        let rfc = (now() + TimeDelta::hours(3)).to_rfc3339();
        let ts = (now().timestamp() + 7200).to_string();
        let headers = [
            (ExpirationForm::Rfc3339, rfc.as_str()),
            (ExpirationForm::Duration, "1h"),
            (ExpirationForm::Timestamp, ts.as_str()),
        ];

        // every rotation of the header order
        for shift in 0..headers.len() {
            let mut resolver = ExpirationResolver::new();
            for i in 0..headers.len() {
                let (form, value) = headers[(i + shift) % headers.len()];
                resolver.offer(form, value, now()).unwrap();
            }
            assert_eq!(resolver.form(), Some(ExpirationForm::Duration));
            assert_eq!(resolver.pending(), Some(TimeDelta::hours(1)));
        }
    }

    #[test]
    fn test_lower_priority_is_not_evaluated() {
        let mut resolver = ExpirationResolver::new();
        assert!(resolver.offer(ExpirationForm::Duration, "1h", now()).unwrap());
        // garbage in a lower-priority header is never parsed
        assert!(!resolver.offer(ExpirationForm::Timestamp, "garbage", now()).unwrap());
        assert_eq!(resolver.pending(), Some(TimeDelta::hours(1)));
    }

    #[test]
    fn test_equal_priority_overwrites() {
        let mut resolver = ExpirationResolver::new();
        resolver.offer(ExpirationForm::Duration, "1h", now()).unwrap();
        resolver.offer(ExpirationForm::Duration, "2h", now()).unwrap();
        assert_eq!(resolver.pending(), Some(TimeDelta::hours(2)));
    }

    #[test]
    fn test_epoch_attribute_disables_resolution() {
        let mut resolver = ExpirationResolver::new();
        resolver.offer(ExpirationForm::Duration, "1h", now()).unwrap();
        resolver.mark_epoch_written();
        assert_eq!(resolver.pending(), None);
        // once the epoch is written even invalid headers are ignored
        assert!(!resolver.offer(ExpirationForm::Duration, "bogus", now()).unwrap());
    }

    #[test]
    fn test_expiration_epoch() {
        let info = net_info(100, 1000, Some(240));
        // 1h = 3_600_000 ms; 3_600_000 * 240 / 1000 = 864_000
        assert_eq!(expiration_epoch(&info, TimeDelta::hours(1)).unwrap(), 864_100);

        // rounding is towards zero
        let info = net_info(5, 3, Some(1));
        assert_eq!(expiration_epoch(&info, TimeDelta::milliseconds(10)).unwrap(), 8);
    }

    #[test]
    fn test_expiration_epoch_without_duration_parameter() {
        let info = net_info(42, 1000, None);
        assert_eq!(expiration_epoch(&info, TimeDelta::hours(10)).unwrap(), 42);
    }

    #[test]
    fn test_expiration_epoch_rejects_bad_network_info() {
        let info = net_info(1, 0, Some(240));
        assert!(matches!(
            expiration_epoch(&info, TimeDelta::hours(1)),
            Err(CoreError::InvalidNetworkInfo(_))
        ));
    }

    #[test]
    fn test_equivalent_forms_yield_same_epoch() {
        let info = net_info(7, 1000, Some(240));
        let hour = TimeDelta::hours(1);
        let by_duration = ExpirationForm::Duration.time_until("1h", now()).unwrap();
        let by_rfc = ExpirationForm::Rfc3339.time_until(&(now() + hour).to_rfc3339(), now()).unwrap();
        let by_ts = ExpirationForm::Timestamp
            .time_until(&(now() + hour).timestamp().to_string(), now())
            .unwrap();

        let expected = expiration_epoch(&info, by_duration).unwrap();
        assert_eq!(expiration_epoch(&info, by_rfc).unwrap(), expected);
        assert_eq!(expiration_epoch(&info, by_ts).unwrap(), expected);
    }
}
