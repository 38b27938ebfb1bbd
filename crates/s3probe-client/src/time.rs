//! Timestamp conversion between the SDK and `chrono`.

use aws_sdk_s3::primitives::DateTime as SdkDateTime;
use chrono::{DateTime, Utc};

/// Convert an SDK timestamp; missing or out-of-range values become the epoch.
pub(crate) fn to_utc(value: Option<&SdkDateTime>) -> DateTime<Utc> {
    value
        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
