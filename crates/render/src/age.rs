//! Compact age strings (`42s`, `17m`, `3.5h`, `12.0d`).

use std::time::Duration;

use chrono::{DateTime, Utc};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);
const DAY: Duration = Duration::from_secs(86_400);

/// Unit is chosen by comparing against the boundary first, then the value is rounded to the
/// unit's precision, so 60s is `1m` and 3599s is `60m`.
pub fn format_age(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if d < MINUTE {
        format!("{:.0}s", secs)
    } else if d < HOUR {
        format!("{:.0}m", secs / 60.0)
    } else if d < DAY {
        format!("{:.1}h", secs / 3600.0)
    } else {
        format!("{:.1}d", secs / 86_400.0)
    }
}

/// Elapsed time since `created`; clock skew into the future clamps to zero.
pub fn age_since(created: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - created).to_std().unwrap_or_default()
}
