//! Single-chain reconciliation.

use dweather_common::TimeSeries;

/// Merge partial series given oldest first; later partials overwrite earlier ones.
pub fn merge_forward<I>(partials: I) -> TimeSeries
where
    I: IntoIterator<Item = TimeSeries>,
{
    let mut merged = TimeSeries::new();
    for partial in partials {
        for (at, obs) in partial {
            merged.insert(at, obs);
        }
    }
    merged
}

/// Merge partial series given newest first; the first writer of a timestamp wins,
/// so a newer republication is never overwritten by an older one.
pub fn merge_precedence_reverse<I>(partials: I) -> TimeSeries
where
    I: IntoIterator<Item = TimeSeries>,
{
    let mut merged = TimeSeries::new();
    for partial in partials {
        for (at, obs) in partial {
            merged.insert_if_absent(at, obs);
        }
    }
    merged
}
