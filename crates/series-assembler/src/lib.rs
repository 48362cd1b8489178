//! Series assembly for dweather datasets.
//!
//! Shards are parsed into partial [`TimeSeries`](dweather_common::TimeSeries), one per
//! snapshot, and reconciled into a single series:
//!
//! | Rule | Input order | Conflict resolution |
//! |------|-------------|---------------------|
//! | [`merge_forward`] | oldest first | later snapshot wins |
//! | [`merge_precedence_reverse`] | newest first | first writer wins |
//! | [`merge_revision_set`] | most accurate first | most accurate wins |
//!
//! [`aggregate`] sums assembled daily series over periods.

pub mod aggregate;
pub mod merge;
pub mod parse;
pub mod revision;

pub use aggregate::{
    covered_end, historical_totals, period_dates, sum_period, HistoricalOptions, PeriodTotal,
    HISTORICAL_START_YEAR,
};
pub use merge::{merge_forward, merge_precedence_reverse};
pub use parse::{parse_f32_shard, parse_text_shard, RowLayout, ShardLayout, F32_DECIMALS};
pub use revision::{
    is_revision_final, merge_revision_set, RevisionMerge, RevisionSet, SeriesSource,
};
