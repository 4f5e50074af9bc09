//! Grouping and aggregation over a loaded [`Table`].
//!
//! Groups are the distinct non-null values of the grouping column; rows with a
//! null group value are left out of every result.

use engage_core::error::Result;
use engage_core::models::{
    CellValue, GroupAccumulator, GroupOrder, GroupResult, HistogramBin, Table,
};

/// Running tally for a ratio group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct RateTally {
    hits: u64,
    total: u64,
}

/// Stateless helper that groups table rows and aggregates each group.
pub struct Aggregator;

impl Aggregator {
    /// Per group of `group`, the number of rows whose `measure` is non-null.
    ///
    /// A group whose measure values are all null is kept with a count of 0.
    pub fn count_by(
        table: &Table,
        group: &str,
        measure: &str,
        order: GroupOrder,
    ) -> Result<GroupResult<u64>> {
        let g = table.column_index(group)?;
        let m = table.column_index(measure)?;

        let mut acc: GroupAccumulator<u64> = GroupAccumulator::new();
        for row in table.rows() {
            let key = &row.values()[g];
            if key.is_null() {
                continue;
            }
            let count = acc.entry(key);
            if !row.values()[m].is_null() {
                *count += 1;
            }
        }

        Ok(acc.finish(group).ordered(order))
    }

    /// Per group of `group`, the number of rows.
    pub fn size_by(table: &Table, group: &str, order: GroupOrder) -> Result<GroupResult<u64>> {
        let g = table.column_index(group)?;

        let mut acc: GroupAccumulator<u64> = GroupAccumulator::new();
        for key in table.rows().iter().map(|r| &r.values()[g]) {
            if !key.is_null() {
                *acc.entry(key) += 1;
            }
        }

        Ok(acc.finish(group).ordered(order))
    }

    /// Occurrences of each non-null value of `column`, most frequent first.
    pub fn value_counts(table: &Table, column: &str) -> Result<GroupResult<u64>> {
        Self::size_by(table, column, GroupOrder::ValueDescending)
    }

    /// Per group of `group`, the fraction of rows whose `predicate` equals
    /// `match_value`. Every ratio lies in `[0, 1]`.
    pub fn ratio_by(
        table: &Table,
        group: &str,
        predicate: &str,
        match_value: &CellValue,
        order: GroupOrder,
    ) -> Result<GroupResult<f64>> {
        let g = table.column_index(group)?;
        let p = table.column_index(predicate)?;

        let mut acc: GroupAccumulator<RateTally> = GroupAccumulator::new();
        for row in table.rows() {
            let key = &row.values()[g];
            if key.is_null() {
                continue;
            }
            let tally = acc.entry(key);
            tally.total += 1;
            if row.values()[p].matches(match_value) {
                tally.hits += 1;
            }
        }

        Ok(acc
            .finish(group)
            .map_values(|t| rate(t.hits, t.total))
            .ordered(order))
    }

    /// Bin `values` into `bins` equal-width bins spanning their range.
    ///
    /// The last bin is closed on both ends. When every value is equal the
    /// range is widened by 0.5 on each side. Non-finite values are ignored;
    /// `bins == 0` is treated as 1.
    pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let Some((mut min, mut max)) = finite.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        }) else {
            return Vec::new();
        };

        if min == max {
            min -= 0.5;
            max += 0.5;
        }

        let bins = bins.max(1);
        let width = (max - min) / bins as f64;
        let mut result: Vec<HistogramBin> = (0..bins)
            .map(|i| HistogramBin {
                lower: min + width * i as f64,
                upper: if i + 1 == bins {
                    max
                } else {
                    min + width * (i + 1) as f64
                },
                count: 0,
            })
            .collect();

        for v in finite {
            let idx = (((v - min) / width).floor() as usize).min(bins - 1);
            result[idx].count += 1;
        }

        result
    }
}

/// `hits / total`, or NaN when there is nothing to divide by.
pub fn rate(hits: u64, total: u64) -> f64 {
    if total == 0 {
        f64::NAN
    } else {
        hits as f64 / total as f64
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
