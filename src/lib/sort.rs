use std::cmp::Ordering;

use crate::lib::aggregate::EntityRow;
use crate::lib::spec::{ColumnSpec, MetricKind};

/// Ordering key of a row for the primary (family, metric) pair.
///
/// `None` means the value is unavailable and sorts below every real value.
pub fn sort_key(row: &EntityRow, spec: &ColumnSpec) -> Option<f64> {
    let metrics = row.metrics(spec.primary_family());
    match spec.primary_metric() {
        MetricKind::Percent => metrics.percent(spec.sort_ratio()),
        metric => metrics.get(metric).map(|v| v as f64),
    }
}

/// Sort rows by their primary key, largest first, or smallest first when
/// `reverse` is set. Equal keys keep their input order.
pub fn sort_rows(rows: &mut [EntityRow], spec: &ColumnSpec, reverse: bool) {
    // slice::sort_by is stable
    rows.sort_by(|a, b| {
        let ascending = compare_keys(sort_key(a, spec), sort_key(b, spec));
        if reverse {
            ascending
        } else {
            ascending.reverse()
        }
    });
}

fn compare_keys(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
