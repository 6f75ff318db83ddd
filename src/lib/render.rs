use chrono::{DateTime, Utc};

use crate::lib::aggregate::{EntityRow, MetricMap, totals};
use crate::lib::spec::{ColumnSpec, Family, MetricKind, Scope};
use crate::lib::units::{UNAVAILABLE, UnitMode, format_age, format_memory};

/// Minimum gap between two columns
const COLUMN_GAP: usize = 2;

/// Renders header, rows and the optional `TOTAL` line as aligned text
pub struct TableRenderer<'a> {
    spec: &'a ColumnSpec,
    scope: Scope,
    all_namespaces: bool,
    units: UnitMode,
    now: DateTime<Utc>,
}

impl<'a> TableRenderer<'a> {
    pub fn new(
        spec: &'a ColumnSpec,
        scope: Scope,
        all_namespaces: bool,
        units: UnitMode,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            spec,
            scope,
            all_namespaces,
            units,
            now,
        }
    }

    fn shows_namespace(&self) -> bool {
        self.all_namespaces && self.scope == Scope::Pods
    }

    fn identity_headers(&self) -> Vec<String> {
        let mut headers = Vec::new();
        if self.shows_namespace() {
            headers.push("NAMESPACE".to_string());
        }
        headers.push("NAME".to_string());
        headers.push("STATUS".to_string());
        if self.spec.show_node {
            headers.push("NODE".to_string());
        }
        headers
    }

    /// Column labels such as `NAME STATUS MEM_USE MEM_REQ MEM_USE_REQ AGE`
    pub fn headers(&self) -> Vec<String> {
        let mut headers = self.identity_headers();
        for family in self.spec.families() {
            for (index, metric) in self.spec.metrics.iter().enumerate() {
                let label = match metric {
                    MetricKind::Percent => self
                        .spec
                        .percent_ratio(index)
                        .map(|ratio| ratio.label())
                        .unwrap_or_else(|| metric.short_label().to_string()),
                    _ => metric.short_label().to_string(),
                };
                headers.push(format!("{}{}", family.prefix(), label));
            }
        }
        headers.push("AGE".to_string());
        headers
    }

    pub fn row_cells(&self, row: &EntityRow) -> Vec<String> {
        let mut cells = Vec::new();
        if self.shows_namespace() {
            cells.push(row.namespace().unwrap_or_default().to_string());
        }
        cells.push(row.name().to_string());
        cells.push(row.status.clone());
        if self.spec.show_node {
            cells.push(row.node().unwrap_or_default().to_string());
        }
        cells.extend(self.metric_cells(&row.mem, &row.cpu));
        cells.push(format_age(row.created, self.now));
        cells
    }

    /// `TOTAL` followed by placeholders for the remaining identity columns
    pub fn totals_cells(&self, mem: &MetricMap, cpu: &MetricMap) -> Vec<String> {
        let identity = self.identity_headers().len();
        let mut cells = vec!["TOTAL".to_string()];
        cells.extend((1..identity).map(|_| UNAVAILABLE.to_string()));
        cells.extend(self.metric_cells(mem, cpu));
        cells.push(UNAVAILABLE.to_string());
        cells
    }

    fn metric_cells(&self, mem: &MetricMap, cpu: &MetricMap) -> Vec<String> {
        let mut cells = Vec::new();
        for family in self.spec.families() {
            let map = match family {
                Family::Memory => mem,
                Family::Cpu => cpu,
            };
            for (index, metric) in self.spec.metrics.iter().enumerate() {
                cells.push(self.cell(family, map, *metric, index));
            }
        }
        cells
    }

    fn cell(&self, family: Family, map: &MetricMap, metric: MetricKind, index: usize) -> String {
        if metric == MetricKind::Percent {
            return match map.percent(self.spec.percent_ratio(index)) {
                Some(pct) => format!("{}%", pct.round() as i64),
                None => UNAVAILABLE.to_string(),
            };
        }

        match (map.get(metric), family) {
            (Some(bytes), Family::Memory) => format_memory(bytes, self.units),
            (Some(millis), Family::Cpu) => millis.to_string(),
            (None, _) => UNAVAILABLE.to_string(),
        }
    }

    /// Render the full table. Rows are printed in the order given.
    pub fn render(&self, rows: &[EntityRow]) -> String {
        let mut lines = Vec::with_capacity(rows.len() + 2);
        lines.push(self.headers());
        lines.extend(rows.iter().map(|row| self.row_cells(row)));

        if self.spec.total {
            let (mem, cpu) = totals(rows);
            lines.push(self.totals_cells(&mem, &cpu));
        }

        align(&lines)
    }
}

/// Pad every column but the last to its widest cell plus the column gap
pub fn align(lines: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = Vec::new();
    for line in lines {
        for (i, cell) in line.iter().enumerate().take(line.len().saturating_sub(1)) {
            let width = cell.chars().count();
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(width),
                None => widths.push(width),
            }
        }
    }

    let mut out = String::new();
    for line in lines {
        let last = line.len().saturating_sub(1);
        for (i, cell) in line.iter().enumerate() {
            if i == last {
                out.push_str(cell);
            } else {
                out.push_str(&format!("{:<width$}", cell, width = widths[i] + COLUMN_GAP));
            }
        }
        out.push('\n');
    }
    out
}
