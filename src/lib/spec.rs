use std::fmt;
use std::str::FromStr;

use crate::UsageError;

/// Entity kind a table is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Pods,
    Nodes,
    Namespaces,
}

impl Scope {
    pub fn as_str(&self) -> &str {
        match self {
            Scope::Pods => "pods",
            Scope::Nodes => "nodes",
            Scope::Namespaces => "namespaces",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Scope {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pod" | "pods" | "po" | "p" => Ok(Scope::Pods),
            "node" | "nodes" | "no" | "n" => Ok(Scope::Nodes),
            "ns" | "namespace" | "namespaces" => Ok(Scope::Namespaces),
            _ => Err(UsageError::UnknownScope(s.to_string())),
        }
    }
}

/// Resource family: memory in bytes, CPU in millicores
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Memory,
    Cpu,
}

impl Family {
    pub fn other(self) -> Family {
        match self {
            Family::Memory => Family::Cpu,
            Family::Cpu => Family::Memory,
        }
    }

    /// Header prefix, e.g. `MEM_` in `MEM_REQ`
    pub fn prefix(self) -> &'static str {
        match self {
            Family::Memory => "MEM_",
            Family::Cpu => "CPU_",
        }
    }
}

/// Secondary axis of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Request,
    Limit,
    Usage,
    /// Derived on demand, never stored
    Percent,
    /// Nodes only: limit minus usage
    Free,
    /// Nodes only: copy of limit
    Total,
}

impl MetricKind {
    pub fn from_letter(ch: char) -> Option<Self> {
        match ch {
            'r' => Some(MetricKind::Request),
            'l' => Some(MetricKind::Limit),
            'u' => Some(MetricKind::Usage),
            'p' => Some(MetricKind::Percent),
            'f' => Some(MetricKind::Free),
            't' => Some(MetricKind::Total),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            MetricKind::Request => 'r',
            MetricKind::Limit => 'l',
            MetricKind::Usage => 'u',
            MetricKind::Percent => 'p',
            MetricKind::Free => 'f',
            MetricKind::Total => 't',
        }
    }

    /// Short header label. Percent labels are derived per column instead.
    pub fn short_label(self) -> &'static str {
        match self {
            MetricKind::Request => "REQ",
            MetricKind::Limit => "LIM",
            MetricKind::Usage => "USE",
            MetricKind::Percent => "PCT",
            MetricKind::Free => "FREE",
            MetricKind::Total => "TOTAL",
        }
    }

    pub fn is_node_only(self) -> bool {
        matches!(self, MetricKind::Free | MetricKind::Total)
    }

    /// Whether a cell of this kind can feed a percent column
    pub fn is_ratio_operand(self) -> bool {
        !matches!(self, MetricKind::Percent) && !self.is_node_only()
    }
}

/// The two cells a percent column is computed from: `100 * numerator / denominator`.
///
/// The numerator is the cell that comes first in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ratio {
    pub numerator: MetricKind,
    pub denominator: MetricKind,
}

impl Ratio {
    /// Header suffix such as `USE_REQ`
    pub fn label(&self) -> String {
        format!(
            "{}_{}",
            self.numerator.short_label(),
            self.denominator.short_label()
        )
    }
}

/// Validated column specification parsed from the metric flag string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub mem: bool,
    pub cpu: bool,
    /// Display and sort priority order, duplicates preserved
    pub metrics: Vec<MetricKind>,
    pub show_node: bool,
    pub total: bool,
    primary_family: Family,
    primary_metric: MetricKind,
}

impl ColumnSpec {
    /// Parse a flag string such as `mcurp` for the given scope.
    ///
    /// The first family letter and the first metric letter seen become the
    /// primary sort key.
    pub fn parse(flags: &str, scope: Scope) -> Result<Self, UsageError> {
        let mut mem = false;
        let mut cpu = false;
        let mut show_node = false;
        let mut metrics = Vec::new();
        let mut primary_family = None;

        for ch in flags.chars() {
            match ch {
                'm' => {
                    mem = true;
                    primary_family.get_or_insert(Family::Memory);
                }
                'c' => {
                    cpu = true;
                    primary_family.get_or_insert(Family::Cpu);
                }
                'n' => {
                    if scope != Scope::Pods {
                        return Err(UsageError::InvalidFlag {
                            flag: ch,
                            allowed: "pods",
                        });
                    }
                    show_node = true;
                }
                _ => {
                    let metric = MetricKind::from_letter(ch).ok_or(UsageError::UnknownFlag(ch))?;
                    if metric.is_node_only() && scope != Scope::Nodes {
                        return Err(UsageError::InvalidFlag {
                            flag: ch,
                            allowed: "nodes",
                        });
                    }
                    metrics.push(metric);
                }
            }
        }

        if !mem && !cpu {
            return Err(UsageError::MissingFamily);
        }
        if metrics.is_empty() {
            return Err(UsageError::MissingMetric);
        }

        let primary_metric = metrics[0];
        Ok(Self {
            mem,
            cpu,
            metrics,
            show_node,
            total: false,
            primary_family: primary_family.unwrap_or(Family::Memory),
            primary_metric,
        })
    }

    pub fn primary_family(&self) -> Family {
        self.primary_family
    }

    pub fn primary_metric(&self) -> MetricKind {
        self.primary_metric
    }

    pub fn contains(&self, metric: MetricKind) -> bool {
        self.metrics.contains(&metric)
    }

    /// Usage samples are needed for `u` columns and for node `f` columns
    pub fn needs_usage(&self) -> bool {
        self.contains(MetricKind::Usage) || self.contains(MetricKind::Free)
    }

    pub fn is_enabled(&self, family: Family) -> bool {
        match family {
            Family::Memory => self.mem,
            Family::Cpu => self.cpu,
        }
    }

    /// Enabled families in display order: primary first
    pub fn families(&self) -> impl Iterator<Item = Family> + '_ {
        [self.primary_family, self.primary_family.other()]
            .into_iter()
            .filter(|f| self.is_enabled(*f))
    }

    /// Operands of the percent column at `index`.
    ///
    /// Uses the two closest ratio operands before the column, or the first two
    /// operands of the spec when fewer than two precede it.
    pub fn percent_ratio(&self, index: usize) -> Option<Ratio> {
        let end = index.min(self.metrics.len());
        let preceding: Vec<MetricKind> = self.metrics[..end]
            .iter()
            .copied()
            .filter(|m| m.is_ratio_operand())
            .collect();

        let (numerator, denominator) = if preceding.len() >= 2 {
            (preceding[preceding.len() - 2], preceding[preceding.len() - 1])
        } else {
            let mut operands = self.metrics.iter().copied().filter(|m| m.is_ratio_operand());
            (operands.next()?, operands.next()?)
        };

        Some(Ratio {
            numerator,
            denominator,
        })
    }

    /// Operands used when the primary metric is a percent column
    pub fn sort_ratio(&self) -> Option<Ratio> {
        let index = self
            .metrics
            .iter()
            .position(|m| *m == MetricKind::Percent)?;
        self.percent_ratio(index)
    }

    /// Drop usage and percent columns when no usage source is reachable
    pub fn without_usage(&self) -> Self {
        let metrics: Vec<MetricKind> = self
            .metrics
            .iter()
            .copied()
            .filter(|m| !matches!(m, MetricKind::Usage | MetricKind::Percent))
            .collect();

        let primary_metric = if metrics.contains(&self.primary_metric) {
            self.primary_metric
        } else {
            metrics.first().copied().unwrap_or(MetricKind::Request)
        };

        Self {
            metrics,
            primary_metric,
            ..self.clone()
        }
    }

    pub fn with_total(mut self, total: bool) -> Self {
        self.total = total;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MetricKind::*;

    #[test]
    fn parses_families_metrics_and_order() {
        let spec = ColumnSpec::parse("mcurp", Scope::Pods).unwrap();
        assert!(spec.mem);
        assert!(spec.cpu);
        assert_eq!(spec.metrics, vec![Usage, Request, Percent]);
        assert!(!spec.show_node);
        assert!(!spec.total);
    }

    #[test]
    fn preserves_duplicates() {
        let spec = ColumnSpec::parse("mrlr", Scope::Pods).unwrap();
        assert_eq!(spec.metrics, vec![Request, Limit, Request]);
    }

    #[test]
    fn node_flag_only_for_pods() {
        let spec = ColumnSpec::parse("mrn", Scope::Pods).unwrap();
        assert!(spec.show_node);

        let err = ColumnSpec::parse("mrn", Scope::Nodes).unwrap_err();
        assert_eq!(
            err,
            UsageError::InvalidFlag {
                flag: 'n',
                allowed: "pods"
            }
        );
    }

    #[test]
    fn free_and_total_only_for_nodes() {
        let err = ColumnSpec::parse("mf", Scope::Pods).unwrap_err();
        assert!(matches!(err, UsageError::InvalidFlag { flag: 'f', .. }));

        let err = ColumnSpec::parse("ct", Scope::Namespaces).unwrap_err();
        assert!(matches!(err, UsageError::InvalidFlag { flag: 't', .. }));

        let spec = ColumnSpec::parse("mft", Scope::Nodes).unwrap();
        assert_eq!(spec.metrics, vec![Free, Total]);
    }

    #[test]
    fn rejects_unknown_letters() {
        assert_eq!(
            ColumnSpec::parse("mrx", Scope::Pods).unwrap_err(),
            UsageError::UnknownFlag('x')
        );
    }

    #[test]
    fn requires_family_and_metric() {
        assert_eq!(
            ColumnSpec::parse("f", Scope::Nodes).unwrap_err(),
            UsageError::MissingFamily
        );
        assert_eq!(
            ColumnSpec::parse("mc", Scope::Pods).unwrap_err(),
            UsageError::MissingMetric
        );
        assert_eq!(
            ColumnSpec::parse("mn", Scope::Pods).unwrap_err(),
            UsageError::MissingMetric
        );
    }

    #[test]
    fn primary_key_is_first_occurrence() {
        let spec = ColumnSpec::parse("ulcm", Scope::Pods).unwrap();
        assert_eq!(spec.primary_family(), Family::Cpu);
        assert_eq!(spec.primary_metric(), Usage);
        assert_eq!(spec.families().collect::<Vec<_>>(), vec![Family::Cpu, Family::Memory]);

        let spec = ColumnSpec::parse("pmrl", Scope::Pods).unwrap();
        assert_eq!(spec.primary_family(), Family::Memory);
        assert_eq!(spec.primary_metric(), Percent);
    }

    #[test]
    fn families_skip_disabled() {
        let spec = ColumnSpec::parse("cr", Scope::Pods).unwrap();
        assert_eq!(spec.families().collect::<Vec<_>>(), vec![Family::Cpu]);
    }

    #[test]
    fn percent_uses_two_preceding_operands() {
        let spec = ColumnSpec::parse("murlp", Scope::Pods).unwrap();
        let ratio = spec.percent_ratio(3).unwrap();
        assert_eq!(ratio.numerator, Request);
        assert_eq!(ratio.denominator, Limit);
        assert_eq!(ratio.label(), "REQ_LIM");
    }

    #[test]
    fn percent_falls_back_to_first_two_operands() {
        let spec = ColumnSpec::parse("mprl", Scope::Pods).unwrap();
        let ratio = spec.percent_ratio(0).unwrap();
        assert_eq!(ratio.numerator, Request);
        assert_eq!(ratio.denominator, Limit);
        assert_eq!(spec.sort_ratio(), Some(ratio));
    }

    #[test]
    fn percent_skips_node_only_operands() {
        let spec = ColumnSpec::parse("mulfp", Scope::Nodes).unwrap();
        let ratio = spec.percent_ratio(3).unwrap();
        assert_eq!(ratio.label(), "USE_LIM");
    }

    #[test]
    fn percent_without_operands() {
        let spec = ColumnSpec::parse("mup", Scope::Pods).unwrap();
        assert_eq!(spec.percent_ratio(1), None);
        assert_eq!(spec.sort_ratio(), None);
    }

    #[test]
    fn without_usage_drops_usage_and_percent() {
        let spec = ColumnSpec::parse("mulfp", Scope::Nodes).unwrap();
        let reduced = spec.without_usage();
        assert_eq!(reduced.metrics, vec![Limit, Free]);
        assert_eq!(reduced.primary_metric(), Limit);

        let reduced = ColumnSpec::parse("mup", Scope::Pods).unwrap().without_usage();
        assert!(reduced.metrics.is_empty());
        assert_eq!(reduced.primary_metric(), Request);
    }

    #[test]
    fn scope_aliases() {
        assert_eq!("PO".parse::<Scope>().unwrap(), Scope::Pods);
        assert_eq!("no".parse::<Scope>().unwrap(), Scope::Nodes);
        assert_eq!("ns".parse::<Scope>().unwrap(), Scope::Namespaces);
        assert_eq!(
            "deploy".parse::<Scope>().unwrap_err(),
            UsageError::UnknownScope("deploy".to_string())
        );
    }
}
