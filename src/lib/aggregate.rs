use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::debug;

use crate::lib::kubernetes::{
    ContainerResources, NamespaceResources, NodeResources, PodKey, PodResources, UsageMap,
};
use crate::lib::spec::{ColumnSpec, Family, MetricKind, Ratio, Scope};

/// Add two optional quantities where `None` means "no data".
///
/// The first real value activates an empty cell; an empty addend contributes
/// nothing.
pub fn combine(a: Option<i64>, b: Option<i64>) -> Option<i64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.saturating_add(b)),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

/// Stored metric cells of one family for one entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricMap {
    request: Option<i64>,
    limit: Option<i64>,
    usage: Option<i64>,
    free: Option<i64>,
    total: Option<i64>,
}

impl MetricMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, metric: MetricKind) -> Option<&mut Option<i64>> {
        match metric {
            MetricKind::Request => Some(&mut self.request),
            MetricKind::Limit => Some(&mut self.limit),
            MetricKind::Usage => Some(&mut self.usage),
            MetricKind::Free => Some(&mut self.free),
            MetricKind::Total => Some(&mut self.total),
            MetricKind::Percent => None,
        }
    }

    /// Stored value, `None` when unavailable. Percent is never stored.
    pub fn get(&self, metric: MetricKind) -> Option<i64> {
        match metric {
            MetricKind::Request => self.request,
            MetricKind::Limit => self.limit,
            MetricKind::Usage => self.usage,
            MetricKind::Free => self.free,
            MetricKind::Total => self.total,
            MetricKind::Percent => None,
        }
    }

    pub fn set(&mut self, metric: MetricKind, value: Option<i64>) {
        if let Some(slot) = self.slot_mut(metric) {
            *slot = value;
        }
    }

    pub fn add(&mut self, metric: MetricKind, value: Option<i64>) {
        if let Some(slot) = self.slot_mut(metric) {
            *slot = combine(*slot, value);
        }
    }

    /// Add every cell of `other` into this map
    pub fn accumulate(&mut self, other: &MetricMap) {
        for metric in [
            MetricKind::Request,
            MetricKind::Limit,
            MetricKind::Usage,
            MetricKind::Free,
            MetricKind::Total,
        ] {
            self.add(metric, other.get(metric));
        }
    }

    /// Fill the node-only columns: free is limit minus usage, total mirrors limit
    pub fn derive_node_columns(&mut self) {
        self.free = match (self.limit, self.usage) {
            (Some(limit), Some(usage)) => Some(limit.saturating_sub(usage)),
            _ => None,
        };
        self.total = self.limit;
    }

    /// `100 * numerator / denominator`, when both cells hold positive values
    pub fn percent(&self, ratio: Option<Ratio>) -> Option<f64> {
        let ratio = ratio?;
        let numerator = self.get(ratio.numerator).filter(|v| *v > 0)?;
        let denominator = self.get(ratio.denominator).filter(|v| *v > 0)?;
        Some(numerator as f64 * 100.0 / denominator as f64)
    }
}

/// Identity columns of a row, one variant per scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Pod {
        namespace: String,
        name: String,
        node: String,
    },
    Node {
        name: String,
    },
    Namespace {
        name: String,
    },
}

/// One table row with its memory and CPU cells
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRow {
    pub identity: Identity,
    pub status: String,
    pub created: Option<DateTime<Utc>>,
    pub mem: MetricMap,
    pub cpu: MetricMap,
}

impl EntityRow {
    fn new(identity: Identity, status: String, created: Option<DateTime<Utc>>) -> Self {
        Self {
            identity,
            status,
            created,
            mem: MetricMap::new(),
            cpu: MetricMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        match &self.identity {
            Identity::Pod { name, .. }
            | Identity::Node { name }
            | Identity::Namespace { name } => name,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match &self.identity {
            Identity::Pod { namespace, .. } => Some(namespace),
            _ => None,
        }
    }

    pub fn node(&self) -> Option<&str> {
        match &self.identity {
            Identity::Pod { node, .. } => Some(node),
            _ => None,
        }
    }

    /// Key pods and usage samples are attributed by
    fn key(&self) -> String {
        match &self.identity {
            Identity::Pod {
                namespace, name, ..
            } => PodKey::new(namespace, name).to_string(),
            Identity::Node { name } | Identity::Namespace { name } => name.clone(),
        }
    }

    pub fn metrics(&self, family: Family) -> &MetricMap {
        match family {
            Family::Memory => &self.mem,
            Family::Cpu => &self.cpu,
        }
    }

    fn add_container(&mut self, container: &ContainerResources, with_limits: bool) {
        self.mem.add(MetricKind::Request, container.memory_request);
        self.cpu.add(MetricKind::Request, container.cpu_request);
        if with_limits {
            self.mem.add(MetricKind::Limit, container.memory_limit);
            self.cpu.add(MetricKind::Limit, container.cpu_limit);
        }
    }
}

/// Everything the collaborators returned for one run
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub pods: Vec<PodResources>,
    pub nodes: Vec<NodeResources>,
    pub namespaces: Vec<NamespaceResources>,
    /// `None` when usage was not requested or not reachable
    pub usage: Option<UsageMap>,
}

/// Build one row per entity of `scope` with request, limit and usage cells filled in
pub fn build_rows(scope: Scope, spec: &ColumnSpec, snapshot: &Snapshot) -> Vec<EntityRow> {
    let mut rows = seed_rows(scope, snapshot);
    let index: HashMap<String, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| (row.key(), i))
        .collect();

    // Node limits come from allocatable capacity, not from pod limits
    let with_limits = scope != Scope::Nodes;
    let mut pod_owner: HashMap<PodKey, usize> = HashMap::new();

    for pod in &snapshot.pods {
        let owner = match scope {
            Scope::Pods => PodKey::new(&pod.namespace, &pod.name).to_string(),
            Scope::Nodes => pod.node_name.clone(),
            Scope::Namespaces => pod.namespace.clone(),
        };
        let Some(&i) = index.get(&owner) else {
            continue;
        };
        pod_owner.insert(PodKey::new(&pod.namespace, &pod.name), i);
        for container in &pod.containers {
            rows[i].add_container(container, with_limits);
        }
    }

    if let Some(usage) = snapshot.usage.as_ref().filter(|_| spec.needs_usage()) {
        let mut matched = 0;
        for (key, sample) in usage {
            let owner = match scope {
                Scope::Namespaces => index.get(&key.namespace).copied(),
                Scope::Pods | Scope::Nodes => pod_owner.get(key).copied(),
            };
            let Some(i) = owner else {
                continue;
            };
            rows[i].mem.add(MetricKind::Usage, sample.memory);
            rows[i].cpu.add(MetricKind::Usage, sample.cpu);
            matched += 1;
        }
        debug!("Attributed {matched} of {} usage samples", usage.len());
    }

    if scope == Scope::Nodes {
        for row in &mut rows {
            row.mem.derive_node_columns();
            row.cpu.derive_node_columns();
        }
    }

    rows
}

fn seed_rows(scope: Scope, snapshot: &Snapshot) -> Vec<EntityRow> {
    match scope {
        Scope::Pods => snapshot
            .pods
            .iter()
            .map(|pod| {
                EntityRow::new(
                    Identity::Pod {
                        namespace: pod.namespace.clone(),
                        name: pod.name.clone(),
                        node: pod.node_name.clone(),
                    },
                    pod.status.clone(),
                    pod.created,
                )
            })
            .collect(),
        Scope::Nodes => snapshot
            .nodes
            .iter()
            .map(|node| {
                let status = if node.ready { "Ready" } else { "NotReady" };
                let mut row = EntityRow::new(
                    Identity::Node {
                        name: node.name.clone(),
                    },
                    status.to_string(),
                    node.created,
                );
                row.mem.set(MetricKind::Limit, node.allocatable_memory);
                row.cpu.set(MetricKind::Limit, node.allocatable_cpu);
                row
            })
            .collect(),
        Scope::Namespaces => snapshot
            .namespaces
            .iter()
            .map(|ns| {
                EntityRow::new(
                    Identity::Namespace {
                        name: ns.name.clone(),
                    },
                    ns.status.clone(),
                    ns.created,
                )
            })
            .collect(),
    }
}

/// Sum of all rows, used for the optional `TOTAL` line
pub fn totals(rows: &[EntityRow]) -> (MetricMap, MetricMap) {
    rows.iter()
        .fold((MetricMap::new(), MetricMap::new()), |(mut mem, mut cpu), row| {
            mem.accumulate(&row.mem);
            cpu.accumulate(&row.cpu);
            (mem, cpu)
        })
}
