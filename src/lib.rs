//! kubectl-ps Library
//!
//! This library renders ps-style memory and CPU tables for Kubernetes pods,
//! nodes and namespaces from a terse metric flag string such as `mcurp`.

pub mod lib {
    pub mod aggregate;
    pub mod cli;
    pub mod config;
    pub mod error;
    pub mod kubernetes;
    pub mod logger;
    pub mod metrics;
    pub mod pipeline;
    pub mod quantity;
    pub mod render;
    pub mod sort;
    pub mod spec;
    pub mod units;
}

// Re-export commonly used types at the root level for convenience
pub use lib::aggregate::{EntityRow, Identity, MetricMap, Snapshot, build_rows, combine, totals};
pub use lib::cli::Cli;
pub use lib::config::Config;
pub use lib::error::{KubernetesError, MetricsError, PsError, Result, UsageError};
pub use lib::kubernetes::{
    ContainerResources, EntityLister, KubernetesLoader, NamespaceResources, NodeResources, PodKey,
    PodResources, UsageMap, UsageProvider, UsageSample,
};
pub use lib::logger::init_logger;
pub use lib::metrics::PodMetrics;
pub use lib::pipeline::{collect, run};
pub use lib::render::TableRenderer;
pub use lib::sort::{sort_key, sort_rows};
pub use lib::spec::{ColumnSpec, Family, MetricKind, Ratio, Scope};
pub use lib::units::{UnitMode, format_age, format_memory};
