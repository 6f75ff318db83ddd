use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::Result;
use crate::lib::aggregate::{Snapshot, build_rows};
use crate::lib::config::Config;
use crate::lib::kubernetes::{EntityLister, UsageProvider};
use crate::lib::render::TableRenderer;
use crate::lib::sort::sort_rows;
use crate::lib::spec::{ColumnSpec, Scope};

/// Fetch everything the configured scope needs.
///
/// Returns the column spec actually in effect: usage and percent columns are
/// dropped when the usage source cannot be reached.
pub async fn collect<S>(
    source: &S,
    config: &Config,
    current_namespace: &str,
) -> Result<(ColumnSpec, Snapshot)>
where
    S: EntityLister + UsageProvider,
{
    let mut columns = config.columns.clone();
    let mut snapshot = Snapshot::default();

    let selector = match config.scope {
        Scope::Pods => config.namespace_selector(current_namespace),
        Scope::Nodes | Scope::Namespaces => None,
    };

    match config.scope {
        Scope::Pods => {
            snapshot.pods = source.list_pods(selector).await?;
        }
        Scope::Nodes => {
            snapshot.nodes = source.list_nodes().await?;
            snapshot.pods = source.list_pods(None).await?;
        }
        Scope::Namespaces => {
            snapshot.namespaces = source.list_namespaces().await?;
            snapshot.pods = source.list_pods(None).await?;
        }
    }

    if columns.needs_usage() {
        match source.pod_usage(selector).await {
            Ok(usage) => snapshot.usage = Some(usage),
            Err(e) => {
                warn!("{e}; dropping usage and percent columns");
                columns = columns.without_usage();
            }
        }
    }

    debug!(
        "Collected {} pods, {} nodes, {} namespaces for {} scope",
        snapshot.pods.len(),
        snapshot.nodes.len(),
        snapshot.namespaces.len(),
        config.scope
    );
    Ok((columns, snapshot))
}

/// Fetch, aggregate, sort and render one table
pub async fn run<S>(
    source: &S,
    config: &Config,
    current_namespace: &str,
    now: DateTime<Utc>,
) -> Result<String>
where
    S: EntityLister + UsageProvider,
{
    let (columns, snapshot) = collect(source, config, current_namespace).await?;

    let mut rows = build_rows(config.scope, &columns, &snapshot);
    sort_rows(&mut rows, &columns, config.reverse);

    let renderer = TableRenderer::new(
        &columns,
        config.scope,
        config.all_namespaces,
        config.units,
        now,
    );
    Ok(renderer.render(&rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lib::aggregate::tests::{container, pod};
    use crate::lib::kubernetes::{
        NamespaceResources, NodeResources, PodKey, PodResources, UsageMap, UsageSample,
    };
    use crate::lib::units::UnitMode;
    use crate::{KubernetesError, MetricsError, PsError};
    use chrono::TimeZone;
    use std::sync::Mutex;

    const MI: i64 = 1024 * 1024;

    #[derive(Default)]
    struct FakeCluster {
        pods: Vec<PodResources>,
        nodes: Vec<NodeResources>,
        namespaces: Vec<NamespaceResources>,
        usage: Option<UsageMap>,
        fail_listing: bool,
        pod_selectors: Mutex<Vec<Option<String>>>,
    }

    impl EntityLister for FakeCluster {
        async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<PodResources>> {
            if self.fail_listing {
                return Err(KubernetesError::ApiError("pods is forbidden".to_string()).into());
            }
            self.pod_selectors
                .lock()
                .unwrap()
                .push(namespace.map(str::to_string));
            Ok(self
                .pods
                .iter()
                .filter(|p| namespace.is_none_or(|ns| p.namespace == ns))
                .cloned()
                .collect())
        }

        async fn list_nodes(&self) -> Result<Vec<NodeResources>> {
            Ok(self.nodes.clone())
        }

        async fn list_namespaces(&self) -> Result<Vec<NamespaceResources>> {
            Ok(self.namespaces.clone())
        }
    }

    impl UsageProvider for FakeCluster {
        async fn pod_usage(
            &self,
            _namespace: Option<&str>,
        ) -> std::result::Result<UsageMap, MetricsError> {
            self.usage.clone().ok_or_else(|| {
                MetricsError::Unavailable("the server could not find the requested resource".into())
            })
        }
    }

    fn config(scope: Scope, flags: &str) -> Config {
        Config::new(
            scope,
            ColumnSpec::parse(flags, scope).unwrap(),
            false,
            None,
            false,
            UnitMode::Human,
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn pods_sorted_with_total_row() {
        let cluster = FakeCluster {
            pods: vec![
                pod("default", "small", "n", vec![container(Some(256 * MI), None)]),
                pod("default", "big", "n", vec![container(Some(512 * MI), None)]),
                pod("other", "elsewhere", "n", vec![container(Some(900 * MI), None)]),
            ],
            ..Default::default()
        };
        let mut config = config(Scope::Pods, "mr");
        config.columns = config.columns.with_total(true);

        let out = run(&cluster, &config, "default", now()).await.unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("big "));
        assert!(lines[2].starts_with("small "));
        assert!(lines[3].starts_with("TOTAL "));
        assert!(lines[3].contains("768.0M"));
        assert_eq!(
            *cluster.pod_selectors.lock().unwrap(),
            vec![Some("default".to_string())]
        );
    }

    #[tokio::test]
    async fn missing_usage_source_drops_usage_columns() {
        let cluster = FakeCluster {
            pods: vec![pod("default", "web", "n", vec![container(Some(MI), Some(5))])],
            ..Default::default()
        };
        let config = config(Scope::Pods, "mcurp");

        let (columns, snapshot) = collect(&cluster, &config, "default").await.unwrap();
        assert!(columns.metrics.iter().all(|m| m.letter() == 'r'));
        assert!(snapshot.usage.is_none());

        let out = run(&cluster, &config, "default", now()).await.unwrap();
        assert_eq!(out.lines().next(), Some("NAME  STATUS   MEM_REQ  CPU_REQ  AGE"));
    }

    #[tokio::test]
    async fn usage_is_only_fetched_when_needed() {
        let cluster = FakeCluster {
            pods: vec![pod("default", "web", "n", vec![])],
            usage: Some(
                [(
                    PodKey::new("default", "web"),
                    UsageSample {
                        memory: Some(10),
                        cpu: Some(1),
                    },
                )]
                .into_iter()
                .collect(),
            ),
            ..Default::default()
        };

        let (_, snapshot) = collect(&cluster, &config(Scope::Pods, "mr"), "default")
            .await
            .unwrap();
        assert!(snapshot.usage.is_none());

        let (_, snapshot) = collect(&cluster, &config(Scope::Pods, "mu"), "default")
            .await
            .unwrap();
        assert_eq!(snapshot.usage.map(|u| u.len()), Some(1));
    }

    #[tokio::test]
    async fn nodes_list_pods_cluster_wide() {
        let cluster = FakeCluster {
            pods: vec![
                pod("a", "p1", "node-a", vec![container(Some(100), Some(250))]),
                pod("b", "p2", "node-a", vec![container(Some(100), Some(250))]),
            ],
            nodes: vec![NodeResources {
                name: "node-a".to_string(),
                ready: true,
                created: None,
                allocatable_memory: Some(1000),
                allocatable_cpu: Some(2000),
            }],
            ..Default::default()
        };

        let out = run(&cluster, &config(Scope::Nodes, "crlp"), "a", now())
            .await
            .unwrap();
        assert_eq!(
            out,
            "NAME    STATUS  CPU_REQ  CPU_LIM  CPU_REQ_LIM  AGE\n\
             node-a  Ready   500      2000     25%          -\n"
        );
        assert_eq!(*cluster.pod_selectors.lock().unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn listing_failure_is_fatal() {
        let cluster = FakeCluster {
            fail_listing: true,
            ..Default::default()
        };

        let err = run(&cluster, &config(Scope::Namespaces, "mr"), "default", now())
            .await
            .unwrap_err();
        assert!(matches!(err, PsError::Kubernetes(KubernetesError::ApiError(_))));
    }
}
