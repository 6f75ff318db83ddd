use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Container, Namespace, Node, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Api, Client, Config, api::ListParams};
use log::{debug, info};

use crate::lib::aggregate::combine;
use crate::lib::metrics::PodMetrics;
use crate::lib::quantity::{cpu_millis, memory_bytes};
use crate::{
    KubernetesError::{ApiError, ConnectionFailed},
    MetricsError, Result,
};

/// Namespace and name of a pod
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PodKey {
    pub namespace: String,
    pub name: String,
}

impl PodKey {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for PodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Observed usage of one pod: memory in bytes, CPU in millicores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageSample {
    pub memory: Option<i64>,
    pub cpu: Option<i64>,
}

impl UsageSample {
    pub fn add(&mut self, memory: Option<i64>, cpu: Option<i64>) {
        self.memory = combine(self.memory, memory);
        self.cpu = combine(self.cpu, cpu);
    }
}

pub type UsageMap = HashMap<PodKey, UsageSample>;

/// Declared requests and limits of one container, already converted to
/// bytes and millicores
#[derive(Debug, Clone, Default)]
pub struct ContainerResources {
    pub memory_request: Option<i64>,
    pub cpu_request: Option<i64>,
    pub memory_limit: Option<i64>,
    pub cpu_limit: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct PodResources {
    pub namespace: String,
    pub name: String,
    pub status: String,
    pub node_name: String,
    pub created: Option<DateTime<Utc>>,
    pub containers: Vec<ContainerResources>,
}

#[derive(Debug, Clone)]
pub struct NodeResources {
    pub name: String,
    pub ready: bool,
    pub created: Option<DateTime<Utc>>,
    pub allocatable_memory: Option<i64>,
    pub allocatable_cpu: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NamespaceResources {
    pub name: String,
    pub status: String,
    pub created: Option<DateTime<Utc>>,
}

/// Source of the entities a table is built from
#[allow(async_fn_in_trait)]
pub trait EntityLister {
    /// Pods of one namespace, or of every namespace for `None`
    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<PodResources>>;

    async fn list_nodes(&self) -> Result<Vec<NodeResources>>;

    async fn list_namespaces(&self) -> Result<Vec<NamespaceResources>>;
}

/// Source of observed pod usage. Failures are not fatal to a run.
#[allow(async_fn_in_trait)]
pub trait UsageProvider {
    async fn pod_usage(
        &self,
        namespace: Option<&str>,
    ) -> std::result::Result<UsageMap, MetricsError>;
}

pub struct KubernetesLoader {
    client: Client,
    default_namespace: String,
}

impl KubernetesLoader {
    /// Connect using the kubeconfig or in-cluster environment
    pub async fn new() -> Result<Self> {
        debug!("Inferring Kubernetes client configuration");
        let config = Config::infer()
            .await
            .map_err(|e| ConnectionFailed(e.to_string()))?;
        let default_namespace = config.default_namespace.clone();

        let client = Client::try_from(config).map_err(|e| ConnectionFailed(e.to_string()))?;

        info!("Created Kubernetes client, current namespace {default_namespace}");
        Ok(Self {
            client,
            default_namespace,
        })
    }

    /// Namespace selected by the current kubeconfig context
    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }
}

impl EntityLister for KubernetesLoader {
    async fn list_pods(&self, namespace: Option<&str>) -> Result<Vec<PodResources>> {
        let lp = ListParams::default();
        let pods = if let Some(namespace) = namespace {
            debug!("Listing pods in {namespace} namespace");
            let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
            api.list(&lp).await.map_err(|e| ApiError(e.to_string()))?
        } else {
            debug!("Listing pods in all namespaces");
            let api: Api<Pod> = Api::all(self.client.clone());
            api.list(&lp).await.map_err(|e| ApiError(e.to_string()))?
        };

        let pods: Vec<PodResources> = pods.items.into_iter().map(pod_resources).collect();
        debug!("Retrieved {} pods", pods.len());
        Ok(pods)
    }

    async fn list_nodes(&self) -> Result<Vec<NodeResources>> {
        debug!("Listing nodes");
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api
            .list(&ListParams::default())
            .await
            .map_err(|e| ApiError(e.to_string()))?;

        let nodes: Vec<NodeResources> = nodes.items.into_iter().map(node_resources).collect();
        debug!("Retrieved {} nodes", nodes.len());
        Ok(nodes)
    }

    async fn list_namespaces(&self) -> Result<Vec<NamespaceResources>> {
        debug!("Listing namespaces");
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespaces = api
            .list(&ListParams::default())
            .await
            .map_err(|e| ApiError(e.to_string()))?;

        let namespaces: Vec<NamespaceResources> = namespaces
            .items
            .into_iter()
            .map(namespace_resources)
            .collect();
        debug!("Retrieved {} namespaces", namespaces.len());
        Ok(namespaces)
    }
}

impl UsageProvider for KubernetesLoader {
    async fn pod_usage(
        &self,
        namespace: Option<&str>,
    ) -> std::result::Result<UsageMap, MetricsError> {
        let api: Api<PodMetrics> = match namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        };
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| MetricsError::Unavailable(e.to_string()))?;

        let usage: UsageMap = list
            .items
            .iter()
            .map(|pm| {
                let key = PodKey::new(
                    pm.metadata.namespace.as_deref().unwrap_or_default(),
                    pm.metadata.name.as_deref().unwrap_or_default(),
                );
                (key, pm.usage())
            })
            .collect();
        debug!("Retrieved usage for {} pods", usage.len());
        Ok(usage)
    }
}

/// Creation timestamp of an object, to the second
fn creation_time(metadata: &ObjectMeta) -> Option<DateTime<Utc>> {
    let created = metadata.creation_timestamp.as_ref()?;
    DateTime::from_timestamp(created.0.timestamp(), 0)
}

fn lookup(map: Option<&BTreeMap<String, Quantity>>, key: &str) -> Option<Quantity> {
    map.and_then(|m| m.get(key)).cloned()
}

fn container_resources(container: &Container) -> ContainerResources {
    let requests = container
        .resources
        .as_ref()
        .and_then(|r| r.requests.as_ref());
    let limits = container.resources.as_ref().and_then(|r| r.limits.as_ref());

    ContainerResources {
        memory_request: lookup(requests, "memory").and_then(|q| memory_bytes(&q)),
        cpu_request: lookup(requests, "cpu").and_then(|q| cpu_millis(&q)),
        memory_limit: lookup(limits, "memory").and_then(|q| memory_bytes(&q)),
        cpu_limit: lookup(limits, "cpu").and_then(|q| cpu_millis(&q)),
    }
}

pub fn pod_resources(pod: Pod) -> PodResources {
    let created = creation_time(&pod.metadata);
    let (node_name, containers) = pod
        .spec
        .map(|spec| {
            (
                spec.node_name.unwrap_or_default(),
                spec.containers
                    .iter()
                    .map(container_resources)
                    .collect::<Vec<_>>(),
            )
        })
        .unwrap_or_default();

    PodResources {
        namespace: pod.metadata.namespace.unwrap_or_default(),
        name: pod.metadata.name.unwrap_or_default(),
        status: pod.status.and_then(|s| s.phase).unwrap_or_default(),
        node_name,
        created,
        containers,
    }
}

pub fn node_resources(node: Node) -> NodeResources {
    let created = creation_time(&node.metadata);
    let status = node.status.unwrap_or_default();
    let ready = status
        .conditions
        .unwrap_or_default()
        .iter()
        .any(|c| c.type_ == "Ready" && c.status == "True");
    let allocatable = status.allocatable.as_ref();

    NodeResources {
        name: node.metadata.name.unwrap_or_default(),
        ready,
        created,
        allocatable_memory: lookup(allocatable, "memory").and_then(|q| memory_bytes(&q)),
        allocatable_cpu: lookup(allocatable, "cpu").and_then(|q| cpu_millis(&q)),
    }
}

pub fn namespace_resources(namespace: Namespace) -> NamespaceResources {
    NamespaceResources {
        created: creation_time(&namespace.metadata),
        name: namespace.metadata.name.unwrap_or_default(),
        status: namespace.status.and_then(|s| s.phase).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn converts_pod() {
        let pod: Pod = serde_json::from_value(serde_json::json!({
            "metadata": {
                "name": "web",
                "namespace": "shop",
                "creationTimestamp": "2024-05-01T08:30:00Z"
            },
            "spec": {
                "nodeName": "node-a",
                "containers": [
                    {
                        "name": "app",
                        "resources": {
                            "requests": { "cpu": "250m", "memory": "256Mi" },
                            "limits": { "memory": "1Gi" }
                        }
                    },
                    { "name": "sidecar" }
                ]
            },
            "status": { "phase": "Running" }
        }))
        .unwrap();

        let pod = pod_resources(pod);
        assert_eq!(pod.namespace, "shop");
        assert_eq!(pod.name, "web");
        assert_eq!(pod.status, "Running");
        assert_eq!(pod.node_name, "node-a");
        assert_eq!(
            pod.created,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap())
        );
        assert_eq!(pod.containers.len(), 2);
        assert_eq!(pod.containers[0].cpu_request, Some(250));
        assert_eq!(pod.containers[0].memory_request, Some(256 * 1024 * 1024));
        assert_eq!(pod.containers[0].memory_limit, Some(1024 * 1024 * 1024));
        assert_eq!(pod.containers[0].cpu_limit, None);
        assert_eq!(pod.containers[1].memory_request, None);
    }

    #[test]
    fn converts_node_readiness_and_allocatable() {
        let node: Node = serde_json::from_value(serde_json::json!({
            "metadata": { "name": "node-a" },
            "status": {
                "allocatable": { "cpu": "3920m", "memory": "15Gi" },
                "conditions": [
                    { "type": "MemoryPressure", "status": "False" },
                    { "type": "Ready", "status": "True" }
                ]
            }
        }))
        .unwrap();

        let node = node_resources(node);
        assert!(node.ready);
        assert_eq!(node.created, None);
        assert_eq!(node.allocatable_cpu, Some(3920));
        assert_eq!(node.allocatable_memory, Some(15 * 1024 * 1024 * 1024));

        let node: Node = serde_json::from_value(serde_json::json!({
            "metadata": { "name": "node-b" },
            "status": { "conditions": [ { "type": "Ready", "status": "Unknown" } ] }
        }))
        .unwrap();
        let node = node_resources(node);
        assert!(!node.ready);
        assert_eq!(node.allocatable_memory, None);
    }

    #[test]
    fn converts_namespace() {
        let namespace: Namespace = serde_json::from_value(serde_json::json!({
            "metadata": { "name": "shop", "creationTimestamp": "2023-11-14T22:13:20Z" },
            "status": { "phase": "Active" }
        }))
        .unwrap();

        let namespace = namespace_resources(namespace);
        assert_eq!(namespace.name, "shop");
        assert_eq!(namespace.status, "Active");
        assert_eq!(
            namespace.created,
            DateTime::from_timestamp(1_700_000_000, 0)
        );
    }

    #[test]
    fn usage_sample_adds_like_metric_cells() {
        let mut sample = UsageSample::default();
        sample.add(Some(10), None);
        sample.add(Some(5), Some(3));
        assert_eq!(sample.memory, Some(15));
        assert_eq!(sample.cpu, Some(3));
    }
}
