//! Minimal `metrics.k8s.io/v1beta1` pod metrics types.
//!
//! kube and k8s-openapi ship no types for the metrics API, so the resource is
//! declared here with just the fields the usage columns need.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

use crate::lib::kubernetes::UsageSample;
use crate::lib::quantity::{cpu_millis, memory_bytes};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerUsage {
    pub cpu: Quantity,
    pub memory: Quantity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerMetrics {
    pub name: String,
    #[serde(default)]
    pub usage: ContainerUsage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodMetrics {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub containers: Vec<ContainerMetrics>,
}

impl k8s_openapi::Resource for PodMetrics {
    const API_VERSION: &'static str = "metrics.k8s.io/v1beta1";
    const GROUP: &'static str = "metrics.k8s.io";
    const KIND: &'static str = "PodMetrics";
    const VERSION: &'static str = "v1beta1";
    const URL_PATH_SEGMENT: &'static str = "pods";
    type Scope = k8s_openapi::NamespaceResourceScope;
}

impl k8s_openapi::Metadata for PodMetrics {
    type Ty = ObjectMeta;

    fn metadata(&self) -> &Self::Ty {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Self::Ty {
        &mut self.metadata
    }
}

impl PodMetrics {
    /// Sum of container usage: memory in bytes, CPU in millicores
    pub fn usage(&self) -> UsageSample {
        self.containers
            .iter()
            .fold(UsageSample::default(), |mut sample, container| {
                sample.add(
                    memory_bytes(&container.usage.memory),
                    cpu_millis(&container.usage.cpu),
                );
                sample
            })
    }
}
