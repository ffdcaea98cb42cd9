//! qscale-kube — replica count of a Deployment via its `scale` subresource.
//!
//! Reads go through `GET .../deployments/{name}/scale`, writes through a
//! merge patch of `spec.replicas` on the same subresource, so qscale never
//! touches the rest of the Deployment object.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::autoscaling::v1::Scale;
use kube::{
    api::{Api, Patch, PatchParams},
    Client,
};
use serde_json::json;
use tracing::{debug, info};

use qscale_core::{BackendError, BoxFuture, ReplicaBackend, WorkloadRef};

/// Field manager recorded on every replica write.
pub const FIELD_MANAGER: &str = "qscale";

/// [`ReplicaBackend`] for one Deployment in one namespace.
#[derive(Clone)]
pub struct DeploymentScaler {
    api: Api<Deployment>,
    workload: WorkloadRef,
}

impl DeploymentScaler {
    /// Create a client from the in-cluster service account, falling back
    /// to the local kubeconfig.
    pub async fn connect(workload: &WorkloadRef) -> kube::Result<Self> {
        let client = Client::try_default().await?;
        info!(%workload, "Kubernetes client initialized");
        Ok(Self::new(client, workload.clone()))
    }

    pub fn new(client: Client, workload: WorkloadRef) -> Self {
        Self {
            api: Api::namespaced(client, &workload.namespace),
            workload,
        }
    }
}

impl ReplicaBackend for DeploymentScaler {
    fn get_replicas(&self) -> BoxFuture<'_, Result<i32, BackendError>> {
        Box::pin(async move {
            let scale = self
                .api
                .get_scale(&self.workload.name)
                .await
                .map_err(|e| BackendError::Read {
                    workload: self.workload.to_string(),
                    message: e.to_string(),
                })?;

            let replicas = spec_replicas(&self.workload, &scale)?;
            debug!(workload = %self.workload, replicas, "read replica count");
            Ok(replicas)
        })
    }

    fn set_replicas(&self, replicas: i32) -> BoxFuture<'_, Result<i32, BackendError>> {
        Box::pin(async move {
            let patch = json!({ "spec": { "replicas": replicas } });
            let params = PatchParams {
                field_manager: Some(FIELD_MANAGER.to_string()),
                ..Default::default()
            };

            let scale = self
                .api
                .patch_scale(&self.workload.name, &params, &Patch::Merge(&patch))
                .await
                .map_err(|e| BackendError::Write {
                    workload: self.workload.to_string(),
                    replicas,
                    message: e.to_string(),
                })?;

            spec_replicas(&self.workload, &scale)
        })
    }
}

/// Requested replicas from a `Scale` object.
///
/// The API server omits `spec.replicas` when it is zero, so an absent field
/// inside a present spec reads as 0.
fn spec_replicas(workload: &WorkloadRef, scale: &Scale) -> Result<i32, BackendError> {
    scale
        .spec
        .as_ref()
        .map(|spec| spec.replicas.unwrap_or(0))
        .ok_or_else(|| BackendError::MissingReplicas {
            workload: workload.to_string(),
        })
}
