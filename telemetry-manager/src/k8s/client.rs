use super::error::K8sError;
use crate::otelcol::secret::{SecretData, SecretReader};
use crate::storage_migration::{ObjectKey, StorageVersionClient, StoredVersions};
use async_trait::async_trait;
use duration_str::deserialize_duration;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{
    Api, Client, Config, ResourceExt,
    api::{Patch, PatchParams, PostParams},
    config::KubeConfigOptions,
    core::{ApiResource, DynamicObject},
};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Same as upstream kube-rs default client timeout (read/write).
///
/// The value sits between the watcher default timeout (290s) and the k8s max watcher
/// timeout (300s).
const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(295);

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct ClientConfig {
    /// The maximum duration the client waits for a response from the api server.
    #[serde(default)]
    pub client_timeout: ClientTimeout,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ClientTimeout(#[serde(deserialize_with = "deserialize_duration")] Duration);

impl Default for ClientTimeout {
    fn default() -> Self {
        Self(DEFAULT_CLIENT_TIMEOUT)
    }
}

impl From<ClientTimeout> for Duration {
    fn from(value: ClientTimeout) -> Self {
        value.0
    }
}

pub struct AsyncK8sClient {
    client: Client,
}

impl AsyncK8sClient {
    /// Constructs a new Kubernetes client.
    ///
    /// If loading from the inCluster config fails we fall back to kube-config.
    /// This respects the `$KUBECONFIG` envvar, but otherwise defaults to `~/.kube/config`.
    pub async fn try_new(client_config: &ClientConfig) -> Result<Self, K8sError> {
        debug!("trying inClusterConfig for k8s client");

        let mut config = match Config::incluster() {
            Ok(c) => c,
            Err(e) => {
                debug!("inClusterConfig {}, trying kubeconfig for k8s client", e);
                let c = KubeConfigOptions::default();
                Config::from_kubeconfig(&c).await?
            }
        };
        config.read_timeout = Some(client_config.client_timeout.into());
        config.write_timeout = Some(client_config.client_timeout.into());

        let client = Client::try_from(config)?;

        debug!("k8s client initialization succeeded");
        Ok(Self { client })
    }

    /// Returns the decoded data of a secret, or `None` when the secret does not exist.
    pub async fn get_secret(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<SecretData>, K8sError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);

        let Some(secret) = api.get_opt(name).await? else {
            debug!(%name, %namespace, "secret not found");
            return Ok(None);
        };

        Ok(Some(
            secret
                .data
                .unwrap_or_default()
                .into_iter()
                .map(|(key, value)| (key, value.0))
                .collect(),
        ))
    }

    pub async fn get_crd(&self, name: &str) -> Result<Option<CustomResourceDefinition>, K8sError> {
        let api: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?)
    }

    /// Writes `status.storedVersions` of a CRD. The resource version travels in the patch, so a
    /// concurrent writer makes the api server answer with a conflict.
    pub async fn patch_crd_stored_versions(
        &self,
        name: &str,
        stored: &StoredVersions,
    ) -> Result<(), K8sError> {
        let api: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        let patch = json!({
            "metadata": { "resourceVersion": stored.resource_version },
            "status": { "storedVersions": stored.versions },
        });
        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    pub async fn list_dynamic_objects(
        &self,
        resource: &ApiResource,
    ) -> Result<Vec<DynamicObject>, K8sError> {
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), resource);
        Ok(api.list(&Default::default()).await?.items)
    }

    pub async fn get_dynamic_object(
        &self,
        resource: &ApiResource,
        key: &ObjectKey,
    ) -> Result<Option<DynamicObject>, K8sError> {
        let api = self.dynamic_api(resource, key.namespace.as_deref());
        Ok(api.get_opt(&key.name).await?)
    }

    pub async fn replace_dynamic_object(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<DynamicObject, K8sError> {
        let name = object.metadata.name.clone().ok_or(K8sError::MissingName)?;
        let api = self.dynamic_api(resource, object.namespace().as_deref());
        Ok(api.replace(&name, &PostParams::default(), object).await?)
    }

    fn dynamic_api(&self, resource: &ApiResource, namespace: Option<&str>) -> Api<DynamicObject> {
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, resource),
            None => Api::all_with(self.client.clone(), resource),
        }
    }
}

#[async_trait]
impl SecretReader for AsyncK8sClient {
    async fn get_secret(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<SecretData>, K8sError> {
        AsyncK8sClient::get_secret(self, name, namespace).await
    }
}

#[async_trait]
impl StorageVersionClient for AsyncK8sClient {
    async fn get_stored_versions(
        &self,
        crd_name: &str,
    ) -> Result<Option<StoredVersions>, K8sError> {
        let Some(crd) = self.get_crd(crd_name).await? else {
            return Ok(None);
        };
        stored_versions_of(&crd).map(Some)
    }

    async fn update_stored_versions(
        &self,
        crd_name: &str,
        stored: &StoredVersions,
    ) -> Result<(), K8sError> {
        self.patch_crd_stored_versions(crd_name, stored).await
    }

    async fn list_objects(&self, resource: &ApiResource) -> Result<Vec<DynamicObject>, K8sError> {
        self.list_dynamic_objects(resource).await
    }

    async fn get_object(
        &self,
        resource: &ApiResource,
        key: &ObjectKey,
    ) -> Result<Option<DynamicObject>, K8sError> {
        self.get_dynamic_object(resource, key).await
    }

    async fn replace_object(
        &self,
        resource: &ApiResource,
        object: &DynamicObject,
    ) -> Result<(), K8sError> {
        self.replace_dynamic_object(resource, object).await?;
        Ok(())
    }
}

/// Reads `status.storedVersions` through the JSON form of the CRD, since the typed status field
/// may be absent on freshly created definitions.
fn stored_versions_of(crd: &CustomResourceDefinition) -> Result<StoredVersions, K8sError> {
    let status = serde_json::to_value(&crd.status)?;
    let versions = match status.pointer("/storedVersions") {
        Some(value) => serde_json::from_value(value.clone())?,
        None => Vec::new(),
    };
    Ok(StoredVersions {
        resource_version: crd.resource_version().unwrap_or_default(),
        versions,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::apis::log_pipeline::LogPipeline;
    use assert_matches::assert_matches;
    use http::{Method, Uri};
    use tower_test::mock;

    #[test]
    fn test_upstream_default_client_timeout() {
        let config = Config::new(Uri::try_from("https://localhost.com").unwrap());
        let msg =
            "looks like kube-rs has revisit the timeout, see [DEFAULT_CLIENT_TIMEOUT] for details.";
        assert_eq!(config.read_timeout, Some(DEFAULT_CLIENT_TIMEOUT), "{msg}");
        assert_eq!(config.write_timeout, Some(DEFAULT_CLIENT_TIMEOUT), "{msg}");
    }

    #[test]
    fn test_client_config_parses_timeout() {
        let config: ClientConfig = serde_yaml::from_str("client_timeout: 30s").unwrap();
        assert_eq!(Duration::from(config.client_timeout), Duration::from_secs(30));

        let config: ClientConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(Duration::from(config.client_timeout), DEFAULT_CLIENT_TIMEOUT);
    }

    #[tokio::test]
    async fn test_get_secret_decodes_data() {
        let client = get_mocked_client();

        let data = client.get_secret("backend", "default").await.unwrap().unwrap();
        assert_eq!(data.get("endpoint"), Some(&b"https://backend:4317".to_vec()));
    }

    #[tokio::test]
    async fn test_get_missing_secret_is_none() {
        let client = get_mocked_client();

        assert!(client.get_secret("missing", "default").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_stored_versions() {
        let client = get_mocked_client();

        let stored = client
            .get_stored_versions("logpipelines.telemetry.kyma-project.io")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.resource_version, "100");
        assert_eq!(stored.versions, vec!["v1alpha1", "v1beta1"]);
    }

    #[tokio::test]
    async fn test_update_stored_versions_conflict() {
        let client = get_mocked_client();

        let err = client
            .update_stored_versions(
                "logpipelines.telemetry.kyma-project.io",
                &StoredVersions {
                    resource_version: "99".into(),
                    versions: vec!["v1beta1".into()],
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_list_and_replace_objects() {
        let client = get_mocked_client();
        let resource = ApiResource::erase::<LogPipeline>(&());

        let objects = client.list_objects(&resource).await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].name_any(), "app-logs");

        client.replace_object(&resource, &objects[0]).await.unwrap();
    }

    #[tokio::test]
    async fn test_replace_object_without_name() {
        let client = get_mocked_client();
        let resource = ApiResource::erase::<LogPipeline>(&());
        let mut unnamed = DynamicObject::new("app-logs", &resource);
        unnamed.metadata.name = None;
        assert_matches!(
            client.replace_object(&resource, &unnamed).await,
            Err(K8sError::MissingName)
        );
    }

    fn get_mocked_client() -> AsyncK8sClient {
        let (mock_service, handle) =
            mock::pair::<http::Request<kube::client::Body>, http::Response<kube::client::Body>>();
        ApiServerVerifier(handle).run();
        AsyncK8sClient {
            client: Client::new(mock_service, "default"),
        }
    }

    type ApiServerHandle =
        mock::Handle<http::Request<kube::client::Body>, http::Response<kube::client::Body>>;

    struct ApiServerVerifier(ApiServerHandle);

    impl ApiServerVerifier {
        fn run(mut self) -> tokio::task::JoinHandle<()> {
            tokio::spawn(async move {
                while let Some((read, send)) = self.0.next_request().await {
                    let uri = read.uri().to_string();
                    let (status, data) = match (read.method(), uri.as_str()) {
                        (&Method::GET, s) if s.contains("/secrets/backend") => {
                            (200, Self::secret_data())
                        }
                        (&Method::GET, s) if s.contains("/customresourcedefinitions/") => {
                            (200, Self::crd_data())
                        }
                        (&Method::PATCH, s) if s.contains("/status") => {
                            (409, Self::status_data(409, "Conflict"))
                        }
                        (&Method::GET, s) if s.contains("/logpipelines") => {
                            (200, Self::log_pipeline_list())
                        }
                        (&Method::PUT, s) if s.contains("/logpipelines/app-logs") => {
                            (200, Self::log_pipeline())
                        }
                        _ => (404, Self::status_data(404, "NotFound")),
                    };

                    send.send_response(
                        http::Response::builder()
                            .status(status)
                            .body(kube::client::Body::from(serde_json::to_vec(&data).unwrap()))
                            .unwrap(),
                    );
                }
            })
        }

        fn secret_data() -> serde_json::Value {
            json!({
                "apiVersion": "v1",
                "kind": "Secret",
                "metadata": { "name": "backend", "namespace": "default" },
                "data": { "endpoint": "aHR0cHM6Ly9iYWNrZW5kOjQzMTc=" }
            })
        }

        fn crd_data() -> serde_json::Value {
            json!({
                "apiVersion": "apiextensions.k8s.io/v1",
                "kind": "CustomResourceDefinition",
                "metadata": {
                    "name": "logpipelines.telemetry.kyma-project.io",
                    "resourceVersion": "100"
                },
                "spec": {
                    "group": "telemetry.kyma-project.io",
                    "names": { "kind": "LogPipeline", "plural": "logpipelines" },
                    "scope": "Cluster",
                    "versions": []
                },
                "status": {
                    "acceptedNames": { "kind": "LogPipeline", "plural": "logpipelines" },
                    "conditions": [],
                    "storedVersions": ["v1alpha1", "v1beta1"]
                }
            })
        }

        fn log_pipeline() -> serde_json::Value {
            json!({
                "apiVersion": "telemetry.kyma-project.io/v1beta1",
                "kind": "LogPipeline",
                "metadata": { "name": "app-logs", "resourceVersion": "7" },
                "spec": {}
            })
        }

        fn log_pipeline_list() -> serde_json::Value {
            json!({
                "apiVersion": "telemetry.kyma-project.io/v1beta1",
                "kind": "LogPipelineList",
                "metadata": { "resourceVersion": "7" },
                "items": [Self::log_pipeline()]
            })
        }

        fn status_data(code: u16, reason: &str) -> serde_json::Value {
            json!({
                "apiVersion": "v1",
                "kind": "Status",
                "metadata": {},
                "status": "Failure",
                "message": format!("request failed with {reason}"),
                "reason": reason,
                "code": code
            })
        }
    }
}
