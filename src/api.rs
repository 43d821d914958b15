use crate::catalog::ResourceKind;
use crate::dispatch::ActionRequest;
use crate::error::{ApiError, ApiResult};
use crate::lifecycle::{ScaleDirection, ScalingReport};
use crate::model::{ClusterSummary, ResourceRow, UpgradeStatus};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ActionReply {
    /// Viewer text for logs, describe and yaml.
    Content(String),
    /// Mutation accepted; carries the backend's summary when it sent one.
    Done(Option<String>),
}

/// HTTP client for the console backend.
#[derive(Debug, Clone)]
pub struct ConsoleApi {
    client: Client,
    base: Url,
    tail_lines: u32,
}

impl ConsoleApi {
    pub fn new(base: &str, timeout: Duration, tail_lines: u32) -> ApiResult<Self> {
        let base =
            Url::parse(base).map_err(|err| ApiError::InvalidUrl(format!("{base}: {err}")))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base.to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            tail_lines,
        })
    }

    fn url<S: AsRef<str>>(&self, segments: &[S]) -> ApiResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments.iter().map(AsRef::as_ref));
        Ok(url)
    }

    fn request<S: AsRef<str>>(&self, method: Method, segments: &[S]) -> ApiResult<RequestBuilder> {
        Ok(self.client.request(method, self.url(segments)?))
    }

    pub async fn list_clusters(&self) -> ApiResult<Vec<ClusterSummary>> {
        let builder = self.request(Method::GET, &["eks", "clusters"])?;
        let payload = send(builder, "Failed to load clusters").await?;
        decode_field(payload, "clusters")
    }

    pub async fn connect(&self, cluster: &str) -> ApiResult<String> {
        let builder = self.request(Method::POST, &["eks", "clusters", cluster, "connect"])?;
        let payload = send(builder, "Failed to connect to cluster").await?;
        Ok(text_field(&payload, "message").unwrap_or_else(|| format!("Connected to {cluster}")))
    }

    pub async fn list_namespaces(&self, cluster: &str) -> ApiResult<Vec<String>> {
        let builder = self.request(Method::GET, &["clusters", cluster, "namespaces"])?;
        let payload = send(builder, "Failed to load namespaces").await?;
        let items = payload
            .get("namespaces")
            .and_then(Value::as_array)
            .ok_or_else(|| ApiError::InvalidResponse("missing 'namespaces' array".to_string()))?;
        Ok(items
            .iter()
            .filter_map(|item| item.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    pub async fn list_resources(
        &self,
        cluster: &str,
        kind: &ResourceKind,
    ) -> ApiResult<Vec<ResourceRow>> {
        let builder = self.request(Method::GET, &["clusters", cluster, kind.list_endpoint])?;
        let fallback = format!("Failed to load {}", kind.label.to_lowercase());
        let payload = send(builder, &fallback).await?;
        let Some(Value::Array(items)) = payload.get(kind.response_field).cloned() else {
            return Err(ApiError::InvalidResponse(format!(
                "missing '{}' array",
                kind.response_field
            )));
        };
        let rows = items
            .into_iter()
            .filter_map(ResourceRow::from_json)
            .collect::<Vec<_>>();
        debug!(cluster, kind = kind.key, rows = rows.len(), "resources listed");
        Ok(rows)
    }

    pub async fn run_action(&self, request: &ActionRequest) -> ApiResult<ActionReply> {
        let endpoint = request.endpoint(self.tail_lines);
        let mut builder = self.request(endpoint.method.clone(), endpoint.segments.as_slice())?;
        if !endpoint.query.is_empty() {
            builder = builder.query(&endpoint.query);
        }
        debug!(method = %endpoint.method, action = %request.title(), "dispatching row action");
        let payload = send(builder, request.failure_fallback()).await?;

        match request.content_field() {
            Some(field) => text_field(&payload, field)
                .map(ActionReply::Content)
                .ok_or_else(|| ApiError::InvalidResponse(format!("missing '{field}' text"))),
            None => Ok(ActionReply::Done(text_field(&payload, "message").or_else(
                || text_field(&payload, "jobName").map(|job| format!("created job {job}")),
            ))),
        }
    }

    pub async fn scale_cluster(
        &self,
        cluster: &str,
        direction: ScaleDirection,
    ) -> ApiResult<String> {
        let verb = match direction {
            ScaleDirection::Down => "scale-down",
            ScaleDirection::Up => "scale-up",
        };
        let builder = self.request(Method::POST, &["eks", "clusters", cluster, verb])?;
        let payload = send(builder, direction.failure_fallback()).await?;
        Ok(text_field(&payload, "message")
            .unwrap_or_else(|| format!("{} {cluster}...", direction.verb())))
    }

    pub async fn scaling_status(&self, cluster: &str) -> ApiResult<ScalingReport> {
        let builder = self.request(Method::GET, &["eks", "clusters", cluster, "scaling-status"])?;
        decode(send(builder, "Failed to fetch scaling status").await?)
    }

    pub async fn upgrade_status(&self, cluster: &str) -> ApiResult<UpgradeStatus> {
        let builder = self.request(Method::GET, &["eks", "clusters", cluster, "upgrade-status"])?;
        decode(send(builder, "Failed to fetch upgrade status").await?)
    }
}

/// Sends the request and folds every failure shape into `ApiError`: non-2xx
/// statuses, a 2xx payload carrying `error`, and `success: false`.
async fn send(builder: RequestBuilder, fallback: &str) -> ApiResult<Value> {
    let response = builder.send().await?;
    let status = response.status();
    let body = response.text().await?;
    let payload = if body.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str::<Value>(&body) {
            Ok(value) => value,
            Err(_) if !status.is_success() => Value::Null,
            Err(err) => return Err(ApiError::InvalidResponse(err.to_string())),
        }
    };

    if !status.is_success() {
        let message = failure_message(&payload);
        warn!(
            status = status.as_u16(),
            error = message.as_deref().unwrap_or(fallback),
            "backend call failed"
        );
        return Err(ApiError::application(status.as_u16(), message, fallback));
    }

    if let Some(error) = text_field(&payload, "error")
        && !error.trim().is_empty()
    {
        return Err(ApiError::application(status.as_u16(), Some(error), fallback));
    }
    if payload.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(ApiError::application(
            status.as_u16(),
            text_field(&payload, "detail"),
            fallback,
        ));
    }

    Ok(payload)
}

fn failure_message(payload: &Value) -> Option<String> {
    ["detail", "error", "message"]
        .into_iter()
        .find_map(|field| match payload.get(field)? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        })
}

fn text_field(payload: &Value, field: &str) -> Option<String> {
    payload.get(field).and_then(Value::as_str).map(str::to_string)
}

fn decode<T: DeserializeOwned>(payload: Value) -> ApiResult<T> {
    serde_json::from_value(payload).map_err(|err| ApiError::InvalidResponse(err.to_string()))
}

fn decode_field<T: DeserializeOwned>(mut payload: Value, field: &str) -> ApiResult<T> {
    let value = payload
        .get_mut(field)
        .map(Value::take)
        .ok_or_else(|| ApiError::InvalidResponse(format!("missing '{field}'")))?;
    decode(value)
}

#[cfg(test)]
mod tests {
    use super::{ActionReply, ConsoleApi};
    use crate::catalog::Catalog;
    use crate::dispatch::{ActionRequest, ActionTarget};
    use crate::error::ApiError;
    use crate::lifecycle::ScaleDirection;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> ConsoleApi {
        ConsoleApi::new(&format!("{}/api", server.uri()), Duration::from_secs(5), 500).unwrap()
    }

    fn target(kind: &str, namespace: Option<&str>, name: &str) -> ActionTarget {
        let catalog = Catalog::validated().unwrap();
        ActionTarget {
            cluster: "prod".to_string(),
            kind: catalog.by_key(kind).unwrap(),
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn list_resources_reads_response_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/clusters/prod/all-pods"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "pods": [
                    {"namespace": "default", "name": "web-1", "status": "Running"},
                    {"namespace": "default", "name": "web-2", "status": "Pending"}
                ]
            })))
            .mount(&server)
            .await;

        let catalog = Catalog::validated().unwrap();
        let rows = api(&server)
            .list_resources("prod", catalog.by_key("pods").unwrap())
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name(), Some("web-2"));
    }

    #[tokio::test]
    async fn error_field_on_success_status_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/clusters/prod/all-deployments"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "deployments": [],
                "error": "Unable to connect to the server"
            })))
            .mount(&server)
            .await;

        let catalog = Catalog::validated().unwrap();
        let error = api(&server)
            .list_resources("prod", catalog.by_key("deployments").unwrap())
            .await
            .unwrap_err();
        assert_eq!(error.user_message(), "Unable to connect to the server");
    }

    #[tokio::test]
    async fn delete_surfaces_detail_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/clusters/prod/resources/pod/default/web-1"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({"detail": "pods \"web-1\" is forbidden"})),
            )
            .mount(&server)
            .await;

        let request = ActionRequest::Delete {
            target: target("pods", Some("default"), "web-1"),
        };
        let error = api(&server).run_action(&request).await.unwrap_err();
        assert!(matches!(error, ApiError::Application { status: 403, .. }));
        assert_eq!(error.user_message(), "pods \"web-1\" is forbidden");
    }

    #[tokio::test]
    async fn failure_without_detail_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/clusters/prod/deployments/default/api/restart"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let request = ActionRequest::Restart {
            target: target("deployments", Some("default"), "api"),
        };
        let error = api(&server).run_action(&request).await.unwrap_err();
        assert_eq!(error.user_message(), "Failed to restart");
    }

    #[tokio::test]
    async fn logs_send_previous_and_tail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/clusters/prod/pods/default/web-1/logs"))
            .and(query_param("previous", "true"))
            .and(query_param("tail", "500"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"logs": "line one\nline two"})),
            )
            .mount(&server)
            .await;

        let request = ActionRequest::Logs {
            target: target("pods", Some("default"), "web-1"),
            previous: true,
        };
        let reply = api(&server).run_action(&request).await.unwrap();
        assert_eq!(reply, ActionReply::Content("line one\nline two".to_string()));
    }

    #[tokio::test]
    async fn scale_sends_replicas_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/clusters/prod/deployments/default/api/scale"))
            .and(query_param("replicas", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "scaled"})))
            .expect(1)
            .mount(&server)
            .await;

        let request = ActionRequest::Scale {
            target: target("deployments", Some("default"), "api"),
            replicas: 3,
        };
        let reply = api(&server).run_action(&request).await.unwrap();
        assert_eq!(reply, ActionReply::Done(Some("scaled".to_string())));
    }

    #[tokio::test]
    async fn cluster_scale_down_reports_unsuccessful_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/eks/clusters/prod/scale-down"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
            .mount(&server)
            .await;

        let error = api(&server)
            .scale_cluster("prod", ScaleDirection::Down)
            .await
            .unwrap_err();
        assert_eq!(error.user_message(), "Scale down failed");
    }

    #[tokio::test]
    async fn scaling_status_decodes_nodegroups() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/eks/clusters/prod/scaling-status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "clusterName": "prod",
                "clusterState": "running",
                "totalDesiredNodes": 3,
                "nodegroups": [
                    {"name": "general", "status": "ACTIVE", "desiredSize": 3, "minSize": 1, "maxSize": 6,
                     "capacityType": "ON_DEMAND"}
                ]
            })))
            .mount(&server)
            .await;

        let report = api(&server).scaling_status("prod").await.unwrap();
        assert_eq!(report.total_desired_nodes, 3);
        assert_eq!(report.nodegroups[0].max_size, 6);
    }

    #[tokio::test]
    async fn clusters_and_namespaces_are_listed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/eks/clusters"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "clusters": [{"name": "prod", "status": "ACTIVE", "version": "1.29", "arn": "arn:x"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/clusters/prod/namespaces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "namespaces": [{"name": "default", "status": "Active"}, {"name": "kube-system"}]
            })))
            .mount(&server)
            .await;

        let api = api(&server);
        let clusters = api.list_clusters().await.unwrap();
        assert_eq!(clusters[0].name, "prod");
        assert_eq!(clusters[0].version.as_deref(), Some("1.29"));
        assert_eq!(
            api.list_namespaces("prod").await.unwrap(),
            vec!["default", "kube-system"]
        );
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let api = ConsoleApi::new("http://127.0.0.1:9/api", Duration::from_secs(2), 500).unwrap();
        let error = api.list_clusters().await.unwrap_err();
        assert!(matches!(error, ApiError::Transport(_)));
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(matches!(
            ConsoleApi::new("not a url", Duration::from_secs(1), 500),
            Err(ApiError::InvalidUrl(_))
        ));
    }
}
