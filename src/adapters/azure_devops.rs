use crate::core::{ConfigProvider, PatchOperation, Project, TrackerConnector, WorkItem, WorkItemTracker};
use crate::utils::error::{EstimatorError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const JSON_PATCH_CONTENT_TYPE: &str = "application/json-patch+json";

#[derive(Debug, Clone)]
pub struct AzureDevOpsSettings {
    pub organization_url: String,
    pub api_version: String,
    pub timeout: Duration,
    pub page_size: usize,
}

impl AzureDevOpsSettings {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self {
            organization_url: config.organization_url().trim_end_matches('/').to_string(),
            api_version: config.api_version().to_string(),
            timeout: Duration::from_secs(config.timeout_seconds()),
            page_size: config.page_size().max(1),
        }
    }
}

#[derive(Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Serialize)]
struct WiqlQuery<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WiqlResult {
    #[serde(default)]
    work_items: Vec<WorkItemReference>,
}

#[derive(Deserialize)]
struct WorkItemReference {
    id: u32,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

fn http_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(concat!("wit-estimator/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// WIQL selecting every work item of a team project.
pub fn team_project_query(project: &str) -> String {
    format!(
        "SELECT [System.Id], [System.Title], [System.State] FROM workitems WHERE [System.TeamProject] = '{}'",
        project.replace('\'', "''")
    )
}

/// Work item tracking client for one organization, authenticated with a
/// personal access token.
#[derive(Clone)]
pub struct AzureDevOpsClient {
    client: Client,
    settings: AzureDevOpsSettings,
    token: String,
}

impl AzureDevOpsClient {
    pub fn new(settings: AzureDevOpsSettings, token: impl Into<String>) -> Result<Self> {
        let client = http_client(settings.timeout)?;
        Ok(Self::with_client(client, settings, token))
    }

    pub fn with_client(client: Client, settings: AzureDevOpsSettings, token: impl Into<String>) -> Self {
        Self {
            client,
            settings,
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/_apis/{}", self.settings.organization_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .basic_auth("", Some(&self.token))
            .query(&[("api-version", self.settings.api_version.as_str())])
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| {
                if body.is_empty() {
                    status.canonical_reason().unwrap_or("unknown error").to_string()
                } else {
                    body
                }
            });

        Err(EstimatorError::AzureDevOpsApi {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl WorkItemTracker for AzureDevOpsClient {
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let page_size = self.settings.page_size;
        let mut projects = Vec::new();
        let mut skip = 0usize;

        loop {
            tracing::debug!("📡 Listing projects (skip={}, top={})", skip, page_size);
            let request = self.authorized(self.client.get(self.url("projects"))).query(&[
                ("$top", page_size.to_string()),
                ("$skip", skip.to_string()),
            ]);
            let response = Self::check(request.send().await?).await?;
            let page: ListResponse<Project> = response.json().await?;

            let fetched = page.value.len();
            projects.extend(page.value);
            if fetched < page_size {
                break;
            }
            skip += fetched;
        }

        Ok(projects)
    }

    async fn query_work_item_ids(&self, project: &str) -> Result<Vec<u32>> {
        let query = team_project_query(project);
        tracing::debug!("📡 WIQL: {}", query);

        let request = self
            .authorized(self.client.post(self.url("wit/wiql")))
            .json(&WiqlQuery { query: &query });
        let response = Self::check(request.send().await?).await?;
        let result: WiqlResult = response.json().await?;

        Ok(result.work_items.into_iter().map(|w| w.id).collect())
    }

    async fn get_work_items(&self, ids: &[u32]) -> Result<Vec<WorkItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = ids.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
        tracing::debug!("📡 Fetching work items: {}", ids);

        let request = self
            .authorized(self.client.get(self.url("wit/workitems")))
            .query(&[("ids", ids.as_str()), ("$expand", "All")]);
        let response = Self::check(request.send().await?).await?;
        let page: ListResponse<WorkItem> = response.json().await?;

        Ok(page.value)
    }

    async fn update_work_item(&self, id: u32, document: &[PatchOperation]) -> Result<()> {
        let body = serde_json::to_vec(document)?;

        let request = self
            .authorized(self.client.patch(self.url(&format!("wit/workitems/{}", id))))
            .header(reqwest::header::CONTENT_TYPE, JSON_PATCH_CONTENT_TYPE)
            .body(body);
        Self::check(request.send().await?).await?;

        Ok(())
    }
}

/// Builds a fresh [`AzureDevOpsClient`] per caller token, sharing one
/// connection pool.
#[derive(Clone)]
pub struct AzureDevOpsConnector {
    client: Client,
    settings: AzureDevOpsSettings,
}

impl AzureDevOpsConnector {
    pub fn new(settings: AzureDevOpsSettings) -> Result<Self> {
        let client = http_client(settings.timeout)?;
        Ok(Self { client, settings })
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        Self::new(AzureDevOpsSettings::from_config(config))
    }
}

impl TrackerConnector for AzureDevOpsConnector {
    type Tracker = AzureDevOpsClient;

    fn connect(&self, token: &str) -> Result<Self::Tracker> {
        if token.trim().is_empty() {
            return Err(EstimatorError::Unauthorized {
                message: "personal access token is empty".to_string(),
            });
        }
        Ok(AzureDevOpsClient::with_client(
            self.client.clone(),
            self.settings.clone(),
            token,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    // base64(":test-pat")
    const AUTH_HEADER: &str = "Basic OnRlc3QtcGF0";

    fn client_for(server: &MockServer, page_size: usize) -> AzureDevOpsClient {
        let settings = AzureDevOpsSettings {
            organization_url: server.base_url(),
            api_version: "7.0".to_string(),
            timeout: Duration::from_secs(5),
            page_size,
        };
        AzureDevOpsClient::new(settings, "test-pat").unwrap()
    }

    #[test]
    fn test_team_project_query_escapes_quotes() {
        assert_eq!(
            team_project_query("O'Brien"),
            "SELECT [System.Id], [System.Title], [System.State] FROM workitems WHERE [System.TeamProject] = 'O''Brien'"
        );
    }

    #[tokio::test]
    async fn test_list_projects_pages_until_short_page() {
        let server = MockServer::start_async().await;

        let first = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/_apis/projects")
                    .query_param("api-version", "7.0")
                    .query_param("$top", "2")
                    .query_param("$skip", "0")
                    .header("authorization", AUTH_HEADER);
                then.status(200).json_body(json!({
                    "count": 2,
                    "value": [
                        {"id": "p1", "name": "CATI", "state": "wellFormed"},
                        {"id": "p2", "name": "Portal", "state": "wellFormed"}
                    ]
                }));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/_apis/projects")
                    .query_param("$top", "2")
                    .query_param("$skip", "2");
                then.status(200).json_body(json!({
                    "count": 1,
                    "value": [{"id": "p3", "name": "Infra"}]
                }));
            })
            .await;

        let projects = client_for(&server, 2).list_projects().await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        let names: Vec<&str> = projects.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["CATI", "Portal", "Infra"]);
    }

    #[tokio::test]
    async fn test_query_work_item_ids_posts_wiql() {
        let server = MockServer::start_async().await;
        let wiql = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/_apis/wit/wiql")
                    .query_param("api-version", "7.0")
                    .header("authorization", AUTH_HEADER)
                    .json_body(json!({"query": team_project_query("CATI")}));
                then.status(200).json_body(json!({
                    "queryType": "flat",
                    "workItems": [
                        {"id": 11, "url": "https://dev.azure.com/contoso/_apis/wit/workItems/11"},
                        {"id": 12, "url": "https://dev.azure.com/contoso/_apis/wit/workItems/12"}
                    ]
                }));
            })
            .await;

        let ids = client_for(&server, 100).query_work_item_ids("CATI").await.unwrap();

        wiql.assert_async().await;
        assert_eq!(ids, vec![11, 12]);
    }

    #[tokio::test]
    async fn test_get_work_items_requests_ids_with_expand() {
        let server = MockServer::start_async().await;
        let fetch = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/_apis/wit/workitems")
                    .query_param("ids", "11,12")
                    .query_param("$expand", "All")
                    .query_param("api-version", "7.0");
                then.status(200).json_body(json!({
                    "count": 2,
                    "value": [
                        {"id": 11, "rev": 4, "fields": {"Custom.Cantidad": 10, "Custom.Meses": 3, "Custom.Valorunitario": 100}},
                        {"id": 12, "rev": 1, "fields": {"System.Title": "Sin datos"}}
                    ]
                }));
            })
            .await;

        let items = client_for(&server, 100).get_work_items(&[11, 12]).await.unwrap();

        fetch.assert_async().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].fields.get("Custom.Meses"), Some(&json!(3)));
        assert!(items[1].fields.get("Custom.Cantidad").is_none());
    }

    #[tokio::test]
    async fn test_get_work_items_with_no_ids_skips_request() {
        let server = MockServer::start_async().await;
        let fetch = server
            .mock_async(|when, then| {
                when.path("/_apis/wit/workitems");
                then.status(500);
            })
            .await;

        let items = client_for(&server, 100).get_work_items(&[]).await.unwrap();

        assert!(items.is_empty());
        assert_eq!(fetch.hits_async().await, 0);
    }

    #[tokio::test]
    async fn test_update_work_item_sends_json_patch() {
        let server = MockServer::start_async().await;
        let update = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::PATCH)
                    .path("/_apis/wit/workitems/11")
                    .query_param("api-version", "7.0")
                    .header("content-type", JSON_PATCH_CONTENT_TYPE)
                    .header("authorization", AUTH_HEADER)
                    .json_body(json!([
                        {"op": "add", "path": "/fields/Custom.ValorTotal", "value": 3000}
                    ]));
                then.status(200).json_body(json!({"id": 11, "rev": 5, "fields": {}}));
            })
            .await;

        let document = vec![PatchOperation::add("/fields/Custom.ValorTotal", json!(3000))];
        client_for(&server, 100)
            .update_work_item(11, &document)
            .await
            .unwrap();

        update.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error_message_is_extracted() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(httpmock::Method::PATCH).path("/_apis/wit/workitems/11");
                then.status(400).json_body(json!({
                    "$id": "1",
                    "message": "TF51535: Cannot find field Custom.ValorTotal.",
                    "typeKey": "WorkItemTrackingFieldDefinitionNotFoundException"
                }));
            })
            .await;

        let document = vec![PatchOperation::add("/fields/Custom.ValorTotal", json!(1))];
        let err = client_for(&server, 100)
            .update_work_item(11, &document)
            .await
            .unwrap_err();

        match err {
            EstimatorError::AzureDevOpsApi { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "TF51535: Cannot find field Custom.ValorTotal.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unauthorized_response_maps_to_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/_apis/projects");
                then.status(401);
            })
            .await;

        let err = client_for(&server, 100).list_projects().await.unwrap_err();

        assert!(matches!(err, EstimatorError::AzureDevOpsApi { status: 401, .. }));
        assert_eq!(
            err.category(),
            crate::utils::error::ErrorCategory::Authentication
        );
    }

    #[test]
    fn test_connector_rejects_empty_token() {
        let connector = AzureDevOpsConnector::new(AzureDevOpsSettings {
            organization_url: "https://dev.azure.com/contoso".to_string(),
            api_version: "7.0".to_string(),
            timeout: Duration::from_secs(5),
            page_size: 100,
        })
        .unwrap();

        assert!(matches!(
            connector.connect("  "),
            Err(EstimatorError::Unauthorized { .. })
        ));
        assert!(connector.connect("test-pat").is_ok());
    }
}
