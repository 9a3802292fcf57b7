//! Source, domain and scenario REST client

use async_trait::async_trait;
use serde::Deserialize;

use ragchat_core::models::{
    CreateDomainRequest, CreateScenarioRequest, CreateSourceRequest, Domain, Scenario, Source,
};

use crate::base::{ApiResult, DomainApi};
use crate::http::HttpClient;

const SOURCE_PATH: &str = "/api/v1/source";
const DOMAIN_PATH: &str = "/api/v1/domain";
const SCENARIO_PATH: &str = "/api/v1/scenario";

#[derive(Debug, Deserialize)]
struct SourcesResponse {
    #[serde(default)]
    sources: Vec<Source>,
}

#[derive(Debug, Deserialize)]
struct DomainsResponse {
    #[serde(default)]
    domains: Vec<Domain>,
}

#[derive(Debug, Deserialize)]
struct ScenariosResponse {
    #[serde(default)]
    scenarios: Vec<Scenario>,
}

#[derive(Clone)]
pub struct DomainClient {
    http: HttpClient,
}

impl DomainClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DomainApi for DomainClient {
    async fn list_sources(&self) -> ApiResult<Vec<Source>> {
        let resp: SourcesResponse = self.http.get(&format!("{}/list", SOURCE_PATH)).await?;
        Ok(resp.sources)
    }

    async fn create_source(&self, req: &CreateSourceRequest) -> ApiResult<Source> {
        self.http.post(SOURCE_PATH, req).await
    }

    async fn create_domain(&self, req: &CreateDomainRequest) -> ApiResult<Domain> {
        self.http.post(DOMAIN_PATH, req).await
    }

    async fn list_domains(&self, offset: u32, limit: u32) -> ApiResult<Vec<Domain>> {
        let resp: DomainsResponse = self
            .http
            .get_paged(&format!("{}/list", DOMAIN_PATH), offset, limit)
            .await?;
        Ok(resp.domains)
    }

    async fn get_domain(&self, id: i64) -> ApiResult<Domain> {
        self.http.get(&format!("{}/{}", DOMAIN_PATH, id)).await
    }

    async fn create_scenario(&self, req: &CreateScenarioRequest) -> ApiResult<Scenario> {
        self.http.post(SCENARIO_PATH, req).await
    }

    async fn list_scenarios(&self, offset: u32, limit: u32) -> ApiResult<Vec<Scenario>> {
        let resp: ScenariosResponse = self
            .http
            .get_paged(&format!("{}/list", SCENARIO_PATH), offset, limit)
            .await?;
        Ok(resp.scenarios)
    }

    async fn get_scenario(&self, id: i64) -> ApiResult<Scenario> {
        self.http.get(&format!("{}/{}", SCENARIO_PATH, id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::TokenStore;
    use ragchat_core::models::{ModelConfig, MultiQueryConfig, RerankerConfig, SourceType, VectorSearchConfig};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn domain_client(server: &MockServer) -> DomainClient {
        let http = HttpClient::new(server.uri(), Duration::from_secs(5), TokenStore::default())
            .unwrap();
        DomainClient::new(http)
    }

    #[tokio::test]
    async fn test_list_domains_paged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/domain/list"))
            .and(query_param("offset", "0"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "domains": [
                    {"id": 1, "title": "Docs", "sourceIds": [1], "scenarioIds": [5, 9]},
                    {"id": 2, "title": "Wiki"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let domains = domain_client(&server).list_domains(0, 2).await.unwrap();
        assert_eq!(domains.len(), 2);
        assert_eq!(domains[0].scenario_ids, vec![5, 9]);
        assert!(domains[1].source_ids.is_empty());
    }

    #[tokio::test]
    async fn test_get_domain_and_scenario() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/domain/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "title": "HR"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/scenario/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 5,
                "domainId": 7,
                "model": {"modelName": "qwen"}
            })))
            .mount(&server)
            .await;

        let client = domain_client(&server);
        assert_eq!(client.get_domain(7).await.unwrap().title, "HR");
        let scenario = client.get_scenario(5).await.unwrap();
        assert_eq!(scenario.domain_id, 7);
        assert_eq!(scenario.model.model_name, "qwen");
    }

    #[tokio::test]
    async fn test_create_source_posts_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/source"))
            .and(body_json(json!({"title": "site", "typ": 1, "content": "https://a.example"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 11, "title": "site", "typ": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = domain_client(&server)
            .create_source(&CreateSourceRequest {
                title: "site".to_string(),
                typ: SourceType::Web,
                content: "https://a.example".to_string(),
                credentials: None,
                update_params: None,
            })
            .await
            .unwrap();
        assert_eq!(source.id, 11);
        assert_eq!(source.source_type(), Some(SourceType::Web));
    }

    #[tokio::test]
    async fn test_create_domain_and_scenario() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/domain"))
            .and(body_json(json!({"title": "Legal", "sourceIds": [1, 2]})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 3, "title": "Legal", "sourceIds": [1, 2]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/scenario"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 8, "domainId": 3})))
            .mount(&server)
            .await;

        let client = domain_client(&server);
        let domain = client
            .create_domain(&CreateDomainRequest {
                title: "Legal".to_string(),
                source_ids: vec![1, 2],
            })
            .await
            .unwrap();
        assert_eq!(domain.id, 3);

        let scenario = client
            .create_scenario(&CreateScenarioRequest {
                domain_id: 3,
                model: ModelConfig::default(),
                multi_query: MultiQueryConfig::default(),
                reranker: RerankerConfig::default(),
                vector_search: VectorSearchConfig::default(),
            })
            .await
            .unwrap();
        assert_eq!(scenario.id, 8);
    }

    #[tokio::test]
    async fn test_list_sources_and_scenarios() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/source/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sources": [{"id": 1, "title": "a", "typ": 2}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/scenario/list"))
            .and(query_param("offset", "0"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "scenarios": [{"id": 5}, {"id": 6}]
            })))
            .mount(&server)
            .await;

        let client = domain_client(&server);
        assert_eq!(client.list_sources().await.unwrap()[0].typ, 2);
        assert_eq!(client.list_scenarios(0, 10).await.unwrap().len(), 2);
    }
}
