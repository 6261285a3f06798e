//! Backend REST client.
//!
//! [`NodeService`] is the boundary to the service that stores nodes and
//! computes relationships. [`HttpNodeService`] talks to it over HTTP/JSON.

use crate::error::{Error, Result};
use crate::models::{CreatedNode, ErrorBody, LinkMethod, NewNode, Node, NodeId, NodeList};
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

#[async_trait]
pub trait NodeService: Send + Sync {
    /// `GET /api/nodes`
    async fn list_nodes(&self) -> Result<Vec<Node>>;

    /// `POST /api/nodes`, returning the server-assigned id.
    async fn create_node(&self, node: &NewNode) -> Result<NodeId>;

    /// `DELETE /api/nodes/{id}`
    async fn delete_node(&self, id: NodeId) -> Result<()>;

    /// `POST` to the recompute endpoint for `method`.
    async fn recompute_links(&self, method: LinkMethod) -> Result<()>;
}

// ============================================================================
// HTTP Implementation
// ============================================================================

#[derive(Debug, Clone)]
pub struct HttpNodeService {
    client: reqwest::Client,
    base: Url,
}

impl HttpNodeService {
    pub fn new(base: Url, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base.as_str().trim_end_matches('/'), path)
    }

    /// Turn a non-2xx response into an error, keeping the server's message
    /// when the body carries one.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(ErrorBody { error: Some(msg) }) if !msg.trim().is_empty() => Err(Error::Server(msg)),
            _ => Err(Error::Status {
                status: status.as_u16(),
            }),
        }
    }
}

#[async_trait]
impl NodeService for HttpNodeService {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let response = self.client.get(self.url("/api/nodes")).send().await?;
        let response = Self::check(response).await?;
        let list: NodeList = response.json().await?;
        Ok(list.nodes.into_iter().map(Node::from).collect())
    }

    async fn create_node(&self, node: &NewNode) -> Result<NodeId> {
        let response = self
            .client
            .post(self.url("/api/nodes"))
            .json(node)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let created: CreatedNode = response.json().await?;
        Ok(created.id)
    }

    async fn delete_node(&self, id: NodeId) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/api/nodes/{}", id)))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn recompute_links(&self, method: LinkMethod) -> Result<()> {
        let response = self.client.post(self.url(method.endpoint())).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(uri: &str) -> HttpNodeService {
        HttpNodeService::new(Url::parse(uri).unwrap(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_list_nodes_renames_adjacency() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "nodes": [
                    {"id": 1, "title": "Graphs", "author": "Euler", "subject": "math", "LinkedNodes": [2]},
                    {"id": 2, "title": "Trees", "author": "Cayley", "subject": "math", "tags": ["cs"]}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let nodes = service(&server.uri()).list_nodes().await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].linked_nodes, vec![2]);
        assert!(nodes[1].linked_nodes.is_empty());
        assert_eq!(nodes[1].tags, vec!["cs".to_string()]);
    }

    #[tokio::test]
    async fn test_list_nodes_non_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/nodes"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = service(&server.uri()).list_nodes().await.unwrap_err();
        assert_eq!(err, Error::Status { status: 500 });
    }

    #[tokio::test]
    async fn test_create_node_posts_body_and_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/nodes"))
            .and(body_json(json!({
                "title": "Topology", "author": "Munkres", "subject": "math",
                "course": 3, "tags": ["spaces"]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 17})))
            .expect(1)
            .mount(&server)
            .await;

        let node = NewNode::new("Topology", "Munkres", "math")
            .with_course_str("3")
            .unwrap()
            .with_tags_csv("spaces");
        assert_eq!(service(&server.uri()).create_node(&node).await.unwrap(), 17);
    }

    #[tokio::test]
    async fn test_create_node_surfaces_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/nodes"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "subject is not allowed"})),
            )
            .mount(&server)
            .await;

        let err = service(&server.uri())
            .create_node(&NewNode::new("T", "A", "S"))
            .await
            .unwrap_err();
        assert_eq!(err, Error::Server("subject is not allowed".to_string()));
    }

    #[tokio::test]
    async fn test_create_node_error_without_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/nodes"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&server)
            .await;

        let err = service(&server.uri())
            .create_node(&NewNode::new("T", "A", "S"))
            .await
            .unwrap_err();
        assert_eq!(err, Error::Status { status: 400 });
    }

    #[tokio::test]
    async fn test_delete_node_hits_id_path() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/nodes/12"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        service(&server.uri()).delete_node(12).await.unwrap();
    }

    #[tokio::test]
    async fn test_recompute_endpoints() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cluster"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/tags/link-all"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "tagger offline"})))
            .expect(1)
            .mount(&server)
            .await;

        let svc = service(&server.uri());
        svc.recompute_links(LinkMethod::Embeddings).await.unwrap();
        let err = svc.recompute_links(LinkMethod::Tags).await.unwrap_err();
        assert_eq!(err, Error::Server("tagger offline".to_string()));
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let err = service("http://127.0.0.1:1").list_nodes().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[test]
    fn test_url_keeps_base_prefix() {
        let svc = service("http://localhost:8001/proxy/");
        assert_eq!(svc.url("/api/nodes"), "http://localhost:8001/proxy/api/nodes");
    }
}
