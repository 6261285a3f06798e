//! Data models for the graph client.
//!
//! Wire shapes exchanged with the backend service live next to the domain
//! types they are converted into. The server spells the adjacency field
//! `LinkedNodes`; it is renamed to `linked_nodes` on ingestion.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Server-assigned node identity, stable across reloads.
pub type NodeId = i64;

// ============================================================================
// Core Node Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub title: String,
    pub author: String,
    /// Categorical; drives the node color in the presentation layer.
    pub subject: String,
    pub course: Option<i64>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub tags: Vec<String>,
    /// Declared adjacency in declaration order. May name ids that do not exist.
    pub linked_nodes: Vec<NodeId>,
}

impl Node {
    /// Minimal node, mostly useful for tests and fixtures.
    pub fn new(id: NodeId, title: &str, linked_nodes: Vec<NodeId>) -> Self {
        Self {
            id,
            title: title.to_string(),
            author: String::new(),
            subject: String::new(),
            course: None,
            description: None,
            date: None,
            tags: Vec::new(),
            linked_nodes,
        }
    }
}

/// Node as delivered by `GET /api/nodes`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerNode {
    pub id: NodeId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub course: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(rename = "LinkedNodes", default)]
    pub linked_nodes: Option<Vec<NodeId>>,
}

impl From<ServerNode> for Node {
    fn from(n: ServerNode) -> Self {
        Node {
            id: n.id,
            title: n.title,
            author: n.author,
            subject: n.subject,
            course: n.course,
            description: n.description,
            date: n.date,
            tags: n.tags.unwrap_or_default(),
            linked_nodes: n.linked_nodes.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeList {
    #[serde(default)]
    pub nodes: Vec<ServerNode>,
}

// ============================================================================
// Links
// ============================================================================

/// Undirected link between two node ids, derived from declared adjacency.
/// `source` is always the declaring (lower) id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
}

impl Link {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }

    pub fn touches(&self, id: NodeId) -> bool {
        self.source == id || self.target == id
    }

    /// The endpoint opposite `id`, if `id` is one of the endpoints.
    pub fn other(&self, id: NodeId) -> Option<NodeId> {
        if self.source == id {
            Some(self.target)
        } else if self.target == id {
            Some(self.source)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// ============================================================================
// Link Recomputation
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LinkMethod {
    /// Content similarity, computed by the backend's clustering service.
    Embeddings,
    /// Shared tags.
    Tags,
}

impl LinkMethod {
    pub fn endpoint(&self) -> &'static str {
        match self {
            LinkMethod::Embeddings => "/api/cluster",
            LinkMethod::Tags => "/api/tags/link-all",
        }
    }
}

impl fmt::Display for LinkMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkMethod::Embeddings => write!(f, "embeddings"),
            LinkMethod::Tags => write!(f, "tags"),
        }
    }
}

impl FromStr for LinkMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "embeddings" | "cluster" => Ok(LinkMethod::Embeddings),
            "tags" => Ok(LinkMethod::Tags),
            other => Err(Error::Validation(format!("Unknown link method: {}", other))),
        }
    }
}

// ============================================================================
// Create Node
// ============================================================================

/// Request body for `POST /api/nodes`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewNode {
    pub title: String,
    pub author: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl NewNode {
    pub fn new(title: &str, author: &str, subject: &str) -> Self {
        Self {
            title: title.to_string(),
            author: author.to_string(),
            subject: subject.to_string(),
            ..Default::default()
        }
    }

    /// Split a comma-separated tag string, trimming and dropping empties.
    pub fn with_tags_csv(mut self, tags: &str) -> Self {
        self.tags = tags
            .split(',')
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect();
        self
    }

    /// Set the course from form input. Blank input leaves it unset.
    pub fn with_course_str(mut self, course: &str) -> Result<Self> {
        let course = course.trim();
        if course.is_empty() {
            self.course = None;
            return Ok(self);
        }
        let parsed = course
            .parse::<i64>()
            .map_err(|_| Error::Validation(format!("Course must be a number: {}", course)))?;
        self.course = Some(parsed);
        Ok(self)
    }

    pub fn with_description(mut self, description: &str) -> Self {
        let description = description.trim();
        self.description = if description.is_empty() {
            None
        } else {
            Some(description.to_string())
        };
        self
    }

    /// Required fields must be present. The server validates the rest.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("title", &self.title),
            ("author", &self.author),
            ("subject", &self.subject),
        ]
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedNode {
    pub id: NodeId,
}

/// Structured failure payload returned by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_node_renames_linked_nodes() {
        let json = r#"{"id": 4, "title": "Linear Algebra", "author": "Strang",
            "subject": "math", "course": 2, "tags": ["matrices"], "LinkedNodes": [1, 9]}"#;
        let node: Node = serde_json::from_str::<ServerNode>(json).unwrap().into();
        assert_eq!(node.id, 4);
        assert_eq!(node.linked_nodes, vec![1, 9]);
        assert_eq!(node.tags, vec!["matrices".to_string()]);
        assert_eq!(node.course, Some(2));
    }

    #[test]
    fn test_server_node_optional_fields_default() {
        let json = r#"{"id": 1, "title": "T", "author": "A", "subject": "S"}"#;
        let node: Node = serde_json::from_str::<ServerNode>(json).unwrap().into();
        assert!(node.linked_nodes.is_empty());
        assert!(node.tags.is_empty());
        assert_eq!(node.description, None);
    }

    #[test]
    fn test_node_list_without_nodes_field() {
        let list: NodeList = serde_json::from_str("{}").unwrap();
        assert!(list.nodes.is_empty());
    }

    #[test]
    fn test_new_node_tags_csv() {
        let n = NewNode::new("T", "A", "S").with_tags_csv(" rust, ,graphs ,");
        assert_eq!(n.tags, vec!["rust".to_string(), "graphs".to_string()]);
    }

    #[test]
    fn test_new_node_course_parsing() {
        let n = NewNode::new("T", "A", "S").with_course_str(" 3 ").unwrap();
        assert_eq!(n.course, Some(3));
        let n = n.with_course_str("").unwrap();
        assert_eq!(n.course, None);
        assert!(NewNode::new("T", "A", "S").with_course_str("third").is_err());
    }

    #[test]
    fn test_new_node_serializes_without_empty_optionals() {
        let body = serde_json::to_value(NewNode::new("T", "A", "S")).unwrap();
        assert_eq!(body, serde_json::json!({"title": "T", "author": "A", "subject": "S"}));
    }

    #[test]
    fn test_new_node_validation() {
        assert!(NewNode::new("T", "A", "S").validate().is_ok());
        let err = NewNode::new("T", " ", "").validate().unwrap_err();
        assert_eq!(
            err,
            Error::Validation("Missing required fields: author, subject".to_string())
        );
    }

    #[test]
    fn test_link_method_endpoints() {
        assert_eq!(LinkMethod::Embeddings.endpoint(), "/api/cluster");
        assert_eq!(LinkMethod::Tags.endpoint(), "/api/tags/link-all");
        assert_eq!("TAGS".parse::<LinkMethod>().unwrap(), LinkMethod::Tags);
        assert!("jaccard".parse::<LinkMethod>().is_err());
    }

    #[test]
    fn test_link_other_endpoint() {
        let l = Link::new(1, 2);
        assert_eq!(l.other(1), Some(2));
        assert_eq!(l.other(2), Some(1));
        assert_eq!(l.other(3), None);
        assert!(l.touches(2));
    }
}
