//! Raw and flattened organization node types

use crate::error::ApiError;
use crate::types::ROOT_PARENT;
use serde::{Deserialize, Deserializer, Serialize};

/// One organizational unit as delivered by the remote API
///
/// Field names follow the remote wire format. Missing identifier fields become empty
/// strings here and are rejected per node by the importer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgNode {
    #[serde(rename = "ID", default, deserialize_with = "lenient_string")]
    pub external_id: String,
    #[serde(rename = "Name", default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "Type", default, deserialize_with = "lenient_string")]
    pub node_type: String,
    #[serde(rename = "TypeId", default, deserialize_with = "lenient_string")]
    pub type_id: String,
    #[serde(
        rename = "OrganizationLevelBelow",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub children: Option<Vec<OrgNode>>,
}

impl OrgNode {
    pub fn new(external_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, node_type: impl Into<String>, type_id: impl Into<String>) -> Self {
        self.node_type = node_type.into();
        self.type_id = type_id.into();
        self
    }

    pub fn with_children(mut self, children: Vec<OrgNode>) -> Self {
        self.children = Some(children);
        self
    }
}

/// Accept strings, numbers and null for identifier-like fields.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(String::new()),
        Some(serde_json::Value::String(s)) => Ok(s),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Ok(b.to_string()),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number, got {}",
            other
        ))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Many(Vec<OrgNode>),
    One(OrgNode),
}

/// Parse a raw org chart document into its top-level units.
///
/// The remote API returns an array of top-level units; a single object is accepted
/// as a one-element document.
pub fn parse_document(raw: &str) -> Result<Vec<OrgNode>, ApiError> {
    let document: Document = serde_json::from_str(raw)
        .map_err(|e| ApiError::InvalidDocument(format!("Failed to parse org chart: {}", e)))?;
    Ok(match document {
        Document::Many(roots) => roots,
        Document::One(root) => vec![root],
    })
}

/// Intermediate record produced by the flattener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatNode {
    pub external_id: String,
    pub name: String,
    pub node_type: String,
    pub type_id: String,
    /// External id of the node whose children yielded this one, `"0"` for roots
    pub parent_external_id: String,
}

impl FlatNode {
    pub(crate) fn from_org(node: &OrgNode, parent_external_id: &str) -> Self {
        Self {
            external_id: node.external_id.clone(),
            name: node.name.clone(),
            node_type: node.node_type.clone(),
            type_id: node.type_id.clone(),
            parent_external_id: parent_external_id.to_string(),
        }
    }

    /// A root record with the given id and name (tests, offline imports)
    pub fn root(external_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::child(external_id, name, ROOT_PARENT)
    }

    pub fn child(
        external_id: impl Into<String>,
        name: impl Into<String>,
        parent_external_id: impl Into<String>,
    ) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            node_type: String::new(),
            type_id: String::new(),
            parent_external_id: parent_external_id.into(),
        }
    }
}
