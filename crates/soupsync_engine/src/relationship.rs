//! Parent/children relationship definitions.
//!
//! A [`RelationshipSpec`] names the remote parent and children types, the
//! fields fetched for each, and the fields linking a child to its parent.
//! It is built once per sync definition and never changes afterwards.

use crate::config::{DEFAULT_ID_FIELD, DEFAULT_MODIFICATION_DATE_FIELD};
use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};

fn default_id_field() -> String {
    DEFAULT_ID_FIELD.to_string()
}

fn default_modification_date_field() -> String {
    DEFAULT_MODIFICATION_DATE_FIELD.to_string()
}

/// How a child's lifecycle depends on its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    /// Children go away with their parent.
    MasterDetail,
    /// Children outlive their parent.
    Lookup,
}

impl RelationshipType {
    /// Returns true if deleting a parent deletes its children.
    pub fn cascades(&self) -> bool {
        matches!(self, RelationshipType::MasterDetail)
    }
}

/// The parent side of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentInfo {
    #[serde(rename = "sobjectType")]
    sobject_type: String,
    #[serde(rename = "idFieldName", default = "default_id_field")]
    id_field: String,
    #[serde(
        rename = "modificationDateFieldName",
        default = "default_modification_date_field"
    )]
    modification_date_field: String,
    #[serde(rename = "soupName", default, skip_serializing_if = "Option::is_none")]
    soup_name: Option<String>,
}

impl ParentInfo {
    /// Creates parent info with the default id and modification-date fields.
    pub fn new(sobject_type: impl Into<String>) -> Self {
        Self::with_fields(
            sobject_type,
            DEFAULT_ID_FIELD,
            DEFAULT_MODIFICATION_DATE_FIELD,
        )
    }

    /// Creates parent info with explicit id and modification-date fields.
    pub fn with_fields(
        sobject_type: impl Into<String>,
        id_field: impl Into<String>,
        modification_date_field: impl Into<String>,
    ) -> Self {
        Self {
            sobject_type: sobject_type.into(),
            id_field: id_field.into(),
            modification_date_field: modification_date_field.into(),
            soup_name: None,
        }
    }

    /// Sets the local soup holding parent records.
    pub fn with_soup(mut self, soup_name: impl Into<String>) -> Self {
        self.soup_name = Some(soup_name.into());
        self
    }

    /// Remote entity type.
    pub fn sobject_type(&self) -> &str {
        &self.sobject_type
    }

    /// Remote id field.
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Remote modification-date field.
    pub fn modification_date_field(&self) -> &str {
        &self.modification_date_field
    }

    /// Local soup, if the definition names one.
    pub fn soup_name(&self) -> Option<&str> {
        self.soup_name.as_deref()
    }
}

/// The children side of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildrenInfo {
    #[serde(rename = "sobjectType")]
    sobject_type: String,
    #[serde(rename = "sobjectTypePlural")]
    sobject_type_plural: String,
    #[serde(rename = "idFieldName", default = "default_id_field")]
    id_field: String,
    #[serde(
        rename = "modificationDateFieldName",
        default = "default_modification_date_field"
    )]
    modification_date_field: String,
    #[serde(rename = "soupName")]
    soup_name: String,
    #[serde(rename = "parentIdFieldName")]
    parent_id_field: String,
    #[serde(rename = "parentLocalIdFieldName")]
    parent_local_id_field: String,
}

impl ChildrenInfo {
    /// Creates children info with the default id and modification-date fields.
    pub fn new(
        sobject_type: impl Into<String>,
        sobject_type_plural: impl Into<String>,
        soup_name: impl Into<String>,
        parent_id_field: impl Into<String>,
        parent_local_id_field: impl Into<String>,
    ) -> Self {
        Self::with_fields(
            sobject_type,
            sobject_type_plural,
            DEFAULT_ID_FIELD,
            DEFAULT_MODIFICATION_DATE_FIELD,
            soup_name,
            parent_id_field,
            parent_local_id_field,
        )
    }

    /// Creates children info with explicit id and modification-date fields.
    pub fn with_fields(
        sobject_type: impl Into<String>,
        sobject_type_plural: impl Into<String>,
        id_field: impl Into<String>,
        modification_date_field: impl Into<String>,
        soup_name: impl Into<String>,
        parent_id_field: impl Into<String>,
        parent_local_id_field: impl Into<String>,
    ) -> Self {
        Self {
            sobject_type: sobject_type.into(),
            sobject_type_plural: sobject_type_plural.into(),
            id_field: id_field.into(),
            modification_date_field: modification_date_field.into(),
            soup_name: soup_name.into(),
            parent_id_field: parent_id_field.into(),
            parent_local_id_field: parent_local_id_field.into(),
        }
    }

    /// Remote entity type.
    pub fn sobject_type(&self) -> &str {
        &self.sobject_type
    }

    /// Relationship name used for the nested sub-query and payload key.
    pub fn sobject_type_plural(&self) -> &str {
        &self.sobject_type_plural
    }

    /// Remote id field.
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Remote modification-date field.
    pub fn modification_date_field(&self) -> &str {
        &self.modification_date_field
    }

    /// Local soup holding child records.
    pub fn soup_name(&self) -> &str {
        &self.soup_name
    }

    /// Field holding the parent's remote id.
    pub fn parent_id_field(&self) -> &str {
        &self.parent_id_field
    }

    /// Field holding the parent's local row id.
    pub fn parent_local_id_field(&self) -> &str {
        &self.parent_local_id_field
    }
}

/// A complete parent/children sync definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipSpec {
    parent: ParentInfo,
    #[serde(rename = "parentFieldlist")]
    parent_fields: Vec<String>,
    #[serde(rename = "parentSoqlFilter", default)]
    parent_filter: String,
    children: ChildrenInfo,
    #[serde(rename = "childrenFieldlist")]
    children_fields: Vec<String>,
    #[serde(rename = "relationshipType")]
    relationship_type: RelationshipType,
}

impl RelationshipSpec {
    /// Creates a relationship spec.
    ///
    /// An empty `parent_filter` means no filter.
    pub fn new<P, C>(
        parent: ParentInfo,
        parent_fields: P,
        parent_filter: impl Into<String>,
        children: ChildrenInfo,
        children_fields: C,
        relationship_type: RelationshipType,
    ) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            parent,
            parent_fields: parent_fields.into_iter().map(Into::into).collect(),
            parent_filter: parent_filter.into(),
            children,
            children_fields: children_fields.into_iter().map(Into::into).collect(),
            relationship_type,
        }
    }

    /// Building a hierarchical definition from a raw query is not supported.
    ///
    /// # Errors
    ///
    /// Always returns [`SyncError::Config`]: the nested children shape cannot
    /// be recovered from an opaque query.
    pub fn from_query(query: &str) -> SyncResult<Self> {
        Err(SyncError::config(format!(
            "parent/children sync cannot be built from a raw query: {query}"
        )))
    }

    /// Parses a definition persisted with [`RelationshipSpec::to_json`].
    pub fn from_json(json: &str) -> SyncResult<Self> {
        let spec: Self = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Serializes the definition.
    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn validate(&self) -> SyncResult<()> {
        let required = [
            ("parent sobjectType", self.parent.sobject_type()),
            ("parent idFieldName", self.parent.id_field()),
            ("children sobjectTypePlural", self.children.sobject_type_plural()),
            ("children idFieldName", self.children.id_field()),
            ("children soupName", self.children.soup_name()),
            ("children parentIdFieldName", self.children.parent_id_field()),
            (
                "children parentLocalIdFieldName",
                self.children.parent_local_id_field(),
            ),
        ];
        match required.iter().find(|(_, value)| value.is_empty()) {
            Some((name, _)) => Err(SyncError::config(format!("{name} must not be empty"))),
            None => Ok(()),
        }
    }

    /// Parent side.
    pub fn parent(&self) -> &ParentInfo {
        &self.parent
    }

    /// Parent fields, in fetch order.
    pub fn parent_fields(&self) -> &[String] {
        &self.parent_fields
    }

    /// Parent filter; empty means none.
    pub fn parent_filter(&self) -> &str {
        &self.parent_filter
    }

    /// Children side.
    pub fn children(&self) -> &ChildrenInfo {
        &self.children
    }

    /// Children fields, in fetch order.
    pub fn children_fields(&self) -> &[String] {
        &self.children_fields
    }

    /// Relationship type.
    pub fn relationship_type(&self) -> RelationshipType {
        self.relationship_type
    }
}
