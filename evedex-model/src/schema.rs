use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{IndexKey, ModelError, ModelResult, Record};

/// Describes a collection's primary key and secondary indexes.
///
/// Fields that are not declared here are still stored and filterable, they
/// just cannot be served from an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub name: String,
    /// Field holding the unique key. Always indexed.
    pub primary_key: String,
    /// Secondary indexed fields, in declaration order.
    #[serde(default)]
    pub indexed_fields: Vec<String>,
}

impl CollectionSchema {
    /// Creates and validates a schema.
    pub fn new(
        name: impl Into<String>,
        primary_key: impl Into<String>,
        indexed_fields: impl IntoIterator<Item = impl Into<String>>,
    ) -> ModelResult<Self> {
        let schema = Self {
            name: name.into(),
            primary_key: primary_key.into(),
            indexed_fields: indexed_fields.into_iter().map(Into::into).collect(),
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Parses a comma separated declaration such as `"typeId, typeName"`.
    /// The first entry is the primary key.
    pub fn parse(name: impl Into<String>, declaration: &str) -> ModelResult<Self> {
        let name = name.into();
        let mut fields = declaration.split(',').map(str::trim);
        let primary_key = fields.next().unwrap_or_default().to_string();
        let indexed_fields: Vec<String> = fields.map(str::to_string).collect();
        Self::new(name, primary_key, indexed_fields)
    }

    pub fn validate(&self) -> ModelResult<()> {
        let invalid = |reason: &str| ModelError::InvalidSchema {
            collection: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("collection name is empty"));
        }
        if self.primary_key.is_empty() {
            return Err(invalid("primary key is empty"));
        }

        let mut seen = HashSet::new();
        for field in self.indexed() {
            if field.is_empty() {
                return Err(invalid("indexed field name is empty"));
            }
            if !seen.insert(field) {
                return Err(ModelError::InvalidSchema {
                    collection: self.name.clone(),
                    reason: format!("field '{field}' is declared twice"),
                });
            }
        }
        Ok(())
    }

    /// All indexed fields, primary key first.
    pub fn indexed(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_key.as_str()).chain(self.indexed_fields.iter().map(String::as_str))
    }

    pub fn is_indexed(&self, field: &str) -> bool {
        self.indexed().any(|f| f == field)
    }

    /// Extracts the primary key of a record.
    pub fn key_of(&self, record: &Record) -> ModelResult<IndexKey> {
        record
            .field(&self.primary_key)
            .and_then(IndexKey::from_field)
            .ok_or_else(|| ModelError::MissingPrimaryKey {
                collection: self.name.clone(),
                field: self.primary_key.clone(),
            })
    }
}

/// Collections cached by the browser client, version 1 of the local database.
pub mod builtin {
    use super::CollectionSchema;
    use crate::ModelResult;

    pub const TYPE_NAMES: &str = "typeNames";
    pub const BLUEPRINTS: &str = "blueprints";
    pub const INV_CATEGORIES: &str = "invCategories";
    pub const INV_GROUPS: &str = "invGroups";
    pub const INV_TYPES: &str = "invTypes";

    const DECLARATIONS: [(&str, &str); 5] = [
        (TYPE_NAMES, "typeId, typeName"),
        (
            BLUEPRINTS,
            "productId, blueprintId, blueprintName, productName, activityId, categoryId, groupId",
        ),
        (INV_CATEGORIES, "categoryId, categoryName"),
        (INV_GROUPS, "groupId, groupName"),
        (INV_TYPES, "typeId, marketGroupId"),
    ];

    /// Every built-in schema, in seeding order.
    pub fn all() -> ModelResult<Vec<CollectionSchema>> {
        DECLARATIONS
            .iter()
            .map(|(name, decl)| CollectionSchema::parse(*name, decl))
            .collect()
    }

    /// Looks up one built-in schema by collection name.
    pub fn schema(name: &str) -> Option<ModelResult<CollectionSchema>> {
        DECLARATIONS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(n, decl)| CollectionSchema::parse(*n, decl))
    }
}
