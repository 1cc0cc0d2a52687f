/*!
 * Database entity models.
 *
 * Records map directly to the catalog tables; `to_ref` turns them into the
 * snapshots the orchestrator works with.
 */

use serde::{Deserialize, Serialize};

use crate::model::{KeyRef, LanguageRef, ProjectRef};

/// Project record from the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: i64,
    /// Organization billed for machine translation
    pub organization_id: i64,
    pub ai_description: Option<String>,
}

impl ProjectRecord {
    pub fn new(id: i64, organization_id: i64) -> Self {
        Self {
            id,
            organization_id,
            ai_description: None,
        }
    }

    pub fn with_ai_description(mut self, description: impl Into<String>) -> Self {
        self.ai_description = Some(description.into());
        self
    }

    pub fn to_ref(&self) -> ProjectRef {
        ProjectRef {
            id: self.id,
            organization_owner_id: self.organization_id,
            ai_description: self.ai_description.clone(),
        }
    }
}

/// Language record from the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageRecord {
    /// Assigned on insert
    pub id: i64,
    pub project_id: i64,
    pub tag: String,
    /// Display name, e.g. "German"
    pub name: Option<String>,
    pub ai_description: Option<String>,
    pub is_base: bool,
}

impl LanguageRecord {
    pub fn new(project_id: i64, tag: impl Into<String>) -> Self {
        Self {
            id: 0,
            project_id,
            tag: tag.into(),
            name: None,
            ai_description: None,
            is_base: false,
        }
    }

    pub fn base(project_id: i64, tag: impl Into<String>) -> Self {
        Self {
            is_base: true,
            ..Self::new(project_id, tag)
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_ai_description(mut self, description: impl Into<String>) -> Self {
        self.ai_description = Some(description.into());
        self
    }

    pub fn to_ref(&self) -> LanguageRef {
        LanguageRef {
            id: self.id,
            tag: self.tag.clone(),
            ai_description: self.ai_description.clone(),
        }
    }
}

/// Key record from the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Assigned on insert
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
}

impl KeyRecord {
    pub fn new(project_id: i64, name: impl Into<String>) -> Self {
        Self {
            id: 0,
            project_id,
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn to_ref(&self) -> KeyRef {
        KeyRef {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }
}
