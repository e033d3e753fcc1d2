use crate::error::UnknownKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Edition,
    Author,
    Work,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Edition, EntityKind::Author, EntityKind::Work];

    /// Value of `type.key` declared by records of this kind.
    pub fn type_key(self) -> &'static str {
        match self {
            EntityKind::Edition => "/type/edition",
            EntityKind::Author => "/type/author",
            EntityKind::Work => "/type/work",
        }
    }

    /// Scalar table name; relation files are prefixed with it as well.
    pub fn table_name(self) -> &'static str {
        match self {
            EntityKind::Edition => "editions",
            EntityKind::Author => "authors",
            EntityKind::Work => "works",
        }
    }

    pub fn from_type_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_key() == key)
    }

    pub(crate) fn index(self) -> usize {
        match self {
            EntityKind::Edition => 0,
            EntityKind::Author => 1,
            EntityKind::Work => 2,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Edition => "edition",
            EntityKind::Author => "author",
            EntityKind::Work => "work",
        };
        f.write_str(name)
    }
}

impl FromStr for EntityKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edition" | "editions" => Ok(EntityKind::Edition),
            "author" | "authors" => Ok(EntityKind::Author),
            "work" | "works" => Ok(EntityKind::Work),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

/// A dump line that passed classification: its kind, id and decoded attribute bag.
#[derive(Debug, Clone)]
pub struct ClassifiedRecord {
    pub kind: EntityKind,
    pub id: String,
    pub bag: Map<String, Value>,
}

/// One row for a kind's scalar channel. `columns[0]` is always the entity id.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarRecord {
    pub kind: EntityKind,
    pub columns: Vec<String>,
}

impl ScalarRecord {
    pub fn id(&self) -> &str {
        &self.columns[0]
    }
}

/// One occurrence for a relation channel; `relation` indexes the kind's relation table.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationRow {
    pub relation: usize,
    pub value: String,
}

/// Everything extracted from one record.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub scalar: ScalarRecord,
    pub relations: Vec<RelationRow>,
    pub field_errors: u64,
    pub unresolved_elements: u64,
}
