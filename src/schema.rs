//! Declarative per-kind field tables.
//!
//! Column order of every scalar table mirrors the target relational schema and must stay
//! in lockstep with it: downstream loaders read the tab-delimited files positionally.

use crate::models::EntityKind;

/// A non-repeated attribute written as one column of the scalar channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarField {
    /// Key in the attribute bag.
    pub key: &'static str,
}

/// How one element of a repeated attribute is turned into a relation value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementRule {
    /// The element itself, unwrapping `{"value": ..}`.
    Value,
    /// Final path segment of the element's `key` (`/authors/OL2A` -> `OL2A`).
    KeyTail,
    /// The element's `key`, verbatim (`/languages/eng`).
    Key,
    /// A named sub-field of the element.
    Field(&'static str),
    /// Work author roles: `{"author": {"key": ..}}` or `{"author": "/authors/.."}`.
    AuthorRole,
    /// Like `Value`, merging a following volume qualifier into the same value.
    Series,
}

/// A repeated attribute routed to its own relation channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationField {
    /// Channel suffix: the file is `<table>_<name>.csv`.
    pub name: &'static str,
    /// Key in the attribute bag.
    pub key: &'static str,
    pub rule: ElementRule,
}

#[derive(Debug)]
pub struct EntitySchema {
    pub kind: EntityKind,
    /// Scalar columns after the leading id column.
    pub scalars: &'static [ScalarField],
    pub relations: &'static [RelationField],
}

impl EntitySchema {
    /// Number of columns in a scalar row, id included.
    pub fn column_count(&self) -> usize {
        self.scalars.len() + 1
    }

    pub fn relation_index(&self, name: &str) -> Option<usize> {
        self.relations.iter().position(|r| r.name == name)
    }
}

const fn scalar(key: &'static str) -> ScalarField {
    ScalarField { key }
}

const fn relation(name: &'static str, key: &'static str, rule: ElementRule) -> RelationField {
    RelationField { name, key, rule }
}

const fn list(key: &'static str) -> RelationField {
    relation(key, key, ElementRule::Value)
}

pub static EDITION: EntitySchema = EntitySchema {
    kind: EntityKind::Edition,
    scalars: &[
        scalar("created"),
        scalar("last_modified"),
        scalar("revision"),
        scalar("latest_revision"),
        scalar("title"),
        scalar("subtitle"),
        scalar("title_prefix"),
        scalar("full_title"),
        scalar("copyright_date"),
        scalar("publish_date"),
        scalar("publish_country"),
        scalar("by_statement"),
        scalar("edition_name"),
        scalar("volume_number"),
        scalar("description"),
        scalar("notes"),
        scalar("number_of_pages"),
        scalar("pagination"),
        scalar("translation_of"),
        scalar("dewey_decimal_class"),
    ],
    relations: &[
        list("covers"),
        relation("authors", "authors", ElementRule::KeyTail),
        relation("contributors", "contributors", ElementRule::Field("name")),
        list("genres"),
        relation("languages", "languages", ElementRule::Key),
        relation("translated_from", "translated_from", ElementRule::Key),
        list("lc_classifications"),
        list("lccn"),
        list("publish_places"),
        list("publishers"),
        relation("series", "series", ElementRule::Series),
        list("subjects"),
        list("isbn_10"),
        list("isbn_13"),
        list("work_titles"),
        relation("works", "works", ElementRule::KeyTail),
    ],
};

pub static AUTHOR: EntitySchema = EntitySchema {
    kind: EntityKind::Author,
    scalars: &[
        scalar("created"),
        scalar("last_modified"),
        scalar("revision"),
        scalar("latest_revision"),
        scalar("name"),
        scalar("fuller_name"),
        scalar("personal_name"),
        scalar("birth_date"),
        scalar("death_date"),
        scalar("date"),
        scalar("entity_type"),
        scalar("bio"),
    ],
    relations: &[
        list("photos"),
        list("location"),
        list("alternate_names"),
        relation("links", "links", ElementRule::Field("url")),
    ],
};

pub static WORK: EntitySchema = EntitySchema {
    kind: EntityKind::Work,
    scalars: &[
        scalar("created"),
        scalar("last_modified"),
        scalar("revision"),
        scalar("latest_revision"),
        scalar("title"),
        scalar("subtitle"),
        scalar("first_publish_date"),
        scalar("description"),
        scalar("number_of_editions"),
    ],
    relations: &[
        list("covers"),
        relation("authors", "authors", ElementRule::AuthorRole),
        relation("original_languages", "original_languages", ElementRule::Key),
        list("lc_classifications"),
        list("subjects"),
        list("subject_places"),
        list("subject_people"),
        list("subject_times"),
        list("other_titles"),
        relation("translated_titles", "translated_titles", ElementRule::Field("text")),
        relation("cover_editions", "cover_editions", ElementRule::KeyTail),
        list("dewey_number"),
    ],
};

pub fn schema_for(kind: EntityKind) -> &'static EntitySchema {
    match kind {
        EntityKind::Edition => &EDITION,
        EntityKind::Author => &AUTHOR,
        EntityKind::Work => &WORK,
    }
}
