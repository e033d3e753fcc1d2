use crate::error::SkipReason;
use crate::models::{EntityKind, Extracted};
use serde::Serialize;

/// Counters collected during one extraction run
#[derive(Debug, Default, Clone, Serialize)]
pub struct ExtractionStats {
    pub lines_read: u64,
    pub lossy_lines: u64,
    pub editions: u64,
    pub authors: u64,
    pub works: u64,
    pub relation_rows: u64,
    pub field_errors: u64,
    pub unresolved_elements: u64,
    pub skipped_no_marker: u64,
    pub skipped_invalid_json: u64,
    pub skipped_not_object: u64,
    pub skipped_type_mismatch: u64,
    pub skipped_unsupported_type: u64,
    pub skipped_missing_id: u64,
    pub skipped_invalid_id: u64,
}

impl ExtractionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_lines(&mut self) {
        self.lines_read += 1;
    }

    pub fn record_extracted(&mut self, extracted: &Extracted) {
        match extracted.scalar.kind {
            EntityKind::Edition => self.editions += 1,
            EntityKind::Author => self.authors += 1,
            EntityKind::Work => self.works += 1,
        }
        self.relation_rows += extracted.relations.len() as u64;
        self.field_errors += extracted.field_errors;
        self.unresolved_elements += extracted.unresolved_elements;
    }

    pub fn record_skip(&mut self, reason: &SkipReason) {
        let counter = match reason {
            SkipReason::NoTypeMarker => &mut self.skipped_no_marker,
            SkipReason::InvalidJson(_) => &mut self.skipped_invalid_json,
            SkipReason::NotAnObject => &mut self.skipped_not_object,
            SkipReason::TypeMismatch { .. } => &mut self.skipped_type_mismatch,
            SkipReason::UnsupportedType(_) => &mut self.skipped_unsupported_type,
            SkipReason::MissingId => &mut self.skipped_missing_id,
            SkipReason::InvalidId(_) => &mut self.skipped_invalid_id,
        };
        *counter += 1;
    }

    pub fn records(&self) -> u64 {
        self.editions + self.authors + self.works
    }

    pub fn records_of(&self, kind: EntityKind) -> u64 {
        match kind {
            EntityKind::Edition => self.editions,
            EntityKind::Author => self.authors,
            EntityKind::Work => self.works,
        }
    }

    /// Lines that looked like entities but were rejected after parsing
    pub fn malformed(&self) -> u64 {
        self.skipped_invalid_json
            + self.skipped_not_object
            + self.skipped_type_mismatch
            + self.skipped_unsupported_type
            + self.skipped_missing_id
            + self.skipped_invalid_id
    }

    pub fn skipped(&self) -> u64 {
        self.skipped_no_marker + self.malformed()
    }
}
