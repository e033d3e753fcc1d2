//! Shelfmark: bibliographic dump flattening and dictionary normalization
//!
//! This crate turns a raw bibliographic dump (tab-separated lines whose last column is a
//! JSON attribute bag describing an edition, author or work) into tab-delimited files
//! ready for bulk loading into a fixed relational schema:
//!
//! 1. **Extraction Pass** -- Stream the dump once, classify each line, flatten its
//!    attribute bag into one scalar row per entity plus one row per occurrence of every
//!    repeated attribute, and append them to per-table output channels
//! 2. **Normalization Pass** -- For each value domain (places, subjects, languages, ...),
//!    assign every distinct free-text value a dense surrogate id across all of the
//!    domain's relation files, write the key table, and rewrite each relation file with
//!    ids in place of text
//!
//! # Architecture
//!
//! - **Streaming input** -- One line in memory at a time; bz2 dumps are decoded on the fly
//! - **Table-driven extraction** -- Each kind's columns and relations are declared once in
//!   [`schema`]; one generic routine in [`extract`] walks any of them
//! - **Shape probing** -- Attribute bag entries are classified once into a [`fields::FieldShape`]
//!   (absent, scalar, `{value: ..}` wrapper, list, object) before resolution
//! - **Local recovery** -- Malformed lines and odd field shapes are logged and counted;
//!   only I/O failures abort a run
//! - **Scoped channels** -- Every output file is opened once per run and closed on every
//!   exit path
//! - **Per-domain parallelism** -- Independent normalization domains can run concurrently
//!
//! # Key Modules
//!
//! - [`parser`] -- Line-oriented dump reader with BZ2 decompression
//! - [`sanitize`] -- Delimiter-safe text cleanup
//! - [`classify`] -- Entity kind and id detection per dump line
//! - [`schema`] -- Per-kind scalar column and relation tables
//! - [`fields`] -- Field shape probing and scalar resolution
//! - [`extract`] -- Record flattening into scalar and relation rows
//! - [`channels`] -- Tab-delimited output channel set
//! - [`pipeline`] -- Extraction run driver
//! - [`normalize`] -- Dictionary build, key tables and association rewrite
//! - [`stats`] -- Extraction counters
//! - [`models`] -- Core data types (EntityKind, ScalarRecord, RelationRow)
//! - [`error`] -- Recoverable skip and field errors
//! - [`config`] -- Constants and built-in normalization domains
//!
//! # Example Usage
//!
//! ```bash
//! # Flatten editions, authors and works
//! shelfmark extract -i ol_dump_latest.txt -o output/
//!
//! # Dictionary-encode every built-in domain, four domains at a time
//! shelfmark normalize -o output/ --jobs 4
//!
//! # One ad-hoc domain from explicit files
//! shelfmark dictionary --key-table output/places.csv \
//!     output/authors_location.csv output/editions_publish_places.csv
//! ```

pub mod channels;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod fields;
pub mod models;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod sanitize;
pub mod schema;
pub mod stats;
