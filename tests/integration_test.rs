//! End-to-end tests for the extraction pass.
//!
//! Each test writes a small dump fixture (plain or BZ2), runs [`run_extraction`] into
//! its own `TempDir`, and checks the tab-delimited files that come out:
//!
//! - **Scenario** -- The canonical two-column edition line with an embedded tab
//! - **Filtering** -- Id prefix check, prefix-only type markers, disabled kinds
//! - **Series** -- Volume qualifiers merged across a whole run
//! - **Reruns** -- Outputs truncated, never appended
//! - **Input formats** -- BZ2 dumps and invalid UTF-8

use bzip2::write::BzEncoder;
use bzip2::Compression;
use shelfmark::channels::{relation_path, scalar_path};
use shelfmark::models::EntityKind;
use shelfmark::pipeline::{run_extraction, ExtractConfig, ExtractionSummary};
use shelfmark::schema::schema_for;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::{NamedTempFile, TempDir};

/// Helper: write a plain-text dump fixture.
fn dump_file(content: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().unwrap();
    tmp.write_all(content.as_bytes()).unwrap();
    tmp.flush().unwrap();
    tmp
}

/// Helper: write a BZ2-compressed dump fixture with a `.bz2` name.
fn create_bz2_dump(content: &str) -> NamedTempFile {
    let mut encoder = BzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(content.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut tmp = tempfile::Builder::new().suffix(".bz2").tempfile().unwrap();
    tmp.write_all(&compressed).unwrap();
    tmp.flush().unwrap();
    tmp
}

fn config(input: &Path, output: &Path) -> ExtractConfig {
    ExtractConfig {
        input: input.to_string_lossy().into_owned(),
        output_dir: output.to_path_buf(),
        kinds: EntityKind::ALL.to_vec(),
        limit: None,
        bz2: false,
    }
}

fn extract_all(content: &str) -> (TempDir, ExtractionSummary) {
    let input = dump_file(content);
    let out = TempDir::new().unwrap();
    let summary = run_extraction(&config(input.path(), out.path())).unwrap();
    (out, summary)
}

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Helper: one dump line in the full five-column layout.
fn dump_line(type_key: &str, key: &str, json: &str) -> String {
    format!("{}\t{}\t1\t2010-03-11T23:51:36.723486\t{}\n", type_key, key, json)
}

/// Sample dump: one of each kind, a redirect and a truncated record.
fn sample_dump() -> String {
    [
        dump_line(
            "/type/edition",
            "/books/OL1M",
            r#"{"type": {"key": "/type/edition"}, "key": "/books/OL1M", "title": "The Dispossessed", "publish_places": ["New York"], "authors": [{"key": "/authors/OL2A"}], "series": ["Hainish Cycle", "Vol. 5"], "languages": [{"key": "/languages/eng"}], "number_of_pages": 341}"#,
        ),
        dump_line(
            "/type/author",
            "/authors/OL2A",
            r#"{"type": {"key": "/type/author"}, "key": "/authors/OL2A", "name": "Ursula K. Le Guin", "location": "Portland", "bio": {"type": "/type/text", "value": "Writer\nof many books"}}"#,
        ),
        dump_line(
            "/type/work",
            "/works/OL3W",
            r#"{"type": {"key": "/type/work"}, "key": "/works/OL3W", "title": "The Dispossessed", "authors": [{"type": {"key": "/type/author_role"}, "author": {"key": "/authors/OL2A"}}], "subjects": ["Anarchism", "Utopias"]}"#,
        ),
        dump_line(
            "/type/redirect",
            "/books/OL9M",
            r#"{"type": {"key": "/type/redirect"}, "location": "/books/OL1M"}"#,
        ),
        dump_line(
            "/type/edition",
            "/books/OL4M",
            r#"{"key": "/books/OL4M", "title": "Truncated"#,
        ),
    ]
    .concat()
}

#[test]
fn test_edition_scenario_line() {
    let line = "/type/edition\t{\"key\":\"/books/OL1M\",\"title\":\"Foo\\tBar\",\"authors\":[{\"key\":\"/authors/OL2A\"}]}\n";
    let (out, summary) = extract_all(line);

    assert_eq!(summary.stats.editions, 1);
    let rows = lines(&scalar_path(out.path(), EntityKind::Edition));
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("OL1M\t\t\t\t\tFoo Bar\t"));
    assert_eq!(
        rows[0].split('\t').count(),
        schema_for(EntityKind::Edition).column_count()
    );

    let authors = lines(&relation_path(out.path(), EntityKind::Edition, "authors"));
    assert_eq!(authors, ["OL1M\tOL2A"]);
}

#[test]
fn test_sample_dump_counts() {
    let (_out, summary) = extract_all(&sample_dump());
    let stats = &summary.stats;

    assert_eq!(stats.lines_read, 5);
    assert_eq!(stats.editions, 1);
    assert_eq!(stats.authors, 1);
    assert_eq!(stats.works, 1);
    assert_eq!(stats.skipped_no_marker, 1);
    assert_eq!(stats.skipped_invalid_json, 1);
    assert_eq!(stats.skipped(), 2);
}

#[test]
fn test_every_scalar_row_has_declared_width() {
    let (out, _summary) = extract_all(&sample_dump());

    for kind in EntityKind::ALL {
        let expected = schema_for(kind).column_count();
        for row in lines(&scalar_path(out.path(), kind)) {
            assert_eq!(row.split('\t').count(), expected, "{} row: {}", kind, row);
        }
    }
}

#[test]
fn test_relation_files_have_two_columns() {
    let (out, summary) = extract_all(&sample_dump());

    for path in &summary.files {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        if ["editions.csv", "authors.csv", "works.csv"].contains(&name.as_str()) {
            continue;
        }
        for row in lines(path) {
            assert_eq!(row.split('\t').count(), 2, "{}: {}", name, row);
        }
    }

    assert_eq!(
        lines(&relation_path(out.path(), EntityKind::Author, "location")),
        ["OL2A\tPortland"]
    );
    assert_eq!(
        lines(&relation_path(out.path(), EntityKind::Work, "authors")),
        ["OL3W\tOL2A"]
    );
    assert_eq!(
        lines(&relation_path(out.path(), EntityKind::Work, "subjects")),
        ["OL3W\tAnarchism", "OL3W\tUtopias"]
    );
    assert_eq!(
        lines(&relation_path(out.path(), EntityKind::Edition, "languages")),
        ["OL1M\t/languages/eng"]
    );
}

#[test]
fn test_wrapped_text_is_sanitized() {
    let (out, _summary) = extract_all(&sample_dump());
    let rows = lines(&scalar_path(out.path(), EntityKind::Author));
    assert_eq!(rows.len(), 1);
    assert!(rows[0].ends_with("\tWriter of many books"));
}

#[test]
fn test_series_merge_end_to_end() {
    let (out, _summary) = extract_all(&sample_dump());
    assert_eq!(
        lines(&relation_path(out.path(), EntityKind::Edition, "series")),
        ["OL1M\tHainish Cycle Vol. 5"]
    );
}

#[test]
fn test_id_prefix_filter() {
    let content = concat!(
        "/type/edition\t/type/editions/NOTOL123\t1\t2010\t{\"key\": \"/type/editions/NOTOL123\", \"title\": \"Bad\"}\n",
        "/type/edition\t/books/OL5M\t1\t2010\t{\"key\": \"/books/OL5M\", \"title\": \"Good\"}\n",
    );
    let (out, summary) = extract_all(content);

    assert_eq!(summary.stats.skipped_invalid_id, 1);
    let ids: Vec<String> = lines(&scalar_path(out.path(), EntityKind::Edition))
        .iter()
        .map(|row| row.split('\t').next().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["OL5M"]);
}

#[test]
fn test_type_marker_in_payload_is_ignored() {
    let content = "/type/page\t/about\t1\t2010\t{\"key\": \"/about\", \"body\": \"Records like /type/edition live here\"}\n";
    let (out, summary) = extract_all(content);

    assert_eq!(summary.stats.skipped_no_marker, 1);
    assert_eq!(summary.stats.records(), 0);
    assert!(lines(&scalar_path(out.path(), EntityKind::Edition)).is_empty());
}

#[test]
fn test_kind_selection_limits_outputs() {
    let input = dump_file(&sample_dump());
    let out = TempDir::new().unwrap();
    let mut cfg = config(input.path(), out.path());
    cfg.kinds = vec![EntityKind::Author];

    let summary = run_extraction(&cfg).unwrap();
    assert_eq!(summary.stats.authors, 1);
    assert_eq!(summary.stats.editions, 0);
    assert!(scalar_path(out.path(), EntityKind::Author).exists());
    assert!(!scalar_path(out.path(), EntityKind::Edition).exists());
    assert!(!scalar_path(out.path(), EntityKind::Work).exists());
}

#[test]
fn test_rerun_truncates_outputs() {
    let input = dump_file(&sample_dump());
    let out = TempDir::new().unwrap();
    let cfg = config(input.path(), out.path());

    run_extraction(&cfg).unwrap();
    let first = fs::read_to_string(scalar_path(out.path(), EntityKind::Edition)).unwrap();
    run_extraction(&cfg).unwrap();
    let second = fs::read_to_string(scalar_path(out.path(), EntityKind::Edition)).unwrap();

    assert_eq!(first, second);
    assert_eq!(second.lines().count(), 1);
}

#[test]
fn test_bz2_input() {
    let input = create_bz2_dump(&sample_dump());
    let out = TempDir::new().unwrap();

    let summary = run_extraction(&config(input.path(), out.path())).unwrap();
    assert_eq!(summary.stats.records(), 3);
    assert_eq!(
        lines(&relation_path(out.path(), EntityKind::Edition, "publish_places")),
        ["OL1M\tNew York"]
    );
}

#[test]
fn test_invalid_utf8_line_is_decoded_lossily() {
    let mut bytes = b"/type/work\t/works/OL3W\t1\t2010\t{\"key\": \"/works/OL3W\", \"title\": \"Caf".to_vec();
    bytes.extend_from_slice(b"\xe9\"}\n");
    let mut input = NamedTempFile::new().unwrap();
    input.write_all(&bytes).unwrap();
    input.flush().unwrap();
    let out = TempDir::new().unwrap();

    let summary = run_extraction(&config(input.path(), out.path())).unwrap();
    assert_eq!(summary.stats.lossy_lines, 1);
    assert_eq!(summary.stats.works, 1);
    let rows = lines(&scalar_path(out.path(), EntityKind::Work));
    assert!(rows[0].contains("Caf\u{fffd}"));
}

#[test]
fn test_missing_input_fails() {
    let out = TempDir::new().unwrap();
    let cfg = config(Path::new("/nonexistent/dump.txt"), out.path());
    assert!(run_extraction(&cfg).is_err());
}
