/// Entity ids are the last path segment of `key`: `OL` + digits + an uppercase suffix
pub const ENTITY_ID_PATTERN: &str = r"^OL[0-9]+[A-Z]*$";

/// Required leading characters of every entity id (cheap check before the regex)
pub const ENTITY_ID_PREFIX: &str = "OL";

/// Extension shared by every tab-delimited output file
pub const OUTPUT_EXTENSION: &str = "csv";

/// Suffix appended to a relation file's stem for its rewritten association file
pub const ASSOCIATION_SUFFIX: &str = "_id";

/// Buffer capacity for the dump reader
pub const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Buffer capacity for each output channel writer
pub const WRITE_BUFFER_SIZE: usize = 128 * 1024;

/// Progress update interval (tick every N lines)
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// Maximum number of characters of an offending line echoed into a log event
pub const LOG_PREVIEW_CHARS: usize = 240;

/// Series followers with fewer letters than this (and a single digit) are volume qualifiers
pub const SERIES_QUALIFIER_MAX_LETTERS: usize = 5;

/// (domain, key table stem, relation file stems) for the built-in normalization plans.
///
/// Domains that share a dimension table in the target schema list every relation file
/// that feeds it, so one dictionary covers all of them.
pub const DEFAULT_DOMAINS: &[(&str, &str, &[&str])] = &[
    (
        "places",
        "places",
        &["authors_location", "editions_publish_places"],
    ),
    ("subjects", "subjects", &["editions_subjects", "works_subjects"]),
    (
        "languages",
        "languages",
        &[
            "editions_languages",
            "editions_translated_from",
            "works_original_languages",
        ],
    ),
    ("genres", "genres", &["editions_genres"]),
    ("publishers", "publishers", &["editions_publishers"]),
    ("series", "series", &["editions_series"]),
    ("contributors", "contributors", &["editions_contributors"]),
    (
        "lc_classifications",
        "lc_classifications",
        &["editions_lc_classifications", "works_lc_classifications"],
    ),
    ("lccn", "lccn", &["editions_lccn"]),
    ("work_titles", "work_titles", &["editions_work_titles"]),
];
