use crate::config::{OUTPUT_EXTENSION, WRITE_BUFFER_SIZE};
use crate::models::{EntityKind, Extracted, ScalarRecord};
use crate::schema::schema_for;
use anyhow::{ensure, Context, Result};
use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

pub type TsvWriter = csv::Writer<BufWriter<File>>;
pub type TsvReader = csv::Reader<BufReader<File>>;

/// Creates (truncating) a tab-delimited file: no header, no quoting, `\n` terminated.
/// Fields must already be free of tabs and newlines.
pub fn create_tsv(path: &Path) -> Result<TsvWriter> {
    let file =
        File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))?;
    Ok(WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .has_headers(false)
        .from_writer(BufWriter::with_capacity(WRITE_BUFFER_SIZE, file)))
}

/// Opens a tab-delimited file written by [`create_tsv`]. Rows may have any width.
pub fn open_tsv(path: &Path) -> Result<TsvReader> {
    let file = File::open(path).with_context(|| format!("Failed to open input file: {:?}", path))?;
    Ok(ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::with_capacity(WRITE_BUFFER_SIZE, file)))
}

pub fn scalar_path(dir: &Path, kind: EntityKind) -> PathBuf {
    dir.join(format!("{}.{}", kind.table_name(), OUTPUT_EXTENSION))
}

pub fn relation_path(dir: &Path, kind: EntityKind, relation: &str) -> PathBuf {
    dir.join(format!(
        "{}_{}.{}",
        kind.table_name(),
        relation,
        OUTPUT_EXTENSION
    ))
}

struct KindChannels {
    scalar: TsvWriter,
    relations: Vec<TsvWriter>,
}

/// Every output file of one extraction run, opened once up front and held until
/// [`OutputChannels::finish`]. Dropping the set (e.g. on an error path) still closes
/// and flushes each file.
pub struct OutputChannels {
    channels: [Option<KindChannels>; 3],
    paths: Vec<PathBuf>,
}

impl OutputChannels {
    /// Creates the scalar file and every relation file for each of `kinds` in `dir`,
    /// truncating outputs left by an earlier run.
    pub fn open(dir: &Path, kinds: &[EntityKind]) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

        let mut channels: [Option<KindChannels>; 3] = [None, None, None];
        let mut paths = Vec::new();

        for &kind in kinds {
            if channels[kind.index()].is_some() {
                continue;
            }
            let schema = schema_for(kind);

            let path = scalar_path(dir, kind);
            let scalar = create_tsv(&path)?;
            paths.push(path);

            let mut relations = Vec::with_capacity(schema.relations.len());
            for relation in schema.relations {
                let path = relation_path(dir, kind, relation.name);
                relations.push(create_tsv(&path)?);
                paths.push(path);
            }

            channels[kind.index()] = Some(KindChannels { scalar, relations });
        }

        info!(files = paths.len(), dir = ?dir, "Output channels opened");
        Ok(Self { channels, paths })
    }

    fn kind_channels(&mut self, kind: EntityKind) -> Result<&mut KindChannels> {
        self.channels[kind.index()]
            .as_mut()
            .with_context(|| format!("No output channels open for kind: {}", kind))
    }

    pub fn write_scalar(&mut self, record: &ScalarRecord) -> Result<()> {
        let expected = schema_for(record.kind).column_count();
        ensure!(
            record.columns.len() == expected,
            "Scalar {} row has {} columns, expected {}",
            record.kind,
            record.columns.len(),
            expected
        );
        let channels = self.kind_channels(record.kind)?;
        channels
            .scalar
            .write_record(&record.columns)
            .with_context(|| format!("Failed to write {} row", record.kind))?;
        Ok(())
    }

    pub fn write_relation(
        &mut self,
        kind: EntityKind,
        relation: usize,
        owner: &str,
        value: &str,
    ) -> Result<()> {
        let channels = self.kind_channels(kind)?;
        let writer = channels
            .relations
            .get_mut(relation)
            .with_context(|| format!("Unknown {} relation index: {}", kind, relation))?;
        writer
            .write_record([owner, value])
            .with_context(|| format!("Failed to write {} relation row", kind))?;
        Ok(())
    }

    /// Writes a record's scalar row followed by all of its relation rows.
    pub fn write_extracted(&mut self, extracted: &Extracted) -> Result<()> {
        self.write_scalar(&extracted.scalar)?;
        let kind = extracted.scalar.kind;
        let owner = extracted.scalar.id();
        for row in &extracted.relations {
            self.write_relation(kind, row.relation, owner, &row.value)?;
        }
        Ok(())
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Flushes and closes every channel, returning the files written.
    pub fn finish(self) -> Result<Vec<PathBuf>> {
        for kind_channels in self.channels.into_iter().flatten() {
            let KindChannels {
                mut scalar,
                relations,
            } = kind_channels;
            scalar.flush().context("Failed to flush scalar channel")?;
            for mut writer in relations {
                writer.flush().context("Failed to flush relation channel")?;
            }
        }
        Ok(self.paths)
    }
}
