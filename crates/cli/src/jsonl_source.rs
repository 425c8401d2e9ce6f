//! A concrete [`Source`] reading newline-delimited JSON rows from disk.
//! Production deployments wire a real relational-source adapter behind the
//! same trait; this is the CLI's offline/batch-file entry point.

use anyhow::Context;
use posindex_extractors::{AnnotationRow, Batch, DependencyRow};
use posindex_pipeline::{Source, SourceError};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Deserialize)]
struct AnnotationWire {
    document_id: i32,
    sentence_id: i32,
    begin_char: i32,
    end_char: i32,
    date: i64,
    token: String,
    lemma: Option<String>,
    pos: Option<String>,
    ner: Option<String>,
    normalized_ner: Option<String>,
    annotation_id: Option<i64>,
}

impl From<AnnotationWire> for AnnotationRow {
    fn from(w: AnnotationWire) -> Self {
        AnnotationRow {
            document_id: w.document_id,
            sentence_id: w.sentence_id,
            begin_char: w.begin_char,
            end_char: w.end_char,
            date: w.date,
            token: w.token,
            lemma: w.lemma,
            pos: w.pos,
            ner: w.ner,
            normalized_ner: w.normalized_ner,
            annotation_id: w.annotation_id,
        }
    }
}

#[derive(Deserialize)]
struct DependencyWire {
    document_id: i32,
    sentence_id: i32,
    date: i64,
    head_token: String,
    head_begin: i32,
    head_end: i32,
    dependent_token: String,
    dep_begin: i32,
    dep_end: i32,
    relation: String,
}

impl From<DependencyWire> for DependencyRow {
    fn from(w: DependencyWire) -> Self {
        DependencyRow {
            document_id: w.document_id,
            sentence_id: w.sentence_id,
            date: w.date,
            head_token: w.head_token,
            head_begin: w.head_begin,
            head_end: w.head_end,
            dependent_token: w.dependent_token,
            dep_begin: w.dep_begin,
            dep_end: w.dep_end,
            relation: w.relation,
        }
    }
}

/// Reads an entire annotations/dependencies JSONL pair into memory and
/// yields it as a single batch; subsequent fetches signal end of input.
/// Callers with corpora too large to hold in memory should implement
/// [`Source`] directly against their own paginated backend.
pub struct JsonlSource {
    annotations: Vec<AnnotationRow>,
    dependencies: Vec<DependencyRow>,
    exhausted: bool,
}

impl JsonlSource {
    pub fn open(annotations_path: &Path, dependencies_path: Option<&Path>) -> anyhow::Result<Self> {
        let annotations = read_jsonl::<AnnotationWire, AnnotationRow>(annotations_path)
            .with_context(|| format!("reading annotations from {annotations_path:?}"))?;
        let dependencies = match dependencies_path {
            Some(p) => read_jsonl::<DependencyWire, DependencyRow>(p).with_context(|| format!("reading dependencies from {p:?}"))?,
            None => Vec::new(),
        };
        Ok(JsonlSource { annotations, dependencies, exhausted: false })
    }
}

fn read_jsonl<W, T>(path: &Path) -> anyhow::Result<Vec<T>>
where
    W: for<'de> Deserialize<'de> + Into<T>,
{
    let file = File::open(path)?;
    let mut rows = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let wire: W = serde_json::from_str(&line)?;
        rows.push(wire.into());
    }
    Ok(rows)
}

impl Source for JsonlSource {
    fn fetch_batch(&mut self, _offset: usize, _limit: usize) -> Result<Batch, SourceError> {
        if self.exhausted {
            return Ok(Batch::default());
        }
        self.exhausted = true;
        Ok(Batch {
            annotations: std::mem::take(&mut self.annotations),
            dependencies: std::mem::take(&mut self.dependencies),
        })
    }
}
