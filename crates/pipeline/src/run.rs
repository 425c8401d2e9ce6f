//! The one-way run state machine: `Init -> Streaming -> Merging -> Loading
//! -> Done`, with `Aborted` reachable from any non-terminal state on
//! cancellation or a worker timeout.

use crate::accumulator::Accumulator;
use crate::config::Config;
use crate::error::Error;
use crate::indexdir::{self, IndexDirPolicy};
use crate::loader;
use crate::progress::{Progress, RunTimer};
use crate::source::Source;
use posindex_extractors::{Batch, Extraction, Extractor};
use posindex_spill::{external_merge, MergeConfig};
use posindex_store::Store;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Batches at or above this size are worth partitioning across workers;
/// smaller ones run on the producer thread rather than pay thread-spawn
/// overhead for little gain.
const PARALLEL_BATCH_THRESHOLD: usize = 10_000;

/// Splits `batch` into at most `workers` partitions, never separating a
/// document's rows across partitions (n-gram and dependency extractors
/// require every row of a sentence, and a document never spans a sentence
/// boundary shared with another document). Each partition is processed by
/// one worker into a private set of extractions; the caller reduces them by
/// feeding all of them through the same accumulator.
fn partition_by_document(batch: &Batch, workers: usize) -> Vec<Batch> {
    let mut doc_ids: Vec<i32> = batch
        .annotations
        .iter()
        .map(|r| r.document_id)
        .chain(batch.dependencies.iter().map(|r| r.document_id))
        .collect();
    doc_ids.sort_unstable();
    doc_ids.dedup();

    let workers = workers.max(1).min(doc_ids.len().max(1));
    if workers <= 1 {
        return vec![Batch {
            annotations: batch.annotations.clone(),
            dependencies: batch.dependencies.clone(),
        }];
    }

    let chunk_size = (doc_ids.len() + workers - 1) / workers;
    doc_ids
        .chunks(chunk_size)
        .map(|group| {
            let ids: HashSet<i32> = group.iter().copied().collect();
            Batch {
                annotations: batch.annotations.iter().filter(|r| ids.contains(&r.document_id)).cloned().collect(),
                dependencies: batch.dependencies.iter().filter(|r| ids.contains(&r.document_id)).cloned().collect(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    Streaming,
    Merging,
    Loading,
    Done,
    Aborted,
}

/// Signal checked between batches and before each store write; flipping it
/// stops the run at the next safe checkpoint rather than mid-write.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs one flavor's build end to end: fetch -> extract -> accumulate ->
/// spill -> external-merge -> load.
pub struct Run<'a> {
    state: State,
    extractor: &'a dyn Extractor,
    config: Config,
    work_dir: PathBuf,
    cancel: CancelToken,
    progress: Progress,
}

impl<'a> Run<'a> {
    pub fn new(extractor: &'a dyn Extractor, config: Config, work_dir: impl Into<PathBuf>, cancel: CancelToken) -> Self {
        Run {
            state: State::Init,
            extractor,
            config,
            work_dir: work_dir.into(),
            cancel,
            progress: Progress::default(),
        }
    }

    fn transition(&mut self, to: State, attempted: &'static str) -> Result<(), Error> {
        let ok = matches!(
            (self.state, to),
            (State::Init, State::Streaming)
                | (State::Streaming, State::Merging)
                | (State::Merging, State::Loading)
                | (State::Loading, State::Done)
                | (State::Streaming, State::Aborted)
                | (State::Merging, State::Aborted)
                | (State::Loading, State::Aborted)
        );
        if !ok {
            return Err(Error::InvalidTransition { state: self.state, attempted });
        }
        self.state = to;
        Ok(())
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Extracts one fetched batch, parallelizing across `config.threads`
    /// workers when the batch is large enough to be worth partitioning.
    /// Partitioning is by document id, never splitting a document or a
    /// sentence; each worker extracts into its own `Vec`, and the caller
    /// reduces all of them into one map by feeding them through the same
    /// accumulator.
    fn extract_batch(&self, batch: &Batch, fetched: usize) -> Vec<Extraction> {
        if self.config.threads <= 1 || fetched < PARALLEL_BATCH_THRESHOLD {
            return self.extractor.extract(batch);
        }

        let partitions = partition_by_document(batch, self.config.threads);
        if partitions.len() <= 1 {
            return self.extractor.extract(batch);
        }

        let extractor = self.extractor;
        std::thread::scope(|scope| {
            partitions
                .iter()
                .map(|part| scope.spawn(|| extractor.extract(part)))
                .collect::<Vec<_>>()
                .into_iter()
                .flat_map(|handle| handle.join().expect("extraction worker panicked"))
                .collect()
        })
    }

    /// Execute the full run against `source`, writing the final merged
    /// postings into `store`. `out_dir` is the flavor's output directory,
    /// prepared per [`indexdir::prepare`] before anything is written.
    pub fn execute<S: Store>(
        mut self,
        mut source: impl Source,
        store: &S,
        out_dir: &Path,
        dir_policy: IndexDirPolicy,
    ) -> Result<Progress, Error> {
        indexdir::prepare(out_dir, dir_policy)?;
        let timer = RunTimer::start();

        self.transition(State::Streaming, "begin streaming")?;
        std::fs::create_dir_all(&self.work_dir)?;
        let accumulator_threshold = self.config.spill_threshold_bytes.min(self.config.memory_budget_mb * 1024 * 1024);
        let mut accumulator = Accumulator::new(self.work_dir.as_path(), accumulator_threshold, self.config.dedup_policy);

        let mut offset = 0usize;
        loop {
            if self.cancel.is_cancelled() {
                self.transition(State::Aborted, "cancel during streaming")?;
                return Ok(self.progress);
            }

            let batch = source.fetch_batch(offset, self.config.batch_size)?;
            if batch.annotations.is_empty() && batch.dependencies.is_empty() {
                break;
            }
            let fetched = batch.annotations.len().max(batch.dependencies.len());

            for (key, position) in self.extract_batch(&batch, fetched) {
                accumulator.add(key, position)?;
            }

            self.progress.record_batch(fetched as u64);
            offset += fetched;
            if fetched < self.config.batch_size {
                break;
            }
        }

        let spills = accumulator.finish()?;

        self.transition(State::Merging, "begin merge")?;
        if self.cancel.is_cancelled() {
            self.transition(State::Aborted, "cancel before merge")?;
            return Ok(self.progress);
        }

        let merge_cfg = MergeConfig { fanin: self.config.merge_fanin, dedup_policy: self.config.dedup_policy };
        let merged = external_merge(spills, &self.work_dir, merge_cfg)?;
        self.progress.record_merge_pass();

        self.transition(State::Loading, "begin load")?;
        if self.cancel.is_cancelled() {
            self.transition(State::Aborted, "cancel before load")?;
            return Ok(self.progress);
        }

        let stats = loader::load(&merged, store, self.config.store_batch_size, self.config.dedup_policy)?;
        self.progress.record_load(stats.keys_loaded as u64, 0);

        if !self.config.preserve_spills {
            let _ = std::fs::remove_dir_all(&self.work_dir);
        }

        self.transition(State::Done, "finish run")?;
        timer.finish(&self.progress);
        Ok(self.progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::VecSource;
    use posindex_extractors::{AnnotationRow, StopwordSet, UnigramExtractor};
    use posindex_position::PositionList;
    use posindex_store::RocksStore;

    fn row(doc: i32, sent: i32, b: i32, e: i32, lemma: &str) -> AnnotationRow {
        AnnotationRow {
            document_id: doc,
            sentence_id: sent,
            begin_char: b,
            end_char: e,
            date: 19723,
            token: lemma.to_string(),
            lemma: Some(lemma.to_string()),
            pos: None,
            ner: None,
            normalized_ner: None,
            annotation_id: None,
        }
    }

    #[test]
    fn partition_by_document_never_splits_a_document() {
        let batch = Batch {
            annotations: vec![
                row(1, 1, 0, 3, "fox"),
                row(1, 2, 0, 3, "jumps"),
                row(2, 1, 0, 3, "quick"),
                row(3, 1, 0, 3, "lazy"),
            ],
            dependencies: vec![],
        };

        let partitions = partition_by_document(&batch, 2);
        assert_eq!(partitions.len(), 2);
        for doc_id in [1, 2, 3] {
            let owners: Vec<&Batch> = partitions.iter().filter(|p| p.annotations.iter().any(|r| r.document_id == doc_id)).collect();
            assert_eq!(owners.len(), 1, "document {doc_id} split across partitions");
        }
        let total: usize = partitions.iter().map(|p| p.annotations.len()).sum();
        assert_eq!(total, batch.annotations.len());
    }

    #[test]
    fn partition_by_document_collapses_to_one_when_workers_exceed_documents() {
        let batch = Batch {
            annotations: vec![row(1, 1, 0, 3, "fox")],
            dependencies: vec![],
        };
        assert_eq!(partition_by_document(&batch, 8).len(), 1);
    }

    #[test]
    fn end_to_end_run_loads_postings_into_store() {
        let extractor = UnigramExtractor::new(StopwordSet::empty());
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let store_dir = tempfile::tempdir().unwrap();

        let source = VecSource::new(vec![row(1, 1, 0, 3, "fox"), row(1, 1, 4, 9, "jumps")]);
        let store = RocksStore::open(store_dir.path(), Default::default()).unwrap();

        let run = Run::new(&extractor, Config::default(), work.path(), CancelToken::new());
        let progress = run.execute(source, &store, out.path(), IndexDirPolicy::default()).unwrap();

        assert_eq!(progress.unique_keys_written, 2);
        let value = store.get(b"fox").unwrap().unwrap();
        assert_eq!(PositionList::deserialize(&value).unwrap().len(), 1);
    }

    #[test]
    fn large_batch_parallel_extraction_matches_single_threaded_output() {
        let extractor = UnigramExtractor::new(StopwordSet::empty());
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let store_dir = tempfile::tempdir().unwrap();

        let rows: Vec<AnnotationRow> = (0..PARALLEL_BATCH_THRESHOLD + 1000)
            .map(|i| row(i as i32, 1, 0, 3, "fox"))
            .collect();
        let source = VecSource::new(rows);
        let store = RocksStore::open(store_dir.path(), Default::default()).unwrap();

        let config = Config {
            batch_size: PARALLEL_BATCH_THRESHOLD + 2000,
            threads: 4,
            ..Config::default()
        };
        let run = Run::new(&extractor, config, work.path(), CancelToken::new());
        let progress = run.execute(source, &store, out.path(), IndexDirPolicy::default()).unwrap();

        assert_eq!(progress.unique_keys_written, 1);
        let value = store.get(b"fox").unwrap().unwrap();
        assert_eq!(PositionList::deserialize(&value).unwrap().len(), PARALLEL_BATCH_THRESHOLD + 1000);
    }

    #[test]
    fn cancellation_before_streaming_starts_aborts_cleanly() {
        let extractor = UnigramExtractor::new(StopwordSet::empty());
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let store_dir = tempfile::tempdir().unwrap();

        let source = VecSource::new(vec![row(1, 1, 0, 3, "fox")]);
        let store = RocksStore::open(store_dir.path(), Default::default()).unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let run = Run::new(&extractor, Config::default(), work.path(), cancel);
        run.execute(source, &store, out.path(), IndexDirPolicy::default()).unwrap();
    }
}
