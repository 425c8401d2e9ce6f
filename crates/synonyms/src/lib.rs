//! Synonym tables compress repeated string values (dates, POS tags, NER
//! types, dependency relations) into compact `i32` ids, so that postings
//! don't repeat those strings. Each [`Kind`] draws ids from its own
//! disjoint range, so a decoder can recover the kind from the id alone.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Date,
    Ner,
    Pos,
    Dependency,
}

impl Kind {
    pub fn offset(&self) -> i32 {
        match self {
            Kind::Date => 1,
            Kind::Ner => 10_000,
            Kind::Pos => 20_000,
            Kind::Dependency => 30_000,
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Kind::Date => "date_synonyms",
            Kind::Ner => "ner_synonyms",
            Kind::Pos => "pos_synonyms",
            Kind::Dependency => "dependency_synonyms",
        }
    }

    pub fn all() -> [Kind; 4] {
        [Kind::Date, Kind::Ner, Kind::Pos, Kind::Dependency]
    }

    /// The kind whose offset range contains `id`, if any.
    pub fn from_id(id: i32) -> Option<Kind> {
        let kinds = Kind::all();
        let mut best: Option<Kind> = None;
        for k in kinds {
            if id >= k.offset() && (best.is_none() || k.offset() > best.unwrap().offset()) {
                best = Some(k);
            }
        }
        best
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("value {0:?} is not a valid date (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("synonym bijection violated for kind {kind:?}: id {id} maps to {forward:?} but reverse lookup yields {reverse:?}")]
    BijectionViolation {
        kind: Kind,
        id: i32,
        forward: String,
        reverse: Option<String>,
    },
}

#[derive(Serialize, Deserialize, Default)]
struct PersistedTable {
    next_id: i32,
    entries: HashMap<String, i32>,
}

struct TableState {
    forward: HashMap<String, i32>,
    reverse: HashMap<i32, String>,
    next_id: i32,
    dirty: bool,
}

/// A synonym table for one [`Kind`], guarded by a mutex so concurrent
/// extractor workers can safely call `get_or_create`.
struct Table {
    kind: Kind,
    path: PathBuf,
    state: Mutex<TableState>,
}

/// The full set of synonym tables (one per kind), persisted under a base
/// directory.
pub struct SynonymTables {
    tables: HashMap<Kind, Table>,
}

impl SynonymTables {
    /// Open (or create) the synonym tables rooted at `base_dir`. Existing
    /// files are loaded; the next id for each kind becomes `max(loaded) + 1`.
    pub fn open(base_dir: impl AsRef<Path>) -> Result<Self, Error> {
        let base_dir = base_dir.as_ref();
        fs::create_dir_all(base_dir)?;

        let mut tables = HashMap::new();
        for kind in Kind::all() {
            let path = base_dir.join(kind.file_name());
            let persisted = if path.exists() {
                let data = fs::read(&path)?;
                serde_json::from_slice::<PersistedTable>(&data)?
            } else {
                PersistedTable {
                    next_id: kind.offset(),
                    entries: HashMap::new(),
                }
            };

            let mut reverse = HashMap::new();
            for (k, v) in &persisted.entries {
                reverse.insert(*v, k.clone());
            }
            let next_id = persisted
                .entries
                .values()
                .copied()
                .max()
                .map(|m| m + 1)
                .unwrap_or(persisted.next_id)
                .max(kind.offset());

            tables.insert(
                kind,
                Table {
                    kind,
                    path,
                    state: Mutex::new(TableState {
                        forward: persisted.entries,
                        reverse,
                        next_id,
                        dirty: false,
                    }),
                },
            );
        }

        Ok(SynonymTables { tables })
    }

    fn table(&self, kind: Kind) -> &Table {
        self.tables.get(&kind).expect("every Kind has a table")
    }

    /// Assign (or return the existing) id for `value` under `kind`.
    /// Idempotent: concurrent callers with the same `(value, kind)` always
    /// observe the same id.
    pub fn get_or_create(&self, value: &str, kind: Kind) -> Result<i32, Error> {
        if matches!(kind, Kind::Date) {
            validate_date(value)?;
        }

        let table = self.table(kind);
        let mut state = table.state.lock().unwrap();
        if let Some(&id) = state.forward.get(value) {
            return Ok(id);
        }
        let id = state.next_id;
        state.next_id += 1;
        state.forward.insert(value.to_string(), id);
        state.reverse.insert(id, value.to_string());
        state.dirty = true;
        Ok(id)
    }

    /// Look up the string value for `id` under `kind`.
    pub fn lookup(&self, id: i32, kind: Kind) -> Option<String> {
        let table = self.table(kind);
        let state = table.state.lock().unwrap();
        state.reverse.get(&id).cloned()
    }

    /// Number of entries for `kind`, or across all kinds if `None`.
    pub fn size(&self, kind: Option<Kind>) -> usize {
        match kind {
            Some(k) => self.table(k).state.lock().unwrap().forward.len(),
            None => Kind::all().iter().map(|&k| self.size(Some(k))).sum(),
        }
    }

    /// Scan every table and report any `(value, kind)` whose
    /// `get_or_create`/`lookup` bijection is violated.
    pub fn validate(&self) -> Vec<Error> {
        let mut violations = Vec::new();
        for kind in Kind::all() {
            let state = self.table(kind).state.lock().unwrap();
            for (value, &id) in &state.forward {
                match state.reverse.get(&id) {
                    Some(reverse) if reverse == value => {}
                    other => violations.push(Error::BijectionViolation {
                        kind,
                        id,
                        forward: value.clone(),
                        reverse: other.cloned(),
                    }),
                }
            }
        }
        violations
    }

    /// Persist any modified tables: write to a temporary file, then rename
    /// into place, so a crash never leaves a partially-written table file.
    pub fn close(self) -> Result<(), Error> {
        for kind in Kind::all() {
            let table = self.table(kind);
            let state = table.state.lock().unwrap();
            if !state.dirty {
                continue;
            }
            let persisted = PersistedTable {
                next_id: state.next_id,
                entries: state.forward.clone(),
            };
            let data = serde_json::to_vec(&persisted)?;

            let tmp_path = table.path.with_extension("tmp");
            fs::write(&tmp_path, &data)?;
            fs::rename(&tmp_path, &table.path)?;
        }
        Ok(())
    }
}

fn validate_date(value: &str) -> Result<(), Error> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| Error::InvalidDate(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let tables = SynonymTables::open(dir.path()).unwrap();

        let a = tables.get_or_create("NNP", Kind::Pos).unwrap();
        let b = tables.get_or_create("NNP", Kind::Pos).unwrap();
        assert_eq!(a, b);
        assert_eq!(tables.lookup(a, Kind::Pos).as_deref(), Some("NNP"));
    }

    #[test]
    fn ids_live_within_kind_offset_range() {
        let dir = tempfile::tempdir().unwrap();
        let tables = SynonymTables::open(dir.path()).unwrap();

        let date_id = tables.get_or_create("2024-01-01", Kind::Date).unwrap();
        let ner_id = tables.get_or_create("PERSON", Kind::Ner).unwrap();
        let pos_id = tables.get_or_create("NNP", Kind::Pos).unwrap();
        let dep_id = tables.get_or_create("nsubj", Kind::Dependency).unwrap();

        assert!(date_id >= Kind::Date.offset() && date_id < Kind::Ner.offset());
        assert!(ner_id >= Kind::Ner.offset() && ner_id < Kind::Pos.offset());
        assert!(pos_id >= Kind::Pos.offset() && pos_id < Kind::Dependency.offset());
        assert!(dep_id >= Kind::Dependency.offset());
    }

    #[test]
    fn rejects_malformed_dates() {
        let dir = tempfile::tempdir().unwrap();
        let tables = SynonymTables::open(dir.path()).unwrap();
        assert!(tables.get_or_create("01/01/2024", Kind::Date).is_err());
        assert!(tables.get_or_create("2024-13-40", Kind::Date).is_err());
    }

    #[test]
    fn persists_and_reloads_with_append_only_next_id() {
        let dir = tempfile::tempdir().unwrap();

        let tables = SynonymTables::open(dir.path()).unwrap();
        let first = tables.get_or_create("NNP", Kind::Pos).unwrap();
        tables.close().unwrap();

        let tables = SynonymTables::open(dir.path()).unwrap();
        let reloaded = tables.get_or_create("NNP", Kind::Pos).unwrap();
        assert_eq!(first, reloaded);

        let second = tables.get_or_create("VBD", Kind::Pos).unwrap();
        assert_eq!(second, first + 1);
    }

    #[test]
    fn validate_reports_no_violations_for_well_formed_table() {
        let dir = tempfile::tempdir().unwrap();
        let tables = SynonymTables::open(dir.path()).unwrap();
        tables.get_or_create("NNP", Kind::Pos).unwrap();
        assert!(tables.validate().is_empty());
    }
}
