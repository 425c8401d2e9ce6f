use posindex_position::Date;

/// One row of the `annotations` input stream: a single token and whatever
/// per-token annotations were produced for it upstream.
#[derive(Debug, Clone)]
pub struct AnnotationRow {
    pub document_id: i32,
    pub sentence_id: i32,
    pub begin_char: i32,
    pub end_char: i32,
    pub date: Date,
    pub token: String,
    pub lemma: Option<String>,
    pub pos: Option<String>,
    pub ner: Option<String>,
    pub normalized_ner: Option<String>,
    /// Present when the upstream annotator assigns stable, monotonically
    /// increasing ids to same-type consecutive NER tokens; used to merge
    /// entity spans.
    pub annotation_id: Option<i64>,
}

/// One row of the `dependencies` input stream.
#[derive(Debug, Clone)]
pub struct DependencyRow {
    pub document_id: i32,
    pub sentence_id: i32,
    pub date: Date,
    pub head_token: String,
    pub head_begin: i32,
    pub head_end: i32,
    pub dependent_token: String,
    pub dep_begin: i32,
    pub dep_end: i32,
    pub relation: String,
}

/// One fetched batch, already ordered by `(document_id, sentence_id,
/// begin_char)` within each stream. All extractors see the same `Batch`
/// shape and read whichever half is relevant to their flavor.
#[derive(Debug, Default)]
pub struct Batch {
    pub annotations: Vec<AnnotationRow>,
    pub dependencies: Vec<DependencyRow>,
}

/// Split a batch of rows already sorted by `(document_id, sentence_id, ...)`
/// into contiguous per-sentence groups, preserving within-sentence order.
pub fn group_by_sentence<T>(rows: &[T], key: impl Fn(&T) -> (i32, i32)) -> Vec<&[T]> {
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..=rows.len() {
        if i == rows.len() || key(&rows[i]) != key(&rows[start]) {
            groups.push(&rows[start..i]);
            start = i;
        }
    }
    groups
}
