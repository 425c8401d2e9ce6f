/// Days since the Unix epoch (1970-01-01). Negative values represent dates before the epoch.
pub type Date = i64;

/// Which annotation kind a stitch position is paired with.
///
/// The discriminant values are stable: they're persisted as part of a
/// serialized [`crate::PositionList`] extension and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AnnotationKind {
    Date = 0,
    Ner = 1,
    Pos = 2,
    Dependency = 3,
}

impl AnnotationKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(AnnotationKind::Date),
            1 => Some(AnnotationKind::Ner),
            2 => Some(AnnotationKind::Pos),
            3 => Some(AnnotationKind::Dependency),
            _ => None,
        }
    }
}

/// The extension carried by stitch-flavor positions: the synonym id of the
/// co-located annotation and which kind of annotation it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StitchExt {
    pub synonym_id: i32,
    pub annotation_kind: AnnotationKind,
}

/// A pointer into the corpus: a document, a sentence within it, a character
/// span within the sentence, and the document's date.
///
/// Positions compare and sort only by `(document_id, sentence_id, begin_char,
/// end_char)`; `date` and `stitch` ride along but never participate in
/// ordering or the de-duplication rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub document_id: i32,
    pub sentence_id: i32,
    pub begin_char: i32,
    pub end_char: i32,
    pub date: Date,
    pub stitch: Option<StitchExt>,
}

impl Position {
    pub fn new(document_id: i32, sentence_id: i32, begin_char: i32, end_char: i32, date: Date) -> Self {
        assert!(begin_char <= end_char, "begin_char must not exceed end_char");
        assert!(begin_char >= 0, "begin_char must be non-negative");
        Position {
            document_id,
            sentence_id,
            begin_char,
            end_char,
            date,
            stitch: None,
        }
    }

    pub fn with_stitch(mut self, synonym_id: i32, annotation_kind: AnnotationKind) -> Self {
        self.stitch = Some(StitchExt {
            synonym_id,
            annotation_kind,
        });
        self
    }

    /// The four-field tuple that defines sort order and exact-duplicate agreement.
    pub fn sort_key(&self) -> (i32, i32, i32, i32) {
        (self.document_id, self.sentence_id, self.begin_char, self.end_char)
    }
}

/// Controls how aggressively [`crate::PositionList::merge`] collapses
/// near-duplicate positions. `Fuzzy(0)` is equivalent to exact matching on
/// the four-field comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupPolicy {
    Fuzzy(i32),
}

impl Default for DedupPolicy {
    /// Per the decided Open Question (a): the fuzzy rule applies uniformly,
    /// across all flavors, with a default tolerance of two characters.
    fn default() -> Self {
        DedupPolicy::Fuzzy(2)
    }
}

impl DedupPolicy {
    pub fn exact() -> Self {
        DedupPolicy::Fuzzy(0)
    }

    fn tolerance(&self) -> i32 {
        match self {
            DedupPolicy::Fuzzy(tol) => *tol,
        }
    }
}

/// True when `a` and `b` are duplicates under `policy`: they share
/// `(document_id, sentence_id)` and their begin/end offsets differ by no
/// more than the configured tolerance.
pub fn is_duplicate(a: &Position, b: &Position, policy: DedupPolicy) -> bool {
    if a.document_id != b.document_id || a.sentence_id != b.sentence_id {
        return false;
    }
    let tol = policy.tolerance();
    (a.begin_char - b.begin_char).abs() <= tol && (a.end_char - b.end_char).abs() <= tol
}
