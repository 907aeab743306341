//! Canonical score model shared by every scoring path.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exam section a scoring request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Speaking,
    Writing,
    Reading,
    Listening,
}

impl Section {
    /// Closed rubric vocabulary for this section, in rubric order.
    pub fn dimensions(self) -> &'static [Dimension] {
        match self {
            Section::Speaking => &[
                Dimension::Content,
                Dimension::Pronunciation,
                Dimension::Fluency,
                Dimension::Grammar,
                Dimension::Vocabulary,
            ],
            Section::Writing => &[
                Dimension::Content,
                Dimension::Structure,
                Dimension::Coherence,
                Dimension::Grammar,
                Dimension::Vocabulary,
                Dimension::Spelling,
            ],
            Section::Reading => &[Dimension::Correctness],
            Section::Listening => &[Dimension::Correctness, Dimension::Wer],
        }
    }

    /// Whether the section needs a subjective judgment backend for its
    /// numeric scores. Reading and listening are adjudicated
    /// deterministically; providers only contribute rationale there.
    pub fn is_subjective(self) -> bool {
        matches!(self, Section::Speaking | Section::Writing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Speaking => "speaking",
            Section::Writing => "writing",
            Section::Reading => "reading",
            Section::Listening => "listening",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Section {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "speaking" => Ok(Section::Speaking),
            "writing" => Ok(Section::Writing),
            "reading" => Ok(Section::Reading),
            "listening" => Ok(Section::Listening),
            other => Err(format!("unknown section: {other}")),
        }
    }
}

/// One named rubric facet, scored independently before aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Content,
    Pronunciation,
    Fluency,
    Grammar,
    Vocabulary,
    Structure,
    Coherence,
    Spelling,
    Correctness,
    Wer,
}

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Content => "content",
            Dimension::Pronunciation => "pronunciation",
            Dimension::Fluency => "fluency",
            Dimension::Grammar => "grammar",
            Dimension::Vocabulary => "vocabulary",
            Dimension::Structure => "structure",
            Dimension::Coherence => "coherence",
            Dimension::Spelling => "spelling",
            Dimension::Correctness => "correctness",
            Dimension::Wer => "wer",
        }
    }

    /// Map a provider-supplied field name onto the closed vocabulary.
    /// Unknown labels are dropped by the judgment parser.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "content" => Some(Dimension::Content),
            "pronunciation" => Some(Dimension::Pronunciation),
            "fluency" => Some(Dimension::Fluency),
            "grammar" => Some(Dimension::Grammar),
            "vocabulary" => Some(Dimension::Vocabulary),
            "structure" => Some(Dimension::Structure),
            "coherence" => Some(Dimension::Coherence),
            "spelling" => Some(Dimension::Spelling),
            "correctness" => Some(Dimension::Correctness),
            "wer" => Some(Dimension::Wer),
            _ => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of the backend that produced a raw result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    DeepSeek,
    Gemini,
    Deterministic,
    Heuristic,
    Unavailable,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Deterministic => "deterministic",
            ProviderKind::Heuristic => "heuristic",
            ProviderKind::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic provenance attached to every raw result.
///
/// Immutable once created and never consulted by scoring math.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMeta {
    /// Which backend produced the result.
    pub provider: ProviderKind,

    /// Model identifier reported by the backend, if any.
    pub model: Option<String>,

    /// Wall-clock latency of the backend call.
    pub latency_ms: Option<u64>,

    /// When the result was produced.
    pub timestamp: DateTime<Utc>,

    /// Correlation id for log lines and caller-side diagnostics.
    pub request_id: Option<Uuid>,

    /// Backend-reported finish reason (e.g. "stop", "length").
    pub finish_reason: Option<String>,
}

impl ProviderMeta {
    /// Create metadata stamped with the current time and a fresh request id.
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            model: None,
            latency_ms: None,
            timestamp: Utc::now(),
            request_id: Some(Uuid::new_v4()),
            finish_reason: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    pub fn with_finish_reason(mut self, reason: impl Into<String>) -> Self {
        self.finish_reason = Some(reason.into());
        self
    }
}

/// Un-normalized output of a single provider.
///
/// Value ranges are provider-defined; the merger infers them (values
/// above 90 are treated as a 0-100 source range and rescaled).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProviderResult {
    /// Provider's own overall score, range unspecified.
    pub overall: Option<f64>,

    /// Per-dimension raw scores, range unspecified.
    pub subscores: BTreeMap<Dimension, f64>,

    /// Free-text justification, if the provider supplied one.
    pub rationale: Option<String>,

    /// Provenance of this result.
    pub meta: ProviderMeta,
}

impl RawProviderResult {
    /// A result carrying no signal at all. Malformed backend output maps
    /// here instead of becoming an error.
    pub fn empty(meta: ProviderMeta) -> Self {
        Self {
            overall: None,
            subscores: BTreeMap::new(),
            rationale: None,
            meta,
        }
    }

    /// Whether this result contributes any numeric signal to a merge.
    pub fn has_signal(&self) -> bool {
        self.overall.is_some() || !self.subscores.is_empty()
    }
}

/// Normalized scoring result on the canonical 0-90 scale.
///
/// Every value in `subscores` and `overall` is integer-rounded and lies
/// in [0, 90]. `overall` derives from `subscores` via weighted average
/// unless `subscores` is empty, in which case it may come directly from
/// a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalScore {
    pub overall: u8,
    pub subscores: BTreeMap<Dimension, u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl CanonicalScore {
    /// The defined floor result: zero overall, no subscores.
    pub fn zero() -> Self {
        Self {
            overall: 0,
            subscores: BTreeMap::new(),
            rationale: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_dimensions_are_closed_vocabularies() {
        assert_eq!(Section::Speaking.dimensions().len(), 5);
        assert_eq!(Section::Writing.dimensions().len(), 6);
        assert_eq!(Section::Reading.dimensions(), &[Dimension::Correctness]);
        assert_eq!(
            Section::Listening.dimensions(),
            &[Dimension::Correctness, Dimension::Wer]
        );
    }

    #[test]
    fn test_only_speaking_and_writing_are_subjective() {
        assert!(Section::Speaking.is_subjective());
        assert!(Section::Writing.is_subjective());
        assert!(!Section::Reading.is_subjective());
        assert!(!Section::Listening.is_subjective());
    }

    #[test]
    fn test_dimension_label_roundtrip() {
        for section in [
            Section::Speaking,
            Section::Writing,
            Section::Reading,
            Section::Listening,
        ] {
            for dim in section.dimensions() {
                assert_eq!(Dimension::from_label(dim.as_str()), Some(*dim));
            }
        }
        assert_eq!(Dimension::from_label("accuracy"), None);
        assert_eq!(Dimension::from_label(" Fluency "), Some(Dimension::Fluency));
    }

    #[test]
    fn test_canonical_score_serde_roundtrip() {
        let score = CanonicalScore {
            overall: 75,
            subscores: [(Dimension::Content, 80u8), (Dimension::Fluency, 70u8)]
                .into_iter()
                .collect(),
            rationale: Some("solid response".to_string()),
            metadata: BTreeMap::new(),
        };

        let json = serde_json::to_string(&score).expect("serialize");
        let deserialized: CanonicalScore = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(score, deserialized);
    }

    #[test]
    fn test_empty_raw_result_has_no_signal() {
        let raw = RawProviderResult::empty(ProviderMeta::new(ProviderKind::OpenAi));
        assert!(!raw.has_signal());

        let mut with_overall = raw.clone();
        with_overall.overall = Some(62.0);
        assert!(with_overall.has_signal());
    }

    #[test]
    fn test_provider_meta_is_stamped() {
        let meta = ProviderMeta::new(ProviderKind::Gemini)
            .with_model("gemini-2.0-flash")
            .with_latency_ms(412);
        assert_eq!(meta.provider, ProviderKind::Gemini);
        assert!(meta.request_id.is_some());
        assert_eq!(meta.latency_ms, Some(412));
    }
}
