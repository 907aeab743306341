//! Scoring request model and payload validation.

use serde::{Deserialize, Serialize};

use crate::domain::error::{Result, ScoreError};
use crate::domain::score::Section;

/// Task inventory of the practice platform.
///
/// The request wire format carries the type as a free string; known
/// labels parse into this enum. Unknown labels are still accepted for
/// subjective sections, where the label is only prompt text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    ReadAloud,
    RepeatSentence,
    DescribeImage,
    RetellLecture,
    AnswerShortQuestion,
    SummarizeWrittenText,
    WriteEssay,
    MultipleChoiceSingle,
    MultipleChoiceMultiple,
    ReorderParagraphs,
    FillInBlanks,
    SummarizeSpokenText,
    WriteFromDictation,
    HighlightIncorrectWords,
}

impl QuestionKind {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "read_aloud" => Some(Self::ReadAloud),
            "repeat_sentence" => Some(Self::RepeatSentence),
            "describe_image" => Some(Self::DescribeImage),
            "retell_lecture" => Some(Self::RetellLecture),
            "answer_short_question" => Some(Self::AnswerShortQuestion),
            "summarize_written_text" => Some(Self::SummarizeWrittenText),
            "write_essay" => Some(Self::WriteEssay),
            "multiple_choice_single" => Some(Self::MultipleChoiceSingle),
            "multiple_choice_multiple" => Some(Self::MultipleChoiceMultiple),
            "reorder_paragraphs" => Some(Self::ReorderParagraphs),
            "fill_in_blanks" => Some(Self::FillInBlanks),
            "summarize_spoken_text" => Some(Self::SummarizeSpokenText),
            "write_from_dictation" => Some(Self::WriteFromDictation),
            "highlight_incorrect_words" => Some(Self::HighlightIncorrectWords),
            _ => None,
        }
    }

    /// Whether this task type grades the given payload shape. Only the
    /// objectively-gradable kinds are strict; subjective kinds accept
    /// whatever their section accepts.
    pub fn accepts(self, payload: &SectionPayload) -> bool {
        match self {
            Self::MultipleChoiceSingle => {
                matches!(payload, SectionPayload::SingleChoice { .. })
            }
            Self::MultipleChoiceMultiple | Self::HighlightIncorrectWords => {
                matches!(payload, SectionPayload::MultiChoice { .. })
            }
            Self::FillInBlanks => matches!(payload, SectionPayload::FillBlanks { .. }),
            Self::ReorderParagraphs => matches!(payload, SectionPayload::Reorder { .. }),
            Self::WriteFromDictation => matches!(payload, SectionPayload::Dictation { .. }),
            _ => true,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ReadAloud => "read_aloud",
            Self::RepeatSentence => "repeat_sentence",
            Self::DescribeImage => "describe_image",
            Self::RetellLecture => "retell_lecture",
            Self::AnswerShortQuestion => "answer_short_question",
            Self::SummarizeWrittenText => "summarize_written_text",
            Self::WriteEssay => "write_essay",
            Self::MultipleChoiceSingle => "multiple_choice_single",
            Self::MultipleChoiceMultiple => "multiple_choice_multiple",
            Self::ReorderParagraphs => "reorder_paragraphs",
            Self::FillInBlanks => "fill_in_blanks",
            Self::SummarizeSpokenText => "summarize_spoken_text",
            Self::WriteFromDictation => "write_from_dictation",
            Self::HighlightIncorrectWords => "highlight_incorrect_words",
        }
    }
}

/// Per-section request payload.
///
/// Speaking and writing carry free-form candidate responses; the
/// remaining variants are the objectively-gradable shapes shared by the
/// reading and listening sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionPayload {
    Speaking {
        transcript: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reference_text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio_ref: Option<String>,
    },
    Writing {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
    },
    SingleChoice {
        selected: String,
        correct: String,
    },
    MultiChoice {
        selected: Vec<String>,
        correct: Vec<String>,
    },
    FillBlanks {
        answers: Vec<String>,
        correct: Vec<String>,
    },
    Reorder {
        user_order: Vec<String>,
        correct_order: Vec<String>,
    },
    Dictation {
        target_text: String,
        user_text: String,
    },
}

impl SectionPayload {
    /// Whether this payload has a registered deterministic scorer.
    pub fn is_objective(&self) -> bool {
        !matches!(
            self,
            SectionPayload::Speaking { .. } | SectionPayload::Writing { .. }
        )
    }

    fn kind_name(&self) -> &'static str {
        match self {
            SectionPayload::Speaking { .. } => "speaking",
            SectionPayload::Writing { .. } => "writing",
            SectionPayload::SingleChoice { .. } => "single_choice",
            SectionPayload::MultiChoice { .. } => "multi_choice",
            SectionPayload::FillBlanks { .. } => "fill_blanks",
            SectionPayload::Reorder { .. } => "reorder",
            SectionPayload::Dictation { .. } => "dictation",
        }
    }
}

fn default_true() -> bool {
    true
}

/// A single scoring request. Request-scoped, immutable, no identity
/// beyond the call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRequest {
    pub section: Section,

    /// Task type label, e.g. "write_essay" or "multiple_choice_multiple".
    pub question_type: String,

    pub payload: SectionPayload,

    /// When false, prompts and output omit rationale text. Never changes
    /// the numeric scoring path.
    #[serde(default = "default_true")]
    pub include_rationale: bool,

    /// Per-call timeout override; the engine default applies when absent
    /// or zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ScoringRequest {
    /// Check payload/section compatibility.
    ///
    /// The only conditions that surface as caller-visible errors: a
    /// payload variant the section cannot grade, or an empty question
    /// type label.
    pub fn validate(&self) -> Result<()> {
        if self.question_type.trim().is_empty() {
            return Err(ScoreError::InvalidRequest(
                "question_type must not be empty".to_string(),
            ));
        }

        let compatible = match self.section {
            Section::Speaking => matches!(self.payload, SectionPayload::Speaking { .. }),
            Section::Writing => matches!(self.payload, SectionPayload::Writing { .. }),
            Section::Reading => matches!(
                self.payload,
                SectionPayload::SingleChoice { .. }
                    | SectionPayload::MultiChoice { .. }
                    | SectionPayload::FillBlanks { .. }
                    | SectionPayload::Reorder { .. }
            ),
            Section::Listening => matches!(
                self.payload,
                SectionPayload::Dictation { .. }
                    | SectionPayload::SingleChoice { .. }
                    | SectionPayload::MultiChoice { .. }
                    | SectionPayload::FillBlanks { .. }
            ),
        };

        if !compatible {
            return Err(ScoreError::InvalidRequest(format!(
                "section '{}' cannot grade a '{}' payload",
                self.section,
                self.payload.kind_name(),
            )));
        }

        if let Some(kind) = QuestionKind::parse(&self.question_type) {
            if !kind.accepts(&self.payload) {
                return Err(ScoreError::InvalidRequest(format!(
                    "question type '{}' cannot grade a '{}' payload",
                    kind.label(),
                    self.payload.kind_name(),
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading_request(payload: SectionPayload) -> ScoringRequest {
        ScoringRequest {
            section: Section::Reading,
            question_type: "multiple_choice_single".to_string(),
            payload,
            include_rationale: true,
            timeout_ms: None,
        }
    }

    #[test]
    fn test_question_kind_parses_known_labels() {
        assert_eq!(
            QuestionKind::parse("write_from_dictation"),
            Some(QuestionKind::WriteFromDictation)
        );
        assert_eq!(
            QuestionKind::parse(" Reorder_Paragraphs "),
            Some(QuestionKind::ReorderParagraphs)
        );
        assert_eq!(QuestionKind::parse("interpretive_dance"), None);
    }

    #[test]
    fn test_payload_section_compatibility() {
        let ok = reading_request(SectionPayload::SingleChoice {
            selected: "A".to_string(),
            correct: "A".to_string(),
        });
        assert!(ok.validate().is_ok());

        let bad = reading_request(SectionPayload::Writing {
            text: "essay".to_string(),
            prompt: None,
        });
        assert!(matches!(
            bad.validate(),
            Err(ScoreError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_listening_accepts_dictation_and_objective_shapes() {
        let request = ScoringRequest {
            section: Section::Listening,
            question_type: "write_from_dictation".to_string(),
            payload: SectionPayload::Dictation {
                target_text: "the cat sat".to_string(),
                user_text: "the cat sat".to_string(),
            },
            include_rationale: false,
            timeout_ms: None,
        };
        assert!(request.validate().is_ok());

        let reorder = ScoringRequest {
            section: Section::Listening,
            question_type: "reorder_paragraphs".to_string(),
            payload: SectionPayload::Reorder {
                user_order: vec!["a".to_string()],
                correct_order: vec!["a".to_string()],
            },
            include_rationale: false,
            timeout_ms: None,
        };
        // Reordering is a reading task; listening does not grade it.
        assert!(reorder.validate().is_err());
    }

    #[test]
    fn test_question_type_must_agree_with_payload_shape() {
        let mismatched = ScoringRequest {
            section: Section::Reading,
            question_type: "fill_in_blanks".to_string(),
            payload: SectionPayload::SingleChoice {
                selected: "A".to_string(),
                correct: "A".to_string(),
            },
            include_rationale: true,
            timeout_ms: None,
        };
        assert!(mismatched.validate().is_err());

        // Unknown labels stay permissive for subjective sections.
        let unknown = ScoringRequest {
            section: Section::Writing,
            question_type: "email_response".to_string(),
            payload: SectionPayload::Writing {
                text: "Dear team,".to_string(),
                prompt: None,
            },
            include_rationale: true,
            timeout_ms: None,
        };
        assert!(unknown.validate().is_ok());
    }

    #[test]
    fn test_empty_question_type_is_invalid() {
        let request = ScoringRequest {
            section: Section::Speaking,
            question_type: "  ".to_string(),
            payload: SectionPayload::Speaking {
                transcript: "hello".to_string(),
                reference_text: None,
                audio_ref: None,
            },
            include_rationale: true,
            timeout_ms: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_request_serde_defaults() {
        let json = r#"{
            "section": "writing",
            "question_type": "write_essay",
            "payload": {"kind": "writing", "text": "My essay."}
        }"#;
        let request: ScoringRequest = serde_json::from_str(json).expect("deserialize");
        assert!(request.include_rationale);
        assert_eq!(request.timeout_ms, None);
        assert!(request.validate().is_ok());
    }
}
