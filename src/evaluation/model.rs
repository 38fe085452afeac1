use std::fmt;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

const BUILTIN_SCORE_DEFAULTS: &str = include_str!("../../config/score_defaults.json");

/// Allowed values for every numeric rating.
pub const RATING_RANGE: std::ops::RangeInclusive<i32> = -1..=2;

/// Reviewer's judgement of the generated domain's score.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ScoreEvalLiteral {
    Lower,
    AboutRight,
    Higher,
}

impl ScoreEvalLiteral {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lower => "Lower",
            Self::AboutRight => "About right",
            Self::Higher => "Higher",
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Lower => -1,
            Self::AboutRight => 0,
            Self::Higher => 1,
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "lower" => Ok(Self::Lower),
            "about right" => Ok(Self::AboutRight),
            "higher" => Ok(Self::Higher),
            _ => bail!("invalid score evaluation `{raw}`, expected Lower, About right, or Higher"),
        }
    }
}

impl fmt::Display for ScoreEvalLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ScoreEvalLiteral {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ScoreEvalLiteral> for String {
    fn from(value: ScoreEvalLiteral) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEval {
    pub eval: ScoreEvalLiteral,
    pub eval_code: i32,
    #[serde(default)]
    pub notes: String,
}

impl ScoreEval {
    pub fn new(eval: ScoreEvalLiteral, notes: &str) -> Self {
        Self {
            eval,
            eval_code: eval.code(),
            notes: notes.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEval {
    pub inferred_knowledge_error: bool,
    pub external_knowledge_error: bool,
    pub json_format_error: bool,
    pub other_error: bool,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEval {
    pub reference_relevancy: i32,
    pub top_reference_retrieval: bool,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralEval {
    pub relevancy: i32,
    pub readability: i32,
    pub reproducibility: i32,
    pub confidence_rating: i32,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiscEval {
    pub human_domain_rating: i32,
    pub evaluator_confidence_rating: i32,
    pub evaluator_familiarity_level: i32,
    #[serde(default)]
    pub notes: String,
}

/// One reviewer's evaluation of one generated domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalData {
    pub score_eval: ScoreEval,
    pub error_eval: ErrorEval,
    pub reference_eval: ReferenceEval,
    pub general_eval: GeneralEval,
    pub misc_eval: MiscEval,
}

impl EvalData {
    pub fn defaults() -> Result<Self> {
        serde_json::from_str(BUILTIN_SCORE_DEFAULTS).context("invalid built-in score defaults")
    }

    /// Recomputes `eval_code` from `eval`, trims notes, and rejects ratings
    /// outside `RATING_RANGE`.
    pub fn normalized(mut self) -> Result<Self> {
        self.score_eval = ScoreEval::new(self.score_eval.eval, &self.score_eval.notes);
        for notes in [
            &mut self.error_eval.notes,
            &mut self.reference_eval.notes,
            &mut self.general_eval.notes,
            &mut self.misc_eval.notes,
        ] {
            *notes = notes.trim().to_string();
        }

        let ratings = [
            ("reference_relevancy", self.reference_eval.reference_relevancy),
            ("relevancy", self.general_eval.relevancy),
            ("readability", self.general_eval.readability),
            ("reproducibility", self.general_eval.reproducibility),
            ("confidence_rating", self.general_eval.confidence_rating),
            ("human_domain_rating", self.misc_eval.human_domain_rating),
            (
                "evaluator_confidence_rating",
                self.misc_eval.evaluator_confidence_rating,
            ),
            (
                "evaluator_familiarity_level",
                self.misc_eval.evaluator_familiarity_level,
            ),
        ];
        for (name, value) in ratings {
            if !RATING_RANGE.contains(&value) {
                bail!(
                    "{name} must be between {} and {}, got {value}",
                    RATING_RANGE.start(),
                    RATING_RANGE.end()
                );
            }
        }
        Ok(self)
    }

    /// Equal to `defaults` ignoring note whitespace and letter case.
    pub fn is_default(&self, defaults: &EvalData) -> bool {
        self.comparable() == defaults.comparable()
    }

    fn comparable(&self) -> Self {
        let mut copy = self.clone();
        copy.score_eval.eval_code = copy.score_eval.eval.code();
        for notes in [
            &mut copy.score_eval.notes,
            &mut copy.error_eval.notes,
            &mut copy.reference_eval.notes,
            &mut copy.general_eval.notes,
            &mut copy.misc_eval.notes,
        ] {
            *notes = notes.trim().to_lowercase();
        }
        copy
    }
}
