//! Shared domain types and fixed column names
//!
//! The score-kind table is process-wide configuration: every dictionary
//! phrase maps to exactly one export column.

use serde::Serialize;

/// Subject identifier column in the scores export
pub const SUBJECT_COLUMN: &str = "PID";
/// Instrument label column in the scores export
pub const INSTRUMENT_COLUMN: &str = "InstrumentTitle";
/// Visit/session label column in the scores export
pub const VISIT_LABEL_COLUMN: &str = "AssessmentName";
/// Administration timestamp columns, in preference order
pub const TIMESTAMP_COLUMNS: &[&str] = &["DateFinished", "ResponseDate"];

/// Target variable name column in the data dictionary
pub const DICT_VARIABLE_COLUMN: &str = "Variable_Name";
/// Free-text definition column in the data dictionary
pub const DICT_DEFINITION_COLUMN: &str = "definition";

/// Output subject identifier column
pub const OUT_SUBJECT_COLUMN: &str = "subjectkey";
/// Output visit date column (present only with date grouping)
pub const OUT_DATE_COLUMN: &str = "interview_date";
/// Output visit label column (present only when visit labels exist)
pub const OUT_VISIT_COLUMN: &str = "eventname";

/// Numeric result type of one task administration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ScoreKind {
    AgeAdjustedStandardScoreStandardError,
    AgeAdjustedStandardScore,
    ChangeSensitiveScoreStandardError,
    ChangeSensitiveScore,
    ComputedScore,
    ItemCount,
    NationalPercentileAgeAdjusted,
    RawScore,
    ThetaStandardError,
    Theta,
    TScoreStandardError,
    TScore,
    FullyAdjustedTScore,
}

impl ScoreKind {
    pub const ALL: [ScoreKind; 13] = [
        ScoreKind::AgeAdjustedStandardScoreStandardError,
        ScoreKind::AgeAdjustedStandardScore,
        ScoreKind::ChangeSensitiveScoreStandardError,
        ScoreKind::ChangeSensitiveScore,
        ScoreKind::ComputedScore,
        ScoreKind::ItemCount,
        ScoreKind::NationalPercentileAgeAdjusted,
        ScoreKind::RawScore,
        ScoreKind::ThetaStandardError,
        ScoreKind::Theta,
        ScoreKind::TScoreStandardError,
        ScoreKind::TScore,
        ScoreKind::FullyAdjustedTScore,
    ];

    /// Phrase used for this kind in dictionary definitions
    pub fn phrase(self) -> &'static str {
        match self {
            ScoreKind::AgeAdjustedStandardScoreStandardError => "Age adjusted score standard error",
            ScoreKind::AgeAdjustedStandardScore => "Age adjusted score",
            ScoreKind::ChangeSensitiveScoreStandardError => "Change sensitive score standard error",
            ScoreKind::ChangeSensitiveScore => "Change sensitive score",
            ScoreKind::ComputedScore => "Computed score",
            ScoreKind::ItemCount => "Item count",
            ScoreKind::NationalPercentileAgeAdjusted => "National Percentile Age Adjusted score",
            ScoreKind::RawScore => "Raw Score",
            ScoreKind::ThetaStandardError => "Theta standard error",
            ScoreKind::Theta => "Theta",
            ScoreKind::TScoreStandardError => "T-score standard error",
            ScoreKind::TScore => "T-score",
            ScoreKind::FullyAdjustedTScore => "Fully Adjusted T-score",
        }
    }

    /// Export column holding values of this kind
    pub fn column(self) -> &'static str {
        match self {
            ScoreKind::AgeAdjustedStandardScoreStandardError => "AgeAdjustedStandardScoreStandardError",
            ScoreKind::AgeAdjustedStandardScore => "AgeAdjustedStandardScore",
            ScoreKind::ChangeSensitiveScoreStandardError => "ChangeSensitiveScoreStandardError",
            ScoreKind::ChangeSensitiveScore => "ChangeSensitiveScore",
            ScoreKind::ComputedScore => "ComputedScore",
            ScoreKind::ItemCount => "ItemCount",
            ScoreKind::NationalPercentileAgeAdjusted => "NationalPercentileAgeAdjusted",
            ScoreKind::RawScore => "RawScore",
            ScoreKind::ThetaStandardError => "ThetaStandardError",
            ScoreKind::Theta => "Theta",
            ScoreKind::TScoreStandardError => "TScoreStandardError",
            ScoreKind::TScore => "TScore",
            ScoreKind::FullyAdjustedTScore => "FullyAdjustedTScore",
        }
    }
}

/// One extractable target variable derived from a dictionary row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableSpec {
    /// Output column name
    pub target_variable: String,
    /// Instrument name with product prefix, version tag and score phrase removed
    pub instrument_key: String,
    pub score_kind: ScoreKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_phrases_and_columns_are_unique() {
        let phrases: HashSet<_> = ScoreKind::ALL.iter().map(|k| k.phrase()).collect();
        let columns: HashSet<_> = ScoreKind::ALL.iter().map(|k| k.column()).collect();
        assert_eq!(phrases.len(), ScoreKind::ALL.len());
        assert_eq!(columns.len(), ScoreKind::ALL.len());
    }

    #[test]
    fn test_fully_adjusted_t_score_column() {
        assert_eq!(ScoreKind::FullyAdjustedTScore.column(), "FullyAdjustedTScore");
        assert_eq!(ScoreKind::FullyAdjustedTScore.phrase(), "Fully Adjusted T-score");
    }
}
