use crate::helper::error_chain_fmt;

/// The closed set of synthesis behaviors the pipeline supports.
///
/// The mode is validated at the boundary: an unrecognized mode string is a
/// caller contract violation and fails fast, it never silently falls back
/// to a generic behavior deeper in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    SynthesizeNotes,
    GenerateQuestions,
    AnalyzeKnowledgeGaps,
}

impl GenerationMode {
    pub fn parse(s: &str) -> Result<GenerationMode, GenerationModeError> {
        match s {
            "synthesize_notes" => Ok(Self::SynthesizeNotes),
            "generate_questions" => Ok(Self::GenerateQuestions),
            "analyze_knowledge_gaps" => Ok(Self::AnalyzeKnowledgeGaps),
            other => Err(GenerationModeError::UnknownMode(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SynthesizeNotes => "synthesize_notes",
            Self::GenerateQuestions => "generate_questions",
            Self::AnalyzeKnowledgeGaps => "analyze_knowledge_gaps",
        }
    }
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

#[derive(thiserror::Error)]
pub enum GenerationModeError {
    #[error("{0} is not a supported generation mode. Use one of: synthesize_notes, generate_questions, analyze_knowledge_gaps.")]
    UnknownMode(String),
}

impl std::fmt::Debug for GenerationModeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::GenerationMode;
    use claims::assert_err;

    #[test]
    fn the_three_recognized_modes_are_parsed() {
        assert_eq!(
            GenerationMode::parse("synthesize_notes").unwrap(),
            GenerationMode::SynthesizeNotes
        );
        assert_eq!(
            GenerationMode::parse("generate_questions").unwrap(),
            GenerationMode::GenerateQuestions
        );
        assert_eq!(
            GenerationMode::parse("analyze_knowledge_gaps").unwrap(),
            GenerationMode::AnalyzeKnowledgeGaps
        );
    }

    #[test]
    fn an_unknown_mode_is_rejected() {
        assert_err!(GenerationMode::parse("summarize"));
        assert_err!(GenerationMode::parse(""));
        assert_err!(GenerationMode::parse("SYNTHESIZE_NOTES"));
    }

    #[test]
    fn parse_round_trips_with_as_str() {
        for mode in [
            GenerationMode::SynthesizeNotes,
            GenerationMode::GenerateQuestions,
            GenerationMode::AnalyzeKnowledgeGaps,
        ] {
            assert_eq!(GenerationMode::parse(mode.as_str()).unwrap(), mode);
        }
    }
}
