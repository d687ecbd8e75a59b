use crate::domain::entities::{contribution::Contribution, generation_mode::GenerationMode};

/// Separator between contribution blocks in the user instruction
const CONTRIBUTION_SEPARATOR: &str = "\n\n---\n\n";

/// User instruction when there is nothing to work on and no override was given
const EMPTY_CONTENT_INSTRUCTION: &str =
    "Analyser emnets innhold og generer relevant informasjon.";

/// The two instruction strings sent to the generation provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub system_instruction: String,
    pub user_instruction: String,
}

/// Builds the provider prompt for one generation call.
///
/// Pure and deterministic: identical inputs produce byte-identical
/// instruction strings, no I/O, no side effects.
pub fn build_prompt(
    mode: GenerationMode,
    emne_title: &str,
    emne_goals: Option<&str>,
    contributions: &[Contribution],
    instruction_override: Option<&str>,
) -> PromptSet {
    PromptSet {
        system_instruction: system_instruction(mode, emne_title, emne_goals),
        user_instruction: user_instruction(mode, contributions, instruction_override),
    }
}

/// Derives the persisted document title from the mode and the emne title
pub fn document_title(mode: GenerationMode, emne_title: &str) -> String {
    match mode {
        GenerationMode::SynthesizeNotes => format!("Masterdokument - {}", emne_title),
        GenerationMode::GenerateQuestions => format!("Diskusjonsspørsmål - {}", emne_title),
        GenerationMode::AnalyzeKnowledgeGaps => format!("Kunnskapsanalyse - {}", emne_title),
    }
}

/// Fixed instruction template per mode: output language, structural
/// conventions and the behavioral goal of the generation.
fn system_instruction(mode: GenerationMode, emne_title: &str, emne_goals: Option<&str>) -> String {
    let goals_block = match emne_goals {
        Some(goals) => format!("Gruppens mål: {}\n\n", goals),
        None => String::new(),
    };

    match mode {
        GenerationMode::SynthesizeNotes => format!(
            "Du er en ekspert på å syntetisere og organisere kunnskap fra studiegrupper.\n\
             \n\
             Din oppgave er å lage et masterdokument som samler og organiserer all kunnskap \
             fra en studiegruppe (emne: \"{}\").\n\
             \n\
             {}Retningslinjer:\n\
             1. Organiser innholdet logisk og strukturert\n\
             2. Identifiser hovedtemaer og nøkkelkonsepter\n\
             3. Fremhev viktige innsikter og sammenhenger\n\
             4. Bruk norsk språk\n\
             5. Vær presis og faktabasert\n\
             6. Inkluder anbefalinger for videre læring\n\
             7. Bruk markdown for struktur med overskrifter, lister og fremhevinger",
            emne_title, goals_block
        ),
        GenerationMode::GenerateQuestions => format!(
            "Du er en ekspert på å lage læringsorienterte diskusjonsspørsmål for studiegrupper.\n\
             \n\
             Din oppgave er å generere relevante og utfordrende spørsmål basert på gruppens \
             notater og diskusjoner (emne: \"{}\").\n\
             \n\
             Retningslinjer:\n\
             1. Spørsmålene skal stimulere dypere forståelse\n\
             2. Inkluder både teoretiske og praktiske spørsmål\n\
             3. Organiser spørsmålene i kategorier\n\
             4. Bruk norsk språk\n\
             5. Vær tydelig og presis\n\
             6. Generer 10-15 spørsmål totalt",
            emne_title
        ),
        GenerationMode::AnalyzeKnowledgeGaps => format!(
            "Du er en ekspert på å analysere kunnskapshull og læringsprogresjon i studiegrupper.\n\
             \n\
             Din oppgave er å analysere gruppens kunnskap og identifisere områder som trenger \
             mer oppmerksomhet (emne: \"{}\").\n\
             \n\
             {}Retningslinjer:\n\
             1. Identifiser sterke sider i gruppens kunnskap\n\
             2. Identifiser utviklingsområder og kunnskapshull\n\
             3. Gi konkrete anbefalinger for videre læring\n\
             4. Bruk norsk språk\n\
             5. Vær konstruktiv og støttende\n\
             6. Fokuser på læringsutbytte",
            emne_title, goals_block
        ),
    }
}

fn user_instruction(
    mode: GenerationMode,
    contributions: &[Contribution],
    instruction_override: Option<&str>,
) -> String {
    if contributions.is_empty() {
        return instruction_override
            .unwrap_or(EMPTY_CONTENT_INSTRUCTION)
            .to_string();
    }

    let lead_in = instruction_override.unwrap_or(match mode {
        GenerationMode::SynthesizeNotes => {
            "Synteser følgende bidrag til et strukturert masterdokument:"
        }
        GenerationMode::GenerateQuestions => {
            "Generer diskusjonsspørsmål basert på følgende notater:"
        }
        GenerationMode::AnalyzeKnowledgeGaps => {
            "Analyser følgende bidrag og identifiser kunnskapshull:"
        }
    });

    let blocks = contributions
        .iter()
        .enumerate()
        .map(|(i, contribution)| {
            format!(
                "## Bidrag {}: {} ({})\n{}",
                i + 1,
                contribution.title,
                contribution.kind,
                contribution.content
            )
        })
        .collect::<Vec<_>>()
        .join(CONTRIBUTION_SEPARATOR);

    format!("{}\n\n{}", lead_in, blocks)
}
