//! Stage prompt construction.
//!
//! Each stage's prompt consumes the full accumulated output of all prior
//! stages, which is why stages are strictly sequential. Prompt text is the
//! only per-stage behavioral difference; the control-flow skeleton in the
//! orchestrator is shared.

use ai_client::util::truncate_to_char_boundary;
use draftwire_common::{Stage, WorkflowState};

/// Byte budget per prior-stage payload when embedding it in a prompt.
const PRIOR_RESULT_BUDGET: usize = 12_000;

/// Sampling temperature for a stage. Early stages explore; verification
/// stays close to deterministic.
pub fn temperature(stage: Stage) -> f32 {
    match stage {
        Stage::Research => 0.7,
        Stage::Structure => 0.4,
        Stage::Factcheck => 0.2,
        Stage::Finalize => 0.5,
    }
}

/// Build the prompt for a stage from the workflow input and everything
/// completed so far.
pub fn stage_prompt(stage: Stage, state: &WorkflowState) -> String {
    match stage {
        Stage::Research => research_prompt(state),
        Stage::Structure => structure_prompt(state),
        Stage::Factcheck => factcheck_prompt(state),
        Stage::Finalize => finalize_prompt(state),
    }
}

fn item_header(state: &WorkflowState) -> String {
    let input = &state.input;
    let mut header = format!(
        "Topic: {}\nCategory: {}\nSection: {}\n",
        input.title, input.category, input.section
    );
    if !input.tags.is_empty() {
        header.push_str(&format!("Tags: {}\n", input.tags.join(", ")));
    }
    if !input.url.is_empty() {
        header.push_str(&format!("Source URL: {}\n", input.url));
    }
    if !input.summary.is_empty() {
        header.push_str(&format!("Source summary: {}\n", input.summary));
    }
    header
}

fn prior_results(state: &WorkflowState, stages: &[Stage]) -> String {
    let mut out = String::new();
    for stage in stages {
        if let Some(result) = state.result_for(*stage) {
            out.push_str(&format!(
                "\n--- {} output ---\n{}\n",
                stage,
                truncate_to_char_boundary(&result.payload, PRIOR_RESULT_BUDGET)
            ));
        }
    }
    out
}

fn research_prompt(state: &WorkflowState) -> String {
    format!(
        "You are researching a technical article for a developer-focused publication.\n\n\
         {}\n\
         Produce a research brief: the key facts, the tools and versions involved, \
         the main use cases, common pitfalls, and two or three angles that would make \
         the article worth reading. Cite the concrete claims you are confident about \
         and flag anything uncertain.",
        item_header(state)
    )
}

fn structure_prompt(state: &WorkflowState) -> String {
    format!(
        "You are outlining a technical article.\n\n\
         {}{}\n\
         Using the research brief above, produce a complete article outline: working \
         title, one-paragraph hook, section headings with two or three bullet points \
         each, and a closing takeaway. Keep the structure tight; cut anything the \
         research does not support.",
        item_header(state),
        prior_results(state, &[Stage::Research])
    )
}

fn factcheck_prompt(state: &WorkflowState) -> String {
    format!(
        "You are fact-checking an article outline against its research brief.\n\n\
         {}{}\n\
         Go through every factual claim in the outline. For each, state whether the \
         research supports it, corrects it, or cannot verify it, and give the \
         corrected wording where needed. List the claims that must be removed.",
        item_header(state),
        prior_results(state, &[Stage::Research, Stage::Structure])
    )
}

fn finalize_prompt(state: &WorkflowState) -> String {
    format!(
        "You are writing the final draft of a technical article.\n\n\
         {}{}\n\
         Write the complete article in markdown, following the outline and applying \
         every fact-check correction. Use the research brief for depth. Target an \
         experienced developer audience; no filler, no marketing tone. Return only \
         the article body.",
        item_header(state),
        prior_results(state, &[Stage::Research, Stage::Structure, Stage::Factcheck])
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use draftwire_common::WorkflowInput;

    fn state_with(stages: &[(Stage, &str)]) -> WorkflowState {
        let now = Utc::now();
        let mut state = WorkflowState::new(
            WorkflowInput {
                item_id: "abc".into(),
                title: "Terraform state locking".into(),
                summary: "A short summary".into(),
                url: "https://example.com/video".into(),
                source_id: "src".into(),
                category: "DevOps".into(),
                section: "infrastructure".into(),
                tags: vec!["terraform".into(), "iac".into()],
                featured: false,
            },
            now,
        );
        for (stage, payload) in stages {
            state.complete_stage(*stage, payload.to_string(), now).unwrap();
        }
        state
    }

    #[test]
    fn research_prompt_carries_input_fields() {
        let prompt = stage_prompt(Stage::Research, &state_with(&[]));
        assert!(prompt.contains("Terraform state locking"));
        assert!(prompt.contains("DevOps"));
        assert!(prompt.contains("terraform, iac"));
        assert!(prompt.contains("https://example.com/video"));
    }

    #[test]
    fn later_stages_accumulate_prior_output() {
        let state = state_with(&[
            (Stage::Research, "RESEARCH-BRIEF"),
            (Stage::Structure, "THE-OUTLINE"),
        ]);
        let prompt = stage_prompt(Stage::Factcheck, &state);
        assert!(prompt.contains("RESEARCH-BRIEF"));
        assert!(prompt.contains("THE-OUTLINE"));

        let earlier = stage_prompt(Stage::Structure, &state);
        assert!(earlier.contains("RESEARCH-BRIEF"));
        assert!(!earlier.contains("THE-OUTLINE"));
    }

    #[test]
    fn oversized_prior_output_is_truncated() {
        let big = "x".repeat(50_000);
        let state = state_with(&[(Stage::Research, big.as_str())]);
        let prompt = stage_prompt(Stage::Structure, &state);
        assert!(prompt.len() < 20_000);
    }
}
