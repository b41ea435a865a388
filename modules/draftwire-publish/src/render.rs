//! Markdown document rendering for the published site.

use draftwire_common::{Stage, WorkflowState};

/// Repository path for an item's published document.
pub fn document_path(state: &WorkflowState) -> String {
    format!(
        "content/{}/{}.md",
        slug(&state.input.category),
        state.input.item_id
    )
}

/// Render the finished document from the workflow's final draft.
pub fn render_document(state: &WorkflowState) -> String {
    let body = state
        .result_for(Stage::Finalize)
        .map(|r| r.payload.as_str())
        .unwrap_or_default();
    render_with_body(state, body)
}

/// Render with an explicit body — used by refresh, which regenerates the
/// draft without touching the append-only stage results.
pub fn render_with_body(state: &WorkflowState, body: &str) -> String {
    let input = &state.input;
    let mut doc = String::new();
    doc.push_str("---\n");
    doc.push_str(&format!("title: {:?}\n", input.title));
    doc.push_str(&format!("category: {:?}\n", input.category));
    if !input.section.is_empty() {
        doc.push_str(&format!("section: {:?}\n", input.section));
    }
    if !input.tags.is_empty() {
        let tags: Vec<String> = input.tags.iter().map(|t| format!("{t:?}")).collect();
        doc.push_str(&format!("tags: [{}]\n", tags.join(", ")));
    }
    if !input.url.is_empty() {
        doc.push_str(&format!("source: {:?}\n", input.url));
    }
    if let Some(completed_at) = state.completed_at {
        doc.push_str(&format!("date: {}\n", completed_at.format("%Y-%m-%d")));
    }
    doc.push_str("---\n\n");
    doc.push_str(body.trim());
    doc.push('\n');
    doc
}

fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_dash = true;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use draftwire_common::WorkflowInput;

    fn finished_state() -> WorkflowState {
        let now = Utc::now();
        let mut state = WorkflowState::new(
            WorkflowInput {
                item_id: "video-abc".into(),
                title: "Shipping \"zero-downtime\" deploys".into(),
                summary: String::new(),
                url: "https://example.com/v".into(),
                source_id: "chan".into(),
                category: "Cloud & Infra".into(),
                section: "platform".into(),
                tags: vec!["deploys".into()],
                featured: true,
            },
            now,
        );
        for stage in Stage::ALL {
            state
                .complete_stage(stage, format!("{stage} text"), now)
                .unwrap();
        }
        state
    }

    #[test]
    fn path_slugs_the_category() {
        let state = finished_state();
        assert_eq!(document_path(&state), "content/cloud-infra/video-abc.md");
    }

    #[test]
    fn document_carries_front_matter_and_final_body() {
        let state = finished_state();
        let doc = render_document(&state);
        assert!(doc.starts_with("---\n"));
        assert!(doc.contains("title: \"Shipping \\\"zero-downtime\\\" deploys\""));
        assert!(doc.contains("tags: [\"deploys\"]"));
        assert!(doc.ends_with("finalize text\n"));
    }

    #[test]
    fn body_override_replaces_the_final_draft() {
        let state = finished_state();
        let doc = render_with_body(&state, "refreshed body");
        assert!(doc.ends_with("refreshed body\n"));
        assert!(!doc.contains("finalize text"));
    }

    #[test]
    fn slug_collapses_punctuation_runs() {
        assert_eq!(slug("Cloud & Infra"), "cloud-infra");
        assert_eq!(slug("DevOps"), "devops");
        assert_eq!(slug("a  b!"), "a-b");
    }
}
