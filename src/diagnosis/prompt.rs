// Instruction template for workflow diagnosis

use super::types::{DiagnosisError, DiagnosisRequest};

const INSTRUCTIONS: &str = r#"Act as a Senior Automation Architect. Analyze this automation workflow JSON.
Identify errors, inefficiencies, or logic gaps.

Then, CREATE A FIXED VERSION of the workflow.
- Keep existing nodes if they are correct.
- Add missing nodes (e.g., if missing a parser or data transformation).
- Correct connections (edges).
- Ensure coordinates (x, y) are adjusted so the graph looks clean and organized (left to right).

RETURN ONLY A RAW JSON OBJECT (no markdown formatting, no code blocks) with this exact structure:
{
    "analysis": "Markdown string with: # DIAGNOSIS (summary), # CORRECTION (explanation), # 3 PROFESSIONAL ALTERNATIVES (each option under a ## heading)",
    "fixedWorkflow": {
        "nodes": [ { "id": "...", "type": "trigger|action|helper", "x": 0, "y": 0, "data": { "name": "...", "icon": "...", "color": "...", "bg": "..." } } ],
        "edges": [ { "id": "...", "source": "...", "target": "..." } ]
    },
    "predictedOutcome": "A simulation string describing exactly what happens when this fixed workflow runs."
}
Use null for "fixedWorkflow" if no fix is possible."#;

/// Build the full prompt for a diagnosis request
pub fn build_prompt(request: &DiagnosisRequest) -> Result<String, DiagnosisError> {
    let workflow_json = serde_json::to_string_pretty(request)?;

    let mut prompt = String::from(INSTRUCTIONS);
    if let Some(error) = &request.runtime_error {
        prompt.push_str("\n\nTHE LAST RUN FAILED WITH THIS ERROR (address it in the fix):\n");
        prompt.push_str(error);
    }
    prompt.push_str("\n\nWORKFLOW DATA:\n");
    prompt.push_str(&workflow_json);
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphSnapshot, Node, NodeDescriptor, NodeKind, Point};

    #[test]
    fn test_prompt_embeds_workflow_and_error() {
        let workflow = GraphSnapshot {
            nodes: vec![Node::new("node-1", NodeKind::Trigger, Point::ZERO, NodeDescriptor::named("Gmail"))],
            edges: Vec::new(),
        };
        let request = DiagnosisRequest::new(workflow).with_runtime_error(Some("Timeout".to_string()));

        let prompt = build_prompt(&request).unwrap();
        assert!(prompt.contains("\"fixedWorkflow\""));
        assert!(prompt.contains("Timeout"));
        assert!(prompt.contains("\"node-1\""));
        assert!(prompt.ends_with('}'));
    }

    #[test]
    fn test_prompt_without_error() {
        let prompt = build_prompt(&DiagnosisRequest::new(GraphSnapshot::default())).unwrap();
        assert!(!prompt.contains("THE LAST RUN FAILED"));
        assert!(prompt.contains("WORKFLOW DATA:"));
    }
}
