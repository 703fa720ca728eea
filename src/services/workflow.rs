//! Validation of a project's `workflow_config` graph definition.
//!
//! ```json
//! {"nodes": [{"id": "greet", "type": "llm", "config": {}}],
//!  "edges": [{"from": "greet", "to": "greet"}]}
//! ```

use serde_json::{Map, Value};
use std::collections::HashSet;

fn non_blank_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Returns human-readable problems; empty means valid. `{}` means "no
/// workflow" and is accepted.
pub fn validate_workflow(config: &Value) -> Vec<String> {
    let Some(obj) = config.as_object() else {
        return vec!["Workflow must be a JSON object.".to_string()];
    };
    if obj.is_empty() {
        return Vec::new();
    }

    let mut errors = Vec::new();
    let nodes = obj.get("nodes").and_then(Value::as_array).filter(|n| !n.is_empty());
    let edges = obj.get("edges").and_then(Value::as_array);
    if nodes.is_none() {
        errors.push("'nodes' must be a non-empty array.".to_string());
    }
    if edges.is_none() {
        errors.push("'edges' must be an array.".to_string());
    }
    let (Some(nodes), Some(edges)) = (nodes, edges) else {
        return errors;
    };

    let mut ids: HashSet<&str> = HashSet::new();
    for (idx, node) in nodes.iter().enumerate() {
        let Some(node) = node.as_object() else {
            errors.push(format!("nodes[{idx}] must be an object."));
            continue;
        };

        match non_blank_str(node, "id") {
            None => errors.push(format!("nodes[{idx}].id must be a non-empty string.")),
            Some(id) => {
                if !ids.insert(id) {
                    errors.push(format!("Duplicate node id '{id}'."));
                }
            }
        }
        if non_blank_str(node, "type").is_none() {
            errors.push(format!("nodes[{idx}].type must be a non-empty string."));
        }
        if !node.get("config").is_some_and(Value::is_object) {
            errors.push(format!("nodes[{idx}].config must be an object."));
        }
    }

    for (idx, edge) in edges.iter().enumerate() {
        let Some(edge) = edge.as_object() else {
            errors.push(format!("edges[{idx}] must be an object."));
            continue;
        };
        for end in ["from", "to"] {
            match non_blank_str(edge, end) {
                None => errors.push(format!("edges[{idx}].{end} must be a non-empty string.")),
                Some(id) if !ids.contains(id) => {
                    errors.push(format!("edges[{idx}].{end} refers to unknown node '{id}'."))
                }
                Some(_) => {}
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_means_no_workflow() {
        assert!(validate_workflow(&json!({})).is_empty());
        assert_eq!(validate_workflow(&json!([])), vec!["Workflow must be a JSON object."]);
    }

    #[test]
    fn accepts_a_small_graph() {
        let wf = json!({
            "nodes": [
                {"id": "classify", "type": "llm", "config": {"model": "x"}},
                {"id": "lead", "type": "save_lead", "config": {}}
            ],
            "edges": [{"from": "classify", "to": "lead", "condition": "lead"}]
        });
        assert!(validate_workflow(&wf).is_empty());
    }

    #[test]
    fn missing_collections_stop_early() {
        let errors = validate_workflow(&json!({"nodes": []}));
        assert_eq!(
            errors,
            vec!["'nodes' must be a non-empty array.", "'edges' must be an array."]
        );
    }

    #[test]
    fn reports_every_node_and_edge_problem() {
        let wf = json!({
            "nodes": [
                {"id": "a", "type": "llm", "config": {}},
                {"id": "a", "type": "", "config": []},
                "oops"
            ],
            "edges": [{"from": "a", "to": "ghost"}, {"to": "a"}]
        });
        assert_eq!(
            validate_workflow(&wf),
            vec![
                "Duplicate node id 'a'.",
                "nodes[1].type must be a non-empty string.",
                "nodes[1].config must be an object.",
                "nodes[2] must be an object.",
                "edges[0].to refers to unknown node 'ghost'.",
                "edges[1].from must be a non-empty string.",
            ]
        );
    }
}
