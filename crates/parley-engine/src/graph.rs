//! Graph projection of a finished dialogue: session → messages → knowledge.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use parley_core::graph::{GraphEdge, GraphNode, GraphSnapshot};
use parley_core::messages::{ChatMessage, SimulationRequest};

pub const SESSION_NODE: &str = "SimulationSession";
pub const MESSAGE_NODE: &str = "SimulationMessage";
pub const KNOWLEDGE_NODE: &str = "SimulationKnowledge";

pub fn build_simulation_graph(
    request: &SimulationRequest,
    messages: &[ChatMessage],
    summary: &str,
) -> GraphSnapshot {
    let context = request.context.clone().unwrap_or_default();
    let mut nodes = Vec::with_capacity(messages.len() + 2);
    let mut edges = Vec::with_capacity(messages.len() * 2 + 2);

    let session_id = format!("sim-session-{}", Uuid::now_v7());
    let roles: Vec<&str> = request.participants.iter().map(|p| p.role.as_str()).collect();
    nodes.push(GraphNode {
        id: session_id.clone(),
        label: SESSION_NODE.into(),
        node_type: SESSION_NODE.into(),
        metadata: json!({
            "context": context,
            "turns": request.turns,
            "participants": roles,
            "generated_at": Utc::now().to_rfc3339(),
        }),
    });

    let mut previous: Option<String> = None;
    for (index, message) in messages.iter().enumerate() {
        let message_id = format!("sim-message-{index}");
        nodes.push(GraphNode {
            id: message_id.clone(),
            label: message.role.clone(),
            node_type: MESSAGE_NODE.into(),
            metadata: json!({
                "role": message.role,
                "content": message.content,
                "timestamp": message.timestamp.to_rfc3339(),
                "sequence": index,
            }),
        });
        edges.push(GraphEdge {
            source: session_id.clone(),
            target: message_id.clone(),
            relation: "HAS_MESSAGE".into(),
            metadata: json!({ "order": index }),
        });
        if let Some(prev) = previous.take() {
            edges.push(GraphEdge {
                source: prev,
                target: message_id.clone(),
                relation: "NEXT".into(),
                metadata: json!({ "sequence": index }),
            });
        }
        previous = Some(message_id);
    }

    let knowledge_id = format!("sim-knowledge-{}", Uuid::now_v7());
    nodes.push(GraphNode {
        id: knowledge_id.clone(),
        label: KNOWLEDGE_NODE.into(),
        node_type: KNOWLEDGE_NODE.into(),
        metadata: json!({
            "summary": summary,
            "context": context,
        }),
    });
    edges.push(GraphEdge {
        source: session_id,
        target: knowledge_id.clone(),
        relation: "YIELDED".into(),
        metadata: json!({}),
    });
    if let Some(last) = previous {
        edges.push(GraphEdge {
            source: last,
            target: knowledge_id,
            relation: "CONTRIBUTED_TO".into(),
            metadata: json!({}),
        });
    }

    GraphSnapshot { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::messages::Participant;

    fn request() -> SimulationRequest {
        SimulationRequest {
            turns: 2,
            context: Some("Explore renewable energy storage options.".into()),
            participants: vec![Participant::new("Engineer"), Participant::new("Strategist")],
        }
    }

    fn transcript(n: usize) -> Vec<ChatMessage> {
        let roles = ["Engineer", "Strategist"];
        (0..n)
            .map(|i| ChatMessage::new(roles[i % 2], format!("response-{}", i + 1)))
            .collect()
    }

    #[test]
    fn session_node_carries_request_metadata() {
        let graph = build_simulation_graph(&request(), &transcript(4), "Synthetic summary");
        let sessions: Vec<_> = graph.nodes_of_type(SESSION_NODE).collect();
        assert_eq!(sessions.len(), 1);
        let meta = &sessions[0].metadata;
        assert_eq!(meta["context"], "Explore renewable energy storage options.");
        assert_eq!(meta["turns"], 2);
        assert_eq!(meta["participants"], json!(["Engineer", "Strategist"]));
        assert!(sessions[0].id.starts_with("sim-session-"));
    }

    #[test]
    fn one_message_node_per_transcript_entry() {
        let graph = build_simulation_graph(&request(), &transcript(4), "s");
        let messages: Vec<_> = graph.nodes_of_type(MESSAGE_NODE).collect();
        assert_eq!(messages.len(), 4);
        for (i, node) in messages.iter().enumerate() {
            assert_eq!(node.id, format!("sim-message-{i}"));
            assert_eq!(node.metadata["sequence"], i);
        }
        assert_eq!(messages[1].label, "Strategist");
    }

    #[test]
    fn edges_chain_messages_and_link_knowledge() {
        let graph = build_simulation_graph(&request(), &transcript(4), "s");
        assert_eq!(graph.edges_with_relation("HAS_MESSAGE").count(), 4);

        let next: Vec<_> = graph.edges_with_relation("NEXT").collect();
        assert_eq!(next.len(), 3);
        assert_eq!(next[0].source, "sim-message-0");
        assert_eq!(next[0].target, "sim-message-1");

        let knowledge = graph.nodes_of_type(KNOWLEDGE_NODE).next().unwrap();
        assert_eq!(knowledge.metadata["summary"], "s");

        let yielded = graph.edges_with_relation("YIELDED").next().unwrap();
        assert_eq!(yielded.target, knowledge.id);

        let contributed = graph.edges_with_relation("CONTRIBUTED_TO").next().unwrap();
        assert_eq!(contributed.source, "sim-message-3");
        assert_eq!(contributed.target, knowledge.id);
    }

    #[test]
    fn empty_transcript_has_no_contribution_edge() {
        let graph = build_simulation_graph(&request(), &[], "nothing said");
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].relation, "YIELDED");
    }
}
