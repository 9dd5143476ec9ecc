//! Prompt text sent to the generator.

use parley_core::messages::{ChatMessage, Participant, SimulationRequest};

const NO_DIALOGUE: &str = "(no previous dialogue)";
const SUMMARY_HEADER: &str = "Summarize the following conversation focusing on stable knowledge.";

/// The conversation so far as plain text: scenario line, then `role: content` lines.
pub fn render_conversation(request: &SimulationRequest, messages: &[ChatMessage]) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(messages.len() + 1);
    if let Some(scenario) = request.scenario() {
        lines.push(format!("Scenario: {scenario}"));
    }
    lines.extend(messages.iter().map(transcript_line));

    if lines.is_empty() {
        NO_DIALOGUE.to_string()
    } else {
        lines.join("\n")
    }
}

/// Prompt asking `participant` for exactly one reply.
pub fn participant_prompt(
    request: &SimulationRequest,
    messages: &[ChatMessage],
    participant: &Participant,
) -> String {
    let persona_section = participant
        .persona
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("\nPersona guidance: {p}"))
        .unwrap_or_default();
    let conversation = render_conversation(request, messages);
    let role = &participant.role;

    format!(
        "You are {role}, participating in a round-table discussion with other expert agents.\
         {persona_section}\n\
         Respond with a single, well-formed message that reflects your expertise and advances the conversation.\n\
         Do not narrate actions or mention that you are an AI model.\n\
         Conversation so far:\n{conversation}\n\n\
         {role}:"
    )
}

/// Prompt asking for a summary of the whole transcript.
pub fn summary_prompt(messages: &[ChatMessage]) -> String {
    let mut lines = Vec::with_capacity(messages.len() + 1);
    lines.push(SUMMARY_HEADER.to_string());
    lines.extend(messages.iter().map(transcript_line));
    lines.join("\n")
}

fn transcript_line(message: &ChatMessage) -> String {
    format!("{}: {}", message.role, message.content)
}
