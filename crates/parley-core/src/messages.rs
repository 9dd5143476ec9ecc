use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named speaker in a simulated dialogue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

impl Participant {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            persona: None,
        }
    }

    pub fn with_persona(role: impl Into<String>, persona: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            persona: Some(persona.into()),
        }
    }
}

/// Input for one simulation job. Immutable once submitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub turns: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub participants: Vec<Participant>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("turns must be at least 1")]
    NoTurns,
    #[error("at least two participants are required, got {0}")]
    TooFewParticipants(usize),
    #[error("participant {0} has an empty role")]
    EmptyRole(usize),
}

impl SimulationRequest {
    /// Check the shape constraints a boundary layer is expected to enforce.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.turns == 0 {
            return Err(RequestError::NoTurns);
        }
        if self.participants.len() < 2 {
            return Err(RequestError::TooFewParticipants(self.participants.len()));
        }
        if let Some(idx) = self
            .participants
            .iter()
            .position(|p| p.role.trim().is_empty())
        {
            return Err(RequestError::EmptyRole(idx));
        }
        Ok(())
    }

    /// Scenario text, if present and non-blank.
    pub fn scenario(&self) -> Option<&str> {
        self.context.as_deref().filter(|c| !c.is_empty())
    }

    /// Number of messages a completed run produces.
    pub fn expected_messages(&self) -> usize {
        self.turns as usize * self.participants.len()
    }
}

/// One line of a transcript.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(turns: u32, roles: &[&str]) -> SimulationRequest {
        SimulationRequest {
            turns,
            context: None,
            participants: roles.iter().map(|r| Participant::new(*r)).collect(),
        }
    }

    #[test]
    fn validate_accepts_minimal_request() {
        assert!(request(1, &["Engineer", "Strategist"]).validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_turns() {
        assert_eq!(
            request(0, &["A", "B"]).validate(),
            Err(RequestError::NoTurns)
        );
    }

    #[test]
    fn validate_rejects_single_participant() {
        assert_eq!(
            request(2, &["Solo"]).validate(),
            Err(RequestError::TooFewParticipants(1))
        );
    }

    #[test]
    fn validate_rejects_blank_role() {
        assert_eq!(
            request(1, &["A", "  "]).validate(),
            Err(RequestError::EmptyRole(1))
        );
    }

    #[test]
    fn expected_messages_is_turns_times_participants() {
        assert_eq!(request(3, &["A", "B", "C"]).expected_messages(), 9);
    }

    #[test]
    fn empty_context_is_no_scenario() {
        let mut req = request(1, &["A", "B"]);
        req.context = Some(String::new());
        assert!(req.scenario().is_none());
        req.context = Some("Grid storage".into());
        assert_eq!(req.scenario(), Some("Grid storage"));
    }

    #[test]
    fn deserializes_submission_payload() {
        let req: SimulationRequest = serde_json::from_value(serde_json::json!({
            "turns": 2,
            "participants": [
                {"role": "Engineer", "persona": "Detail oriented."},
                {"role": "Strategist"}
            ]
        }))
        .unwrap();
        assert_eq!(req.turns, 2);
        assert!(req.context.is_none());
        assert_eq!(req.participants[0].persona.as_deref(), Some("Detail oriented."));
        assert!(req.participants[1].persona.is_none());
    }
}
