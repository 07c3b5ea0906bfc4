//! Interview loop: session state machine and the controller that drives it.
//!
//! `InterviewSession` transitions are pure: each takes `&self` and returns a
//! new session, leaving the input untouched on error. The controller is the
//! only place that talks to the model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::models::{ConversationTurn, IntakeValidationError, PatientDetails};

use super::model::{CallKind, GenerationRequest, ModelClient, ModelError};
use super::parser::{parse_next_action, NextAction};
use super::prompt::{build_next_question_prompt, HistoryMessage, NEXT_QUESTION_SYSTEM_PROMPT};
use super::report::Transcript;

/// Placeholder for a question left without an answer in the transcript.
pub const NOT_ANSWERED: &str = "Not answered";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewState {
    NotStarted,
    AwaitingQuestion,
    AwaitingAnswer,
    Complete,
}

impl InterviewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::AwaitingQuestion => "awaiting_question",
            Self::AwaitingAnswer => "awaiting_answer",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for InterviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterviewError {
    #[error("Cannot {action} while the interview is {state}")]
    InvalidTransition {
        state: InterviewState,
        action: &'static str,
    },

    #[error("The interview is complete; no further questions")]
    AlreadyComplete,

    #[error("Answer text is empty")]
    EmptyAnswer,

    #[error("Turn {0} does not exist")]
    TurnNotFound(usize),

    #[error("Turn {0} is not an answer")]
    NotAnAnswer(usize),

    #[error("Invalid intake: {0}")]
    InvalidIntake(#[from] IntakeValidationError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// One interview: intake details plus the ordered, append-only turn list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSession {
    pub id: Uuid,
    pub patient_details: PatientDetails,
    pub turns: Vec<ConversationTurn>,
    pub state: InterviewState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InterviewSession {
    pub fn new(patient_details: PatientDetails) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            patient_details,
            turns: Vec::new(),
            state: InterviewState::NotStarted,
            created_at: now,
            updated_at: now,
        }
    }

    fn expect_state(
        &self,
        expected: InterviewState,
        action: &'static str,
    ) -> Result<(), InterviewError> {
        if self.state == expected {
            Ok(())
        } else if self.state == InterviewState::Complete {
            Err(InterviewError::AlreadyComplete)
        } else {
            Err(InterviewError::InvalidTransition {
                state: self.state,
                action,
            })
        }
    }

    fn advance(&self, state: InterviewState, turn: Option<ConversationTurn>) -> Self {
        let mut next = self.clone();
        if let Some(turn) = turn {
            next.turns.push(turn);
        }
        next.state = state;
        next.updated_at = Utc::now();
        next
    }

    /// `NotStarted → AwaitingQuestion`. Intake rules are checked here.
    pub fn start(&self) -> Result<Self, InterviewError> {
        self.expect_state(InterviewState::NotStarted, "start")?;
        self.patient_details.validate()?;
        Ok(self.advance(InterviewState::AwaitingQuestion, None))
    }

    /// Apply the model's decision: append a question (`→ AwaitingAnswer`)
    /// or finish (`→ Complete`).
    pub fn receive_next(&self, action: NextAction) -> Result<Self, InterviewError> {
        self.expect_state(InterviewState::AwaitingQuestion, "receive a question")?;
        Ok(match action {
            NextAction::Question { text, options } => self.advance(
                InterviewState::AwaitingAnswer,
                Some(ConversationTurn::question(text, options)),
            ),
            NextAction::Complete => self.advance(InterviewState::Complete, None),
        })
    }

    /// `AwaitingAnswer → AwaitingQuestion`, appending the trimmed answer.
    pub fn submit_answer(&self, text: &str) -> Result<Self, InterviewError> {
        self.expect_state(InterviewState::AwaitingAnswer, "submit an answer")?;
        let text = text.trim();
        if text.is_empty() {
            return Err(InterviewError::EmptyAnswer);
        }
        Ok(self.advance(
            InterviewState::AwaitingQuestion,
            Some(ConversationTurn::answer(text)),
        ))
    }

    /// Attach a translation to an existing answer turn. Allowed in any state
    /// once the turn exists.
    pub fn with_answer_translation(
        &self,
        index: usize,
        translated: String,
    ) -> Result<Self, InterviewError> {
        let mut next = self.clone();
        match next.turns.get_mut(index) {
            Some(ConversationTurn::Answer { translation, .. }) => {
                *translation = Some(translated);
            }
            Some(ConversationTurn::Question { .. }) => {
                return Err(InterviewError::NotAnAnswer(index))
            }
            None => return Err(InterviewError::TurnNotFound(index)),
        }
        next.updated_at = Utc::now();
        Ok(next)
    }

    /// Text of answer turn `index`.
    pub fn answer_text(&self, index: usize) -> Result<&str, InterviewError> {
        match self.turns.get(index) {
            Some(ConversationTurn::Answer { text, .. }) => Ok(text),
            Some(ConversationTurn::Question { .. }) => Err(InterviewError::NotAnAnswer(index)),
            None => Err(InterviewError::TurnNotFound(index)),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == InterviewState::Complete
    }

    pub fn question_count(&self) -> usize {
        self.turns.iter().filter(|t| t.is_question()).count()
    }

    /// History as sent to the model: questions as `model`, answers as
    /// `user`, English text only.
    pub fn model_history(&self) -> Vec<HistoryMessage> {
        self.turns
            .iter()
            .map(|turn| HistoryMessage {
                role: turn.role(),
                content: turn.english_text().to_string(),
            })
            .collect()
    }

    /// Frozen transcript for report generation.
    pub fn transcript(&self) -> Transcript {
        Transcript::new(&self.patient_details, &self.turns)
    }
}

/// Serialize turns as `"<question>: <answer>"` lines. A question without a
/// following answer gets `"Not answered"`; answers without a preceding
/// question are skipped.
pub fn qa_pairs(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .enumerate()
        .filter_map(|(i, turn)| match turn {
            ConversationTurn::Question { english, .. } => {
                let answer = match turns.get(i + 1) {
                    Some(ConversationTurn::Answer { text, .. }) => text.as_str(),
                    _ => NOT_ANSWERED,
                };
                Some(format!("{english}: {answer}"))
            }
            ConversationTurn::Answer { .. } => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ═══════════════════════════════════════════
// Controller
// ═══════════════════════════════════════════

/// Drives one model round-trip per call.
pub struct InterviewController<'a> {
    client: &'a dyn ModelClient,
}

impl<'a> InterviewController<'a> {
    pub fn new(client: &'a dyn ModelClient) -> Self {
        Self { client }
    }

    /// Validate intake, create a session and request the first question.
    pub async fn begin(&self, details: PatientDetails) -> Result<InterviewSession, InterviewError> {
        let session = InterviewSession::new(details).start()?;
        self.request_next(&session).await
    }

    /// Ask the model for the next action and return the advanced session.
    ///
    /// The input session is never modified; on error the caller keeps it and
    /// may retry with identical history. A complete session is rejected
    /// before any model call.
    pub async fn request_next(
        &self,
        session: &InterviewSession,
    ) -> Result<InterviewSession, InterviewError> {
        session.expect_state(InterviewState::AwaitingQuestion, "request a question")?;

        let span = tracing::info_span!(
            "interview_next",
            session_id = %session.id,
            turns = session.turns.len(),
        );

        async {
            let start = std::time::Instant::now();

            let prompt = build_next_question_prompt(
                &session.patient_details.to_prompt_summary(),
                &session.model_history(),
            );
            let request = GenerationRequest::json(
                CallKind::NextQuestion,
                NEXT_QUESTION_SYSTEM_PROMPT,
                prompt,
            );

            let response = self.client.generate(&request).await?;
            let action = parse_next_action(&response).inspect_err(|e| {
                tracing::warn!(error = %e, "Next-question response rejected");
            })?;
            let next = session.receive_next(action)?;

            tracing::info!(
                state = next.state.as_str(),
                questions = next.question_count(),
                elapsed_ms = %start.elapsed().as_millis(),
                "Interview advanced"
            );
            Ok::<_, InterviewError>(next)
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::patient::tests::sample_details;
    use crate::models::BilingualText;
    use crate::pipeline::model::MockModelClient;

    const ONSET_QUESTION: &str = r#"{"isComplete": false, "nextQuestion": {"english": "When did the chest pain start?", "persian": "درد قفسه سینه از چه زمانی شروع شد؟", "options": [{"english": "Less than 1 hour ago", "persian": "کمتر از ۱ ساعت پیش"}, {"english": "Hours ago", "persian": "چند ساعت پیش"}]}}"#;
    const NATURE_QUESTION: &str = r#"{"isComplete": false, "nextQuestion": {"english": "Describe the pain.", "persian": "درد را توصیف کنید."}}"#;
    const COMPLETE: &str = r#"{"isComplete": true}"#;

    fn question(en: &str) -> NextAction {
        NextAction::Question {
            text: BilingualText::new(en, "پرسش"),
            options: None,
        }
    }

    fn started() -> InterviewSession {
        InterviewSession::new(sample_details()).start().unwrap()
    }

    #[test]
    fn full_state_cycle() {
        let s0 = InterviewSession::new(sample_details());
        assert_eq!(s0.state, InterviewState::NotStarted);

        let s1 = s0.start().unwrap();
        assert_eq!(s1.state, InterviewState::AwaitingQuestion);

        let s2 = s1.receive_next(question("Onset?")).unwrap();
        assert_eq!(s2.state, InterviewState::AwaitingAnswer);
        assert_eq!(s2.turns.len(), 1);

        let s3 = s2.submit_answer("  2 hours ago ").unwrap();
        assert_eq!(s3.state, InterviewState::AwaitingQuestion);
        assert_eq!(s3.turns[1], ConversationTurn::answer("2 hours ago"));

        let s4 = s3.receive_next(NextAction::Complete).unwrap();
        assert!(s4.is_complete());
        assert_eq!(s4.turns.len(), 2);

        // Inputs untouched.
        assert_eq!(s2.turns.len(), 1);
        assert_eq!(s0.state, InterviewState::NotStarted);
    }

    #[test]
    fn invalid_transitions_rejected() {
        let fresh = InterviewSession::new(sample_details());
        assert!(matches!(
            fresh.submit_answer("x"),
            Err(InterviewError::InvalidTransition { .. })
        ));
        assert!(matches!(
            fresh.receive_next(NextAction::Complete),
            Err(InterviewError::InvalidTransition { .. })
        ));

        let awaiting_question = started();
        assert!(awaiting_question.submit_answer("x").is_err());
        assert!(awaiting_question.start().is_err());

        let awaiting_answer = awaiting_question.receive_next(question("Q?")).unwrap();
        assert!(awaiting_answer.receive_next(question("Q2?")).is_err());
    }

    #[test]
    fn complete_rejects_everything() {
        let done = started().receive_next(NextAction::Complete).unwrap();
        assert_eq!(
            done.receive_next(question("More?")),
            Err(InterviewError::AlreadyComplete)
        );
        assert_eq!(done.submit_answer("x"), Err(InterviewError::AlreadyComplete));
    }

    #[test]
    fn empty_answer_rejected() {
        let s = started().receive_next(question("Q?")).unwrap();
        assert_eq!(s.submit_answer("   "), Err(InterviewError::EmptyAnswer));
    }

    #[test]
    fn start_enforces_intake_rules() {
        let mut details = sample_details();
        details.chief_complaint = "pain".into();
        assert_eq!(
            InterviewSession::new(details).start(),
            Err(InterviewError::InvalidIntake(
                IntakeValidationError::ChiefComplaintTooShort
            ))
        );
    }

    #[test]
    fn model_history_roles_and_text() {
        let s = started()
            .receive_next(question("Onset?"))
            .unwrap()
            .submit_answer("2 hours ago")
            .unwrap();
        let history = s.model_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role.as_str(), "model");
        assert_eq!(history[0].content, "Onset?");
        assert_eq!(history[1].role.as_str(), "user");
        assert_eq!(history[1].content, "2 hours ago");
    }

    #[test]
    fn qa_pairs_marks_unanswered() {
        let turns = vec![
            ConversationTurn::question(BilingualText::new("Onset?", "شروع؟"), None),
            ConversationTurn::answer("2 hours ago"),
            ConversationTurn::question(BilingualText::new("Radiation?", "انتشار؟"), None),
        ];
        assert_eq!(
            qa_pairs(&turns),
            "Onset?: 2 hours ago\nRadiation?: Not answered"
        );
        assert_eq!(qa_pairs(&[]), "");
    }

    #[test]
    fn answer_translation_attached() {
        let s = started()
            .receive_next(question("Onset?"))
            .unwrap()
            .submit_answer("دو ساعت پیش")
            .unwrap();
        let translated = s
            .with_answer_translation(1, "two hours ago".into())
            .unwrap();
        assert_eq!(
            translated.turns[1],
            ConversationTurn::Answer {
                text: "دو ساعت پیش".into(),
                translation: Some("two hours ago".into())
            }
        );
        assert_eq!(
            s.with_answer_translation(0, "x".into()),
            Err(InterviewError::NotAnAnswer(0))
        );
        assert_eq!(
            s.with_answer_translation(9, "x".into()),
            Err(InterviewError::TurnNotFound(9))
        );
    }

    #[tokio::test]
    async fn first_question_then_answer_sends_two_turn_history() {
        let mut details = sample_details();
        details.name = "Ali".into();
        details.chief_complaint = "chest pain".into();

        let mock = MockModelClient::new(COMPLETE)
            .with_response(CallKind::NextQuestion, ONSET_QUESTION)
            .with_response(CallKind::NextQuestion, NATURE_QUESTION);
        let controller = InterviewController::new(&mock);

        let first = controller.begin(details).await.unwrap();
        assert_eq!(first.state, InterviewState::AwaitingAnswer);
        assert_eq!(first.turns.len(), 1);
        match &first.turns[0] {
            ConversationTurn::Question { english, options, .. } => {
                assert!(english.contains("start"));
                assert_eq!(options.as_ref().map(Vec::len), Some(2));
            }
            other => panic!("expected question, got {other:?}"),
        }

        let answered = first.submit_answer("2 hours ago").unwrap();
        let second = controller.request_next(&answered).await.unwrap();
        assert_eq!(second.turns.len(), 3);
        assert_eq!(second.state, InterviewState::AwaitingAnswer);

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].prompt.contains("name: Ali"));
        assert!(requests[0].prompt.contains("chiefComplaint: chest pain"));
        assert!(requests[0].prompt.contains("(no questions asked yet)"));
        assert!(requests[1]
            .prompt
            .contains("**model**: When did the chest pain start?\n**user**: 2 hours ago"));
    }

    #[tokio::test]
    async fn malformed_response_leaves_session_unchanged() {
        let mock = MockModelClient::new(r#"{"nextQuestion": {"english": "Q", "persian": "س"}}"#);
        let controller = InterviewController::new(&mock);
        let session = started();

        let err = controller.request_next(&session).await.unwrap_err();
        assert!(matches!(err, InterviewError::Model(ModelError::Validation(_))));
        assert_eq!(session.state, InterviewState::AwaitingQuestion);
        assert!(session.turns.is_empty());

        // Retry with identical history succeeds.
        let mock = MockModelClient::new(ONSET_QUESTION);
        let retried = InterviewController::new(&mock)
            .request_next(&session)
            .await
            .unwrap();
        assert_eq!(retried.turns.len(), 1);
    }

    #[tokio::test]
    async fn no_request_after_complete() {
        let mock = MockModelClient::new(COMPLETE);
        let controller = InterviewController::new(&mock);

        let done = controller.begin(sample_details()).await.unwrap();
        assert!(done.is_complete());
        assert_eq!(mock.call_count(), 1);

        let err = controller.request_next(&done).await.unwrap_err();
        assert_eq!(err, InterviewError::AlreadyComplete);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn credential_error_propagates() {
        let mock = MockModelClient::failing(ModelError::InvalidApiKey);
        let err = InterviewController::new(&mock)
            .begin(sample_details())
            .await
            .unwrap_err();
        assert_eq!(err, InterviewError::Model(ModelError::InvalidApiKey));
    }
}
