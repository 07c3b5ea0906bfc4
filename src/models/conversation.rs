use serde::{Deserialize, Serialize};

use super::enums::TurnRole;

/// A text carried in both English and Persian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilingualText {
    pub english: String,
    pub persian: String,
}

impl BilingualText {
    pub fn new(english: impl Into<String>, persian: impl Into<String>) -> Self {
        Self {
            english: english.into(),
            persian: persian.into(),
        }
    }

    /// Both language variants carry non-blank text.
    pub fn is_complete(&self) -> bool {
        !self.english.trim().is_empty() && !self.persian.trim().is_empty()
    }
}

/// One unit of the interview history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationTurn {
    Question {
        english: String,
        persian: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<Vec<BilingualText>>,
    },
    Answer {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        translation: Option<String>,
    },
}

impl ConversationTurn {
    pub fn question(text: BilingualText, options: Option<Vec<BilingualText>>) -> Self {
        Self::Question {
            english: text.english,
            persian: text.persian,
            options,
        }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Self::Answer {
            text: text.into(),
            translation: None,
        }
    }

    /// Speaker as presented to the model: questions come from the model,
    /// answers from the user.
    pub fn role(&self) -> TurnRole {
        match self {
            Self::Question { .. } => TurnRole::Model,
            Self::Answer { .. } => TurnRole::User,
        }
    }

    /// The text sent to the model for this turn.
    pub fn english_text(&self) -> &str {
        match self {
            Self::Question { english, .. } => english,
            Self::Answer { text, .. } => text,
        }
    }

    pub fn is_question(&self) -> bool {
        matches!(self, Self::Question { .. })
    }

    pub fn is_answer(&self) -> bool {
        matches!(self, Self::Answer { .. })
    }
}
