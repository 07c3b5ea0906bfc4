pub mod model;
pub mod prompt;
pub mod parser;
pub mod validation;
pub mod interview; // Interview loop state machine + controller
pub mod report; // Concurrent SOAP / DDx / treatment plan
pub mod intake; // Document image → patient details patch
pub mod translation;

pub use interview::{InterviewController, InterviewError, InterviewSession, InterviewState};
pub use intake::{DocumentImage, DocumentIntakeExtractor, IntakeError};
pub use parser::NextAction;
pub use report::{ReportError, ReportOrchestrator, Transcript};
pub use translation::{TranslationError, Translator};
