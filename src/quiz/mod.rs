// src/quiz/mod.rs

//! Quiz-taking core: question sets, the session state machine, scoring,
//! reporting, and the countdown/registry that drive sessions on the server.

pub mod error;
pub mod question_set;
pub mod registry;
pub mod report;
pub mod scorer;
pub mod session;
pub mod timer;

pub use error::QuizError;
pub use question_set::{QuestionSet, validate_question};
pub use registry::{PersistStatus, RegistryError, SessionRegistry, SessionView};
pub use report::{ReportRow, build_report};
pub use session::{SessionPhase, SessionState};
