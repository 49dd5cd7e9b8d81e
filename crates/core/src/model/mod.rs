mod actor;
mod draft;
mod ids;
pub mod ingest;
mod quiz;
mod result;

pub use ids::{ActorId, ParseIdError, QuestionId, QuizId, ResultId};

pub use actor::{Actor, Author};
pub use draft::{DraftError, QuestionDraft, QuizDraft, ValidatedQuiz};
pub use ingest::{IngestError, QuestionRecord, QuizRecord};
pub use quiz::{Question, Quiz, QuizError, QuizOption, option_label};
pub use result::{Completion, QuizResult, ResultDraft, Score};
