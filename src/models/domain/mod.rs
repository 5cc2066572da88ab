pub mod analysis;
pub mod answer;
pub mod chain;
pub mod page;
pub mod question;
pub use analysis::{AnswerFormat, QuestionAnalysis};
pub use answer::Answer;
pub use chain::{ChainResult, ChainState, QuizStepResult, ResolutionStrategy, Transition};
pub use page::{Link, PageContent};
pub use question::QuestionData;
