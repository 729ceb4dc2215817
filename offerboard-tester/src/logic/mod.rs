pub mod backend;
pub mod policy;
pub mod reports;
pub mod simulation;
pub mod tester;

pub use policy::AnswerStrategy;
pub use simulation::{GameRunner, PlayPlan, PlaySummary};
pub use tester::*;
