mod agent;
mod belief;
mod submission;

pub use agent::Agent;
pub use belief::{Belief, BeliefStatus};
pub use submission::{BeliefSubmission, SubmissionError};
