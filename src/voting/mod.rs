pub mod ballot;
pub mod flow;
pub mod results;

pub use flow::{Step, VoteFlow};
pub use results::{Outcome, PositionTally, ResultsView, Viewer};
