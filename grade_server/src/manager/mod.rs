pub mod queue;
pub mod supervisor;
pub mod worker;
