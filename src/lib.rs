pub mod agent;
pub mod environment;
pub mod error;
pub mod grid;
pub mod learner;
pub mod mailbox;
pub mod paddle;
pub mod params;
pub mod q_learning;
pub mod remote;
pub mod tables;
pub mod training;

mod types;
mod util;
