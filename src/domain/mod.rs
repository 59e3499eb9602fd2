pub mod delivery;
pub mod submission;
