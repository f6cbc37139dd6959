pub mod chunking;
pub mod coordinator;
pub mod extraction;
