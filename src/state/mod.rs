//! State module for tracking crawl task lifecycle
//!
//! - `TaskStatus`: status of a crawl task as stored in the database

mod task_state;

pub use task_state::TaskStatus;
