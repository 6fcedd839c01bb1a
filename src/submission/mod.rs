//! Submission tracking: batches, timeline-semaphore bookkeeping, and the queue-submit flow
//! (§3, §4.4).

pub mod batch;
pub mod fence;
pub mod frame;
pub mod semaphore;
pub mod tracker;

pub use batch::{Submission, SubmissionBatch};
pub use tracker::QueueSubmitter;
