//! `Frame`: a sequence of batches delimited by a swapchain present (§3).

use std::collections::VecDeque;

use crate::handle::Shared;
use crate::submission::batch::SubmissionBatch;

/// One frame's worth of submitted work: every [`SubmissionBatch`] submitted since the previous
/// `vkQueuePresentKHR` up to and including the batch containing it.
#[derive(Debug, Default)]
pub struct Frame {
    pub batches: Vec<Shared<SubmissionBatch>>,
}

impl Frame {
    pub fn push(&mut self, batch: Shared<SubmissionBatch>) {
        self.batches.push(batch);
    }
}

/// The swapchain's retained frame history, used for matching and navigation (§3: "The swapchain
/// retains the last N frames"). A fixed-capacity ring: pushing past `capacity` drops the oldest
/// frame.
#[derive(Debug)]
pub struct FrameHistory {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl FrameHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push_completed_frame(&mut self, frame: Frame) {
        if self.frames.len() >= self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The most recently completed frame, the one the matcher re-locates a selection against
    /// most often.
    pub fn latest(&self) -> Option<&Frame> {
        self.frames.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Frame> {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_evicts_oldest_frame_past_capacity() {
        let mut history = FrameHistory::new(2);
        history.push_completed_frame(Frame::default());
        history.push_completed_frame(Frame::default());
        history.push_completed_frame(Frame::default());
        assert_eq!(history.len(), 2);
    }
}
