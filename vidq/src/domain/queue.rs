//! FIFO backlog of pending jobs.

use std::collections::VecDeque;

use super::VideoJob;

/// Unbounded FIFO queue. No priorities, no deduplication.
#[derive(Debug, Default)]
pub struct VideoQueue {
    jobs: VecDeque<VideoJob>,
}

impl VideoQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail.
    pub fn enqueue(&mut self, job: VideoJob) {
        self.jobs.push_back(job);
    }

    /// Remove and return the head.
    pub fn dequeue(&mut self) -> Option<VideoJob> {
        self.jobs.pop_front()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &VideoJob> {
        self.jobs.iter()
    }
}
