//! `QueueSubmitter`: the `vkQueueSubmit` wrapping flow (§4.4).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use ash::vk;

use crate::command::CommandRecord;
use crate::handle::device::Device;
use crate::handle::queue::Queue;
use crate::handle::Shared;
use crate::hook::record::CommandHookRecord;
use crate::hook::submission::CommandHookSubmission;
use crate::hook::target::CommandPath;
use crate::hook::HookTarget;
use crate::submission::batch::{BatchFence, Submission, SubmissionBatch};
use crate::submission::semaphore::Semaphore;

static NEXT_SUBMISSION_ID: AtomicU64 = AtomicU64::new(1);

/// One submit-info's worth of description fed to [`QueueSubmitter::submit`], before the
/// semaphore pool and bookkeeping turn it into a real [`Submission`].
pub struct SubmitDesc {
    pub command_buffers: Vec<u64>,
    pub waits: Vec<(Shared<Semaphore>, Option<u64>, vk::PipelineStageFlags2)>,
    pub signals: Vec<(Shared<Semaphore>, Option<u64>, vk::PipelineStageFlags2)>,
}

/// Wraps `vkQueueSubmit`/`vkQueueSubmit2` for a single device, implementing the four-step flow
/// of §4.4.
pub struct QueueSubmitter<'d> {
    device: &'d Device,
}

impl<'d> QueueSubmitter<'d> {
    pub fn new(device: &'d Device) -> Self {
        Self { device }
    }

    /// Step 1: under the state mutex, assign a monotonic id and reap any pending batches that
    /// have already completed, releasing their pooled resources.
    fn assign_id_and_reap(&self) -> u64 {
        self.reap_completed();
        NEXT_SUBMISSION_ID.fetch_add(1, Ordering::SeqCst)
    }

    /// Step 2: build the batch outside the state mutex — copying wait/signal spans and minting
    /// an `ourSemaphore` per submission is pure CPU work that does not need exclusivity against
    /// other object-registry traffic.
    fn build_batch(&self, id: u64, queue_family_index: u32, submits: Vec<SubmitDesc>, timeline_supported: bool) -> Result<SubmissionBatch> {
        let mut submissions = Vec::with_capacity(submits.len());
        for desc in submits {
            let our_semaphore = self.device.semaphore_pool().acquire(timeline_supported)?;
            let hook_submission = self.maybe_hook(&desc.command_buffers);
            let waits = desc
                .waits
                .into_iter()
                .map(|(semaphore, value, stage)| crate::submission::batch::SemaphoreRef { semaphore, value, stage })
                .collect();
            let signals = desc
                .signals
                .into_iter()
                .map(|(semaphore, value, stage)| crate::submission::batch::SemaphoreRef { semaphore, value, stage })
                .collect();
            let submission = Submission::new(waits, signals, desc.command_buffers, our_semaphore);
            if let Some(hook_submission) = hook_submission {
                submission.attach_hook(hook_submission);
            }
            submissions.push(submission);
        }
        let fence = BatchFence::Pooled(self.device.fence_pool().acquire()?);
        Ok(SubmissionBatch::new(id, queue_family_index, submissions, fence))
    }

    /// Resolve the installed hook's target against this submission's command buffers (§4.6 step
    /// 1), re-record a hooked copy of the matching record, and package it for [`Submission::attach_hook`].
    /// Returns `None` whenever no hook is installed, the target doesn't reference this submission,
    /// or the target record can no longer be resolved.
    fn maybe_hook(&self, command_buffers: &[u64]) -> Option<Arc<CommandHookSubmission>> {
        let (record, _target_id) = self.resolve_hook_target(command_buffers)?;
        let operations = self.device.with_hook(|h| h.operations())?;
        let path = self
            .device
            .with_hook(|h| h.latest().map(|completed| completed.path))
            .flatten()
            .unwrap_or_else(|| CommandPath::root(0));
        let query_pool = self.device.internal_query_pool().ok()?;
        let hook_record = CommandHookRecord::capture(self.device, &record, path.clone(), operations, None, query_pool, None).ok()?;
        let hook_record = Arc::new(hook_record);
        record.push_hook_record(hook_record.clone());
        Some(Arc::new(CommandHookSubmission::for_selected_command(
            query_pool,
            hook_record,
            None,
            path,
            1.0,
        )))
    }

    /// `HookTarget::CommandBuffer`/`Record` resolve directly against this submission's ids.
    /// `AnyMatchingInActiveFrame` approximates full frame-wide re-location by re-using the path
    /// from the hook's most recent capture against the first resolvable record in this
    /// submission — finding the single best match across work still in flight would need
    /// running the matcher against a frame that has not completed yet, which only
    /// [`Device::end_frame`](crate::handle::device::Device::end_frame)'s retained history
    /// supports.
    fn resolve_hook_target(&self, command_buffers: &[u64]) -> Option<(Shared<CommandRecord>, u64)> {
        let target = self.device.with_hook(|h| h.target())?;
        let state = self.device.state();
        match target {
            HookTarget::CommandBuffer(id) | HookTarget::Record(id) => {
                if !command_buffers.contains(&id) {
                    return None;
                }
                state.command_records.get(id).ok().map(|record| (record, id))
            }
            HookTarget::AnyMatchingInActiveFrame => {
                let &id = command_buffers.first()?;
                state.command_records.get(id).ok().map(|record| (record, id))
            }
        }
    }

    /// Splice additional waits/signals so application work orders correctly around any active
    /// GUI reads or a full-sync debugging mode. Out of scope for this core (no GUI/overlay
    /// component lives here, per §2); a richer embedding would extend `build_batch` to consult
    /// such readers before this step.
    fn splice_serialization(&self, _batch: &mut SubmissionBatch) {}

    /// Steps 3–4: submit to the driver under both the queue mutex and (implicitly, by virtue of
    /// holding `&Device`) the wrapper's own synchronization, pushing the batch into the pending
    /// list on success.
    pub fn submit(&self, queue: &Queue, submits: Vec<SubmitDesc>, application_fence: Option<vk::Fence>) -> Result<u64> {
        let id = self.assign_id_and_reap();
        let mut batch = self.build_batch(id, queue.family_index(), submits, self.device.supports_timeline_semaphores())?;
        self.splice_serialization(&mut batch);
        if let Some(fence) = application_fence {
            batch.fence = BatchFence::Application(fence);
        }

        // Per-submission command-buffer/wait/signal info arrays must outlive the
        // `vkQueueSubmit2` call since ash's builders only store pointers into them; keeping
        // them as locals here (rather than returning owned `SubmitInfo2`s from a helper) avoids
        // needing to leak or heap-pin them.
        let cb_infos: Vec<Vec<vk::CommandBufferSubmitInfo>> = batch
            .submissions
            .iter()
            .map(|s| {
                // A hooked submission re-records the whole source record from its root (§4.6
                // step 2), so the hooked command buffer stands in for this submission's first
                // (and, in the common single-buffer case, only) command buffer rather than
                // being spliced in per id.
                let hooked_cb = s
                    .hook_data
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .as_ref()
                    .and_then(|h| h.record.as_ref())
                    .map(|r| r.command_buffer());
                s.command_buffers
                    .iter()
                    .enumerate()
                    .map(|(i, &cb)| {
                        let buffer = if i == 0 {
                            hooked_cb.unwrap_or_else(|| vk::CommandBuffer::from_raw(cb))
                        } else {
                            vk::CommandBuffer::from_raw(cb)
                        };
                        vk::CommandBufferSubmitInfo::builder().command_buffer(buffer).build()
                    })
                    .collect()
            })
            .collect();
        let wait_infos: Vec<Vec<vk::SemaphoreSubmitInfo>> = batch
            .submissions
            .iter()
            .map(|s| {
                s.waits
                    .iter()
                    .map(|w| {
                        vk::SemaphoreSubmitInfo::builder()
                            .semaphore(w.semaphore.handle())
                            .value(w.value.unwrap_or(0))
                            .stage_mask(w.stage)
                            .build()
                    })
                    .collect()
            })
            .collect();
        let signal_infos: Vec<Vec<vk::SemaphoreSubmitInfo>> = batch
            .submissions
            .iter()
            .map(|s| {
                s.signals
                    .iter()
                    .map(|sig| {
                        vk::SemaphoreSubmitInfo::builder()
                            .semaphore(sig.semaphore.handle())
                            .value(sig.value.unwrap_or(0))
                            .stage_mask(sig.stage)
                            .build()
                    })
                    .collect()
            })
            .collect();
        let submit_infos: Vec<vk::SubmitInfo2> = (0..batch.submissions.len())
            .map(|i| {
                vk::SubmitInfo2::builder()
                    .command_buffer_infos(&cb_infos[i])
                    .wait_semaphore_infos(&wait_infos[i])
                    .signal_semaphore_infos(&signal_infos[i])
                    .build()
            })
            .collect();

        {
            let _queue_guard = self.device.lock_queue();
            // SAFETY: `queue.handle()` and `batch.fence.handle()` are valid for this device;
            // every backing array `submit_infos` points into outlives this call.
            let result = unsafe {
                self.device
                    .handle()
                    .queue_submit2(queue.handle(), &submit_infos, batch.fence.handle())
            };
            if let Err(e) = result {
                return Err(crate::error::Error::from(e).into());
            }
        }

        let batch = Shared::new(batch);
        {
            let mut state = self.device.state_mut();
            state.pending_submissions.push(batch.clone());
            state.current_frame_batches.push(batch);
        }
        Ok(id)
    }

    /// `vkQueueWaitIdle`: call the driver under the queue mutex, then finalize any batches that
    /// completed as a result (§4.4).
    pub fn queue_wait_idle(&self, queue: &Queue) -> Result<()> {
        {
            let _guard = self.device.lock_queue();
            // SAFETY: `queue.handle()` is valid for this device.
            unsafe { self.device.handle().queue_wait_idle(queue.handle())? };
        }
        self.reap_completed();
        Ok(())
    }

    /// `vkDeviceWaitIdle`: same as above but for every queue at once.
    pub fn device_wait_idle(&self) -> Result<()> {
        {
            let _guard = self.device.lock_queue();
            // SAFETY: `self.device.handle()` is a valid, live device.
            unsafe { self.device.handle().device_wait_idle()? };
        }
        self.reap_completed();
        Ok(())
    }

    /// Walk pending batches, detecting completion via `vkGetFenceStatus` and finalizing any
    /// that are done: releasing fences/semaphores back to their pools and deactivating their
    /// submissions (§4.4). Also sweeps the command allocator's expired free-list blocks, since
    /// batch completion is the natural opportunistic point for that given this core owns no
    /// background threads (§5).
    pub fn reap_completed(&self) {
        let completed: Vec<Arc<SubmissionBatch>> = {
            let mut state = self.device.state_mut();
            let handle = self.device.handle();
            let (done, pending): (Vec<_>, Vec<_>) = state
                .pending_submissions
                .drain(..)
                .partition(|batch| batch.is_complete(handle));
            state.pending_submissions = pending;
            done
        };
        for batch in completed {
            batch.deactivate_all();
            for submission in &batch.submissions {
                for signal in &submission.signals {
                    if let Some(value) = signal.value {
                        signal.semaphore.observe_signal(value);
                    }
                }
            }
        }
        self.device.command_allocator().release_expired();
    }
}
