//! Exposes the crate's error type.

use std::sync::PoisonError;

use gpu_allocator::AllocationError;
use thiserror::Error;

use crate::handle::ObjectType;

/// Error type returned from fallible operations in this crate.
///
/// Per the layer's error-handling design, none of these are ever turned into a panic or
/// process abort in release builds: driver errors are passed through to the caller, and
/// invariant violations detected in the layer itself are logged and the offending operation
/// is skipped rather than propagated as a crash.
#[derive(Error, Debug)]
pub enum Error {
    /// A Vulkan call forwarded to the driver returned a non-success code.
    #[error("Vulkan error: `{0}`")]
    VkError(ash::vk::Result),
    /// The driver reported `VK_ERROR_DEVICE_LOST`. The device is flagged and no further hooks
    /// are activated on it.
    #[error("Device lost")]
    DeviceLost,
    /// Vulkan memory allocation error.
    #[error("Vulkan allocation error: `{0}`")]
    AllocationError(AllocationError),
    /// A handle id was looked up in the registry but no entry exists for it. This is an
    /// invariant violation: the application is not supposed to use a handle after destroying
    /// it. Usages recorded before destruction remain valid through `destroyed` lists, so this
    /// should only occur for a genuinely unknown id.
    #[error("Handle {0:?} of type {1:?} not found in the registry")]
    UnknownHandle(u64, ObjectType),
    /// A command record's arena-allocated tree does not contain a command at the requested
    /// path. Surfaced by the command hook as a graceful fallback to the unhooked command
    /// buffer rather than a hard failure.
    #[error("Command path does not resolve to a command in this record")]
    CommandNotFound,
    /// The frame matcher could not locate a sufficiently similar command in the candidate
    /// hierarchy (match score below the configured threshold).
    #[error("No sufficiently similar command found (best score {0})")]
    NoMatch(f32),
    /// A renderpass could not be split at the requested subpass: a resolve attachment of an
    /// earlier subpass is read as an input attachment by a later one, which has no
    /// semantics-preserving three-way split.
    #[error("Renderpass is not splittable at subpass {0}")]
    NotSplittable(u32),
    /// Exhaustion of a pooled resource (fences, semaphores, query pools, hook command
    /// buffers) that the hook needs to proceed. The hook falls back to the unhooked command
    /// buffer for this submission.
    #[error("Resource pool for {0} exhausted")]
    PoolExhausted(&'static str),
    /// A serialized capture's binary layout did not match the expected marker sequence, or a
    /// read ran out of bounds. No partial state is exposed for a stream that fails this way.
    #[error("Malformed capture stream: {0}")]
    MalformedStream(&'static str),
    /// A poisoned mutex or rwlock was observed. Treated as a recoverable invariant violation:
    /// the layer must not panic just because an earlier call panicked while holding the lock.
    #[error("Poisoned lock")]
    PoisonError,
    /// Catch-all for invariant violations the layer detects about its own bookkeeping (e.g. a
    /// destroyed-but-still-pending submission, a used-handle entry with no owning record).
    #[error("Internal invariant violated: {0}")]
    Invariant(&'static str),
}

impl From<ash::vk::Result> for Error {
    fn from(value: ash::vk::Result) -> Self {
        if value == ash::vk::Result::ERROR_DEVICE_LOST {
            Error::DeviceLost
        } else {
            Error::VkError(value)
        }
    }
}

impl From<AllocationError> for Error {
    fn from(value: AllocationError) -> Self {
        Error::AllocationError(value)
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::PoisonError
    }
}
