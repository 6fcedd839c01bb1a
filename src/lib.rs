//! In-process Vulkan introspection and debugging layer core.
//!
//! Tracks every Vulkan object an application creates, records the commands written into each
//! command buffer into an inspectable tree, tracks queue submissions and their synchronization
//! primitives, matches command hierarchies across frames so a debugging session survives
//! re-recording, and rewrites submitted command buffers on demand to capture GPU-side data for
//! a selected command.
//!
//! This crate is the core: the Vulkan-layer entry points, the `dlsym`-loaded public extension
//! ABI, and the overlay/GUI that consumes [`platform::OverlayDataSource`] all live outside it.
//!
//! - [`handle`] for the tracked object model: [`handle::device::Device`], the per-type handle
//!   registries, and [`handle::HandleMeta`]/[`handle::ObjectType`].
//! - [`resource`] for buffers and images and their memory-binding state.
//! - [`descriptor`] for descriptor set layouts, pools, sets, and the copy-on-write snapshot.
//! - [`command`] for the command tree, the bump-allocated recording arena, and the recording
//!   front-end.
//! - [`submission`] for queue-submit tracking, fences, semaphores, and per-frame history.
//! - [`matcher`] for cross-frame command-hierarchy matching.
//! - [`hook`] for the command hook: re-recording, renderpass splitting, and acceleration
//!   structure build capture.
//! - [`serialization`] for the binary capture format.
//! - [`platform`] for the trait seam an embedding GUI/overlay plugs into.
//! - [`config`] for environment-driven tuning knobs.

#[macro_use]
extern crate derivative;
#[macro_use]
extern crate log;

pub mod command;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod handle;
pub mod hook;
pub mod matcher;
pub mod platform;
pub mod pool;
pub mod resource;
pub mod serialization;
pub mod submission;

pub use config::Config;
pub use error::Error;
pub use handle::device::Device;
