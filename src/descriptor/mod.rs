//! Descriptor sets, pools, layouts, and the copy-on-write snapshot (§3, §4.8).

pub mod cow;
pub mod layout;
pub mod pool;
pub mod set;

pub use cow::DescriptorCow;
pub use layout::DescriptorSetLayout;
pub use pool::DescriptorPool;
pub use set::DescriptorSet;
