//! `DescriptorSet`: binding data reachable via its layout, plus the copy-on-write hookup.

use std::sync::{Mutex, RwLock};

use ash::vk;
use derivative::Derivative;

use crate::descriptor::cow::DescriptorCow;
use crate::descriptor::layout::DescriptorSetLayout;
use crate::handle::{HandleId, HandleMeta, ObjectType, Shared};
use crate::hook::accel_structure::AccelerationStructure;
use crate::resource::opaque::{BufferView, ImageView, Sampler};
use crate::resource::MemoryResource;

/// Gives [`opt_id_eq`] a uniform way to compare the handles a [`DescriptorContents`] variant may
/// reference, whatever concrete tracked type they resolved against.
trait HasHandleId {
    fn handle_id(&self) -> HandleId;
}

impl HasHandleId for MemoryResource {
    fn handle_id(&self) -> HandleId {
        self.meta().id()
    }
}

impl HasHandleId for AccelerationStructure {
    fn handle_id(&self) -> HandleId {
        self.meta().id()
    }
}

impl<H> HasHandleId for crate::resource::opaque::OpaqueHandle<H> {
    fn handle_id(&self) -> HandleId {
        self.meta().id()
    }
}

/// Compare two optionally-resolved handle references by identity: both absent counts as equal
/// (neither side resolved at write time), one present and one absent never matches.
fn opt_id_eq<T: HasHandleId>(a: &Option<Shared<T>>, b: &Option<Shared<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.handle_id() == b.handle_id(),
        (None, None) => true,
        _ => false,
    }
}

/// One descriptor write's contents, mirroring the three `VkWriteDescriptorSet` payload unions.
/// Each referenced handle is resolved against the live registry at write time and held as a
/// strong reference (§4.8): a descriptor set's own bindings do not need this (the application is
/// responsible for keeping what it binds alive), but a [`DescriptorCow`] snapshot is a plain
/// clone of a set's `SetBindings`, so holding `Shared<T>` here is what makes "referenced handles
/// kept alive until snapshot drop" true without any extra bookkeeping on the snapshot itself. A
/// handle that did not resolve (already destroyed, or an object type this core does not track a
/// registry for) is `None` rather than dropping the binding.
#[derive(Debug, Clone)]
pub enum DescriptorContents {
    Image {
        sampler: Option<Shared<Sampler>>,
        image_view: Option<Shared<ImageView>>,
        layout: vk::ImageLayout,
    },
    Buffer {
        buffer: Option<Shared<MemoryResource>>,
        offset: vk::DeviceSize,
        range: vk::DeviceSize,
    },
    TexelBufferView(Option<Shared<BufferView>>),
    AccelerationStructure(Option<Shared<AccelerationStructure>>),
    /// A binding with no descriptor written yet (undefined contents per the Vulkan spec).
    Empty,
}

impl DescriptorContents {
    /// Type-specific similarity rule used by the matcher (§4.5): samplers and image-view
    /// identity for images, buffer handle + range for buffers, raw equality otherwise.
    pub fn similarity(&self, other: &DescriptorContents) -> f32 {
        match (self, other) {
            (DescriptorContents::Empty, DescriptorContents::Empty) => 1.0,
            (
                DescriptorContents::Image {
                    sampler: sa,
                    image_view: va,
                    layout: la,
                },
                DescriptorContents::Image {
                    sampler: sb,
                    image_view: vb,
                    layout: lb,
                },
            ) => {
                let mut score = 0.0;
                if opt_id_eq(va, vb) {
                    score += 1.0;
                }
                if opt_id_eq(sa, sb) {
                    score += 1.0;
                }
                if la == lb {
                    score += 1.0;
                }
                score / 3.0
            }
            (
                DescriptorContents::Buffer {
                    buffer: ba,
                    offset: oa,
                    range: ra,
                },
                DescriptorContents::Buffer {
                    buffer: bb,
                    offset: ob,
                    range: rb,
                },
            ) => {
                let mut score = 0.0;
                if opt_id_eq(ba, bb) {
                    score += 0.6;
                }
                if oa == ob {
                    score += 0.2;
                }
                if ra == rb {
                    score += 0.2;
                }
                score
            }
            (DescriptorContents::TexelBufferView(a), DescriptorContents::TexelBufferView(b)) if opt_id_eq(a, b) => 1.0,
            (DescriptorContents::AccelerationStructure(a), DescriptorContents::AccelerationStructure(b)) if opt_id_eq(a, b) => 1.0,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BindingData {
    pub binding: u32,
    pub descriptors: Vec<DescriptorContents>,
}

#[derive(Debug, Clone, Default)]
pub struct SetBindings {
    pub bindings: Vec<BindingData>,
}

impl SetBindings {
    pub fn get(&self, binding: u32) -> Option<&BindingData> {
        self.bindings.iter().find(|b| b.binding == binding)
    }

    /// Compare two full binding snapshots binding-by-binding (§4.5). Missing bindings on either
    /// side score zero for that slot; the overall score is the mean over the union of bindings
    /// present in either snapshot.
    pub fn similarity(&self, other: &SetBindings) -> f32 {
        let mut seen = std::collections::BTreeSet::new();
        for b in self.bindings.iter().chain(other.bindings.iter()) {
            seen.insert(b.binding);
        }
        if seen.is_empty() {
            return 1.0;
        }
        let mut total = 0.0;
        for binding in &seen {
            let a = self.get(*binding);
            let b = other.get(*binding);
            total += match (a, b) {
                (Some(a), Some(b)) => {
                    let pairs = a.descriptors.len().max(b.descriptors.len()).max(1);
                    let mut sum = 0.0;
                    for i in 0..pairs {
                        let da = a.descriptors.get(i).unwrap_or(&DescriptorContents::Empty);
                        let db = b.descriptors.get(i).unwrap_or(&DescriptorContents::Empty);
                        sum += da.similarity(db);
                    }
                    sum / pairs as f32
                }
                _ => 0.0,
            };
        }
        total / seen.len() as f32
    }
}

/// A tracked `VkDescriptorSet`. Unwrapped handle type (§4.1).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct DescriptorSet {
    meta: HandleMeta,
    #[derivative(Debug = "ignore")]
    layout: Shared<DescriptorSetLayout>,
    bindings: RwLock<SetBindings>,
    cow: Mutex<Option<Shared<DescriptorCow>>>,
}

impl DescriptorSet {
    pub fn new(id: u64, layout: Shared<DescriptorSetLayout>) -> Self {
        Self {
            meta: HandleMeta::with_id(id, ObjectType::DescriptorSet),
            layout,
            bindings: RwLock::new(SetBindings::default()),
            cow: Mutex::new(None),
        }
    }

    pub fn meta(&self) -> &HandleMeta {
        &self.meta
    }

    pub fn layout(&self) -> &Shared<DescriptorSetLayout> {
        &self.layout
    }

    pub fn bindings(&self) -> SetBindings {
        self.bindings.read().unwrap().clone()
    }

    /// `vkUpdateDescriptorSet`-style write. Detaches any live COW snapshot first (§4.8): the
    /// snapshot materializes its own private copy before this write proceeds, so existing
    /// snapshot holders never observe the new contents.
    pub fn write(&self, binding: u32, descriptors: Vec<DescriptorContents>) {
        self.detach_cow();
        let mut bindings = self.bindings.write().unwrap();
        if let Some(existing) = bindings.bindings.iter_mut().find(|b| b.binding == binding) {
            existing.descriptors = descriptors;
        } else {
            bindings.bindings.push(BindingData { binding, descriptors });
        }
    }

    /// Take (or create) a COW snapshot of this set's current bindings (§4.8). Multiple
    /// snapshots taken while the set is undisturbed share one `DescriptorCow`.
    pub fn snapshot(&self) -> Shared<DescriptorCow> {
        let mut cow = self.cow.lock().unwrap();
        if let Some(existing) = &*cow {
            return existing.clone();
        }
        let fresh = Shared::new(DescriptorCow::new(self.bindings.read().unwrap().clone()));
        *cow = Some(fresh.clone());
        fresh
    }

    fn detach_cow(&self) {
        let mut cow = self.cow.lock().unwrap();
        if let Some(existing) = cow.take() {
            existing.detach();
        }
    }

    /// `vkFreeDescriptorSet`/pool destruction: detach any live snapshot so holders keep a
    /// private, frozen view rather than observing the set disappear out from under them.
    pub fn on_destroy(&self) {
        self.detach_cow();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::DescriptorSetLayoutCreateFlags;

    fn fresh_set() -> DescriptorSet {
        let layout = Shared::new(DescriptorSetLayout::new(1, vec![], DescriptorSetLayoutCreateFlags::empty()));
        DescriptorSet::new(2, layout)
    }

    fn dummy_buffer(id: u64) -> Shared<MemoryResource> {
        Shared::new(MemoryResource::new_buffer(id, vk::Buffer::null(), 16, vk::BufferUsageFlags::UNIFORM_BUFFER, false))
    }

    #[test]
    fn snapshot_is_stable_across_later_writes() {
        let set = fresh_set();
        set.write(
            0,
            vec![DescriptorContents::Buffer {
                buffer: Some(dummy_buffer(5)),
                offset: 0,
                range: 16,
            }],
        );
        let snap = set.snapshot();
        set.write(
            0,
            vec![DescriptorContents::Buffer {
                buffer: Some(dummy_buffer(9)),
                offset: 0,
                range: 16,
            }],
        );
        let snap_bindings = snap.bindings();
        match &snap_bindings.get(0).unwrap().descriptors[0] {
            DescriptorContents::Buffer { buffer: Some(b), .. } => assert_eq!(b.meta().id(), 5),
            other => panic!("expected a resolved buffer reference, got {other:?}"),
        }
    }

    /// The snapshot clone keeps its own `Shared<MemoryResource>` alive independently of the live
    /// set's own binding, even after the registry's entry (not modeled here — this test only
    /// has the `Shared` itself) would otherwise be the buffer's last reference (§4.8).
    #[test]
    fn snapshot_keeps_its_referenced_buffer_alive_after_the_set_stops_pointing_at_it() {
        let set = fresh_set();
        let buf = dummy_buffer(3);
        let weak = Shared::downgrade(&buf);
        set.write(0, vec![DescriptorContents::Buffer { buffer: Some(buf), offset: 0, range: 4 }]);
        let snap = set.snapshot();
        set.write(0, vec![]);
        assert!(weak.upgrade().is_some(), "snapshot should still hold a strong reference");
        drop(snap);
        assert!(weak.upgrade().is_none(), "buffer should be released once the snapshot drops");
    }

    #[test]
    fn multiple_snapshots_share_one_cow_while_undisturbed() {
        let set = fresh_set();
        let a = set.snapshot();
        let b = set.snapshot();
        assert!(Shared::ptr_eq(&a, &b));
    }

    #[test]
    fn write_detaches_existing_cow_so_a_new_snapshot_is_fresh() {
        let set = fresh_set();
        let a = set.snapshot();
        set.write(0, vec![]);
        let b = set.snapshot();
        assert!(!Shared::ptr_eq(&a, &b));
    }
}
