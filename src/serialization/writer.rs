//! Appends a capture's binary blocks to an in-memory buffer (§6).

use crate::command::CommandCategory;
use crate::handle::ObjectType;
use crate::serialization::{FORMAT_VERSION, MAGIC, MARKER_COMMAND, MARKER_HANDLE_TABLE, MARKER_RECORD, NULL_ID};

fn category_tag(category: CommandCategory) -> u8 {
    match category {
        CommandCategory::Draw => 0,
        CommandCategory::Dispatch => 1,
        CommandCategory::TraceRays => 2,
        CommandCategory::Transfer => 3,
        CommandCategory::Sync => 4,
        CommandCategory::BindOrSetup => 5,
        CommandCategory::Section => 6,
        CommandCategory::Other => 7,
    }
}

fn object_type_tag(ty: ObjectType) -> u8 {
    // Stable wire tags independent of enum declaration order, so a future reordering of
    // `ObjectType`'s variants does not change already-written capture files.
    match ty {
        ObjectType::Instance => 0,
        ObjectType::Device => 1,
        ObjectType::Queue => 2,
        ObjectType::DeviceMemory => 3,
        ObjectType::Buffer => 4,
        ObjectType::BufferView => 5,
        ObjectType::Image => 6,
        ObjectType::ImageView => 7,
        ObjectType::Sampler => 8,
        ObjectType::ShaderModule => 9,
        ObjectType::PipelineLayout => 10,
        ObjectType::Pipeline => 11,
        ObjectType::DescriptorSetLayout => 12,
        ObjectType::DescriptorPool => 13,
        ObjectType::DescriptorSet => 14,
        ObjectType::DescriptorUpdateTemplate => 15,
        ObjectType::RenderPass => 16,
        ObjectType::Framebuffer => 17,
        ObjectType::CommandPool => 18,
        ObjectType::CommandBuffer => 19,
        ObjectType::Fence => 20,
        ObjectType::Semaphore => 21,
        ObjectType::Event => 22,
        ObjectType::QueryPool => 23,
        ObjectType::Swapchain => 24,
        ObjectType::AccelerationStructure => 25,
    }
}

/// Appends capture blocks to an owned byte buffer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn write_header(&mut self) {
        self.buf.extend_from_slice(&MAGIC.to_le_bytes());
        self.buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_id(&mut self, id: Option<u64>) {
        self.write_u64(id.unwrap_or(NULL_ID));
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.write_u32(data.len() as u32);
        self.buf.extend_from_slice(data);
    }

    pub fn write_handle_table(&mut self, entries: &[(u64, ObjectType, Option<String>)]) {
        self.buf.push(MARKER_HANDLE_TABLE);
        self.write_u32(entries.len() as u32);
        for (id, ty, name) in entries {
            self.write_u64(*id);
            self.buf.push(object_type_tag(*ty));
            match name {
                Some(n) => {
                    self.buf.push(1);
                    self.write_string(n);
                }
                None => self.buf.push(0),
            }
        }
    }

    pub fn write_record_header(&mut self, queue_family_index: u32, length_hint: u32) {
        self.buf.push(MARKER_RECORD);
        self.write_u32(queue_family_index);
        self.write_u32(length_hint);
    }

    /// Write one command with no children and a raw payload blob (scalar fields packed by the
    /// caller). Sufficient for the representative command set this core models; a fuller
    /// implementation would add a `write_section_command` pairing this with a recursive
    /// children count, following the same marker + subtree-length shape.
    pub fn write_leaf_command(&mut self, category: CommandCategory, payload: &[u8]) {
        self.buf.push(MARKER_COMMAND);
        self.buf.push(category_tag(category));
        self.write_u32(0); // child count: always a leaf here
        self.write_bytes(payload);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_starts_with_the_magic_and_version() {
        let mut w = Writer::new();
        w.write_header();
        let bytes = w.into_bytes();
        assert_eq!(&bytes[0..4], &MAGIC.to_le_bytes());
        assert_eq!(&bytes[4..8], &FORMAT_VERSION.to_le_bytes());
    }
}
