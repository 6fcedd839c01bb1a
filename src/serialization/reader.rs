//! Reads back the blocks a [`Writer`](crate::serialization::Writer) produced (§6, §7
//! "serialization input errors").

use crate::command::CommandCategory;
use crate::error::Error;
use crate::handle::ObjectType;
use crate::serialization::{FORMAT_VERSION, MAGIC, MARKER_COMMAND, MARKER_HANDLE_TABLE, MARKER_RECORD};

fn category_from_tag(tag: u8) -> Result<CommandCategory, Error> {
    Ok(match tag {
        0 => CommandCategory::Draw,
        1 => CommandCategory::Dispatch,
        2 => CommandCategory::TraceRays,
        3 => CommandCategory::Transfer,
        4 => CommandCategory::Sync,
        5 => CommandCategory::BindOrSetup,
        6 => CommandCategory::Section,
        7 => CommandCategory::Other,
        _ => return Err(Error::MalformedStream("unknown command category tag")),
    })
}

fn object_type_from_tag(tag: u8) -> Result<ObjectType, Error> {
    Ok(match tag {
        0 => ObjectType::Instance,
        1 => ObjectType::Device,
        2 => ObjectType::Queue,
        3 => ObjectType::DeviceMemory,
        4 => ObjectType::Buffer,
        5 => ObjectType::BufferView,
        6 => ObjectType::Image,
        7 => ObjectType::ImageView,
        8 => ObjectType::Sampler,
        9 => ObjectType::ShaderModule,
        10 => ObjectType::PipelineLayout,
        11 => ObjectType::Pipeline,
        12 => ObjectType::DescriptorSetLayout,
        13 => ObjectType::DescriptorPool,
        14 => ObjectType::DescriptorSet,
        15 => ObjectType::DescriptorUpdateTemplate,
        16 => ObjectType::RenderPass,
        17 => ObjectType::Framebuffer,
        18 => ObjectType::CommandPool,
        19 => ObjectType::CommandBuffer,
        20 => ObjectType::Fence,
        21 => ObjectType::Semaphore,
        22 => ObjectType::Event,
        23 => ObjectType::QueryPool,
        24 => ObjectType::Swapchain,
        25 => ObjectType::AccelerationStructure,
        _ => return Err(Error::MalformedStream("unknown object type tag")),
    })
}

/// A forward-only cursor over a capture's bytes, failing with
/// [`Error::MalformedStream`] on any marker mismatch or out-of-bounds read rather than exposing
/// partial state (§7).
pub struct Reader<'d> {
    data: &'d [u8],
    pos: usize,
}

impl<'d> Reader<'d> {
    pub fn new(data: &'d [u8]) -> Result<Self, Error> {
        let mut reader = Self { data, pos: 0 };
        let magic = reader.read_u32()?;
        if magic != MAGIC {
            return Err(Error::MalformedStream("bad magic"));
        }
        let version = reader.read_u32()?;
        if version != FORMAT_VERSION {
            return Err(Error::MalformedStream("unsupported format version"));
        }
        Ok(reader)
    }

    fn take(&mut self, len: usize) -> Result<&'d [u8], Error> {
        let end = self.pos.checked_add(len).ok_or(Error::MalformedStream("length overflow"))?;
        let slice = self.data.get(self.pos..end).ok_or(Error::MalformedStream("read past end of stream"))?;
        self.pos = end;
        Ok(slice)
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_u64(&mut self) -> Result<u64, Error> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_id(&mut self) -> Result<Option<u64>, Error> {
        let raw = self.read_u64()?;
        Ok(if raw == crate::serialization::NULL_ID { None } else { Some(raw) })
    }

    fn read_marker(&mut self, expected: u8) -> Result<(), Error> {
        let byte = *self.take(1)?.first().unwrap();
        if byte != expected {
            return Err(Error::MalformedStream("unexpected marker"));
        }
        Ok(())
    }

    pub fn read_string(&mut self) -> Result<String, Error> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::MalformedStream("invalid utf8"))
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>, Error> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_handle_table(&mut self) -> Result<Vec<(u64, ObjectType, Option<String>)>, Error> {
        self.read_marker(MARKER_HANDLE_TABLE)?;
        let count = self.read_u32()?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let id = self.read_u64()?;
            let ty = object_type_from_tag(*self.take(1)?.first().unwrap())?;
            let has_name = *self.take(1)?.first().unwrap();
            let name = if has_name == 1 { Some(self.read_string()?) } else { None };
            entries.push((id, ty, name));
        }
        Ok(entries)
    }

    /// Returns `(queue_family_index, length_hint)`; `length_hint` is the byte count the writer
    /// expected the record's command stream to occupy, usable to skip ahead without parsing.
    pub fn read_record_header(&mut self) -> Result<(u32, u32), Error> {
        self.read_marker(MARKER_RECORD)?;
        let queue_family_index = self.read_u32()?;
        let length_hint = self.read_u32()?;
        Ok((queue_family_index, length_hint))
    }

    pub fn read_leaf_command(&mut self) -> Result<(CommandCategory, Vec<u8>), Error> {
        self.read_marker(MARKER_COMMAND)?;
        let category = category_from_tag(*self.take(1)?.first().unwrap())?;
        let child_count = self.read_u32()?;
        if child_count != 0 {
            return Err(Error::MalformedStream("expected a leaf command"));
        }
        let payload = self.read_bytes()?;
        Ok((category, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_magic() {
        let bytes = [0u8; 8];
        assert!(Reader::new(&bytes).is_err());
    }

    #[test]
    fn rejects_truncated_input() {
        let bytes = MAGIC.to_le_bytes();
        assert!(Reader::new(&bytes).is_err());
    }
}
