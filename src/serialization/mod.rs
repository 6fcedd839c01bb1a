//! Binary capture format (§6 "Serialization format"): a self-describing, marker-delimited
//! layout a completed hook state (or a whole record) can be written to and read back from
//! without a live `VkDevice`.
//!
//! Layout: `header { magic, version }`, a handle table (`count` then per-entry `{object_type,
//! name}`), then records (`count` then per-record `{marker, queue_family_index, command
//! stream}`). Every command stream entry is `{marker, tag, subtree_len, payload, children...}`;
//! `subtree_len` is the byte length of everything after it up to and including this command's
//! last descendant, so a reader not interested in one record's contents can skip it without
//! parsing every command. Pointers into the handle table are encoded as `u64` ids; `u64::MAX`
//! denotes null, matching the spec's "position = id" convention.

pub mod reader;
pub mod writer;

pub use reader::Reader;
pub use writer::Writer;

/// Four-byte file magic identifying this format.
pub const MAGIC: u32 = 0x5649_4C31; // "VIL1"
pub const FORMAT_VERSION: u32 = 1;

/// Marks the start of the handle table.
pub const MARKER_HANDLE_TABLE: u8 = 0xA1;
/// Marks the start of a single record block.
pub const MARKER_RECORD: u8 = 0xA2;
/// Marks a single command within a record's stream.
pub const MARKER_COMMAND: u8 = 0xA3;

/// `u64` id value denoting a null pointer into the handle table.
pub const NULL_ID: u64 = u64::MAX;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::ObjectType;

    #[test]
    fn round_trips_a_minimal_capture() {
        let mut writer = Writer::new();
        writer.write_header();
        writer.write_handle_table(&[(1, ObjectType::Buffer, Some("vertex buffer".to_string())), (2, ObjectType::Image, None)]);
        writer.write_record_header(0, 3);
        writer.write_leaf_command(crate::command::CommandCategory::Draw, &[3, 1, 0, 0]);
        let bytes = writer.into_bytes();

        let mut reader = Reader::new(&bytes).unwrap();
        let handles = reader.read_handle_table().unwrap();
        assert_eq!(handles.len(), 2);
        assert_eq!(handles[0].1, ObjectType::Buffer);
        assert_eq!(handles[0].2.as_deref(), Some("vertex buffer"));
        assert_eq!(handles[1].1, ObjectType::Image);

        let (queue_family_index, _len) = reader.read_record_header().unwrap();
        assert_eq!(queue_family_index, 3);
        let (category, payload) = reader.read_leaf_command().unwrap();
        assert_eq!(category, crate::command::CommandCategory::Draw);
        assert_eq!(payload, vec![3, 1, 0, 0]);
    }
}
