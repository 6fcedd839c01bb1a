use anyhow::Result;

use vil_core::handle::registry::HandleMap;
use vil_core::handle::ObjectType;
use vil_core::resource::MemoryResource;

use ash::vk;

#[test]
fn inserted_handle_resolves_until_removed() -> Result<()> {
    let map: HandleMap<MemoryResource> = HandleMap::new(ObjectType::Buffer);
    let buffer = MemoryResource::new_buffer(1, vk::Buffer::null(), 1024, vk::BufferUsageFlags::TRANSFER_DST, false);

    map.insert(1, buffer);
    let resolved = map.get(1)?;
    assert_eq!(resolved.meta().id(), 1);

    map.remove(1)?;
    assert!(map.get(1).is_err(), "removed handle should no longer resolve");
    Ok(())
}

#[test]
fn snapshot_reflects_current_contents_without_locking_out_further_inserts() -> Result<()> {
    let map: HandleMap<MemoryResource> = HandleMap::new(ObjectType::Buffer);
    map.insert(1, MemoryResource::new_buffer(1, vk::Buffer::null(), 16, vk::BufferUsageFlags::UNIFORM_BUFFER, false));
    map.insert(2, MemoryResource::new_buffer(2, vk::Buffer::null(), 32, vk::BufferUsageFlags::UNIFORM_BUFFER, false));

    let snapshot = map.snapshot();
    assert_eq!(snapshot.len(), 2);

    map.insert(3, MemoryResource::new_buffer(3, vk::Buffer::null(), 64, vk::BufferUsageFlags::UNIFORM_BUFFER, false));
    assert_eq!(map.len(), 3);
    Ok(())
}
