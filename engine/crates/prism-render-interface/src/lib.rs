pub mod deferred_release;
pub mod descriptor_manager;
pub mod frame_counter;
pub mod handles;
pub mod memory_manager;
pub mod resource_manager;
pub mod resources;
pub mod root_binding;
pub mod root_signature;
