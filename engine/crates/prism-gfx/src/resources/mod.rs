pub mod copy_layout;
pub mod resource;
pub mod resource_state;
