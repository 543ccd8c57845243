pub mod barrier;
pub mod command_list;
pub mod state_tracker;
