pub mod pipeline;
pub mod root_signature;
pub mod shader;
