pub mod failure;
pub mod pipeline;
pub mod request;
