pub mod collections;
pub mod environment;
pub mod profiling;
