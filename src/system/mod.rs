pub mod battery;
pub mod collector;
pub mod delta;
pub mod filter;
pub mod history;
pub mod procfs;
pub mod sampler;
pub mod snapshot;
pub mod top;
