pub mod agent;
pub mod client;
pub mod config;
pub mod detector;
pub mod page;
pub mod store;

pub use vetta_common::protocol;
pub use vetta_common::state;
