//! Infrastructure Layer

pub mod mock;

pub use mock::MockFabricNetwork;
