pub mod bus;
pub mod circuit_builder;
pub mod circuit_sim;
pub mod components;
pub mod description;
pub mod error;
pub mod pin;
pub mod project;

mod circuit;
pub use circuit::Circuit;
pub use circuit_builder::{ComponentType, Library};
pub use circuit_sim::{RunResult, SimConfig};
pub use error::{BuildError, LoadError, SimError};
pub use pin::{ComponentId, InputRef, OutputRef, Signal};
pub use project::Project;
