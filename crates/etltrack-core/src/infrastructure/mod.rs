pub mod registry;

pub use registry::{
    JobEventOutcome,
    RunRegistry,
};
