mod registry;
mod selectors;

pub use registry::{ModelRegistry, ModelSpec, DRYRUN_PROVIDER};
pub use selectors::{ModelSelection, ModelSelector};
