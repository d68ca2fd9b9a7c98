pub mod constants;
pub mod filename;
pub mod logging;
pub mod paths;
pub mod progress;
pub mod temporal;

pub use constants::*;
pub use filename::{default_output_dir, street_partition_paths};
pub use logging::init_logging;
pub use paths::{absolute_path, data_dir_in, find_project_root, find_project_root_from};
pub use progress::ProgressReporter;
