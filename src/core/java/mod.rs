pub mod runtime;

pub use runtime::{java_executable, runtime_dir, RuntimeInstaller};
