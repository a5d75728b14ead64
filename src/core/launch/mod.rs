pub mod classpath;
pub mod command;
pub mod options;
pub mod placeholders;
pub mod task;

pub use classpath::{build_classpath, classpath_separator, safe_path_str};
pub use command::{build_command, command_for_installed, select_java};
pub use options::{LaunchOptions, QuickPlay};
pub use placeholders::Placeholders;
pub use task::{format_command_for_logs, spawn_game};
