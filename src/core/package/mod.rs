pub mod index;
pub mod manager;
pub mod overrides;
pub mod state;

pub use index::{EnvSupport, PackageFile, PackageIndex};
pub use manager::{InstallOptions, PackageManager, RemoteIndex, UpdateStatus, INDEX_SNAPSHOT};
pub use state::{InstalledPackage, PackagesState};
