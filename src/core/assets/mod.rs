mod asset_index;

pub use asset_index::{install_assets, AssetIndex};
