//! Static asset loading.

use crate::error::ServerError;
use bytes::Bytes;

/// Index page template asset name.
pub const INDEX_TEMPLATE: &str = "index.html";
/// PIN page template asset name.
pub const PIN_TEMPLATE: &str = "pin.html";
/// Favicon asset name.
pub const FAVICON: &str = "favicon.ico";
/// Logo asset name.
pub const LOGO: &str = "logo.png";

/// Source of raw asset bytes.
///
/// Loading an unknown asset fails with [`ServerError::AssetMissing`]; the
/// server additionally rejects empty bytes at init, so implementations may
/// return whatever their store holds.
pub trait AssetProvider: Send + Sync {
    /// Load the named asset.
    fn load(&self, name: &str) -> Result<Bytes, ServerError>;
}

/// Assets compiled into the binary from the `assets/` directory.
#[derive(Debug, Default)]
pub struct EmbeddedAssets;

impl AssetProvider for EmbeddedAssets {
    fn load(&self, name: &str) -> Result<Bytes, ServerError> {
        match name {
            INDEX_TEMPLATE => Ok(Bytes::from_static(include_bytes!("../../assets/index.html"))),
            PIN_TEMPLATE => Ok(Bytes::from_static(include_bytes!("../../assets/pin.html"))),
            FAVICON => Ok(Bytes::from_static(include_bytes!("../../assets/favicon.ico"))),
            LOGO => Ok(Bytes::from_static(include_bytes!("../../assets/logo.png"))),
            other => Err(ServerError::AssetMissing(other.to_string())),
        }
    }
}
