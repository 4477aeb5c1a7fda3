//! `FbClient` implementation over the fbclient library, loaded at runtime

mod entry_points;
mod loader;

use lazy_static::lazy_static;
use std::sync::{Arc, Mutex};

use ibpp_core::{FbClient, FbError};

pub use entry_points::{EntryPoints, FbClientLib};
pub use loader::{ClientLoader, SymbolSource};

lazy_static! {
    /// Library shared by every database of the process
    static ref CLIENT: Mutex<Option<Arc<FbClientLib>>> = Mutex::new(None);
}

/// The process wide client, loaded with the default search on the first call
pub fn client() -> Result<Arc<dyn FbClient>, FbError> {
    resolve_with(&ClientLoader::new())
}

/// The process wide client, loaded by `loader` if not loaded yet.
///
/// A failed load is not remembered, the next call searches again
pub fn resolve_with(loader: &ClientLoader) -> Result<Arc<dyn FbClient>, FbError> {
    let mut slot = CLIENT.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(client) = slot.as_ref() {
        return Ok(client.clone());
    }

    let client = Arc::new(loader.load()?);
    log::debug!(
        "Firebird client {}.{} ready",
        client.client_major_version(),
        client.client_minor_version()
    );
    *slot = Some(client.clone());

    Ok(client)
}

/// True when the client library is already loaded
pub fn is_loaded() -> bool {
    CLIENT
        .lock()
        .map(|slot| slot.is_some())
        .unwrap_or(false)
}
