//! Dynamic module loading
//!
//! The binding layer only ever sees a [`CoreModule`]: something that can turn
//! a symbol name into an address. [`DynamicModule`] backs it with the OS
//! loader through `libloading`.

use libloading::{Library, Symbol};
use oxr_core::{HostError, Result};
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A loaded plugin module that exposes symbols by name
pub trait CoreModule: Send {
    /// Resolve `name` to an address, or `None` when the module does not export it
    fn symbol(&self, name: &str) -> Option<*const c_void>;

    /// Path the module was loaded from
    fn path(&self) -> &Path;
}

/// Shared library opened through the OS dynamic loader
///
/// Dropping the value unloads the library. Any function pointer resolved from
/// it must be discarded first.
pub struct DynamicModule {
    library: Library,
    path: PathBuf,
}

impl DynamicModule {
    /// Open a shared library
    ///
    /// # Safety
    /// Opening a library runs its initialisers. The caller must trust the
    /// module at `path`.
    pub unsafe fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        info!("Opening core module: {}", path.display());

        let library = Library::new(&path).map_err(|e| HostError::ModuleLoad {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self { library, path })
    }
}

impl Drop for DynamicModule {
    fn drop(&mut self) {
        debug!("Unloading core module: {}", self.path.display());
    }
}

impl CoreModule for DynamicModule {
    fn symbol(&self, name: &str) -> Option<*const c_void> {
        // SAFETY: the symbol is read as an opaque address, never dereferenced here.
        let symbol: Symbol<*const c_void> = unsafe { self.library.get(name.as_bytes()) }.ok()?;
        let address = *symbol;
        (!address.is_null()).then_some(address)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for DynamicModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicModule")
            .field("path", &self.path)
            .finish()
    }
}
