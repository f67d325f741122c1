//! Host library loading
//!
//! Inside the engine, the interface functions arrive through the
//! `get_proc_address` passed to the extension's entry point, and
//! [`PtrCall::from_proc_address`] is all that is needed. Outside it, a host
//! library (an embedding of the engine, or a stand-in interface for tests)
//! exports its own get-proc-address function. This module finds and opens
//! that library with `libloading` and resolves the export. Opened libraries
//! stay mapped until the loader drops.

use super::caller::{CallError, GetProcAddressFn, MethodBindCall, PtrCall};
use libloading::Library;
use ptrcall_config::Config;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[cfg(target_os = "windows")]
const FILE_PATTERNS: &[(&str, &str)] = &[("", ".dll"), ("lib", ".dll")];
#[cfg(target_os = "macos")]
const FILE_PATTERNS: &[(&str, &str)] = &[("lib", ".dylib"), ("", ".dylib"), ("lib", ".so")];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const FILE_PATTERNS: &[(&str, &str)] = &[("lib", ".so"), ("", ".so")];

#[cfg(target_os = "linux")]
const SYSTEM_DIRS: &[&str] = &["/usr/local/lib", "/usr/lib", "/usr/lib64", "/lib", "/lib64"];
#[cfg(target_os = "macos")]
const SYSTEM_DIRS: &[&str] = &["/usr/local/lib", "/opt/homebrew/lib", "/usr/lib"];
#[cfg(target_os = "windows")]
const SYSTEM_DIRS: &[&str] = &["C:\\Windows\\System32"];
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const SYSTEM_DIRS: &[&str] = &["/usr/local/lib", "/usr/lib"];

/// Export looked up when the configuration names none
pub const DEFAULT_PROC_ADDRESS_SYMBOL: &str = "get_proc_address";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("host library '{name}' not found ({searched} directories searched)")]
    LibraryNotFound { name: String, searched: usize },

    #[error("{path} does not export '{symbol}'")]
    SymbolNotFound { path: PathBuf, symbol: String },

    #[error("could not open {path}: {reason}")]
    LoadFailed { path: PathBuf, reason: String },

    #[error("no host library configured (set [library] name in ptrcall.toml)")]
    NotConfigured,

    #[error(transparent)]
    Interface(#[from] CallError),
}

/// Opens host libraries and resolves their get-proc-address exports
pub struct LibraryLoader {
    search_paths: Vec<PathBuf>,
    libraries: HashMap<PathBuf, Library>,
}

impl LibraryLoader {
    /// Loader over the default directories only
    pub fn new() -> Self {
        Self::with_search_paths(Vec::new())
    }

    /// Loader that tries the configured search paths before the defaults
    pub fn from_config(config: &Config) -> Self {
        Self::with_search_paths(config.search_paths.clone())
    }

    /// Loader that tries `paths`, in order, before the defaults
    pub fn with_search_paths(mut paths: Vec<PathBuf>) -> Self {
        paths.extend(default_search_paths());
        Self {
            search_paths: paths,
            libraries: HashMap::new(),
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Search `path` before everything else
    pub fn add_search_path(&mut self, path: impl Into<PathBuf>) {
        self.search_paths.insert(0, path.into());
    }

    /// Number of distinct libraries opened so far
    pub fn opened(&self) -> usize {
        self.libraries.len()
    }

    /// Find the file for `name`.
    ///
    /// A name with a directory part is taken as a path. A bare name is looked
    /// up in every search path, first as given and then with the platform's
    /// prefix and suffix (`libgodot.so`, `godot.dll`, ...).
    pub fn locate(&self, name: &str) -> Result<PathBuf, LoadError> {
        let not_found = || LoadError::LibraryNotFound {
            name: name.to_string(),
            searched: self.search_paths.len(),
        };

        let given = Path::new(name);
        if given
            .parent()
            .is_some_and(|dir| !dir.as_os_str().is_empty())
        {
            return given
                .is_file()
                .then(|| given.to_path_buf())
                .ok_or_else(not_found);
        }

        self.search_paths
            .iter()
            .flat_map(|dir| file_names(name).map(move |file| dir.join(file)))
            .find(|candidate| candidate.is_file())
            .ok_or_else(not_found)
    }

    /// Open the library for `name`, reusing it if it is already open.
    ///
    /// # Safety
    ///
    /// Opening a library runs its initialization routines. Only open trusted
    /// engine libraries.
    pub unsafe fn open(&mut self, name: &str) -> Result<&Library, LoadError> {
        let path = self.locate(name)?;
        self.open_path(path)
    }

    unsafe fn open_path(&mut self, path: PathBuf) -> Result<&Library, LoadError> {
        let library = match self.libraries.entry(path) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let library = Library::new(entry.key()).map_err(|e| LoadError::LoadFailed {
                    path: entry.key().clone(),
                    reason: e.to_string(),
                })?;
                debug!(path = %entry.key().display(), "host library opened");
                entry.insert(library)
            }
        };
        Ok(library)
    }

    /// Open `name` and copy out the exported symbol `symbol` as a `T`,
    /// usually a function pointer.
    ///
    /// # Safety
    ///
    /// As for [`LibraryLoader::open`]. In addition, the export must really
    /// have type `T`, and the value must not be used after the loader drops.
    pub unsafe fn symbol<T: Copy>(&mut self, name: &str, symbol: &str) -> Result<T, LoadError> {
        let path = self.locate(name)?;
        let library = self.open_path(path.clone())?;
        let export = library
            .get::<T>(symbol.as_bytes())
            .map_err(|_| LoadError::SymbolNotFound {
                path,
                symbol: symbol.to_string(),
            })?;
        Ok(*export)
    }

    /// Resolve the get-proc-address function `name` exports as `symbol`.
    ///
    /// # Safety
    ///
    /// As for [`LibraryLoader::symbol`] with `T` = [`GetProcAddressFn`].
    pub unsafe fn proc_address(
        &mut self,
        name: &str,
        symbol: &str,
    ) -> Result<GetProcAddressFn, LoadError> {
        self.symbol::<GetProcAddressFn>(name, symbol)
    }

    /// Get-proc-address function of the host library named in `config`,
    /// exported as `[library] proc_address_symbol` or
    /// [`DEFAULT_PROC_ADDRESS_SYMBOL`].
    ///
    /// # Safety
    ///
    /// As for [`LibraryLoader::proc_address`].
    pub unsafe fn configured_proc_address(
        &mut self,
        config: &Config,
    ) -> Result<GetProcAddressFn, LoadError> {
        let name = config.library.as_deref().ok_or(LoadError::NotConfigured)?;
        let symbol = config
            .proc_address_symbol
            .as_deref()
            .unwrap_or(DEFAULT_PROC_ADDRESS_SYMBOL);
        self.proc_address(name, symbol)
    }

    /// Pointer-call entry point of the host library named in `config`.
    ///
    /// # Safety
    ///
    /// As for [`LibraryLoader::proc_address`]; the returned `PtrCall` must not
    /// be used after the loader drops.
    pub unsafe fn configured_ptrcall(&mut self, config: &Config) -> Result<PtrCall, LoadError> {
        let get_proc_address = self.configured_proc_address(config)?;
        Ok(PtrCall::from_proc_address(get_proc_address)?)
    }

    /// Variant-call entry point of the host library named in `config`.
    ///
    /// # Safety
    ///
    /// As for [`LibraryLoader::configured_ptrcall`].
    pub unsafe fn configured_method_bind_call(
        &mut self,
        config: &Config,
    ) -> Result<MethodBindCall, LoadError> {
        let get_proc_address = self.configured_proc_address(config)?;
        Ok(MethodBindCall::from_proc_address(get_proc_address)?)
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Working directory, the executable's directory, then system directories
fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        if !paths.contains(&exe_dir) {
            paths.push(exe_dir);
        }
    }
    paths.extend(SYSTEM_DIRS.iter().map(PathBuf::from));
    paths
}

/// Candidate file names for a bare library name
fn file_names(name: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(name.to_string()).chain(
        FILE_PATTERNS
            .iter()
            .map(move |(prefix, suffix)| format!("{}{}{}", prefix, name, suffix)),
    )
}
