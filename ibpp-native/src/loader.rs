//! Location of the fbclient library

use glob::glob;
use std::{
    env,
    os::raw::c_void,
    path::{Path, PathBuf},
};

use ibpp_core::FbError;

use crate::entry_points::FbClientLib;

/// Library names of the client, the embedded server first
const LIB_NAMES: [&str; 2] = ["fbembed", "fbclient"];

#[cfg(windows)]
const INSTALL_DIRS: [&str; 4] = [
    "C:\\Program Files\\Firebird\\Firebird*",
    "C:\\Program Files (x86)\\Firebird\\Firebird*",
    "C:\\Firebird*",
    "D:\\Firebird*",
];

#[cfg(target_os = "macos")]
const INSTALL_DIRS: [&str; 2] = [
    "/Library/Frameworks/Firebird.framework/Libraries",
    "/Library/Frameworks/Firebird.framework/Versions/*/Libraries",
];

#[cfg(all(unix, not(target_os = "macos")))]
const INSTALL_DIRS: [&str; 3] = ["/opt/firebird/lib", "/opt/firebird*/lib", "/usr/lib/firebird*/lib"];

/// Named symbols of a loaded library
pub trait SymbolSource {
    /// Address of the symbol, if the library exports it
    ///
    /// # Safety
    /// The caller must cast the address to the real signature of the symbol
    unsafe fn symbol(&self, name: &str) -> Option<*const c_void>;
}

impl SymbolSource for libloading::Library {
    unsafe fn symbol(&self, name: &str) -> Option<*const c_void> {
        self.get::<*const c_void>(name.as_bytes())
            .ok()
            .map(|sym| *sym)
    }
}

/// Finds and loads the fbclient library
#[derive(Debug, Clone, Default)]
pub struct ClientLoader {
    path: Option<PathBuf>,
}

impl ClientLoader {
    /// Loader using the default search order
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader of the library at `path`, no search is done
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        ClientLoader {
            path: Some(path.into()),
        }
    }

    /// Libraries to try, in order: the `FBCLIENT_LIB_DIR` directory, a
    /// local copy next to the executable or in the current directory,
    /// the `FIREBIRD` directory, the install directories and at last the
    /// system search path
    pub fn candidates(&self) -> Vec<PathBuf> {
        if let Some(path) = &self.path {
            return vec![path.clone()];
        }

        let mut dirs = vec![];

        if let Ok(dir) = env::var("FBCLIENT_LIB_DIR") {
            dirs.push(PathBuf::from(dir));
        }

        if let Some(dir) = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            dirs.push(dir);
        }
        if let Ok(dir) = env::current_dir() {
            dirs.push(dir);
        }

        if let Ok(root) = env::var("FIREBIRD") {
            let root = PathBuf::from(root);
            dirs.push(root.join("lib"));
            dirs.push(root.join("bin"));
            dirs.push(root);
        }

        for pattern in INSTALL_DIRS.iter() {
            if let Ok(found) = glob(pattern) {
                dirs.extend(found.flatten().filter(|p| p.is_dir()));
            }
        }

        let mut candidates: Vec<PathBuf> = vec![];
        for dir in dirs {
            for name in LIB_NAMES.iter() {
                let file = dir.join(libloading::library_filename(name));
                if file.is_file() && !candidates.contains(&file) {
                    candidates.push(file);
                }
            }
        }

        // Left to the dynamic linker
        candidates.push(PathBuf::from(libloading::library_filename("fbclient")));
        #[cfg(all(unix, not(target_os = "macos")))]
        candidates.push(PathBuf::from("libfbclient.so.2"));
        #[cfg(windows)]
        candidates.push(PathBuf::from("gds32.dll"));

        candidates
    }

    /// Loads the first candidate that can be opened and binds every entry
    /// point of it
    pub fn load(&self) -> Result<FbClientLib, FbError> {
        let mut tried = vec![];

        for candidate in self.candidates() {
            let lib = match unsafe { libloading::Library::new(&candidate) } {
                Ok(lib) => lib,
                Err(e) => {
                    log::debug!("Can't load {}: {}", candidate.display(), e);
                    tried.push(candidate.display().to_string());
                    continue;
                }
            };

            log::debug!("Loaded the firebird client from {}", candidate.display());

            return FbClientLib::from_library(lib, candidate);
        }

        Err(FbError::logic(
            "GDS::Call",
            format!(
                "Can't find or load the firebird client library. Tried: {}",
                tried.join(", ")
            ),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn explicit_path() {
        let loader = ClientLoader::with_path("/nowhere/libfbclient.so");

        assert_eq!(
            vec![PathBuf::from("/nowhere/libfbclient.so")],
            loader.candidates()
        );
        assert!(loader.load().unwrap_err().is_logic());
    }

    #[test]
    fn system_path_is_the_last_resort() {
        let candidates = ClientLoader::new().candidates();

        assert!(!candidates.is_empty());
        assert!(candidates
            .iter()
            .any(|c| c == &PathBuf::from(libloading::library_filename("fbclient"))));
    }
}
