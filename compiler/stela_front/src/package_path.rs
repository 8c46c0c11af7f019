//! Mapping a source file to its package namespace.

use std::path::{Path, PathBuf};

use stela_ir::Namespace;

/// File marking the top of a package tree.
pub const ROOT_MARKER: &str = "__stela__";

/// The one extension a package source may have.
pub const SOURCE_EXTENSION: &str = "stela";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PackagePathError {
    #[error(
        "invalid package name `{0}`: package names may not contain a '.'; \
         a source file can only be 'a.stela', not 'a.foo.stela'"
    )]
    InvalidName(String),
    #[error("`{0}` is not inside its source root")]
    OutsideRoot(PathBuf),
    #[error("path component `{0}` is not valid UTF-8")]
    NonUtf8(PathBuf),
}

/// A package source located under its source root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackagePath {
    root: PathBuf,
    rel: PathBuf,
}

impl PackagePath {
    /// Locate `source` under the nearest ancestor directory holding
    /// [`ROOT_MARKER`], or under its own directory when there is none.
    pub fn locate(source: &Path) -> Result<Self, PackagePathError> {
        let dir = source.parent().unwrap_or_else(|| Path::new(""));
        let root = dir
            .ancestors()
            .find(|d| d.join(ROOT_MARKER).is_file())
            .unwrap_or(dir)
            .to_path_buf();
        Self::under(root, source)
    }

    /// Treat `source` as a package under an explicit `root`.
    pub fn under(root: PathBuf, source: &Path) -> Result<Self, PackagePathError> {
        let rel = source
            .strip_prefix(&root)
            .map_err(|_| PackagePathError::OutsideRoot(source.to_path_buf()))?
            .to_path_buf();
        let path = PackagePath { root, rel };
        path.namespace()?;
        Ok(path)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path relative to the source root, as printed in "Errors in:".
    pub fn rel(&self) -> &Path {
        &self.rel
    }

    pub fn abs(&self) -> PathBuf {
        self.root.join(&self.rel)
    }

    /// Directories plus file stem, e.g. `geo/shapes.stela` -> `geo/shapes`.
    pub fn namespace(&self) -> Result<Namespace, PackagePathError> {
        let non_utf8 = || PackagePathError::NonUtf8(self.rel.clone());
        let file_name = self
            .rel
            .file_name()
            .ok_or_else(|| PackagePathError::InvalidName(self.rel.display().to_string()))?
            .to_str()
            .ok_or_else(non_utf8)?;
        let stem = match file_name.split_once('.') {
            Some((stem, ext)) if ext == SOURCE_EXTENSION && !stem.is_empty() => stem,
            _ => return Err(PackagePathError::InvalidName(file_name.to_owned())),
        };

        let mut segments = Vec::new();
        if let Some(parent) = self.rel.parent() {
            for component in parent.components() {
                let segment = component.as_os_str().to_str().ok_or_else(non_utf8)?;
                segments.push(segment.to_owned());
            }
        }
        segments.push(stem.to_owned());
        Ok(Namespace::new(segments))
    }
}
