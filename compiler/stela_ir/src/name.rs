//! Package naming.

use std::fmt;

/// A package path, e.g. `["geo", "shapes"]` for `geo/shapes.stela`.
///
/// The last segment is the package name; the others are directories under
/// the source root.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Namespace(Vec<String>);

impl Namespace {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Namespace(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The package name (last segment).
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Directory segments leading to the package.
    pub fn dirs(&self) -> &[String] {
        match self.0.split_last() {
            Some((_, dirs)) => dirs,
            None => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// A namespace plus the package version: the handle a loader uses to find
/// a compiled module.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionedName {
    pub namespace: Namespace,
    pub version: u64,
}

impl VersionedName {
    pub fn new(namespace: Namespace, version: u64) -> Self {
        VersionedName { namespace, version }
    }
}

impl fmt::Display for VersionedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.version)
    }
}
