//! Auxiliary resources shipped alongside a package, typically prebuilt plugin
//! binaries attached to a release.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A release asset that provides plugins or includes for a specific platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Resource {
    /// Pattern matched against release asset filenames.
    pub name: String,

    /// Target platform (`linux`, `windows`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Whether the asset is an archive that must be extracted.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub archive: bool,

    /// Directories inside the archive containing include files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,

    /// Plugin binaries inside the archive.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,

    /// Additional files to copy, archive path to destination path.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, String>,

    /// Version of the resource, when it differs from the package tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Resource {
    /// Returns true if this resource applies to the given platform.
    ///
    /// A resource without a platform applies everywhere.
    #[must_use]
    pub fn matches_platform(&self, platform: &str) -> bool {
        self.platform.as_deref().map_or(true, |p| p == platform)
    }
}
