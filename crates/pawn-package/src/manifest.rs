//! Pawn package definitions (`pawn.json` / `pawn.yaml`).
//!
//! A [`Package`] is the in-memory description of a package. It is either the
//! "working" package a user is developing or a dependency that was fetched,
//! and combines the package's identity with its dependencies and its build and
//! runtime profiles. [`Manifest`] is the persisted shape of the same data.

use crate::build::BuildConfig;
use crate::codec::{scalar_or_sequence, CodecError, ManifestFormat};
use crate::dependency::{DependencyError, DependencyMeta, DependencyString, VersionPin};
use crate::resource::Resource;
use crate::runtime::RuntimeConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading, validating or writing a package definition.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read '{}': {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to load configuration from '{origin}': {source}")]
    Decode { origin: String, source: CodecError },

    #[error("invalid package definition '{origin}': {reason}")]
    Invalid { origin: String, reason: String },

    #[error("duplicate {kind} config name '{name}' in '{origin}'")]
    DuplicateConfig {
        origin: String,
        kind: &'static str,
        name: String,
    },

    #[error("package entry and output point to the same file")]
    SameEntryOutput,

    #[error("package has no format associated with it")]
    NoFormat,

    #[error("package '{0}' has no local directory to write its definition to")]
    NoLocalPath(String),

    #[error("failed to encode package metadata: {0}")]
    Encode(CodecError),

    #[error("failed to write '{}': {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// The persisted package definition, key for key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributors: Vec<String>,
    #[serde(
        default,
        deserialize_with = "scalar_or_sequence",
        skip_serializing_if = "Option::is_none"
    )]
    pub website: Option<String>,

    #[serde(
        default,
        deserialize_with = "scalar_or_sequence",
        skip_serializing_if = "Option::is_none"
    )]
    pub entry: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_or_sequence",
        skip_serializing_if = "Option::is_none"
    )]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyString>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dev_dependencies: Vec<DependencyString>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub local: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub runtimes: Vec<RuntimeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub builds: Vec<BuildConfig>,
    #[serde(
        default,
        deserialize_with = "scalar_or_sequence",
        skip_serializing_if = "Option::is_none"
    )]
    pub include_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
}

/// A Pawn package, akin to npm's `package.json`.
///
/// A gamemode that only consumes libraries needs nothing but `dependencies`.
/// A library should describe itself with contributors and a website, and set
/// `include_path` when its Pawn sources live in a subdirectory of the repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    /// Identity, inferred from the dependency string when not written in the definition.
    pub meta: DependencyMeta,

    /// True for the package the user is developing, false for fetched dependencies.
    pub parent: bool,
    /// Directory holding the definition file, if the package exists on disk.
    pub local_path: Option<PathBuf>,
    /// Directory dependencies are installed into.
    pub vendor: Option<PathBuf>,
    /// Format the definition was read from, and will be written back in.
    pub format: Option<ManifestFormat>,

    pub contributors: Vec<String>,
    /// Website or forum topic for the package.
    pub website: Option<String>,

    /// Entry script to compile.
    pub entry: Option<String>,
    /// Compiled output file.
    pub output: Option<String>,
    pub dependencies: Vec<DependencyString>,
    /// Dependencies needed only to build and test the package itself.
    pub dev_dependencies: Vec<DependencyString>,
    /// Run in the package directory instead of an isolated runtime directory.
    pub local: bool,
    pub runtime: Option<RuntimeConfig>,
    pub runtimes: Vec<RuntimeConfig>,
    pub build: Option<BuildConfig>,
    pub builds: Vec<BuildConfig>,
    /// Include directory within the repository.
    pub include_path: Option<String>,
    pub resources: Vec<Resource>,
}

impl Package {
    /// Create a metadata-only package from a dependency string.
    ///
    /// # Errors
    ///
    /// Returns an error if the dependency string is malformed.
    pub fn from_dep(dep: &DependencyString) -> Result<Self, DependencyError> {
        Ok(Self {
            meta: dep.explode()?,
            ..Self::default()
        })
    }

    /// Load the package definition from a directory.
    ///
    /// `pawn.json` is preferred over `pawn.yaml`. A directory with neither is
    /// not an error: an empty package is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition cannot be read or decoded.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let dir = dir.as_ref();
        let found = ManifestFormat::PROBE_ORDER
            .into_iter()
            .map(|format| (format, dir.join(format.file_name())))
            .find(|(_, path)| path.exists());

        let Some((format, path)) = found else {
            tracing::debug!(
                dir = %dir.display(),
                "no package definition file (pawn.{{json|yaml}})"
            );
            return Ok(Self::default());
        };

        let content = fs::read_to_string(&path).map_err(|source| ManifestError::Read {
            path: path.clone(),
            source,
        })?;
        let mut pkg = Self::decode(format, &content, &path.display().to_string())?;
        pkg.local_path = Some(dir.to_path_buf());
        Ok(pkg)
    }

    /// Load a package from its copy in a package cache directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the cached definition cannot be read or decoded.
    pub fn from_cache(
        meta: &DependencyMeta,
        cache_dir: impl AsRef<Path>,
    ) -> Result<Self, ManifestError> {
        Self::from_dir(meta.cache_path(cache_dir))
    }

    /// Decode a definition. `origin` names the file or dependency in errors.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is malformed, has unknown keys, pins
    /// more than one revision, or repeats a build or runtime name.
    pub fn decode(
        format: ManifestFormat,
        content: &str,
        origin: &str,
    ) -> Result<Self, ManifestError> {
        let manifest: Manifest = format
            .decode(content)
            .map_err(|source| ManifestError::Decode {
                origin: origin.to_string(),
                source,
            })?;
        let mut pkg = Self::from_manifest(manifest, origin)?;
        pkg.check_unique_names(origin)?;
        pkg.format = Some(format);
        Ok(pkg)
    }

    fn from_manifest(m: Manifest, origin: &str) -> Result<Self, ManifestError> {
        let pin = match (m.tag, m.branch, m.commit) {
            (None, None, None) => None,
            (Some(t), None, None) => Some(VersionPin::Tag(t)),
            (None, Some(b), None) => Some(VersionPin::Branch(b)),
            (None, None, Some(c)) => Some(VersionPin::Commit(c)),
            _ => {
                return Err(ManifestError::Invalid {
                    origin: origin.to_string(),
                    reason: "only one of 'tag', 'branch' or 'commit' may be set".to_string(),
                })
            }
        };

        Ok(Self {
            meta: DependencyMeta {
                site: m.site,
                user: m.user.unwrap_or_default(),
                repo: m.repo.unwrap_or_default(),
                path: m.path,
                pin,
            },
            contributors: m.contributors,
            website: m.website,
            entry: m.entry,
            output: m.output,
            dependencies: m.dependencies,
            dev_dependencies: m.dev_dependencies,
            local: m.local,
            runtime: m.runtime,
            runtimes: m.runtimes,
            build: m.build,
            builds: m.builds,
            include_path: m.include_path,
            resources: m.resources,
            ..Self::default()
        })
    }

    /// The persisted fields of this package.
    #[must_use]
    pub fn to_manifest(&self) -> Manifest {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Manifest {
            site: self.meta.site.clone(),
            user: non_empty(&self.meta.user),
            repo: non_empty(&self.meta.repo),
            path: self.meta.path.clone(),
            tag: self.meta.tag().map(str::to_string),
            branch: self.meta.branch().map(str::to_string),
            commit: self.meta.commit().map(str::to_string),
            contributors: self.contributors.clone(),
            website: self.website.clone(),
            entry: self.entry.clone(),
            output: self.output.clone(),
            dependencies: self.dependencies.clone(),
            dev_dependencies: self.dev_dependencies.clone(),
            local: self.local,
            runtime: self.runtime.clone(),
            runtimes: self.runtimes.clone(),
            build: self.build.clone(),
            builds: self.builds.clone(),
            include_path: self.include_path.clone(),
            resources: self.resources.clone(),
        }
    }

    fn check_unique_names(&self, origin: &str) -> Result<(), ManifestError> {
        let builds = first_duplicate(self.builds.iter().map(|b| b.name.as_str()));
        let runtimes = first_duplicate(self.runtimes.iter().map(|r| r.name.as_str()));
        let found = builds
            .map(|name| ("build", name))
            .or_else(|| runtimes.map(|name| ("runtime", name)));

        match found {
            Some((kind, name)) => Err(ManifestError::DuplicateConfig {
                origin: origin.to_string(),
                kind,
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Check the package for inconsistent fields.
    ///
    /// # Errors
    ///
    /// Returns an error if entry and output name the same file.
    pub fn validate(&self) -> Result<(), ManifestError> {
        match (&self.entry, &self.output) {
            (Some(entry), Some(output)) if entry == output => Err(ManifestError::SameEntryOutput),
            _ => Ok(()),
        }
    }

    /// Runtime dependencies followed by development dependencies.
    pub fn all_dependencies(&self) -> impl Iterator<Item = &DependencyString> {
        self.dependencies.iter().chain(self.dev_dependencies.iter())
    }

    /// Write the definition back to `<local_path>/pawn.<format>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the package has no recorded format, has no local
    /// directory (fetched packages exist only in memory), or the file cannot
    /// be encoded or written.
    pub fn write_definition(&self) -> Result<(), ManifestError> {
        let format = self.format.ok_or(ManifestError::NoFormat)?;
        let dir = self
            .local_path
            .as_deref()
            .ok_or_else(|| ManifestError::NoLocalPath(self.to_string()))?;
        let contents = format
            .encode(&self.to_manifest())
            .map_err(ManifestError::Encode)?;

        let path = dir.join(format.file_name());
        write_owner_only(&path, &contents).map_err(|source| ManifestError::Write { path, source })
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.meta)
    }
}

/// Unnamed profiles can only be selected positionally and are not compared.
fn first_duplicate<'a>(names: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    names.filter(|n| !n.is_empty()).find(|n| !seen.insert(*n))
}

fn write_owner_only(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o700);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)
}
