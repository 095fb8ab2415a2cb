//! Dependency descriptors for Pawn packages.
//!
//! A dependency is written in a manifest as a short string such as
//! `user/repo:1.2.0` and exploded into a [`DependencyMeta`] that identifies
//! where the package lives and which revision it is pinned to:
//!
//! - `user/repo` - default branch of a GitHub repository
//! - `user/repo:v1.0.0` - a tag
//! - `user/repo@develop` - a branch
//! - `user/repo#a1b2c3d` - a commit
//! - `gitlab.com/user/repo/sub/dir` - another site, with a sub-path

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Site assumed when a dependency string does not name one.
pub const DEFAULT_SITE: &str = "github.com";

/// Errors that can occur when parsing a dependency string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    #[error("invalid dependency string '{spec}': {reason}")]
    Invalid { spec: String, reason: String },
}

impl DependencyError {
    fn invalid(spec: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}

/// The revision a dependency is pinned to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionPin {
    /// A release tag.
    Tag(String),
    /// A branch name.
    Branch(String),
    /// A specific commit.
    Commit(String),
}

impl fmt::Display for VersionPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(t) => write!(f, ":{t}"),
            Self::Branch(b) => write!(f, "@{b}"),
            Self::Commit(c) => write!(f, "#{c}"),
        }
    }
}

/// Identity of a remote package: hosting site, owner, repository, optional
/// sub-path and version pin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DependencyMeta {
    /// Hosting site, `None` means [`DEFAULT_SITE`].
    pub site: Option<String>,
    /// User or organisation owning the repository.
    pub user: String,
    /// Repository name.
    pub repo: String,
    /// Sub-directory inside the repository holding the package.
    pub path: Option<String>,
    /// Revision pin, `None` means the default branch.
    pub pin: Option<VersionPin>,
}

impl DependencyMeta {
    /// Create a meta for `user/repo` on the default site with no pin.
    #[must_use]
    pub fn new(user: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            repo: repo.into(),
            ..Self::default()
        }
    }

    /// Set the version pin.
    #[must_use]
    pub fn with_pin(mut self, pin: VersionPin) -> Self {
        self.pin = Some(pin);
        self
    }

    /// The hosting site, falling back to [`DEFAULT_SITE`].
    #[must_use]
    pub fn site(&self) -> &str {
        self.site.as_deref().unwrap_or(DEFAULT_SITE)
    }

    /// The pinned tag, if any.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match &self.pin {
            Some(VersionPin::Tag(t)) => Some(t),
            _ => None,
        }
    }

    /// The pinned branch, if any.
    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        match &self.pin {
            Some(VersionPin::Branch(b)) => Some(b),
            _ => None,
        }
    }

    /// The pinned commit, if any.
    #[must_use]
    pub fn commit(&self) -> Option<&str> {
        match &self.pin {
            Some(VersionPin::Commit(c)) => Some(c),
            _ => None,
        }
    }

    /// Returns true if neither user nor repo is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user.is_empty() && self.repo.is_empty()
    }

    /// Location of this package inside a package cache directory.
    #[must_use]
    pub fn cache_path(&self, cache_dir: impl AsRef<Path>) -> PathBuf {
        cache_dir
            .as_ref()
            .join("packages")
            .join(&self.user)
            .join(&self.repo)
    }
}

impl fmt::Display for DependencyMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(site) = self.site.as_deref().filter(|s| *s != DEFAULT_SITE) {
            write!(f, "{site}/")?;
        }
        write!(f, "{}/{}", self.user, self.repo)?;
        if let Some(ref path) = self.path {
            write!(f, "/{path}")?;
        }
        if let Some(ref pin) = self.pin {
            write!(f, "{pin}")?;
        }
        Ok(())
    }
}

/// A dependency as written in a manifest's `dependencies` list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyString(pub String);

impl DependencyString {
    /// Parse the string into its components.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not of the form
    /// `[site/]user/repo[/path][:tag|@branch|#commit]`.
    pub fn explode(&self) -> Result<DependencyMeta, DependencyError> {
        let spec = self.0.trim();
        if spec.is_empty() {
            return Err(DependencyError::invalid(spec, "dependency string is empty"));
        }

        let rest = spec
            .strip_prefix("https://")
            .or_else(|| spec.strip_prefix("http://"))
            .unwrap_or(spec);

        let (location, pin) = split_pin(spec, rest)?;

        let mut parts: Vec<&str> = location.trim_end_matches('/').split('/').collect();
        let site = if parts.len() > 2 && parts[0].contains('.') {
            Some(parts.remove(0).to_string())
        } else {
            None
        };

        if parts.len() < 2 {
            return Err(DependencyError::invalid(spec, "expected format 'user/repo'"));
        }

        let user = parts[0];
        let repo = parts[1].trim_end_matches(".git");
        if user.is_empty() || !is_valid_name(user) {
            return Err(DependencyError::invalid(
                spec,
                format!("invalid user name '{user}'"),
            ));
        }
        if repo.is_empty() || !is_valid_name(repo) {
            return Err(DependencyError::invalid(
                spec,
                format!("invalid repository name '{repo}'"),
            ));
        }

        let path = (parts.len() > 2).then(|| parts[2..].join("/"));

        Ok(DependencyMeta {
            site,
            user: user.to_string(),
            repo: repo.to_string(),
            path,
            pin,
        })
    }
}

impl fmt::Display for DependencyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DependencyString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&DependencyMeta> for DependencyString {
    fn from(meta: &DependencyMeta) -> Self {
        Self(meta.to_string())
    }
}

/// Split the trailing `:tag`, `@branch` or `#commit` off a dependency string.
fn split_pin<'a>(
    spec: &str,
    rest: &'a str,
) -> Result<(&'a str, Option<VersionPin>), DependencyError> {
    let markers: Vec<(usize, char)> = rest
        .char_indices()
        .filter(|(_, c)| matches!(*c, ':' | '@' | '#'))
        .collect();

    match markers.as_slice() {
        [] => Ok((rest, None)),
        [(pos, marker)] => {
            let (pos, marker) = (*pos, *marker);
            let value = &rest[pos + 1..];
            if value.is_empty() {
                return Err(DependencyError::invalid(
                    spec,
                    format!("version after '{marker}' cannot be empty"),
                ));
            }
            let pin = match marker {
                ':' => VersionPin::Tag(value.to_string()),
                '@' => VersionPin::Branch(value.to_string()),
                _ => VersionPin::Commit(value.to_string()),
            };
            Ok((&rest[..pos], Some(pin)))
        }
        _ => Err(DependencyError::invalid(
            spec,
            "only one of ':tag', '@branch' or '#commit' may be given",
        )),
    }
}

/// Hosting sites allow alphanumerics, hyphens, underscores and dots in names.
fn is_valid_name(name: &str) -> bool {
    if name.len() > 100 || name.starts_with('-') {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explode(s: &str) -> Result<DependencyMeta, DependencyError> {
        DependencyString::from(s).explode()
    }

    #[test]
    fn explode_basic() {
        let meta = explode("pawn-lang/samp-stdlib").unwrap();
        assert_eq!(meta.user, "pawn-lang");
        assert_eq!(meta.repo, "samp-stdlib");
        assert_eq!(meta.site(), DEFAULT_SITE);
        assert_eq!(meta.path, None);
        assert_eq!(meta.pin, None);
    }

    #[test]
    fn explode_pins() {
        assert_eq!(explode("user/repo:1.2.0").unwrap().tag(), Some("1.2.0"));
        assert_eq!(explode("user/repo@develop").unwrap().branch(), Some("develop"));
        assert_eq!(explode("user/repo#a1b2c3").unwrap().commit(), Some("a1b2c3"));
    }

    #[test]
    fn explode_site_and_path() {
        let meta = explode("https://gitlab.com/user/repo/include/sub:v2").unwrap();
        assert_eq!(meta.site.as_deref(), Some("gitlab.com"));
        assert_eq!(meta.user, "user");
        assert_eq!(meta.repo, "repo");
        assert_eq!(meta.path.as_deref(), Some("include/sub"));
        assert_eq!(meta.tag(), Some("v2"));
    }

    #[test]
    fn explode_github_url() {
        let meta = explode("https://github.com/Southclaws/pawn-errors").unwrap();
        assert_eq!(meta.site.as_deref(), Some("github.com"));
        assert_eq!(meta.to_string(), "Southclaws/pawn-errors");
    }

    #[test]
    fn explode_invalid() {
        assert!(explode("").is_err());
        assert!(explode("userrepo").is_err());
        assert!(explode("/repo").is_err());
        assert!(explode("user/").is_err());
        assert!(explode("user/repo:").is_err());
        assert!(explode("user/repo:1.0@main").is_err());
    }

    #[test]
    fn display_matches_dependency_string() {
        for s in [
            "user/repo",
            "user/repo:1.0.0",
            "user/repo@main",
            "user/repo#deadbeef",
            "gitlab.com/user/repo/sub",
        ] {
            assert_eq!(explode(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn cache_path_layout() {
        let meta = DependencyMeta::new("user", "repo");
        assert_eq!(
            meta.cache_path("/tmp/cache"),
            PathBuf::from("/tmp/cache/packages/user/repo")
        );
    }
}
