//! Package definitions for Pawn projects.
//!
//! This crate provides:
//! - Parsing and writing of `pawn.json` / `pawn.yaml` package definitions
//! - Dependency string parsing (`user/repo:tag`)
//! - Fetching definitions of remote dependencies, from the central
//!   definitions repository or the package's own repository
//! - Selection and merging of build and runtime profiles

pub mod build;
pub mod codec;
pub mod dependency;
mod manifest;
pub mod remote;
pub mod resource;
pub mod runtime;
mod select;

pub use build::{BuildConfig, CompilerConfig};
pub use codec::{CodecError, ManifestFormat};
pub use dependency::{DependencyError, DependencyMeta, DependencyString, VersionPin};
pub use manifest::{Manifest, ManifestError, Package};
pub use remote::{
    FetchContext, GitHubHost, PackageFetcher, RawResponse, RemoteConfig, RemoteError,
    RepositoryHost,
};
pub use resource::Resource;
pub use runtime::{RuntimeConfig, RuntimeMode};
pub use select::SelectError;
