//! Build profiles declared by a package.
//!
//! Every overridable field is optional so that "not set" and "explicitly set
//! to an empty value" stay distinguishable when profiles are merged.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Compiler version used when a package does not request one.
pub const DEFAULT_COMPILER_VERSION: &str = "3.10.10";

/// Compiler flags used when a package does not declare any.
pub const DEFAULT_ARGS: &[&str] = &["-d3", "-;+", "-(+", "-\\+", "-Z+"];

/// Name of the built-in build profile.
pub const DEFAULT_BUILD_NAME: &str = "default";

/// Where to obtain the compiler from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    /// Compiler release version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl CompilerConfig {
    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn fill_gaps(&mut self, src: &Self) {
        fill(&mut self.site, &src.site);
        fill(&mut self.user, &src.user);
        fill(&mut self.repo, &src.repo);
        fill(&mut self.version, &src.version);
    }
}

/// A named build profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Profile name, used to select it from the `builds` list.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Generic version that takes precedence over `compiler.version`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Directory the compiler is run from.
    #[serde(default, rename = "workingDir", skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    /// Compiler flags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,

    /// Entry script, overrides the package entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,

    /// Output file, overrides the package output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Additional include directories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub includes: Option<Vec<String>>,

    /// Preprocessor constants passed as `NAME=value`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constants: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "CompilerConfig::is_empty")]
    pub compiler: CompilerConfig,

    /// Commands run before compiling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_build: Option<Vec<Vec<String>>>,

    /// Commands run after a successful compile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_build: Option<Vec<Vec<String>>>,
}

impl BuildConfig {
    /// The built-in profile used when a package declares none.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            name: DEFAULT_BUILD_NAME.to_string(),
            args: Some(DEFAULT_ARGS.iter().map(|a| (*a).to_string()).collect()),
            compiler: CompilerConfig {
                version: Some(DEFAULT_COMPILER_VERSION.to_string()),
                ..CompilerConfig::default()
            },
            ..Self::default()
        }
    }

    /// Copy every field of `src` into `self` where `self` leaves it unset.
    /// Fields already set on `self` are never overwritten.
    pub fn fill_gaps(&mut self, src: &Self) {
        if self.name.is_empty() {
            self.name.clone_from(&src.name);
        }
        fill(&mut self.version, &src.version);
        fill(&mut self.working_dir, &src.working_dir);
        fill(&mut self.args, &src.args);
        fill(&mut self.input, &src.input);
        fill(&mut self.output, &src.output);
        fill(&mut self.includes, &src.includes);
        fill(&mut self.constants, &src.constants);
        self.compiler.fill_gaps(&src.compiler);
        fill(&mut self.pre_build, &src.pre_build);
        fill(&mut self.post_build, &src.post_build);
    }

    /// Apply the version precedence rules and built-in defaults.
    ///
    /// `version` overrides `compiler.version`; a compiler version or argument
    /// list that is still unset afterwards comes from [`BuildConfig::builtin`].
    pub fn normalize(&mut self) {
        if let Some(ref version) = self.version {
            self.compiler.version = Some(version.clone());
        }
        let def = Self::builtin();
        fill(&mut self.compiler.version, &def.compiler.version);
        fill(&mut self.args, &def.args);
    }

    /// The compiler version, once normalized.
    #[must_use]
    pub fn compiler_version(&self) -> Option<&str> {
        self.compiler.version.as_deref()
    }
}

pub(crate) fn fill<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
    if dst.is_none() {
        dst.clone_from(src);
    }
}
