//! Choosing the build and runtime profile a package is built and run with.
//!
//! A package may declare a singular `build`/`runtime` profile, a list of named
//! `builds`/`runtimes`, or both. When a profile is picked from the list, the
//! singular profile fills in whatever the picked profile leaves unset.

use crate::build::BuildConfig;
use crate::manifest::Package;
use crate::runtime::RuntimeConfig;
use thiserror::Error;

/// Errors that can occur when selecting a profile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    #[error("no runtime config '{0}'")]
    RuntimeNotFound(String),
}

impl Package {
    /// The build profile called `name`, or the package's main profile when
    /// `name` is empty.
    ///
    /// This never fails: an unknown name falls back to the singular `build`
    /// profile, then to [`BuildConfig::builtin`], with a warning. The result
    /// is normalized (see [`BuildConfig::normalize`]).
    #[must_use]
    pub fn build_config(&self, name: &str) -> BuildConfig {
        if self.builds.is_empty() && self.build.is_none() {
            return BuildConfig::builtin();
        }

        let selected = if name.is_empty() {
            self.build.clone().or_else(|| self.builds.first().cloned())
        } else {
            self.builds.iter().find(|b| b.name == name).map(|found| {
                let mut config = found.clone();
                if let Some(ref main) = self.build {
                    config.fill_gaps(main);
                }
                config
            })
        };

        let mut config = selected.unwrap_or_else(|| match self.build {
            Some(ref main) => {
                tracing::warn!(
                    package = %self,
                    build = name,
                    "build doesn't exist, defaulting to main build"
                );
                main.clone()
            }
            None => {
                tracing::warn!(
                    package = %self,
                    build = name,
                    "no build config called '{name}', using default"
                );
                BuildConfig::builtin()
            }
        });

        config.normalize();
        config
    }

    /// The runtime profile called `name`, or the first listed profile when
    /// `name` is empty. Runtime defaults are applied to the result.
    ///
    /// # Errors
    ///
    /// Returns an error if `runtimes` is not empty and has no profile called
    /// `name`. Unlike [`Package::build_config`] there is no fallback.
    pub fn runtime_config(&self, name: &str) -> Result<RuntimeConfig, SelectError> {
        let mut config = if self.runtimes.is_empty() {
            if let Some(ref main) = self.runtime {
                tracing::debug!(package = %self, "using config from 'runtime' field");
                main.clone()
            } else {
                tracing::debug!(package = %self, "using default runtime config");
                RuntimeConfig::default()
            }
        } else {
            let found = if name.is_empty() {
                tracing::debug!(package = %self, "using first config from 'runtimes' list");
                self.runtimes.first()
            } else {
                tracing::debug!(package = %self, runtime = name, "searching 'runtimes' list");
                self.runtimes.iter().find(|r| r.name == name)
            };
            let mut config = found
                .cloned()
                .ok_or_else(|| SelectError::RuntimeNotFound(name.to_string()))?;
            if let Some(ref main) = self.runtime {
                config.fill_gaps(main);
            }
            config
        };

        config.apply_defaults();
        Ok(config)
    }
}
