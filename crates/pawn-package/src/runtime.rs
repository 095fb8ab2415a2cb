//! Runtime profiles: how a package's server should be configured and run.

use crate::build::fill;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Server version used when a runtime profile does not request one.
pub const DEFAULT_RUNTIME_VERSION: &str = "0.3.7";

/// Default RCON password.
pub const DEFAULT_RCON_PASSWORD: &str = "password";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8192;

/// Default server hostname.
pub const DEFAULT_HOSTNAME: &str = "SA-MP Server";

/// Default player slot count.
pub const DEFAULT_MAX_PLAYERS: u32 = 50;

/// How the server process is run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeMode {
    /// Run as a normal server until stopped.
    #[default]
    Server,
    /// Run only the `main()` entry point then exit.
    Main,
    /// Run until the RCON interface is ready then exit.
    RconOnly,
    /// Run the package's tests then exit.
    YTesting,
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Server => "server",
            Self::Main => "main",
            Self::RconOnly => "rcon_only",
            Self::YTesting => "y_testing",
        };
        f.write_str(s)
    }
}

/// A named runtime profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Profile name, used to select it from the `runtimes` list.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Server version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Target platform, defaults to the host OS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<RuntimeMode>,

    /// Link the runtime into the package directory instead of copying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_link: Option<bool>,

    /// Message printed when the server starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub echo: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamemodes: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filterscripts: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rcon_password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_players: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapname: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weburl: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamemodetext: Option<String>,

    /// Any other `server.cfg` settings, passed through verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<BTreeMap<String, String>>,
}

impl RuntimeConfig {
    /// Copy every field of `src` into `self` where `self` leaves it unset.
    pub fn fill_gaps(&mut self, src: &Self) {
        if self.name.is_empty() {
            self.name.clone_from(&src.name);
        }
        fill(&mut self.version, &src.version);
        fill(&mut self.platform, &src.platform);
        fill(&mut self.mode, &src.mode);
        fill(&mut self.root_link, &src.root_link);
        fill(&mut self.echo, &src.echo);
        fill(&mut self.gamemodes, &src.gamemodes);
        fill(&mut self.filterscripts, &src.filterscripts);
        fill(&mut self.plugins, &src.plugins);
        fill(&mut self.rcon_password, &src.rcon_password);
        fill(&mut self.port, &src.port);
        fill(&mut self.hostname, &src.hostname);
        fill(&mut self.max_players, &src.max_players);
        fill(&mut self.language, &src.language);
        fill(&mut self.mapname, &src.mapname);
        fill(&mut self.weburl, &src.weburl);
        fill(&mut self.gamemodetext, &src.gamemodetext);
        fill(&mut self.extra, &src.extra);
    }

    /// Fill any field that is still unset with the runtime defaults.
    pub fn apply_defaults(&mut self) {
        self.version
            .get_or_insert_with(|| DEFAULT_RUNTIME_VERSION.to_string());
        self.platform
            .get_or_insert_with(|| std::env::consts::OS.to_string());
        self.mode.get_or_insert(RuntimeMode::Server);
        self.rcon_password
            .get_or_insert_with(|| DEFAULT_RCON_PASSWORD.to_string());
        self.port.get_or_insert(DEFAULT_PORT);
        self.hostname
            .get_or_insert_with(|| DEFAULT_HOSTNAME.to_string());
        self.max_players.get_or_insert(DEFAULT_MAX_PLAYERS);
    }
}
