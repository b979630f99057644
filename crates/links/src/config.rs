use serde::{Deserialize, Serialize};

pub const DEFAULT_WEBSITE_HOSTS: [&str; 2] = ["osu.ppy.sh", "dev.ppy.sh"];
pub const DEFAULT_PROTOCOL_SCHEME: &str = "osu";
pub const DEFAULT_MULTIPLAYER_SCHEME: &str = "osump";
pub const DEFAULT_EXTERNAL_SCHEMES: [&str; 2] = ["http", "https"];

/// Knobs that decide which URLs are recognised and what they map to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Hosts whose paths map onto in-app actions (beatmaps, users, wiki).
    #[serde(default = "default_website_hosts")]
    pub website_hosts: Vec<String>,
    /// The application's own URL scheme, without `://`.
    #[serde(default = "default_protocol_scheme")]
    pub protocol_scheme: String,
    #[serde(default = "default_multiplayer_scheme")]
    pub multiplayer_scheme: String,
    /// Schemes a bare URL may start with.
    #[serde(default = "default_external_schemes")]
    pub external_schemes: Vec<String>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            website_hosts: default_website_hosts(),
            protocol_scheme: default_protocol_scheme(),
            multiplayer_scheme: default_multiplayer_scheme(),
            external_schemes: default_external_schemes(),
        }
    }
}

impl LinkConfig {
    /// Trims and lowercases every entry, restoring defaults for blank fields.
    pub fn normalized(mut self) -> Self {
        self.website_hosts = normalize_list(self.website_hosts);
        if self.website_hosts.is_empty() {
            self.website_hosts = default_website_hosts();
        }

        self.protocol_scheme = normalize_scheme(&self.protocol_scheme);
        if self.protocol_scheme.is_empty() {
            self.protocol_scheme = default_protocol_scheme();
        }

        self.multiplayer_scheme = normalize_scheme(&self.multiplayer_scheme);
        if self.multiplayer_scheme.is_empty() {
            self.multiplayer_scheme = default_multiplayer_scheme();
        }

        self.external_schemes = self
            .external_schemes
            .iter()
            .map(|scheme| normalize_scheme(scheme))
            .filter(|scheme| !scheme.is_empty())
            .collect();
        if self.external_schemes.is_empty() {
            self.external_schemes = default_external_schemes();
        }

        self
    }

    /// Schemes owned by the application itself.
    pub fn internal_schemes(&self) -> [&str; 2] {
        [
            self.protocol_scheme.as_str(),
            self.multiplayer_scheme.as_str(),
        ]
    }

    pub fn is_website_host(&self, host: &str) -> bool {
        let host = host.split(':').next().unwrap_or(host).to_ascii_lowercase();
        self.website_hosts
            .iter()
            .any(|website| host.ends_with(website.as_str()))
    }
}

fn normalize_scheme(scheme: &str) -> String {
    scheme
        .trim()
        .trim_end_matches("://")
        .trim_end_matches(':')
        .to_ascii_lowercase()
}

fn normalize_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .collect()
}

fn default_website_hosts() -> Vec<String> {
    DEFAULT_WEBSITE_HOSTS.iter().map(|host| host.to_string()).collect()
}

fn default_protocol_scheme() -> String {
    DEFAULT_PROTOCOL_SCHEME.to_string()
}

fn default_multiplayer_scheme() -> String {
    DEFAULT_MULTIPLAYER_SCHEME.to_string()
}

fn default_external_schemes() -> Vec<String> {
    DEFAULT_EXTERNAL_SCHEMES
        .iter()
        .map(|scheme| scheme.to_string())
        .collect()
}
