//! rgo configuration: the YAML model and its loader.
//!
//! ```yaml
//! projects:
//!   - name: demo-proj
//!     description: Demo project
//!     sourceRepos: ["https://github.com/zcubbs/hotpot"]
//!     destinations:
//!       - namespace: default
//!         server: https://kubernetes.default.svc
//! applications:
//!   - name: demo-app
//!     project: demo-proj
//!     sourceRepoURL: https://github.com/zcubbs/hotpot
//!     sourcePath: manifests/app
//!     destinationNamespace: default
//!     destinationServer: https://kubernetes.default.svc
//!     syncPolicy: automated
//! repositories:
//!   - url: https://github.com/zcubbs/go-k8s
//!     type: git
//!     name: demo-repo
//! credentials:
//!   - url: https://github.com
//!     username: ${GIT_USERNAME}
//!     password: ${GIT_PASSWORD}
//! ```

#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use rgo_core::{Error, Result};
use serde::Deserialize;
use tracing::info;

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
pub const DEFAULT_TARGET_REVISION: &str = "HEAD";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub projects: Vec<Project>,
    pub applications: Vec<Application>,
    pub repositories: Vec<Repository>,
    pub credentials: Vec<Credential>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub description: String,
    pub source_repos: Vec<String>,
    pub destinations: Vec<Destination>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Destination {
    pub namespace: String,
    pub server: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Application {
    pub name: String,
    pub project: String,
    pub destination_namespace: String,
    pub destination_server: String,
    #[serde(rename = "sourceRepoURL")]
    pub source_repo_url: String,
    pub source_path: String,
    pub target_revision: String,
    /// `automated` (any case) enables prune + self-heal; anything else is manual.
    pub sync_policy: String,
    pub is_helm: bool,
    #[serde(rename = "isOCI")]
    pub is_oci: bool,
    pub chart: Option<String>,
    pub chart_version: Option<String>,
    pub value_files: Vec<String>,
    /// Git repository holding values files for OCI charts.
    #[serde(rename = "valuesRepoURL")]
    pub values_repo_url: Option<String>,
}

impl Default for Application {
    fn default() -> Self {
        Self {
            name: String::new(),
            project: String::new(),
            destination_namespace: String::new(),
            destination_server: String::new(),
            source_repo_url: String::new(),
            source_path: String::new(),
            target_revision: DEFAULT_TARGET_REVISION.to_string(),
            sync_policy: String::new(),
            is_helm: false,
            is_oci: false,
            chart: None,
            chart_version: None,
            value_files: Vec::new(),
            values_repo_url: None,
        }
    }
}

impl Application {
    pub fn target_revision(&self) -> &str {
        if self.target_revision.is_empty() { DEFAULT_TARGET_REVISION } else { &self.target_revision }
    }

    pub fn is_automated(&self) -> bool { self.sync_policy.eq_ignore_ascii_case("automated") }

    /// Chart name, with a blank value counting as absent.
    pub fn chart_name(&self) -> Option<&str> {
        self.chart.as_deref().filter(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Repository {
    pub url: String,
    /// `git` (default), `helm` or `oci`.
    #[serde(rename = "type")]
    pub repo_type: String,
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssh_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Credential {
    pub url: String,
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssh_key: Option<String>,
}

impl Config {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(s).map_err(|e| Error::Config(format!("parsing config: {}", e)))
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty() && self.applications.is_empty() && self.repositories.is_empty() && self.credentials.is_empty()
    }

    pub fn object_count(&self) -> usize {
        self.projects.len() + self.repositories.len() + self.credentials.len() + self.applications.len()
    }

    /// Reject records that would produce an unusable document. Runs before any
    /// store interaction; all problems are reported together.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        for (i, p) in self.projects.iter().enumerate() {
            if p.name.trim().is_empty() {
                problems.push(format!("projects[{}]: name is required", i));
            }
        }
        for (i, r) in self.repositories.iter().enumerate() {
            if r.url.trim().is_empty() {
                problems.push(format!("repositories[{}]: url is required", i));
            }
        }
        for (i, c) in self.credentials.iter().enumerate() {
            if c.url.trim().is_empty() {
                problems.push(format!("credentials[{}]: url is required", i));
            }
        }
        for (i, a) in self.applications.iter().enumerate() {
            let at = if a.name.is_empty() { format!("applications[{}]", i) } else { format!("applications[{}] ({})", i, a.name) };
            if a.name.trim().is_empty() {
                problems.push(format!("{}: name is required", at));
            }
            if a.project.trim().is_empty() {
                problems.push(format!("{}: project is required", at));
            }
            if a.source_repo_url.trim().is_empty() {
                problems.push(format!("{}: sourceRepoURL is required", at));
            }
            if a.is_helm && a.is_oci {
                if a.chart_name().is_none() {
                    problems.push(format!("{}: chart is required for OCI helm sources", at));
                }
                if a.values_repo_url.as_deref().map_or(true, |u| u.trim().is_empty()) {
                    problems.push(format!("{}: valuesRepoURL is required for OCI helm sources", at));
                }
            } else if a.is_helm && a.chart_name().is_none() && a.source_path.trim().is_empty() {
                problems.push(format!("{}: helm sources need chart or sourcePath", at));
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(problems.join("; ")))
        }
    }
}

/// Where the configuration was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    File(PathBuf),
    Empty,
}

/// Load configuration. An explicit path must exist; otherwise `./config.yaml`
/// is used when present and an empty config when not.
pub fn load(explicit: Option<&Path>) -> Result<(Config, ConfigOrigin)> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let p = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !p.exists() {
                info!("no {} found; using empty config", DEFAULT_CONFIG_FILE);
                return Ok((Config::default(), ConfigOrigin::Empty));
            }
            p
        }
    };
    let text = std::fs::read_to_string(&path).map_err(|e| Error::Config(format!("reading {}: {}", path.display(), e)))?;
    let cfg = Config::from_yaml_str(&text)?;
    info!(path = %path.display(), objects = cfg.object_count(), "using config");
    Ok((cfg, ConfigOrigin::File(path)))
}

pub const DOTENV_FILE: &str = ".env";

/// Load `.env` from the working directory if present. Called before logging is
/// set up, so a malformed file is returned instead of logged.
pub fn load_dotenv() -> Result<()> {
    load_dotenv_from(Path::new(DOTENV_FILE))
}

fn load_dotenv_from(path: &Path) -> Result<()> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(()),
        Err(dotenvy::Error::Io(ref io)) if io.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Config(format!("{}: {}", path.display(), e))),
    }
}
