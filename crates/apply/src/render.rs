//! Dry-run rendering. Never touches the store.

use std::fmt;
use std::str::FromStr;

use rgo_core::{Error, Manifest, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "json" => Ok(OutputFormat::Json),
            other => Err(Error::Config(format!("unsupported output format: {} (expected yaml|json)", other))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { OutputFormat::Yaml => "yaml", OutputFormat::Json => "json" })
    }
}

/// YAML: a `---` separated multi-document stream. JSON: one compact document
/// per line. No manifests, no output.
pub fn render(manifests: &[Manifest], format: OutputFormat) -> Result<String> {
    let mut out = String::new();
    for m in manifests {
        match format {
            OutputFormat::Yaml => {
                let doc = serde_yaml::to_string(&m.document).map_err(|e| Error::Render(format!("{}: {}", m.object_ref(), e)))?;
                out.push_str("---\n");
                out.push_str(&doc);
            }
            OutputFormat::Json => {
                let doc = serde_json::to_string(&m.document).map_err(|e| Error::Render(format!("{}: {}", m.object_ref(), e)))?;
                out.push_str(&doc);
                out.push('\n');
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("yml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert!("toml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn empty_set_renders_nothing() {
        assert_eq!(render(&[], OutputFormat::Json).unwrap(), "");
        assert_eq!(render(&[], OutputFormat::Yaml).unwrap(), "");
    }
}
