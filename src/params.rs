//! Parameter selection and per-parameter option parsing.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{MovieError, Result};

/// A parameter to plot, given on the command line as `NAME[:LABEL]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    pub label: String,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
        }
    }
}

impl FromStr for ParameterSpec {
    type Err = MovieError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, label) = match s.split_once(':') {
            Some((name, label)) => (name.trim(), label.trim()),
            None => (s.trim(), s.trim()),
        };
        if name.is_empty() {
            return Err(MovieError::config(format!("empty parameter name in '{s}'")));
        }
        Ok(Self {
            name: name.to_string(),
            label: if label.is_empty() { name } else { label }.to_string(),
        })
    }
}

/// Parses `NAME:VALUE` pairs such as `--mins mass:1.5 spin:-1` into a map.
pub fn parse_bounds(entries: &[String]) -> Result<HashMap<String, f64>> {
    entries
        .iter()
        .map(|entry| {
            let (name, value) = entry.split_once(':').ok_or_else(|| {
                MovieError::config(format!("expected NAME:VALUE, got '{entry}'"))
            })?;
            let value: f64 = value.trim().parse().map_err(|e| {
                MovieError::config(format!("invalid bound in '{entry}': {e}"))
            })?;
            Ok((name.trim().to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_parameter_with_label() {
        let p: ParameterSpec = "mchirp:$\\mathcal{M}$".parse().unwrap();
        assert_eq!(p.name, "mchirp");
        assert_eq!(p.label, "$\\mathcal{M}$");
    }

    #[test]
    fn test_parse_parameter_without_label() {
        let p: ParameterSpec = "q".parse().unwrap();
        assert_eq!(p, ParameterSpec::new("q"));
        let p: ParameterSpec = "q:".parse().unwrap();
        assert_eq!(p.label, "q");
        assert!(":label".parse::<ParameterSpec>().is_err());
    }

    #[test]
    fn test_parse_bounds() {
        let bounds = parse_bounds(&["x:1.5".to_string(), "y: -2".to_string()]).unwrap();
        assert_eq!(bounds["x"], 1.5);
        assert_eq!(bounds["y"], -2.0);
        assert!(parse_bounds(&["x".to_string()]).unwrap_err().is_config());
        assert!(parse_bounds(&["x:abc".to_string()]).is_err());
    }
}
