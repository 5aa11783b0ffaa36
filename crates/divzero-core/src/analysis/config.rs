use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How much of memory the transfer function models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Registers only; loads and stores pass memory through unchanged.
    Basic,
    /// Loads and stores are resolved through the alias oracle.
    #[default]
    PointerAware,
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Basic => write!(f, "basic"),
            AnalysisMode::PointerAware => write!(f, "pointer"),
        }
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(AnalysisMode::Basic),
            "pointer" | "pointer_aware" | "pointer-aware" => Ok(AnalysisMode::PointerAware),
            other => Err(format!("unknown analysis mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub mode: AnalysisMode,
    /// Callees whose return value comes from outside the program.
    pub input_functions: Vec<String>,
    /// Cap on worklist pops per function. `None` means unbounded.
    pub max_iterations: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::default(),
            input_functions: ["getchar", "fgetc", "getc", "scanf", "read", "rand", "atoi"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_iterations: None,
        }
    }
}

impl AnalysisConfig {
    pub fn basic() -> Self {
        Self {
            mode: AnalysisMode::Basic,
            ..Self::default()
        }
    }

    pub fn pointer_aware() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_iterations(mut self, limit: usize) -> Self {
        self.max_iterations = Some(limit);
        self
    }

    pub fn is_input_function(&self, callee: &str) -> bool {
        let name = callee.trim_start_matches('@');
        self.input_functions.iter().any(|f| f == name)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.mode, AnalysisMode::PointerAware);
        assert!(config.is_input_function("getchar"));
        assert!(config.is_input_function("@rand"));
        assert!(!config.is_input_function("abs"));
        assert_eq!(config.max_iterations, None);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AnalysisConfig::from_json(r#"{ "mode": "basic" }"#).unwrap();
        assert_eq!(config.mode, AnalysisMode::Basic);
        assert_eq!(config.input_functions.len(), 7);

        let config =
            AnalysisConfig::from_json(r#"{ "input_functions": ["recv"], "max_iterations": 10 }"#)
                .unwrap();
        assert!(config.is_input_function("recv"));
        assert!(!config.is_input_function("getchar"));
        assert_eq!(config.max_iterations, Some(10));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("basic".parse::<AnalysisMode>(), Ok(AnalysisMode::Basic));
        assert_eq!(
            "pointer".parse::<AnalysisMode>(),
            Ok(AnalysisMode::PointerAware)
        );
        assert!("fast".parse::<AnalysisMode>().is_err());
        assert_eq!(AnalysisMode::PointerAware.to_string(), "pointer");
    }
}
