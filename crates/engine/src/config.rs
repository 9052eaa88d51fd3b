use serde::{Deserialize, Serialize};

/// Engine behavior switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
	/// Save the session once after a successful top-level run.
	#[serde(default = "default_true")]
	pub auto_commit: bool,
	/// Record a trace entry per executed step in the context.
	#[serde(default = "default_true")]
	pub trace: bool,
	/// Maximum depth of chains nested inside chains.
	#[serde(default = "default_max_nesting")]
	pub max_nesting: usize,
}

fn default_true() -> bool {
	true
}

/// Returns the default bound on nested chain depth.
fn default_max_nesting() -> usize {
	16
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			auto_commit: default_true(),
			trace: default_true(),
			max_nesting: default_max_nesting(),
		}
	}
}

impl EngineConfig {
	/// Parses a TOML document; missing keys take their defaults.
	pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
		toml::from_str(source)
	}
}
