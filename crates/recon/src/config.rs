use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    pub directory: DirectorySource,
    pub batch: BatchSource,
    #[serde(default)]
    pub locations: Option<LocationsSource>,
    #[serde(default)]
    pub matching: MatchConfig,
    #[serde(default)]
    pub alternatives: AlternativesConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl ReconConfig {
    /// Config for library callers that hand the engine records directly.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directory: DirectorySource::default(),
            batch: BatchSource::default(),
            locations: None,
            matching: MatchConfig::default(),
            alternatives: AlternativesConfig::default(),
            engine: EngineConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Where the panel directory comes from: a CSV file or a store file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectorySource {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub columns: DirectoryColumns,
}

/// The single location a [`DirectorySource`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryLocation<'a> {
    File(&'a str),
    Store(&'a str),
}

impl DirectorySource {
    /// Errors unless exactly one of `file` and `store` is set.
    pub fn location(&self) -> Result<DirectoryLocation<'_>, ReconError> {
        match (self.file.as_deref(), self.store.as_deref()) {
            (Some(file), None) => Ok(DirectoryLocation::File(file)),
            (None, Some(store)) => Ok(DirectoryLocation::Store(store)),
            (Some(_), Some(_)) => Err(ReconError::ConfigValidation(
                "directory: set either 'file' or 'store', not both".into(),
            )),
            (None, None) => Err(ReconError::ConfigValidation(
                "directory: one of 'file' or 'store' is required".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectoryColumns {
    pub code: String,
    pub name: String,
    pub address: String,
    pub contact: String,
    pub panel_status: String,
}

impl Default for DirectoryColumns {
    fn default() -> Self {
        Self {
            code: "code".into(),
            name: "name".into(),
            address: "address".into(),
            contact: "contact".into(),
            panel_status: "panel_status".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchSource {
    #[serde(default)]
    pub file: String,
    /// Tag stamped on every row; defaults to the file name.
    #[serde(default)]
    pub source_file: Option<String>,
    #[serde(default)]
    pub columns: BatchColumns,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchColumns {
    pub source_id: String,
    pub name: String,
    pub address: String,
    pub contact: String,
}

impl Default for BatchColumns {
    fn default() -> Self {
        Self {
            source_id: "source_id".into(),
            name: "name".into(),
            address: "address".into(),
            contact: "contact".into(),
        }
    }
}

/// Address → coordinate table consumed by the distance collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationsSource {
    pub file: String,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum fuzzy confidence (0–100) for acceptance.
    pub accept_threshold: f64,
    /// Leading characters two addresses must share to become candidates.
    pub address_prefix_len: usize,
    /// Jaro-Winkler similarity at which two name tokens count as the same.
    pub token_similarity: f64,
    pub weights: ScoreWeights,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            accept_threshold: 70.0,
            address_prefix_len: 5,
            token_similarity: 0.9,
            weights: ScoreWeights::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub name: f64,
    pub address: f64,
    pub contact: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            name: 0.5,
            address: 0.3,
            contact: 0.2,
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.name + self.address + self.contact
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlternativesConfig {
    pub radius_km: f64,
    pub max_alternatives: usize,
}

impl Default for AlternativesConfig {
    fn default() -> Self {
        Self {
            radius_km: 10.0,
            max_alternatives: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads for a run; 0 = one per CPU.
    pub workers: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        self.directory.location()?;

        if self.batch.file.trim().is_empty() {
            return Err(ReconError::ConfigValidation("batch: 'file' is required".into()));
        }

        self.matching.validate()?;
        self.alternatives.validate()?;
        Ok(())
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<(), ReconError> {
        if !(0.0..=100.0).contains(&self.accept_threshold) {
            return Err(ReconError::ConfigValidation(format!(
                "matching.accept_threshold must be within 0..=100, got {}",
                self.accept_threshold
            )));
        }
        if self.address_prefix_len == 0 {
            return Err(ReconError::ConfigValidation(
                "matching.address_prefix_len must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.token_similarity) {
            return Err(ReconError::ConfigValidation(format!(
                "matching.token_similarity must be within 0..=1, got {}",
                self.token_similarity
            )));
        }

        let w = &self.weights;
        for (label, value) in [("name", w.name), ("address", w.address), ("contact", w.contact)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ReconError::ConfigValidation(format!(
                    "matching.weights.{label} must be a non-negative number, got {value}"
                )));
            }
        }
        if w.total() <= 0.0 {
            return Err(ReconError::ConfigValidation(
                "matching.weights must not all be zero".into(),
            ));
        }
        Ok(())
    }
}

impl AlternativesConfig {
    pub fn validate(&self) -> Result<(), ReconError> {
        if !self.radius_km.is_finite() || self.radius_km < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "alternatives.radius_km must be a non-negative number, got {}",
                self.radius_km
            )));
        }
        if self.max_alternatives == 0 {
            return Err(ReconError::ConfigValidation(
                "alternatives.max_alternatives must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
