use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Represents an Anthropic model identifier.
///
/// This can be a model from the built-in catalog or a custom string value
/// for models that are not listed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Model {
    /// Known model versions
    Known(KnownModel),

    /// Custom model identifier
    Custom(String),
}

/// Models offered by the chat client, in order of capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownModel {
    /// Claude Opus 4.1 (2025-08-05 version)
    ClaudeOpus41,

    /// Claude Opus 4
    ClaudeOpus4,

    /// Claude Sonnet 4
    ClaudeSonnet4,

    /// Claude 3 Opus (2024-02-29 version)
    Claude3Opus20240229,

    /// Claude 3.5 Sonnet (2024-10-22 version)
    Claude35Sonnet20241022,

    /// Claude 3 Sonnet (2024-02-29 version)
    Claude3Sonnet20240229,

    /// Claude 3 Haiku (2024-03-07 version)
    Claude3Haiku20240307,
}

impl KnownModel {
    /// Every known model, most capable first.
    pub const ALL: [KnownModel; 7] = [
        KnownModel::ClaudeOpus41,
        KnownModel::ClaudeOpus4,
        KnownModel::ClaudeSonnet4,
        KnownModel::Claude3Opus20240229,
        KnownModel::Claude35Sonnet20241022,
        KnownModel::Claude3Sonnet20240229,
        KnownModel::Claude3Haiku20240307,
    ];

    /// The identifier sent to the API.
    pub fn id(self) -> &'static str {
        match self {
            KnownModel::ClaudeOpus41 => "claude-opus-4-1-20250805",
            KnownModel::ClaudeOpus4 => "claude-opus-4-20250701",
            KnownModel::ClaudeSonnet4 => "claude-sonnet-4-20250701",
            KnownModel::Claude3Opus20240229 => "claude-3-opus-20240229",
            KnownModel::Claude35Sonnet20241022 => "claude-3-5-sonnet-20241022",
            KnownModel::Claude3Sonnet20240229 => "claude-3-sonnet-20240229",
            KnownModel::Claude3Haiku20240307 => "claude-3-haiku-20240307",
        }
    }

    /// Human-readable label.
    pub fn display_name(self) -> &'static str {
        match self {
            KnownModel::ClaudeOpus41 => "Claude Opus 4.1 (Most Advanced)",
            KnownModel::ClaudeOpus4 => "Claude Opus 4",
            KnownModel::ClaudeSonnet4 => "Claude Sonnet 4",
            KnownModel::Claude3Opus20240229 => "Claude 3 Opus",
            KnownModel::Claude35Sonnet20241022 => "Claude 3.5 Sonnet",
            KnownModel::Claude3Sonnet20240229 => "Claude 3 Sonnet",
            KnownModel::Claude3Haiku20240307 => "Claude 3 Haiku (Fastest)",
        }
    }

    /// Maximum number of output tokens the model will produce.
    pub fn max_output_tokens(self) -> u32 {
        match self {
            KnownModel::ClaudeOpus41 | KnownModel::ClaudeOpus4 => 32_000,
            KnownModel::ClaudeSonnet4 => 64_000,
            KnownModel::Claude35Sonnet20241022 => 8_192,
            KnownModel::Claude3Opus20240229
            | KnownModel::Claude3Sonnet20240229
            | KnownModel::Claude3Haiku20240307 => 4_096,
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Model::Known(known_model) => write!(f, "{}", known_model),
            Model::Custom(custom) => write!(f, "{}", custom),
        }
    }
}

impl fmt::Display for KnownModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for KnownModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KnownModel::ALL
            .into_iter()
            .find(|model| model.id() == s)
            .ok_or_else(|| format!("unknown model: {s}"))
    }
}

impl FromStr for Model {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Model::from(s))
    }
}

impl Serialize for Model {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Model::from(s.as_str()))
    }
}

impl From<KnownModel> for Model {
    fn from(model: KnownModel) -> Self {
        Model::Known(model)
    }
}

impl From<String> for Model {
    fn from(model: String) -> Self {
        Model::from(model.as_str())
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        match model.parse::<KnownModel>() {
            Ok(known) => Model::Known(known),
            Err(_) => Model::Custom(model.to_string()),
        }
    }
}

/// Catalog entry describing one selectable model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    /// The model identifier.
    pub model: Model,
    /// Human-readable label.
    pub display_name: String,
    /// Ceiling on `max_tokens` for this model.
    pub max_output_tokens: u32,
}

impl ModelInfo {
    /// Create a new catalog entry.
    pub fn new(
        model: impl Into<Model>,
        display_name: impl Into<String>,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            display_name: display_name.into(),
            max_output_tokens,
        }
    }
}

impl From<KnownModel> for ModelInfo {
    fn from(model: KnownModel) -> Self {
        Self::new(model, model.display_name(), model.max_output_tokens())
    }
}

/// Static mapping from model identifier to label and output-token ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    entries: Vec<ModelInfo>,
}

impl ModelCatalog {
    /// Create a catalog from explicit entries.
    pub fn new(entries: Vec<ModelInfo>) -> Self {
        Self { entries }
    }

    /// The catalog of every [`KnownModel`], most capable first.
    pub fn builtin() -> Self {
        Self::new(KnownModel::ALL.into_iter().map(ModelInfo::from).collect())
    }

    /// Add or replace an entry.
    pub fn with_model(mut self, info: ModelInfo) -> Self {
        match self.entries.iter_mut().find(|e| e.model == info.model) {
            Some(existing) => *existing = info,
            None => self.entries.push(info),
        }
        self
    }

    /// Look up a model.
    pub fn get(&self, model: &Model) -> Option<&ModelInfo> {
        self.entries.iter().find(|e| &e.model == model)
    }

    /// The first (most capable) entry, if any.
    pub fn default_model(&self) -> Option<&ModelInfo> {
        self.entries.first()
    }

    /// All entries in catalog order.
    pub fn entries(&self) -> &[ModelInfo] {
        &self.entries
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_serialization() {
        let model = Model::Known(KnownModel::Claude3Haiku20240307);
        let json = serde_json::to_string(&model).unwrap();
        assert_eq!(json, r#""claude-3-haiku-20240307""#);
    }

    #[test]
    fn custom_model_round_trip() {
        let model: Model = serde_json::from_str(r#""claude-next""#).unwrap();
        assert_eq!(model, Model::Custom("claude-next".to_string()));
        assert_eq!(serde_json::to_string(&model).unwrap(), r#""claude-next""#);
    }

    #[test]
    fn parse_prefers_known() {
        let model: Model = "claude-opus-4-1-20250805".into();
        assert_eq!(model, Model::Known(KnownModel::ClaudeOpus41));
    }

    #[test]
    fn builtin_catalog_order_and_ceilings() {
        let catalog = ModelCatalog::builtin();
        assert_eq!(catalog.entries().len(), 7);
        let first = catalog.default_model().unwrap();
        assert_eq!(first.model, Model::Known(KnownModel::ClaudeOpus41));
        assert_eq!(first.display_name, "Claude Opus 4.1 (Most Advanced)");

        let haiku = catalog
            .get(&Model::Known(KnownModel::Claude3Haiku20240307))
            .unwrap();
        assert_eq!(haiku.max_output_tokens, 4096);
        assert!(catalog.get(&Model::Custom("gpt".to_string())).is_none());
    }

    #[test]
    fn with_model_replaces_existing() {
        let catalog = ModelCatalog::builtin()
            .with_model(ModelInfo::new(KnownModel::Claude3Haiku20240307, "Haiku", 100))
            .with_model(ModelInfo::new("local-model", "Local", 512));
        assert_eq!(catalog.entries().len(), 8);
        assert_eq!(
            catalog
                .get(&KnownModel::Claude3Haiku20240307.into())
                .unwrap()
                .max_output_tokens,
            100
        );
        assert_eq!(catalog.get(&"local-model".into()).unwrap().display_name, "Local");
    }
}
