//! Selectable completion models
//!
//! The relay does not talk to providers directly; the completion gateway
//! routes by model id. This table only drives the model picker and labels.

/// Model offered to users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelDef {
    /// Id sent to the completion gateway and stored in profiles
    pub id: &'static str,
    /// Button and status label
    pub label: &'static str,
}

/// Model for profiles that never chose one
pub const DEFAULT_MODEL_ID: &str = "gemini-3-pro";

const MODELS: &[ModelDef] = &[
    ModelDef {
        id: "gemini-3-pro",
        label: "🔷 Gemini 3 Pro",
    },
    ModelDef {
        id: "gpt-4o",
        label: "🟢 GPT-4o",
    },
    ModelDef {
        id: "claude-3.5-sonnet",
        label: "🟣 Claude 3.5 Sonnet",
    },
    ModelDef {
        id: "gpt-4-turbo",
        label: "🔵 GPT-4 Turbo",
    },
    ModelDef {
        id: "gemini-2-flash",
        label: "⚡ Gemini 2 Flash",
    },
];

/// Catalogue in picker order
pub fn all_models() -> &'static [ModelDef] {
    MODELS
}

pub fn find_model(id: &str) -> Option<&'static ModelDef> {
    MODELS.iter().find(|m| m.id == id)
}

/// Label for a stored model id. Ids no longer in the catalogue show as-is.
pub fn display_name(id: &str) -> &str {
    find_model(id).map_or(id, |m| m.label)
}
