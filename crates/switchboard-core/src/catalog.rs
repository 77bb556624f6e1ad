use serde::{Deserialize, Serialize};

use crate::error::{Result, SwitchboardError};
use crate::schema::ParameterSchema;

// ---------------------------------------------------------------------------
// ActionDefinition
// ---------------------------------------------------------------------------

/// Static description of one action. Never mutated after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: ParameterSchema,
}

impl ActionDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ParameterSchema::default(),
        }
    }

    pub fn with_parameters(mut self, parameters: ParameterSchema) -> Self {
        self.parameters = parameters;
        self
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// The ordered, read-only set of known actions.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    definitions: Vec<ActionDefinition>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate or malformed names and schemas.
    pub fn new(definitions: Vec<ActionDefinition>) -> Result<Self> {
        for (i, def) in definitions.iter().enumerate() {
            validate_action_name(&def.name)?;
            if definitions[..i].iter().any(|d| d.name == def.name) {
                return Err(SwitchboardError::InvalidCatalog(format!(
                    "duplicate action name '{}'",
                    def.name
                )));
            }
            def.parameters.check().map_err(|e| {
                SwitchboardError::InvalidCatalog(format!("action '{}': {e}", def.name))
            })?;
        }
        Ok(Self { definitions })
    }

    /// All definitions in catalog order.
    pub fn list_definitions(&self) -> &[ActionDefinition] {
        &self.definitions
    }

    pub fn find(&self, name: &str) -> Option<&ActionDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Action names appear in URL paths and store keys: letters, digits, `-`, `_`.
pub fn validate_action_name(name: &str) -> Result<()> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(SwitchboardError::InvalidCatalog(format!(
            "invalid action name '{name}': must contain only letters, digits, hyphens, and underscores"
        )));
    }
    Ok(())
}
