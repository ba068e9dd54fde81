use std::time::Duration;

use shared::domain::IdentifierField;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_PROVIDER: &str = "CHATGPT";
pub const DEFAULT_RESET_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    pub model: String,
    pub provider: String,
    pub identifier_field: IdentifierField,
    /// Wait before an automatic return to setup after an auth failure.
    pub reset_delay: Duration,
    pub show_loading_indicator: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            provider: DEFAULT_PROVIDER.into(),
            identifier_field: IdentifierField::default(),
            reset_delay: DEFAULT_RESET_DELAY,
            show_loading_indicator: true,
        }
    }
}
