// Reserved vocabulary shared by the decoder and the feature-gate registry.

/// Key that explicitly enables or disables an optional section.
/// Element types must not declare a field with this name.
pub const ENABLED_FIELD: &str = "enabled";

/// Feature gate that turns [`ENABLED_FIELD`] into a control key.
pub const ENABLED_FIELD_GATE: &str = "config.optional.enabledField";
pub const ENABLED_FIELD_GATE_DESCRIPTION: &str =
    "Allows an 'enabled' key to toggle optional configuration sections";
