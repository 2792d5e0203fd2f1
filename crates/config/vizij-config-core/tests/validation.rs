use serde::{Deserialize, Serialize};
use serde_json::json;
use vizij_config_core::featuregate::Registry;
use vizij_config_core::{
    validate_fields, Decoder, DecoderConfig, Error, Optional, Unmarshal, Validate,
    ValidationError,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Listener {
    port: u16,
}

impl Validate for Listener {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::new("port must be non-zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Notes {
    text: String,
}

impl Validate for Notes {}

#[test]
fn none_and_default_are_never_validated() {
    assert!(Optional::<Listener>::none().validate().is_ok());
    assert!(Optional::with_default(Listener { port: 0 }).validate().is_ok());
}

#[test]
fn some_surfaces_element_result_unchanged() {
    assert!(Optional::some(Listener { port: 80 }).validate().is_ok());

    let invalid = Listener { port: 0 };
    let expected = invalid.validate().unwrap_err();
    let err = Optional::some(invalid).validate().unwrap_err();
    assert_eq!(err, expected);
    assert_eq!(err.message(), "port must be non-zero");
}

#[test]
fn elements_without_checks_pass() {
    assert!(Optional::some(Notes::default()).validate().is_ok());
}

#[test]
fn decoded_default_becomes_subject_to_validation() {
    let gates = Registry::new();
    let decoder = Decoder::new(DecoderConfig::default(), &gates);
    let mut opt = Optional::with_default(Listener { port: 0 });
    assert!(opt.validate().is_ok());

    opt.unmarshal(json!({}), &decoder).unwrap();
    assert!(opt.validate().is_err());

    opt.unmarshal(json!({ "port": 8080 }), &decoder).unwrap();
    assert!(opt.validate().is_ok());
}

#[test]
fn sibling_failures_are_aggregated() {
    let public = Optional::some(Listener { port: 0 });
    let admin = Optional::with_default(Listener { port: 0 });
    let metrics = Optional::some(Listener { port: 0 });
    let notes = Optional::some(Notes::default());

    let errors = validate_fields([
        ("public", &public as &dyn Validate),
        ("admin", &admin as &dyn Validate),
        ("metrics", &metrics as &dyn Validate),
        ("notes", &notes as &dyn Validate),
    ])
    .unwrap_err();
    let paths: Vec<&str> = errors.iter().map(|(path, _)| path).collect();
    assert_eq!(paths, vec!["public", "metrics"]);
}

#[test]
fn validation_error_converts_into_crate_error() {
    let err: Error = ValidationError::new("bad").into();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(err.to_string(), "bad");
}
