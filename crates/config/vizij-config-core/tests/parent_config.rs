use anyhow::Result;
use serde::de::DeserializeSeed;
use serde::{Deserialize, Serialize};
use serde_json::json;
use vizij_config_core::featuregate::Registry;
use vizij_config_core::{Decoder, DecoderConfig, Error, Flavor, Optional, ENABLED_FIELD_GATE};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Tls {
    cert: String,
    key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Proxy {
    url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Service {
    name: String,
    tls: Optional<Tls>,
    proxy: Optional<Proxy>,
}

fn default_service() -> Service {
    Service {
        name: "svc".to_string(),
        tls: Optional::with_default(Tls {
            cert: "default.pem".to_string(),
            key: "default.key".to_string(),
        }),
        proxy: Optional::none(),
    }
}

fn gated() -> Registry {
    let gates = Registry::with_builtin_gates();
    gates
        .set(ENABLED_FIELD_GATE, true)
        .expect("builtin gate is alpha");
    gates
}

#[test]
fn derived_parent_decodes_present_missing_and_null() -> Result<()> {
    let svc: Service = serde_json::from_value(json!({
        "name": "api",
        "tls": { "cert": "api.pem" },
        "proxy": null
    }))?;
    assert_eq!(
        svc.tls,
        Optional::Some(Tls {
            cert: "api.pem".to_string(),
            key: String::new(),
        })
    );
    assert_eq!(svc.proxy, Optional::None);

    let svc: Service = serde_json::from_str(r#"{ "name": "api" }"#)?;
    assert_eq!(svc.tls.flavor(), Flavor::None);
    assert_eq!(svc.proxy.flavor(), Flavor::None);
    Ok(())
}

#[test]
fn parent_overlay_merges_into_defaults() -> Result<()> {
    let mut svc = default_service();
    Decoder::global().decode_into(
        json!({ "tls": { "cert": "api.pem" }, "proxy": { "url": "http://proxy" } }),
        &mut svc,
    )?;
    assert_eq!(
        svc.tls,
        Optional::Some(Tls {
            cert: "api.pem".to_string(),
            key: "default.key".to_string(),
        })
    );
    assert_eq!(
        svc.proxy,
        Optional::Some(Proxy {
            url: "http://proxy".to_string(),
        })
    );
    assert_eq!(svc.name, "svc");
    Ok(())
}

#[test]
fn parent_overlay_null_clears_default() -> Result<()> {
    let mut svc = default_service();
    Decoder::global().decode_into(json!({ "tls": null }), &mut svc)?;
    assert_eq!(svc.tls, Optional::None);
    Ok(())
}

#[test]
fn parent_overlay_without_section_keeps_default_values() -> Result<()> {
    let mut svc = default_service();
    Decoder::global().decode_into(json!({ "name": "other" }), &mut svc)?;
    assert_eq!(svc.name, "other");
    assert_eq!(svc.tls.get(), default_service().tls.get());
    assert_eq!(svc.proxy, Optional::None);
    Ok(())
}

#[test]
fn parent_decode_applies_callers_gate_to_sections() -> Result<()> {
    let gates = gated();
    let decoder = Decoder::new(DecoderConfig::default(), &gates);

    let mut svc = default_service();
    decoder.decode_into(
        json!({ "tls": { "enabled": false, "cert": "c" } }),
        &mut svc,
    )?;
    assert_eq!(svc.tls, Optional::None);

    let mut svc = default_service();
    decoder.decode_into(
        json!({ "tls": { "enabled": true, "key": "k" }, "proxy": { "enabled": true } }),
        &mut svc,
    )?;
    assert_eq!(
        svc.tls,
        Optional::Some(Tls {
            cert: "default.pem".to_string(),
            key: "k".to_string(),
        })
    );
    assert_eq!(svc.proxy, Optional::Some(Proxy::default()));
    Ok(())
}

#[test]
fn active_gate_does_not_outlive_the_parent_decode() -> Result<()> {
    let gates = gated();
    let decoder = Decoder::new(DecoderConfig::default(), &gates);
    let mut svc = default_service();
    decoder.decode_into(json!({ "tls": { "enabled": false } }), &mut svc)?;
    assert!(svc.tls.is_none());

    // Top-level serde decode falls back to the global registry, gate off.
    let svc: Service = serde_json::from_value(json!({
        "name": "api",
        "tls": { "enabled": false, "cert": "c" }
    }))?;
    assert_eq!(svc.tls.get().map(|tls| tls.cert.as_str()), Some("c"));
    Ok(())
}

#[test]
fn parent_decode_applies_callers_key_policy_to_sections() -> Result<()> {
    let gates = Registry::with_builtin_gates();
    let strict = Decoder::new(
        DecoderConfig {
            deny_unknown_keys: true,
        },
        &gates,
    );

    let mut svc = default_service();
    let err = strict
        .decode_into(json!({ "tls": { "cret": "typo" } }), &mut svc)
        .unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "got {err}");
    assert!(err.to_string().contains("unknown key 'cret'"), "got {err}");

    let mut svc = default_service();
    strict.decode_into(json!({ "tls": { "cert": "api.pem" } }), &mut svc)?;
    assert_eq!(svc.tls.get().map(|tls| tls.cert.as_str()), Some("api.pem"));
    Ok(())
}

#[test]
fn seed_decodes_in_place() -> Result<()> {
    let mut tls = Optional::with_default(Tls {
        cert: "default.pem".to_string(),
        key: "default.key".to_string(),
    });
    let mut de = serde_json::Deserializer::from_str(r#"{ "key": "api.key" }"#);
    DeserializeSeed::deserialize(&mut tls, &mut de)?;
    assert_eq!(
        tls,
        Optional::Some(Tls {
            cert: "default.pem".to_string(),
            key: "api.key".to_string(),
        })
    );

    DeserializeSeed::deserialize(&mut tls, json!(null))?;
    assert!(tls.is_none());
    Ok(())
}

#[test]
fn seed_surfaces_contract_violations_as_serde_errors() {
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Toggle {
        enabled: bool,
    }

    let mut opt = Optional::<Toggle>::none();
    let err = DeserializeSeed::deserialize(&mut opt, json!({})).unwrap_err();
    assert!(err.to_string().contains("unsupported element kind"));

    let err = serde_json::from_value::<Optional<u8>>(json!(3)).unwrap_err();
    assert!(err.to_string().contains("expected a struct"));
}

#[test]
fn serializes_as_bare_element() -> Result<()> {
    let svc = default_service();
    assert_eq!(
        serde_json::to_value(&svc)?,
        json!({
            "name": "svc",
            "tls": { "cert": "default.pem", "key": "default.key" },
            "proxy": null
        })
    );
    Ok(())
}
