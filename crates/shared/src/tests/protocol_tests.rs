use super::*;
use serde_json::json;

#[test]
fn new_form_starts_with_every_field_empty() {
    for variant in [FormVariant::Basic, FormVariant::Extended] {
        let form = FormState::new(variant);
        assert!(form.iter().all(|(_, value)| value.is_empty()));
    }
    assert_eq!(FormState::new(FormVariant::Basic).iter().count(), 4);
    assert_eq!(FormState::new(FormVariant::Extended).iter().count(), 8);
}

#[test]
fn set_replaces_one_field_and_leaves_the_rest() {
    let mut form = FormState::new(FormVariant::Basic);
    form.set("device_name", "GlucoTrack X1").expect("set");
    form.set("intended_use", "first").expect("set");
    form.set("intended_use", "second").expect("set");

    assert_eq!(form.get("device_name"), Some("GlucoTrack X1"));
    assert_eq!(form.get("intended_use"), Some("second"));
    assert_eq!(form.get("device_category"), Some(""));
    assert_eq!(form.get("safety_features"), Some(""));
}

#[test]
fn set_rejects_fields_outside_the_schema() {
    let mut form = FormState::new(FormVariant::Basic);
    let err = form.set("manufacturer", "Acme").expect_err("basic has no manufacturer");
    assert_eq!(err, FormError::UnknownField("manufacturer".to_string()));
    assert!(form.iter().all(|(_, value)| value.is_empty()));
}

#[test]
fn reset_empties_every_field() {
    let mut form = FormState::new(FormVariant::Extended);
    form.set("manufacturer", "Acme").expect("set");
    form.set("risk_class", "High").expect("set");
    form.reset();
    assert!(form.iter().all(|(_, value)| value.is_empty()));
}

#[test]
fn missing_required_lists_blank_fields_in_schema_order() {
    let mut form = FormState::new(FormVariant::Basic);
    form.set("device_category", "Monitoring").expect("set");
    form.set("intended_use", "   ").expect("set");
    assert_eq!(
        form.missing_required(),
        vec!["device_name", "safety_features", "intended_use"]
    );
}

#[test]
fn split_multi_value_trims_and_drops_empty_tokens() {
    assert_eq!(split_multi_value("a, b ,c"), vec!["a", "b", "c"]);
    assert!(split_multi_value(" , ,").is_empty());
    assert!(split_multi_value("").is_empty());
}

#[test]
fn basic_payload_splits_safety_features_only() {
    let mut form = FormState::new(FormVariant::Basic);
    form.set("device_name", "GlucoTrack X1").expect("set");
    form.set("device_category", "Glucose, Monitoring").expect("set");
    form.set("safety_features", "Auto-shutdown, Data encryption,").expect("set");
    form.set("intended_use", "Home use").expect("set");

    let payload = form.to_payload();
    assert_eq!(
        payload.get("safety_features"),
        Some(&PayloadValue::List(vec![
            "Auto-shutdown".to_string(),
            "Data encryption".to_string()
        ]))
    );
    assert_eq!(
        payload.get("device_category"),
        Some(&PayloadValue::Text("Glucose, Monitoring".to_string()))
    );

    let body = serde_json::to_string(&payload).expect("json");
    assert_eq!(
        body,
        r#"{"device_name":"GlucoTrack X1","device_category":"Glucose, Monitoring","safety_features":["Auto-shutdown","Data encryption"],"intended_use":"Home use"}"#
    );
}

#[test]
fn extended_payload_is_flat_and_in_schema_order() {
    let mut form = FormState::new(FormVariant::Extended);
    form.set("classification", "Class II").expect("set");

    let payload = form.to_payload();
    let keys: Vec<&str> = payload.keys().collect();
    assert_eq!(
        keys,
        vec![
            "device_name",
            "manufacturer",
            "model_number",
            "classification",
            "intended_use",
            "indications_for_use",
            "target_population",
            "risk_class",
        ]
    );
    assert!(payload
        .entries()
        .iter()
        .all(|(_, value)| matches!(value, PayloadValue::Text(_))));
}

#[test]
fn parses_simple_report_into_section() {
    let node = ReportNode::from_slice(br#"{"summary":"ok"}"#).expect("parse");
    assert_eq!(
        node,
        ReportNode::Section(vec![(
            "summary".to_string(),
            ReportNode::Leaf("ok".to_string())
        )])
    );
}

#[test]
fn section_keeps_response_key_order() {
    let node = ReportNode::from_slice(br#"{"zeta":"1","alpha":["a"],"mid":{"x":"y"}}"#)
        .expect("parse");
    let ReportNode::Section(entries) = node else {
        panic!("expected section");
    };
    let keys: Vec<&str> = entries.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn scalars_become_other_but_keep_their_key() {
    let node = ReportNode::from_value(&json!({"score": 3, "flag": true, "gap": null}))
        .expect("parse");
    assert_eq!(node.get("score"), Some(&ReportNode::Other));
    assert_eq!(node.get("flag"), Some(&ReportNode::Other));
    assert_eq!(node.get("gap"), Some(&ReportNode::Other));
}

#[test]
fn rejects_non_object_top_level() {
    let err = ReportNode::from_slice(br#"["a","b"]"#).expect_err("array top level");
    assert!(matches!(err, ReportParseError::NotAnObject));
    let err = ReportNode::from_slice(b"not json").expect_err("garbage");
    assert!(matches!(err, ReportParseError::Json(_)));
}

#[test]
fn rejects_reports_nested_past_the_limit() {
    let mut value = json!("leaf");
    for _ in 0..=MAX_REPORT_DEPTH {
        value = json!({ "k": value });
    }
    let err = ReportNode::from_value(&value).expect_err("too deep");
    assert!(matches!(err, ReportParseError::TooDeep(MAX_REPORT_DEPTH)));

    let mut shallow = json!("leaf");
    for _ in 0..MAX_REPORT_DEPTH {
        shallow = json!({ "k": shallow });
    }
    ReportNode::from_value(&shallow).expect("at the limit");
}

#[test]
fn report_serializes_back_to_the_same_json() {
    let value = json!({
        "device_details": {"device_name": "X1", "safety_features": ["a", "b"]},
        "compliance_summary": "fine",
        "score": null
    });
    let node = ReportNode::from_value(&value).expect("parse");
    assert_eq!(serde_json::to_value(&node).expect("json"), value);
    assert_eq!(node.to_value(), value);
}

#[test]
fn error_detail_prefers_string_detail() {
    assert_eq!(
        ErrorBody::detail_from_slice(br#"{"detail":"missing field"}"#),
        Some("missing field".to_string())
    );
    assert_eq!(ErrorBody::detail_from_slice(br#"{"detail":""}"#), None);
    assert_eq!(
        ErrorBody::detail_from_slice(br#"{"detail":"   "}"#),
        Some("   ".to_string())
    );
    assert_eq!(ErrorBody::detail_from_slice(br#"{"other":1}"#), None);
    assert_eq!(ErrorBody::detail_from_slice(b"Internal Server Error"), None);
}

#[test]
fn error_detail_flattens_validation_entries() {
    let body = json!({
        "detail": [
            {"loc": ["body", "device_name"], "msg": "field required"},
            {"loc": ["body", "intended_use"], "msg": "field required"}
        ]
    });
    let bytes = serde_json::to_vec(&body).expect("json");
    assert_eq!(
        ErrorBody::detail_from_slice(&bytes),
        Some("field required; field required".to_string())
    );
}

#[test]
fn variant_parses_case_insensitively() {
    assert_eq!("Basic".parse::<FormVariant>(), Ok(FormVariant::Basic));
    assert_eq!(" extended ".parse::<FormVariant>(), Ok(FormVariant::Extended));
    assert_eq!(
        "full".parse::<FormVariant>(),
        Err(FormError::UnknownVariant("full".to_string()))
    );
}

#[test]
fn schemas_differ_in_variant_behaviour() {
    let basic = FormSchema::for_variant(FormVariant::Basic);
    let extended = FormSchema::for_variant(FormVariant::Extended);
    assert!(basic.allows_clear && basic.reveal_on_success);
    assert!(!extended.allows_clear && !extended.reveal_on_success);
    assert_eq!(
        basic.field("safety_features").map(|spec| spec.kind),
        Some(FieldKind::MultiValue)
    );
    assert!(extended
        .fields()
        .iter()
        .all(|spec| spec.kind != FieldKind::MultiValue && spec.required));
}
