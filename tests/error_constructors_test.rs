use phoros::error::PhorosError;

#[test]
fn constructors_produce_matching_variants() {
    assert!(matches!(
        PhorosError::config("c"),
        PhorosError::Config { .. }
    ));
    assert!(matches!(PhorosError::api("a"), PhorosError::Api { .. }));
    assert!(matches!(
        PhorosError::not_found("n"),
        PhorosError::NotFound { .. }
    ));
    assert!(matches!(
        PhorosError::network("n"),
        PhorosError::Network { .. }
    ));
    assert!(matches!(PhorosError::store("s"), PhorosError::Store { .. }));
    assert!(matches!(
        PhorosError::payment("p"),
        PhorosError::Payment { .. }
    ));
    assert!(matches!(
        PhorosError::timeout("t"),
        PhorosError::Timeout { .. }
    ));
    assert!(matches!(
        PhorosError::generic("g"),
        PhorosError::Generic { .. }
    ));
}

#[test]
fn display_formats_carry_context() {
    assert_eq!(
        PhorosError::payment("debit refused").to_string(),
        "Payment error: debit refused"
    );
    assert_eq!(
        PhorosError::validation("speed", "no pending proposal").to_string(),
        "Validation error: speed - no pending proposal"
    );
    assert_eq!(
        PhorosError::not_found("session s1").to_string(),
        "Not found: session s1"
    );
}

#[test]
fn io_and_serde_errors_convert() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: PhorosError = io_err.into();
    assert!(matches!(err, PhorosError::Io { .. }));

    let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: PhorosError = parse_err.into();
    assert!(matches!(err, PhorosError::Serialization { .. }));
}

#[test]
fn only_network_and_timeout_are_transient() {
    assert!(PhorosError::network("n").is_transient());
    assert!(PhorosError::timeout("t").is_transient());
    assert!(!PhorosError::api("a").is_transient());
    assert!(!PhorosError::not_found("n").is_transient());
    assert!(!PhorosError::payment("p").is_transient());
    assert!(!PhorosError::store("s").is_transient());
}
