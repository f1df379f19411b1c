use std::io::Write;
use std::path::Path;

use tether_config::{load_file, parse_str, ConfigError};
use tether_directory::CloudEnvironment;
use tether_domain::DEFAULT_AUDIENCE;

#[test]
fn load_valid_fixture() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/identities.yml");
    let cfg = load_file(&path).expect("should load without error");

    assert_eq!(cfg.directory.cloud, Some(CloudEnvironment::UsGov));
    assert_eq!(cfg.identities.len(), 2);

    let payments = &cfg.identities[0];
    assert_eq!(payments.display_name, "payments-ci");
    assert_eq!(payments.tags, vec!["tether", "team-payments"]);

    let gh = &payments.federated_credentials[0];
    assert_eq!(gh.audiences, vec![DEFAULT_AUDIENCE]);
    assert_eq!(gh.description.as_deref(), Some("main branch deploys"));

    let aks = &payments.federated_credentials[1];
    assert_eq!(aks.subject, "system:serviceaccount:payments:api");
    assert_eq!(aks.audiences.len(), 2);

    assert!(cfg.identities[1].federated_credentials.is_empty());
}

#[test]
fn missing_file_returns_io_error() {
    let err = load_file(Path::new("/nonexistent/path/tether.yml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }), "got: {}", err);
}

#[test]
fn invalid_yaml_reports_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "identities: [unclosed").unwrap();
    let err = load_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::YamlParse { .. }), "got: {}", err);
    assert!(err.to_string().contains(&file.path().display().to_string()));
}

#[test]
fn unknown_field_is_rejected() {
    let err = parse_str("identities:\n  - name: a\n    owner: me\n", "inline").unwrap_err();
    assert!(matches!(err, ConfigError::YamlParse { .. }), "got: {}", err);
}

#[test]
fn duplicate_identity_is_rejected() {
    let yaml = "identities:\n  - name: a\n  - name: a\n";
    let err = parse_str(yaml, "inline").unwrap_err();
    assert!(err.to_string().contains("duplicate identity 'a'"), "got: {}", err);
}

#[test]
fn subject_and_service_account_are_exclusive() {
    let yaml = r#"
identities:
  - name: a
    federated_credentials:
      - name: both
        issuer: https://issuer.example
        subject: x
        service_account: { namespace: n, name: s }
"#;
    let err = parse_str(yaml, "inline").unwrap_err();
    assert!(err.to_string().contains("both subject and service_account"), "got: {}", err);

    let yaml = r#"
identities:
  - name: a
    federated_credentials:
      - name: neither
        issuer: https://issuer.example
"#;
    let err = parse_str(yaml, "inline").unwrap_err();
    assert!(err.to_string().contains("needs a subject"), "got: {}", err);
}

#[test]
fn repeated_issuer_subject_is_rejected() {
    let yaml = r#"
identities:
  - name: a
    federated_credentials:
      - { name: one, issuer: "https://issuer.example", subject: x }
      - { name: two, issuer: "https://issuer.example", subject: x }
"#;
    let err = parse_str(yaml, "inline").unwrap_err();
    assert!(matches!(err, ConfigError::Conversion { .. }), "got: {}", err);
}

#[test]
fn plain_http_issuer_is_a_domain_error() {
    let yaml = r#"
identities:
  - name: a
    federated_credentials:
      - { name: one, issuer: "http://issuer.example", subject: x }
"#;
    let err = parse_str(yaml, "inline").unwrap_err();
    assert!(matches!(err, ConfigError::Domain { .. }), "got: {}", err);
}

#[test]
fn unknown_cloud_is_rejected() {
    let err = parse_str("directory:\n  cloud: mars\n", "inline").unwrap_err();
    assert!(matches!(err, ConfigError::YamlParse { .. }), "got: {}", err);
    assert!(err.to_string().contains("mars"), "got: {}", err);
}

#[test]
fn every_cloud_name_parses() {
    for (name, cloud) in [
        ("public", CloudEnvironment::Public),
        ("usgov", CloudEnvironment::UsGov),
        ("china", CloudEnvironment::China),
    ] {
        let cfg = parse_str(&format!("directory:\n  cloud: {}\n", name), "inline").unwrap();
        assert_eq!(cfg.directory.cloud, Some(cloud));
    }
}
