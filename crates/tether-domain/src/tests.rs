#[cfg(test)]
mod tests {
    use crate::types::*;
    use crate::DomainError;
    use serde_json::json;

    #[test]
    fn application_keeps_unmodeled_fields() {
        let app: Application = serde_json::from_value(json!({
            "id": "00000000-0000-0000-0000-000000000001",
            "appId": "11111111-1111-1111-1111-111111111111",
            "displayName": "payments-ci",
            "signInAudience": "AzureADMyOrg",
        }))
        .unwrap();
        assert_eq!(app.object_id.as_str(), "00000000-0000-0000-0000-000000000001");
        assert_eq!(app.display_name, "payments-ci");
        assert_eq!(app.additional_data["signInAudience"], "AzureADMyOrg");
        assert!(!app.additional_data.contains_key("appId"));
    }

    #[test]
    fn tag_set_ignores_order() {
        let a: ServicePrincipal = serde_json::from_value(json!({
            "id": "sp-1", "appId": "app-1", "tags": ["b", "a", "c"]
        }))
        .unwrap();
        let b: ServicePrincipal = serde_json::from_value(json!({
            "id": "sp-2", "appId": "app-1", "tags": ["c", "b", "a"]
        }))
        .unwrap();
        assert_eq!(a.tag_set(), b.tag_set());
    }

    #[test]
    fn missing_tags_default_to_empty() {
        let sp: ServicePrincipal =
            serde_json::from_value(json!({ "id": "sp-1", "appId": "app-1" })).unwrap();
        assert!(sp.tags.is_empty());
    }

    #[test]
    fn credential_matches_needs_both_fields() {
        let fic: FederatedIdentityCredential = serde_json::from_value(json!({
            "id": "fic-1",
            "name": "gh-main",
            "issuer": "https://token.actions.githubusercontent.com",
            "subject": "repo:acme/payments:ref:refs/heads/main",
        }))
        .unwrap();
        assert!(fic.matches(
            "https://token.actions.githubusercontent.com",
            "repo:acme/payments:ref:refs/heads/main"
        ));
        assert!(!fic.matches("https://other.example", "repo:acme/payments:ref:refs/heads/main"));
    }

    #[test]
    fn spec_serializes_without_empty_description() {
        let spec = FederatedCredentialSpec::new("gh-main", "https://issuer.example", "sub");
        let v = serde_json::to_value(&spec).unwrap();
        assert_eq!(v["audiences"], json!([DEFAULT_AUDIENCE]));
        assert!(v.get("description").is_none());
    }

    #[test]
    fn spec_validation() {
        let ok = FederatedCredentialSpec::new("gh-main", "https://issuer.example", "sub");
        assert!(ok.validate().is_ok());

        let bad_issuer = FederatedCredentialSpec::new("gh-main", "http://issuer.example", "sub");
        assert!(matches!(bad_issuer.validate(), Err(DomainError::InvalidIssuer(_))));

        let bad_name = FederatedCredentialSpec::new("gh main", "https://issuer.example", "sub");
        assert!(matches!(
            bad_name.validate(),
            Err(DomainError::InvalidCredentialName { .. })
        ));

        let short = FederatedCredentialSpec::new("ab", "https://issuer.example", "sub");
        assert!(short.validate().is_err());

        let no_aud = FederatedCredentialSpec::new("gh-main", "https://issuer.example", "sub")
            .with_audiences(vec![]);
        assert!(matches!(no_aud.validate(), Err(DomainError::MissingAudience(_))));
    }

    #[test]
    fn service_account_subject_format() {
        assert_eq!(
            service_account_subject("payments", "api"),
            "system:serviceaccount:payments:api"
        );
    }

    #[test]
    fn identity_rejects_blank_name() {
        let id = WorkloadIdentity::new("  ");
        assert!(matches!(id.validate(), Err(DomainError::InvalidDisplayName(_))));
    }
}
