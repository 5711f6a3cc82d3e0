use encore::session::UserIdentity;
use serde_json::json;

use super::*;

fn identity(metadata: serde_json::Value) -> UserIdentity {
    UserIdentity { id: "u1".to_owned(), email: None, metadata }
}

#[test]
fn validate_admin_credentials_trims_email_and_requires_both() {
    assert_eq!(
        validate_admin_credentials(" root@example.com ", "pw"),
        Ok(("root@example.com".to_owned(), "pw".to_owned()))
    );
    assert_eq!(validate_admin_credentials("root@example.com", ""), Err("Enter both admin email and password."));
}

#[test]
fn admin_role_is_required() {
    assert!(is_admin_identity(&identity(json!({"role": "admin"}))));
    assert!(!is_admin_identity(&identity(json!({"role": "musician"}))));
    assert!(!is_admin_identity(&identity(json!({}))));
    assert!(!is_admin_identity(&identity(serde_json::Value::Null)));
}
