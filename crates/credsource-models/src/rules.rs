//! Rules the controller applies before storing a credential input source.
//!
//! They live here so that every backend emulating the controller rejects
//! the same links with the same messages. The reconciler itself does not
//! call them.

use crate::credential::CredentialType;
use crate::error::ModelError;

/// Check a target/source pair and the wired field against their types.
///
/// * the target must not be an external (lookup) credential;
/// * the source must be an external credential;
/// * the field must be defined by the target's type.
pub fn validate_link(
    target_type: &CredentialType,
    source_type: &CredentialType,
    input_field_name: &str,
) -> Result<(), ModelError> {
    if target_type.kind.is_lookup_source() {
        return Err(ModelError::InvalidLink {
            field: "target_credential".into(),
            reason: "Target must be a non-external credential".into(),
        });
    }
    if !source_type.kind.is_lookup_source() {
        return Err(ModelError::InvalidLink {
            field: "source_credential".into(),
            reason: "Source must be an external credential".into(),
        });
    }
    if !target_type.defines_field(input_field_name) {
        let mut options: Vec<&str> = target_type.fields.iter().map(String::as_str).collect();
        options.sort_unstable();
        return Err(ModelError::InvalidLink {
            field: "input_field_name".into(),
            reason: format!(
                "Input field must be defined on target credential (options are {}).",
                options.join(", ")
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::CredentialKind;
    use crate::id::CredentialTypeId;

    fn machine() -> CredentialType {
        CredentialType {
            id: CredentialTypeId::new(1),
            name: "Machine".into(),
            kind: CredentialKind::Ssh,
            fields: vec!["username".into(), "password".into(), "become_password".into()],
        }
    }

    fn lookup() -> CredentialType {
        CredentialType {
            id: CredentialTypeId::new(2),
            name: "CyberArk Central Credential Provider Lookup".into(),
            kind: CredentialKind::External,
            fields: vec!["url".into(), "app_id".into()],
        }
    }

    #[test]
    fn accepts_external_source_on_defined_field() {
        assert!(validate_link(&machine(), &lookup(), "password").is_ok());
    }

    #[test]
    fn rejects_external_target() {
        let err = validate_link(&lookup(), &lookup(), "url").unwrap_err();
        assert!(matches!(err, ModelError::InvalidLink { ref field, .. } if field == "target_credential"));
    }

    #[test]
    fn rejects_non_external_source() {
        let err = validate_link(&machine(), &machine(), "password").unwrap_err();
        assert!(matches!(err, ModelError::InvalidLink { ref field, .. } if field == "source_credential"));
    }

    #[test]
    fn rejects_undefined_field_listing_sorted_options() {
        let err = validate_link(&machine(), &lookup(), "token").unwrap_err();
        assert_eq!(
            err.to_string(),
            "input_field_name: Input field must be defined on target credential \
             (options are become_password, password, username)."
        );
    }
}
