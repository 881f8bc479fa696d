//! Reference resolution and the end-to-end `apply` operation.

use credsource_models::{
    CredentialId, CredentialRef, DesiredState, InputSourceRequest, OrganizationRef,
};
use credsource_sdk::{
    CapabilityTable, ErrorKind, InputSourceManager, Lookup, MemoryController, ResourceLocator,
};

struct Fixture {
    ctl: MemoryController,
    target: CredentialId,
    cyberark: CredentialId,
    vault: CredentialId,
}

/// Two organizations; `shared` exists in both, `cyberark` and `prod-ssh`
/// only in `Default`.
fn fixture() -> Fixture {
    let ctl = MemoryController::with_defaults();
    let default_org = ctl.organizations()[0].id;
    let other_org = ctl.add_organization("Engineering").id;
    let machine = ctl.credential_type_named("Machine").expect("machine").id;
    let cyberark_type = ctl
        .credential_type_named("CyberArk Central Credential Provider Lookup")
        .expect("cyberark")
        .id;
    let vault_type = ctl
        .credential_type_named("HashiCorp Vault Secret Lookup")
        .expect("vault")
        .id;

    let target = ctl
        .add_credential("prod-ssh", Some(default_org), machine)
        .expect("target")
        .id;
    let cyberark = ctl
        .add_credential("cyberark", Some(default_org), cyberark_type)
        .expect("cyberark")
        .id;
    let vault = ctl
        .add_credential("shared", Some(default_org), vault_type)
        .expect("vault")
        .id;
    ctl.add_credential("shared", Some(other_org), vault_type)
        .expect("second shared");

    Fixture {
        ctl,
        target,
        cyberark,
        vault,
    }
}

async fn locator(ctl: &MemoryController) -> ResourceLocator<MemoryController> {
    let capabilities = CapabilityTable::load(ctl).await.expect("capabilities");
    ResourceLocator::new(ctl.clone(), capabilities)
}

async fn manager(ctl: &MemoryController) -> InputSourceManager<MemoryController, MemoryController> {
    InputSourceManager::from_backend(ctl.clone())
        .await
        .expect("manager")
}

#[tokio::test]
async fn test_locate_by_name_id_and_scope() {
    let f = fixture();
    let locator = locator(&f.ctl).await;

    let found = locator
        .locate_credential(&CredentialRef::name("prod-ssh"))
        .await
        .expect("lookup");
    assert!(matches!(found, Lookup::Found(ref c) if c.id == f.target));

    let by_id = locator
        .locate_credential(&CredentialRef::Id(f.cyberark))
        .await
        .expect("lookup");
    assert!(matches!(by_id, Lookup::Found(ref c) if c.name == "cyberark"));

    let missing = locator
        .locate_credential(&CredentialRef::Id(CredentialId::new(4242)))
        .await
        .expect("lookup");
    assert_eq!(missing, Lookup::NotFound);

    let ambiguous = locator
        .locate_credential(&CredentialRef::name("shared"))
        .await
        .expect("lookup");
    assert!(matches!(ambiguous, Lookup::Ambiguous(ref c) if c.len() == 2));

    let scoped = locator
        .resolve_credential(&CredentialRef::scoped("shared", "Default"))
        .await
        .expect("scoped");
    assert_eq!(scoped.id, f.vault);
}

#[tokio::test]
async fn test_resolution_failures() {
    let f = fixture();
    let locator = locator(&f.ctl).await;

    let err = locator
        .resolve_credential(&CredentialRef::name("nope"))
        .await
        .expect_err("missing");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = locator
        .resolve_credential(&CredentialRef::name("shared"))
        .await
        .expect_err("ambiguous");
    assert_eq!(err.kind(), ErrorKind::Ambiguous);

    let err = locator
        .resolve_organization(&OrganizationRef::Name("Nowhere".into()))
        .await
        .expect_err("org");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_default_organization_disambiguates() {
    let f = fixture();
    let locator = locator(&f.ctl).await;
    let request = InputSourceRequest::builder("prod-ssh", "password")
        .source("shared")
        .organization("Default")
        .build()
        .expect("request");

    let resolved = locator.resolve(&request).await.expect("resolve");
    assert_eq!(resolved.key.target_credential, f.target);
    assert_eq!(resolved.payload.expect("payload").source_credential, f.vault);
}

#[tokio::test]
async fn test_absent_skips_source_resolution() {
    let f = fixture();
    let locator = locator(&f.ctl).await;
    let mut request = InputSourceRequest::builder("prod-ssh", "password")
        .state(DesiredState::Absent)
        .build()
        .expect("request");
    // Unresolvable, but irrelevant for absent.
    request.source_credential = Some(CredentialRef::name("nope"));

    let resolved = locator.resolve(&request).await.expect("resolve");
    assert!(resolved.payload.is_none());
    assert_eq!(resolved.state, DesiredState::Absent);
}

#[tokio::test]
async fn test_capability_check_is_advisory() {
    let f = fixture();
    let locator = locator(&f.ctl).await;

    let ok = locator
        .check_source(&CredentialRef::Id(f.cyberark))
        .await
        .expect("external source");
    assert_eq!(ok.id, f.cyberark);

    let err = locator
        .check_source(&CredentialRef::name("prod-ssh"))
        .await
        .expect_err("ssh is not a lookup source");
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert!(err.to_string().contains("kind ssh"));
}

#[tokio::test]
async fn test_apply_scenario_by_name() {
    let f = fixture();
    let manager = manager(&f.ctl).await;
    let request = |source: &str, state: DesiredState| {
        InputSourceRequest::builder("prod-ssh", "password")
            .source(source)
            .organization("Default")
            .metadata("object_query", "Safe=X;Object=Y")
            .metadata("object_query_format", "Exact")
            .state(state)
            .build()
            .expect("request")
    };

    let created = manager
        .apply(&request("cyberark", DesiredState::Present))
        .await
        .expect("create");
    assert!(created.changed);
    let id = created.id.expect("id");

    let again = manager
        .apply(&request("cyberark", DesiredState::Present))
        .await
        .expect("noop");
    assert!(!again.changed);
    assert_eq!(again.id, Some(id));

    let swapped = manager
        .apply(&request("shared", DesiredState::Present))
        .await
        .expect("swap");
    assert!(swapped.changed);
    assert_eq!(swapped.id, Some(id));
    assert_eq!(
        swapped.current_payload.expect("payload").source_credential,
        f.vault
    );

    let removed = manager
        .apply(&request("cyberark", DesiredState::Absent))
        .await
        .expect("delete");
    assert!(removed.changed);
    assert!(removed.id.is_none());
    assert!(removed.current_payload.is_none());
    assert!(f.ctl.input_sources().is_empty());
}

#[tokio::test]
async fn test_apply_check_mode() {
    let f = fixture();
    let manager = manager(&f.ctl).await;
    let request = InputSourceRequest::builder(f.target, "password")
        .source(f.cyberark)
        .metadata("object_query", "Safe=X")
        .check_mode(true)
        .build()
        .expect("request");

    let preview = manager.apply(&request).await.expect("preview");
    assert!(preview.changed);
    assert!(preview.id.is_none());
    assert_eq!(
        preview.current_payload.expect("payload").source_credential,
        f.cyberark
    );
    assert!(f.ctl.input_sources().is_empty());
}

#[tokio::test]
async fn test_apply_missing_source_fails_validation() {
    let f = fixture();
    let manager = manager(&f.ctl).await;
    let mut request = InputSourceRequest::builder("prod-ssh", "password")
        .state(DesiredState::Absent)
        .build()
        .expect("request");
    request.state = DesiredState::Present;

    let err = manager.apply(&request).await.expect_err("no source");
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(f.ctl.input_sources().is_empty());
}

#[tokio::test]
async fn test_digit_name_colliding_with_an_id_is_ambiguous() {
    let f = fixture();
    let default_org = f.ctl.organizations()[0].id;
    let machine = f.ctl.credential_type_named("Machine").expect("machine").id;
    let digits = f.target.to_string();
    let named_like_id = f
        .ctl
        .add_credential(&digits, Some(default_org), machine)
        .expect("digit-named credential")
        .id;
    let locator = locator(&f.ctl).await;

    let lookup = locator
        .locate_credential(&CredentialRef::from(digits.as_str()))
        .await
        .expect("lookup");
    let Lookup::Ambiguous(candidates) = lookup else {
        panic!("expected ambiguous, got {lookup:?}");
    };
    let mut ids: Vec<_> = candidates.iter().map(|c| c.id).collect();
    ids.sort();
    assert_eq!(ids, vec![f.target, named_like_id]);

    // An explicit id never considers names.
    let by_id = locator
        .resolve_credential(&CredentialRef::Id(f.target))
        .await
        .expect("explicit id");
    assert_eq!(by_id.id, f.target);

    let manager = manager(&f.ctl).await;
    let request = InputSourceRequest::builder(CredentialRef::name(digits.clone()), "password")
        .source("cyberark")
        .build()
        .expect("request");
    let err = manager.apply(&request).await.expect_err("ambiguous target");
    assert_eq!(err.kind(), ErrorKind::Ambiguous);
    assert!(f.ctl.input_sources().is_empty());
}

#[tokio::test]
async fn test_digit_text_resolves_by_whichever_reading_matches() {
    let f = fixture();
    let machine = f.ctl.credential_type_named("Machine").expect("machine").id;
    let locator = locator(&f.ctl).await;

    // No credential carries this name, so the id reading wins.
    let by_id = locator
        .resolve_credential(&CredentialRef::from(f.cyberark.to_string().as_str()))
        .await
        .expect("id reading");
    assert_eq!(by_id.id, f.cyberark);

    // No credential has this id, so the name reading wins.
    let named = f
        .ctl
        .add_credential("987654", None, machine)
        .expect("digit-named credential");
    let by_name = locator
        .resolve_credential(&CredentialRef::from("987654"))
        .await
        .expect("name reading");
    assert_eq!(by_name.id, named.id);

    let err = locator
        .resolve_credential(&CredentialRef::from("987655"))
        .await
        .expect_err("neither reading");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_digit_organization_name_colliding_with_an_id_is_ambiguous() {
    let f = fixture();
    let default_org = f.ctl.organizations()[0].id;
    let digits = default_org.to_string();
    f.ctl.add_organization(&digits);
    let locator = locator(&f.ctl).await;

    let err = locator
        .resolve_organization(&OrganizationRef::from(digits.as_str()))
        .await
        .expect_err("ambiguous organization");
    assert_eq!(err.kind(), ErrorKind::Ambiguous);

    assert_eq!(
        locator
            .resolve_organization(&OrganizationRef::Id(default_org))
            .await
            .expect("explicit id"),
        default_org
    );
}
