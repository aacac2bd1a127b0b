//! End-to-end runs against real files

use std::fs;
use std::path::Path;

use nkeys::KeyPair;
use nsc_user_creator::{
    extract_jwt, extract_seed, verify_user_jwt, CreatorError, CredentialOrchestrator, Defaults,
    EnvSource, FileCredentialStore, FlagValues, KeyMaterialError, NkeyProvider, Settings,
};

const ALICE_CONFIG: &str = r#"
account: ORDERS_ACCOUNT
name: alice
allow_pub:
  - orders.>
allow_sub: []
allow_sub_over_consumer:
  - name: worker1
    stream: ORDERS
"#;

fn settings_for(dir: &Path, config: &str, account_seed: &str) -> Settings {
    let config_file = dir.join("nsc_user.yml");
    fs::write(&config_file, config).unwrap();

    let flags = FlagValues {
        config_file: Some(config_file),
        creds_file_target: Some(dir.join("nats-user.creds")),
        account_seed: Some(account_seed.to_string()),
        ..Default::default()
    };
    Settings::resolve(&flags, &EnvSource::default(), &Defaults::default()).unwrap()
}

fn run(settings: &Settings) -> Result<nsc_user_creator::IssuedCredential, CreatorError> {
    let store = FileCredentialStore::new(&settings.creds_file_target);
    CredentialOrchestrator::new(NkeyProvider, store).run(settings)
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_alice_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let account = KeyPair::new_account();
    let settings = settings_for(dir.path(), ALICE_CONFIG, &account.seed().unwrap());

    let issued = run(&settings).unwrap();

    assert_eq!(issued.destination, settings.creds_file_target);
    assert_eq!(file_names(dir.path()), vec!["nats-user.creds", "nsc_user.yml"]);

    let creds = fs::read_to_string(&settings.creds_file_target).unwrap();
    let claims = verify_user_jwt(extract_jwt(&creds).unwrap()).unwrap();

    assert_eq!(claims.name, "alice");
    assert_eq!(claims.iss, account.public_key());
    assert_eq!(claims.sub, issued.user_public_key);
    assert_eq!(
        claims.publish_allow(),
        [
            "orders.>",
            "$JS.ACK.ORDERS.worker1.>",
            "$JS.API.CONSUMER.MSG.NEXT.ORDERS.worker1",
        ]
    );
    assert_eq!(
        claims.subscribe_allow(),
        ["$JS.API.CONSUMER.INFO.ORDERS.worker1", "_INBOX.*", "_INBOX.*.*"]
    );

    let seed = extract_seed(&creds).unwrap();
    let user = KeyPair::from_seed(seed).unwrap();
    assert_eq!(user.public_key(), issued.user_public_key);
}

#[cfg(unix)]
#[test]
fn test_credentials_are_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let seed = KeyPair::new_account().seed().unwrap();
    let settings = settings_for(dir.path(), ALICE_CONFIG, &seed);

    run(&settings).unwrap();

    let mode = fs::metadata(&settings.creds_file_target)
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_inbox_escalation_disabled_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    let config_file = dir.path().join("user.yml");
    let target = dir.path().join("user.creds");
    fs::write(&config_file, ALICE_CONFIG).unwrap();

    let env = EnvSource::from_pairs([
        ("NSC_USER_CREATOR_CONFIG_FILE", config_file.to_string_lossy().into_owned()),
        ("NSC_USER_CREATOR_CREDS_FILE_TARGET", target.to_string_lossy().into_owned()),
        ("NSC_USER_CREATOR_ACCOUNT_SEED", KeyPair::new_account().seed().unwrap()),
        ("NSC_USER_CREATOR_LOWER_INBOX_PERMISSIONS", "false".to_string()),
    ]);
    let settings = Settings::resolve(&FlagValues::default(), &env, &Defaults::default()).unwrap();

    run(&settings).unwrap();

    let creds = fs::read_to_string(&target).unwrap();
    let claims = verify_user_jwt(extract_jwt(&creds).unwrap()).unwrap();
    assert_eq!(claims.subscribe_allow(), ["$JS.API.CONSUMER.INFO.ORDERS.worker1"]);
}

#[test]
fn test_explicit_grants_only() {
    let dir = tempfile::tempdir().unwrap();
    let config = "name: reporter\nallow_sub:\n  - reports.>\n";
    let settings = settings_for(dir.path(), config, &KeyPair::new_account().seed().unwrap());

    run(&settings).unwrap();

    let creds = fs::read_to_string(&settings.creds_file_target).unwrap();
    let claims = verify_user_jwt(extract_jwt(&creds).unwrap()).unwrap();
    assert!(claims.publish_allow().is_empty());
    assert_eq!(claims.subscribe_allow(), ["reports.>"]);
}

#[test]
fn test_malformed_config_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = "name: alice\nallow_pub: orders.>\n";
    let settings = settings_for(dir.path(), config, &KeyPair::new_account().seed().unwrap());

    let err = run(&settings).unwrap_err();

    assert!(matches!(err, CreatorError::ConfigDecode { .. }), "{err}");
    assert_eq!(err.exit_code(), 1);
    assert!(!settings.creds_file_target.exists());
    assert_eq!(file_names(dir.path()), vec!["nsc_user.yml"]);
}

#[test]
fn test_missing_config_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let flags = FlagValues {
        config_file: Some(dir.path().join("absent.yml")),
        creds_file_target: Some(dir.path().join("nats-user.creds")),
        account_seed: Some(KeyPair::new_account().seed().unwrap()),
        ..Default::default()
    };
    let settings = Settings::resolve(&flags, &EnvSource::default(), &Defaults::default()).unwrap();

    let err = run(&settings).unwrap_err();

    assert!(matches!(err, CreatorError::ConfigRead { .. }));
    assert!(file_names(dir.path()).is_empty());
}

#[test]
fn test_operator_seed_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_for(dir.path(), ALICE_CONFIG, &KeyPair::new_operator().seed().unwrap());

    let err = run(&settings).unwrap_err();

    assert!(matches!(
        err,
        CreatorError::KeyMaterial(KeyMaterialError::NotAccountSeed { .. })
    ));
    assert!(!settings.creds_file_target.exists());
}

#[test]
fn test_each_run_creates_a_new_user() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_for(dir.path(), ALICE_CONFIG, &KeyPair::new_account().seed().unwrap());

    let first = run(&settings).unwrap();
    let second = run(&settings).unwrap();

    assert_ne!(first.user_public_key, second.user_public_key);
    let creds = fs::read_to_string(&settings.creds_file_target).unwrap();
    let claims = verify_user_jwt(extract_jwt(&creds).unwrap()).unwrap();
    assert_eq!(claims.sub, second.user_public_key);
}
