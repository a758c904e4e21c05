//! Unit tests for session configuration parsing.

use std::collections::HashMap;
use std::io::Write;

use mockable::MockEnv;
use rstest::rstest;
use tempfile::NamedTempFile;

use super::*;

fn key_file(len: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create key file");
    file.write_all(&vec![b'k'; len]).expect("write key bytes");
    file
}

fn mock_env(vars: HashMap<&'static str, String>) -> MockEnv {
    let mut env = MockEnv::new();
    env.expect_string()
        .times(0..)
        .returning(move |key| vars.get(key).cloned());
    env
}

fn release_vars(key: &NamedTempFile) -> HashMap<&'static str, String> {
    HashMap::from([
        (KEY_FILE_ENV, key.path().display().to_string()),
        (COOKIE_SECURE_ENV, "1".to_owned()),
        (SAMESITE_ENV, "Strict".to_owned()),
        (ALLOW_EPHEMERAL_ENV, "0".to_owned()),
    ])
}

#[rstest]
fn release_accepts_complete_configuration() {
    let key = key_file(SESSION_KEY_MIN_LEN);
    let env = mock_env(release_vars(&key));

    let settings =
        session_settings_from_env(&env, BuildMode::Release).expect("release settings load");
    assert!(settings.cookie_secure);
    assert_eq!(settings.same_site, SameSite::Strict);
    assert_eq!(settings.fingerprint().len(), 16);
}

#[rstest]
#[case(COOKIE_SECURE_ENV)]
#[case(SAMESITE_ENV)]
#[case(ALLOW_EPHEMERAL_ENV)]
fn release_rejects_missing_toggles(#[case] missing: &'static str) {
    let key = key_file(SESSION_KEY_MIN_LEN);
    let mut vars = release_vars(&key);
    vars.remove(missing);

    let Err(err) = session_settings_from_env(&mock_env(vars), BuildMode::Release) else {
        panic!("missing {missing} must fail");
    };
    assert!(matches!(err, SessionConfigError::MissingEnv { name } if name == missing));
}

#[rstest]
fn release_rejects_short_keys() {
    let key = key_file(SESSION_KEY_MIN_LEN - 1);
    let env = mock_env(release_vars(&key));

    let Err(err) = session_settings_from_env(&env, BuildMode::Release) else {
        panic!("short key must fail");
    };
    assert!(matches!(err, SessionConfigError::KeyTooShort { length, .. } if length == 63));
}

#[rstest]
fn release_refuses_ephemeral_keys() {
    let key = key_file(SESSION_KEY_MIN_LEN);
    let mut vars = release_vars(&key);
    vars.insert(ALLOW_EPHEMERAL_ENV, "yes".to_owned());

    let Err(err) = session_settings_from_env(&mock_env(vars), BuildMode::Release) else {
        panic!("ephemeral keys must fail in release");
    };
    assert!(matches!(err, SessionConfigError::EphemeralNotAllowed));
}

#[rstest]
fn release_requires_secure_cookies_for_samesite_none() {
    let key = key_file(SESSION_KEY_MIN_LEN);
    let mut vars = release_vars(&key);
    vars.insert(COOKIE_SECURE_ENV, "0".to_owned());
    vars.insert(SAMESITE_ENV, "None".to_owned());

    let Err(err) = session_settings_from_env(&mock_env(vars), BuildMode::Release) else {
        panic!("insecure SameSite=None must fail");
    };
    assert!(matches!(err, SessionConfigError::InsecureSameSiteNone));
}

#[rstest]
fn release_reports_unreadable_key_files() {
    let mut vars = release_vars(&key_file(SESSION_KEY_MIN_LEN));
    vars.insert(KEY_FILE_ENV, "/nonexistent/siteulation/session_key".to_owned());

    let Err(err) = session_settings_from_env(&mock_env(vars), BuildMode::Release) else {
        panic!("unreadable key must fail");
    };
    assert!(matches!(err, SessionConfigError::KeyRead { .. }));
}

#[rstest]
fn debug_falls_back_to_defaults() {
    let mut vars = HashMap::new();
    vars.insert(KEY_FILE_ENV, "/nonexistent/siteulation/session_key".to_owned());
    vars.insert(COOKIE_SECURE_ENV, "maybe".to_owned());

    let settings = session_settings_from_env(&mock_env(vars), BuildMode::Debug)
        .expect("debug builds tolerate gaps");
    assert!(settings.cookie_secure);
    assert_eq!(settings.same_site, SameSite::Lax);
}

#[rstest]
#[case("1", Some(true))]
#[case(" YES ", Some(true))]
#[case("n", Some(false))]
#[case("false", Some(false))]
#[case("perhaps", None)]
fn parses_boolean_spellings(#[case] raw: &str, #[case] expected: Option<bool>) {
    assert_eq!(parse_bool(raw), expected);
}
