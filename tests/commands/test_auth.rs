//! Tests for the auth command

use std::fs;

use telegram_session_keeper::commands::{auth, AuthArgs};
use telegram_session_keeper::Error;

use super::stub::{Call, Sandbox, StubConnector, StubState};

fn args(sandbox: &Sandbox) -> AuthArgs {
    AuthArgs {
        credentials: sandbox.credentials(),
        session: sandbox.path("s.dat"),
        phone: "+10000000000".to_string(),
        auth_hash: "H1".to_string(),
        auth_code: "12345".to_string(),
        password: None,
    }
}

#[tokio::test]
async fn auth_signs_in_and_restores_session() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.path("s.dat"), b"fresh-session").unwrap();
    let connector = StubConnector::new(StubState::default());
    let mut out: Vec<u8> = Vec::new();

    auth::run(&connector, &sandbox.workspace, &args(&sandbox), &mut out)
        .await
        .expect("auth");

    assert_eq!(String::from_utf8(out).unwrap(), "Signed in as Test User\n");
    // The library's changes made at the working path travel back with the file.
    assert_eq!(fs::read(sandbox.path("s.dat")).unwrap(), b"authorized-session");
    assert_eq!(sandbox.listing(), vec!["s.dat"]);

    assert_eq!(
        connector.calls(),
        vec![
            Call::Connect(sandbox.workspace.working_path().to_path_buf()),
            Call::SignIn {
                phone: "+10000000000".to_string(),
                hash: "H1".to_string(),
                code: "12345".to_string(),
            },
            Call::Disconnect,
        ]
    );
}

#[tokio::test]
async fn failed_sign_in_still_restores_session() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.path("s.dat"), b"fresh-session").unwrap();
    let connector = StubConnector::new(StubState {
        fail_sign_in: Some("PHONE_CODE_INVALID".to_string()),
        ..Default::default()
    });
    let mut out: Vec<u8> = Vec::new();

    let err = auth::run(&connector, &sandbox.workspace, &args(&sandbox), &mut out)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::TelegramError(ref name) if name == "PHONE_CODE_INVALID"));
    assert!(out.is_empty());
    assert_eq!(fs::read(sandbox.path("s.dat")).unwrap(), b"fresh-session");
    assert!(!sandbox.workspace.working_path().exists());
}

#[tokio::test]
async fn failed_connect_still_restores_session() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.path("s.dat"), b"fresh-session").unwrap();
    let connector = StubConnector::new(StubState {
        fail_connect: Some("network unreachable".to_string()),
        ..Default::default()
    });
    let mut out: Vec<u8> = Vec::new();

    let err = auth::run(&connector, &sandbox.workspace, &args(&sandbox), &mut out)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::TelegramError(ref reason) if reason == "network unreachable"));
    assert!(out.is_empty());
    assert_eq!(fs::read(sandbox.path("s.dat")).unwrap(), b"fresh-session");
    assert_eq!(sandbox.listing(), vec!["s.dat"]);
}

#[tokio::test]
async fn two_step_account_signs_in_with_password() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.path("s.dat"), b"fresh-session").unwrap();
    let connector = StubConnector::new(StubState {
        password: Some("hunter2".to_string()),
        ..Default::default()
    });
    let mut auth_args = args(&sandbox);
    auth_args.password = Some("hunter2".to_string());
    let mut out: Vec<u8> = Vec::new();

    auth::run(&connector, &sandbox.workspace, &auth_args, &mut out)
        .await
        .expect("auth");

    assert_eq!(String::from_utf8(out).unwrap(), "Signed in as Test User\n");
    assert_eq!(fs::read(sandbox.path("s.dat")).unwrap(), b"authorized-session");
    assert_eq!(sandbox.listing(), vec!["s.dat"]);
    assert_eq!(
        connector.calls()[1..],
        [
            Call::SignIn {
                phone: "+10000000000".to_string(),
                hash: "H1".to_string(),
                code: "12345".to_string(),
            },
            Call::CheckPassword("hunter2".to_string()),
            Call::Disconnect,
        ]
    );
}

#[tokio::test]
async fn two_step_account_without_password_is_refused() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.path("s.dat"), b"fresh-session").unwrap();
    let connector = StubConnector::new(StubState {
        password: Some("hunter2".to_string()),
        ..Default::default()
    });
    let mut out: Vec<u8> = Vec::new();

    let err = auth::run(&connector, &sandbox.workspace, &args(&sandbox), &mut out)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::PasswordRequired));
    assert!(!connector
        .calls()
        .iter()
        .any(|c| matches!(c, Call::CheckPassword(_))));
    assert_eq!(fs::read(sandbox.path("s.dat")).unwrap(), b"fresh-session");
    assert_eq!(sandbox.listing(), vec!["s.dat"]);
}

#[tokio::test]
async fn wrong_password_restores_session() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.path("s.dat"), b"fresh-session").unwrap();
    let connector = StubConnector::new(StubState {
        password: Some("hunter2".to_string()),
        ..Default::default()
    });
    let mut auth_args = args(&sandbox);
    auth_args.password = Some("guess".to_string());
    let mut out: Vec<u8> = Vec::new();

    let err = auth::run(&connector, &sandbox.workspace, &auth_args, &mut out)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidPassword));
    assert!(out.is_empty());
    assert_eq!(connector.calls().last(), Some(&Call::Disconnect));
    assert_eq!(fs::read(sandbox.path("s.dat")).unwrap(), b"fresh-session");
    assert_eq!(sandbox.listing(), vec!["s.dat"]);
}

#[tokio::test]
async fn auth_requires_existing_session() {
    let sandbox = Sandbox::new();
    let connector = StubConnector::new(StubState::default());
    let mut out: Vec<u8> = Vec::new();

    let err = auth::run(&connector, &sandbox.workspace, &args(&sandbox), &mut out)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SessionNotFound(_)));
    assert!(!connector.connected());
    assert!(sandbox.listing().is_empty());
}

#[tokio::test]
async fn auth_refuses_occupied_working_path() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.path("s.dat"), b"mine").unwrap();
    fs::write(sandbox.workspace.working_path(), b"someone else's").unwrap();
    let connector = StubConnector::new(StubState::default());
    let mut out: Vec<u8> = Vec::new();

    let err = auth::run(&connector, &sandbox.workspace, &args(&sandbox), &mut out)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Conflict(_)));
    assert!(!connector.connected());
    assert_eq!(fs::read(sandbox.path("s.dat")).unwrap(), b"mine");
    assert_eq!(
        fs::read(sandbox.workspace.working_path()).unwrap(),
        b"someone else's"
    );
    assert_eq!(sandbox.listing(), vec!["s.dat", "session.dat"]);
}
