//! Login/OTP/signup/OAuth flow tests against in-memory collaborator
//! doubles.

mod common;

use common::*;
use session_engine::models::{OrgRegistration, TokenPair};
use session_engine::services::{Credentials, EngineError, LoginOutcome};

fn credentials() -> Credentials {
    Credentials {
        email: "a@b.com".to_string(),
        password: "Password1!".to_string(),
    }
}

#[tokio::test]
async fn test_login_then_verify_otp_authenticates() {
    let app = spawn_engine();
    let access = make_token(600);

    // 1. Submit credentials; backend wants an OTP
    let outcome = app.engine.auth().login(credentials()).await.unwrap();
    assert_eq!(outcome, LoginOutcome::OtpRequired);
    assert!(!app.engine.session().authenticated);
    assert!(app.engine.store().access_token().is_none());

    // 2. Verify the OTP; tokens are committed and permissions loaded once
    app.api.push_verify_otp(Ok(otp_success(&access, "refresh-1")));
    let session = app.engine.auth().verify_otp("123456").await.unwrap();

    assert!(session.authenticated);
    assert_eq!(session.user, Some(test_user()));
    assert_eq!(
        app.engine.store().token_pair(),
        Some(TokenPair::new(access, "refresh-1"))
    );
    assert_eq!(app.api.call_count("user_permissions"), 1);
}

#[tokio::test]
async fn test_verify_otp_without_login_fails_fast() {
    let app = spawn_engine();

    let err = app.engine.auth().verify_otp("123456").await.unwrap_err();
    assert!(matches!(err, EngineError::MissingContext(_)));

    // No network call was issued
    assert_eq!(app.api.call_count("verify_otp"), 0);
}

#[tokio::test]
async fn test_rejected_otp_leaves_session_anonymous() {
    let app = spawn_engine();
    app.engine.auth().login(credentials()).await.unwrap();

    app.api.push_verify_otp(Ok(otp_rejected()));
    let err = app.engine.auth().verify_otp("000000").await.unwrap_err();

    assert!(matches!(err, EngineError::Authentication(_)));
    assert!(!app.engine.session().authenticated);
    assert!(app.engine.store().token_pair().is_none());
}

#[tokio::test]
async fn test_malformed_otp_code_is_rejected_locally() {
    let app = spawn_engine();
    app.engine.auth().login(credentials()).await.unwrap();

    let err = app.engine.auth().verify_otp("12ab56").await.unwrap_err();
    assert!(matches!(err, EngineError::Authentication(_)));
    assert_eq!(app.api.call_count("verify_otp"), 0);
}

#[tokio::test]
async fn test_resend_otp_requires_pending_login() {
    let app = spawn_engine();

    let err = app.engine.auth().resend_otp().await.unwrap_err();
    assert!(matches!(err, EngineError::MissingContext(_)));
    assert_eq!(app.api.call_count("resend_otp"), 0);

    app.engine.auth().login(credentials()).await.unwrap();
    app.engine.auth().resend_otp().await.unwrap();
    assert_eq!(app.api.call_count("resend_otp"), 1);
    assert!(!app.engine.session().authenticated);
}

#[tokio::test]
async fn test_login_without_verification_step_issues_no_tokens() {
    let app = spawn_engine();
    app.api.push_login(Ok(session_engine::dtos::auth::LoginResponse {
        success: true,
        requires_verification: false,
        message: None,
    }));

    let outcome = app.engine.auth().login(credentials()).await.unwrap();
    assert_eq!(outcome, LoginOutcome::Accepted);
    assert!(!app.engine.session().authenticated);
    assert!(app.engine.store().token_pair().is_none());
}

#[tokio::test]
async fn test_failed_login_is_authentication_error() {
    let app = spawn_engine();
    app.api.push_login(Ok(session_engine::dtos::auth::LoginResponse {
        success: false,
        requires_verification: false,
        message: Some("Bad credentials".to_string()),
    }));

    let err = app.engine.auth().login(credentials()).await.unwrap_err();
    assert!(matches!(err, EngineError::Authentication(_)));

    // A failed login leaves no correlation state behind
    let otp_err = app.engine.auth().verify_otp("123456").await.unwrap_err();
    assert!(matches!(otp_err, EngineError::MissingContext(_)));
}

#[tokio::test]
async fn test_complete_sign_up_requires_both_contexts() {
    let app = spawn_engine();

    // Nothing staged
    let err = app.engine.auth().complete_sign_up().await.unwrap_err();
    assert!(matches!(err, EngineError::MissingContext(_)));

    // Login only: organization data still missing
    app.engine.auth().login(credentials()).await.unwrap();
    let err = app.engine.auth().complete_sign_up().await.unwrap_err();
    assert!(matches!(err, EngineError::MissingContext(_)));
    assert_eq!(app.api.call_count("sign_up"), 0);

    // Both present: the merged payload is submitted, nobody authenticates
    app.engine.auth().stage_organization(OrgRegistration {
        name: "Acme AB".to_string(),
        organization_number: "556677-8899".to_string(),
        invoice_email: None,
    });
    app.engine.auth().complete_sign_up().await.unwrap();
    assert_eq!(app.api.call_count("sign_up"), 1);
    assert!(!app.engine.session().authenticated);
}

#[tokio::test]
async fn test_org_data_alone_is_not_enough_for_signup() {
    let app = spawn_engine();
    app.engine.auth().stage_organization(OrgRegistration {
        name: "Acme AB".to_string(),
        organization_number: "556677-8899".to_string(),
        invoice_email: Some("billing@acme.se".to_string()),
    });

    let err = app.engine.auth().complete_sign_up().await.unwrap_err();
    assert!(matches!(err, EngineError::MissingContext(_)));
    assert_eq!(app.api.call_count("sign_up"), 0);
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let app = spawn_engine();

    // Logging out while anonymous is a no-op, not an error
    app.engine.auth().logout().await.unwrap();
    assert_eq!(app.api.call_count("logout"), 0);

    // Authenticate, then log out
    let access = make_token(600);
    app.engine.auth().login(credentials()).await.unwrap();
    app.api.push_verify_otp(Ok(otp_success(&access, "refresh-1")));
    app.engine.auth().verify_otp("123456").await.unwrap();
    assert!(app.engine.session().authenticated);

    app.engine.auth().logout().await.unwrap();
    assert_eq!(app.api.call_count("logout"), 1);
    assert!(!app.engine.session().authenticated);
    assert!(app.engine.store().token_pair().is_none());

    // Pending state was reset together with the session
    let err = app.engine.auth().verify_otp("123456").await.unwrap_err();
    assert!(matches!(err, EngineError::MissingContext(_)));

    // Second logout stays a no-op
    app.engine.auth().logout().await.unwrap();
    assert_eq!(app.api.call_count("logout"), 1);
}

#[tokio::test]
async fn test_google_callback_authenticates_after_profile_fetch() {
    let app = spawn_engine();
    let pair = TokenPair::new(make_token(600), "refresh-g");

    app.api.push_profile(Ok(test_user()));
    let session = app
        .engine
        .auth()
        .handle_google_callback(pair.clone())
        .await
        .unwrap();

    assert!(session.authenticated);
    assert_eq!(session.user, Some(test_user()));
    assert_eq!(app.engine.store().token_pair(), Some(pair));
    assert_eq!(app.api.call_count("user_permissions"), 1);
}

#[tokio::test]
async fn test_google_callback_rolls_back_on_profile_failure() {
    let app = spawn_engine();
    let pair = TokenPair::new(make_token(600), "refresh-g");

    app.api.push_profile(Err("profile backend down".to_string()));
    let err = app.engine.auth().handle_google_callback(pair).await;

    assert!(err.is_err());
    assert!(!app.engine.session().authenticated);
    assert!(app.engine.store().token_pair().is_none());
}

#[tokio::test]
async fn test_verify_token_rotates_returned_pair() {
    let app = spawn_engine();
    let rotated_access = make_token(600);

    app.api
        .push_verify_token(Ok(verify_token_ok(Some((&rotated_access, "refresh-2")))));
    let valid = app
        .engine
        .auth()
        .verify_token(&make_token(600), "refresh-1")
        .await;

    assert!(valid);
    assert!(app.engine.session().authenticated);
    // The returned pair is authoritative and overwrites the submitted one
    assert_eq!(
        app.engine.store().token_pair(),
        Some(TokenPair::new(rotated_access, "refresh-2"))
    );
}

#[tokio::test]
async fn test_verify_token_keeps_submitted_pair_without_rotation() {
    let app = spawn_engine();
    let access = make_token(600);

    app.api.push_verify_token(Ok(verify_token_ok(None)));
    let valid = app.engine.auth().verify_token(&access, "refresh-1").await;

    assert!(valid);
    assert_eq!(
        app.engine.store().token_pair(),
        Some(TokenPair::new(access, "refresh-1"))
    );
}

#[tokio::test]
async fn test_verify_token_rejection_forces_logout() {
    let app = spawn_engine();

    // Default mock answer is valid == false
    let valid = app
        .engine
        .auth()
        .verify_token(&make_token(600), "refresh-1")
        .await;

    assert!(!valid);
    assert!(!app.engine.session().authenticated);
    assert!(app.engine.store().token_pair().is_none());
}

#[tokio::test]
async fn test_bootstrap_without_stored_tokens_stays_anonymous() {
    let app = spawn_engine();

    assert!(!app.engine.bootstrap().await);
    assert_eq!(app.api.call_count("verify_token"), 0);
    assert!(!app.engine.session().authenticated);
}

#[tokio::test]
async fn test_bootstrap_revalidates_stored_tokens() {
    let app = spawn_engine();
    let access = make_token(600);
    app.engine
        .store()
        .store_tokens(&TokenPair::new(access.clone(), "refresh-1"))
        .unwrap();

    app.api.push_verify_token(Ok(verify_token_ok(None)));
    assert!(app.engine.bootstrap().await);
    assert!(app.engine.session().authenticated);
    assert_eq!(app.api.call_count("verify_token"), 1);
}

#[tokio::test]
async fn test_delete_account_tears_session_down() {
    let app = spawn_engine();
    let access = make_token(600);
    app.engine.auth().login(credentials()).await.unwrap();
    app.api.push_verify_otp(Ok(otp_success(&access, "refresh-1")));
    app.engine.auth().verify_otp("123456").await.unwrap();

    app.engine.auth().delete_account().await.unwrap();

    assert_eq!(app.api.call_count("delete_account"), 1);
    assert!(!app.engine.session().authenticated);
    assert!(app.engine.store().token_pair().is_none());
}

#[tokio::test]
async fn test_change_password_requires_session() {
    let app = spawn_engine();

    let err = app
        .engine
        .auth()
        .change_password("OldPass1!", "NewPass12!")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Authentication(_)));
    assert_eq!(app.api.call_count("change_password"), 0);
}

#[tokio::test]
async fn test_weak_new_password_is_rejected_locally() {
    let app = spawn_engine();

    let err = app
        .engine
        .auth()
        .reset_password("reset-token", "short")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Policy(_)));
    assert_eq!(app.api.call_count("reset_password"), 0);
}

#[tokio::test]
async fn test_session_subscription_observes_flow() {
    let app = spawn_engine();
    let mut rx = app.engine.subscribe();
    let access = make_token(600);

    app.engine.auth().login(credentials()).await.unwrap();
    app.api.push_verify_otp(Ok(otp_success(&access, "refresh-1")));
    app.engine.auth().verify_otp("123456").await.unwrap();

    rx.changed().await.unwrap();
    assert!(rx.borrow_and_update().authenticated);

    app.engine.auth().logout().await.unwrap();
    rx.changed().await.unwrap();
    assert!(!rx.borrow_and_update().authenticated);
}
