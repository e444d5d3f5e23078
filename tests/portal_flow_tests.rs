use portal_harvest::core::kernel::HmacAlgorithm;
use portal_harvest::portal::{Credentials, FixedClock, PortalBuilder, SessionState};
use portal_harvest::{PortalConfig, SessionError};
use secrecy::Secret;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FIXTURE_CHECKCODE: &str = "F83F1BD0DD82BC04A0AD4FF835088561A9B133DC276FF996890CC27028C964F5";

const LOGIN_PAGE: &str = r#"<html><body>
<form action="/login" method="post">
  <input type="hidden" name="nonce" value="abc123">
  <input type="text" name="username">
  <input type="password" name="password">
</form>
</body></html>"#;

const TOKENS_PAGE: &str = r#"<html><body>
  <input type="hidden" id="access_token" value="AT1">
  <input type="hidden" id="openId" value="O1">
  <input type="hidden" id="userId" value="111">
  <input type="hidden" id="apiuser" value="U1">
  <input type="hidden" id="operateId" value="OP1">
  <input type="hidden" id="language" value="en">
</body></html>"#;

struct Portal {
    site: MockServer,
    api: MockServer,
}

impl Portal {
    async fn start() -> Self {
        Self {
            site: MockServer::start().await,
            api: MockServer::start().await,
        }
    }

    fn config(&self) -> PortalConfig {
        PortalConfig::new(
            &self.site.uri(),
            &self.api.uri(),
            "alice".to_string(),
            "s3cret pw".to_string(),
        )
        .signing_key("test-secret".to_string())
        .algorithm(HmacAlgorithm::Sha256)
    }

    fn builder(&self) -> PortalBuilder {
        PortalBuilder::new(self.config()).with_clock(Arc::new(FixedClock(1_700_000_000)))
    }

    async fn mount_login_page(&self) {
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "sid=anon; Path=/")
                    .set_body_string(LOGIN_PAGE),
            )
            .expect(1)
            .mount(&self.site)
            .await;
    }

    async fn mount_login(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(header("cookie", "sid=anon"))
            .and(body_string_contains("nonce=abc123"))
            .and(body_string_contains("username=alice"))
            .and(body_string_contains("password=s3cret+pw"))
            .respond_with(
                ResponseTemplate::new(status)
                    .insert_header("location", "/dashboard")
                    .insert_header("set-cookie", "sid=authed; Path=/; HttpOnly"),
            )
            .expect(1)
            .mount(&self.site)
            .await;
    }

    async fn mount_bulk_users(&self, body: &str) {
        Mock::given(method("POST"))
            .and(path("/api/users"))
            .and(header("cookie", "sid=authed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_string(body),
            )
            .expect(1)
            .mount(&self.site)
            .await;
    }

    async fn mount_tokens_page(&self, html: &str) {
        Mock::given(method("GET"))
            .and(path("/settings/tokens"))
            .and(header("cookie", "sid=authed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .expect(1)
            .mount(&self.site)
            .await;
    }

    async fn mount_signed_settings(&self, body: &str) {
        Mock::given(method("POST"))
            .and(path("/api/settings"))
            .and(header("cookie", "sid=authed"))
            .and(body_string_contains("timestamp=1700000000"))
            .and(body_string_contains(&format!("checkcode={}", FIXTURE_CHECKCODE)))
            .and(body_string_contains("access_token=AT1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_string(body),
            )
            .expect(1)
            .mount(&self.api)
            .await;
    }
}

fn credentials() -> Credentials {
    Credentials::new("alice", Secret::new("s3cret pw".to_string()))
}

#[tokio::test]
async fn test_end_to_end_appends_signed_user() {
    let portal = Portal::start().await;
    portal.mount_login_page().await;
    portal.mount_login(302).await;
    portal
        .mount_bulk_users(r#"[{"id":"1","firstName":"Ada","lastName":"L","email":"a@x.com"}]"#)
        .await;
    portal.mount_tokens_page(TOKENS_PAGE).await;
    portal
        .mount_signed_settings(r#"{"id":"2","firstName":"Bo","lastName":"K","email":"b@x.com"}"#)
        .await;

    let mut session = portal.builder().build().unwrap();
    let users = session.run(&credentials()).await.unwrap();

    assert_eq!(users.len(), 2);
    assert_eq!(users[0].id, "1");
    assert_eq!(users[1].id, "2");
    assert_eq!(users[1].first_name.as_deref(), Some("Bo"));
    assert_eq!(*session.state(), SessionState::Complete);
    assert_eq!(session.cookies().render(), "sid=authed");
}

#[tokio::test]
async fn test_end_to_end_omits_duplicate_signed_user() {
    let portal = Portal::start().await;
    portal.mount_login_page().await;
    portal.mount_login(302).await;
    portal
        .mount_bulk_users(r#"[{"id":"1","email":"a@x.com"},{"id":"3","email":"c@x.com"}]"#)
        .await;
    portal.mount_tokens_page(TOKENS_PAGE).await;
    portal
        .mount_signed_settings(r#"{"id":"1","email":"a@x.com"}"#)
        .await;

    let mut session = portal.builder().build().unwrap();
    let users = session.run(&credentials()).await.unwrap();

    let ids: Vec<&str> = users.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
}

#[tokio::test]
async fn test_login_without_redirect_fails_with_status() {
    let portal = Portal::start().await;
    portal.mount_login_page().await;
    portal.mount_login(200).await;

    let mut session = portal.builder().build().unwrap();
    let err = session.run(&credentials()).await.unwrap_err();

    match err {
        SessionError::UnexpectedStatus { ref context, status } => {
            assert_eq!(context, "login");
            assert_eq!(status, 200);
        }
        other => panic!("expected unexpected status, got {:?}", other),
    }
    assert!(matches!(session.state(), SessionState::Failed(_)));
}

#[tokio::test]
async fn test_login_rejection_statuses_carry_the_code() {
    for code in [304, 403, 500] {
        let portal = Portal::start().await;
        portal.mount_login_page().await;
        portal.mount_login(code).await;

        Mock::given(method("POST"))
            .and(path("/api/users"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(0)
            .mount(&portal.site)
            .await;

        let mut session = portal.builder().build().unwrap();
        let err = session.run(&credentials()).await.unwrap_err();

        match err {
            SessionError::UnexpectedStatus { ref context, status } => {
                assert_eq!(context, "login");
                assert_eq!(status, code);
            }
            other => panic!("expected unexpected status for {}, got {:?}", code, other),
        }
        assert!(matches!(session.state(), SessionState::Failed(_)));
    }
}

#[tokio::test]
async fn test_missing_settings_token_aborts_before_signed_call() {
    let portal = Portal::start().await;
    portal.mount_login_page().await;
    portal.mount_login(303).await;
    portal.mount_bulk_users("[]").await;
    portal
        .mount_tokens_page(&TOKENS_PAGE.replace("id=\"operateId\"", "id=\"operate\""))
        .await;

    Mock::given(method("POST"))
        .and(path("/api/settings"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&portal.api)
        .await;

    let mut session = portal.builder().build().unwrap();
    let err = session.run(&credentials()).await.unwrap_err();

    assert!(matches!(err, SessionError::Extraction { ref field } if field == "operateId"));
}

#[tokio::test]
async fn test_signed_call_rejection_surfaces_status() {
    let portal = Portal::start().await;
    portal.mount_login_page().await;
    portal.mount_login(302).await;
    portal.mount_bulk_users("[]").await;
    portal.mount_tokens_page(TOKENS_PAGE).await;

    Mock::given(method("POST"))
        .and(path("/api/settings"))
        .respond_with(ResponseTemplate::new(401).set_body_string("checkcode mismatch"))
        .expect(1)
        .mount(&portal.api)
        .await;

    let mut session = portal.builder().build().unwrap();
    let err = session.run(&credentials()).await.unwrap_err();

    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn test_unreachable_portal_is_transport_failure() {
    let config = PortalConfig::new(
        "http://127.0.0.1:9",
        "http://127.0.0.1:9",
        "alice".to_string(),
        "pw".to_string(),
    )
    .timeout_seconds(2);

    let mut session = PortalBuilder::new(config).build().unwrap();
    let err = session.run(&credentials()).await.unwrap_err();

    assert!(matches!(err, SessionError::Transport(_)));
}
