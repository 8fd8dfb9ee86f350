//! Integration tests for Google sign-in through the router

mod test_utils;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
    };
    use mockito::Matcher;
    use tower::util::ServiceExt;
    use url::Url;

    use akitime_maker::api::app;
    use akitime_maker::application::commands::AppState;
    use akitime_maker::application::session::SessionManager;
    use akitime_maker::infrastructure::config::{DEFAULT_SCOPES, GoogleOAuthConfig};
    use akitime_maker::infrastructure::credential_store::InMemoryCredentialStore;
    use akitime_maker::infrastructure::google_calendar_client::ReqwestGoogleCalendarClient;
    use akitime_maker::infrastructure::oauth_client::ReqwestOAuthClient;

    use crate::test_utils::{body_to_json, test_config};

    /// Router backed by a real session manager whose token store keeps
    /// what it is given, with Google's token and calendar endpoints on
    /// `upstream`.
    fn session_app(upstream: &str) -> Router {
        let mut config = test_config(upstream);
        let oauth = GoogleOAuthConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            redirect_uri: "http://127.0.0.1:3000/auth/callback".to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|scope| scope.to_string()).collect(),
            token_endpoint: format!("{upstream}/token"),
            authorization_endpoint: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
        };
        config.oauth = Some(oauth.clone());

        let session = Arc::new(SessionManager::new(
            oauth,
            Arc::new(InMemoryCredentialStore::default()),
            Arc::new(ReqwestOAuthClient::new()),
        ));
        let state = AppState::new(
            config,
            session.clone(),
            Some(session),
            Arc::new(ReqwestGoogleCalendarClient::with_api_base(upstream)),
        );
        app(Arc::new(state))
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    /// Tests login, callback and a refresh that uses the stored session
    #[tokio::test]
    async fn it_signs_in_and_fetches_with_the_stored_session() {
        let mut server = mockito::Server::new_async().await;
        let token_mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "auth-code".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"access_token":"ya29.session","refresh_token":"1//refresh",
                    "expires_in":3599,"token_type":"Bearer"}"#,
            )
            .create_async()
            .await;
        let events_mock = server
            .mock("GET", "/calendars/primary/events")
            .match_header("authorization", "Bearer ya29.session")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"items":[{"id":"evt-1","summary":"定例",
                    "start":{"dateTime":"2025-08-04T10:00:00+09:00"},
                    "end":{"dateTime":"2025-08-04T11:00:00+09:00"}}]}"#,
            )
            .create_async()
            .await;
        let app = session_app(&server.url());

        // Nothing stored yet
        let response = app
            .clone()
            .oneshot(request("POST", "/api/events/refresh"))
            .await
            .unwrap();
        let body = body_to_json(response.into_body()).await;
        assert_eq!(body["status"], "failed");

        let response = app
            .clone()
            .oneshot(request("GET", "/auth/login"))
            .await
            .unwrap();
        assert!(response.status().is_redirection());
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .expect("redirect location");
        let consent = Url::parse(location).unwrap();
        assert_eq!(consent.host_str(), Some("accounts.google.com"));
        let oauth_state = consent
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("state parameter");

        let mut callback = Url::parse("http://localhost/auth/callback").unwrap();
        callback
            .query_pairs_mut()
            .append_pair("code", "auth-code")
            .append_pair("state", &oauth_state);
        let response = app
            .clone()
            .oneshot(request("GET", &format!("/auth/callback?{}", callback.query().unwrap())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_to_json(response.into_body()).await;
        assert_eq!(body["status"], "authenticated");
        token_mock.assert_async().await;

        let response = app
            .clone()
            .oneshot(request("POST", "/api/events/refresh"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_to_json(response.into_body()).await;
        assert_eq!(body["status"], "loaded");
        assert_eq!(body["events"][0]["title"], "定例");
        events_mock.assert_async().await;
    }

    /// Tests a callback with a state this server never issued is refused
    #[tokio::test]
    async fn it_rejects_a_forged_callback_state() {
        let server = mockito::Server::new_async().await;
        let app = session_app(&server.url());

        let response = app
            .oneshot(request("GET", "/auth/callback?code=auth-code&state=forged"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
