use pretty_assertions::assert_eq;
use serde_json::json;
use tale_core::settings::{SettingDefault, SettingEntry};
use tale_core::{ApiKeyBinding, ImportRequest, JobId, JobStatus, KeyType, TaleParameters};
use tale_engine::{fetch_all_images, ApiErrorKind, ApiSettings, RestClient, TaleApi};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> RestClient {
    RestClient::new(ApiSettings {
        base_url: format!("{}/api/v1", server.uri()),
        token: Some("secret-token".to_string()),
        cookie: Some("girderToken=secret-token".to_string()),
        ..ApiSettings::default()
    })
    .unwrap()
}

#[tokio::test]
async fn import_posts_form_and_returns_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tale/import"))
        .and(header("Girder-Token", "secret-token"))
        .and(body_string_contains("imageId=img1"))
        .and(body_string_contains("url=doi%3A10.5065%2FD6862DM8"))
        .and(body_string_contains("taleKwargs=%7B%22title%22%3A%22My+Tale%22%7D"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_id": "job1", "status": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .import_tale(&ImportRequest {
            url: "doi:10.5065/D6862DM8".to_string(),
            image_id: "img1".to_string(),
            tale_kwargs: TaleParameters {
                title: "My Tale".to_string(),
            },
        })
        .await
        .unwrap();

    assert_eq!(response.id, JobId::new("job1"));
    assert_eq!(response.status, Some(JobStatus::Queued));
}

#[tokio::test]
async fn server_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/job/job9/result"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Job has no result", "type": "rest"})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .job_result(&JobId::new("job9"))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::HttpStatus(400));
    assert_eq!(err.message, "Job has no result");
}

#[tokio::test]
async fn non_json_error_falls_back_to_status_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/account"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = client(&server).list_accounts("http://host/").await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::HttpStatus(502));
    assert!(err.message.contains("502"));
}

#[tokio::test]
async fn images_are_paged_until_short_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/image"))
        .and(query_param("limit", "2"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"_id": "a", "name": "Jupyter"},
            {"_id": "b", "name": "RStudio"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/image"))
        .and(query_param("limit", "2"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"_id": "c", "name": "OpenRefine"}])))
        .expect(1)
        .mount(&server)
        .await;

    let images = fetch_all_images(&client(&server), 2).await.unwrap();

    let names: Vec<&str> = images.iter().map(|image| image.name.as_str()).collect();
    assert_eq!(names, vec!["Jupyter", "RStudio", "OpenRefine"]);
}

#[tokio::test]
async fn accounts_are_requested_with_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/account"))
        .and(query_param("redirect", "http://host/#ext_keys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "orcid", "fullName": "ORCID", "type": "bearer", "state": "authorized", "url": ""}
        ])))
        .mount(&server)
        .await;

    let providers = client(&server)
        .list_accounts("http://host/#ext_keys")
        .await
        .unwrap();

    assert_eq!(providers.len(), 1);
    assert_eq!(providers[0].display_name(), "ORCID");
}

#[tokio::test]
async fn targets_accept_names_and_objects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/account/zenodo/targets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            "zenodo.org",
            {"resource_server": "sandbox.zenodo.org"}
        ])))
        .mount(&server)
        .await;

    let targets = client(&server).account_targets("zenodo").await.unwrap();

    assert_eq!(targets, vec!["zenodo.org", "sandbox.zenodo.org"]);
}

#[tokio::test]
async fn key_binding_posts_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/account/zenodo/key"))
        .and(body_string_contains("resource_server=zenodo.org"))
        .and(body_string_contains("key=abc123"))
        .and(body_string_contains("key_type=apikey"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .add_account_key(&ApiKeyBinding {
            provider: "zenodo".to_string(),
            resource_server: "zenodo.org".to_string(),
            key: "abc123".to_string(),
            key_type: KeyType::ApiKey,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn revoke_sends_resource_server_only_when_given() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/account/zenodo/revoke"))
        .and(query_param("resource_server", "zenodo.org"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/account/orcid/revoke"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    client.revoke_account("zenodo", Some("zenodo.org")).await.unwrap();
    client.revoke_account("orcid", None).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let orcid = requests
        .iter()
        .find(|request| request.url.path().ends_with("orcid/revoke"))
        .unwrap();
    assert_eq!(orcid.url.query(), None);
}

#[tokio::test]
async fn preauthorization_sends_cookie_and_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/portal/token"))
        .and(header("Cookie", "girderToken=secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  a.b.c\n"))
        .mount(&server)
        .await;

    let body = client(&server)
        .fetch_preauthorization(&format!("{}/portal/token", server.uri()))
        .await
        .unwrap();

    assert_eq!(body, "  a.b.c\n");
}

#[tokio::test]
async fn settings_are_read_and_written() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/system/setting"))
        .and(query_param("list", r#"["wholetale.instance_cap"]"#))
        .and(query_param("default", "default"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"wholetale.instance_cap": 2})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/system/setting"))
        .and(body_string_contains("list="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([true])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let settings = client
        .get_settings(&["wholetale.instance_cap"], SettingDefault::Default)
        .await
        .unwrap();
    assert_eq!(settings.get("wholetale.instance_cap"), Some(&json!(2)));

    client
        .put_settings(&[SettingEntry {
            key: "wholetale.instance_cap".to_string(),
            value: json!("3"),
        }])
        .await
        .unwrap();
}

#[tokio::test]
async fn invalid_base_url_is_rejected() {
    let err = RestClient::new(ApiSettings {
        base_url: "not a url".to_string(),
        ..ApiSettings::default()
    })
    .unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::InvalidUrl);
}
