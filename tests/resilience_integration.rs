//! Retry behaviour against failing and conflicting servers

mod common;

use common::{context, fast_retry, jamf_env, jamf_server, no_results};
use jamf_uploader::JamfError;
use jamf_uploader::api::{ApiFamily, ApiRequest, JamfClient, ObjectType, RequestBody, RetryPolicy};
use jamf_uploader::api::resilience::{conflict_is_done, standard};
use jamf_uploader::processors::{CategoryUploader, Processor};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_server_errors_exhaust_five_attempts() {
    let server = jamf_server().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/categories"))
        .respond_with(no_results())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/categories"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(5)
        .mount(&server)
        .await;

    let env = jamf_env(&server).with("category_name", "Browsers");
    let uploader = CategoryUploader::from_env(&env).unwrap();
    let err = uploader.run(&context(env)).await.unwrap_err();

    match err.downcast_ref::<JamfError>() {
        Some(JamfError::Upload { attempts, status }) => {
            assert_eq!(*attempts, 5);
            assert_eq!(*status, Some(500));
        }
        other => panic!("expected upload error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transient_failure_recovers() {
    let server = jamf_server().await;

    Mock::given(method("POST"))
        .and(path("/JSSResource/policies/id/0"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/JSSResource/policies/id/0"))
        .respond_with(ResponseTemplate::new(201).set_body_string("<policy><id>77</id></policy>"))
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    let client = JamfClient::from_env(&jamf_env(&server)).unwrap();
    let client = JamfClient::new(client.settings().clone(), fast_retry()).unwrap();
    let request = ApiRequest::new(reqwest::Method::POST, ObjectType::Policy.create_path(), ApiFamily::Classic)
        .with_body(RequestBody::Xml(
            "<policy><general><name>Retry me</name></general></policy>".to_string(),
        ));

    let response = client.upload(&request, standard).await.unwrap();
    assert_eq!(response.status_code, 201);
    assert_eq!(response.object_id().as_deref(), Some("77"));
}

#[tokio::test]
async fn test_conflict_predicate_accepts_409() {
    let server = jamf_server().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/categories"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({"httpStatus": 409})))
        .expect(1)
        .mount(&server)
        .await;

    let client = JamfClient::new(
        JamfClient::from_env(&jamf_env(&server)).unwrap().settings().clone(),
        fast_retry(),
    )
    .unwrap();
    let request = ApiRequest::new(
        reqwest::Method::POST,
        ObjectType::Category.create_path(),
        ObjectType::Category.family(),
    )
    .with_body(RequestBody::Json(json!({"name": "Browsers", "priority": 10})));
    assert_eq!(request.family, ApiFamily::JamfPro);

    let response = RetryPolicy::new(fast_retry())
        .with_predicate(conflict_is_done)
        .execute(|| client.send(&request))
        .await
        .unwrap();
    assert_eq!(response.status_code, 409);
}
