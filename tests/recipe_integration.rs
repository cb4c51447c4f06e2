mod common;

use common::{fast_retry, jamf_env, jamf_server, no_results};
use jamf_uploader::processors::{Outcome, ProcessorKind};
use jamf_uploader::recipe::{Recipe, run_recipe};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_category_then_slack() {
    let server = jamf_server().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/categories"))
        .respond_with(no_results())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/categories"))
        .and(body_json(json!({"name": "Browsers", "priority": 5})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "11", "href": "x"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/slack"))
        .and(body_string_contains("category: Browsers"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let recipe = Recipe::parse(&format!(
        r#"
description = "Upload a category and tell Slack"

[input]
CATEGORY = "Browsers"

[[process]]
processor = "JamfCategoryUploader"
[process.arguments]
category_name = "%CATEGORY%"
category_priority = "5"

[[process]]
processor = "JamfSlackNotifier"
[process.arguments]
slack_webhook_url = "{}/slack"
"#,
        server.uri()
    ))
    .unwrap();

    let run = run_recipe(&recipe, jamf_env(&server), Some(fast_retry())).await.unwrap();

    assert_eq!(run.steps.len(), 2);
    assert_eq!(run.steps[0].processor, ProcessorKind::JamfCategoryUploader);
    assert_eq!(run.steps[0].output.outcome, Outcome::Created);
    assert_eq!(run.steps[1].output.outcome, Outcome::Sent);
    assert_eq!(run.env.string("category_id").as_deref(), Some("11"));
    assert!(run.env.contains("jamfcategoryuploader_summary_result"));
}

#[tokio::test]
async fn test_failed_step_stops_the_recipe() {
    let server = jamf_server().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/categories"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/slack"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let recipe = Recipe::parse(&format!(
        r#"
[[process]]
processor = "JamfCategoryUploader"
[process.arguments]
category_name = "Browsers"

[[process]]
processor = "JamfSlackNotifier"
[process.arguments]
slack_webhook_url = "{}/slack"
"#,
        server.uri()
    ))
    .unwrap();

    let err = run_recipe(&recipe, jamf_env(&server), Some(fast_retry())).await.unwrap_err();
    assert!(format!("{:#}", err).contains("JamfCategoryUploader failed"));
}
