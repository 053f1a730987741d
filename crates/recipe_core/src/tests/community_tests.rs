use super::*;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::TimeZone;
use serde_json::{json, Value};
use shared::domain::{Measurement, Step, TimeRange};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex};

fn recipe() -> Recipe {
    Recipe::from_steps(vec![Step {
        procedure: "toast the cumin".to_string(),
        measurements: vec![Measurement::new("cumin", "1 tsp")],
        time: TimeRange::new(Some(1), Some(2)),
    }])
    .expect("recipe")
}

fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, 18, 30, 0)
        .single()
        .expect("timestamp")
}

fn draft() -> PostDraft {
    PostDraft {
        title: "  Jeera Rice ".to_string(),
        description: "weeknight staple".to_string(),
        images: vec!["https://img.example/rice.jpg".to_string()],
        tags: parse_tags("rice, quick ,,vegan"),
    }
}

#[test]
fn tags_are_split_trimmed_and_filtered() {
    assert_eq!(parse_tags("a, b ,,c"), vec!["a", "b", "c"]);
    assert!(parse_tags(" , ,").is_empty());
    assert!(parse_tags("").is_empty());
}

#[test]
fn images_embed_as_data_urls() {
    assert_eq!(image_data_url("image/png", b"hi"), "data:image/png;base64,aGk=");
}

#[test]
fn request_payload_is_camel_case() {
    let request = draft()
        .into_request("user-42", &recipe(), created_at())
        .expect("request");

    let value = serde_json::to_value(&request).expect("json");
    assert_eq!(
        value,
        json!({
            "ownerId": "user-42",
            "post": {
                "title": "Jeera Rice",
                "description": "weeknight staple",
                "images": ["https://img.example/rice.jpg"],
                "recipe": {
                    "step1": {
                        "procedure": "toast the cumin",
                        "measurements": [["cumin", "1 tsp"]],
                        "time": [1, 2]
                    }
                },
                "tags": ["rice", "quick", "vegan"],
                "createdAt": "2024-03-09T18:30:00Z"
            }
        })
    );
}

#[test]
fn title_and_owner_are_required() {
    let untitled = PostDraft {
        title: "   ".to_string(),
        ..draft()
    };
    assert_eq!(
        untitled.into_request("user-42", &recipe(), created_at()),
        Err(PublishError::MissingTitle)
    );
    assert_eq!(
        draft().into_request("", &recipe(), created_at()),
        Err(PublishError::MissingOwner)
    );
}

async fn spawn_feed_server(
    status: StatusCode,
) -> anyhow::Result<(Url, Arc<Mutex<Vec<Value>>>)> {
    async fn handle_post(
        State((status, received)): State<(StatusCode, Arc<Mutex<Vec<Value>>>)>,
        Json(body): Json<Value>,
    ) -> StatusCode {
        received.lock().await.push(body);
        status
    }

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/posts", post(handle_post))
        .with_state((status, received.clone()));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((Url::parse(&format!("http://{addr}/posts"))?, received))
}

#[tokio::test]
async fn publish_posts_the_request_body() -> anyhow::Result<()> {
    let (endpoint, received) = spawn_feed_server(StatusCode::CREATED).await?;
    let request = draft().into_request("user-42", &recipe(), created_at())?;

    CommunityClient::new(endpoint).publish(&request).await?;

    let received = received.lock().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["ownerId"], "user-42");
    assert_eq!(received[0]["post"]["createdAt"], "2024-03-09T18:30:00Z");
    Ok(())
}

#[tokio::test]
async fn publish_reports_rejection_status() -> anyhow::Result<()> {
    let (endpoint, _) = spawn_feed_server(StatusCode::UNPROCESSABLE_ENTITY).await?;
    let request = draft().into_request("user-42", &recipe(), created_at())?;

    let err = CommunityClient::new(endpoint)
        .publish(&request)
        .await
        .expect_err("rejected");
    assert_eq!(err, PublishError::Rejected { status: 422 });
    Ok(())
}
