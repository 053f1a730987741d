use super::*;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone)]
struct ServerState {
    status: StatusCode,
    body: String,
    received: Arc<Mutex<Vec<Value>>>,
}

async fn handle_recipe(
    State(state): State<ServerState>,
    Json(request): Json<Value>,
) -> (StatusCode, String) {
    state.received.lock().await.push(request);
    (state.status, state.body.clone())
}

async fn spawn_recipe_server(
    status: StatusCode,
    body: impl Into<String>,
) -> anyhow::Result<(Url, Arc<Mutex<Vec<Value>>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = ServerState {
        status,
        body: body.into(),
        received: received.clone(),
    };
    let app = Router::new()
        .route("/recipe", post(handle_recipe))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((Url::parse(&format!("http://{addr}/recipe"))?, received))
}

#[tokio::test]
async fn posts_the_prompt_and_returns_the_step_mapping() -> anyhow::Result<()> {
    let body = json!({
        "boil": {"procedure": "boil water", "measurements": [["water", "1 l"]], "time": "(5, 10)"},
        "salt": {"procedure": "salt it", "measurements": [], "time": null},
    });
    let (endpoint, received) = spawn_recipe_server(StatusCode::OK, body.to_string()).await?;

    let steps = RecipeSourceClient::new(endpoint).fetch("pasta").await?;
    let keys: Vec<&str> = steps.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["boil", "salt"]);
    assert_eq!(
        received.lock().await.as_slice(),
        &[json!({"user_prompt": "pasta"})]
    );
    Ok(())
}

#[tokio::test]
async fn error_field_surfaces_verbatim() -> anyhow::Result<()> {
    let (endpoint, _) = spawn_recipe_server(
        StatusCode::OK,
        json!({"error": "Prompt is not about food"}).to_string(),
    )
    .await?;

    let err = RecipeSourceClient::new(endpoint)
        .fetch("a car")
        .await
        .expect_err("service error");
    assert_eq!(err, FetchError::Service("Prompt is not about food".to_string()));
    assert_eq!(err.to_string(), "Prompt is not about food");
    Ok(())
}

#[tokio::test]
async fn error_status_with_message_prefers_the_message() -> anyhow::Result<()> {
    let (endpoint, _) = spawn_recipe_server(
        StatusCode::BAD_REQUEST,
        json!({"error": "user_prompt is required"}).to_string(),
    )
    .await?;

    let err = RecipeSourceClient::new(endpoint)
        .fetch(" ")
        .await
        .expect_err("service error");
    assert_eq!(err, FetchError::Service("user_prompt is required".to_string()));
    Ok(())
}

#[tokio::test]
async fn error_status_without_message_uses_the_generic_text() -> anyhow::Result<()> {
    let (endpoint, _) =
        spawn_recipe_server(StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").await?;

    let err = RecipeSourceClient::new(endpoint)
        .fetch("curry")
        .await
        .expect_err("service error");
    assert_eq!(err, FetchError::Service(DEFAULT_FETCH_ERROR.to_string()));
    Ok(())
}

#[tokio::test]
async fn non_json_success_is_an_invalid_body() -> anyhow::Result<()> {
    let (endpoint, _) = spawn_recipe_server(StatusCode::OK, "<html>").await?;

    let err = RecipeSourceClient::new(endpoint)
        .fetch("curry")
        .await
        .expect_err("invalid body");
    assert!(matches!(err, FetchError::InvalidBody(_)));
    Ok(())
}

#[tokio::test]
async fn array_body_is_an_invalid_body() -> anyhow::Result<()> {
    let (endpoint, _) = spawn_recipe_server(StatusCode::OK, "[1, 2]").await?;

    let err = RecipeSourceClient::new(endpoint)
        .fetch("curry")
        .await
        .expect_err("invalid body");
    assert_eq!(
        err,
        FetchError::InvalidBody("expected a mapping of steps, got an array".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn closed_port_is_unreachable() -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let endpoint = Url::parse(&format!("http://{addr}/recipe"))?;
    let err = RecipeSourceClient::new(endpoint)
        .fetch("curry")
        .await
        .expect_err("unreachable");
    assert!(matches!(err, FetchError::Unreachable(_)));
    Ok(())
}

#[tokio::test]
async fn missing_source_never_succeeds() {
    let err = MissingRecipeSource.fetch("curry").await.expect_err("missing");
    assert!(matches!(err, FetchError::Unreachable(_)));
}
