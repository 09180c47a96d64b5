use std::convert::Infallible;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::handlers::dispatcher::ToolDispatcher;
use crate::models::message::Message;

const MAX_BODY_BYTES: u64 = 512 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub history: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct ErrorMessage {
    pub error: String,
}

/// `GET /` and `POST /chat`. Pair with [`handle_rejection`] via `recover`.
pub fn routes(
    dispatcher: Arc<ToolDispatcher>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let health = warp::path::end()
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "status": "ok" })));

    let chat = warp::path("chat")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(warp::any().map(move || dispatcher.clone()))
        .and_then(handle_chat);

    health.or(chat)
}

pub async fn handle_chat(
    body: ChatRequest,
    dispatcher: Arc<ToolDispatcher>,
) -> Result<Response, Infallible> {
    match dispatcher.handle_turn(body.history, &body.query).await {
        Ok(messages) => Ok(warp::reply::json(&messages).into_response()),
        Err(err) => {
            error!(event_name = "http.chat_failed", error = %err, "chat turn failed");
            Ok(error_reply(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
        }
    }
}

pub async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let reply = if rejection.is_not_found() {
        error_reply(StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(err) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        error_reply(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
    } else if rejection.find::<warp::reject::UnsupportedMediaType>().is_some() {
        error_reply(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "expected an application/json body".to_string(),
        )
    } else if rejection.find::<warp::reject::LengthRequired>().is_some() {
        error_reply(StatusCode::LENGTH_REQUIRED, "content-length header required".to_string())
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        error_reply(StatusCode::PAYLOAD_TOO_LARGE, "request body too large".to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        error_reply(StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        error!(event_name = "http.unhandled_rejection", rejection = ?rejection, "unhandled rejection");
        error_reply(StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
    };
    Ok(reply)
}

pub fn error_reply(status: StatusCode, error: String) -> Response {
    warp::reply::with_status(warp::reply::json(&ErrorMessage { error }), status).into_response()
}
