use crate::error::ApiResult;
use crate::state::AppState;
use atelier_core::service::credentials::AccountStatus;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

pub async fn list_accounts(State(state): State<AppState>) -> Json<Vec<AccountStatus>> {
    Json(state.credentials.account_status().await)
}

pub async fn start(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> ApiResult<Redirect> {
    let url = state.credentials.begin_authorization(&account)?;
    tracing::info!("Starting account link: account={}", account);
    Ok(Redirect::temporary(&url))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Consent redirect target. Always answers with the popup page so the opener hears back.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let outcome = match (query.error, query.code, query.state) {
        (Some(error), _, _) => Err((StatusCode::BAD_REQUEST, error)),
        (None, Some(code), Some(auth_state)) => state
            .credentials
            .complete_authorization(&code, &auth_state)
            .await
            .map_err(|e| {
                let api: crate::error::ApiError = e.into();
                (api.status, api.message)
            }),
        _ => Err((StatusCode::BAD_REQUEST, "missing code or state".to_string())),
    };

    match outcome {
        Ok(status) => (
            StatusCode::OK,
            popup_page(json!({ "type": "atelier:connected", "account": status })),
        )
            .into_response(),
        Err((code, message)) => {
            tracing::warn!("Account link failed: {}", message);
            (code, popup_page(json!({ "type": "atelier:error", "error": message })))
                .into_response()
        }
    }
}

pub async fn disconnect(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> ApiResult<StatusCode> {
    state.credentials.disconnect(&account).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn popup_page(message: Value) -> Html<String> {
    // `<` is escaped so the payload cannot close the script element.
    let payload = message.to_string().replace('<', "\\u003c");
    Html(format!(
        "<!doctype html><html><body><script>\
         if (window.opener) {{ window.opener.postMessage({payload}, '*'); }}\
         window.close();\
         </script></body></html>"
    ))
}
