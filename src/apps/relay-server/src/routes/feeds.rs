use crate::state::AppState;
use atelier_core::service::integrations::{CalendarEvent, MailMessage};
use atelier_core::{merge_accounts, MergedResultSet, SortOrder};
use axum::{extract::State, Json};

/// Upcoming events across every linked account, soonest first.
pub async fn calendar(State(state): State<AppState>) -> Json<MergedResultSet<CalendarEvent>> {
    let client = &state.calendar;
    let merged = merge_accounts(&state.credentials, SortOrder::Ascending, |account, token| async move {
        client.list_upcoming(&token, &account).await
    })
    .await;
    Json(merged)
}

/// Recent inbox messages across every linked account, newest first.
pub async fn mail(State(state): State<AppState>) -> Json<MergedResultSet<MailMessage>> {
    let client = &state.mail;
    let merged = merge_accounts(&state.credentials, SortOrder::Descending, |account, token| async move {
        client.list_recent(&token, &account).await
    })
    .await;
    Json(merged)
}
