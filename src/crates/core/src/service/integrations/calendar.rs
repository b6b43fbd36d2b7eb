//! Google Calendar fetcher

use super::merge::Timestamped;
use crate::util::errors::AtelierResult;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_GOOGLE_API_BASE: &str = "https://www.googleapis.com";
pub const DEFAULT_CALENDAR_WINDOW_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub account: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub location: Option<String>,
    pub link: Option<String>,
}

impl Timestamped for CalendarEvent {
    fn timestamp(&self) -> DateTime<Utc> {
        self.start
    }
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<GoogleEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    id: String,
    summary: Option<String>,
    start: Option<EventTime>,
    end: Option<EventTime>,
    location: Option<String>,
    html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: Option<DateTime<FixedOffset>>,
    date: Option<NaiveDate>,
}

impl EventTime {
    /// Instant plus whether it came from an all-day `date`.
    fn resolve(&self) -> Option<(DateTime<Utc>, bool)> {
        if let Some(date_time) = self.date_time {
            return Some((date_time.with_timezone(&Utc), false));
        }
        self.date
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| (naive.and_utc(), true))
    }
}

fn normalize_event(event: GoogleEvent, account: &str) -> Option<CalendarEvent> {
    let (start, all_day) = event.start.as_ref()?.resolve()?;
    Some(CalendarEvent {
        id: event.id,
        account: account.to_string(),
        title: event.summary.unwrap_or_else(|| "(no title)".to_string()),
        start,
        end: event.end.as_ref().and_then(EventTime::resolve).map(|(end, _)| end),
        all_day,
        location: event.location,
        link: event.html_link,
    })
}

#[derive(Clone)]
pub struct GoogleCalendarClient {
    client: reqwest::Client,
    base_url: String,
    window_days: u32,
    max_results: u32,
}

impl GoogleCalendarClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            window_days: DEFAULT_CALENDAR_WINDOW_DAYS,
            max_results: 50,
        }
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }

    /// One page of upcoming events from the primary calendar.
    pub async fn list_upcoming(
        &self,
        access_token: &str,
        account: &str,
    ) -> AtelierResult<Vec<CalendarEvent>> {
        let now = Utc::now();
        let time_min = now.to_rfc3339();
        let time_max = now
            .checked_add_signed(Duration::days(i64::from(self.window_days)))
            .unwrap_or(now)
            .to_rfc3339();
        let max_results = self.max_results.to_string();

        let response = self
            .client
            .get(format!("{}/calendar/v3/calendars/primary/events", self.base_url))
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", max_results.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let events: EventsResponse = response.json().await?;
        debug!(
            "Calendar page fetched: account={}, events={}",
            account,
            events.items.len()
        );
        Ok(events
            .items
            .into_iter()
            .filter_map(|event| normalize_event(event, account))
            .collect())
    }
}
