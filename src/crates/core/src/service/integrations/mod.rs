//! Read-only provider integrations merged across accounts.

pub mod calendar;
pub mod mail;
pub mod merge;

pub use calendar::{
    CalendarEvent, GoogleCalendarClient, DEFAULT_CALENDAR_WINDOW_DAYS, DEFAULT_GOOGLE_API_BASE,
};
pub use mail::{GmailClient, MailMessage, DEFAULT_MAIL_QUERY};
pub use merge::{merge_accounts, sort_records, MergedResultSet, SortOrder, Timestamped};
