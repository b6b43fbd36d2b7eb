//! Fan out over accounts, fetch with each account's token, merge into one ordered set.

use crate::service::credentials::CredentialManager;
use crate::util::errors::AtelierResult;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{debug, warn};
use serde::Serialize;
use std::future::Future;

/// Records that sort on a point in time.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first (calendar).
    Ascending,
    /// Newest first (mail).
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedResultSet<T> {
    pub items: Vec<T>,
    /// Accounts that produced a usable token, whether or not their fetch returned anything.
    pub connected: Vec<String>,
}

pub fn sort_records<T: Timestamped>(items: &mut [T], order: SortOrder) {
    match order {
        SortOrder::Ascending => items.sort_by_key(|item| item.timestamp()),
        SortOrder::Descending => items.sort_by(|a, b| b.timestamp().cmp(&a.timestamp())),
    }
}

/// Fetch from every configured account and merge.
///
/// Accounts run concurrently; within one account the token lookup precedes the fetch.
/// An account without a token is skipped, and a failed fetch only loses that account's records.
pub async fn merge_accounts<T, F, Fut>(
    credentials: &CredentialManager,
    order: SortOrder,
    fetch: F,
) -> MergedResultSet<T>
where
    T: Timestamped,
    F: Fn(String, String) -> Fut,
    Fut: Future<Output = AtelierResult<Vec<T>>>,
{
    let fetch = &fetch;
    let per_account = credentials.accounts().iter().map(|account| async move {
        let token = match credentials.get_access_token(account).await {
            Some(token) => token,
            None => {
                debug!("Skipping account without token: account={}", account);
                return None;
            }
        };
        let records = match fetch(account.clone(), token).await {
            Ok(records) => records,
            Err(e) => {
                warn!("Account fetch failed: account={}, error={}", account, e);
                Vec::new()
            }
        };
        Some((account.clone(), records))
    });

    let mut merged = MergedResultSet {
        items: Vec::new(),
        connected: Vec::new(),
    };
    for (account, records) in join_all(per_account).await.into_iter().flatten() {
        merged.connected.push(account);
        merged.items.extend(records);
    }
    sort_records(&mut merged.items, order);
    merged
}
