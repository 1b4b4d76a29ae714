//! Event Catalog
//!
//! Fetches the event collection and narrows it with client-side filters.
//! Fetch failures never escape as errors: views always get a snapshot,
//! possibly empty, with the failure recorded next to it.
//!
//! A catalog built [`with_sync`](EventCatalog::with_sync) keeps its events in
//! the sync channel, so reads see the live attendee counts.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::api::{Event, EventApi};
use crate::error::ClientError;
use crate::sync::EnrollmentSync;

/// Category selector; `All` disables the filter
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == "All" {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(value.to_string())
        }
    }

    fn matches(&self, event: &Event) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => event.category == *category,
        }
    }
}

/// Date partition relative to the current time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    Upcoming,
    Past,
    Any,
}

impl DateFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Some(DateFilter::Upcoming),
            "past" => Some(DateFilter::Past),
            "any" | "all" => Some(DateFilter::Any),
            _ => None,
        }
    }

    /// Events with an unreadable date fall in neither partition
    fn matches(&self, event: &Event, now: DateTime<Utc>) -> bool {
        match self {
            DateFilter::Any => true,
            DateFilter::Upcoming => parse_event_date(&event.date).is_some_and(|d| d >= now),
            DateFilter::Past => parse_event_date(&event.date).is_some_and(|d| d < now),
        }
    }
}

/// Filters applied to the catalog, combined with AND
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventFilter {
    pub category: CategoryFilter,
    pub date: DateFilter,
    pub search: String,
}

impl EventFilter {
    /// Filter that keeps every event
    pub fn all() -> Self {
        Self {
            category: CategoryFilter::All,
            date: DateFilter::Any,
            search: String::new(),
        }
    }

    fn matches_search(&self, event: &Event) -> bool {
        let needle = self.search.trim();
        needle.is_empty() || event.name.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// Parse the date formats the service emits
///
/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM[:SS]` (taken as UTC)
/// and plain dates (midnight UTC).
pub fn parse_event_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Apply filters against the wall clock
pub fn apply_filters(events: &[Event], filter: &EventFilter) -> Vec<Event> {
    apply_filters_at(events, filter, Utc::now())
}

/// Apply filters against an explicit clock: category, then date, then text
pub fn apply_filters_at(events: &[Event], filter: &EventFilter, now: DateTime<Utc>) -> Vec<Event> {
    events
        .iter()
        .filter(|e| filter.category.matches(e))
        .filter(|e| filter.date.matches(e, now))
        .filter(|e| filter.matches_search(e))
        .cloned()
        .collect()
}

/// Result of a catalog fetch as seen by a view
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub events: Vec<Event>,
    /// User-facing message of the last failure, if the fetch failed
    pub error: Option<String>,
}

impl CatalogSnapshot {
    fn failed(err: &ClientError) -> Self {
        Self {
            events: Vec::new(),
            error: Some(err.user_message()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Read side of the event service
#[derive(Clone)]
pub struct EventCatalog {
    api: Arc<dyn EventApi>,
    latest: Arc<RwLock<CatalogSnapshot>>,
    live: Option<EnrollmentSync>,
}

impl EventCatalog {
    pub fn new(api: Arc<dyn EventApi>) -> Self {
        Self {
            api,
            latest: Arc::new(RwLock::new(CatalogSnapshot::default())),
            live: None,
        }
    }

    /// Catalog whose events live in the sync channel
    pub fn with_sync(api: Arc<dyn EventApi>, sync: EnrollmentSync) -> Self {
        Self {
            live: Some(sync),
            ..Self::new(api)
        }
    }

    /// Fetch every event
    pub async fn fetch_all(&self) -> CatalogSnapshot {
        let snapshot = match self.api.list_events().await {
            Ok(events) => {
                tracing::debug!(count = events.len(), "Fetched event catalog");
                CatalogSnapshot {
                    events,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch event catalog");
                CatalogSnapshot::failed(&e)
            }
        };

        let mut latest = self.latest.write().await;
        match &self.live {
            Some(sync) => {
                sync.load_events(snapshot.events.clone()).await;
                latest.error = snapshot.error.clone();
            }
            None => *latest = snapshot.clone(),
        }
        snapshot
    }

    /// Fetch a single event as a one-element snapshot
    pub async fn fetch_one(&self, id: &str) -> CatalogSnapshot {
        match self.api.get_event(id).await {
            Ok(event) => CatalogSnapshot {
                events: vec![event],
                error: None,
            },
            Err(e) => {
                tracing::warn!(event_id = %id, error = %e, "Failed to fetch event");
                CatalogSnapshot::failed(&e)
            }
        }
    }

    /// Refetch after a mutation
    pub async fn refresh(&self) -> CatalogSnapshot {
        self.fetch_all().await
    }

    /// Last snapshot produced by [`fetch_all`](Self::fetch_all)
    ///
    /// With a sync channel attached the events carry live attendee counts.
    pub async fn latest(&self) -> CatalogSnapshot {
        let latest = self.latest.read().await;
        match &self.live {
            Some(sync) => CatalogSnapshot {
                events: sync.events().await,
                error: latest.error.clone(),
            },
            None => latest.clone(),
        }
    }

    /// Last snapshot with filters applied
    pub async fn filtered(&self, filter: &EventFilter) -> Vec<Event> {
        apply_filters(&self.latest().await.events, filter)
    }
}
