// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Paged public gallery feed.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::MutationResult;
use crate::types::ImageId;

/// Filter value meaning "no filter".
pub const ALL: &str = "All";

/// Gallery listing filters. `None` means no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedFilters {
    /// Image category.
    pub category: Option<String>,
    /// Image status.
    pub status: Option<String>,
    /// Uploader role.
    pub role: Option<String>,
}

impl FeedFilters {
    /// Builds filters from form values, where `"All"` or empty means no filter.
    pub fn from_values(category: &str, status: &str, role: &str) -> Self {
        Self {
            category: normalize(category),
            status: normalize(status),
            role: normalize(role),
        }
    }

    /// Sets the category filter.
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = normalize(category);
        self
    }

    /// Query parameters for the active filters, in a fixed order.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("category", self.category.as_deref()),
            ("status", self.status.as_deref()),
            ("role", self.role.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }
}

fn normalize(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty() && value != ALL).then(|| value.to_string())
}

/// One image in a feed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSummary {
    /// Backend id.
    #[serde(rename = "_id")]
    pub id: ImageId,
    /// Title.
    #[serde(default)]
    pub name: String,
    /// Category.
    #[serde(default)]
    pub category: String,
    /// Image URL.
    #[serde(rename = "img", default)]
    pub url: String,
    /// Uploader email.
    #[serde(rename = "userEmail", default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    /// Uploader display name.
    #[serde(rename = "userName", default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
}

/// Response of `GET /images`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPage {
    /// Images on this page.
    #[serde(default)]
    pub images: Vec<ImageSummary>,
    /// More pages exist.
    #[serde(rename = "hasMore", default)]
    pub has_more: bool,
}

/// Gallery listing endpoint.
#[async_trait]
pub trait GalleryApi: Send + Sync {
    /// Loads one page, starting at 1.
    async fn page(&self, page: u32, filters: &FeedFilters) -> MutationResult<FeedPage>;

    /// Backend name for logging.
    fn name(&self) -> &str {
        "gallery-api"
    }
}

#[derive(Debug)]
struct FeedState {
    filters: FeedFilters,
    next_page: u32,
    images: Vec<ImageSummary>,
    seen: HashSet<ImageId>,
    has_more: bool,
    in_flight: bool,
    generation: u64,
}

impl FeedState {
    fn reset(filters: FeedFilters, generation: u64) -> Self {
        Self {
            filters,
            next_page: 1,
            images: Vec::new(),
            seen: HashSet::new(),
            has_more: true,
            in_flight: false,
            generation,
        }
    }
}

/// Clears `in_flight` when a load finishes or its future is dropped.
struct InFlight<'a> {
    state: &'a Mutex<FeedState>,
    generation: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        // A reset already cleared the flag for the new filters.
        if state.generation == self.generation {
            state.in_flight = false;
        }
    }
}

/// Infinite-scroll gallery state.
pub struct GalleryFeed {
    api: Arc<dyn GalleryApi>,
    state: Mutex<FeedState>,
}

impl GalleryFeed {
    /// Creates an empty feed with no filters.
    pub fn new(api: Arc<dyn GalleryApi>) -> Self {
        Self {
            api,
            state: Mutex::new(FeedState::reset(FeedFilters::default(), 0)),
        }
    }

    /// Loads the next page.
    ///
    /// Returns the number of images added. A no-op while a page is in flight
    /// or after the last page. On error the feed is unchanged.
    pub async fn load_next(&self) -> MutationResult<usize> {
        let (page, filters, generation) = {
            let mut state = self.state.lock();
            if state.in_flight || !state.has_more {
                return Ok(0);
            }
            state.in_flight = true;
            (state.next_page, state.filters.clone(), state.generation)
        };

        let in_flight = InFlight {
            state: &self.state,
            generation,
        };
        let result = self.api.page(page, &filters).await;
        drop(in_flight);

        let mut state = self.state.lock();
        if state.generation != generation {
            debug!(page, "Dropping page loaded for previous filters");
            return Ok(0);
        }

        let loaded = match result {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(page, error = %e, "Failed to load gallery page");
                return Err(e);
            }
        };

        let mut added = 0;
        for image in loaded.images {
            if state.seen.insert(image.id.clone()) {
                state.images.push(image);
                added += 1;
            }
        }
        state.has_more = loaded.has_more;
        state.next_page += 1;
        debug!(page, added, has_more = state.has_more, "Gallery page loaded");
        Ok(added)
    }

    /// Replaces the filters and resets to page 1.
    pub fn set_filters(&self, filters: FeedFilters) {
        let mut state = self.state.lock();
        let generation = state.generation + 1;
        *state = FeedState::reset(filters, generation);
    }

    /// Loaded images in display order.
    pub fn images(&self) -> Vec<ImageSummary> {
        self.state.lock().images.clone()
    }

    /// Current filters.
    pub fn filters(&self) -> FeedFilters {
        self.state.lock().filters.clone()
    }

    /// More pages may exist.
    pub fn has_more(&self) -> bool {
        self.state.lock().has_more
    }

    /// A page is in flight.
    pub fn is_loading(&self) -> bool {
        self.state.lock().in_flight
    }

    /// Page the next `load_next` requests.
    pub fn next_page(&self) -> u32 {
        self.state.lock().next_page
    }
}

impl fmt::Debug for GalleryFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("GalleryFeed")
            .field("api", &self.api.name())
            .field("images", &state.images.len())
            .field("next_page", &state.next_page)
            .field("has_more", &state.has_more)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MutationError;
    use tokio::sync::Notify;

    fn image(id: &str) -> ImageSummary {
        ImageSummary {
            id: ImageId::new(id),
            name: format!("Image {id}"),
            category: "Nature".to_string(),
            url: format!("https://cdn.test/{id}.jpg"),
            owner_email: None,
            owner_name: None,
        }
    }

    #[derive(Default)]
    struct FakeGalleryApi {
        pages: Mutex<Vec<MutationResult<FeedPage>>>,
        requests: Mutex<Vec<(u32, FeedFilters)>>,
        hold: Option<Arc<Notify>>,
    }

    impl FakeGalleryApi {
        fn with_pages(pages: Vec<MutationResult<FeedPage>>) -> Self {
            Self {
                pages: Mutex::new(pages),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl GalleryApi for FakeGalleryApi {
        async fn page(&self, page: u32, filters: &FeedFilters) -> MutationResult<FeedPage> {
            self.requests.lock().push((page, filters.clone()));
            if let Some(hold) = &self.hold {
                hold.notified().await;
            }
            let mut pages = self.pages.lock();
            if pages.is_empty() {
                return Ok(FeedPage::default());
            }
            pages.remove(0)
        }
    }

    #[test]
    fn test_filters_treat_all_as_none() {
        let filters = FeedFilters::from_values("Nature", "All", "");
        assert_eq!(filters.category.as_deref(), Some("Nature"));
        assert_eq!(filters.status, None);
        assert_eq!(filters.role, None);
        assert_eq!(filters.query_pairs(), vec![("category", "Nature")]);
    }

    #[tokio::test]
    async fn test_pages_dedupe_and_stop() {
        let api = Arc::new(FakeGalleryApi::with_pages(vec![
            Ok(FeedPage {
                images: vec![image("1"), image("2")],
                has_more: true,
            }),
            Ok(FeedPage {
                images: vec![image("2"), image("3")],
                has_more: false,
            }),
        ]));
        let feed = GalleryFeed::new(api.clone());

        assert_eq!(feed.load_next().await.unwrap(), 2);
        assert_eq!(feed.load_next().await.unwrap(), 1);
        assert!(!feed.has_more());
        assert_eq!(feed.load_next().await.unwrap(), 0);

        let ids: Vec<String> = feed.images().iter().map(|i| i.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(api.requests.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_in_flight_load_is_not_duplicated() {
        let hold = Arc::new(Notify::new());
        let api = Arc::new(FakeGalleryApi {
            pages: Mutex::new(vec![Ok(FeedPage {
                images: vec![image("1")],
                has_more: true,
            })]),
            requests: Mutex::new(Vec::new()),
            hold: Some(hold.clone()),
        });
        let feed = GalleryFeed::new(api.clone());

        let (first, second) = tokio::join!(feed.load_next(), async {
            tokio::task::yield_now().await;
            let second = feed.load_next().await;
            hold.notify_one();
            second
        });
        assert_eq!(first.unwrap(), 1);
        assert_eq!(second.unwrap(), 0);
        assert_eq!(api.requests.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_load_releases_feed() {
        let hold = Arc::new(Notify::new());
        let api = Arc::new(FakeGalleryApi {
            pages: Mutex::new(vec![Ok(FeedPage {
                images: vec![image("1"), image("2")],
                has_more: true,
            })]),
            requests: Mutex::new(Vec::new()),
            hold: Some(hold.clone()),
        });
        let feed = GalleryFeed::new(api.clone());

        let cancelled =
            tokio::time::timeout(std::time::Duration::from_millis(10), feed.load_next()).await;
        assert!(cancelled.is_err());
        assert!(!feed.is_loading());
        assert_eq!(feed.next_page(), 1);

        hold.notify_one();
        assert_eq!(feed.load_next().await.unwrap(), 2);
        assert_eq!(feed.next_page(), 2);
        let pages: Vec<u32> = api.requests.lock().iter().map(|(page, _)| *page).collect();
        assert_eq!(pages, vec![1, 1]);
    }

    #[tokio::test]
    async fn test_error_keeps_feed() {
        let api = Arc::new(FakeGalleryApi::with_pages(vec![
            Ok(FeedPage {
                images: vec![image("1")],
                has_more: true,
            }),
            Err(MutationError::http(503, "busy")),
        ]));
        let feed = GalleryFeed::new(api);

        feed.load_next().await.unwrap();
        assert!(feed.load_next().await.is_err());
        assert_eq!(feed.images().len(), 1);
        assert_eq!(feed.next_page(), 2);
        assert!(!feed.is_loading());
        assert!(feed.has_more());
    }

    #[tokio::test]
    async fn test_set_filters_resets() {
        let api = Arc::new(FakeGalleryApi::with_pages(vec![Ok(FeedPage {
            images: vec![image("1")],
            has_more: false,
        })]));
        let feed = GalleryFeed::new(api.clone());
        feed.load_next().await.unwrap();

        feed.set_filters(FeedFilters::default().with_category("Travel"));
        assert!(feed.images().is_empty());
        assert!(feed.has_more());
        assert_eq!(feed.next_page(), 1);

        feed.load_next().await.unwrap();
        let requests = api.requests.lock();
        assert_eq!(requests[1].0, 1);
        assert_eq!(requests[1].1.category.as_deref(), Some("Travel"));
    }

    #[test]
    fn test_page_wire_format() {
        let page: FeedPage = serde_json::from_str(
            r#"{"images":[{"_id":"abc","name":"Dune","category":"Nature","img":"u","userEmail":"a@x.com"}],"hasMore":true}"#,
        )
        .unwrap();
        assert!(page.has_more);
        assert_eq!(page.images[0].id.as_str(), "abc");
        assert_eq!(page.images[0].owner_email.as_deref(), Some("a@x.com"));
    }
}
