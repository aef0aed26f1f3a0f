// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Likes and favorites with optimistic updates.
//!
//! Both toggles patch local state first, then call the backend. A successful
//! response becomes the confirmed value; a failure rolls back exactly the
//! patch the call was made for.
//!
//! The store belongs to one signed-in user. [`EngagementStore::track_session`]
//! clears it whenever the session email changes.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{MutationError, MutationResult};
use crate::optimistic::{Optimistic, PatchId};
use crate::session::SessionStore;
use crate::types::ImageId;

/// Like and favorite endpoints.
#[async_trait]
pub trait EngagementApi: Send + Sync {
    /// Sets the like flag for `email` on `image`. Returns the new like count.
    async fn set_like(&self, image: &ImageId, email: &str, liked: bool) -> MutationResult<u64>;

    /// Adds or removes `image` from the favorites of `email`.
    async fn set_favorite(&self, email: &str, image: &ImageId, favorite: bool)
        -> MutationResult<()>;

    /// Lists the favorites of `email`.
    async fn favorites(&self, email: &str) -> MutationResult<Vec<ImageId>>;

    /// Backend name for logging.
    fn name(&self) -> &str {
        "engagement-api"
    }
}

/// Like state of one image as seen by the current user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    /// The current user likes the image.
    pub liked: bool,
    /// Total likes.
    pub count: u64,
}

impl LikeState {
    /// Creates a like state.
    pub fn new(liked: bool, count: u64) -> Self {
        Self { liked, count }
    }

    fn toggled(self) -> Self {
        if self.liked {
            Self::new(false, self.count.saturating_sub(1))
        } else {
            Self::new(true, self.count.saturating_add(1))
        }
    }
}

/// Client-side like and favorite state.
pub struct EngagementStore {
    api: Arc<dyn EngagementApi>,
    likes: Mutex<HashMap<ImageId, Optimistic<LikeState>>>,
    favorites: Mutex<Optimistic<BTreeSet<ImageId>>>,
    /// Bumped by `clear`; responses from an older epoch are dropped.
    epoch: AtomicU64,
}

impl EngagementStore {
    /// Creates an empty store.
    pub fn new(api: Arc<dyn EngagementApi>) -> Self {
        Self {
            api,
            likes: Mutex::new(HashMap::new()),
            favorites: Mutex::new(Optimistic::default()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Clears the store whenever the signed-in email changes, including
    /// sign-out.
    ///
    /// The task ends once the store or the session store is dropped. Must be
    /// called within a tokio runtime.
    pub fn track_session(self: &Arc<Self>, session: &SessionStore) -> JoinHandle<()> {
        let mut rx = session.subscribe();
        let mut last = rx.borrow_and_update().email().map(str::to_string);
        let store = Arc::downgrade(self);

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let email = rx.borrow_and_update().email().map(str::to_string);
                if email == last {
                    continue;
                }
                let Some(store) = store.upgrade() else {
                    break;
                };
                info!(email = email.as_deref(), "Session changed, clearing engagement state");
                store.clear();
                last = email;
            }
        })
    }

    /// Records a like state delivered by a feed page. Outstanding patches are
    /// overwritten.
    pub fn seed_like(&self, image: ImageId, state: LikeState) {
        self.likes
            .lock()
            .entry(image)
            .or_default()
            .reconcile(state);
    }

    /// Current like state of `image`.
    pub fn like_state(&self, image: &ImageId) -> LikeState {
        self.likes
            .lock()
            .get(image)
            .map(|cell| *cell.current())
            .unwrap_or_default()
    }

    /// Returns `true` if `image` is currently a favorite.
    pub fn is_favorite(&self, image: &ImageId) -> bool {
        self.favorites.lock().current().contains(image)
    }

    /// Current favorites.
    pub fn favorites(&self) -> BTreeSet<ImageId> {
        self.favorites.lock().current().clone()
    }

    /// Drops all state, for example after sign-out.
    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.likes.lock().clear();
        self.favorites.lock().reconcile(BTreeSet::new());
    }

    /// Toggles the like of `email` on `image`.
    pub async fn toggle_like(&self, image: &ImageId, email: Option<&str>) -> MutationResult<LikeState> {
        let email = email.ok_or(MutationError::NotSignedIn)?;
        let epoch = self.epoch.load(Ordering::SeqCst);

        let (patch, next) = {
            let mut likes = self.likes.lock();
            let cell = likes.entry(image.clone()).or_default();
            let next = cell.current().toggled();
            (cell.apply(next), next)
        };
        debug!(image = %image, liked = next.liked, "Optimistic like applied");

        let pending = PendingLike {
            likes: &self.likes,
            image,
            patch,
        };
        let result = self.api.set_like(image, email, next.liked).await;
        drop(pending);
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!(image = %image, "Store cleared during like, dropping response");
            return result.map(|count| LikeState::new(next.liked, count));
        }

        let mut likes = self.likes.lock();
        let cell = likes.entry(image.clone()).or_default();
        match result {
            Ok(count) => {
                let confirmed = LikeState::new(next.liked, count);
                cell.set_confirmed(confirmed);
                Ok(confirmed)
            }
            Err(e) => {
                warn!(image = %image, error = %e, "Like failed, rolled back");
                Err(e)
            }
        }
    }

    /// Toggles `image` in the favorites of `email`. Returns the new membership.
    pub async fn toggle_favorite(&self, image: &ImageId, email: Option<&str>) -> MutationResult<bool> {
        let email = email.ok_or(MutationError::NotSignedIn)?;
        let epoch = self.epoch.load(Ordering::SeqCst);

        let (patch, favorite) = {
            let mut favorites = self.favorites.lock();
            let mut next = favorites.current().clone();
            let favorite = !next.remove(image);
            if favorite {
                next.insert(image.clone());
            }
            (favorites.apply(next), favorite)
        };
        debug!(image = %image, favorite, "Optimistic favorite applied");

        let pending = PendingFavorite {
            favorites: &self.favorites,
            patch,
        };
        let result = self.api.set_favorite(email, image, favorite).await;
        drop(pending);
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!(image = %image, "Store cleared during favorite, dropping response");
            return result.map(|()| favorite);
        }

        let mut favorites = self.favorites.lock();
        match result {
            Ok(()) => {
                let mut confirmed = favorites.confirmed().clone();
                if favorite {
                    confirmed.insert(image.clone());
                } else {
                    confirmed.remove(image);
                }
                favorites.set_confirmed(confirmed);
                Ok(favorite)
            }
            Err(e) => {
                warn!(image = %image, error = %e, "Favorite failed, rolled back");
                Err(e)
            }
        }
    }

    /// Replaces the favorites with the backend's list.
    pub async fn refresh_favorites(&self, email: &str) -> MutationResult<usize> {
        let images = self.api.favorites(email).await?;
        let set: BTreeSet<ImageId> = images.into_iter().collect();
        let count = set.len();
        self.favorites.lock().reconcile(set);
        debug!(email, count, api = self.api.name(), "Favorites refreshed");
        Ok(count)
    }
}

/// Rolls back an optimistic like when the call settles or is cancelled.
struct PendingLike<'a> {
    likes: &'a Mutex<HashMap<ImageId, Optimistic<LikeState>>>,
    image: &'a ImageId,
    patch: PatchId,
}

impl Drop for PendingLike<'_> {
    fn drop(&mut self) {
        if let Some(cell) = self.likes.lock().get_mut(self.image) {
            cell.rollback(self.patch);
        }
    }
}

/// Rolls back an optimistic favorite when the call settles or is cancelled.
struct PendingFavorite<'a> {
    favorites: &'a Mutex<Optimistic<BTreeSet<ImageId>>>,
    patch: PatchId,
}

impl Drop for PendingFavorite<'_> {
    fn drop(&mut self) {
        self.favorites.lock().rollback(self.patch);
    }
}

impl fmt::Debug for EngagementStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngagementStore")
            .field("api", &self.api.name())
            .field("likes", &self.likes.lock().len())
            .field("favorites", &self.favorites.lock().current().len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
