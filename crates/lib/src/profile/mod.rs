//! # Profile Store
//!
//! An in-memory index of users and stores, loaded once at startup from the
//! `users.json` and `stores.json` data files and read-only afterwards.

pub mod types;

pub use types::{GeoPoint, Offer, Order, Preferences, Store, StoreHours, StoreLocation, User};

use regex::Regex;
use std::{collections::HashMap, path::Path, sync::LazyLock};
use thiserror::Error;
use tracing::{debug, info};

static USER_ID_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)USR-\d+").expect("valid user id regex"));

static PHONE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+91-\d{5}-\d{5}").expect("valid phone regex"));

/// Errors raised while loading profile data.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Failed to read profile data from '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse profile data from '{path}': {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Resolves users and stores by id, phone number, geolocation or free text.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    users: Vec<User>,
    user_index: HashMap<String, usize>,
    stores: Vec<Store>,
}

impl ProfileStore {
    /// Builds a store from already-parsed records. Later duplicates of a `user_id`
    /// replace earlier ones in the id index.
    pub fn new(users: Vec<User>, stores: Vec<Store>) -> Self {
        let user_index = users
            .iter()
            .enumerate()
            .map(|(idx, user)| (user.user_id.clone(), idx))
            .collect();
        Self {
            users,
            user_index,
            stores,
        }
    }

    /// Loads both collections from JSON files.
    pub fn load(
        users_path: impl AsRef<Path>,
        stores_path: impl AsRef<Path>,
    ) -> Result<Self, ProfileError> {
        let users: Vec<User> = read_json(users_path.as_ref())?;
        let stores: Vec<Store> = read_json(stores_path.as_ref())?;
        info!(
            users = users.len(),
            stores = stores.len(),
            "Loaded profile data."
        );
        Ok(Self::new(users, stores))
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn stores(&self) -> &[Store] {
        &self.stores
    }

    /// Exact lookup by user id.
    pub fn get_user(&self, user_id: &str) -> Option<&User> {
        self.user_index.get(user_id).map(|&idx| &self.users[idx])
    }

    /// Resolves an identifier to a user id.
    ///
    /// The ladder is tried in order: exact id, exact phone number, an id token
    /// (`USR-<digits>`, any case) inside free text, then a phone token
    /// (`+91-ddddd-ddddd`) inside free text.
    pub fn find_user_id(&self, identifier: &str) -> Option<String> {
        if self.user_index.contains_key(identifier) {
            return Some(identifier.to_string());
        }

        if let Some(user) = self.find_by_phone(identifier) {
            return Some(user.user_id.clone());
        }

        if let Some(token) = USER_ID_TOKEN.find(identifier) {
            let extracted = token.as_str().to_uppercase();
            if self.user_index.contains_key(&extracted) {
                debug!(%extracted, "Resolved user id from free text.");
                return Some(extracted);
            }
        }

        if let Some(token) = PHONE_TOKEN.find(identifier) {
            if let Some(user) = self.find_by_phone(token.as_str()) {
                debug!("Resolved user id from a phone number in free text.");
                return Some(user.user_id.clone());
            }
        }

        None
    }

    fn find_by_phone(&self, phone: &str) -> Option<&User> {
        self.users.iter().find(|user| user.phone_number == phone)
    }

    /// Finds the store closest to the given coordinates.
    ///
    /// Distance is planar Euclidean distance in degrees, not great-circle distance.
    /// Ties keep the store that appears first in load order.
    pub fn nearest_store(&self, lat: f64, lon: f64) -> Option<(&Store, f64)> {
        let mut nearest: Option<(&Store, f64)> = None;
        for store in &self.stores {
            let d_lat = lat - store.location.latitude;
            let d_lon = lon - store.location.longitude;
            let distance = (d_lat * d_lat + d_lon * d_lon).sqrt();
            match nearest {
                Some((_, best)) if distance >= best => {}
                _ => nearest = Some((store, distance)),
            }
        }
        nearest
    }

    /// Finds stores mentioned in free text, in load order.
    ///
    /// A store matches when the query (case-insensitively) contains one of its
    /// comma-separated address segments longer than three characters, its name,
    /// or its full address.
    pub fn find_stores_by_text(&self, query: &str) -> Vec<&Store> {
        if query.is_empty() {
            return Vec::new();
        }
        let query_lower = query.to_lowercase();

        self.stores
            .iter()
            .filter(|store| {
                let address = store.location.address.to_lowercase();
                let segment_match = address
                    .split(',')
                    .map(str::trim)
                    .any(|part| part.chars().count() > 3 && query_lower.contains(part));
                segment_match
                    || query_lower.contains(&store.name.to_lowercase())
                    || query_lower.contains(&address)
            })
            .collect()
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ProfileError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ProfileError::Parse {
        path: display,
        source,
    })
}
