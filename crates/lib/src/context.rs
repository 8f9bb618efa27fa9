//! # Context Assembler
//!
//! Builds the multi-line context block that grounds the generation stage: the
//! caller's coordinates, their profile, and the store that serves them. Every
//! missing piece degrades to an explicit placeholder line; assembling context
//! never fails.

use crate::{
    constants::{MAX_STORE_DISTANCE_METERS, METERS_PER_DEGREE},
    profile::{ProfileStore, Store, User},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

pub const GUEST_LINE: &str = "User: Guest (No profile found)";
pub const NO_NEARBY_STORE_LINE: &str =
    "Nearest Store: None nearby (closest is >50km away and no city mentioned)";
pub const FOUND_BY_NAME_LABEL: &str = "Distance unknown (found by name)";

/// How geolocated stores are accepted.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct LocationPolicy {
    /// Conversion factor from degree-space distance to meters.
    #[serde(default = "default_meters_per_degree")]
    pub meters_per_degree: f64,
    /// Stores further away than this are rejected.
    #[serde(default = "default_max_distance")]
    pub max_store_distance_meters: i64,
}

fn default_meters_per_degree() -> f64 {
    METERS_PER_DEGREE
}

fn default_max_distance() -> i64 {
    MAX_STORE_DISTANCE_METERS
}

impl Default for LocationPolicy {
    fn default() -> Self {
        Self {
            meters_per_degree: METERS_PER_DEGREE,
            max_store_distance_meters: MAX_STORE_DISTANCE_METERS,
        }
    }
}

/// Combines profile lookups with store resolution into a context block.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    profiles: Arc<ProfileStore>,
    policy: LocationPolicy,
}

impl ContextAssembler {
    pub fn new(profiles: Arc<ProfileStore>) -> Self {
        Self::with_policy(profiles, LocationPolicy::default())
    }

    pub fn with_policy(profiles: Arc<ProfileStore>, policy: LocationPolicy) -> Self {
        Self { profiles, policy }
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Assembles the context block for one request.
    ///
    /// `query` is only consulted when no store lies within range of the
    /// coordinates; the first store named in it is used instead.
    pub fn format_context(
        &self,
        user_id: &str,
        lat: f64,
        lon: f64,
        query: &str,
        include_location: bool,
    ) -> String {
        let mut lines = Vec::new();

        if include_location {
            lines.push(format!("Current Location: Lat: {lat:.4}, Lon: {lon:.4}"));
        }

        // Exact id only; anything else is a guest.
        match self.profiles.get_user(user_id) {
            Some(user) => push_user_lines(&mut lines, user),
            None => lines.push(GUEST_LINE.to_string()),
        }

        if !include_location {
            return lines.join("\n");
        }

        match self.resolve_store(lat, lon, query) {
            Some((store, distance_label)) => push_store_lines(&mut lines, store, &distance_label),
            None => lines.push(NO_NEARBY_STORE_LINE.to_string()),
        }

        lines.join("\n")
    }

    /// Picks the store for the context block together with its distance label.
    fn resolve_store(&self, lat: f64, lon: f64, query: &str) -> Option<(&Store, String)> {
        if let Some((store, degrees)) = self.profiles.nearest_store(lat, lon) {
            let meters = (degrees * self.policy.meters_per_degree) as i64;
            if meters <= self.policy.max_store_distance_meters {
                return Some((store, format_distance(meters)));
            }
            debug!(
                store_id = %store.store_id,
                meters, "Nearest store is out of range."
            );
        }

        if query.is_empty() {
            return None;
        }

        self.profiles
            .find_stores_by_text(query)
            .into_iter()
            .next()
            .map(|store| (store, FOUND_BY_NAME_LABEL.to_string()))
    }
}

/// Renders a whole-meter distance: `499m` below one kilometer, `2.2km` above.
pub fn format_distance(meters: i64) -> String {
    if meters < 1000 {
        format!("{meters}m")
    } else {
        format!("{:.1}km", meters as f64 / 1000.0)
    }
}

/// The second-to-last comma-separated address segment, if there is one.
pub fn infer_city(address: &str) -> Option<&str> {
    let segments: Vec<&str> = address.split(',').collect();
    if segments.len() < 2 {
        return None;
    }
    Some(segments[segments.len() - 2].trim())
}

fn push_user_lines(lines: &mut Vec<String>, user: &User) {
    let prefs = &user.preferences;
    lines.push(format!("User: {}", user.name));
    lines.push(format!(
        "Preferences: {} {} ({} Milk, {})",
        prefs.size, prefs.favorite_drink, prefs.milk, prefs.sugar
    ));
    lines.push(format!("Loyalty Points: {}", user.loyalty_points));
    if let Some(last_order) = user.past_orders.first() {
        lines.push(format!(
            "Last Order: {} on {}",
            last_order.item, last_order.date
        ));
    }
}

fn push_store_lines(lines: &mut Vec<String>, store: &Store, distance_label: &str) {
    if let Some(city) = infer_city(&store.location.address) {
        lines.push(format!("Inferred City: {city}"));
    }

    lines.push(format!(
        "Nearest Store: {} ({distance_label} away)",
        store.name
    ));
    lines.push(format!(
        "Store Hours: {} - {}",
        store.hours.open, store.hours.close
    ));

    if store.offers.is_empty() {
        lines.push("Active Offers: None".to_string());
    } else {
        let offers = store
            .offers
            .iter()
            .map(|offer| format!("{} ({})", offer.code, offer.description))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("Active Offers: {offers}"));
    }

    let unavailable = store.out_of_stock();
    if !unavailable.is_empty() {
        lines.push(format!("Out of Stock: {}", unavailable.join(", ")));
    }
}
