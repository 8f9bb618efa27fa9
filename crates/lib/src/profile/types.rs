//! Records loaded from `users.json` and `stores.json`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Preferences {
    pub favorite_drink: String,
    pub size: String,
    pub milk: String,
    pub sugar: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Order {
    pub order_id: String,
    pub item: String,
    pub date: String,
    pub amount: f64,
}

/// A customer profile. `past_orders` is ordered most recent first.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub phone_number: String,
    pub preferences: Preferences,
    pub loyalty_points: u32,
    pub location: GeoPoint,
    #[serde(default)]
    pub past_orders: Vec<Order>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StoreLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StoreHours {
    pub open: String,
    pub close: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Offer {
    pub code: String,
    pub description: String,
    pub valid_until: String,
}

/// A store record. `stock` keeps the item order of the source file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Store {
    pub store_id: String,
    pub name: String,
    pub location: StoreLocation,
    pub hours: StoreHours,
    #[serde(default, with = "ordered_stock")]
    pub stock: Vec<(String, bool)>,
    #[serde(default)]
    pub offers: Vec<Offer>,
}

impl Store {
    /// Names of the items currently marked unavailable, in stock-list order.
    pub fn out_of_stock(&self) -> Vec<&str> {
        self.stock
            .iter()
            .filter(|(_, available)| !available)
            .map(|(item, _)| item.as_str())
            .collect()
    }
}

/// (De)serializes the `stock` object as an ordered list of pairs so that
/// "Out of Stock" lines follow the order of the data file.
mod ordered_stock {
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(stock: &[(String, bool)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(stock.len()))?;
        for (item, available) in stock {
            map.serialize_entry(item, available)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<(String, bool)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StockVisitor;

        impl<'de> Visitor<'de> for StockVisitor {
            type Value = Vec<(String, bool)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of item names to availability flags")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut stock = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((item, available)) = access.next_entry::<String, bool>()? {
                    stock.push((item, available));
                }
                Ok(stock)
            }
        }

        deserializer.deserialize_map(StockVisitor)
    }
}
