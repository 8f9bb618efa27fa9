use anyhow::Result;
use async_trait::async_trait;
use concierge::{
    errors::PromptError,
    profile::{
        GeoPoint, Offer, Order, Preferences, ProfileStore, Store, StoreHours, StoreLocation, User,
    },
    providers::ai::{AiProvider, Embedder, HashingEmbedder},
};
use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// --- Mock AI Provider ---

#[derive(Clone, Debug)]
pub struct MockAiProvider {
    responses: Arc<Mutex<HashMap<String, String>>>,
    default_response: Arc<Mutex<Option<String>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockAiProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            default_response: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Pre-programs a response for a specific prompt.
    /// The key should be a unique substring of the system prompt.
    pub fn add_response(&self, key: &str, response: &str) {
        let mut responses = self.responses.lock().unwrap();
        responses.insert(key.to_string(), response.to_string());
    }

    /// The response returned when no keyed response matches.
    pub fn set_default_response(&self, response: &str) {
        *self.default_response.lock().unwrap() = Some(response.to_string());
    }

    /// Retrieves the recorded `(system, user)` calls for assertion.
    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, PromptError> {
        self.calls
            .lock()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));

        let responses = self.responses.lock().unwrap();
        for (key, response) in responses.iter() {
            if system_prompt.contains(key) {
                return Ok(response.clone());
            }
        }

        if let Some(response) = self.default_response.lock().unwrap().clone() {
            return Ok(response);
        }

        Err(PromptError::AiApi(format!(
            "MockAiProvider: No response programmed for system prompt. Got: '{system_prompt}'"
        )))
    }
}

// --- Counting Embedder ---

/// A `HashingEmbedder` that records how many texts it has embedded.
#[derive(Clone, Debug)]
pub struct CountingEmbedder {
    inner: HashingEmbedder,
    embedded: Arc<AtomicUsize>,
}

impl CountingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            inner: HashingEmbedder::new(dimensions),
            embedded: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A handle to the counter that stays valid after the embedder is boxed.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.embedded.clone()
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PromptError> {
        self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed(texts).await
    }
}

// --- Profile Fixtures ---

pub mod fixtures {
    use super::*;

    pub const STORE_1_LAT: f64 = 19.0760;
    pub const STORE_1_LON: f64 = 72.8777;

    /// Two customers: `USR-001` (120 points, one past order) and `USR-002`
    /// (no orders).
    pub fn sample_users() -> Vec<User> {
        vec![
            User {
                user_id: "USR-001".to_string(),
                name: "Priya Sharma".to_string(),
                phone_number: "+91-98765-43210".to_string(),
                preferences: Preferences {
                    favorite_drink: "Masala Chai".to_string(),
                    size: "Medium".to_string(),
                    milk: "Oat".to_string(),
                    sugar: "1 tsp".to_string(),
                },
                loyalty_points: 120,
                location: GeoPoint {
                    latitude: STORE_1_LAT,
                    longitude: STORE_1_LON,
                },
                past_orders: vec![
                    Order {
                        order_id: "ORD-001-002".to_string(),
                        item: "Samosa".to_string(),
                        date: "2025-05-02".to_string(),
                        amount: 80.0,
                    },
                    Order {
                        order_id: "ORD-001-001".to_string(),
                        item: "Filter Coffee".to_string(),
                        date: "2025-03-14".to_string(),
                        amount: 120.5,
                    },
                ],
            },
            User {
                user_id: "USR-002".to_string(),
                name: "Arjun Mehta".to_string(),
                phone_number: "+91-91234-56789".to_string(),
                preferences: Preferences {
                    favorite_drink: "Filter Coffee".to_string(),
                    size: "Large".to_string(),
                    milk: "Whole".to_string(),
                    sugar: "None".to_string(),
                },
                loyalty_points: 0,
                location: GeoPoint {
                    latitude: 18.5204,
                    longitude: 73.8567,
                },
                past_orders: Vec::new(),
            },
        ]
    }

    /// `store_1` in Mumbai (offer CHAI20, Vada Pav out of stock) and `store_2`
    /// in Pune (no offers).
    pub fn sample_stores() -> Vec<Store> {
        vec![
            Store {
                store_id: "store_1".to_string(),
                name: "Chai Point - Linking Road".to_string(),
                location: StoreLocation {
                    latitude: STORE_1_LAT,
                    longitude: STORE_1_LON,
                    address: "12, Linking Road, Bandra West, Mumbai".to_string(),
                },
                hours: StoreHours {
                    open: "08:00".to_string(),
                    close: "22:00".to_string(),
                },
                stock: vec![
                    ("Masala Chai".to_string(), true),
                    ("Vada Pav".to_string(), false),
                    ("Samosa".to_string(), true),
                ],
                offers: vec![Offer {
                    code: "CHAI20".to_string(),
                    description: "20% off Masala Chai".to_string(),
                    valid_until: "2025-12-31".to_string(),
                }],
            },
            Store {
                store_id: "store_2".to_string(),
                name: "Chai Point - FC Road".to_string(),
                location: StoreLocation {
                    latitude: 18.5204,
                    longitude: 73.8567,
                    address: "7, FC Road, Shivajinagar, Pune".to_string(),
                },
                hours: StoreHours {
                    open: "08:00".to_string(),
                    close: "22:00".to_string(),
                },
                stock: vec![
                    ("Masala Chai".to_string(), true),
                    ("Bun Maska".to_string(), true),
                ],
                offers: Vec::new(),
            },
        ]
    }

    pub fn sample_profile_store() -> ProfileStore {
        ProfileStore::new(sample_users(), sample_stores())
    }

    /// Writes `users.json` and `stores.json` into `dir` and returns their paths.
    pub fn write_profile_files(dir: &Path) -> Result<(PathBuf, PathBuf)> {
        let users_path = dir.join("users.json");
        let stores_path = dir.join("stores.json");
        std::fs::write(&users_path, serde_json::to_string_pretty(&sample_users())?)?;
        std::fs::write(&stores_path, serde_json::to_string_pretty(&sample_stores())?)?;
        Ok((users_path, stores_path))
    }

    /// A small plain-text policy document with three distinct sections.
    pub const SAMPLE_POLICY: &str = "Refund Policy
Refunds are issued for drinks returned within 30 minutes of purchase.
Refunds are paid back to the original payment method.

Loyalty Program
Customers earn one loyalty point for every 10 rupees spent.
Loyalty points can be redeemed for a free Masala Chai at 100 points.

Allergen Information
Our oat milk and almond milk are prepared on shared equipment.
Ask the barista for the allergen sheet before ordering.";
}

// --- Test-Specific Helpers ---
#[cfg(feature = "pdf")]
pub mod helpers {
    use anyhow::Result;
    use printpdf::{
        BuiltinFont, Layer, Mm, Op, ParsedFont, PdfDocument, PdfPage, PdfSaveOptions, Pt, TextItem,
        TextMatrix, TextRenderingMode,
    };

    /// Generates a PDF with one page per entry of `pages`, each page's lines
    /// placed one below the other. Compatible with printpdf v0.8.2.
    pub fn generate_test_pdf(pages: &[&[&str]]) -> Result<Vec<u8>> {
        let mut doc = PdfDocument::new("Store Policies");
        let layer_def = Layer::new("Layer 1");
        let layer_id = doc.add_layer(&layer_def);

        let font_bytes = BuiltinFont::Helvetica.get_subset_font().bytes;
        let font = ParsedFont::from_bytes(&font_bytes, 0, &mut Vec::new())
            .ok_or_else(|| anyhow::anyhow!("Failed to parse built-in font"))?;
        let font_id = doc.add_font(&font);

        for lines in pages {
            let mut ops = vec![
                Op::BeginLayer {
                    layer_id: layer_id.clone(),
                },
                Op::SetFontSize {
                    size: Pt(12.0),
                    font: font_id.clone(),
                },
            ];
            for (i, line) in lines.iter().enumerate() {
                ops.extend([
                    Op::StartTextSection,
                    Op::SetTextMatrix {
                        matrix: TextMatrix::Translate(
                            Mm(10.0).into(),
                            Mm(280.0 - 7.0 * i as f32).into(),
                        ),
                    },
                    Op::SetTextRenderingMode {
                        mode: TextRenderingMode::Fill,
                    },
                    Op::WriteText {
                        items: vec![TextItem::Text(line.to_string())],
                        font: font_id.clone(),
                    },
                    Op::EndTextSection,
                ]);
            }
            ops.push(Op::EndLayer {
                layer_id: layer_id.clone(),
            });

            let mut page = PdfPage::new(Mm(210.0), Mm(297.0), vec![]);
            page.ops = ops;
            doc.pages.push(page);
        }

        let mut warnings = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            eprintln!("PDF generation warnings: {warnings:?}");
        }

        Ok(bytes)
    }
}
