//! The built-in Eatsy knowledge base.

use super::source::{DocumentSource, KnowledgeRecord};
use super::types::Document;
use super::Result;
use async_trait::async_trait;

const DATE_CREATED: &str = "2025-09-12";

/// (text, category, source, restaurant_id)
const ENTRIES: [(&str, &str, &str, Option<&str>); 20] = [
    ("How can I track my order? Go to 'My Orders' in your profile.", "tracking", "FAQ", None),
    ("Can I cancel an order? Orders can be canceled within 5 minutes.", "cancellation", "FAQ", None),
    ("Refunds are processed within 100 business days.", "refund", "FAQ", None),
    ("Vegan Burger: lettuce, tomato, vegan mayo.", "menu", "Restaurant Menu", Some("rest_101")),
    ("Green Smoothie: kale, spinach, apple, almond milk.", "menu", "Restaurant Menu", Some("rest_102")),
    ("If your package arrived damaged, contact support with a photo.", "complaint", "Support Transcript", None),
    ("We deliver within 30 minutes in city center.", "delivery", "FAQ", None),
    ("Payment methods: credit card, PayPal, Apple Pay.", "payment", "FAQ", None),
    ("All our restaurants are certified vegan/vegetarian.", "policy", "FAQ", None),
    ("Gluten-free options are available.", "menu", "Restaurant Menu", Some("rest_103")),
    ("Late delivery? Contact support to get an update.", "delivery", "Support Transcript", None),
    ("Happy hour discounts available 5-7pm.", "promo", "Restaurant Menu", Some("rest_104")),
    ("We prioritize eco-friendly packaging.", "policy", "FAQ", None),
    ("Order history is saved for 6 months.", "account", "FAQ", None),
    ("Vegan sushi rolls available.", "menu", "Restaurant Menu", Some("rest_105")),
    ("Your feedback is valuable to us.", "feedback", "Support Transcript", None),
    ("We support allergy-friendly meals.", "menu", "Restaurant Menu", Some("rest_106")),
    ("Order customization allowed for dietary restrictions.", "menu", "Restaurant Menu", Some("rest_107")),
    ("Contact support via chat, email, or phone.", "support", "FAQ", None),
    ("Refer a friend and get discounts.", "promo", "FAQ", None),
];

/// The 20 sample records, with ids `faq_001` through `faq_020`.
pub fn sample_records() -> Vec<KnowledgeRecord> {
    ENTRIES
        .iter()
        .enumerate()
        .map(|(i, (text, category, source, restaurant_id))| KnowledgeRecord {
            id: format!("faq_{:03}", i + 1),
            text: text.to_string(),
            category: Some(category.to_string()),
            restaurant_id: restaurant_id.map(str::to_string),
            source: Some(source.to_string()),
            date_created: Some(DATE_CREATED.to_string()),
        })
        .collect()
}

/// A [`DocumentSource`] serving the built-in sample knowledge base.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleSource;

#[async_trait]
impl DocumentSource for SampleSource {
    fn name(&self) -> &str {
        "sample"
    }

    async fn list_all(&self) -> Result<Vec<Document>> {
        Ok(sample_records().into_iter().map(Document::from).collect())
    }
}
