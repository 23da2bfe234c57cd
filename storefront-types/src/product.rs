use crate::{localized, Locale, LocalizedText};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;
pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ProductImage {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        alt: Option<LocalizedText>,
    },
}

impl ProductImage {
    pub fn url(&self) -> &str {
        match self {
            Self::Url(url) => url,
            Self::Detailed { url, .. } => url,
        }
    }
}

/// Raw product record as returned by the listing endpoints.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "name")]
    pub title: LocalizedText,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub compare_at_price: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default, alias = "quantity")]
    pub stock: Option<i64>,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

/// Display projection of a [`Product`] for list and grid rendering.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductCard {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub discount_percent: Option<u32>,
    pub currency: String,
    pub image: Option<String>,
    pub in_stock: bool,
    pub low_stock: bool,
}

impl ProductCard {
    pub fn project(product: &Product, locale: &Locale) -> Self {
        let title = localized(Some(&product.title), locale, &product.id).to_string();
        let compare_at_price = product.compare_at_price.filter(|c| *c > product.price);
        let discount_percent = compare_at_price.and_then(|c| {
            ((c - product.price) / c * Decimal::ONE_HUNDRED)
                .round()
                .to_u32()
        });
        let threshold = product
            .low_stock_threshold
            .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
        ProductCard {
            id: product.id.clone(),
            slug: product
                .slug
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| product.id.clone()),
            title,
            price: product.price,
            compare_at_price,
            discount_percent,
            currency: product
                .currency
                .clone()
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            image: product.images.first().map(|i| i.url().to_string()),
            in_stock: product.stock.map_or(true, |s| s > 0),
            low_stock: product.stock.is_some_and(|s| s > 0 && s <= threshold),
        }
    }
}
