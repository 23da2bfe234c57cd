use crate::config::Config;
use crate::text::{strip_markup, truncate_chars};
use crate::view::{CatalogSnapshot, CategoryState};
use itertools::Itertools;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use storefront_types::category::Category;
use storefront_types::listing::ProductListing;
use storefront_types::Locale;

pub static BREADCRUMB_SCRIPT_ID: &str = "breadcrumb-schema";
pub static ITEM_LIST_SCRIPT_ID: &str = "item-list-schema";
pub const ITEM_LIST_LIMIT: usize = 10;
const DESCRIPTION_MAX: usize = 160;

/// Identity of a `<meta>` tag.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetaKey {
    Name(String),
    Property(String),
}

impl MetaKey {
    pub fn name<S: Into<String>>(s: S) -> Self {
        Self::Name(s.into())
    }

    pub fn property<S: Into<String>>(s: S) -> Self {
        Self::Property(s.into())
    }
}

/// Document head managed by tag identity: every setter overwrites the tag
/// with the same identity and reports whether anything changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeadDocument {
    title: String,
    metas: BTreeMap<MetaKey, String>,
    links: BTreeMap<String, String>,
    scripts: BTreeMap<String, Value>,
}

fn upsert<V: PartialEq>(map: &mut BTreeMap<String, V>, key: &str, value: V) -> bool {
    if map.get(key) == Some(&value) {
        return false;
    }
    map.insert(key.to_string(), value);
    true
}

impl HeadDocument {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title<S: Into<String>>(&mut self, title: S) -> bool {
        let title = title.into();
        if self.title == title {
            return false;
        }
        self.title = title;
        true
    }

    pub fn meta(&self, key: &MetaKey) -> Option<&str> {
        self.metas.get(key).map(String::as_str)
    }

    pub fn meta_name(&self, name: &str) -> Option<&str> {
        self.meta(&MetaKey::name(name))
    }

    pub fn meta_property(&self, property: &str) -> Option<&str> {
        self.meta(&MetaKey::property(property))
    }

    pub fn upsert_meta<S: Into<String>>(&mut self, key: MetaKey, content: S) -> bool {
        let content = content.into();
        if self.metas.get(&key) == Some(&content) {
            return false;
        }
        self.metas.insert(key, content);
        true
    }

    pub fn remove_meta(&mut self, key: &MetaKey) -> bool {
        self.metas.remove(key).is_some()
    }

    pub fn metas(&self) -> impl Iterator<Item = (&MetaKey, &String)> {
        self.metas.iter()
    }

    pub fn link(&self, rel: &str) -> Option<&str> {
        self.links.get(rel).map(String::as_str)
    }

    pub fn upsert_link<S: Into<String>>(&mut self, rel: &str, href: S) -> bool {
        upsert(&mut self.links, rel, href.into())
    }

    pub fn remove_link(&mut self, rel: &str) -> bool {
        self.links.remove(rel).is_some()
    }

    pub fn links(&self) -> impl Iterator<Item = (&String, &String)> {
        self.links.iter()
    }

    pub fn json_ld(&self, id: &str) -> Option<&Value> {
        self.scripts.get(id)
    }

    pub fn upsert_json_ld(&mut self, id: &str, value: Value) -> bool {
        upsert(&mut self.scripts, id, value)
    }

    pub fn remove_json_ld(&mut self, id: &str) -> bool {
        self.scripts.remove(id).is_some()
    }

    pub fn scripts(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.scripts.iter()
    }
}

/// Derives head metadata from the catalog state.
#[derive(Clone, Debug)]
pub struct SeoEmitter {
    site_name: String,
    site_url: Option<String>,
    locale: Locale,
}

impl SeoEmitter {
    pub fn new(site_name: String, site_url: Option<String>, locale: Locale) -> Self {
        Self {
            site_name,
            site_url,
            locale,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.site_name.clone(),
            config.site_url.clone(),
            config.locale.clone(),
        )
    }

    pub fn category_href(&self, path: &str) -> String {
        let path = if path.is_empty() {
            "/".to_string()
        } else {
            format!("/category/{path}")
        };
        self.absolute(&path)
    }

    pub fn product_href(&self, slug: &str) -> String {
        self.absolute(&format!("/product/{slug}"))
    }

    fn absolute(&self, path: &str) -> String {
        match &self.site_url {
            Some(base) => format!("{base}{path}"),
            None => path.to_string(),
        }
    }

    /// Writes the head for `snapshot`. Returns whether `head` changed.
    pub fn apply(&self, head: &mut HeadDocument, snapshot: &CatalogSnapshot) -> bool {
        match &snapshot.category {
            CategoryState::Idle | CategoryState::Loading { .. } => false,
            CategoryState::NotFound { .. } => self.apply_not_found(head),
            CategoryState::Resolved(category) => self.apply_category(head, category, snapshot),
        }
    }

    fn apply_not_found(&self, head: &mut HeadDocument) -> bool {
        let mut changed = head.set_title(format!("Category not found | {}", self.site_name));
        changed |= head.upsert_meta(MetaKey::name("robots"), "noindex");
        for key in [
            MetaKey::name("description"),
            MetaKey::property("og:title"),
            MetaKey::property("og:description"),
            MetaKey::property("og:url"),
            MetaKey::property("og:image"),
        ] {
            changed |= head.remove_meta(&key);
        }
        changed |= head.remove_link("canonical");
        changed |= head.remove_json_ld(BREADCRUMB_SCRIPT_ID);
        changed |= head.remove_json_ld(ITEM_LIST_SCRIPT_ID);
        changed
    }

    fn apply_category(
        &self,
        head: &mut HeadDocument,
        category: &Category,
        snapshot: &CatalogSnapshot,
    ) -> bool {
        // Page of the listing on display, which lags the cursor while loading.
        let title = self.title(category, snapshot.listing.page);
        let description = self.description(category, &snapshot.listing);

        let mut changed = head.set_title(title.clone());
        changed |= head.remove_meta(&MetaKey::name("robots"));
        changed |= head.upsert_meta(MetaKey::name("description"), description.clone());
        changed |= head.upsert_meta(MetaKey::property("og:type"), "website");
        changed |= head.upsert_meta(MetaKey::property("og:site_name"), self.site_name.clone());
        changed |= head.upsert_meta(MetaKey::property("og:title"), title);
        changed |= head.upsert_meta(MetaKey::property("og:description"), description);

        changed |= match &category.image {
            Some(image) => head.upsert_meta(MetaKey::property("og:image"), self.image_url(image)),
            None => head.remove_meta(&MetaKey::property("og:image")),
        };

        if self.site_url.is_some() {
            let url = self.category_href(&category.path);
            changed |= head.upsert_meta(MetaKey::property("og:url"), url.clone());
            changed |= head.upsert_link("canonical", url);
        } else {
            changed |= head.remove_meta(&MetaKey::property("og:url"));
            changed |= head.remove_link("canonical");
        }

        changed |= match self.breadcrumb_schema(category) {
            Some(schema) => head.upsert_json_ld(BREADCRUMB_SCRIPT_ID, schema),
            None => head.remove_json_ld(BREADCRUMB_SCRIPT_ID),
        };
        changed |= match self.item_list_schema(&snapshot.listing) {
            Some(schema) => head.upsert_json_ld(ITEM_LIST_SCRIPT_ID, schema),
            None => head.remove_json_ld(ITEM_LIST_SCRIPT_ID),
        };
        changed
    }

    fn title(&self, category: &Category, page: u32) -> String {
        if category.is_root() {
            return self.site_name.clone();
        }
        let name = category.display_name(&self.locale);
        if page > 1 {
            format!("{name} (page {page}) | {}", self.site_name)
        } else {
            format!("{name} | {}", self.site_name)
        }
    }

    fn description(&self, category: &Category, listing: &ProductListing) -> String {
        let provided = category
            .display_description(&self.locale)
            .map(strip_markup)
            .filter(|d| !d.is_empty());
        if let Some(description) = provided {
            return truncate_chars(&description, DESCRIPTION_MAX);
        }
        let site = &self.site_name;
        let generated = if category.is_root() {
            format!("Browse all product categories at {site}.")
        } else {
            let name = category.display_name(&self.locale);
            if !category.is_leaf && !category.children.is_empty() {
                let children = category
                    .children
                    .iter()
                    .map(|c| c.display_name(&self.locale))
                    .join(", ");
                format!("{name} at {site}: {children}.")
            } else if listing.total > 0 {
                format!(
                    "Shop {name} at {site}: {} products with filters by specification and price.",
                    listing.total
                )
            } else {
                format!("Shop {name} at {site}.")
            }
        };
        truncate_chars(&generated, DESCRIPTION_MAX)
    }

    fn image_url(&self, image: &str) -> String {
        if image.starts_with("http://") || image.starts_with("https://") {
            image.to_string()
        } else {
            self.absolute(&format!("/{}", image.trim_start_matches('/')))
        }
    }

    fn breadcrumb_schema(&self, category: &Category) -> Option<Value> {
        if category.breadcrumb.is_empty() {
            return None;
        }
        let items: Vec<Value> = category
            .breadcrumb
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                json!({
                    "@type": "ListItem",
                    "position": i + 1,
                    "name": entry.display_name(&self.locale),
                    "item": self.category_href(&entry.path),
                })
            })
            .collect();
        Some(json!({
            "@context": "https://schema.org",
            "@type": "BreadcrumbList",
            "itemListElement": items,
        }))
    }

    fn item_list_schema(&self, listing: &ProductListing) -> Option<Value> {
        if listing.is_empty() {
            return None;
        }
        let items: Vec<Value> = listing
            .products
            .iter()
            .take(ITEM_LIST_LIMIT)
            .enumerate()
            .map(|(i, card)| {
                json!({
                    "@type": "ListItem",
                    "position": i + 1,
                    "name": card.title,
                    "url": self.product_href(&card.slug),
                })
            })
            .collect();
        Some(json!({
            "@context": "https://schema.org",
            "@type": "ItemList",
            "numberOfItems": items.len(),
            "itemListElement": items,
        }))
    }
}
