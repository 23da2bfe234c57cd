use crate::seo::{HeadDocument, MetaKey, SeoEmitter};
use crate::view::{CatalogSnapshot, CategoryState, ViewStatus};
use askama::Template;
use lazy_regex::regex;
use storefront_types::attribute::{AttributeType, CategoryAttribute};
use storefront_types::filter::{ActiveFilters, FilterValue};
use storefront_types::product::ProductCard;
use storefront_types::Locale;

pub struct MetaTag {
    pub attr: &'static str,
    pub key: String,
    pub content: String,
}

pub struct LinkTag {
    pub rel: String,
    pub href: String,
}

pub struct ScriptTag {
    pub id: String,
    pub json: String,
}

#[derive(Template)]
#[template(path = "head.html")]
pub struct HeadTemplate {
    pub title: String,
    pub metas: Vec<MetaTag>,
    pub links: Vec<LinkTag>,
    pub scripts: Vec<ScriptTag>,
}

/// JSON for an inline `<script>` block. A `</` sequence would close the element.
pub fn script_json(value: &serde_json::Value) -> String {
    regex!("</")
        .replace_all(&value.to_string(), r"<\/")
        .into_owned()
}

impl HeadTemplate {
    pub fn new(head: &HeadDocument) -> Self {
        Self {
            title: head.title().to_string(),
            metas: head
                .metas()
                .map(|(key, content)| {
                    let (attr, key) = match key {
                        MetaKey::Name(k) => ("name", k.clone()),
                        MetaKey::Property(k) => ("property", k.clone()),
                    };
                    MetaTag {
                        attr,
                        key,
                        content: content.clone(),
                    }
                })
                .collect(),
            links: head
                .links()
                .map(|(rel, href)| LinkTag {
                    rel: rel.clone(),
                    href: href.clone(),
                })
                .collect(),
            scripts: head
                .scripts()
                .map(|(id, value)| ScriptTag {
                    id: id.clone(),
                    json: script_json(value),
                })
                .collect(),
        }
    }
}

pub struct Link {
    pub name: String,
    pub href: String,
}

pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

pub struct FilterView {
    pub key: String,
    pub label: String,
    pub kind: String,
    /// `radio` or `checkbox` for option lists.
    pub input: &'static str,
    pub options: Vec<OptionView>,
    pub is_range: bool,
    pub is_text: bool,
    pub min: String,
    pub max: String,
    pub text: String,
    pub unit: String,
}

impl FilterView {
    fn new(attribute: &CategoryAttribute, filters: &ActiveFilters, locale: &Locale) -> Self {
        let range = filters.range(&attribute.key);
        let text = match filters.get(&attribute.key) {
            Some(FilterValue::Single(s)) => s.clone(),
            _ => String::new(),
        };
        let options = attribute
            .options
            .iter()
            .flatten()
            .map(|o| OptionView {
                value: o.value.clone(),
                label: o.display_label(locale).to_string(),
                selected: filters.is_selected(&attribute.key, &o.value),
            })
            .collect();
        Self {
            key: attribute.key.clone(),
            label: attribute.display_label(locale).to_string(),
            kind: attribute.kind.to_string(),
            input: match attribute.kind {
                AttributeType::Select => "radio",
                _ => "checkbox",
            },
            options,
            is_range: attribute.kind == AttributeType::NumberRange,
            is_text: attribute.kind == AttributeType::Text,
            min: range.min.map(|v| v.to_string()).unwrap_or_default(),
            max: range.max.map(|v| v.to_string()).unwrap_or_default(),
            text,
            unit: attribute.unit.clone().unwrap_or_default(),
        }
    }
}

pub struct CardView {
    pub title: String,
    pub href: String,
    pub image: String,
    pub price: String,
    pub compare_at: String,
    pub discount: String,
    pub in_stock: bool,
    pub stock_label: &'static str,
}

impl CardView {
    fn new(card: &ProductCard, seo: &SeoEmitter) -> Self {
        let money = |amount: rust_decimal::Decimal| format!("{:.2} {}", amount, card.currency);
        Self {
            title: card.title.clone(),
            href: seo.product_href(&card.slug),
            image: card.image.clone().unwrap_or_default(),
            price: money(card.price),
            compare_at: card.compare_at_price.map(money).unwrap_or_default(),
            discount: card
                .discount_percent
                .map(|d| d.to_string())
                .unwrap_or_default(),
            in_stock: card.in_stock,
            stock_label: match (card.in_stock, card.low_stock) {
                (false, _) => "Out of stock",
                (true, true) => "Only a few left",
                (true, false) => "In stock",
            },
        }
    }
}

pub struct PageLink {
    pub number: u32,
    pub href: String,
    pub current: bool,
}

/// Neighbours of the current page shown besides the first and last page.
const PAGE_WINDOW: u32 = 2;

fn page_links(seo: &SeoEmitter, path: &str, current: u32, total_pages: u32) -> Vec<PageLink> {
    let base = seo.category_href(path);
    (1..=total_pages)
        .filter(|n| *n == 1 || *n == total_pages || n.abs_diff(current) <= PAGE_WINDOW)
        .map(|number| PageLink {
            number,
            href: if number == 1 {
                base.clone()
            } else {
                format!("{base}?page={number}")
            },
            current: number == current,
        })
        .collect()
}

fn state_name(status: ViewStatus) -> &'static str {
    match status {
        ViewStatus::Loading => "loading",
        ViewStatus::NotFound => "not-found",
        ViewStatus::Categories => "categories",
        ViewStatus::Empty => "empty",
        ViewStatus::Products => "products",
        ViewStatus::Errored => "errored",
    }
}

#[derive(Template)]
#[template(path = "catalog.html")]
pub struct CatalogPage {
    pub lang: String,
    pub head_html: String,
    pub state: &'static str,
    pub heading: String,
    pub not_found_path: String,
    pub crumbs: Vec<Link>,
    pub children: Vec<Link>,
    pub filters: Vec<FilterView>,
    pub has_filters: bool,
    pub cards: Vec<CardView>,
    pub total: u64,
    pub pages: Vec<PageLink>,
    pub retry_href: String,
}

impl CatalogPage {
    pub fn new(
        snapshot: &CatalogSnapshot,
        head: &HeadDocument,
        seo: &SeoEmitter,
        locale: &Locale,
    ) -> Result<Self, askama::Error> {
        let head_html = HeadTemplate::new(head).render()?;
        let state = state_name(snapshot.view_status());
        let not_found_path = match &snapshot.category {
            CategoryState::NotFound { path } => path.clone(),
            _ => String::new(),
        };
        let category = snapshot.category();
        let heading = category
            .map(|c| {
                if c.is_root() {
                    "All categories".to_string()
                } else {
                    c.display_name(locale).to_string()
                }
            })
            .unwrap_or_default();
        let crumbs = category
            .map(|c| {
                c.breadcrumb
                    .iter()
                    .map(|b| Link {
                        name: b.display_name(locale).to_string(),
                        href: seo.category_href(&b.path),
                    })
                    .collect()
            })
            .unwrap_or_default();
        let children = category
            .map(|c| {
                c.children
                    .iter()
                    .map(|child| Link {
                        name: child.display_name(locale).to_string(),
                        href: seo.category_href(&child.path),
                    })
                    .collect()
            })
            .unwrap_or_default();
        let path = category.map(|c| c.path.as_str()).unwrap_or_default();
        let listing = &snapshot.listing;
        let pages = if state == "products" {
            page_links(seo, path, listing.page, listing.total_pages)
        } else {
            vec![]
        };
        let retry_href = match snapshot.cursor.current_page {
            1 => seo.category_href(path),
            page => format!("{}?page={page}", seo.category_href(path)),
        };

        Ok(Self {
            lang: locale.to_string(),
            head_html,
            state,
            heading,
            not_found_path,
            crumbs,
            children,
            filters: snapshot
                .attributes
                .iter()
                .map(|a| FilterView::new(a, &snapshot.filters, locale))
                .collect(),
            has_filters: !snapshot.filters.is_empty(),
            cards: listing
                .products
                .iter()
                .map(|c| CardView::new(c, seo))
                .collect(),
            total: listing.total,
            pages,
            retry_href,
        })
    }
}
