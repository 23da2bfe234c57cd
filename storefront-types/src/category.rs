use crate::{child_path, empty_string_as_none, localized, normalize_path, Locale, LocalizedText};
use serde::{Deserialize, Serialize};

pub const ROOT_ID: &str = "root";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub localized_name: Option<LocalizedText>,
    #[serde(default)]
    pub slug: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<LocalizedText>,
    #[serde(default)]
    pub is_leaf: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BreadcrumbEntry {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub localized_name: Option<LocalizedText>,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub path: String,
}

impl BreadcrumbEntry {
    pub fn display_name(&self, locale: &Locale) -> &str {
        localized(self.localized_name.as_ref(), locale, &self.name)
    }
}

/// `data` block of `GET /categories/path/{path}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCategoryDto {
    pub category: CategoryDto,
    #[serde(default)]
    pub children: Vec<CategoryDto>,
    #[serde(default)]
    pub breadcrumb: Vec<BreadcrumbEntry>,
    #[serde(default)]
    pub is_leaf: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub localized_name: Option<LocalizedText>,
    pub slug: String,
    pub path: String,
    pub image: Option<String>,
    pub description: Option<LocalizedText>,
    pub is_leaf: bool,
    pub children: Vec<Category>,
    pub breadcrumb: Vec<BreadcrumbEntry>,
}

impl Category {
    /// Synthetic node for the empty path. Its children are the top-level categories.
    pub fn root(children: Vec<CategoryDto>) -> Self {
        Self {
            id: ROOT_ID.to_string(),
            name: ROOT_ID.to_string(),
            localized_name: None,
            slug: String::new(),
            path: String::new(),
            image: None,
            description: None,
            is_leaf: false,
            children: children
                .into_iter()
                .map(|c| Self::child_of("", c))
                .collect(),
            breadcrumb: vec![],
        }
    }

    /// Merges a resolve-by-path response. `requested` backs up a missing `path`.
    pub fn from_resolved(requested: &str, resolved: ResolvedCategoryDto) -> Self {
        let ResolvedCategoryDto {
            category,
            children,
            breadcrumb,
            is_leaf,
        } = resolved;
        let path = category
            .path
            .as_deref()
            .map(normalize_path)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| normalize_path(requested));
        let children = children
            .into_iter()
            .map(|c| Self::child_of(&path, c))
            .collect();
        Self {
            id: category.id,
            name: category.name,
            localized_name: category.localized_name,
            slug: category.slug,
            path,
            image: category.image,
            description: category.description,
            is_leaf,
            children,
            breadcrumb,
        }
    }

    fn child_of(parent_path: &str, dto: CategoryDto) -> Self {
        let path = dto
            .path
            .as_deref()
            .map(normalize_path)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| child_path(parent_path, &dto.slug));
        Self {
            id: dto.id,
            name: dto.name,
            localized_name: dto.localized_name,
            slug: dto.slug,
            path,
            image: dto.image,
            description: dto.description,
            is_leaf: dto.is_leaf.unwrap_or(false),
            children: vec![],
            breadcrumb: vec![],
        }
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID && self.path.is_empty()
    }

    /// Whether attribute filters and direct product listing apply.
    pub fn accepts_filters(&self) -> bool {
        self.is_leaf && !self.id.trim().is_empty()
    }

    pub fn display_name(&self, locale: &Locale) -> &str {
        localized(self.localized_name.as_ref(), locale, &self.name)
    }

    pub fn display_description(&self, locale: &Locale) -> Option<&str> {
        self.description.as_ref().and_then(|d| d.get(locale))
    }
}
