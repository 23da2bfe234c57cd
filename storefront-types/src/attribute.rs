use crate::{localized, Locale, LocalizedText};
use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    #[display("select")]
    Select,
    #[display("multiSelect")]
    MultiSelect,
    #[display("numberRange")]
    NumberRange,
    #[display("text")]
    Text,
}

impl AttributeType {
    pub fn parse<S: AsRef<str>>(s: S) -> Option<Self> {
        match s
            .as_ref()
            .trim()
            .to_lowercase()
            .replace(['_', '-', ' '], "")
            .as_str()
        {
            "select" | "dropdown" => Some(Self::Select),
            "multiselect" | "checkbox" => Some(Self::MultiSelect),
            "numberrange" | "range" | "number" => Some(Self::NumberRange),
            "text" | "string" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn has_options(&self) -> bool {
        matches!(self, Self::Select | Self::MultiSelect)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttributeOption {
    pub value: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub localized_label: Option<LocalizedText>,
}

impl AttributeOption {
    pub fn display_label(&self, locale: &Locale) -> &str {
        let fallback = if self.label.trim().is_empty() {
            &self.value
        } else {
            &self.label
        };
        localized(self.localized_label.as_ref(), locale, fallback)
    }
}

/// Attribute as sent by `GET /category-attributes/{id}/filters`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAttributeDto {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub localized_label: Option<LocalizedText>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub options: Option<Vec<AttributeOption>>,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAttribute {
    pub key: String,
    pub label: String,
    pub localized_label: Option<LocalizedText>,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    pub options: Option<Vec<AttributeOption>>,
    pub filterable: bool,
    pub required: bool,
    pub order: i32,
    pub unit: Option<String>,
}

impl CategoryAttribute {
    pub fn display_label(&self, locale: &Locale) -> &str {
        let fallback = if self.label.trim().is_empty() {
            &self.key
        } else {
            &self.label
        };
        localized(self.localized_label.as_ref(), locale, fallback)
    }

    fn from_dto(dto: CategoryAttributeDto) -> Option<Self> {
        let Some(kind) = AttributeType::parse(&dto.kind) else {
            log::warn!(
                "Skipping attribute {} with unknown type {:?}",
                dto.key,
                dto.kind
            );
            return None;
        };
        let options = kind
            .has_options()
            .then(|| dto.options.unwrap_or_default());
        Some(Self {
            key: dto.key,
            label: dto.label,
            localized_label: dto.localized_label,
            kind,
            options,
            filterable: dto.filterable,
            required: dto.required,
            order: dto.order,
            unit: dto.unit,
        })
    }
}

/// Keeps filterable attributes of a known type, ordered by `order`.
/// Equal `order` values keep the response order.
pub fn prepare_schema(raw: Vec<CategoryAttributeDto>) -> Vec<CategoryAttribute> {
    let mut attributes: Vec<_> = raw
        .into_iter()
        .filter(|a| a.filterable && !a.key.trim().is_empty())
        .filter_map(CategoryAttribute::from_dto)
        .collect();
    attributes.sort_by_key(|a| a.order);
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> Vec<CategoryAttributeDto> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn drops_non_filterable_attributes() {
        let schema = prepare_schema(raw(json!([
            {"key": "color", "label": "Color", "type": "select", "filterable": true, "options": [{"value": "red"}]},
            {"key": "weight", "label": "Weight", "type": "text", "filterable": false},
        ])));
        assert_eq!(schema.len(), 1);
        assert_eq!(schema[0].key, "color");
    }

    #[test]
    fn sorts_by_order_stably() {
        let schema = prepare_schema(raw(json!([
            {"key": "a", "type": "text", "filterable": true, "order": 2},
            {"key": "b", "type": "text", "filterable": true, "order": 1},
            {"key": "c", "type": "text", "filterable": true, "order": 2},
            {"key": "d", "type": "text", "filterable": true, "order": 1},
        ])));
        let keys: Vec<_> = schema.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn options_present_only_for_select_types() {
        let schema = prepare_schema(raw(json!([
            {"key": "size", "type": "multiSelect", "filterable": true},
            {"key": "price", "type": "numberRange", "filterable": true, "options": [{"value": "x"}]},
            {"key": "brand", "type": "select", "filterable": true, "options": [{"value": "acme", "label": "Acme"}]},
        ])));
        assert_eq!(schema[0].options, Some(vec![]));
        assert_eq!(schema[1].options, None);
        assert_eq!(schema[2].options.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn unknown_types_are_skipped() {
        let schema = prepare_schema(raw(json!([
            {"key": "color", "type": "colour-wheel", "filterable": true},
            {"key": "ram", "type": "number_range", "filterable": true},
        ])));
        assert_eq!(schema.len(), 1);
        assert_eq!(schema[0].kind, AttributeType::NumberRange);
    }

    #[test]
    fn labels_fall_back_to_key_and_value() {
        let schema = prepare_schema(raw(json!([
            {"key": "color", "type": "select", "filterable": true, "options": [{"value": "red"}]},
        ])));
        let locale = Locale::default();
        assert_eq!(schema[0].display_label(&locale), "color");
        let options = schema[0].options.as_ref().unwrap();
        assert_eq!(options[0].display_label(&locale), "red");
    }
}
