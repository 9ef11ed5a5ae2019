use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::types::{PlantConfig, PlantMode};
use crate::error::ProxyError;

pub const MATERIAL_REQUIRED: &str = "Material is mandatory and must be a non-empty string.";
pub const DATE_ORDER: &str = "dateFrom cannot be after dateTo.";

static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static date pattern"));

/// Query string of the order endpoints, as sent by the browser form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrderParams {
    pub plant: Option<String>,
    pub material: Option<String>,
    pub order_number: Option<String>,
    pub execution_status: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

/// Validated filter: every field trimmed, blank fields are `None`, dates are well formed and ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
    pub plant: Option<String>,
    pub material: String,
    pub order_number: Option<String>,
    pub execution_status: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

/// Query parameters in the upstream vocabulary. Absent fields are never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamParams {
    pub material: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QueryTranslator {
    plant_mode: PlantMode,
    plant_value: Option<String>,
}

impl Default for QueryTranslator {
    fn default() -> Self {
        Self::new(&PlantConfig::default())
    }
}

impl QueryTranslator {
    pub fn new(plant: &PlantConfig) -> Self {
        Self {
            plant_mode: plant.mode,
            plant_value: clean(&plant.value),
        }
    }

    pub fn validate(&self, raw: &RawOrderParams) -> Result<OrderQuery, ProxyError> {
        let material = clean(&raw.material).ok_or_else(|| ProxyError::validation(MATERIAL_REQUIRED))?;

        let date_from = clean(&raw.date_from);
        check_date("dateFrom", date_from.as_deref())?;
        let date_to = clean(&raw.date_to);
        check_date("dateTo", date_to.as_deref())?;

        if let (Some(from), Some(to)) = (&date_from, &date_to) {
            // fixed-width YYYY-MM-DD orders lexicographically
            if from > to {
                return Err(ProxyError::validation(DATE_ORDER));
            }
        }

        Ok(OrderQuery {
            plant: clean(&raw.plant),
            material,
            order_number: clean(&raw.order_number),
            execution_status: clean(&raw.execution_status),
            date_from,
            date_to,
        })
    }

    pub fn to_upstream_params(&self, query: &OrderQuery) -> UpstreamParams {
        UpstreamParams {
            material: query.material.trim().to_owned(),
            plant: self.resolve_plant(query.plant.as_deref()),
            order: non_blank(query.order_number.as_deref()),
            execution_status: non_blank(query.execution_status.as_deref()),
            date_from: non_blank(query.date_from.as_deref()),
            date_to: non_blank(query.date_to.as_deref()),
        }
    }

    fn resolve_plant(&self, requested: Option<&str>) -> Option<String> {
        match self.plant_mode {
            PlantMode::Caller => non_blank(requested),
            PlantMode::Fixed => self.plant_value.clone(),
            PlantMode::Fallback => non_blank(requested).or_else(|| self.plant_value.clone()),
        }
    }
}

fn clean(value: &Option<String>) -> Option<String> {
    non_blank(value.as_deref())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn check_date(field: &str, value: Option<&str>) -> Result<(), ProxyError> {
    let Some(value) = value else {
        return Ok(());
    };
    let valid = DATE_SHAPE.is_match(value) && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok();
    if valid {
        Ok(())
    } else {
        Err(ProxyError::validation(format!("{} must be in YYYY-MM-DD format.", field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(material: Option<&str>) -> RawOrderParams {
        RawOrderParams {
            material: material.map(str::to_owned),
            ..Default::default()
        }
    }

    fn err_message(res: Result<OrderQuery, ProxyError>) -> String {
        match res {
            Err(ProxyError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn material_is_mandatory() {
        let t = QueryTranslator::default();
        for material in [None, Some(""), Some("   "), Some("\t\n")] {
            assert_eq!(err_message(t.validate(&raw(material))), MATERIAL_REQUIRED);
        }
    }

    #[test]
    fn only_material_is_sent_when_alone() {
        let t = QueryTranslator::default();
        let query = t.validate(&raw(Some("WIDGET-1"))).unwrap();
        let params = t.to_upstream_params(&query);
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            serde_json::json!({"material": "WIDGET-1"})
        );
    }

    #[test]
    fn trims_and_drops_blank_optionals() {
        let t = QueryTranslator::default();
        let query = t
            .validate(&RawOrderParams {
                plant: Some(" 5728 ".into()),
                material: Some("  W1 ".into()),
                order_number: Some("  ".into()),
                execution_status: Some(" ACTIVE ".into()),
                date_from: Some(" 2024-01-01 ".into()),
                date_to: Some("".into()),
            })
            .unwrap();
        let params = t.to_upstream_params(&query);
        assert_eq!(
            params,
            UpstreamParams {
                material: "W1".into(),
                plant: Some("5728".into()),
                order: None,
                execution_status: Some("ACTIVE".into()),
                date_from: Some("2024-01-01".into()),
                date_to: None,
            }
        );
    }

    #[test]
    fn order_number_is_renamed() {
        let t = QueryTranslator::default();
        let mut input = raw(Some("W1"));
        input.order_number = Some("1000123".into());
        let params = t.to_upstream_params(&t.validate(&input).unwrap());
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["order"], "1000123");
        assert!(json.get("orderNumber").is_none());
    }

    #[test]
    fn rejects_malformed_dates() {
        let t = QueryTranslator::default();
        for bad in ["2024-1-05", "05-01-2024", "2024/01/05", "20240105", "2024-01-05T00:00", "abcd-ef-gh"] {
            let mut input = raw(Some("W1"));
            input.date_from = Some(bad.into());
            assert_eq!(err_message(t.validate(&input)), "dateFrom must be in YYYY-MM-DD format.", "{bad}");
        }
    }

    #[test]
    fn rejects_impossible_calendar_dates() {
        let t = QueryTranslator::default();
        for bad in ["2024-02-30", "2023-02-29", "2024-13-01", "2024-00-10", "2024-04-31"] {
            let mut input = raw(Some("W1"));
            input.date_to = Some(bad.into());
            assert_eq!(err_message(t.validate(&input)), "dateTo must be in YYYY-MM-DD format.", "{bad}");
        }
        let mut leap = raw(Some("W1"));
        leap.date_to = Some("2024-02-29".into());
        assert!(t.validate(&leap).is_ok());
    }

    #[test]
    fn date_from_is_checked_first() {
        let t = QueryTranslator::default();
        let mut input = raw(Some("W1"));
        input.date_from = Some("bad".into());
        input.date_to = Some("also-bad".into());
        assert_eq!(err_message(t.validate(&input)), "dateFrom must be in YYYY-MM-DD format.");
    }

    #[test]
    fn material_checked_before_dates() {
        let t = QueryTranslator::default();
        let mut input = raw(None);
        input.date_from = Some("bad".into());
        assert_eq!(err_message(t.validate(&input)), MATERIAL_REQUIRED);
    }

    #[test]
    fn date_range_must_be_ordered() {
        let t = QueryTranslator::default();
        let mut input = raw(Some("W1"));
        input.date_from = Some("2024-02-01".into());
        input.date_to = Some("2024-01-01".into());
        assert_eq!(err_message(t.validate(&input)), DATE_ORDER);

        input.date_to = Some("2024-02-01".into());
        assert!(t.validate(&input).is_ok());
    }

    #[test]
    fn translation_is_idempotent() {
        let t = QueryTranslator::default();
        let mut input = raw(Some(" W1 "));
        input.order_number = Some("42".into());
        input.date_from = Some("2024-01-01".into());
        let first = t.to_upstream_params(&t.validate(&input).unwrap());
        let second = t.to_upstream_params(&t.validate(&input).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn plant_policies() {
        let mut input = raw(Some("W1"));
        input.plant = Some("1000".into());
        let without_plant = raw(Some("W1"));

        let fixed = QueryTranslator::new(&PlantConfig {
            mode: PlantMode::Fixed,
            value: Some("5728".into()),
        });
        let q = fixed.validate(&input).unwrap();
        assert_eq!(fixed.to_upstream_params(&q).plant.as_deref(), Some("5728"));

        let fallback = QueryTranslator::new(&PlantConfig {
            mode: PlantMode::Fallback,
            value: Some("5728".into()),
        });
        let q = fallback.validate(&input).unwrap();
        assert_eq!(fallback.to_upstream_params(&q).plant.as_deref(), Some("1000"));
        let q = fallback.validate(&without_plant).unwrap();
        assert_eq!(fallback.to_upstream_params(&q).plant.as_deref(), Some("5728"));

        let caller = QueryTranslator::default();
        let q = caller.validate(&without_plant).unwrap();
        assert_eq!(caller.to_upstream_params(&q).plant, None);
    }

    #[test]
    fn query_string_shape() {
        let t = QueryTranslator::default();
        let mut input = raw(Some("W 1"));
        input.order_number = Some("42".into());
        input.date_to = Some("2024-03-01".into());
        let params = t.to_upstream_params(&t.validate(&input).unwrap());

        let request = reqwest::Client::new()
            .get("http://upstream/list")
            .query(&params)
            .build()
            .unwrap();
        assert_eq!(request.url().query(), Some("material=W+1&order=42&dateTo=2024-03-01"));
    }
}
