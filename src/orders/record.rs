use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Typed view over one entry of the upstream `content` array.
///
/// Only the fields the rows endpoint reads are modelled; everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub order: Option<String>,
    pub material: Option<MaterialRef>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub execution_status: Option<String>,
    pub build_quantity: Option<Value>,
    pub done_quantity: Option<Value>,
    pub production_quantity: Option<Value>,
    pub production_unit_of_measure_object: Option<UomObject>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub erp_unit_of_measure: Option<String>,
    pub base_unit_of_measure_object: Option<UomObject>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub scheduled_start_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub scheduled_completion_date: Option<String>,
    pub priority: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaterialRef {
    #[serde(default, deserialize_with = "lenient_string")]
    pub material: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UomObject {
    #[serde(default, deserialize_with = "lenient_string")]
    pub uom: Option<String>,
}

/// Accepts any JSON scalar as text: order numbers and versions arrive as strings or numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

impl OrderRecord {
    /// First non-empty of: production UOM object, ERP UOM, base UOM object. Empty when none is set.
    pub fn unit_of_measure(&self) -> &str {
        let candidates = [
            self.production_unit_of_measure_object
                .as_ref()
                .and_then(|u| u.uom.as_deref()),
            self.erp_unit_of_measure.as_deref(),
            self.base_unit_of_measure_object
                .as_ref()
                .and_then(|u| u.uom.as_deref()),
        ];
        candidates
            .into_iter()
            .flatten()
            .find(|uom| !uom.is_empty())
            .unwrap_or("")
    }

    pub fn done_or_production_quantity(&self) -> Option<&Value> {
        self.done_quantity
            .as_ref()
            .or(self.production_quantity.as_ref())
            .filter(|v| !v.is_null())
    }
}

/// Flattened record served by `/api/orders/rows`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRow {
    pub order: Option<String>,
    pub material: Option<String>,
    pub material_version: Option<String>,
    pub material_description: Option<String>,
    pub execution_status: Option<String>,
    pub build_quantity: Option<Value>,
    pub done_quantity: Option<Value>,
    pub unit_of_measure: String,
    pub scheduled_start_date: Option<String>,
    pub scheduled_completion_date: Option<String>,
    pub priority: Option<Value>,
}

impl From<&OrderRecord> for OrderRow {
    fn from(record: &OrderRecord) -> Self {
        let material = record.material.clone().unwrap_or_default();
        Self {
            order: record.order.clone(),
            material: material.material,
            material_version: material.version,
            material_description: material.description,
            execution_status: record.execution_status.clone(),
            build_quantity: record.build_quantity.clone(),
            done_quantity: record.done_or_production_quantity().cloned(),
            unit_of_measure: record.unit_of_measure().to_owned(),
            scheduled_start_date: record.scheduled_start_date.clone(),
            scheduled_completion_date: record.scheduled_completion_date.clone(),
            priority: record.priority.clone(),
        }
    }
}
