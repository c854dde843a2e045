//! AI-assisted guesses of a device's category and power from its name

pub mod reconciler;

pub use reconciler::{FormMode, SuggestionReconciler, SuggestionState};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::devices::Category;
use crate::error::{Error, Result};
use crate::fetch::Gateway;
use crate::validation::{format_number, DeviceForm};

/// Name length, in characters after trimming, that triggers a request
pub const MIN_SUGGESTION_CHARS: usize = 3;

const SUGGEST_PATH: &str = "/api/dispositivos/sugerir";

/// A proposed category and power rating; at least one is present
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Suggestion {
    pub category: Option<Category>,
    pub power_watts: Option<f64>,
}

#[derive(Debug, Serialize)]
struct SuggestRequest<'a> {
    #[serde(rename = "nombre")]
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct SuggestResponse {
    #[serde(rename = "sugerencia", default)]
    suggestion: Option<RawSuggestion>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSuggestion {
    #[serde(rename = "categoria", default)]
    category: Option<String>,
    #[serde(rename = "potencia_watts", default)]
    power_watts: Option<f64>,
}

impl RawSuggestion {
    /// Keep only usable fields; `None` when nothing usable is left
    fn into_suggestion(self) -> Option<Suggestion> {
        let category = self
            .category
            .filter(|c| !c.trim().is_empty())
            .and_then(|c| match c.parse::<Category>() {
                Ok(category) => Some(category),
                Err(e) => {
                    log::warn!("Ignoring suggested {}", e);
                    None
                }
            });

        let power_watts = self.power_watts.filter(|w| {
            let usable = w.is_finite() && *w >= 0.0;
            if !usable {
                log::warn!("Ignoring suggested power {}", w);
            }
            usable
        });

        if category.is_none() && power_watts.is_none() {
            None
        } else {
            Some(Suggestion {
                category,
                power_watts,
            })
        }
    }
}

/// Something that can guess device attributes from a name
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    /// `Ok(None)` when there is nothing to propose
    async fn suggest(&self, name: &str) -> Result<Option<Suggestion>>;
}

/// Client for the inference endpoint
#[derive(Debug, Clone)]
pub struct SuggestionClient {
    gateway: Gateway,
}

impl SuggestionClient {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl SuggestionSource for SuggestionClient {
    async fn suggest(&self, name: &str) -> Result<Option<Suggestion>> {
        let response: SuggestResponse = self
            .gateway
            .post(SUGGEST_PATH)
            .authenticated()
            .json(&SuggestRequest { name })?
            .execute()
            .await
            .map_err(|e| match e {
                Error::MalformedResponse(msg) => Error::malformed(format!("suggestion: {}", msg)),
                other => other,
            })?;

        Ok(response.suggestion.and_then(RawSuggestion::into_suggestion))
    }
}

/// `form` with the candidate's category and power written over it
///
/// Name and hours are never touched, and a field the candidate lacks keeps
/// the form's current value.
pub fn apply(candidate: &Suggestion, form: &DeviceForm) -> DeviceForm {
    let mut next = form.clone();
    if let Some(category) = candidate.category {
        next.category = category.as_str().to_string();
    }
    if let Some(watts) = candidate.power_watts {
        next.power_watts = format_number(watts);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> Option<Suggestion> {
        serde_json::from_value::<SuggestResponse>(value)
            .unwrap()
            .suggestion
            .and_then(RawSuggestion::into_suggestion)
    }

    #[test]
    fn test_decode_suggestion() {
        assert_eq!(
            decode(json!({"sugerencia": {"categoria": "Climatización", "potencia_watts": 1500}})),
            Some(Suggestion {
                category: Some(Category::Climate),
                power_watts: Some(1500.0),
            })
        );
        assert_eq!(decode(json!({})), None);
        assert_eq!(decode(json!({"sugerencia": {}})), None);
        assert_eq!(
            decode(json!({"sugerencia": {"categoria": "Cocina", "potencia_watts": -3}})),
            None
        );
        assert_eq!(
            decode(json!({"sugerencia": {"categoria": "Cocina", "potencia_watts": 40}})),
            Some(Suggestion {
                category: None,
                power_watts: Some(40.0),
            })
        );
    }

    #[test]
    fn test_apply_overwrites_category_and_power_only() {
        let form = DeviceForm {
            name: "Aire Acondicionado".to_string(),
            category: "Otros".to_string(),
            power_watts: "900".to_string(),
            daily_usage_hours: "8".to_string(),
        };
        let candidate = Suggestion {
            category: Some(Category::Climate),
            power_watts: Some(1500.0),
        };

        let next = apply(&candidate, &form);
        assert_eq!(next.name, "Aire Acondicionado");
        assert_eq!(next.daily_usage_hours, "8");
        assert_eq!(next.category, "Climatización");
        assert_eq!(next.power_watts, "1500");
        // the input form is untouched
        assert_eq!(form.category, "Otros");
    }

    #[test]
    fn test_apply_partial_candidate() {
        let form = DeviceForm {
            category: "Otros".to_string(),
            ..DeviceForm::new()
        };
        let next = apply(
            &Suggestion {
                category: None,
                power_watts: Some(7.5),
            },
            &form,
        );
        assert_eq!(next.category, "Otros");
        assert_eq!(next.power_watts, "7.5");
    }
}
