//! Serializable optimizer configuration.

use serde::{Deserialize, Serialize};

use so_surrogate::GbdtParams;
use so_types::{json_type_name, type_error, value_error, SpaceOptResult};

/// Everything needed to build an [`crate::Optimizer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// JSON object mapping variable names to value arrays. Key order is
    /// variable order.
    pub search_space: serde_json::Value,

    /// Key under which evaluated points carry the objective value.
    pub target_name: String,

    /// One of `maximize`, `minimize`, `max`, `min`.
    pub objective: String,

    /// RNG seed. A random seed is drawn when unset.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub trainer: GbdtParams,
}

impl OptimizerConfig {
    pub fn new(search_space: serde_json::Value, target_name: &str, objective: &str) -> Self {
        Self {
            search_space,
            target_name: target_name.to_string(),
            objective: objective.to_string(),
            seed: None,
            trainer: GbdtParams::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_trainer_params(mut self, params: GbdtParams) -> Self {
        self.trainer = params;
        self
    }

    /// Parse a config document, reporting malformed fields with the same
    /// error kinds the optimizer uses.
    pub fn from_json(json: &serde_json::Value) -> SpaceOptResult<Self> {
        let object = json.as_object().ok_or_else(|| {
            type_error!(
                "config={json} is of type {}, but it should be of type object.",
                json_type_name(json)
            )
        })?;

        let search_space = object
            .get("search_space")
            .cloned()
            .ok_or_else(|| value_error!("config is missing 'search_space'."))?;
        let target_name = string_field(object, "target_name")?;
        let objective = string_field(object, "objective")?;

        let seed = match object.get("seed") {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => Some(value.as_u64().ok_or_else(|| {
                type_error!(
                    "seed={value} is of type {}, but it should be a non-negative int.",
                    json_type_name(value)
                )
            })?),
        };

        let trainer = match object.get("trainer") {
            None | Some(serde_json::Value::Null) => GbdtParams::default(),
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| value_error!("trainer={value} is invalid: {e}."))?,
        };

        Ok(Self {
            search_space,
            target_name,
            objective,
            seed,
            trainer,
        })
    }

    pub fn from_json_str(text: &str) -> SpaceOptResult<Self> {
        let json: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| value_error!("config is not valid JSON: {e}."))?;
        Self::from_json(&json)
    }
}

fn string_field(
    object: &serde_json::Map<String, serde_json::Value>,
    field: &str,
) -> SpaceOptResult<String> {
    let value = object
        .get(field)
        .ok_or_else(|| value_error!("config is missing '{field}'."))?;
    value.as_str().map(str::to_string).ok_or_else(|| {
        type_error!(
            "{field} is of type {}, but it should be of type str.",
            json_type_name(value)
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_defaults() {
        let config = OptimizerConfig::new(json!({"a": [1, 2]}), "y", "min").with_seed(7);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.trainer, GbdtParams::default());
    }

    #[test]
    fn parses_full_document() {
        let config = OptimizerConfig::from_json_str(
            r#"{
                "search_space": {"b": [1.5, 2.5], "a": ["x", "y"]},
                "target_name": "score",
                "objective": "maximize",
                "seed": 11,
                "trainer": {"learning_rate": 0.05}
            }"#,
        )
        .unwrap();
        assert_eq!(config.target_name, "score");
        assert_eq!(config.objective, "maximize");
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.trainer.learning_rate, 0.05);
        assert_eq!(config.trainer.num_leaves, GbdtParams::default().num_leaves);

        let keys: Vec<&str> = config
            .search_space
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn malformed_fields() {
        assert!(OptimizerConfig::from_json(&json!([])).unwrap_err().is_type());

        let err = OptimizerConfig::from_json(&json!({"search_space": {}, "objective": "min"}))
            .unwrap_err();
        assert!(err.is_value());

        let err = OptimizerConfig::from_json(
            &json!({"search_space": {}, "target_name": 3, "objective": "min"}),
        )
        .unwrap_err();
        assert!(err.is_type());
        assert_eq!(err.message(), "target_name is of type int, but it should be of type str.");

        let err = OptimizerConfig::from_json(
            &json!({"search_space": {}, "target_name": "y", "objective": "min", "seed": -1}),
        )
        .unwrap_err();
        assert!(err.is_type());

        assert!(OptimizerConfig::from_json_str("{").unwrap_err().is_value());
    }

    #[test]
    fn serde_round_trip() {
        let config = OptimizerConfig::new(json!({"a": [true, false]}), "y", "max").with_seed(3);
        let text = serde_json::to_string(&config).unwrap();
        let back: OptimizerConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
