//! A single named, enumerated search dimension.

use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::fmt;

use so_types::{
    format_values, json_type_name, runtime_error, type_error, value_error, SpaceOptResult, VType,
    Value,
};

use crate::space::render_block;

/// How a variable's values map to trainer features.
///
/// Only string-valued variables carry a mapping; every other type is fed to
/// the trainer as-is.
#[derive(Debug, Clone, PartialEq)]
enum Encoding {
    Identity,
    Categorical(HashMap<String, usize>),
}

/// One dimension of the search space: a name and its ordered list of values.
///
/// The position of a value in `values` is its categorical code.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    values: Vec<Value>,
    vtype: VType,
    encoding: Encoding,
}

impl Variable {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> SpaceOptResult<Self> {
        let name = name.into();
        if values.is_empty() {
            return Err(value_error!(
                "Variable named '{name}' has an empty list of values."
            ));
        }

        let vtypes: HashSet<VType> = values.iter().map(Value::vtype).collect();
        if vtypes.len() != 1 {
            let value_types: Vec<String> = values
                .iter()
                .map(|v| format!("{v} : {}", v.vtype()))
                .collect();
            return Err(mixed_types_error(&name, &format_values(&values), &value_types));
        }
        let vtype = values[0].vtype();

        let encoding = if vtype == VType::Str {
            let mut codes = HashMap::with_capacity(values.len());
            for (code, value) in values.iter().enumerate() {
                if let Value::Str(s) = value {
                    // repeated values keep their first position
                    codes.entry(s.clone()).or_insert(code);
                }
            }
            Encoding::Categorical(codes)
        } else {
            Encoding::Identity
        };

        Ok(Self {
            name,
            values,
            vtype,
            encoding,
        })
    }

    /// Build a variable from a JSON array of scalars.
    pub fn from_json(name: impl Into<String>, json: &serde_json::Value) -> SpaceOptResult<Self> {
        let name = name.into();
        let items = json.as_array().ok_or_else(|| {
            type_error!(
                "Variable named '{name}' has values={json} of type {}, \
                 but it should be of type array.",
                json_type_name(json)
            )
        })?;
        if items.is_empty() {
            return Err(value_error!(
                "Variable named '{name}' has an empty list of values."
            ));
        }

        let type_names: HashSet<&str> = items.iter().map(json_type_name).collect();
        if type_names.len() != 1 {
            let value_types: Vec<String> = items
                .iter()
                .map(|v| format!("{v} : {}", json_type_name(v)))
                .collect();
            return Err(mixed_types_error(&name, &json.to_string(), &value_types));
        }

        let values = items
            .iter()
            .map(Value::from_json)
            .collect::<Option<Vec<Value>>>()
            .ok_or_else(|| {
                runtime_error!(
                    "All values={json} for a Variable named '{name}' are of type {}, \
                     which is not allowed. Please use one of: {}.",
                    json_type_name(&items[0]),
                    allowed_types()
                )
            })?;
        Self::new(name, values)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn vtype(&self) -> VType {
        self.vtype
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self.encoding, Encoding::Categorical(_))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.values.contains(value)
    }

    /// Numeric feature the trainer sees for `value`: numbers as-is, bools as
    /// 0/1, strings as their code.
    pub fn feature_value(&self, value: &Value) -> SpaceOptResult<f64> {
        let feature = match (&self.encoding, value) {
            (Encoding::Categorical(codes), Value::Str(s)) => {
                codes.get(s.as_str()).map(|&code| code as f64)
            }
            (Encoding::Identity, v) => v.as_f64(),
            _ => None,
        };
        feature.ok_or_else(|| {
            value_error!(
                "Variable named '{}' has no feature for value={value}.",
                self.name
            )
        })
    }

    /// Uniform draw from the declared values.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        self.values[rng.gen_range(0..self.values.len())].clone()
    }

    /// Replace categorical values in `column` with their codes.
    pub fn encode(&self, column: &mut [Value]) -> SpaceOptResult<()> {
        let Encoding::Categorical(codes) = &self.encoding else {
            return Ok(());
        };
        for value in column.iter_mut() {
            let code = match value {
                Value::Str(s) => codes.get(s.as_str()).copied(),
                _ => None,
            }
            .ok_or_else(|| {
                value_error!(
                    "Variable named '{}' cannot encode value={value}, which is \
                     outside of the defined list of values={}.",
                    self.name,
                    format_values(&self.values)
                )
            })?;
            *value = Value::Int(code as i64);
        }
        Ok(())
    }

    /// Inverse of [`Variable::encode`].
    pub fn decode(&self, column: &mut [Value]) -> SpaceOptResult<()> {
        if !self.is_categorical() {
            return Ok(());
        }
        for value in column.iter_mut() {
            let decoded = match value {
                Value::Int(code) => usize::try_from(*code)
                    .ok()
                    .and_then(|c| self.values.get(c))
                    .cloned(),
                _ => None,
            }
            .ok_or_else(|| {
                value_error!(
                    "Variable named '{}' cannot decode value={value}, codes should be \
                     in 0..{}.",
                    self.name,
                    self.values.len()
                )
            })?;
            *value = decoded;
        }
        Ok(())
    }
}

fn allowed_types() -> String {
    VType::ALLOWED
        .iter()
        .map(VType::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn mixed_types_error(name: &str, values: &str, value_types: &[String]) -> so_types::SpaceOptError {
    runtime_error!(
        "Multiple value types for a Variable named '{name}' with values={values}. \
         Encountered value types:\n{}\nAll values should be of the same type. \
         Allowed value types: {}.",
        value_types.join("\n"),
        allowed_types()
    )
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            format!("name='{}'", self.name),
            format!("values={}", format_values(&self.values)),
            format!("vtype={}", self.vtype),
            format!("is_categorical={}", self.is_categorical()),
        ];
        f.write_str(&render_block("Variable", &fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;

    fn strings(values: &[&str]) -> Vec<Value> {
        values.iter().map(|s| Value::from(*s)).collect()
    }

    #[test]
    fn infers_vtype() {
        let v = Variable::new("a", vec![Value::Int(1), Value::Int(2)]).unwrap();
        assert_eq!(v.vtype(), VType::Int);
        assert!(!v.is_categorical());

        let v = Variable::new("d", strings(&["typeX", "typeY"])).unwrap();
        assert_eq!(v.vtype(), VType::Str);
        assert!(v.is_categorical());

        let v = Variable::new("e", vec![Value::Bool(true), Value::Bool(false)]).unwrap();
        assert_eq!(v.vtype(), VType::Bool);
    }

    #[test]
    fn empty_values_is_value_error() {
        let err = Variable::new("a", vec![]).unwrap_err();
        assert!(err.is_value());
        assert_eq!(err.to_string(), "Variable named 'a' has an empty list of values.");
    }

    #[test]
    fn mixed_types_is_runtime_error_listing_each_value() {
        let err = Variable::new("a", vec![Value::Int(1), Value::Float(2.0), Value::from("x")])
            .unwrap_err();
        assert!(err.is_runtime());
        assert_eq!(
            err.to_string(),
            "Multiple value types for a Variable named 'a' with values=[1, 2.0, 'x']. \
             Encountered value types:\n1 : int\n2.0 : float\n'x' : str\n\
             All values should be of the same type. Allowed value types: float, int, str, bool."
        );
    }

    #[test]
    fn bool_and_int_do_not_mix() {
        let err = Variable::new("a", vec![Value::Bool(true), Value::Int(1)]).unwrap_err();
        assert!(err.is_runtime());
    }

    #[test]
    fn from_json_taxonomy() {
        let err = Variable::from_json("a", &json!({"x": 1})).unwrap_err();
        assert!(err.is_type());

        let err = Variable::from_json("a", &json!([])).unwrap_err();
        assert!(err.is_value());

        let err = Variable::from_json("a", &json!([null, null])).unwrap_err();
        assert!(err.is_runtime());
        assert_eq!(
            err.to_string(),
            "All values=[null,null] for a Variable named 'a' are of type null, \
             which is not allowed. Please use one of: float, int, str, bool."
        );

        let err = Variable::from_json("a", &json!([1, 2.5])).unwrap_err();
        assert!(err.is_runtime());

        let v = Variable::from_json("b", &json!([-5.5, 0.0, 5.5])).unwrap();
        assert_eq!(v.vtype(), VType::Float);
        assert_eq!(v.len(), 3);

        let err = Variable::from_json("c", &json!([u64::MAX])).unwrap_err();
        assert!(err.is_runtime());
        assert!(err.message().contains("are of type uint64, which is not allowed"));
    }

    #[test]
    fn sample_draws_from_values() {
        let v = Variable::new("c", vec![Value::Int(128), Value::Int(256)]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut seen = HashSet::new();
        for _ in 0..100 {
            let value = v.sample(&mut rng);
            assert!(v.contains(&value));
            seen.insert(value);
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn encode_decode_round_trip() {
        let v = Variable::new("d", strings(&["typeX", "typeY", "typeZ"])).unwrap();
        let original = strings(&["typeZ", "typeX", "typeZ", "typeY"]);
        let mut column = original.clone();

        v.encode(&mut column).unwrap();
        assert_eq!(
            column,
            vec![Value::Int(2), Value::Int(0), Value::Int(2), Value::Int(1)]
        );

        v.decode(&mut column).unwrap();
        assert_eq!(column, original);
    }

    #[test]
    fn encode_is_identity_for_non_categorical() {
        let v = Variable::new("b", vec![Value::Float(1.1), Value::Float(2.2)]).unwrap();
        let mut column = vec![Value::Float(2.2)];
        v.encode(&mut column).unwrap();
        assert_eq!(column, vec![Value::Float(2.2)]);
        v.decode(&mut column).unwrap();
        assert_eq!(column, vec![Value::Float(2.2)]);
    }

    #[test]
    fn encode_rejects_unknown_and_decode_rejects_out_of_range() {
        let v = Variable::new("d", strings(&["typeX"])).unwrap();
        assert!(v.encode(&mut [Value::from("typeQ")]).unwrap_err().is_value());
        assert!(v.decode(&mut [Value::Int(1)]).unwrap_err().is_value());
        assert!(v.decode(&mut [Value::Int(-1)]).unwrap_err().is_value());
    }

    #[test]
    fn feature_values() {
        let d = Variable::new("d", strings(&["typeX", "typeY"])).unwrap();
        assert_eq!(d.feature_value(&Value::from("typeY")).unwrap(), 1.0);
        assert!(d.feature_value(&Value::from("typeQ")).unwrap_err().is_value());

        let e = Variable::new("e", vec![Value::Bool(true), Value::Bool(false)]).unwrap();
        assert_eq!(e.feature_value(&Value::Bool(true)).unwrap(), 1.0);

        let b = Variable::new("b", vec![Value::Float(-5.5)]).unwrap();
        assert_eq!(b.feature_value(&Value::Float(-5.5)).unwrap(), -5.5);
    }

    #[test]
    fn display_layout() {
        let v = Variable::new("d", strings(&["typeX", "typeY"])).unwrap();
        assert_eq!(
            v.to_string(),
            "Variable(\n    name='d',\n    values=['typeX', 'typeY'],\n    vtype=str,\n    is_categorical=true\n)"
        );
    }
}
