//! The search space: an ordered product of variables.

use rand::Rng;
use std::collections::HashSet;
use std::fmt;

use so_types::{
    format_values, json_type_name, runtime_error, type_error, value_error, SearchPoint,
    SpaceOptResult, Value,
};

use crate::table::SpointTable;
use crate::variable::Variable;

/// An ordered collection of [`Variable`]s.
///
/// The size of the space is the product of the variables' value counts and
/// is computed once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Space {
    variables: Vec<Variable>,
    size: u128,
}

impl Space {
    /// Build a space from `(name, values)` pairs, keeping their order.
    pub fn new<I, S>(variables: I) -> SpaceOptResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        let variables = variables
            .into_iter()
            .map(|(name, values)| Variable::new(name, values))
            .collect::<SpaceOptResult<Vec<_>>>()?;
        Self::from_variables(variables)
    }

    pub fn from_variables(variables: Vec<Variable>) -> SpaceOptResult<Self> {
        if variables.is_empty() {
            return Err(value_error!("search space is empty."));
        }

        let mut names = HashSet::with_capacity(variables.len());
        for variable in &variables {
            if !names.insert(variable.name()) {
                return Err(runtime_error!(
                    "search space has more than one variable named '{}'.",
                    variable.name()
                ));
            }
        }

        let size = variables.iter().try_fold(1u128, |acc, v| {
            acc.checked_mul(v.len() as u128).ok_or_else(|| {
                runtime_error!("search space size overflows, it does not fit into 128 bits.")
            })
        })?;

        Ok(Self { variables, size })
    }

    /// Build a space from a JSON object mapping names to value arrays.
    ///
    /// Variable order follows the object's key order.
    pub fn from_json(json: &serde_json::Value) -> SpaceOptResult<Self> {
        let object = json.as_object().ok_or_else(|| {
            type_error!(
                "search_space={json} is of type {}, but it should be of type object.",
                json_type_name(json)
            )
        })?;
        let variables = object
            .iter()
            .map(|(name, values)| Variable::from_json(name.as_str(), values))
            .collect::<SpaceOptResult<Vec<_>>>()?;
        Self::from_variables(variables)
    }

    /// Number of distinct points, counting repeated values as distinct.
    pub fn size(&self) -> u128 {
        self.size
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name() == name)
    }

    pub fn contains_variable(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(Variable::name).collect()
    }

    pub fn categorical_names(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|v| v.is_categorical())
            .map(Variable::name)
            .collect()
    }

    /// Feature positions of the categorical variables.
    pub fn categorical_indices(&self) -> Vec<usize> {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_categorical())
            .map(|(i, _)| i)
            .collect()
    }

    /// Draw one point uniformly, one independent draw per variable.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> SearchPoint {
        self.variables
            .iter()
            .map(|v| (v.name().to_string(), v.sample(rng)))
            .collect()
    }

    /// Values of `point` in variable order. `None` if a variable is missing.
    pub fn project(&self, point: &SearchPoint) -> Option<Vec<Value>> {
        self.variables
            .iter()
            .map(|v| point.get(v.name()).cloned())
            .collect()
    }

    /// Check that `point` holds a declared value for every variable.
    ///
    /// Extra keys are allowed.
    pub fn verify_spoint(&self, point: &SearchPoint) -> SpaceOptResult<()> {
        for variable in &self.variables {
            let name = variable.name();
            let value = point.get(name).ok_or_else(|| {
                value_error!("spoint={point} should have variable named '{name}'.")
            })?;
            if value.vtype() != variable.vtype() {
                return Err(type_error!(
                    "spoint has variable named '{name}' with value {value} of type {}, \
                     but it should be of type {}.",
                    value.vtype(),
                    variable.vtype()
                ));
            }
            if !variable.contains(value) {
                return Err(value_error!(
                    "spoint has variable named '{name}' with value={value}, which is \
                     outside of the defined list of values={}.",
                    format_values(variable.values())
                ));
            }
        }
        Ok(())
    }

    /// Encode every categorical column of `table` in place.
    pub fn encode_variables(&self, table: &mut SpointTable) -> SpaceOptResult<()> {
        self.check_table(table)?;
        for (variable, column) in self.variables.iter().zip(table.columns_mut()) {
            variable.encode(column)?;
        }
        Ok(())
    }

    /// Inverse of [`Space::encode_variables`].
    pub fn decode_variables(&self, table: &mut SpointTable) -> SpaceOptResult<()> {
        self.check_table(table)?;
        for (variable, column) in self.variables.iter().zip(table.columns_mut()) {
            variable.decode(column)?;
        }
        Ok(())
    }

    fn check_table(&self, table: &SpointTable) -> SpaceOptResult<()> {
        let matches = table.names().len() == self.variables.len()
            && table
                .names()
                .iter()
                .zip(&self.variables)
                .all(|(name, v)| name == v.name());
        if matches {
            Ok(())
        } else {
            Err(runtime_error!(
                "table columns {:?} do not match search space variables {:?}.",
                table.names(),
                self.variable_names()
            ))
        }
    }
}

/// `Name(\n    field,\n    field\n)`, nested blocks shifted by one level.
pub(crate) fn render_block(name: &str, fields: &[String]) -> String {
    let inner = fields
        .iter()
        .map(|field| field.replace('\n', "\n    "))
        .collect::<Vec<_>>()
        .join(",\n    ");
    format!("{name}(\n    {inner}\n)")
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<String> = self.variables.iter().map(Variable::to_string).collect();
        fields.push(format!("size={}", self.size));
        f.write_str(&render_block("Space", &fields))
    }
}
