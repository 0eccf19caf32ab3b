//! Columnar view of search points over the space's variables.

use so_surrogate::{FeatureMatrix, SurrogateError};
use so_types::{runtime_error, value_error, SearchPoint, SpaceOptError, SpaceOptResult, Value};

use crate::space::Space;

/// One column per variable, in variable order.
///
/// Keys outside the space (the target, for evaluated points) are dropped
/// when the table is built.
#[derive(Debug, Clone, PartialEq)]
pub struct SpointTable {
    names: Vec<String>,
    columns: Vec<Vec<Value>>,
    n_rows: usize,
}

impl SpointTable {
    pub fn from_spoints(space: &Space, points: &[SearchPoint]) -> SpaceOptResult<Self> {
        let mut columns: Vec<Vec<Value>> = space
            .variables()
            .iter()
            .map(|_| Vec::with_capacity(points.len()))
            .collect();

        for point in points {
            for (variable, column) in space.variables().iter().zip(columns.iter_mut()) {
                let value = point.get(variable.name()).ok_or_else(|| {
                    value_error!(
                        "spoint={point} should have variable named '{}'.",
                        variable.name()
                    )
                })?;
                column.push(value.clone());
            }
        }

        Ok(Self {
            names: space
                .variable_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            columns,
            n_rows: points.len(),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    pub(crate) fn columns_mut(&mut self) -> impl Iterator<Item = &mut [Value]> {
        self.columns.iter_mut().map(Vec::as_mut_slice)
    }

    /// Numeric feature matrix. Categorical columns must be encoded first.
    pub fn to_feature_matrix(&self) -> SpaceOptResult<FeatureMatrix> {
        let mut rows = vec![Vec::with_capacity(self.columns.len()); self.n_rows];
        for (name, column) in self.names.iter().zip(&self.columns) {
            for (row, value) in rows.iter_mut().zip(column) {
                let feature = value.as_f64().ok_or_else(|| {
                    runtime_error!(
                        "column '{name}' holds non-numeric value={value}, \
                         it should be encoded before training."
                    )
                })?;
                row.push(feature);
            }
        }
        FeatureMatrix::from_rows(rows).map_err(surrogate_error)
    }

    /// Rebuild one point per row.
    pub fn into_spoints(self) -> Vec<SearchPoint> {
        let mut points = vec![SearchPoint::new(); self.n_rows];
        for (name, column) in self.names.iter().zip(self.columns) {
            for (point, value) in points.iter_mut().zip(column) {
                point.insert(name.as_str(), value);
            }
        }
        points
    }
}

/// Surrogate failures surface as runtime errors.
pub(crate) fn surrogate_error(err: SurrogateError) -> SpaceOptError {
    runtime_error!("surrogate model failed: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> Space {
        Space::new(vec![
            ("a", vec![Value::Int(1), Value::Int(2)]),
            ("d", vec![Value::from("typeX"), Value::from("typeY")]),
            ("e", vec![Value::Bool(true), Value::Bool(false)]),
        ])
        .unwrap()
    }

    fn points() -> Vec<SearchPoint> {
        vec![
            SearchPoint::new()
                .with("a", 2)
                .with("d", "typeY")
                .with("e", true)
                .with("y", 0.5),
            SearchPoint::new().with("a", 1).with("d", "typeX").with("e", false),
        ]
    }

    #[test]
    fn builds_columns_in_variable_order_and_drops_extra_keys() {
        let table = SpointTable::from_spoints(&space(), &points()).unwrap();
        assert_eq!(table.names(), &["a", "d", "e"]);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(
            table.column("d").unwrap(),
            &[Value::from("typeY"), Value::from("typeX")]
        );
        assert!(table.column("y").is_none());
    }

    #[test]
    fn missing_variable_is_value_error() {
        let err = SpointTable::from_spoints(&space(), &[SearchPoint::new().with("a", 1)])
            .unwrap_err();
        assert!(err.is_value());
    }

    #[test]
    fn feature_matrix_requires_encoding() {
        let space = space();
        let mut table = SpointTable::from_spoints(&space, &points()).unwrap();
        assert!(table.to_feature_matrix().unwrap_err().is_runtime());

        space.encode_variables(&mut table).unwrap();
        let features = table.to_feature_matrix().unwrap();
        assert_eq!(features.n_rows(), 2);
        assert_eq!(features.row(0), &[2.0, 1.0, 1.0]);
        assert_eq!(features.row(1), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn decode_then_rebuild_points() {
        let space = space();
        let mut table = SpointTable::from_spoints(&space, &points()).unwrap();
        space.encode_variables(&mut table).unwrap();
        space.decode_variables(&mut table).unwrap();

        let rebuilt = table.into_spoints();
        let mut expected = points();
        expected[0].remove("y");
        assert_eq!(rebuilt, expected);
    }
}
