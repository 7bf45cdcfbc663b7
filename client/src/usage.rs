//! Round-robin usage series as returned by the `rrd` endpoints.
//!
//! The upstream samples at a fixed interval and the newest rows are still
//! being filled in, so a value for "now" is read a fixed number of rows back
//! from the end of the series. Those newest rows may hold `null`; only the
//! row that is actually read has to be complete.

use crate::error::{
    ClientError,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};

/// Schema column holding the sample time rather than a measurement.
pub const TIMESTAMP_FIELD: &str = "unixtime";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UsageSeries {
    pub schema: Vec<String>,
    #[serde(rename = "data")]
    pub rows: Vec<Vec<Option<f64>>>,
}

impl UsageSeries {
    /// Pick `rows[len - offset]` and pair it with the schema.
    pub fn sample(&self, offset: usize) -> Result<UsageSample> {
        if offset == 0 || offset > self.rows.len() {
            return Err(ClientError::InvalidUsageSeries(format!(
                "cannot take row {offset} from the end of a series with {} rows",
                self.rows.len()
            )));
        }

        let row = &self.rows[self.rows.len() - offset];
        if row.len() != self.schema.len() {
            return Err(ClientError::InvalidUsageSeries(format!(
                "row has {} values but the schema names {} fields",
                row.len(),
                self.schema.len()
            )));
        }

        Ok(UsageSample {
            fields: self.schema.iter().cloned().zip(row.iter().copied()).collect(),
        })
    }
}

/// One row of a [`UsageSeries`], keyed by schema field, in schema order.
///
/// A field the upstream left as `null` is kept as `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UsageSample {
    fields: Vec<(String, Option<f64>)>,
}

impl UsageSample {
    /// Value of `field`, `None` when the field is missing or `null`.
    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .and_then(|(_, value)| *value)
    }

    /// Like [`UsageSample::get`] but a missing or `null` field is an error.
    pub fn require(&self, field: &str) -> Result<f64> {
        match self.fields.iter().find(|(name, _)| name == field) {
            Some((_, Some(value))) => Ok(*value),
            Some((_, None)) => Err(ClientError::InvalidUsageSeries(format!(
                "field {field:?} is null in the selected row"
            ))),
            None => Err(ClientError::InvalidUsageSeries(format!("schema has no {field:?} field"))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// All fields except the [`TIMESTAMP_FIELD`] column, skipping `null` ones.
    pub fn measurements(&self) -> impl Iterator<Item = (&str, f64)> {
        self.iter()
            .filter(|(name, _)| *name != TIMESTAMP_FIELD)
            .filter_map(|(name, value)| value.map(|value| (name, value)))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, f64)> for UsageSample {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().map(|(name, value)| (name, Some(value))).collect(),
        }
    }
}
