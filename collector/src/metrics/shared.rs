use serde::{
    Deserialize,
    Serialize,
};
use strum::{
    Display,
    EnumIter,
};

#[derive(Debug, Clone, Copy, Display, EnumIter, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MetricType {
    Gauge,
    Counter,
}

/// Traffic direction of a network interface, as named in the usage schema.
#[derive(Debug, Clone, Copy, Display, EnumIter, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    Rx,
    Tx,
}

/// Disk operation, as named in the usage schema.
#[derive(Debug, Clone, Copy, Display, EnumIter, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DiskOperation {
    Read,
    Write,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Rx => "rx",
            Direction::Tx => "tx",
        }
    }
}

impl DiskOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiskOperation::Read => "read",
            DiskOperation::Write => "write",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn display_matches_schema_names() {
        assert_eq!(Direction::iter().map(|d| d.to_string()).collect::<Vec<_>>(), ["rx", "tx"]);
        assert_eq!(
            DiskOperation::iter().map(|op| op.to_string()).collect::<Vec<_>>(),
            ["read", "write"]
        );
        for direction in Direction::iter() {
            assert_eq!(direction.to_string(), direction.as_str());
        }
        assert_eq!(MetricType::Counter.to_string(), "counter");
    }
}
