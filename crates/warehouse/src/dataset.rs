//! Dataset references of the form `project.dataset`.

use datacopilot_core::error::EngineError;
use std::fmt;
use std::str::FromStr;

/// A fully qualified dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRef {
    pub project: String,
    pub dataset: String,
}

/// Check that `table` is a bare table id inside the configured dataset.
///
/// Only ASCII letters, digits, `_`, `$` and `-` are accepted, so the name
/// can be placed in a REST path without escaping.
pub fn table_id(table: &str) -> Result<&str, EngineError> {
    let table = table.trim();
    let valid = !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-'));
    if valid {
        Ok(table)
    } else {
        Err(EngineError::NotFound(format!(
            "Table {table} was not found: expected a bare table name such as 'orders'"
        )))
    }
}

impl FromStr for DatasetRef {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('.') {
            Some((project, dataset))
                if !project.is_empty() && !dataset.is_empty() && !dataset.contains('.') =>
            {
                Ok(Self {
                    project: project.to_string(),
                    dataset: dataset.to_string(),
                })
            }
            _ => Err(EngineError::NotConfigured(format!(
                "dataset id '{s}' is not of the form project.dataset"
            ))),
        }
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.project, self.dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_public_dataset() {
        let ds: DatasetRef = "bigquery-public-data.thelook_ecommerce".parse().unwrap();
        assert_eq!(ds.project, "bigquery-public-data");
        assert_eq!(ds.dataset, "thelook_ecommerce");
        assert_eq!(ds.to_string(), "bigquery-public-data.thelook_ecommerce");
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!("thelook_ecommerce".parse::<DatasetRef>().is_err());
        assert!(".dataset".parse::<DatasetRef>().is_err());
        assert!("a.b.c".parse::<DatasetRef>().is_err());
    }

    #[test]
    fn table_id_accepts_bare_names() {
        assert_eq!(table_id("orders").unwrap(), "orders");
        assert_eq!(table_id(" order_items ").unwrap(), "order_items");
        assert_eq!(table_id("events_2024-01$1").unwrap(), "events_2024-01$1");
    }

    #[test]
    fn table_id_rejects_paths_and_url_syntax() {
        for name in [
            "../../../../other-proj/datasets/secret_ds/tables/salaries",
            "orders/../users",
            "orders?fields=schema",
            "orders#frag",
            "other_ds.orders",
            "orders%2F..",
            "",
        ] {
            let err = table_id(name).unwrap_err();
            assert!(matches!(err, EngineError::NotFound(_)), "{name} was accepted");
        }
    }
}
