use chrono::Local;
use uuid::Uuid;

/// Names every artifact produced by one run.
///
/// The `(formatted timestamp, uuid)` pair is derived once at start so that
/// concurrent runs against the same bucket and dataset never collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunIdentity {
    formatted_date: String,
    uuid: Uuid,
}

impl RunIdentity {
    /// Derives a fresh identity from the current local time and a random UUID.
    #[must_use]
    pub fn generate() -> Self {
        Self {
            formatted_date: Local::now().format("%Y_%m_%d_%H_%M_%S").to_string(),
            uuid: Uuid::new_v4(),
        }
    }

    /// Builds an identity from known parts. Intended for tests that need
    /// stable artifact names.
    #[must_use]
    pub fn from_parts(formatted_date: impl Into<String>, uuid: Uuid) -> Self {
        Self {
            formatted_date: formatted_date.into(),
            uuid,
        }
    }

    /// Object name for the one-line aggregate summary.
    #[must_use]
    pub fn aggregate_object(&self) -> String {
        format!(
            "aggregated_results_{}_{}.txt",
            self.formatted_date, self.uuid
        )
    }

    /// Object name for the `n`-th detailed CSV (1-based).
    #[must_use]
    pub fn detailed_object(&self, n: usize) -> String {
        format!(
            "detailed_results_{}_{}_{}.csv",
            self.formatted_date, self.uuid, n
        )
    }

    /// Warehouse table receiving every detailed CSV of this run.
    #[must_use]
    pub fn table_name(&self) -> String {
        format!(
            "loadtest_result_table_{}_{}",
            self.formatted_date,
            self.uuid.simple()
        )
    }

    /// Auto-derived dataset name used when none is configured.
    #[must_use]
    pub fn default_dataset(&self, target_qps: usize) -> String {
        format!(
            "vertex_ai_benchmarker_results_{}_qps_{}",
            target_qps,
            self.uuid.simple()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed() -> RunIdentity {
        RunIdentity::from_parts(
            "2024_01_02_03_04_05",
            Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap(),
        )
    }

    #[test]
    fn test_artifact_names() {
        let run = fixed();
        assert_eq!(
            run.aggregate_object(),
            "aggregated_results_2024_01_02_03_04_05_67e55044-10b1-426f-9247-bb680e5fe0c8.txt"
        );
        assert_eq!(
            run.detailed_object(3),
            "detailed_results_2024_01_02_03_04_05_67e55044-10b1-426f-9247-bb680e5fe0c8_3.csv"
        );
    }

    #[test]
    fn test_warehouse_names_use_simple_uuid() {
        let run = fixed();
        assert_eq!(
            run.table_name(),
            "loadtest_result_table_2024_01_02_03_04_05_67e5504410b1426f9247bb680e5fe0c8"
        );
        assert_eq!(
            run.default_dataset(500),
            "vertex_ai_benchmarker_results_500_qps_67e5504410b1426f9247bb680e5fe0c8"
        );
    }

    #[test]
    fn test_generated_identities_are_unique() {
        assert_ne!(RunIdentity::generate(), RunIdentity::generate());
    }
}
