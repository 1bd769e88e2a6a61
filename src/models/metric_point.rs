use serde::{Deserialize, Serialize};

use super::DomainRecord;

/// Tags attached to every point of one domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tags {
    pub organization: String,
    pub organization_id: i64,
}

impl From<&DomainRecord> for Tags {
    fn from(record: &DomainRecord) -> Self {
        Self {
            organization: record.domain.clone(),
            organization_id: record.id,
        }
    }
}

/// One timestamped, tagged value in the sink's `/api/put` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub metric: String,
    pub timestamp: i64,
    pub value: i64,
    pub tags: Tags,
}

impl MetricPoint {
    pub fn new(metric: impl Into<String>, timestamp: i64, value: i64, tags: Tags) -> Self {
        Self {
            metric: metric.into(),
            timestamp,
            value,
            tags,
        }
    }
}

/// Points accumulated by one chunk worker, in production order.
pub type Batch = Vec<MetricPoint>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let record = DomainRecord::new(7, "Acme", "a.example");
        let point = MetricPoint::new("domain.uptime", 1_700_000_000, 1, Tags::from(&record));

        assert_eq!(
            serde_json::to_value(&point).unwrap(),
            json!({
                "metric": "domain.uptime",
                "timestamp": 1_700_000_000,
                "value": 1,
                "tags": {"organization": "a.example", "organization_id": 7}
            })
        );
    }

    #[test]
    fn test_batch_serializes_to_array_of_same_length() {
        let tags = Tags {
            organization: "b.example".to_string(),
            organization_id: 2,
        };
        let batch: Batch = (0..4)
            .map(|v| MetricPoint::new("domain.ttfb", 10, v, tags.clone()))
            .collect();

        let body = serde_json::to_string(&batch).unwrap();
        let decoded: Batch = serde_json::from_str(&body).unwrap();

        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded, batch);
    }
}
