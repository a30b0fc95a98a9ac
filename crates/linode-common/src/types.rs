use serde::{Deserialize, Serialize};

/// One page of a paginated Linode v4 collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub pages: u32,
    pub results: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: u64,
    pub label: String,
    pub region: String,
    #[serde(rename = "type", default)]
    pub instance_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub specs: InstanceSpecs,
}

impl Instance {
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

/// Plan specs as reported by the API. Disk and memory are megabytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceSpecs {
    #[serde(default)]
    pub disk: u64,
    #[serde(default)]
    pub memory: u64,
    #[serde(default)]
    pub vcpus: u32,
    #[serde(default)]
    pub transfer: u64,
}

/// Network transfer for one instance in the current billing period.
///
/// `used` and `billable` are bytes, `quota` is gibibytes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstanceTransfer {
    pub used: u64,
    pub quota: u64,
    pub billable: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub email: String,
    pub balance: f64,
    #[serde(default)]
    pub balance_uninvoiced: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeBalancer {
    pub id: u64,
    pub label: String,
    pub region: String,
    #[serde(default)]
    pub client_conn_throttle: u32,
    #[serde(default)]
    pub transfer: NodeBalancerTransfer,
}

/// Month-to-date transfer in megabytes. The API reports `null` for fields it has not
/// computed yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeBalancerTransfer {
    #[serde(rename = "in")]
    pub inbound: Option<f64>,
    #[serde(rename = "out")]
    pub outbound: Option<f64>,
    pub total: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    pub status: String,
    #[serde(default)]
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_decodes_type_field_and_specs() {
        let instance: Instance = serde_json::from_value(serde_json::json!({
            "id": 123,
            "label": "web-1",
            "region": "us-east",
            "type": "g6-standard-2",
            "status": "running",
            "specs": {"disk": 81920, "memory": 4096, "vcpus": 2, "transfer": 4000, "gpus": 0}
        }))
        .expect("instance should decode");

        assert_eq!(instance.instance_type, "g6-standard-2");
        assert_eq!(instance.specs.memory, 4096);
        assert!(instance.is_running());
    }

    #[test]
    fn nodebalancer_transfer_tolerates_null_fields() {
        let nodebalancer: NodeBalancer = serde_json::from_value(serde_json::json!({
            "id": 7,
            "label": "lb-1",
            "region": "eu-west",
            "client_conn_throttle": 0,
            "transfer": {"in": 28.91, "out": null, "total": null}
        }))
        .expect("nodebalancer should decode");

        assert_eq!(nodebalancer.transfer.inbound, Some(28.91));
        assert_eq!(nodebalancer.transfer.outbound, None);
    }
}
