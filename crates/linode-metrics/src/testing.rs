use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use linode_client::LinodeApi;
use linode_common::{
    Account, Instance, InstanceSpecs, InstanceTransfer, LinodeError, NodeBalancer, Result, Ticket,
};

use crate::{
    collector::{CollectOutcome, Collector, SAMPLE_CHANNEL_CAPACITY, SampleSink, ScrapeContext},
    types::Sample,
};

#[derive(Default)]
pub(crate) struct MockLinodeApi {
    pub instances: Vec<Instance>,
    pub transfers: HashMap<u64, InstanceTransfer>,
    pub fail_lists: bool,
    pub hang_lists: bool,
    pub hang_transfers: HashSet<u64>,
    pub slow_transfers: HashMap<u64, Duration>,
    pub account: Option<Account>,
    pub nodebalancers: Vec<NodeBalancer>,
    pub tickets: Vec<Ticket>,
    pub list_calls: AtomicUsize,
    pub detail_calls: AtomicUsize,
}

impl MockLinodeApi {
    async fn list<T: Clone>(&self, path: &str, items: &[T]) -> Result<Vec<T>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_lists {
            std::future::pending::<()>().await;
        }
        if self.fail_lists {
            return Err(server_error(path));
        }
        Ok(items.to_vec())
    }
}

#[async_trait]
impl LinodeApi for MockLinodeApi {
    async fn list_instances(&self) -> Result<Vec<Instance>> {
        self.list("linode/instances", &self.instances).await
    }

    async fn get_instance_transfer(&self, instance_id: u64) -> Result<InstanceTransfer> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_transfers.contains(&instance_id) {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.slow_transfers.get(&instance_id) {
            tokio::time::sleep(*delay).await;
        }
        self.transfers
            .get(&instance_id)
            .copied()
            .ok_or_else(|| LinodeError::Api {
                path: format!("linode/instances/{instance_id}/transfer"),
                status: 404,
                message: "Not found".to_string(),
            })
    }

    async fn get_account(&self) -> Result<Account> {
        self.account.clone().ok_or_else(|| server_error("account"))
    }

    async fn list_nodebalancers(&self) -> Result<Vec<NodeBalancer>> {
        self.list("nodebalancers", &self.nodebalancers).await
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>> {
        self.list("support/tickets", &self.tickets).await
    }
}

fn server_error(path: &str) -> LinodeError {
    LinodeError::Api {
        path: path.to_string(),
        status: 500,
        message: "Internal Server Error".to_string(),
    }
}

pub(crate) fn instance(id: u64, label: &str, region: &str) -> Instance {
    Instance {
        id,
        label: label.to_string(),
        region: region.to_string(),
        instance_type: "g6-standard-1".to_string(),
        status: "running".to_string(),
        specs: InstanceSpecs {
            disk: 51_200,
            memory: 2_048,
            vcpus: 1,
            transfer: 2_000,
        },
    }
}

/// Runs one collect cycle and returns everything it streamed.
pub(crate) async fn drain(
    collector: &dyn Collector,
    ctx: &ScrapeContext,
) -> (CollectOutcome, Vec<Sample>) {
    let (sink, mut receiver) = SampleSink::channel(SAMPLE_CHANNEL_CAPACITY);
    let produce = async move {
        let outcome = collector.collect(ctx, &sink).await;
        drop(sink);
        outcome
    };
    let consume = async {
        let mut samples = Vec::new();
        while let Some(sample) = receiver.recv().await {
            samples.push(sample);
        }
        samples
    };

    tokio::join!(produce, consume)
}

pub(crate) fn values_of<'a>(samples: &'a [Sample], metric: &'a str) -> Vec<&'a Sample> {
    samples
        .iter()
        .filter(|sample| sample.descriptor().name() == metric)
        .collect()
}

