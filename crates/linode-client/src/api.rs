use async_trait::async_trait;
use linode_common::{Account, Instance, InstanceTransfer, NodeBalancer, Result, Ticket};

/// Read-only view of a Linode account.
///
/// List operations return every resource of their type, following pagination.
/// Implementations are shared across concurrently scraping collectors and must not
/// require `&mut self`.
#[async_trait]
pub trait LinodeApi: Send + Sync {
    async fn list_instances(&self) -> Result<Vec<Instance>>;

    async fn get_instance_transfer(&self, instance_id: u64) -> Result<InstanceTransfer>;

    async fn get_account(&self) -> Result<Account>;

    async fn list_nodebalancers(&self) -> Result<Vec<NodeBalancer>>;

    async fn list_tickets(&self) -> Result<Vec<Ticket>>;
}
