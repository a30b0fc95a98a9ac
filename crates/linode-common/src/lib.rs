pub mod error;
pub mod types;

pub use error::{LinodeError, Result};
pub use types::{
    Account, Instance, InstanceSpecs, InstanceTransfer, NodeBalancer, NodeBalancerTransfer, Page,
    Ticket,
};
