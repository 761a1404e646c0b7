//! Dolittle platform model
//!
//! The types in this crate describe who owns what on the platform. A [`Tenant`] owns
//! [`Application`]s; each application maps onto a single Kubernetes namespace and is partitioned
//! into [`Environment`]s. An environment serves zero or more end customers, each described by a
//! [`CustomerTenantInfo`], through the microservices deployed into it.
//!
//! ```text
//! [ Tenant ] -> [ Application ] -> [ Environment ] -> [ CustomerTenantInfo ]
//!                                        ^
//!                                  [ Microservice ]
//! ```
//!
//! Inbound microservice documents live in [`request`], and the declarative store that holds both
//! applications and accepted microservice documents is described by [`store::Store`].

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod identity;
pub mod request;
pub mod store;
mod tenancy;

pub use self::{
    identity::{ApplicationInfo, Kind, Microservice, Tenant},
    request::MicroserviceRequest,
    store::{get_environment, MemoryStore, Store, StoreError},
    tenancy::{
        customer_tenant_hash, short_id, Application, CustomerTenantInfo, CustomerTenantIngress,
        Environment, MicroserviceRel,
    },
};
