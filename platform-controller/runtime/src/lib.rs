#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use dolittle_platform_core as core;
pub use dolittle_platform_k8s_api as k8s;
pub use dolittle_platform_k8s_compose as compose;
pub use dolittle_platform_k8s_lifecycle as lifecycle;
pub use dolittle_platform_k8s_reconcile as reconcile;

mod api;
mod args;
pub mod dispatch;
mod store;

pub use self::{api::Api, args::Args, dispatch::Dispatcher, store::FsStore};
