//! Resource model
//!
//! Value objects for every remote resource kind. Each pass builds them
//! from scratch; only status slots are filled in during deploy.

mod access_log;
mod meta;
pub mod naming;
mod service;
mod target_group;

// Re-exports
pub use access_log::*;
pub use meta::*;
pub use service::*;
pub use target_group::*;

use serde::Serialize;

/// Any resource a [`crate::Stack`] can hold
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Resource {
    ServiceNetwork(ServiceNetwork),
    Service(Service),
    TargetGroup(TargetGroup),
    Targets(Targets),
    Listener(Listener),
    Rule(Rule),
    AccessLogSubscription(AccessLogSubscription),
}

impl Resource {
    pub fn meta(&self) -> &ResourceMeta {
        match self {
            Self::ServiceNetwork(r) => &r.meta,
            Self::Service(r) => &r.meta,
            Self::TargetGroup(r) => &r.meta,
            Self::Targets(r) => &r.meta,
            Self::Listener(r) => &r.meta,
            Self::Rule(r) => &r.meta,
            Self::AccessLogSubscription(r) => &r.meta,
        }
    }
}

/// Typed access to one variant of [`Resource`]
pub trait StackResource: Sized + Into<Resource> {
    const KIND: ResourceKind;

    fn from_resource(resource: &Resource) -> Option<&Self>;
}

macro_rules! stack_resource {
    ($variant:ident) => {
        impl StackResource for $variant {
            const KIND: ResourceKind = ResourceKind::$variant;

            fn from_resource(resource: &Resource) -> Option<&Self> {
                match resource {
                    Resource::$variant(r) => Some(r),
                    _ => None,
                }
            }
        }

        impl From<$variant> for Resource {
            fn from(r: $variant) -> Self {
                Resource::$variant(r)
            }
        }
    };
}

stack_resource!(ServiceNetwork);
stack_resource!(Service);
stack_resource!(TargetGroup);
stack_resource!(Targets);
stack_resource!(Listener);
stack_resource!(Rule);
stack_resource!(AccessLogSubscription);
