//! Dynamic native-class bridge.
//!
//! Lets script implementation objects stand in for host classes and
//! interfaces. Given a base type, a set of interfaces and a script object
//! (split into an instance facet and a static facet), [`Extender::extend`]
//! generates a pair of cooperating types:
//!
//! - a **backing type**, a real [`TypeEntry`](hostbridge_core::TypeEntry)
//!   extending the base type, whose overriding methods forward into script
//! - a **wrapper type**, which takes part in the script engine's
//!   integer-id dispatch protocol and owns the dispatch tables
//!
//! Generation runs in stages:
//!
//! ```text
//! ImplementationObject
//!     -> MemberCollector     (ids, properties, overloads)
//!     -> OverrideResolver    (bind overridable members)
//!     -> synthesize_backing / synthesize_wrapper
//!     -> LoadUnit            (live types, registry entry)
//!     -> StaticFacet
//! ```
//!
//! # Example
//!
//! ```ignore
//! use hostbridge::prelude::*;
//!
//! let registry = Arc::new(HostRegistry::new());
//! let extender = Extender::new(registry);
//!
//! let facet = extender.extend(
//!     ExtendRequest::new()
//!         .implementing(runnable)
//!         .with_instance(ImplementationObject::new().with_fn("run", run)),
//! )?;
//!
//! let _cx = ScriptContext::enter();
//! let task = facet.new_instance(&[])?;
//! task.invoke("run", "()V", &[])?;
//! ```

pub mod collector;
pub mod config;
pub mod extender;
pub mod facet;
pub mod resolver;
pub mod signature;
pub mod synth;
pub mod unit;
pub mod wrapper;

pub use collector::{CONSTRUCTOR_NAME, CollectedMembers, CollectedMethod, FacetMembers, MemberCollector};
pub use config::{BridgeConfig, ConfigError};
pub use extender::{ExtendRequest, Extender};
pub use facet::StaticFacet;
pub use resolver::{BoundOverride, OverridableMember, OverrideResolver, Resolution};
pub use signature::{MemberKey, parse_member_key};
pub use unit::{LoadUnit, LoadedPair};
pub use wrapper::{ObjectPair, WrapperClass};

pub use hostbridge_core;
pub use hostbridge_registry::HostRegistry;

/// Common imports for embedding the bridge.
pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::{BridgeConfig, ExtendRequest, Extender, StaticFacet};
    pub use hostbridge_core::{
        BridgeError, ImplementationObject, MethodEntry, MethodSignature, NativeValue,
        ObjectRef, RuntimeError, ScriptContext, ScriptFn, ScriptValue, TypeEntry, TypeRef,
    };
    pub use hostbridge_registry::HostRegistry;
}
