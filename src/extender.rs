//! Generation entry point.
//!
//! [`Extender::extend`] runs one generation request through every stage:
//!
//! ```text
//! Collecting -> Resolving -> Synthesizing -> Loaded
//! ```
//!
//! Validation failures end the request in the stage that found them and
//! leave nothing loaded. There is no retry; the caller corrects the request
//! and calls again.
//!
//! # Example
//!
//! ```ignore
//! let extender = Extender::new(Arc::new(HostRegistry::new()));
//! let facet = extender.extend(
//!     ExtendRequest::new()
//!         .implementing(runnable)
//!         .with_instance(ImplementationObject::new().with_fn("run", run)),
//! )?;
//! let _cx = ScriptContext::enter();
//! facet.new_instance(&[])?.invoke("run", "()V", &[])?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use hostbridge_core::{
    BridgeError, GenerationError, GenerationStage, ImplementationObject, TypeRef,
};
use hostbridge_registry::HostRegistry;

use crate::collector::MemberCollector;
use crate::config::BridgeConfig;
use crate::facet::StaticFacet;
use crate::resolver::OverrideResolver;
use crate::synth::{WRAPPER_SUFFIX, synthesize_backing, synthesize_wrapper};
use crate::unit::LoadUnit;

/// Process-wide counter for generated names and load unit ids.
static GENERATION_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_generation_id() -> u64 {
    GENERATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1
}

/// A generation request.
#[derive(Debug, Default)]
pub struct ExtendRequest {
    /// Base type; the root object type when absent.
    pub base_type: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub instance_impl: Option<ImplementationObject>,
    pub static_impl: Option<ImplementationObject>,
    /// Simple name; a counter-based placeholder when absent.
    pub name: Option<String>,
}

impl ExtendRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extending(mut self, base: TypeRef) -> Self {
        self.base_type = Some(base);
        self
    }

    pub fn implementing(mut self, interface: TypeRef) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn with_instance(mut self, instance: ImplementationObject) -> Self {
        self.instance_impl = Some(instance);
        self
    }

    pub fn with_statics(mut self, statics: ImplementationObject) -> Self {
        self.static_impl = Some(statics);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Generates host types backed by script implementation objects.
pub struct Extender {
    registry: Arc<HostRegistry>,
    config: BridgeConfig,
}

impl Extender {
    pub fn new(registry: Arc<HostRegistry>) -> Self {
        Self::with_config(registry, BridgeConfig::default())
    }

    pub fn with_config(registry: Arc<HostRegistry>, config: BridgeConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<HostRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Generate a type for `request` and return its static facet.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn extend(&self, request: ExtendRequest) -> Result<Arc<StaticFacet>, BridgeError> {
        let id = next_generation_id();
        let base = request
            .base_type
            .clone()
            .unwrap_or_else(|| self.registry.object_type());
        let name = self.generated_name(request.name.as_deref(), id);

        let span = tracing::debug_span!("extend", name = %name, base = base.qualified_name());
        let _enter = span.enter();

        match self.generate(id, &name, &base, &request) {
            Ok(facet) => {
                tracing::info!(abstract_type = facet.is_abstract(), "generated type");
                Ok(facet)
            }
            Err(err) => {
                tracing::warn!(error = %err, "generation failed");
                Err(err)
            }
        }
    }

    fn generate(
        &self,
        id: u64,
        name: &str,
        base: &TypeRef,
        request: &ExtendRequest,
    ) -> Result<Arc<StaticFacet>, BridgeError> {
        tracing::debug!(stage = %GenerationStage::Collecting, "entering stage");
        let members = validate_base(base)
            .and_then(|()| request.interfaces.iter().try_for_each(validate_interface))
            .and_then(|()| self.check_name(name))
            .and_then(|()| {
                MemberCollector::collect(request.instance_impl.as_ref(), request.static_impl.as_ref())
            })
            .map_err(at(GenerationStage::Collecting))?;

        tracing::debug!(stage = %GenerationStage::Resolving, "entering stage");
        let resolution = OverrideResolver::resolve(base, &request.interfaces, &members.instance);

        tracing::debug!(stage = %GenerationStage::Synthesizing, "entering stage");
        let backing = synthesize_backing(name, base, &request.interfaces, &resolution);
        let wrapper = synthesize_wrapper(&format!("{name}{WRAPPER_SUFFIX}"), &members);
        let loaded = LoadUnit::load(&self.registry, &self.config, id, backing, wrapper)
            .map_err(at(GenerationStage::Synthesizing))?;

        let facet = StaticFacet::new(loaded.backing, loaded.wrapper);
        facet.wrapper_class().bind_static(&facet)?;
        tracing::debug!(stage = %GenerationStage::Loaded, "entering stage");
        Ok(facet)
    }

    fn generated_name(&self, requested: Option<&str>, id: u64) -> String {
        match requested {
            Some(name) => format!("{}/{name}", self.config.generated_package),
            None => format!("{}{id}", self.config.name_prefix),
        }
    }

    fn check_name(&self, name: &str) -> Result<(), GenerationError> {
        if self.registry.contains(name) {
            return Err(GenerationError::NameCollision {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Extender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extender")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

fn at(stage: GenerationStage) -> impl FnOnce(GenerationError) -> BridgeError {
    move |source| BridgeError::Generation { stage, source }
}

fn validate_base(base: &TypeRef) -> Result<(), GenerationError> {
    let reason = if base.is_interface() {
        "it is an interface"
    } else if base.is_final() {
        "it is final"
    } else if !base.is_public() {
        "it is not public"
    } else if base.is_synthetic() {
        "it is a generated type"
    } else {
        return Ok(());
    };
    Err(GenerationError::InvalidBaseType {
        name: base.qualified_name().to_string(),
        reason,
    })
}

fn validate_interface(interface: &TypeRef) -> Result<(), GenerationError> {
    let reason = if !interface.is_interface() {
        "it is not an interface"
    } else if interface.is_final() {
        "it is final"
    } else if !interface.is_public() {
        "it is not public"
    } else {
        return Ok(());
    };
    Err(GenerationError::InvalidInterface {
        name: interface.qualified_name().to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostbridge_core::{
        MethodEntry, MethodSignature, Modifiers, ScriptContext, ScriptFn, ScriptValue, TypeEntry,
    };

    fn extender() -> Extender {
        Extender::with_config(
            Arc::new(HostRegistry::new()),
            BridgeConfig::default().with_development(false),
        )
    }

    fn runnable() -> TypeRef {
        TypeEntry::interface("host/Runnable")
            .with_method(MethodEntry::abstract_method(
                MethodSignature::parse("run", "()V").unwrap(),
            ))
            .into_ref()
    }

    fn stage_of(err: &BridgeError) -> Option<GenerationStage> {
        match err {
            BridgeError::Generation { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    #[test]
    fn default_name_uses_prefix_and_counter() {
        let facet = extender().extend(ExtendRequest::new()).unwrap();
        assert!(facet.name().starts_with("ExtendedClass$"));
        assert_eq!(
            facet.name(),
            format!("ExtendedClass${}", facet.load_unit().unwrap().id())
        );
    }

    #[test]
    fn explicit_name_uses_package() {
        let facet = extender()
            .extend(ExtendRequest::new().named("Widget"))
            .unwrap();
        assert_eq!(facet.name(), "hostbridge/generated/Widget");
    }

    #[test]
    fn default_base_is_object() {
        let extender = extender();
        let facet = extender.extend(ExtendRequest::new()).unwrap();
        let superclass = facet.backing_type().superclass().unwrap();
        assert!(superclass.ptr_eq(&extender.registry().object_type()));
    }

    #[test]
    fn invalid_base_types() {
        let extender = extender();
        let cases = [
            runnable(),
            extender.registry().string_type(),
            TypeEntry::class("app/Hidden").as_non_public().into_ref(),
        ];
        for base in cases {
            let err = extender
                .extend(ExtendRequest::new().extending(base))
                .unwrap_err();
            assert_eq!(stage_of(&err), Some(GenerationStage::Collecting));
            assert!(matches!(
                err.generation_error(),
                Some(GenerationError::InvalidBaseType { .. })
            ));
        }
    }

    #[test]
    fn generated_type_cannot_be_base() {
        let extender = extender();
        let first = extender.extend(ExtendRequest::new()).unwrap();
        let err = extender
            .extend(ExtendRequest::new().extending(first.backing_type().clone()))
            .unwrap_err();
        assert!(matches!(
            err.generation_error(),
            Some(GenerationError::InvalidBaseType {
                reason: "it is a generated type",
                ..
            })
        ));
    }

    #[test]
    fn class_is_not_an_interface() {
        let extender = extender();
        let err = extender
            .extend(ExtendRequest::new().implementing(extender.registry().object_type()))
            .unwrap_err();
        assert!(matches!(
            err.generation_error(),
            Some(GenerationError::InvalidInterface { .. })
        ));
    }

    #[test]
    fn final_interface_is_rejected() {
        let sealed = TypeEntry::interface("app/Sealed")
            .with_modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
            .into_ref();
        let err = extender()
            .extend(ExtendRequest::new().implementing(sealed))
            .unwrap_err();
        assert!(matches!(
            err.generation_error(),
            Some(GenerationError::InvalidInterface { reason: "it is final", .. })
        ));
    }

    #[test]
    fn collector_errors_are_collecting_stage() {
        let statics = ImplementationObject::new().with_fn(
            "constructor",
            ScriptFn::new(|_, _, _| Ok(ScriptValue::Undefined)),
        );
        let err = extender()
            .extend(ExtendRequest::new().with_statics(statics))
            .unwrap_err();
        assert_eq!(stage_of(&err), Some(GenerationStage::Collecting));
        assert!(matches!(
            err.generation_error(),
            Some(GenerationError::ReservedMember { .. })
        ));
    }

    #[test]
    fn facet_is_bound_after_extend() {
        let facet = extender()
            .extend(
                ExtendRequest::new().implementing(runnable()).with_instance(
                    ImplementationObject::new()
                        .with_fn("run", ScriptFn::new(|_, _, _| Ok(ScriptValue::Undefined))),
                ),
            )
            .unwrap();
        assert!(facet.wrapper_class().is_bound());
        assert!(!facet.is_abstract());

        let _cx = ScriptContext::enter();
        let object = facet.new_instance(&[]).unwrap();
        assert!(object.invoke("run", "()V", &[]).is_ok());
    }
}
