use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use hostbridge::synth::synthesize_wrapper;
use hostbridge::{
    BridgeConfig, ExtendRequest, Extender, MemberCollector, StaticFacet, WrapperClass,
};
use hostbridge_core::{
    BridgeError, ContextOptions, ForeignObject, GenerationError, GenerationStage,
    ImplementationObject, MemberId, MethodEntry, MethodSignature, NativeArray, NativeFn,
    NativeInit, NativeType, NativeValue, RuntimeError, ScriptContext, ScriptFn, ScriptValue,
    Scriptable, TypeEntry, TypeRef, spawn_in_context,
};
use hostbridge_registry::HostRegistry;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn extender() -> Extender {
    init_tracing();
    Extender::with_config(
        Arc::new(HostRegistry::new()),
        BridgeConfig::default().with_development(false),
    )
}

fn sig(name: &str, descriptor: &str) -> MethodSignature {
    MethodSignature::parse(name, descriptor).unwrap()
}

fn runnable() -> TypeRef {
    TypeEntry::interface("host/Runnable")
        .with_method(MethodEntry::abstract_method(sig("run", "()V")))
        .into_ref()
}

fn echo_fn() -> ScriptFn {
    ScriptFn::new(|_, _, args| Ok(args.first().cloned().unwrap_or(ScriptValue::Undefined)))
}

fn noop() -> ScriptFn {
    ScriptFn::new(|_, _, _| Ok(ScriptValue::Undefined))
}

fn counting_runnable(extender: &Extender, counter: Arc<AtomicUsize>) -> Arc<StaticFacet> {
    let run = ScriptFn::new(move |_, _, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptValue::Undefined)
    });
    extender
        .extend(
            ExtendRequest::new()
                .implementing(runnable())
                .with_instance(ImplementationObject::new().with_fn("run", run)),
        )
        .unwrap()
}

fn calc_base() -> TypeRef {
    TypeEntry::class("app/Calc")
        .as_abstract()
        .with_method(MethodEntry::abstract_method(sig("foo", "(I)I")))
        .with_method(MethodEntry::abstract_method(sig("foo", "(Lhost/String;)I")))
        .into_ref()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn runnable_counter_reaches_three() {
    let extender = extender();
    let counter = Arc::new(AtomicUsize::new(0));
    let facet = counting_runnable(&extender, Arc::clone(&counter));

    let _cx = ScriptContext::enter();
    let task = facet.new_instance(&[]).unwrap();
    for _ in 0..3 {
        assert_eq!(task.invoke("run", "()V", &[]).unwrap(), NativeValue::Void);
    }
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[test]
fn duplicate_name_collides() {
    let extender = extender();
    let _first = extender.extend(ExtendRequest::new().named("Dup")).unwrap();
    let err = extender
        .extend(ExtendRequest::new().named("Dup"))
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::Generation {
            stage: GenerationStage::Collecting,
            source: GenerationError::NameCollision {
                name: "hostbridge/generated/Dup".to_string(),
            },
        }
    );
}

#[test]
fn dropped_type_frees_its_name() {
    let extender = extender();
    let counter = Arc::new(AtomicUsize::new(0));
    let facet = counting_runnable(&extender, counter);
    let name = facet.name().to_string();

    let task = {
        let _cx = ScriptContext::enter();
        facet.new_instance(&[]).unwrap()
    };
    drop(facet);
    // A live instance keeps the type loaded.
    assert!(extender.registry().contains(&name));
    drop(task);
    assert!(!extender.registry().contains(&name));

    let first = extender.extend(ExtendRequest::new().named("Again")).unwrap();
    drop(first);
    assert!(extender.extend(ExtendRequest::new().named("Again")).is_ok());
}

#[test]
fn backing_type_outlives_dropped_facet() {
    let extender = extender();
    let counter = Arc::new(AtomicUsize::new(0));
    let run = {
        let counter = Arc::clone(&counter);
        ScriptFn::new(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(ScriptValue::Undefined)
        })
    };
    let version = ScriptFn::new(|_, this, _| Ok(this.get("VERSION").unwrap_or(ScriptValue::Null)));
    let facet = extender
        .extend(
            ExtendRequest::new()
                .implementing(runnable())
                .with_instance(ImplementationObject::new().with_fn("run", run))
                .with_statics(
                    ImplementationObject::new()
                        .with_value("VERSION", "2.0")
                        .with_fn("version", version),
                ),
        )
        .unwrap();
    let name = facet.name().to_string();
    let ty = facet.backing_type().clone();
    let released = Arc::downgrade(&facet);
    drop(facet);
    assert!(released.upgrade().is_none());
    assert!(extender.registry().contains(&name));

    let cx = ScriptContext::enter();
    let task = ty.instantiate(&[]).unwrap();
    task.invoke("run", "()V", &[]).unwrap();
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    // Static members still run with a static facet as `this`.
    let wrapper = task.script_wrapper().unwrap();
    let foreign = wrapper.as_foreign().unwrap();
    let id = foreign.find_member_id("version");
    assert!(id.is_static());
    assert_eq!(
        foreign.exec_id_call(cx.context(), id, &[]).unwrap(),
        ScriptValue::string("2.0")
    );
    drop(cx);

    drop(wrapper);
    drop(task);
    assert!(extender.registry().contains(&name));
    drop(ty);
    assert!(!extender.registry().contains(&name));
}

#[test]
fn repeated_generation_keeps_registry_bounded() {
    let extender = extender();
    for _ in 0..200 {
        let facet = extender.extend(ExtendRequest::new()).unwrap();
        drop(facet);
    }
    // Only the most recently dropped type can still be waiting for a purge.
    assert!(extender.registry().purge_unloaded() <= 1);
    assert_eq!(extender.registry().len(), 2);
}

#[test]
fn static_property_is_read_only() {
    let extender = extender();
    let facet = extender
        .extend(
            ExtendRequest::new()
                .with_statics(ImplementationObject::new().with_value("VERSION", "1.0")),
        )
        .unwrap();

    assert_eq!(facet.property("VERSION"), Some(ScriptValue::string("1.0")));
    let err = facet
        .script_value()
        .put("VERSION", ScriptValue::string("2.0"))
        .unwrap_err();
    assert_eq!(
        err,
        RuntimeError::ReadOnlyProperty {
            name: "VERSION".to_string()
        }
    );
    assert_eq!(facet.get("VERSION"), Some(ScriptValue::string("1.0")));
}

#[test]
fn typed_overloads_are_independent() {
    let extender = extender();
    let doubled = ScriptFn::new(|_, _, args| Ok(ScriptValue::Int(args[0].as_int().unwrap_or(0) * 2)));
    let length = ScriptFn::new(|_, _, args| {
        Ok(ScriptValue::Int(args[0].as_str().map_or(0, |s| s.len() as i64)))
    });
    let facet = extender
        .extend(
            ExtendRequest::new().extending(calc_base()).with_instance(
                ImplementationObject::new()
                    .with_fn("foo(I)I", doubled)
                    .with_fn("foo(Lhost/String;)I", length),
            ),
        )
        .unwrap();
    assert!(!facet.is_abstract());

    let _cx = ScriptContext::enter();
    let calc = facet.new_instance(&[]).unwrap();
    assert_eq!(
        calc.invoke("foo", "(I)I", &[NativeValue::Int(21)]).unwrap(),
        NativeValue::Int(42)
    );
    assert_eq!(
        calc.invoke("foo", "(Lhost/String;)I", &[NativeValue::from("abcd")])
            .unwrap(),
        NativeValue::Int(4)
    );
}

#[test]
fn same_signature_twice_is_rejected() {
    let extender = extender();

    let duplicated = ImplementationObject::from_entries([
        ("foo(I)I", ScriptValue::Function(noop())),
        ("foo(I)I", ScriptValue::Function(noop())),
    ]);
    let err = extender
        .extend(ExtendRequest::new().extending(calc_base()).with_instance(duplicated))
        .unwrap_err();
    assert!(matches!(
        err.generation_error(),
        Some(GenerationError::DuplicateMember { .. })
    ));

    // Return types do not disambiguate.
    let ambiguous = ImplementationObject::new()
        .with_fn("foo(I)I", noop())
        .with_fn("foo(I)V", noop());
    let err = extender
        .extend(ExtendRequest::new().extending(calc_base()).with_instance(ambiguous))
        .unwrap_err();
    assert!(matches!(
        err.generation_error(),
        Some(GenerationError::AmbiguousBinding { .. })
    ));
}

#[test]
fn typed_and_untyped_coexist() {
    let extender = extender();
    let facet = extender
        .extend(
            ExtendRequest::new().extending(calc_base()).with_instance(
                ImplementationObject::new()
                    .with_fn("foo", ScriptFn::new(|_, _, _| Ok(ScriptValue::Int(1))))
                    .with_fn("foo(I)I", ScriptFn::new(|_, _, _| Ok(ScriptValue::Int(2)))),
            ),
        )
        .unwrap();

    let _cx = ScriptContext::enter();
    let calc = facet.new_instance(&[]).unwrap();
    assert_eq!(
        calc.invoke("foo", "(I)I", &[NativeValue::Int(0)]).unwrap(),
        NativeValue::Int(2)
    );
    assert_eq!(
        calc.invoke("foo", "(Lhost/String;)I", &[NativeValue::from("x")])
            .unwrap(),
        NativeValue::Int(1)
    );
}

#[test]
fn unmatched_abstract_member_blocks_instantiation() {
    let extender = extender();
    let facet = extender
        .extend(ExtendRequest::new().implementing(runnable()))
        .unwrap();
    assert!(facet.is_abstract());

    let _cx = ScriptContext::enter();
    let err = facet.new_instance(&[]).unwrap_err();
    assert!(matches!(err, RuntimeError::AbstractInstantiation { .. }));
    let err = facet.construct(&[]).unwrap_err();
    assert!(matches!(err, RuntimeError::AbstractInstantiation { .. }));
}

#[test]
fn echo_round_trip() {
    let extender = extender();
    let echo = TypeEntry::interface("app/Echo")
        .with_method(MethodEntry::abstract_method(sig("echo", "(B)B")))
        .with_method(MethodEntry::abstract_method(sig("echo", "(S)S")))
        .with_method(MethodEntry::abstract_method(sig("echo", "(I)I")))
        .with_method(MethodEntry::abstract_method(sig("echo", "(J)J")))
        .with_method(MethodEntry::abstract_method(sig("echo", "(F)F")))
        .with_method(MethodEntry::abstract_method(sig("echo", "(D)D")))
        .with_method(MethodEntry::abstract_method(sig("echo", "(Z)Z")))
        .with_method(MethodEntry::abstract_method(sig("echo", "(C)C")))
        .with_method(MethodEntry::abstract_method(sig(
            "echo",
            "(Lhost/String;)Lhost/String;",
        )))
        .with_method(MethodEntry::abstract_method(sig(
            "echo",
            "(Lhost/Object;)Lhost/Object;",
        )))
        .with_method(MethodEntry::abstract_method(sig("echo", "([I)[I")))
        .into_ref();
    let facet = extender
        .extend(
            ExtendRequest::new()
                .implementing(echo)
                .with_instance(ImplementationObject::new().with_fn("echo", echo_fn())),
        )
        .unwrap();
    assert!(!facet.is_abstract());

    let _cx = ScriptContext::enter();
    let target = facet.new_instance(&[]).unwrap();
    let plain = extender.registry().object_type().instantiate(&[]).unwrap();
    let ints = NativeArray::new(
        NativeType::INT,
        vec![NativeValue::Int(1), NativeValue::Int(-2)],
    );

    let cases = [
        ("(B)B", NativeValue::Byte(i8::MIN)),
        ("(B)B", NativeValue::Byte(i8::MAX)),
        ("(S)S", NativeValue::Short(i16::MIN)),
        ("(I)I", NativeValue::Int(i32::MIN)),
        ("(J)J", NativeValue::Long(i64::MAX)),
        ("(F)F", NativeValue::Float(f32::MIN_POSITIVE)),
        ("(F)F", NativeValue::Float(-1.5)),
        ("(D)D", NativeValue::Double(2.5)),
        ("(Z)Z", NativeValue::Bool(true)),
        ("(C)C", NativeValue::Char('λ')),
        ("(Lhost/String;)Lhost/String;", NativeValue::from("hello")),
        ("(Lhost/Object;)Lhost/Object;", NativeValue::Object(plain)),
        ("(Lhost/Object;)Lhost/Object;", NativeValue::Null),
        ("([I)[I", NativeValue::Array(ints)),
    ];
    for (descriptor, value) in cases {
        let result = target
            .invoke("echo", descriptor, std::slice::from_ref(&value))
            .unwrap();
        assert_eq!(result, value, "echo{descriptor}");
    }
}

#[test]
fn wrong_return_type_fails_after_script_ran() {
    let extender = extender();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let base = TypeEntry::interface("app/Sized")
        .with_method(MethodEntry::abstract_method(sig("size", "()I")))
        .into_ref();
    let facet = extender
        .extend(
            ExtendRequest::new().implementing(base).with_instance(
                ImplementationObject::new().with_fn(
                    "size",
                    ScriptFn::new(move |_, _, _| {
                        seen.fetch_add(1, Ordering::SeqCst);
                        Ok(ScriptValue::string("large"))
                    }),
                ),
            ),
        )
        .unwrap();

    let _cx = ScriptContext::enter();
    let sized = facet.new_instance(&[]).unwrap();
    let err = sized.invoke("size", "()I", &[]).unwrap_err();
    assert!(matches!(err, RuntimeError::Conversion(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Execution context
// ============================================================================

#[test]
fn override_without_context_fails() {
    let extender = extender();
    let counter = Arc::new(AtomicUsize::new(0));
    let facet = counting_runnable(&extender, Arc::clone(&counter));

    let task = {
        let _cx = ScriptContext::enter();
        facet.new_instance(&[]).unwrap()
    };
    assert_eq!(
        task.invoke("run", "()V", &[]).unwrap_err(),
        RuntimeError::NoActiveContext
    );
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    assert_eq!(
        facet.new_instance(&[]).unwrap_err(),
        RuntimeError::NoActiveContext
    );
}

#[test]
fn worker_threads_need_a_context() {
    let extender = extender();
    let counter = Arc::new(AtomicUsize::new(0));
    let facet = counting_runnable(&extender, Arc::clone(&counter));
    let task = {
        let _cx = ScriptContext::enter();
        facet.new_instance(&[]).unwrap()
    };

    let bare = task.clone();
    let result = std::thread::spawn(move || bare.invoke("run", "()V", &[]))
        .join()
        .unwrap();
    assert_eq!(result.unwrap_err(), RuntimeError::NoActiveContext);

    let worker = task.clone();
    let handle = spawn_in_context(ContextOptions::default(), move |_cx| {
        worker.invoke("run", "()V", &[])
    })
    .unwrap();
    assert_eq!(handle.join().unwrap().unwrap(), NativeValue::Void);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Types and dispatch
// ============================================================================

#[test]
fn instances_are_assignable_to_base_and_interfaces() {
    let extender = extender();
    let base = TypeEntry::class("app/Widget").into_ref();
    extender.registry().register(base.clone()).unwrap();
    let closeable = TypeEntry::interface("app/Closeable")
        .with_method(MethodEntry::abstract_method(sig("close", "()V")))
        .into_ref();
    extender.registry().register(closeable.clone()).unwrap();

    let facet = extender
        .extend(
            ExtendRequest::new()
                .extending(base)
                .implementing(closeable)
                .implementing(runnable())
                .with_instance(
                    ImplementationObject::new()
                        .with_fn("close", noop())
                        .with_fn("run", noop()),
                ),
        )
        .unwrap();

    let registry = extender.registry();
    assert!(registry.is_assignable(facet.name(), "app/Widget"));
    assert!(registry.is_assignable(facet.name(), "app/Closeable"));
    assert!(registry.is_assignable(facet.name(), "host/Runnable"));
    assert!(registry.is_assignable(facet.name(), "host/Object"));

    let _cx = ScriptContext::enter();
    let widget = facet.new_instance(&[]).unwrap();
    assert!(widget.is_instance_of("app/Widget"));
    assert!(widget.is_instance_of("host/Runnable"));
}

#[test]
fn member_ids_are_stable() {
    let extender = extender();
    let facet = extender
        .extend(
            ExtendRequest::new().implementing(runnable()).with_instance(
                ImplementationObject::new()
                    .with_fn("run", noop())
                    .with_fn("stop", noop()),
            ),
        )
        .unwrap();

    let cx = ScriptContext::enter();
    let pair = facet.construct(&[]).unwrap();
    let run = pair.find_member_id("run");
    assert_eq!(run, MemberId(2));
    assert_eq!(pair.find_member_id("run"), run);
    assert_eq!(pair.find_member_id("stop"), MemberId(3));
    assert_eq!(pair.find_member_id("missing"), MemberId::DEFAULT);
    assert_eq!(pair.member_name(run), Some("run"));

    let err = pair
        .exec_id_call(cx.context(), MemberId::DEFAULT, &[])
        .unwrap_err();
    assert_eq!(
        err,
        RuntimeError::NoSuchMember {
            class_name: facet.name().to_string(),
            id: 0,
        }
    );
}

#[test]
fn base_methods_and_state_are_inherited() {
    let extender = extender();
    let base = TypeEntry::class("app/Counter")
        .as_abstract()
        .with_initializer(NativeInit::new(|| AtomicI32::new(10)))
        .with_method(MethodEntry::native(
            sig("get", "()I"),
            NativeFn::new(|ctx| {
                let value = ctx.state::<AtomicI32>()?;
                Ok(NativeValue::Int(value.load(Ordering::SeqCst)))
            }),
        ))
        .with_method(MethodEntry::abstract_method(sig("step", "()I")))
        .into_ref();

    let step = ScriptFn::new(|cx, this, _| {
        let current = this.call_member(cx, "get", &[])?;
        Ok(ScriptValue::Int(current.as_int().unwrap_or(0) + 1))
    });
    let facet = extender
        .extend(
            ExtendRequest::new()
                .extending(base)
                .with_instance(ImplementationObject::new().with_fn("step", step)),
        )
        .unwrap();

    let _cx = ScriptContext::enter();
    let counter = facet.new_instance(&[]).unwrap();
    assert_eq!(counter.invoke("get", "()I", &[]).unwrap(), NativeValue::Int(10));
    assert_eq!(counter.invoke("step", "()I", &[]).unwrap(), NativeValue::Int(11));
    assert!(counter.state::<AtomicI32>().is_some());
}

#[test]
fn backing_and_wrapper_reach_each_other() {
    let extender = extender();
    let facet = extender
        .extend(
            ExtendRequest::new()
                .implementing(runnable())
                .with_instance(ImplementationObject::new().with_fn("run", noop())),
        )
        .unwrap();

    let _cx = ScriptContext::enter();
    let pair = facet.construct(&[]).unwrap();
    let backing = pair.unwrap();
    let wrapper = backing.script_wrapper().unwrap();
    assert!(wrapper.unwrap_native().unwrap().ptr_eq(&backing));
    assert_eq!(wrapper.class_name(), format!("{}$Wrapper", facet.name()));
}

#[test]
fn script_side_members() {
    let extender = extender();
    let init = ScriptFn::new(|_, this, args| {
        this.put("label", args.first().cloned().unwrap_or(ScriptValue::Null))?;
        Ok(ScriptValue::Undefined)
    });
    let describe = ScriptFn::new(|_, this, _| Ok(this.get("VERSION").unwrap_or(ScriptValue::Null)));
    let facet = extender
        .extend(
            ExtendRequest::new()
                .extending(calc_base())
                .with_instance(
                    ImplementationObject::new()
                        .with_value("kind", "calc")
                        .with_fn("constructor", init)
                        .with_fn("foo(I)I", echo_fn())
                        .with_fn("foo(Lhost/String;)I", ScriptFn::new(|_, _, _| Ok(ScriptValue::Int(-1)))),
                )
                .with_statics(
                    ImplementationObject::new()
                        .with_value("VERSION", "1.0")
                        .with_fn("describe", describe),
                ),
        )
        .unwrap();

    let _cx = ScriptContext::enter();
    assert_eq!(
        facet.call_static("describe", &[]).unwrap(),
        ScriptValue::string("1.0")
    );

    let pair = facet.construct(&[ScriptValue::string("first")]).unwrap();
    assert_eq!(pair.get("label"), Some(ScriptValue::string("first")));
    assert_eq!(pair.get("kind"), Some(ScriptValue::string("calc")));

    // Overload selection by argument.
    assert_eq!(pair.call("foo", &[ScriptValue::Int(7)]).unwrap(), ScriptValue::Int(7));
    assert_eq!(
        pair.call("foo", &[ScriptValue::string("seven")]).unwrap(),
        ScriptValue::Int(-1)
    );
    assert!(matches!(
        pair.call("foo", &[]).unwrap_err(),
        RuntimeError::NoMatchingOverload { .. }
    ));

    // Callable members cannot be replaced.
    assert!(matches!(
        pair.put("foo", ScriptValue::Int(0)).unwrap_err(),
        RuntimeError::ReadOnlyProperty { .. }
    ));

    // Host-side construction routes through the same constructor.
    let hosted = facet.new_instance(&[NativeValue::from("second")]).unwrap();
    let wrapper = hosted.script_wrapper().unwrap();
    assert_eq!(wrapper.get("label"), Some(ScriptValue::string("second")));
}

#[test]
fn construction_requires_bound_facet() {
    let extender = extender();
    let members = MemberCollector::collect(None, None).unwrap();
    let class = Arc::new(WrapperClass::new(
        synthesize_wrapper("gen/Loose$Wrapper", &members),
        "gen/Loose".to_string(),
        false,
    ));
    let cx = ScriptContext::enter();
    assert_eq!(
        class.construct(cx.context(), &[]).unwrap_err(),
        RuntimeError::ConstructionBeforeBinding {
            class_name: "gen/Loose".to_string()
        }
    );

    let facet = extender.extend(ExtendRequest::new()).unwrap();
    assert!(matches!(
        facet.wrapper_class().bind_static(&facet).unwrap_err(),
        RuntimeError::DuplicateBinding { .. }
    ));
}

#[test]
fn development_mode_writes_listings() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = BridgeConfig::default()
        .with_development(true)
        .with_diagnostics_dir(dir.path());
    let extender = Extender::with_config(Arc::new(HostRegistry::new()), config);
    let facet = extender
        .extend(
            ExtendRequest::new()
                .implementing(runnable())
                .with_instance(ImplementationObject::new().with_fn("run", noop())),
        )
        .unwrap();

    let unit = facet.load_unit().unwrap();
    let path = unit.diagnostics_path().unwrap();
    assert_eq!(
        path.file_name().unwrap().to_string_lossy(),
        format!("Object_{}.txt", unit.id())
    );
    let listing = std::fs::read_to_string(path).unwrap();
    assert!(listing.contains("implements host/Runnable"));
    assert!(listing.contains("2 -> instance run"));
}
