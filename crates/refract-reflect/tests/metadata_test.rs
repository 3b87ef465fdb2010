use refract_reflect::invoker::MethodInvoker;
use refract_reflect::{
    builtins, ClassId, ClassMetadata, ClassRef, ClassRegistry, ConstructorBuilder, FieldBuilder,
    Invoker, MethodBuilder, Primitive, ReflectError, Type, Value,
};

fn method_of(invoker: &Invoker) -> &MethodInvoker {
    match invoker {
        Invoker::Method(m) => m,
        other => panic!("expected a method invoker, got {:?}", other),
    }
}

fn build(registry: &ClassRegistry, class: ClassId) -> ClassMetadata {
    ClassMetadata::build(registry, class).unwrap()
}

fn assert_unique_sorted(names: &[String]) {
    let mut expected = names.to_vec();
    expected.sort();
    expected.dedup();
    assert_eq!(names, expected.as_slice());
}

fn person(registry: &mut ClassRegistry) -> ClassId {
    let b = registry
        .class("Person")
        .field(FieldBuilder::new("name", builtins::STRING).private())
        .field(FieldBuilder::new("age", Primitive::Int).private().initial(0))
        .method(MethodBuilder::new("getName").returns(builtins::STRING).reads("name"))
        .method(MethodBuilder::new("setName").param(builtins::STRING).writes("name"))
        .method(MethodBuilder::new("getAge").returns(Primitive::Int).reads("age"))
        .method(MethodBuilder::new("setAge").param(Primitive::Int).writes("age"));
    registry.register(b).unwrap()
}

#[test]
fn test_bean_properties_round_trip_through_accessors() {
    let mut registry = ClassRegistry::new();
    let person = person(&mut registry);
    let meta = build(&registry, person);

    assert_eq!(meta.class(), person);
    assert_eq!(meta.class_name(), "Person");
    assert_eq!(meta.readable_property_names(), ["age", "name"]);
    assert_eq!(meta.writable_property_names(), ["age", "name"]);
    assert_eq!(meta.getter_type("name").unwrap(), &ClassRef::Declared(builtins::STRING));
    assert_eq!(meta.setter_type("age").unwrap(), &ClassRef::Primitive(Primitive::Int));

    let obj = meta.new_instance().unwrap();
    meta.setter_invoker("name")
        .unwrap()
        .invoke(&obj, &[Value::from("Ada")])
        .unwrap();
    meta.setter_invoker("age")
        .unwrap()
        .invoke(&obj, &[Value::Int(36)])
        .unwrap();
    assert_eq!(meta.getter_invoker("name").unwrap().invoke(&obj, &[]).unwrap(), Value::from("Ada"));
    assert_eq!(meta.getter_invoker("age").unwrap().invoke(&obj, &[]).unwrap(), Value::Int(36));
}

#[test]
fn test_missing_property_errors() {
    let mut registry = ClassRegistry::new();
    let person = person(&mut registry);
    let meta = build(&registry, person);

    assert!(!meta.has_getter("nope"));
    assert!(!meta.has_setter("nope"));
    let err = meta.getter_invoker("nope").unwrap_err();
    assert_eq!(err.to_string(), "There is no getter for property named 'nope' in 'Person'");
    let err = meta.setter_type("nope").unwrap_err();
    assert_eq!(err.to_string(), "There is no setter for property named 'nope' in 'Person'");
    assert!(matches!(meta.getter_type("nope"), Err(ReflectError::NoSuchProperty { .. })));
    assert!(matches!(meta.setter_invoker("nope"), Err(ReflectError::NoSuchProperty { .. })));
}

#[test]
fn test_is_getter_preferred_for_boolean_in_either_order() {
    let mut registry = ClassRegistry::new();
    let get_first = registry
        .class("GetFirst")
        .method(MethodBuilder::new("getActive").returns(Primitive::Boolean).body(|_, _| Ok(false.into())))
        .method(MethodBuilder::new("isActive").returns(Primitive::Boolean).body(|_, _| Ok(true.into())));
    let get_first = registry.register(get_first).unwrap();
    let is_first = registry
        .class("IsFirst")
        .method(MethodBuilder::new("isActive").returns(Primitive::Boolean).body(|_, _| Ok(true.into())))
        .method(MethodBuilder::new("getActive").returns(Primitive::Boolean).body(|_, _| Ok(false.into())));
    let is_first = registry.register(is_first).unwrap();

    for class in [get_first, is_first] {
        let meta = build(&registry, class);
        let getter = meta.getter_invoker("active").unwrap();
        assert!(!getter.is_ambiguous());
        assert_eq!(method_of(getter).method().name(), "isActive");
        assert_eq!(meta.readable_property_names(), ["active"]);
    }
}

#[test]
fn test_identical_override_yields_one_getter() {
    let mut registry = ClassRegistry::new();
    let base = registry
        .class("Base")
        .method(MethodBuilder::new("getName").returns(builtins::STRING).body(|_, _| Ok("base".into())));
    let base = registry.register(base).unwrap();
    let sub = registry
        .class("Sub")
        .extends(base)
        .method(MethodBuilder::new("getName").returns(builtins::STRING).body(|_, _| Ok("sub".into())));
    let sub = registry.register(sub).unwrap();

    let meta = build(&registry, sub);
    assert_eq!(meta.readable_property_names(), ["name"]);
    let getter = meta.getter_invoker("name").unwrap();
    assert!(!getter.is_ambiguous());
    assert_eq!(getter.declaring_class(), sub);

    let obj = meta.new_instance().unwrap();
    assert_eq!(getter.invoke(&obj, &[]).unwrap(), Value::from("sub"));
}

#[test]
fn test_covariant_getter_prefers_narrower_type() {
    let mut registry = ClassRegistry::new();
    let base = registry
        .class("Holder")
        .method(MethodBuilder::new("getValue").returns(builtins::NUMBER).body(|_, _| Ok(Value::Long(1))));
    let base = registry.register(base).unwrap();
    let sub = registry
        .class("IntHolder")
        .extends(base)
        .method(MethodBuilder::new("getValue").returns(builtins::INTEGER).body(|_, _| Ok(Value::Int(2))));
    let sub = registry.register(sub).unwrap();

    let meta = build(&registry, sub);
    let getter = meta.getter_invoker("value").unwrap();
    assert!(!getter.is_ambiguous());
    assert_eq!(getter.declaring_class(), sub);
    assert_eq!(meta.getter_type("value").unwrap(), &ClassRef::Declared(builtins::INTEGER));

    // Wider declaration seen first: the narrower candidate replaces it.
    let narrow = registry
        .interface("NarrowValue")
        .method(MethodBuilder::new("getValue").returns(builtins::INTEGER));
    let narrow = registry.register(narrow).unwrap();
    let wide_first = registry
        .class("WideFirst")
        .abstract_class()
        .implements(narrow)
        .method(MethodBuilder::new("getValue").returns(builtins::NUMBER).body(|_, _| Ok(Value::Int(3))));
    let wide_first = registry.register(wide_first).unwrap();
    let meta = build(&registry, wide_first);
    assert_eq!(meta.getter_type("value").unwrap(), &ClassRef::Declared(builtins::INTEGER));
    assert_eq!(meta.getter_invoker("value").unwrap().declaring_class(), narrow);
}

#[test]
fn test_unrelated_getter_types_are_ambiguous() {
    let mut registry = ClassRegistry::new();
    let has_number = registry
        .interface("HasNumber")
        .method(MethodBuilder::new("getX").returns(builtins::NUMBER));
    let has_number = registry.register(has_number).unwrap();
    let has_text = registry
        .interface("HasText")
        .method(MethodBuilder::new("getX").returns(builtins::STRING));
    let has_text = registry.register(has_text).unwrap();
    let both = registry
        .class("Both")
        .abstract_class()
        .implements(has_number)
        .implements(has_text);
    let both = registry.register(both).unwrap();

    let meta = build(&registry, both);
    assert!(meta.has_getter("x"));
    assert_eq!(meta.readable_property_names(), ["x"]);
    assert_eq!(meta.getter_type("x").unwrap(), &ClassRef::Declared(builtins::NUMBER));

    let getter = meta.getter_invoker("x").unwrap();
    assert!(getter.is_ambiguous());
    assert_eq!(getter.value_type(), ClassRef::Declared(builtins::NUMBER));
    match getter.invoke(&Value::Null, &[]) {
        Err(ReflectError::AmbiguousMember(message)) => {
            assert!(message.starts_with(
                "Illegal overloaded getter method with ambiguous type for property 'x' in class 'HasNumber'."
            ));
        }
        other => panic!("expected an ambiguity failure, got {:?}", other),
    }
}

#[test]
fn test_generic_types_resolve_through_parameterized_superclass() {
    let mut registry = ClassRegistry::new();
    let mut b = registry.class("Box");
    let t = b.type_param("T");
    let b = b
        .field(FieldBuilder::new("content", Type::var(t.clone())))
        .field(FieldBuilder::new("value", Type::var(t.clone())).private())
        .method(MethodBuilder::new("getValue").returns(Type::var(t.clone())).reads("value"))
        .method(MethodBuilder::new("setValue").param(Type::var(t)).writes("value"));
    let box_id = registry.register(b).unwrap();
    let string_box = registry
        .class("StringBox")
        .extends(Type::parameterized(box_id, vec![Type::class(builtins::STRING)]));
    let string_box = registry.register(string_box).unwrap();

    let string = ClassRef::Declared(builtins::STRING);
    let meta = build(&registry, string_box);
    assert_eq!(meta.getter_type("value").unwrap(), &string);
    assert_eq!(meta.setter_type("value").unwrap(), &string);
    assert_eq!(meta.getter_type("content").unwrap(), &string);
    assert_eq!(meta.setter_type("content").unwrap(), &string);
    assert!(matches!(meta.getter_invoker("content").unwrap(), Invoker::GetField(_)));

    // The accessor itself still reports the erased declaration.
    assert_eq!(meta.getter_invoker("value").unwrap().value_type(), ClassRef::OBJECT);

    let raw = build(&registry, box_id);
    assert_eq!(raw.getter_type("value").unwrap(), &ClassRef::OBJECT);

    let obj = meta.new_instance().unwrap();
    meta.setter_invoker("value")
        .unwrap()
        .invoke(&obj, &[Value::from("boxed")])
        .unwrap();
    assert_eq!(
        meta.getter_invoker("value").unwrap().invoke(&obj, &[]).unwrap(),
        Value::from("boxed")
    );
}

#[test]
fn test_field_fallback_exposes_public_field() {
    let mut registry = ClassRegistry::new();
    let counter = registry
        .class("Counter")
        .field(FieldBuilder::new("count", Primitive::Int).initial(5));
    let counter = registry.register(counter).unwrap();

    let meta = build(&registry, counter);
    assert_eq!(meta.readable_property_names(), ["count"]);
    assert_eq!(meta.writable_property_names(), ["count"]);
    let int = ClassRef::Primitive(Primitive::Int);
    assert_eq!(meta.getter_type("count").unwrap(), &int);
    assert_eq!(meta.setter_type("count").unwrap(), &int);

    let obj = meta.new_instance().unwrap();
    let getter = meta.getter_invoker("count").unwrap();
    assert_eq!(getter.invoke(&obj, &[]).unwrap(), Value::Int(5));
    meta.setter_invoker("count")
        .unwrap()
        .invoke(&obj, &[Value::Int(6)])
        .unwrap();
    assert_eq!(getter.invoke(&obj, &[]).unwrap(), Value::Int(6));
}

#[test]
fn test_reserved_names_never_become_properties() {
    let mut registry = ClassRegistry::new();
    let artifact = registry
        .class("Artifact")
        .field(
            FieldBuilder::new("serialVersionUID", Primitive::Long)
                .private()
                .static_()
                .final_()
                .initial(1i64),
        )
        .field(FieldBuilder::new("$internal", Type::object()))
        .field(FieldBuilder::new("class", Type::object()))
        .field(FieldBuilder::new("kept", builtins::STRING))
        .method(MethodBuilder::new("getClass").returns(Type::object()).body(|_, _| Ok(Value::Null)));
    let artifact = registry.register(artifact).unwrap();

    let meta = build(&registry, artifact);
    assert_eq!(meta.readable_property_names(), ["kept"]);
    assert_eq!(meta.writable_property_names(), ["kept"]);
    for reserved in ["serialVersionUID", "$internal", "class"] {
        assert!(!meta.has_getter(reserved));
        assert!(!meta.has_setter(reserved));
    }
}

#[test]
fn test_static_final_field_is_read_only() {
    let mut registry = ClassRegistry::new();
    let consts = registry
        .class("Limits")
        .field(FieldBuilder::new("MAX", Primitive::Int).static_().final_().initial(10))
        .field(FieldBuilder::new("counter", Primitive::Int).static_().initial(0))
        .field(FieldBuilder::new("label", builtins::STRING).final_());
    let consts = registry.register(consts).unwrap();

    let meta = build(&registry, consts);
    assert_eq!(meta.readable_property_names(), ["MAX", "counter", "label"]);
    assert_eq!(meta.writable_property_names(), ["counter", "label"]);
    assert_eq!(
        meta.getter_invoker("MAX").unwrap().invoke(&Value::Null, &[]).unwrap(),
        Value::Int(10)
    );

    meta.setter_invoker("counter")
        .unwrap()
        .invoke(&Value::Null, &[Value::Int(4)])
        .unwrap();
    assert_eq!(
        meta.getter_invoker("counter").unwrap().invoke(&Value::Null, &[]).unwrap(),
        Value::Int(4)
    );
}

#[test]
fn test_subclass_field_hides_superclass_field() {
    let mut registry = ClassRegistry::new();
    let base = registry
        .class("Entity")
        .field(FieldBuilder::new("id", Primitive::Long));
    let base = registry.register(base).unwrap();
    let sub = registry
        .class("NamedEntity")
        .extends(base)
        .field(FieldBuilder::new("id", builtins::STRING));
    let sub = registry.register(sub).unwrap();

    let meta = build(&registry, sub);
    assert_eq!(meta.readable_property_names(), ["id"]);
    assert_eq!(meta.getter_type("id").unwrap(), &ClassRef::Declared(builtins::STRING));
    assert_eq!(meta.getter_invoker("id").unwrap().declaring_class(), sub);
}

#[test]
fn test_case_insensitive_lookup() {
    let mut registry = ClassRegistry::new();
    let person = person(&mut registry);
    let meta = build(&registry, person);

    assert_eq!(meta.find_canonical_name("NAME"), Some("name"));
    assert_eq!(meta.find_canonical_name("aGe"), Some("age"));
    assert_eq!(meta.find_canonical_name("missing"), None);
}

#[test]
fn test_case_insensitive_collision_prefers_writable_spelling() {
    let mut registry = ClassRegistry::new();
    // Readable: "URL" (field) and "url" (getter). Writable: "URL" (field) only.
    let link = registry
        .class("Link")
        .field(FieldBuilder::new("URL", builtins::STRING))
        .method(MethodBuilder::new("getUrl").returns(builtins::STRING).reads("URL"));
    let link = registry.register(link).unwrap();

    let meta = build(&registry, link);
    assert_eq!(meta.readable_property_names(), ["URL", "url"]);
    assert_eq!(meta.writable_property_names(), ["URL"]);
    assert_eq!(meta.find_canonical_name("url"), Some("URL"));
}

#[test]
fn test_setter_matching_getter_type_wins() {
    let mut registry = ClassRegistry::new();
    let pref = registry
        .class("Preference")
        .method(MethodBuilder::new("getValue").returns(builtins::STRING).body(|_, _| Ok(Value::Null)))
        .method(MethodBuilder::new("setValue").param(Type::object()).body(|_, _| Ok(Value::Null)))
        .method(MethodBuilder::new("setValue").param(builtins::STRING).body(|_, _| Ok(Value::Null)));
    let pref = registry.register(pref).unwrap();

    let meta = build(&registry, pref);
    let setter = meta.setter_invoker("value").unwrap();
    assert_eq!(
        method_of(setter).method().param_classes(),
        vec![ClassRef::Declared(builtins::STRING)]
    );
    assert_eq!(meta.setter_type("value").unwrap(), &ClassRef::Declared(builtins::STRING));
}

#[test]
fn test_narrower_setter_wins_without_getter() {
    let mut registry = ClassRegistry::new();
    let num = registry
        .class("NumberSink")
        .method(MethodBuilder::new("setX").param(builtins::NUMBER).body(|_, _| Ok(Value::Null)))
        .method(MethodBuilder::new("setX").param(builtins::INTEGER).body(|_, _| Ok(Value::Null)));
    let num = registry.register(num).unwrap();

    let meta = build(&registry, num);
    assert!(!meta.has_getter("x"));
    assert_eq!(meta.setter_type("x").unwrap(), &ClassRef::Declared(builtins::INTEGER));
    assert!(!meta.setter_invoker("x").unwrap().is_ambiguous());
}

#[test]
fn test_unrelated_setters_are_ambiguous() {
    let mut registry = ClassRegistry::new();
    let mixed = registry
        .class("Mixed")
        .method(MethodBuilder::new("setX").param(builtins::STRING).body(|_, _| Ok(Value::Null)))
        .method(MethodBuilder::new("setX").param(builtins::INTEGER).body(|_, _| Ok(Value::Null)));
    let mixed = registry.register(mixed).unwrap();

    let meta = build(&registry, mixed);
    assert!(meta.has_setter("x"));
    assert_eq!(meta.setter_type("x").unwrap(), &ClassRef::Declared(builtins::STRING));
    let setter = meta.setter_invoker("x").unwrap();
    assert!(setter.is_ambiguous());
    let err = setter.invoke(&Value::Null, &[Value::from("a")]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Ambiguous setters defined for property 'x' in class 'Mixed' with types 'String' and 'Integer'."
    );
}

#[test]
fn test_exact_getter_match_overrides_earlier_setter_ambiguity() {
    let mut registry = ClassRegistry::new();
    let quirk = registry
        .class("Quirk")
        .method(MethodBuilder::new("getX").returns(builtins::LONG).body(|_, _| Ok(Value::Null)))
        .method(MethodBuilder::new("setX").param(builtins::STRING).body(|_, _| Ok(Value::Null)))
        .method(MethodBuilder::new("setX").param(builtins::INTEGER).body(|_, _| Ok(Value::Null)))
        .method(MethodBuilder::new("setX").param(builtins::LONG).body(|_, _| Ok(Value::Null)));
    let quirk = registry.register(quirk).unwrap();

    let meta = build(&registry, quirk);
    let setter = meta.setter_invoker("x").unwrap();
    assert!(!setter.is_ambiguous());
    assert_eq!(setter.value_type(), ClassRef::Declared(builtins::LONG));
    assert_eq!(meta.setter_type("x").unwrap(), &ClassRef::Declared(builtins::LONG));
}

#[test]
fn test_record_components_are_getters_only() {
    let mut registry = ClassRegistry::new();
    let point = registry
        .record("Point")
        .field(FieldBuilder::new("x", Primitive::Int).private().final_())
        .field(FieldBuilder::new("y", Primitive::Int).private().final_())
        .method(MethodBuilder::new("x").returns(Primitive::Int).reads("x"))
        .method(MethodBuilder::new("y").returns(Primitive::Int).reads("y"))
        .method(MethodBuilder::new("getLength").returns(Primitive::Int).body(|_, _| Ok(Value::Int(0))))
        .constructor(
            ConstructorBuilder::new()
                .param(Primitive::Int)
                .param(Primitive::Int)
                .body(|this, args| {
                    this.set("x", args[0].clone());
                    this.set("y", args[1].clone());
                    Ok(())
                }),
        );
    let point = registry.register(point).unwrap();

    let meta = build(&registry, point);
    assert_eq!(meta.readable_property_names(), ["getLength", "x", "y"]);
    assert!(meta.writable_property_names().is_empty());
    assert!(!meta.has_default_constructor());

    let ctor = &registry.class_def(point).unwrap().declared_constructors()[0];
    let obj = ctor.new_instance(&[Value::Int(3), Value::Int(4)]).unwrap();
    assert_eq!(meta.getter_invoker("y").unwrap().invoke(&obj, &[]).unwrap(), Value::Int(4));
}

#[test]
fn test_default_constructor_detection() {
    let mut registry = ClassRegistry::new();
    let explicit = registry
        .class("Explicit")
        .constructor(ConstructorBuilder::new().param(builtins::STRING));
    let explicit = registry.register(explicit).unwrap();
    let implicit = registry.class("Implicit");
    let implicit = registry.register(implicit).unwrap();

    let meta = build(&registry, explicit);
    assert!(!meta.has_default_constructor());
    let err = meta.default_constructor().unwrap_err();
    assert_eq!(err.to_string(), "There is no default constructor for Explicit");
    assert!(matches!(meta.new_instance(), Err(ReflectError::NoDefaultConstructor { .. })));

    let meta = build(&registry, implicit);
    assert!(meta.has_default_constructor());
    assert_eq!(meta.default_constructor().unwrap().param_count(), 0);
    let obj = meta.new_instance().unwrap();
    assert_eq!(obj.as_object().unwrap().class_id(), implicit);
}

#[test]
fn test_abstract_class_cannot_be_instantiated() {
    let mut registry = ClassRegistry::new();
    let shape = registry.class("Shape").abstract_class();
    let shape = registry.register(shape).unwrap();

    let meta = build(&registry, shape);
    assert!(meta.has_default_constructor());
    assert!(matches!(meta.new_instance(), Err(ReflectError::InvocationFailure { .. })));
}

#[test]
fn test_bridge_methods_are_ignored() {
    let mut registry = ClassRegistry::new();
    let bridged = registry
        .class("Bridged")
        .method(MethodBuilder::new("getValue").returns(builtins::STRING).body(|_, _| Ok("v".into())))
        .method(MethodBuilder::new("getValue").returns(builtins::INTEGER).bridge().body(|_, _| Ok(Value::Null)))
        .method(MethodBuilder::new("getHidden").returns(builtins::STRING).bridge().body(|_, _| Ok(Value::Null)));
    let bridged = registry.register(bridged).unwrap();

    let meta = build(&registry, bridged);
    assert_eq!(meta.readable_property_names(), ["value"]);
    assert!(!meta.getter_invoker("value").unwrap().is_ambiguous());
}

#[test]
fn test_interface_metadata() {
    let mut registry = ClassRegistry::new();
    let named = registry
        .interface("Named")
        .method(MethodBuilder::new("getName").returns(builtins::STRING));
    let named = registry.register(named).unwrap();
    let titled = registry
        .interface("Titled")
        .implements(named)
        .method(MethodBuilder::new("getTitle").returns(builtins::STRING))
        .method(MethodBuilder::new("setTitle").param(builtins::STRING));
    let titled = registry.register(titled).unwrap();

    let meta = build(&registry, titled);
    assert_eq!(meta.readable_property_names(), ["name", "title"]);
    assert_eq!(meta.writable_property_names(), ["title"]);
    assert!(!meta.has_default_constructor());
}

#[test]
fn test_builtin_and_root_classes_expose_nothing() {
    let registry = ClassRegistry::new();
    for class in [builtins::OBJECT, builtins::STRING, builtins::INTEGER] {
        let meta = build(&registry, class);
        assert!(meta.readable_property_names().is_empty());
        assert!(meta.writable_property_names().is_empty());
    }
}

#[test]
fn test_property_names_are_unique() {
    let mut registry = ClassRegistry::new();
    let person = person(&mut registry);
    let sub = registry
        .class("Employee")
        .extends(person)
        .field(FieldBuilder::new("name", builtins::STRING))
        .field(FieldBuilder::new("badge", Primitive::Int))
        .method(MethodBuilder::new("getName").returns(builtins::STRING).reads("name"))
        .method(MethodBuilder::new("isBadged").returns(Primitive::Boolean).body(|_, _| Ok(true.into())));
    let sub = registry.register(sub).unwrap();

    let meta = build(&registry, sub);
    assert_unique_sorted(meta.readable_property_names());
    assert_unique_sorted(meta.writable_property_names());
    assert_eq!(meta.readable_property_names(), ["age", "badge", "badged", "name"]);
    assert_eq!(meta.writable_property_names(), ["age", "badge", "name"]);
}

#[test]
fn test_unknown_class_fails_to_build() {
    let registry = ClassRegistry::new();
    assert!(matches!(
        ClassMetadata::build(&registry, ClassId::new(4242)),
        Err(ReflectError::UnknownClass(_))
    ));
}
