use refract_reflect::{
    builtins, ClassId, ClassMetadata, ClassRef, ClassRegistry, ConstructorBuilder, Direction,
    FieldBuilder, Invoker, Member, MethodBuilder, Primitive, ReflectError, ReflectionPermission,
    Value,
};

fn secret(registry: &mut ClassRegistry) -> ClassId {
    let b = registry
        .class("Secret")
        .field(FieldBuilder::new("token", builtins::STRING).private().initial("s3cret"))
        .field(FieldBuilder::new("pin", Primitive::Int).private().initial(1234))
        .method(MethodBuilder::new("getPin").returns(Primitive::Int).private().reads("pin"));
    registry.register(b).unwrap()
}

fn restrict(registry: &ClassRegistry, class: ClassId, permission: ReflectionPermission) {
    registry
        .permissions()
        .write()
        .set_class(class, permission)
        .unwrap();
}

#[test]
fn test_private_field_read_forces_accessible() {
    let mut registry = ClassRegistry::new();
    let class = secret(&mut registry);
    let meta = ClassMetadata::build(&registry, class).unwrap();
    let obj = meta.new_instance().unwrap();

    let getter = meta.getter_invoker("token").unwrap();
    let field = match getter {
        Invoker::GetField(f) => f.field(),
        other => panic!("expected a field getter, got {:?}", other),
    };
    assert!(!field.is_accessible());
    assert_eq!(getter.invoke(&obj, &[]).unwrap(), Value::from("s3cret"));
    assert!(field.is_accessible());

    meta.setter_invoker("token")
        .unwrap()
        .invoke(&obj, &[Value::from("rotated")])
        .unwrap();
    assert_eq!(getter.invoke(&obj, &[]).unwrap(), Value::from("rotated"));
}

#[test]
fn test_private_field_denied_without_permission() {
    let mut registry = ClassRegistry::new();
    let class = secret(&mut registry);
    restrict(&registry, class, ReflectionPermission::PUBLIC_ONLY);
    let meta = ClassMetadata::build(&registry, class).unwrap();
    let obj = meta.new_instance().unwrap();

    let err = meta.getter_invoker("token").unwrap().invoke(&obj, &[]).unwrap_err();
    assert!(matches!(&err, ReflectError::AccessDenied { member } if member == "Secret.token"));
    assert_eq!(err.to_string(), "Access denied to Secret.token");

    let err = meta
        .setter_invoker("token")
        .unwrap()
        .invoke(&obj, &[Value::from("x")])
        .unwrap_err();
    assert!(matches!(err, ReflectError::AccessDenied { .. }));
}

#[test]
fn test_override_permission_is_per_access_kind() {
    let mut registry = ClassRegistry::new();
    let class = secret(&mut registry);
    restrict(
        &registry,
        class,
        ReflectionPermission::READ_ALL.union(ReflectionPermission::INVOKE_PUBLIC),
    );
    let meta = ClassMetadata::build(&registry, class).unwrap();
    let obj = meta.new_instance().unwrap();

    // Writes are checked before any read has forced the field open.
    let err = meta
        .setter_invoker("token")
        .unwrap()
        .invoke(&obj, &[Value::from("x")])
        .unwrap_err();
    assert!(matches!(err, ReflectError::AccessDenied { .. }));
    assert_eq!(
        meta.getter_invoker("token").unwrap().invoke(&obj, &[]).unwrap(),
        Value::from("s3cret")
    );

    // A private getter method needs INVOKE_PRIVATE, not READ_PRIVATE.
    let err = meta.getter_invoker("pin").unwrap().invoke(&obj, &[]).unwrap_err();
    assert!(matches!(&err, ReflectError::AccessDenied { member } if member == "Secret.getPin"));
}

#[test]
fn test_private_getter_method_forced_accessible() {
    let mut registry = ClassRegistry::new();
    let class = secret(&mut registry);
    let meta = ClassMetadata::build(&registry, class).unwrap();
    let obj = meta.new_instance().unwrap();

    let getter = meta.getter_invoker("pin").unwrap();
    assert!(matches!(getter, Invoker::Method(_)));
    assert_eq!(getter.invoke(&obj, &[]).unwrap(), Value::Int(1234));
}

#[test]
fn test_private_constructor() {
    let mut registry = ClassRegistry::new();
    let singleton = registry
        .class("Singleton")
        .constructor(ConstructorBuilder::new().private());
    let singleton = registry.register(singleton).unwrap();

    let meta = ClassMetadata::build(&registry, singleton).unwrap();
    assert!(meta.new_instance().unwrap().as_object().is_some());

    let mut registry = ClassRegistry::new();
    let locked = registry
        .class("Locked")
        .constructor(ConstructorBuilder::new().private());
    let locked = registry.register(locked).unwrap();
    restrict(&registry, locked, ReflectionPermission::PUBLIC_ONLY);
    let meta = ClassMetadata::build(&registry, locked).unwrap();
    let err = meta.new_instance().unwrap_err();
    assert!(matches!(&err, ReflectError::AccessDenied { member } if member == "Locked.<init>"));
}

#[test]
fn test_final_field_write_needs_override() {
    let mut registry = ClassRegistry::new();
    let ticket = registry
        .class("Ticket")
        .field(FieldBuilder::new("id", Primitive::Long).final_().initial(7i64));
    let ticket = registry.register(ticket).unwrap();
    let meta = ClassMetadata::build(&registry, ticket).unwrap();
    let obj = meta.new_instance().unwrap();

    meta.setter_invoker("id")
        .unwrap()
        .invoke(&obj, &[Value::Long(8)])
        .unwrap();
    assert_eq!(meta.getter_invoker("id").unwrap().invoke(&obj, &[]).unwrap(), Value::Long(8));

    let mut registry = ClassRegistry::new();
    let frozen = registry
        .class("Frozen")
        .field(FieldBuilder::new("id", Primitive::Long).final_().initial(7i64));
    let frozen = registry.register(frozen).unwrap();
    restrict(&registry, frozen, ReflectionPermission::PUBLIC_ONLY);
    let meta = ClassMetadata::build(&registry, frozen).unwrap();
    let obj = meta.new_instance().unwrap();
    let err = meta
        .setter_invoker("id")
        .unwrap()
        .invoke(&obj, &[Value::Long(8)])
        .unwrap_err();
    assert!(matches!(err, ReflectError::AccessDenied { .. }));
    assert_eq!(meta.getter_invoker("id").unwrap().invoke(&obj, &[]).unwrap(), Value::Long(7));
}

#[test]
fn test_sealed_permissions_cannot_change() {
    let mut registry = ClassRegistry::new();
    let class = secret(&mut registry);
    let mut store = registry.permissions().write();
    store.set_class(class, ReflectionPermission::READ_ALL).unwrap();
    store.seal_class(class);
    assert!(store.is_class_sealed(class));
    assert!(matches!(
        store.set_class(class, ReflectionPermission::ALL),
        Err(ReflectError::PermissionsSealed(_))
    ));
    assert!(store.clear_class(class).is_err());
    assert_eq!(store.resolve(class), ReflectionPermission::READ_ALL);
}

#[test]
fn test_interface_getter_dispatches_to_implementation() {
    let mut registry = ClassRegistry::new();
    let shape = registry
        .interface("Shape")
        .method(MethodBuilder::new("getArea").returns(Primitive::Double));
    let shape = registry.register(shape).unwrap();
    let square = registry
        .class("Square")
        .implements(shape)
        .field(FieldBuilder::new("side", Primitive::Double).private().initial(3.0))
        .method(MethodBuilder::new("getArea").returns(Primitive::Double).body(|this, _| {
            let side = this
                .as_object()
                .and_then(|obj| obj.get("side"))
                .and_then(|side| side.as_double())
                .ok_or("no side")?;
            Ok(Value::Double(side * side))
        }));
    let square = registry.register(square).unwrap();

    let shape_meta = ClassMetadata::build(&registry, shape).unwrap();
    let square_meta = ClassMetadata::build(&registry, square).unwrap();
    let obj = square_meta.new_instance().unwrap();

    let getter = shape_meta.getter_invoker("area").unwrap();
    assert_eq!(getter.declaring_class(), shape);
    assert_eq!(getter.invoke(&obj, &[]).unwrap(), Value::Double(9.0));
}

#[test]
fn test_superclass_getter_runs_override() {
    let mut registry = ClassRegistry::new();
    let animal = registry
        .class("Animal")
        .method(MethodBuilder::new("getSound").returns(builtins::STRING).body(|_, _| Ok("...".into())));
    let animal = registry.register(animal).unwrap();
    let dog = registry
        .class("Dog")
        .extends(animal)
        .method(MethodBuilder::new("getSound").returns(builtins::STRING).body(|_, _| Ok("woof".into())));
    let dog = registry.register(dog).unwrap();

    let animal_meta = ClassMetadata::build(&registry, animal).unwrap();
    let dog_obj = ClassMetadata::build(&registry, dog).unwrap().new_instance().unwrap();
    let animal_obj = animal_meta.new_instance().unwrap();

    let getter = animal_meta.getter_invoker("sound").unwrap();
    assert_eq!(getter.invoke(&dog_obj, &[]).unwrap(), Value::from("woof"));
    assert_eq!(getter.invoke(&animal_obj, &[]).unwrap(), Value::from("..."));
}

#[test]
fn test_inherited_accessors_use_declaring_class_field() {
    let mut registry = ClassRegistry::new();
    let base = registry
        .class("Named")
        .field(FieldBuilder::new("name", builtins::STRING).private().initial("base-name"))
        .method(MethodBuilder::new("getName").returns(builtins::STRING).reads("name"))
        .method(MethodBuilder::new("setName").param(builtins::STRING).writes("name"));
    let base = registry.register(base).unwrap();
    let sub = registry
        .class("Renamed")
        .extends(base)
        .field(FieldBuilder::new("name", Primitive::Int).private().initial(7));
    let sub = registry.register(sub).unwrap();

    let meta = ClassMetadata::build(&registry, sub).unwrap();
    assert_eq!(meta.getter_type("name").unwrap(), &ClassRef::Declared(builtins::STRING));
    let obj = meta.new_instance().unwrap();
    let getter = meta.getter_invoker("name").unwrap();
    assert_eq!(getter.invoke(&obj, &[]).unwrap(), Value::from("base-name"));

    meta.setter_invoker("name")
        .unwrap()
        .invoke(&obj, &[Value::from("changed")])
        .unwrap();
    assert_eq!(getter.invoke(&obj, &[]).unwrap(), Value::from("changed"));
    assert_eq!(obj.as_object().unwrap().get("name"), Some(Value::Int(7)));
}

#[test]
fn test_accessor_bodies_on_missing_field_fail() {
    let mut registry = ClassRegistry::new();
    let typo = registry
        .class("Typo")
        .field(FieldBuilder::new("name", builtins::STRING).private().initial("kept"))
        .method(MethodBuilder::new("getName").returns(builtins::STRING).reads("nmae"))
        .method(MethodBuilder::new("setName").param(builtins::STRING).writes("nmae"));
    let typo = registry.register(typo).unwrap();

    let meta = ClassMetadata::build(&registry, typo).unwrap();
    let obj = meta.new_instance().unwrap();

    let err = meta
        .setter_invoker("name")
        .unwrap()
        .invoke(&obj, &[Value::from("lost")])
        .unwrap_err();
    match err {
        ReflectError::InvocationFailure { member, reason } => {
            assert_eq!(member, "Typo.setName");
            assert_eq!(reason, "no field 'nmae'");
        }
        other => panic!("expected an invocation failure, got {:?}", other),
    }
    assert!(matches!(
        meta.getter_invoker("name").unwrap().invoke(&obj, &[]),
        Err(ReflectError::InvocationFailure { .. })
    ));
    assert_eq!(obj.as_object().unwrap().get("name"), Some(Value::from("kept")));
}

#[test]
fn test_interface_default_method_is_inherited() {
    let mut registry = ClassRegistry::new();
    let greeter = registry
        .interface("Greeter")
        .method(MethodBuilder::new("getGreeting").returns(builtins::STRING).body(|_, _| Ok("hello".into())));
    let greeter = registry.register(greeter).unwrap();
    let polite = registry.class("Polite").implements(greeter);
    let polite = registry.register(polite).unwrap();

    let meta = ClassMetadata::build(&registry, polite).unwrap();
    let obj = meta.new_instance().unwrap();
    assert_eq!(
        meta.getter_invoker("greeting").unwrap().invoke(&obj, &[]).unwrap(),
        Value::from("hello")
    );
}

#[test]
fn test_target_failures_surface_as_invocation_failures() {
    let mut registry = ClassRegistry::new();
    let base = registry
        .class("Template")
        .abstract_class()
        .method(MethodBuilder::new("getStep").returns(builtins::STRING));
    let base = registry.register(base).unwrap();
    let faulty = registry
        .class("Faulty")
        .extends(base)
        .method(MethodBuilder::new("getValue").returns(Primitive::Int).body(|_, _| Err("boom".to_string())));
    let faulty = registry.register(faulty).unwrap();

    let meta = ClassMetadata::build(&registry, faulty).unwrap();
    let obj = meta.new_instance().unwrap();

    let err = meta.getter_invoker("value").unwrap().invoke(&obj, &[]).unwrap_err();
    match err {
        ReflectError::InvocationFailure { member, reason } => {
            assert_eq!(member, "Faulty.getValue");
            assert_eq!(reason, "boom");
        }
        other => panic!("expected an invocation failure, got {:?}", other),
    }

    let err = meta.getter_invoker("step").unwrap().invoke(&obj, &[]).unwrap_err();
    assert!(err.to_string().contains("Template.getStep has no implementation"));

    let err = meta
        .getter_invoker("value")
        .unwrap()
        .invoke(&obj, &[Value::Int(1)])
        .unwrap_err();
    assert!(err.to_string().contains("wrong number of arguments"));

    let err = meta.getter_invoker("value").unwrap().invoke(&Value::Null, &[]).unwrap_err();
    assert!(matches!(err, ReflectError::InvocationFailure { .. }));
}

#[test]
fn test_field_invoker_arity_and_receiver() {
    let mut registry = ClassRegistry::new();
    let counter = registry
        .class("Tally")
        .field(FieldBuilder::new("count", Primitive::Int).initial(0));
    let counter = registry.register(counter).unwrap();
    let meta = ClassMetadata::build(&registry, counter).unwrap();
    let obj = meta.new_instance().unwrap();

    let setter = meta.setter_invoker("count").unwrap();
    assert!(matches!(
        setter.invoke(&obj, &[]),
        Err(ReflectError::InvocationFailure { .. })
    ));
    assert!(matches!(
        setter.invoke(&obj, &[Value::Int(1), Value::Int(2)]),
        Err(ReflectError::InvocationFailure { .. })
    ));
    assert_eq!(setter.invoke(&obj, &[Value::Int(3)]).unwrap(), Value::Null);

    let getter = meta.getter_invoker("count").unwrap();
    assert!(matches!(
        getter.invoke(&obj, &[Value::Int(9)]),
        Err(ReflectError::InvocationFailure { .. })
    ));
    assert!(matches!(
        getter.invoke(&Value::from("not an object"), &[]),
        Err(ReflectError::InvocationFailure { .. })
    ));
    assert_eq!(getter.invoke(&obj, &[]).unwrap(), Value::Int(3));
}

#[test]
fn test_invoker_direction_and_value_type() {
    let mut registry = ClassRegistry::new();
    let account = registry
        .class("Account")
        .field(FieldBuilder::new("owner", builtins::STRING))
        .field(FieldBuilder::new("balance", Primitive::Long).private())
        .method(MethodBuilder::new("getBalance").returns(Primitive::Long).reads("balance"))
        .method(MethodBuilder::new("setBalance").param(Primitive::Long).writes("balance"));
    let account = registry.register(account).unwrap();
    let meta = ClassMetadata::build(&registry, account).unwrap();

    let long = ClassRef::Primitive(Primitive::Long);
    let getter = meta.getter_invoker("balance").unwrap();
    let setter = meta.setter_invoker("balance").unwrap();
    assert_eq!(getter.direction(), Direction::Get);
    assert_eq!(setter.direction(), Direction::Set);
    assert_eq!(getter.value_type(), long);
    assert_eq!(setter.value_type(), long);

    let owner_get = meta.getter_invoker("owner").unwrap();
    let owner_set = meta.setter_invoker("owner").unwrap();
    assert!(matches!(owner_get, Invoker::GetField(_)));
    assert!(matches!(owner_set, Invoker::SetField(_)));
    assert_eq!(owner_get.direction(), Direction::Get);
    assert_eq!(owner_set.direction(), Direction::Set);
    assert_eq!(owner_get.value_type(), ClassRef::Declared(builtins::STRING));
    assert_eq!(owner_get.declaring_class(), account);
}
