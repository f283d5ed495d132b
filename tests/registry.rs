//! Tests for type registration, function binding, and argument marshalling.

mod common;

use common::*;
use nodeflow::*;

// ===========================================================================
// Type registration
// ===========================================================================

#[test]
fn primitive_registration_is_idempotent() {
    let mut registry = TypeRegistry::new();
    let first = registry.register_primitive::<i32>("i32");
    let second = registry.register_primitive::<i32>("int32");
    assert_eq!(first, second);
    assert_eq!(registry.get_type(first).unwrap().name, "i32");
}

#[test]
fn class_rebind_keeps_first_fields() {
    let mut registry = TypeRegistry::new();
    registry.register_primitive::<f32>("f32");
    registry
        .bind_class::<Point>("Point")
        .field("x", |p| &p.x, |p| &mut p.x)
        .field("y", |p| &p.y, |p| &mut p.y);

    // A second bind of the same host type is a no-op for name and fields
    registry
        .bind_class::<Point>("Vec2")
        .field("y", |p| &p.y, |p| &mut p.y);

    let def = registry.get_type_of::<Point>().unwrap();
    assert_eq!(def.name, "Point");
    assert_eq!(def.fields.len(), 2);
    assert_eq!(def.fields[0].name, "x");
    assert_eq!(def.fields[1].name, "y");
}

#[test]
fn class_metadata() {
    let registry = registry();
    let def = registry.get_type_of::<Point>().unwrap();
    assert_eq!(def.kind, TypeKind::Class);
    assert!(def.is_record());
    assert!(def.is_default_constructible());
    assert_eq!(def.size, std::mem::size_of::<Point>());
    assert!(def.field("x").is_some());
    assert!(def.field("z").is_none());
}

#[test]
fn primitives_are_fundamental() {
    let registry = registry();
    let def = registry.get_type_of::<i32>().unwrap();
    assert_eq!(def.kind, TypeKind::Fundamental);
    assert!(!def.is_record());
}

#[test]
fn array_types_carry_their_element() {
    let mut registry = TypeRegistry::new();
    registry.register_primitive::<f32>("f32");
    let key = registry.register_array::<f32, 4>("f32[4]");
    let def = registry.get_type(key).unwrap();
    assert_eq!(def.kind, TypeKind::Array);
    assert_eq!(def.size, 16);
    assert_eq!(def.element, Some(registry.get_type_of::<f32>().unwrap().key));
}

#[test]
fn registry_enumerates_in_registration_order() {
    let registry = registry();
    let names: Vec<_> = registry
        .all_functions()
        .iter()
        .map(|f| f.name().to_string())
        .collect();
    assert_eq!(names[0], "mul");
    let type_names: Vec<_> = registry.all_types().map(|t| t.name.clone()).collect();
    assert_eq!(type_names[0], "()");
    assert!(type_names.contains(&"Point".to_string()));
}

#[test]
#[should_panic]
fn binding_over_unregistered_type_fails_fast() {
    let mut registry = TypeRegistry::new();
    // u64 was never registered
    registry.register_fn("sum", &["a", "b"], |a: u64, b: u64| a + b);
}

// ===========================================================================
// Function binding and signatures
// ===========================================================================

#[test]
fn signature_reflects_passing_modes() {
    let registry = registry();
    assert_eq!(
        registry.get_function("mul").unwrap().signature(),
        "mul(i32, i32) -> i32"
    );
    assert_eq!(
        registry.get_function("print_int").unwrap().signature(),
        "print_int(&i32) -> ()"
    );
    assert_eq!(
        registry.get_function("attack").unwrap().signature(),
        "attack(&mut Character, &mut Character) -> ()"
    );
    assert_eq!(
        registry.get_function("get_dps").unwrap().signature(),
        "get_dps(&Character) -> f32"
    );
}

#[test]
fn methods_get_this_parameter() {
    let registry = registry();
    let attack = registry.get_function("attack").unwrap();
    assert_eq!(attack.param_names(), &["this", "target"]);
    assert_eq!(attack.params().len(), 2);
    assert_eq!(attack.params()[0].passing, Passing::Mut);
    assert!(!attack.returns_value());
}

#[test]
fn missing_param_names_default_to_empty() {
    let mut registry = TypeRegistry::new();
    registry.register_primitive::<i32>("i32");
    let func = registry.register_fn("mul", &["a"], mul);
    assert_eq!(func.param_names(), &["a", ""]);
}

#[test]
fn duplicate_names_resolve_to_first() {
    let mut registry = TypeRegistry::new();
    registry.register_primitive::<i32>("i32");
    registry.register_fn("op", &["a", "b"], mul);
    registry.register_fn("op", &["a", "b"], add);
    let func = registry.get_function("op").unwrap();
    let out = func
        .invoke(&[Value::new(2i32), Value::new(3i32)])
        .unwrap()
        .unwrap();
    assert_eq!(out.get::<i32>().unwrap(), 6);
}

// ===========================================================================
// Marshalling
// ===========================================================================

#[test]
fn by_value_invocation_returns_owned_result() {
    let registry = registry();
    let func = registry.get_function("add").unwrap();
    let out = func
        .invoke(&[Value::new(4i32), Value::new(8i32)])
        .unwrap()
        .unwrap();
    assert!(out.is::<i32>());
    assert_eq!(out.get::<i32>().unwrap(), 12);
}

#[test]
fn by_value_consumes_the_slot() {
    let registry = registry();
    let func = registry.get_function("add").unwrap();
    let a = Value::new(4i32);
    let b = Value::new(8i32);
    func.invoke(&[a.clone(), b.clone()]).unwrap();
    // Moved out; the cells hold the default sentinel now
    assert_eq!(a.get::<i32>().unwrap(), 0);
    assert_eq!(b.get::<i32>().unwrap(), 0);
}

#[test]
fn by_ref_leaves_the_slot_intact() {
    let registry = registry();
    let func = registry.get_function("print_int").unwrap();
    let value = Value::new(42i32);
    func.invoke(&[value.clone()]).unwrap();
    assert_eq!(value.get::<i32>().unwrap(), 42);
    assert_eq!(take_output(), vec!["42"]);
}

#[test]
fn by_mut_mutates_through_the_slot() {
    let registry = registry();
    let attack = registry.get_function("attack").unwrap();
    let player = Value::new(Character::spawn(100, 20, 0.5));
    let enemy = Value::new(Character::spawn(30, 10, 1.0));
    attack.invoke(&[player.clone(), enemy.clone()]).unwrap();
    assert_eq!(enemy.borrow::<Character>().unwrap().hit_points, 10);
    assert_eq!(player.borrow::<Character>().unwrap().cooldown, 0.5);
}

#[test]
fn moved_out_record_leaves_default() {
    let registry = registry();
    let give = registry.get_function("give_gold").unwrap();
    let player = Value::new(Character::spawn(100, 20, 0.5));
    let purse = Value::move_only(Gold { amount: 25 });
    give.invoke(&[player.clone(), purse.clone()]).unwrap();
    assert_eq!(player.borrow::<Character>().unwrap().gold, 75);
    // The gold was moved into the callee; the cell holds Gold::default()
    assert_eq!(purse.borrow::<Gold>().unwrap().amount, 0);
}

#[test]
fn arity_is_checked_on_invoke() {
    let registry = registry();
    let func = registry.get_function("mul").unwrap();
    let err = func.invoke(&[Value::new(1i32)]).unwrap_err();
    assert!(matches!(
        err,
        NodeflowError::ArityMismatch {
            expected: 2,
            got: 1
        }
    ));
}

#[test]
fn wrong_argument_type_is_rejected() {
    let registry = registry();
    let func = registry.get_function("print_int").unwrap();
    let err = func.invoke(&[Value::new(1.5f32)]).unwrap_err();
    assert!(matches!(err, NodeflowError::TypeMismatch { .. }));
}

#[test]
fn closures_can_be_bound() {
    let mut registry = TypeRegistry::new();
    registry.register_primitive::<i32>("i32");
    registry.register_fn("negate", &["value"], |value: i32| -value);
    let out = registry
        .get_function("negate")
        .unwrap()
        .invoke(&[Value::new(7i32)])
        .unwrap()
        .unwrap();
    assert_eq!(out.get::<i32>().unwrap(), -7);
}

#[test]
fn nullary_functions_bind() {
    let mut registry = TypeRegistry::new();
    registry.register_primitive::<i32>("i32");
    registry.register_fn("seven", &[], || 7i32);
    let out = registry
        .get_function("seven")
        .unwrap()
        .invoke(&[])
        .unwrap()
        .unwrap();
    assert_eq!(out.get::<i32>().unwrap(), 7);
}

// ===========================================================================
// Constructors
// ===========================================================================

#[test]
fn constructor_registers_under_class_name() {
    let mut registry = TypeRegistry::new();
    registry.register_primitive::<f32>("f32");
    registry
        .bind_class::<Point>("Point")
        .with_default()
        .field("x", |p| &p.x, |p| &mut p.x)
        .field("y", |p| &p.y, |p| &mut p.y)
        .constructor(&["x", "y"], |x: f32, y: f32| Point { x, y });

    let ctor = registry.get_function("Point").unwrap();
    assert_eq!(ctor.signature(), "Point(f32, f32) -> Point");
    let out = ctor
        .invoke(&[Value::new(1.0f32), Value::new(2.0f32)])
        .unwrap()
        .unwrap();
    assert_eq!(*out.borrow::<Point>().unwrap(), Point { x: 1.0, y: 2.0 });
}

// ===========================================================================
// Literals
// ===========================================================================

#[test]
fn literal_parsers_only_cover_enabled_types() {
    let registry = registry();
    // Exercised through compilation in the compile tests; here just confirm
    // the fixture enables integers and reals and nothing else parses
    let graph_err = {
        let mut graph = Graph::new();
        let start = graph.add(event_node("Start"));
        let show = graph.add(call_node(&registry, "print_bool"));
        graph.set_immediate(show, 0, "true").unwrap();
        graph.connect_flow(start, show).unwrap();
        graph.compile(start, &registry).unwrap_err()
    };
    assert!(matches!(
        graph_err,
        NodeflowError::UnsupportedImmediate { .. }
    ));
}
