//! Shared test fixtures used across all integration test modules.
//!
//! The fixture registry mirrors a small game-flavored host: integer and real
//! arithmetic, print functions feeding a per-thread output sink, a `Point`
//! record for split/build coverage, and a `Character`/`Gold` pair whose
//! methods exercise mutable references and move-consumed values.

use std::cell::RefCell;

use nodeflow::*;

thread_local! {
    static OUTPUT: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

/// Drains everything printed on this thread since the last call.
pub fn take_output() -> Vec<String> {
    OUTPUT.with(|out| out.borrow_mut().drain(..).collect())
}

fn emit(text: String) {
    OUTPUT.with(|out| out.borrow_mut().push(text));
}

// ---------------------------------------------------------------------------
// Host functions and types
// ---------------------------------------------------------------------------

pub fn mul(a: i32, b: i32) -> i32 {
    a * b
}

pub fn add(a: i32, b: i32) -> i32 {
    a + b
}

pub fn scale(value: f32, factor: f32) -> f32 {
    value * factor
}

pub fn print_int(value: &i32) {
    emit(value.to_string());
}

pub fn print_float(value: &f32) {
    emit(value.to_string());
}

pub fn print_bool(value: &bool) {
    emit(value.to_string());
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

pub fn print_point(p: &Point) {
    emit(format!("({}, {})", p.x, p.y));
}

#[derive(Debug, Default)]
pub struct Gold {
    pub amount: i32,
}

#[derive(Debug, Clone)]
pub struct Character {
    pub hit_points: i32,
    pub attack_damage: i32,
    pub attack_time: f32,
    pub cooldown: f32,
    pub gold: i32,
}

impl Character {
    pub fn spawn(hit_points: i32, attack_damage: i32, attack_time: f32) -> Self {
        Self {
            hit_points,
            attack_damage,
            attack_time,
            cooldown: 0.0,
            gold: 50,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hit_points > 0
    }

    pub fn get_dps(&self) -> f32 {
        self.attack_damage as f32 / self.attack_time
    }

    pub fn attack(&mut self, target: &mut Character) {
        target.hit_points -= self.attack_damage;
        self.cooldown += self.attack_time;
    }

    pub fn drop_gold(&mut self) -> Gold {
        let amount = self.gold;
        self.gold = 0;
        Gold { amount }
    }

    pub fn give_gold(&mut self, gold: Gold) {
        self.gold += gold.amount;
    }

    pub fn get_gold(&self) -> i32 {
        self.gold
    }
}

// ---------------------------------------------------------------------------
// Registry and catalog builders
// ---------------------------------------------------------------------------

/// Builds the fixture registry.
pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register_primitive::<i32>("i32");
    registry.register_primitive::<f32>("f32");
    registry.register_primitive::<bool>("bool");
    registry.enable_literals::<i32>();
    registry.enable_literals::<f32>();

    registry.register_fn("mul", &["a", "b"], mul);
    registry.register_fn("add", &["a", "b"], add);
    registry.register_fn("scale", &["value", "factor"], scale);
    registry.register_fn("print_int", &["value"], print_int);
    registry.register_fn("print_float", &["value"], print_float);
    registry.register_fn("print_bool", &["value"], print_bool);

    registry
        .bind_class::<Point>("Point")
        .with_default()
        .field("x", |p| &p.x, |p| &mut p.x)
        .field("y", |p| &p.y, |p| &mut p.y);
    registry.register_fn("print_point", &["p"], print_point);

    registry.bind_class::<Gold>("Gold").with_default();
    registry
        .bind_class::<Character>("Character")
        .method("is_alive", &[], Character::is_alive)
        .method("get_dps", &[], Character::get_dps)
        .method("get_gold", &[], Character::get_gold)
        .method("attack", &["target"], Character::attack)
        .method("drop_gold", &[], Character::drop_gold)
        .method("give_gold", &["gold"], Character::give_gold);

    registry
}

/// Builds a catalog over the fixture registry: one parameterless `Start`
/// event, pure arithmetic nodes, sequenced print nodes, and Point
/// split/build.
pub fn catalog(registry: &TypeRegistry) -> NodeCatalog {
    let mut catalog = NodeCatalog::new();
    catalog.register(NodeType::event("Start", &[])).unwrap();
    for name in ["mul", "add", "scale"] {
        let func = registry.get_function(name).unwrap();
        catalog.register(NodeType::pure_function(func)).unwrap();
    }
    for name in ["print_int", "print_float", "print_bool", "print_point"] {
        let func = registry.get_function(name).unwrap();
        catalog.register(NodeType::function(func)).unwrap();
    }
    let point = registry.get_type_of::<Point>().unwrap();
    catalog.register(NodeType::split(point).unwrap()).unwrap();
    catalog.register(NodeType::build(point).unwrap()).unwrap();
    catalog
}

// ---------------------------------------------------------------------------
// Graph builder helpers
// ---------------------------------------------------------------------------

/// A node over a freshly built event node type.
pub fn event_node(name: &str) -> Node {
    Node::new(&NodeType::event(name, &[]), 0, 0)
}

/// A node calling a registered function, pure (no flow pins).
pub fn pure_node(registry: &TypeRegistry, name: &str) -> Node {
    Node::new(
        &NodeType::pure_function(registry.get_function(name).unwrap()),
        0,
        0,
    )
}

/// A node calling a registered function, sequenced.
pub fn call_node(registry: &TypeRegistry, name: &str) -> Node {
    Node::new(
        &NodeType::function(registry.get_function(name).unwrap()),
        0,
        0,
    )
}
