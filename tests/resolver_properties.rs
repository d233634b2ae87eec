use std::collections::HashMap;

use kestrel::Interpreter;
use proptest::prelude::*;

const NAMES: [&str; 4] = ["a", "b", "c", "d"];

// Random programs built from shadowing declarations, writes and reads nested
// inside blocks and immediately-called functions.
#[derive(Debug, Clone)]
enum Item {
    Declare(usize, u32),
    Assign(usize, u32),
    Print(usize),
    Block(Vec<Item>),
    Call(Vec<Item>),
}

fn item_strategy() -> impl Strategy<Value = Item> {
    let leaf = prop_oneof![
        (0..NAMES.len(), 0..100u32).prop_map(|(name, value)| Item::Declare(name, value)),
        (0..NAMES.len(), 0..100u32).prop_map(|(name, value)| Item::Assign(name, value)),
        (0..NAMES.len()).prop_map(Item::Print),
    ];
    leaf.prop_recursive(6, 96, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Item::Block),
            prop::collection::vec(inner, 0..8).prop_map(Item::Call),
        ]
    })
}

fn render(items: &[Item], functions: &mut usize, out: &mut String) {
    for item in items {
        match item {
            Item::Declare(name, value) => out.push_str(&format!("var {} = {value};\n", NAMES[*name])),
            Item::Assign(name, value) => out.push_str(&format!("{} = {value};\n", NAMES[*name])),
            Item::Print(name) => out.push_str(&format!("print {};\n", NAMES[*name])),
            Item::Block(body) => {
                out.push_str("{\n");
                render(body, functions, out);
                out.push_str("}\n");
            }
            Item::Call(body) => {
                let function = format!("f{functions}");
                *functions += 1;
                out.push_str(&format!("fun {function}() {{\n"));
                render(body, functions, out);
                out.push_str(&format!("}}\n{function}();\n"));
            }
        }
    }
}

// Reference model: a plain scope stack searched innermost-first at run time
fn simulate(items: &[Item], scopes: &mut Vec<HashMap<usize, u32>>, out: &mut String) {
    for item in items {
        match item {
            Item::Declare(name, value) => {
                if let Some(scope) = scopes.last_mut() {
                    scope.insert(*name, *value);
                }
            }
            Item::Assign(name, value) => {
                if let Some(scope) = scopes.iter_mut().rev().find(|scope| scope.contains_key(name)) {
                    scope.insert(*name, *value);
                }
            }
            Item::Print(name) => {
                let value = scopes.iter().rev().find_map(|scope| scope.get(name));
                if let Some(value) = value {
                    out.push_str(&format!("{value}\n"));
                }
            }
            Item::Block(body) | Item::Call(body) => {
                scopes.push(HashMap::new());
                simulate(body, scopes, out);
                scopes.pop();
            }
        }
    }
}

proptest! {
    #[test]
    fn resolved_distances_match_linear_lookup(items in prop::collection::vec(item_strategy(), 1..12)) {
        // every name exists globally, so each lookup has a binding somewhere
        let mut code = String::new();
        let mut globals = HashMap::new();
        for (index, name) in NAMES.iter().enumerate() {
            code.push_str(&format!("var {name} = {};\n", 1000 + index));
            globals.insert(index, 1000 + index as u32);
        }
        render(&items, &mut 0, &mut code);

        let mut expected = String::new();
        simulate(&items, &mut vec![globals], &mut expected);

        let mut buffer = Vec::new();
        let mut interpreter = Interpreter::new(&mut buffer);
        let result = kestrel::execute(&code, &mut interpreter);
        drop(interpreter);

        prop_assert!(result.is_ok(), "{:?}\n{}", result, code);
        prop_assert_eq!(expected, String::from_utf8(buffer).unwrap(), "{}", code);
    }
}
