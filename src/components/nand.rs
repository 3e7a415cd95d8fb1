use crate::pin::{InputPin, OutputPin};

use super::{Component, ComponentKind};

/// Name under which the two-input NAND is always known.
pub const TYPE_NAME: &str = "nand";
pub const ARITY: usize = 2;
pub const OUTPUT: &str = "out";

pub fn input_name(index: usize) -> String {
    format!("in{index}")
}

pub fn input_index(name: &str, arity: usize) -> Option<usize> {
    let index: usize = name.strip_prefix("in")?.parse().ok()?;
    // Reject spellings like `in01`
    (index < arity && input_name(index) == name).then_some(index)
}

pub fn new(name: impl Into<String>, arity: usize) -> Component {
    let inputs = (0..arity).map(|i| InputPin::new(input_name(i))).collect();
    Component::new(
        name,
        inputs,
        vec![OutputPin::new(OUTPUT)],
        ComponentKind::Nand,
    )
}

/// High as soon as any input is low.
pub fn evaluate(inputs: &[InputPin]) -> bool {
    inputs.iter().any(|input| !input.value())
}
