pub mod composite;
pub mod nand;

use crate::pin::{InputPin, OutputPin};

pub use composite::CompositeState;

#[derive(Debug, Clone)]
pub enum ComponentKind {
    Nand,
    Composite(CompositeState),
}

/// An instantiated component living in a [`Circuit`](crate::Circuit) arena.
#[derive(Debug, Clone)]
pub struct Component {
    pub(crate) name: String,
    pub(crate) inputs: Vec<InputPin>,
    pub(crate) outputs: Vec<OutputPin>,
    pub(crate) kind: ComponentKind,
}

impl Component {
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<InputPin>,
        outputs: Vec<OutputPin>,
        kind: ComponentKind,
    ) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs,
            kind,
        }
    }

    /// Instance name (the top-level component carries its type name).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    pub fn inputs(&self) -> &[InputPin] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputPin] {
        &self.outputs
    }

    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|pin| pin.name() == name)
    }

    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|pin| pin.name() == name)
    }

    pub fn as_composite(&self) -> Option<&CompositeState> {
        match &self.kind {
            ComponentKind::Composite(state) => Some(state),
            ComponentKind::Nand => None,
        }
    }
}
