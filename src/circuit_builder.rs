use std::{collections::HashMap, sync::Arc};

use indexmap::{map::Entry, IndexMap};
use tracing::debug;

use crate::{
    components::nand,
    description::ComponentDesc,
    error::{BuildError, Missing, Site},
    pin::{PinDirection, Signal},
};

/// `instance.pin`, split on its single dot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Address<'a> {
    pub instance: &'a str,
    pub pin: &'a str,
}

impl<'a> Address<'a> {
    /// Returns `None` unless `text` has exactly one `.` with something on
    /// both sides of it.
    pub fn parse(text: &'a str) -> Option<Self> {
        let (instance, pin) = text.split_once('.')?;
        if instance.is_empty() || pin.is_empty() || pin.contains('.') {
            return None;
        }
        Some(Address { instance, pin })
    }
}

/// A pin of one of a definition's internal instances, by position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PinSlot {
    pub instance: usize,
    pub pin: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connection {
    pub from: PinSlot,
    pub to: PinSlot,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalInput {
    pub name: String,
    pub targets: Vec<PinSlot>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalOutput {
    pub name: String,
    pub source: PinSlot,
}

/// One row of a truth table: a value per external input followed by the
/// expected value of every external output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestVector {
    pub inputs: Vec<bool>,
    pub outputs: Vec<bool>,
}

impl TestVector {
    pub fn matches(&self, actual: &[Signal]) -> bool {
        self.outputs.len() == actual.len()
            && self
                .outputs
                .iter()
                .zip(actual)
                .all(|(expected, actual)| Signal::from(*expected) == *actual)
    }
}

/// A fully resolved composite definition. Everything is stored by position so
/// instantiating it never looks a name up again.
#[derive(Debug)]
pub struct CompositeDef {
    name: String,
    internals: Vec<(String, ComponentType)>,
    connections: Vec<Connection>,
    inputs: Vec<ExternalInput>,
    outputs: Vec<ExternalOutput>,
    tests: Vec<TestVector>,
}

impl CompositeDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn internals(&self) -> &[(String, ComponentType)] {
        &self.internals
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn inputs(&self) -> &[ExternalInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ExternalOutput] {
        &self.outputs
    }

    pub fn tests(&self) -> &[TestVector] {
        &self.tests
    }
}

/// A known type: something a definition can list in its `internals`.
#[derive(Clone, Debug)]
pub enum ComponentType {
    Nand { name: String, arity: usize },
    Composite(Arc<CompositeDef>),
}

impl ComponentType {
    pub fn name(&self) -> &str {
        match self {
            ComponentType::Nand { name, .. } => name,
            ComponentType::Composite(def) => def.name(),
        }
    }

    pub fn num_inputs(&self) -> usize {
        match self {
            ComponentType::Nand { arity, .. } => *arity,
            ComponentType::Composite(def) => def.inputs.len(),
        }
    }

    pub fn num_outputs(&self) -> usize {
        match self {
            ComponentType::Nand { .. } => 1,
            ComponentType::Composite(def) => def.outputs.len(),
        }
    }

    pub fn input_index(&self, pin: &str) -> Option<usize> {
        match self {
            ComponentType::Nand { arity, .. } => nand::input_index(pin, *arity),
            ComponentType::Composite(def) => def.inputs.iter().position(|i| i.name == pin),
        }
    }

    pub fn output_index(&self, pin: &str) -> Option<usize> {
        match self {
            ComponentType::Nand { .. } => (pin == nand::OUTPUT).then_some(0),
            ComponentType::Composite(def) => def.outputs.iter().position(|o| o.name == pin),
        }
    }

    pub fn input_names(&self) -> Vec<String> {
        match self {
            ComponentType::Nand { arity, .. } => (0..*arity).map(nand::input_name).collect(),
            ComponentType::Composite(def) => def.inputs.iter().map(|i| i.name.clone()).collect(),
        }
    }

    pub fn output_names(&self) -> Vec<String> {
        match self {
            ComponentType::Nand { .. } => vec![nand::OUTPUT.to_string()],
            ComponentType::Composite(def) => def.outputs.iter().map(|o| o.name.clone()).collect(),
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeDef> {
        match self {
            ComponentType::Composite(def) => Some(def),
            ComponentType::Nand { .. } => None,
        }
    }
}

// Composites are the same type only if they come from the same definition
impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                ComponentType::Nand { name, arity },
                ComponentType::Nand {
                    name: other_name,
                    arity: other_arity,
                },
            ) => name == other_name && arity == other_arity,
            (ComponentType::Composite(def), ComponentType::Composite(other)) => {
                Arc::ptr_eq(def, other)
            }
            _ => false,
        }
    }
}

impl Eq for ComponentType {}

/// Registry of known types, in registration order. Starts out with `nand`.
#[derive(Clone, Debug)]
pub struct Library {
    types: IndexMap<String, ComponentType>,
}

impl Default for Library {
    fn default() -> Self {
        let mut types = IndexMap::new();
        types.insert(
            nand::TYPE_NAME.to_string(),
            ComponentType::Nand {
                name: nand::TYPE_NAME.to_string(),
                arity: nand::ARITY,
            },
        );
        Self { types }
    }
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ComponentType> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registers a NAND gate with `arity` inputs under `name`. A one-input
    /// NAND is an inverter.
    pub fn register_nand(
        &mut self,
        name: impl Into<String>,
        arity: usize,
    ) -> Result<ComponentType, BuildError> {
        let name = name.into();
        let ty = ComponentType::Nand {
            name: name.clone(),
            arity,
        };
        self.register(name, ty)
    }

    fn register(&mut self, name: String, ty: ComponentType) -> Result<ComponentType, BuildError> {
        match self.types.entry(name) {
            Entry::Occupied(entry) => Err(BuildError::DuplicateType {
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => Ok(entry.insert(ty).clone()),
        }
    }

    /// Resolves `desc` against the types known so far and registers the
    /// result under its name. Nothing is registered if resolution fails.
    pub fn define(&mut self, desc: &ComponentDesc) -> Result<ComponentType, BuildError> {
        if self.contains(&desc.name) {
            return Err(BuildError::DuplicateType {
                name: desc.name.clone(),
            });
        }
        let def = Resolver::new(self, desc)?.resolve()?;
        debug!(
            component = %def.name,
            internals = def.internals.len(),
            connections = def.connections.len(),
            inputs = def.inputs.len(),
            outputs = def.outputs.len(),
            tests = def.tests.len(),
            "component defined"
        );
        self.register(desc.name.clone(), ComponentType::Composite(Arc::new(def)))
    }
}

/// What drives an internal input pin, for conflict reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Driver<'a> {
    Connection(&'a str),
    Input(&'a str),
}

impl Driver<'_> {
    fn describe(&self) -> String {
        match self {
            Driver::Connection(from) => format!("connection from `{from}`"),
            Driver::Input(name) => format!("external input `{name}`"),
        }
    }
}

struct Resolver<'a> {
    desc: &'a ComponentDesc,
    instances: IndexMap<&'a str, ComponentType>,
    drivers: HashMap<PinSlot, Driver<'a>>,
}

impl<'a> Resolver<'a> {
    fn new(library: &Library, desc: &'a ComponentDesc) -> Result<Self, BuildError> {
        let mut instances = IndexMap::with_capacity(desc.internals.len());
        for (instance, type_name) in desc.internals.iter() {
            if instances.contains_key(instance) {
                return Err(BuildError::DuplicateInstance {
                    component: desc.name.clone(),
                    instance: instance.to_string(),
                });
            }
            let ty = library
                .get(type_name)
                .ok_or_else(|| BuildError::UnknownType {
                    component: desc.name.clone(),
                    instance: instance.to_string(),
                    type_name: type_name.to_string(),
                })?;
            instances.insert(instance, ty.clone());
        }
        Ok(Self {
            desc,
            instances,
            drivers: HashMap::new(),
        })
    }

    fn component(&self) -> String {
        self.desc.name.clone()
    }

    fn slot(
        &self,
        site: Site,
        address: &str,
        direction: PinDirection,
    ) -> Result<PinSlot, BuildError> {
        let Address { instance, pin } =
            Address::parse(address).ok_or_else(|| BuildError::MalformedAddress {
                component: self.component(),
                site,
                address: address.to_string(),
            })?;
        let unresolved = |missing| BuildError::UnresolvedAddress {
            component: self.component(),
            site,
            address: address.to_string(),
            direction,
            missing,
        };
        let (index, _, ty) = self
            .instances
            .get_full(instance)
            .ok_or_else(|| unresolved(Missing::Instance))?;
        let pin = match direction {
            PinDirection::Input => ty.input_index(pin),
            PinDirection::Output => ty.output_index(pin),
        }
        .ok_or_else(|| unresolved(Missing::Pin))?;
        Ok(PinSlot {
            instance: index,
            pin,
        })
    }

    /// Records `driver` as the single source of the input at `slot`. Claiming
    /// the same input twice with the same driver is harmless.
    fn claim(
        &mut self,
        slot: PinSlot,
        address: &str,
        driver: Driver<'a>,
    ) -> Result<(), BuildError> {
        match self.drivers.get(&slot) {
            Some(existing) if *existing == driver => Ok(()),
            Some(existing) => Err(BuildError::ConflictingInput {
                component: self.component(),
                address: address.to_string(),
                first: existing.describe(),
                second: driver.describe(),
            }),
            None => {
                self.drivers.insert(slot, driver);
                Ok(())
            }
        }
    }

    fn resolve(mut self) -> Result<CompositeDef, BuildError> {
        let desc = self.desc;

        let mut connections = Vec::with_capacity(desc.connections.len());
        for (i, conn) in desc.connections.iter().enumerate() {
            let from = self.slot(Site::Connection(i), &conn.from, PinDirection::Output)?;
            let to = self.slot(Site::Connection(i), &conn.to, PinDirection::Input)?;
            self.claim(to, &conn.to, Driver::Connection(&conn.from))?;
            let connection = Connection { from, to };
            if !connections.contains(&connection) {
                connections.push(connection);
            }
        }

        // A repeated external input name fans that one pin out to every target
        let mut inputs: IndexMap<&str, Vec<PinSlot>> = IndexMap::new();
        for (i, input) in desc.inputs.iter().enumerate() {
            let to = self.slot(Site::Input(i), &input.to, PinDirection::Input)?;
            self.claim(to, &input.to, Driver::Input(&input.name))?;
            let targets = inputs.entry(input.name.as_str()).or_default();
            if !targets.contains(&to) {
                targets.push(to);
            }
        }

        let mut outputs: Vec<ExternalOutput> = Vec::with_capacity(desc.outputs.len());
        for (i, output) in desc.outputs.iter().enumerate() {
            if outputs.iter().any(|o| o.name == output.name) {
                return Err(BuildError::DuplicatePin {
                    component: self.component(),
                    direction: PinDirection::Output,
                    pin: output.name.clone(),
                });
            }
            let source = self.slot(Site::Output(i), &output.from, PinDirection::Output)?;
            outputs.push(ExternalOutput {
                name: output.name.clone(),
                source,
            });
        }

        let tests = self.test_vectors(inputs.len(), outputs.len())?;

        Ok(CompositeDef {
            name: desc.name.clone(),
            internals: self
                .instances
                .into_iter()
                .map(|(name, ty)| (name.to_string(), ty))
                .collect(),
            connections,
            inputs: inputs
                .into_iter()
                .map(|(name, targets)| ExternalInput {
                    name: name.to_string(),
                    targets,
                })
                .collect(),
            outputs,
            tests,
        })
    }

    fn test_vectors(
        &self,
        num_inputs: usize,
        num_outputs: usize,
    ) -> Result<Vec<TestVector>, BuildError> {
        let expected = num_inputs + num_outputs;
        self.desc
            .test
            .iter()
            .enumerate()
            .map(|(row, values)| {
                if values.len() != expected {
                    return Err(BuildError::TestVectorShape {
                        component: self.component(),
                        row,
                        found: values.len(),
                        expected,
                    });
                }
                let bits = values
                    .iter()
                    .enumerate()
                    .map(|(column, value)| match *value {
                        0 => Ok(false),
                        1 => Ok(true),
                        _ => Err(BuildError::TestVectorValue {
                            component: self.component(),
                            row,
                            column,
                            value: *value,
                        }),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let (inputs, outputs) = bits.split_at(num_inputs);
                Ok(TestVector {
                    inputs: inputs.to_vec(),
                    outputs: outputs.to_vec(),
                })
            })
            .collect()
    }
}
