use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::{
    circuit_builder::{ComponentType, PinSlot, TestVector},
    circuit_sim::{RunResult, Scheduler, SimConfig, Tick, Ticks},
    components::{nand, Component, ComponentKind, CompositeState},
    error::SimError,
    pin::{ComponentId, InputPin, InputRef, OutputPin, OutputRef, PinDirection, Signal},
};

/// One instantiated top-level component together with its pending set.
///
/// Every sub-component, however deeply nested, lives in a single arena and is
/// referred to by [`ComponentId`]. The top-level component is always the
/// first entry.
#[derive(Debug)]
pub struct Circuit {
    components: Vec<Component>,
    scheduler: Scheduler,
}

impl Circuit {
    pub fn new(ty: &ComponentType) -> Self {
        let mut circuit = Circuit {
            components: Vec::new(),
            scheduler: Scheduler::new(),
        };
        circuit.instantiate(ty, ty.name());
        // Nothing has been evaluated yet, so schedule everything once
        for index in 0..circuit.components.len() {
            circuit.scheduler.enqueue(ComponentId(index as u32));
        }
        circuit
    }

    fn add_component(&mut self, component: Component) -> ComponentId {
        let id = ComponentId(self.components.len() as u32);
        self.components.push(component);
        id
    }

    fn instantiate(&mut self, ty: &ComponentType, name: &str) -> ComponentId {
        let def = match ty {
            ComponentType::Nand { arity, .. } => return self.add_component(nand::new(name, *arity)),
            ComponentType::Composite(def) => def,
        };

        let inputs = def.inputs().iter().map(|i| InputPin::new(&i.name)).collect();
        let outputs = def.outputs().iter().map(|o| OutputPin::new(&o.name)).collect();
        let id = self.add_component(Component::new(
            name,
            inputs,
            outputs,
            ComponentKind::Composite(CompositeState::default()),
        ));

        let children: Vec<ComponentId> = def
            .internals()
            .iter()
            .map(|(child_name, child_ty)| self.instantiate(child_ty, child_name))
            .collect();
        let input_ref = |slot: &PinSlot| InputRef {
            component: children[slot.instance],
            pin: slot.pin,
        };
        let output_ref = |slot: &PinSlot| OutputRef {
            component: children[slot.instance],
            pin: slot.pin,
        };

        for connection in def.connections() {
            let target = input_ref(&connection.to);
            self.output_pin_mut(output_ref(&connection.from)).connect(target);
        }
        let input_targets: Vec<Vec<InputRef>> = def
            .inputs()
            .iter()
            .map(|input| input.targets.iter().map(input_ref).collect::<Vec<_>>())
            .collect();
        let output_sources: Vec<OutputRef> =
            def.outputs().iter().map(|o| output_ref(&o.source)).collect();
        for source in &output_sources {
            self.output_pin_mut(*source).observe(id);
        }

        let children = def
            .internals()
            .iter()
            .map(|(child_name, _)| child_name.clone())
            .zip(children.iter().copied())
            .collect::<IndexMap<_, _>>();
        self.components[id.index()].kind = ComponentKind::Composite(CompositeState::new(
            def.name(),
            children,
            input_targets,
            output_sources,
        ));
        id
    }

    fn output_pin_mut(&mut self, pin: OutputRef) -> &mut OutputPin {
        &mut self.components[pin.component.index()].outputs[pin.pin]
    }

    fn input_pin_mut(&mut self, pin: InputRef) -> &mut InputPin {
        &mut self.components[pin.component.index()].inputs[pin.pin]
    }

    pub fn root(&self) -> ComponentId {
        ComponentId(0)
    }

    pub fn root_component(&self) -> &Component {
        &self.components[0]
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(id.index())
    }

    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    /// Number of component evaluations performed so far.
    pub fn tick(&self) -> Tick {
        self.scheduler.tick()
    }

    pub fn input_value(&self, pin: InputRef) -> bool {
        self.components[pin.component.index()].inputs[pin.pin].value()
    }

    pub fn output_value(&self, pin: OutputRef) -> Signal {
        self.components[pin.component.index()].outputs[pin.pin].value()
    }

    /// Forces an input pin to `val` and schedules its owner, bypassing any
    /// wiring. Meant for the primary inputs of the circuit under test.
    pub fn force_input(&mut self, pin: InputRef, val: bool) {
        self.input_pin_mut(pin).set_raw(val);
        self.scheduler.enqueue(pin.component);
    }

    /// Declares a new value for an output pin. Writing the value a pin already
    /// holds does nothing; otherwise every consumer whose value changes is
    /// scheduled, as is every composite mirroring this pin.
    pub fn propagate_output(&mut self, pin: OutputRef, val: bool) {
        let output = self.output_pin_mut(pin);
        if output.value() == Signal::from(val) {
            return;
        }
        output.set_raw(val);
        let consumers = output.consumers().to_vec();
        let observers = output.observers().to_vec();
        for target in consumers {
            self.deliver(target, val);
        }
        for observer in observers {
            self.scheduler.enqueue(observer);
        }
    }

    fn deliver(&mut self, target: InputRef, val: bool) {
        let input = self.input_pin_mut(target);
        if input.value() != val {
            input.set_raw(val);
            self.scheduler.enqueue(target.component);
        }
    }

    pub fn is_settled(&self) -> bool {
        self.scheduler.is_settled()
    }

    pub fn dequeue_next(&mut self) -> Option<ComponentId> {
        self.scheduler.dequeue_next()
    }

    pub fn reevaluate(&mut self, id: ComponentId) {
        let component = &self.components[id.index()];
        match &component.kind {
            ComponentKind::Nand => {
                let val = nand::evaluate(&component.inputs);
                self.propagate_output(OutputRef { component: id, pin: 0 }, val);
            }
            ComponentKind::Composite(state) => {
                let evaluation = state.evaluate(&component.inputs, &self.components);
                for (target, val) in evaluation.forwards {
                    self.deliver(target, val);
                }
                for (pin, val) in evaluation.mirrors {
                    self.propagate_output(OutputRef { component: id, pin }, val);
                }
            }
        }
    }

    /// Evaluates one pending component. Returns false if nothing was pending.
    pub fn update(&mut self) -> bool {
        match self.dequeue_next() {
            Some(id) => {
                let component = &self.components[id.index()].name;
                trace!(tick = self.tick(), component = %component, "evaluate");
                self.reevaluate(id);
                true
            }
            None => false,
        }
    }

    pub fn run(&mut self, max_ticks: Ticks) -> RunResult {
        for ticks in 0..max_ticks {
            if !self.update() {
                return RunResult::Finished { after_ticks: ticks };
            }
        }
        if self.is_settled() {
            RunResult::Finished {
                after_ticks: max_ticks,
            }
        } else {
            RunResult::ReachedMaxTicks { max_ticks }
        }
    }

    /// Runs without an iteration cap; never returns for an oscillating circuit.
    pub fn run_until_done(&mut self) {
        while self.update() {}
    }

    /// Runs to a fixed point, giving up after `config.max_ticks` evaluations.
    pub fn settle(&mut self, config: &SimConfig) -> Result<Ticks, SimError> {
        match self.run(config.max_ticks) {
            RunResult::Finished { after_ticks } => Ok(after_ticks),
            RunResult::ReachedMaxTicks { max_ticks } => {
                debug!(
                    component = %self.root_component().name,
                    max_ticks,
                    pending = self.scheduler.pending(),
                    "circuit did not settle"
                );
                Err(SimError::DidNotConverge { max_ticks })
            }
        }
    }

    fn unknown_pin(&self, direction: PinDirection, pin: &str) -> SimError {
        SimError::UnknownPin {
            component: self.root_component().name.clone(),
            direction,
            pin: pin.to_string(),
        }
    }

    /// External input of the top-level component.
    pub fn input_ref(&self, name: &str) -> Result<InputRef, SimError> {
        let pin = self
            .root_component()
            .input_index(name)
            .ok_or_else(|| self.unknown_pin(PinDirection::Input, name))?;
        Ok(InputRef {
            component: self.root(),
            pin,
        })
    }

    /// External output of the top-level component.
    pub fn output_ref(&self, name: &str) -> Result<OutputRef, SimError> {
        let pin = self
            .root_component()
            .output_index(name)
            .ok_or_else(|| self.unknown_pin(PinDirection::Output, name))?;
        Ok(OutputRef {
            component: self.root(),
            pin,
        })
    }

    pub fn set_input(&mut self, name: &str, val: bool) -> Result<(), SimError> {
        let pin = self.input_ref(name)?;
        self.force_input(pin, val);
        Ok(())
    }

    pub fn get_output(&self, name: &str) -> Result<Signal, SimError> {
        Ok(self.output_value(self.output_ref(name)?))
    }

    pub fn outputs(&self) -> Vec<Signal> {
        self.root_component()
            .outputs
            .iter()
            .map(|pin| pin.value())
            .collect()
    }

    /// Follows a dotted path of instance names down from the top-level
    /// component. The empty path is the top-level component itself.
    pub fn find(&self, path: &str) -> Option<ComponentId> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(self.root(), |id, segment| {
                self.components[id.index()].as_composite()?.child(segment)
            })
    }

    /// Value of any output pin in the hierarchy, e.g. `latch.nand_left.out`.
    pub fn probe(&self, path: &str) -> Option<Signal> {
        let (instance, pin) = path.rsplit_once('.').unwrap_or(("", path));
        let component = &self.components[self.find(instance)?.index()];
        let pin = component.output_index(pin)?;
        Some(component.outputs[pin].value())
    }

    /// Drives the external inputs with `vector.inputs`, settles and returns the
    /// external outputs.
    pub fn apply_vector(
        &mut self,
        vector: &TestVector,
        config: &SimConfig,
    ) -> Result<Vec<Signal>, SimError> {
        self.apply_inputs(&vector.inputs, config)
    }

    pub fn apply_inputs(
        &mut self,
        values: &[bool],
        config: &SimConfig,
    ) -> Result<Vec<Signal>, SimError> {
        let expected = self.root_component().inputs.len();
        if values.len() != expected {
            return Err(SimError::VectorShape {
                component: self.root_component().name.clone(),
                expected,
                found: values.len(),
            });
        }
        for (pin, val) in values.iter().enumerate() {
            self.force_input(
                InputRef {
                    component: self.root(),
                    pin,
                },
                *val,
            );
        }
        self.settle(config)?;
        Ok(self.outputs())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        circuit_builder::Library,
        description::{
            ComponentDesc, ConnectionDesc, InputDesc, OutputDesc, ProjectDesc, SR_LATCH_SAMPLE,
        },
    };

    fn latch() -> Circuit {
        let desc = ProjectDesc::from_yaml(SR_LATCH_SAMPLE).unwrap();
        let ty = Library::new().define(&desc.components[0]).unwrap();
        Circuit::new(&ty)
    }

    fn bits(values: &[u8]) -> Vec<bool> {
        values.iter().map(|v| *v != 0).collect()
    }

    #[test]
    fn bare_nand_truth_table() {
        let library = Library::new();
        let mut circuit = Circuit::new(library.get("nand").unwrap());
        assert_eq!(circuit.num_components(), 1);
        let config = SimConfig::default();
        let expecteds = [(false, false), (false, true), (true, false), (true, true)]
            .into_iter()
            .zip([Signal::One, Signal::One, Signal::One, Signal::Zero]);
        for ((a, b), expected) in expecteds {
            let outputs = circuit.apply_inputs(&[a, b], &config).unwrap();
            assert_eq!(outputs, [expected], "{a} nand {b}");
        }
    }

    #[test]
    fn latch_holds_state() {
        let mut circuit = latch();
        assert_eq!(circuit.num_components(), 3);
        assert_eq!(circuit.get_output("out"), Ok(Signal::Unknown));

        let config = SimConfig::default();
        let rows = [[0, 1], [1, 1], [1, 1], [0, 1], [1, 0], [1, 1]];
        let expected_out = [1, 1, 1, 1, 0, 0];
        for (row, expected) in rows.iter().zip(expected_out) {
            let outputs = circuit.apply_inputs(&bits(row), &config).unwrap();
            assert_eq!(outputs[0], Signal::from(expected == 1), "row {row:?}");
            assert!(circuit.is_settled());
        }
        assert_eq!(circuit.get_output("nout"), Ok(Signal::One));
    }

    #[test]
    fn driver_loop_by_hand() {
        let mut circuit = latch();
        circuit.set_input("s", false).unwrap();
        circuit.set_input("c", true).unwrap();
        let mut steps = 0;
        while let Some(id) = circuit.dequeue_next() {
            circuit.reevaluate(id);
            steps += 1;
        }
        assert!(circuit.is_settled());
        assert_eq!(circuit.tick(), steps);
        assert_eq!(circuit.get_output("out"), Ok(Signal::One));
        assert_eq!(circuit.get_output("nout"), Ok(Signal::Zero));
    }

    #[test]
    fn propagate_output_is_noop_when_unchanged() {
        let mut circuit = latch();
        circuit.run_until_done();
        let left = circuit.find("nand_left").unwrap();
        let out = OutputRef {
            component: left,
            pin: 0,
        };
        let current = circuit.output_value(out).to_bool().unwrap();
        circuit.propagate_output(out, current);
        assert!(circuit.is_settled());

        circuit.propagate_output(out, !current);
        assert!(!circuit.is_settled());
    }

    #[test]
    fn force_input_schedules_owner_even_without_change() {
        let mut circuit = latch();
        circuit.run_until_done();
        let pin = circuit.input_ref("s").unwrap();
        let val = circuit.input_value(pin);
        circuit.force_input(pin, val);
        assert_eq!(circuit.dequeue_next(), Some(circuit.root()));
        assert!(circuit.is_settled());
    }

    #[test]
    fn probe_internal_pins() {
        let mut circuit = latch();
        circuit.apply_inputs(&[true, false], &SimConfig::default()).unwrap();
        assert_eq!(circuit.probe("nand_left.out"), Some(Signal::Zero));
        assert_eq!(circuit.probe("nand_right.out"), Some(Signal::One));
        assert_eq!(circuit.probe("out"), Some(Signal::Zero));
        assert_eq!(circuit.probe("nand_left.in0"), None);
        assert_eq!(circuit.probe("missing.out"), None);
        assert_eq!(circuit.find(""), Some(circuit.root()));
    }

    #[test]
    fn unknown_pins_and_bad_vectors() {
        let mut circuit = latch();
        assert!(matches!(
            circuit.set_input("q", true),
            Err(SimError::UnknownPin {
                direction: PinDirection::Input,
                ..
            })
        ));
        assert!(matches!(
            circuit.get_output("s"),
            Err(SimError::UnknownPin {
                direction: PinDirection::Output,
                ..
            })
        ));
        assert_eq!(
            circuit.apply_inputs(&[true], &SimConfig::default()),
            Err(SimError::VectorShape {
                component: "sr_latch".to_string(),
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn ring_oscillator_hits_cap() {
        let mut library = Library::new();
        library.register_nand("not", 1).unwrap();
        let ring = ComponentDesc {
            name: "ring".to_string(),
            internals: [("a", "not"), ("b", "not"), ("c", "not")]
                .into_iter()
                .collect(),
            connections: vec![
                ConnectionDesc {
                    from: "a.out".to_string(),
                    to: "b.in0".to_string(),
                },
                ConnectionDesc {
                    from: "b.out".to_string(),
                    to: "c.in0".to_string(),
                },
                ConnectionDesc {
                    from: "c.out".to_string(),
                    to: "a.in0".to_string(),
                },
            ],
            outputs: vec![OutputDesc {
                name: "q".to_string(),
                from: "a.out".to_string(),
            }],
            ..Default::default()
        };
        let ty = library.define(&ring).unwrap();
        let mut circuit = Circuit::new(&ty);
        let config = SimConfig { max_ticks: 500 };
        assert_eq!(
            circuit.settle(&config),
            Err(SimError::DidNotConverge { max_ticks: 500 })
        );
        assert_eq!(circuit.tick(), 500);
        let result = circuit.run(10);
        assert!(!result.is_finished());
        assert_eq!(result, RunResult::ReachedMaxTicks { max_ticks: 10 });
    }

    #[test]
    fn composite_inside_composite() {
        let desc = ProjectDesc::from_yaml(SR_LATCH_SAMPLE).unwrap();
        let mut library = Library::new();
        library.define(&desc.components[0]).unwrap();
        let wrapper = ComponentDesc {
            name: "wrapper".to_string(),
            internals: [("latch", "sr_latch"), ("inv", "nand")]
                .into_iter()
                .collect(),
            connections: vec![ConnectionDesc {
                from: "latch.out".to_string(),
                to: "inv.in0".to_string(),
            }],
            inputs: vec![
                InputDesc {
                    name: "s".to_string(),
                    to: "latch.s".to_string(),
                },
                InputDesc {
                    name: "c".to_string(),
                    to: "latch.c".to_string(),
                },
                InputDesc {
                    name: "en".to_string(),
                    to: "inv.in1".to_string(),
                },
            ],
            outputs: vec![
                OutputDesc {
                    name: "q".to_string(),
                    from: "latch.out".to_string(),
                },
                OutputDesc {
                    name: "nq".to_string(),
                    from: "inv.out".to_string(),
                },
            ],
            ..Default::default()
        };
        let ty = library.define(&wrapper).unwrap();
        let mut circuit = Circuit::new(&ty);
        assert_eq!(circuit.num_components(), 5);

        let latch_id = circuit.find("latch").unwrap();
        let latch = circuit.component(latch_id).unwrap().as_composite().unwrap();
        assert_eq!(latch.type_name(), "sr_latch");
        assert_eq!(
            latch.children().keys().collect::<Vec<_>>(),
            ["nand_left", "nand_right"]
        );
        let left = latch.child("nand_left").unwrap();
        assert_eq!(
            latch.input_targets()[0],
            [InputRef {
                component: left,
                pin: 0
            }]
        );
        assert_eq!(
            latch.output_sources()[0],
            OutputRef {
                component: left,
                pin: 0
            }
        );
        let root = circuit.root_component().as_composite().unwrap();
        assert_eq!(root.type_name(), "wrapper");
        assert_eq!(root.input_targets().len(), 3);

        let config = SimConfig::default();
        let outputs = circuit.apply_inputs(&[true, false, true], &config).unwrap();
        assert_eq!(outputs, [Signal::Zero, Signal::One]);
        let outputs = circuit.apply_inputs(&[false, true, true], &config).unwrap();
        assert_eq!(outputs, [Signal::One, Signal::Zero]);
        // Disabling the inverter's second input forces its output high
        let outputs = circuit.apply_inputs(&[true, true, false], &config).unwrap();
        assert_eq!(outputs, [Signal::One, Signal::One]);
        assert_eq!(circuit.probe("latch.nand_left.out"), Some(Signal::One));
    }
}
