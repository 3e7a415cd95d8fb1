use indexmap::IndexMap;

use crate::pin::{ComponentId, InputPin, InputRef, OutputRef};

use super::Component;

/// Internal wiring of an instantiated composite.
///
/// External input `i` forwards into every pin of `input_targets[i]`; external
/// output `j` mirrors `output_sources[j]`.
#[derive(Debug, Clone, Default)]
pub struct CompositeState {
    type_name: String,
    children: IndexMap<String, ComponentId>,
    input_targets: Vec<Vec<InputRef>>,
    output_sources: Vec<OutputRef>,
}

/// Pin writes requested by one composite evaluation.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Evaluation {
    pub forwards: Vec<(InputRef, bool)>,
    pub mirrors: Vec<(usize, bool)>,
}

impl CompositeState {
    pub fn new(
        type_name: impl Into<String>,
        children: IndexMap<String, ComponentId>,
        input_targets: Vec<Vec<InputRef>>,
        output_sources: Vec<OutputRef>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            children,
            input_targets,
            output_sources,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn children(&self) -> &IndexMap<String, ComponentId> {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<ComponentId> {
        self.children.get(name).copied()
    }

    pub fn input_targets(&self) -> &[Vec<InputRef>] {
        &self.input_targets
    }

    pub fn output_sources(&self) -> &[OutputRef] {
        &self.output_sources
    }

    /// Forwards the external inputs inward and reads the mapped internal
    /// outputs. Inner outputs that were never driven are not mirrored.
    pub(crate) fn evaluate(&self, inputs: &[InputPin], arena: &[Component]) -> Evaluation {
        let forwards = self
            .input_targets
            .iter()
            .zip(inputs)
            .flat_map(|(targets, input)| targets.iter().map(|target| (*target, input.value())))
            .collect();
        let mirrors = self
            .output_sources
            .iter()
            .enumerate()
            .filter_map(|(pin, source)| {
                arena[source.component.index()].outputs[source.pin]
                    .value()
                    .to_bool()
                    .map(|val| (pin, val))
            })
            .collect();
        Evaluation { forwards, mirrors }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::components::nand;

    #[test]
    fn evaluation_skips_unknown_outputs() {
        let mut gate = nand::new("g", 2);
        let composite_inputs = vec![InputPin::new("a"), {
            let mut b = InputPin::new("b");
            b.set_raw(true);
            b
        }];
        let target = |pin| InputRef {
            component: ComponentId(1),
            pin,
        };
        let state = CompositeState::new(
            "wrap",
            IndexMap::from([("g".to_string(), ComponentId(1))]),
            vec![vec![target(0)], vec![target(1)]],
            vec![OutputRef {
                component: ComponentId(1),
                pin: 0,
            }],
        );

        let shell = nand::new("unused", 0);
        let arena = vec![shell.clone(), gate.clone()];
        let evaluation = state.evaluate(&composite_inputs, &arena);
        assert_eq!(evaluation.forwards, vec![(target(0), false), (target(1), true)]);
        assert!(evaluation.mirrors.is_empty());

        gate.outputs[0].set_raw(true);
        let arena = vec![shell, gate];
        let evaluation = state.evaluate(&composite_inputs, &arena);
        assert_eq!(evaluation.mirrors, vec![(0, true)]);
    }
}
