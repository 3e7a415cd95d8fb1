//! Named collections of component definitions and their self checks.

use tracing::{debug, info};

use crate::{
    circuit_builder::{ComponentType, Library, TestVector},
    circuit_sim::{SimConfig, Ticks},
    description::{ProjectDesc, SR_LATCH_SAMPLE},
    error::{BuildError, LoadError, SimError},
    pin::Signal,
    Circuit,
};

#[derive(Clone, Debug)]
pub struct Project {
    name: String,
    library: Library,
    defined: Vec<String>,
}

impl Project {
    /// Builds every component of `desc` in declaration order. Fails on the
    /// first bad definition; no partial project is returned.
    pub fn build(desc: &ProjectDesc) -> Result<Self, BuildError> {
        Self::build_with(Library::new(), desc)
    }

    /// Like [`Project::build`], starting from an existing set of known types.
    pub fn build_with(mut library: Library, desc: &ProjectDesc) -> Result<Self, BuildError> {
        let mut defined = Vec::with_capacity(desc.components.len());
        for component in &desc.components {
            library.define(component)?;
            defined.push(component.name.clone());
        }
        Ok(Project {
            name: desc.name.clone(),
            library,
            defined,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, LoadError> {
        let desc = ProjectDesc::from_yaml(text)?;
        let project = Self::build(&desc)?;
        info!(
            project = %project.name,
            components = project.defined.len(),
            "project loaded"
        );
        Ok(project)
    }

    /// The SR latch project.
    pub fn sample() -> Result<Self, LoadError> {
        Self::from_yaml(SR_LATCH_SAMPLE)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    /// Components defined by this project, in declaration order.
    pub fn components(&self) -> impl Iterator<Item = &ComponentType> {
        self.defined.iter().filter_map(|name| self.library.get(name))
    }

    /// Any known type, built-in ones included.
    pub fn component(&self, name: &str) -> Option<&ComponentType> {
        self.library.get(name)
    }

    pub fn instantiate(&self, name: &str) -> Result<Circuit, SimError> {
        self.component(name)
            .map(Circuit::new)
            .ok_or_else(|| SimError::UnknownComponent {
                name: name.to_string(),
            })
    }

    /// Runs the test vectors of every defined component that has any.
    pub fn run_tests(&self, config: &SimConfig) -> Result<Vec<TestReport>, SimError> {
        self.components()
            .filter(|ty| ty.as_composite().is_some_and(|def| !def.tests().is_empty()))
            .map(|ty| self.run_component_tests(ty.name(), config))
            .collect()
    }

    /// Applies a component's test rows in order to a single instance, so state
    /// held by feedback loops carries from one row to the next.
    pub fn run_component_tests(
        &self,
        name: &str,
        config: &SimConfig,
    ) -> Result<TestReport, SimError> {
        let ty = self
            .component(name)
            .ok_or_else(|| SimError::UnknownComponent {
                name: name.to_string(),
            })?;
        let vectors = ty.as_composite().map(|def| def.tests()).unwrap_or_default();
        let mut circuit = Circuit::new(ty);
        let mut rows = Vec::with_capacity(vectors.len());
        for (row, vector) in vectors.iter().enumerate() {
            let before = circuit.tick();
            let actual = circuit.apply_vector(vector, config)?;
            let result = RowResult {
                row,
                vector: vector.clone(),
                actual,
                ticks: circuit.tick() - before,
            };
            if !result.passed() {
                debug!(component = name, row, "test row failed");
            }
            rows.push(result);
        }
        let report = TestReport {
            component: name.to_string(),
            rows,
        };
        info!(
            component = name,
            rows = report.rows.len(),
            failed = report.failures().count(),
            "test vectors run"
        );
        Ok(report)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowResult {
    pub row: usize,
    pub vector: TestVector,
    pub actual: Vec<Signal>,
    /// Evaluations it took to settle this row.
    pub ticks: Ticks,
}

impl RowResult {
    pub fn passed(&self) -> bool {
        self.vector.matches(&self.actual)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestReport {
    pub component: String,
    pub rows: Vec<RowResult>,
}

impl TestReport {
    pub fn passed(&self) -> bool {
        self.rows.iter().all(RowResult::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RowResult> {
        self.rows.iter().filter(|row| !row.passed())
    }
}
