//! Declarative project description.
//!
//! These are the plain data types a structured-data parser produces; the
//! builder in [`circuit_builder`](crate::circuit_builder) consumes them.
//!
//! ```yaml
//! name: <project name>
//! components:
//!   - name: <component name>
//!     internals:
//!       <instanceName>: <typeName>
//!     connections:
//!       - from: <instance>.<pin>
//!         to: <instance>.<pin>
//!     inputs:
//!       - name: <externalName>
//!         to: <instance>.<pin>
//!     outputs:
//!       - name: <externalName>
//!         from: <instance>.<pin>
//!     test:
//!       - [<in0>, <in1>, ..., <out0>, ...]
//! ```

use std::fmt;

use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};

/// The set/reset latch every loader ships with.
pub const SR_LATCH_SAMPLE: &str = r#"
name: builtin-sample
components:
  - name: sr_latch
    internals:
      nand_left: nand
      nand_right: nand
    connections:
      - from: nand_left.out
        to: nand_right.in0
      - from: nand_right.out
        to: nand_left.in1
    inputs:
      - name: s
        to: nand_left.in0
      - name: c
        to: nand_right.in1
    outputs:
      - name: out
        from: nand_left.out
      - name: nout
        from: nand_right.out
    test:
      - [0, 1, 1, 0]
      - [1, 1, 1, 0]
      - [1, 1, 1, 0]
      - [0, 1, 1, 0]
      - [1, 0, 0, 1]
      - [1, 1, 0, 1]
"#;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDesc {
    pub name: String,
    #[serde(default)]
    pub components: Vec<ComponentDesc>,
}

impl ProjectDesc {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDesc {
    pub name: String,
    #[serde(default)]
    pub internals: Internals,
    #[serde(default)]
    pub connections: Vec<ConnectionDesc>,
    #[serde(default)]
    pub inputs: Vec<InputDesc>,
    #[serde(default)]
    pub outputs: Vec<OutputDesc>,
    #[serde(default)]
    pub test: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDesc {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDesc {
    pub name: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDesc {
    pub name: String,
    pub from: String,
}

/// `instance name -> type name` pairs in declaration order.
///
/// Unlike a map this keeps repeated instance names, so the builder can report
/// them instead of one silently replacing the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Internals(pub Vec<(String, String)>);

impl Internals {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(instance, type_name)| (instance.as_str(), type_name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<I, T> FromIterator<(I, T)> for Internals
where
    I: Into<String>,
    T: Into<String>,
{
    fn from_iter<It: IntoIterator<Item = (I, T)>>(iter: It) -> Self {
        Internals(
            iter.into_iter()
                .map(|(instance, type_name)| (instance.into(), type_name.into()))
                .collect(),
        )
    }
}

impl Serialize for Internals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (instance, type_name) in &self.0 {
            map.serialize_entry(instance, type_name)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Internals {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct InternalsVisitor;

        impl<'de> Visitor<'de> for InternalsVisitor {
            type Value = Internals;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of instance names to type names")
            }

            fn visit_unit<E>(self) -> Result<Internals, E> {
                Ok(Internals::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Internals, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry::<String, String>()? {
                    entries.push(entry);
                }
                Ok(Internals(entries))
            }
        }

        deserializer.deserialize_map(InternalsVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_sample() {
        let desc = ProjectDesc::from_yaml(SR_LATCH_SAMPLE).unwrap();
        assert_eq!(desc.name, "builtin-sample");
        assert_eq!(desc.components.len(), 1);
        let latch = &desc.components[0];
        assert_eq!(latch.name, "sr_latch");
        let internals: Vec<_> = latch.internals.iter().collect();
        assert_eq!(
            internals,
            [("nand_left", "nand"), ("nand_right", "nand")]
        );
        assert_eq!(latch.connections[1].from, "nand_right.out");
        assert_eq!(latch.inputs[1].name, "c");
        assert_eq!(latch.outputs[0].from, "nand_left.out");
        assert_eq!(latch.test[4], vec![1, 0, 0, 1]);
    }

    #[test]
    fn optional_sections_default_to_empty() {
        let desc: ComponentDesc = serde_yaml::from_str("name: bare").unwrap();
        assert!(desc.internals.is_empty());
        assert!(desc.connections.is_empty());
        assert!(desc.inputs.is_empty());
        assert!(desc.test.is_empty());
    }

    #[test]
    fn round_trips_through_yaml() {
        let desc = ProjectDesc::from_yaml(SR_LATCH_SAMPLE).unwrap();
        let text = serde_yaml::to_string(&desc).unwrap();
        assert_eq!(ProjectDesc::from_yaml(&text).unwrap(), desc);
    }
}
