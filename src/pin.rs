use std::fmt;

/// Arena handle of an instantiated component inside a [`Circuit`](crate::Circuit).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) u32);

impl ComponentId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Value held by an output pin. Outputs start out [`Signal::Unknown`] until
/// their component is evaluated for the first time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Signal {
    #[default]
    Unknown,
    Zero,
    One,
}

impl Signal {
    pub fn to_bool(self) -> Option<bool> {
        match self {
            Signal::Unknown => None,
            Signal::Zero => Some(false),
            Signal::One => Some(true),
        }
    }

    pub fn is_set(self) -> bool {
        self != Signal::Unknown
    }

    pub fn to_char(self) -> char {
        match self {
            Signal::Unknown => 'X',
            Signal::Zero => '0',
            Signal::One => '1',
        }
    }
}

impl From<bool> for Signal {
    fn from(val: bool) -> Self {
        if val {
            Signal::One
        } else {
            Signal::Zero
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PinDirection {
    Input,
    Output,
}

impl fmt::Display for PinDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinDirection::Input => write!(f, "input"),
            PinDirection::Output => write!(f, "output"),
        }
    }
}

/// Address of an input pin: owning component plus position in its input list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct InputRef {
    pub component: ComponentId,
    pub pin: usize,
}

/// Address of an output pin: owning component plus position in its output list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct OutputRef {
    pub component: ComponentId,
    pub pin: usize,
}

#[derive(Clone, Debug)]
pub struct InputPin {
    name: String,
    value: bool,
}

impl InputPin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> bool {
        self.value
    }

    pub fn set_raw(&mut self, val: bool) {
        self.value = val;
    }
}

#[derive(Clone, Debug)]
pub struct OutputPin {
    name: String,
    value: Signal,
    consumers: Vec<InputRef>,
    // Composites mirroring this pin onto one of their external outputs
    observers: Vec<ComponentId>,
}

impl OutputPin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Signal::Unknown,
            consumers: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Signal {
        self.value
    }

    pub fn is_set(&self) -> bool {
        self.value.is_set()
    }

    pub fn set_raw(&mut self, val: bool) {
        self.value = val.into();
    }

    pub fn consumers(&self) -> &[InputRef] {
        &self.consumers
    }

    pub fn observers(&self) -> &[ComponentId] {
        &self.observers
    }

    /// Adds `input` to the fan-out of this pin. Returns false if it was
    /// already connected.
    pub fn connect(&mut self, input: InputRef) -> bool {
        if self.consumers.contains(&input) {
            return false;
        }
        self.consumers.push(input);
        true
    }

    pub(crate) fn observe(&mut self, composite: ComponentId) {
        if !self.observers.contains(&composite) {
            self.observers.push(composite);
        }
    }
}
