use std::ops::BitAnd;

use num_traits::{CheckedShl, Unsigned};

use crate::{
    error::SimError,
    pin::{InputRef, OutputRef},
    Circuit,
};

/// Top-level input pins `{prefix}0..{prefix}{BITS - 1}`, least significant
/// bit first.
#[derive(Clone, Copy, Debug)]
pub struct InputBus<const BITS: usize>([InputRef; BITS]);

/// Top-level output pins `{prefix}0..{prefix}{BITS - 1}`, least significant
/// bit first.
#[derive(Clone, Copy, Debug)]
pub struct OutputBus<const BITS: usize>([OutputRef; BITS]);

impl<const BITS: usize> InputBus<BITS> {
    pub fn numbered(circuit: &Circuit, prefix: &str) -> Result<Self, SimError> {
        let mut pins = [InputRef::default(); BITS];
        for (bit, pin) in pins.iter_mut().enumerate() {
            *pin = circuit.input_ref(&format!("{prefix}{bit}"))?;
        }
        Ok(InputBus(pins))
    }

    /// Bits past the width of `T` are driven low.
    pub fn set<T>(&self, circuit: &mut Circuit, val: T)
    where
        T: Unsigned + Copy + BitAnd<T, Output = T> + CheckedShl,
    {
        for (bit, pin) in self.0.iter().cloned().enumerate() {
            let bit_val = T::one()
                .checked_shl(bit as u32)
                .is_some_and(|mask| !(val & mask).is_zero());
            circuit.force_input(pin, bit_val);
        }
    }
}

impl<const BITS: usize> OutputBus<BITS> {
    pub fn numbered(circuit: &Circuit, prefix: &str) -> Result<Self, SimError> {
        let mut pins = [OutputRef::default(); BITS];
        for (bit, pin) in pins.iter_mut().enumerate() {
            *pin = circuit.output_ref(&format!("{prefix}{bit}"))?;
        }
        Ok(OutputBus(pins))
    }

    /// `None` while any of the pins is still unknown, or if a high bit does
    /// not fit in `T`.
    pub fn read<T>(&self, circuit: &Circuit) -> Option<T>
    where
        T: Unsigned + CheckedShl,
    {
        let mut sum = T::zero();
        for (bit, pin) in self.0.iter().cloned().enumerate() {
            if circuit.output_value(pin).to_bool()? {
                sum = sum + T::one().checked_shl(bit as u32)?;
            }
        }
        Some(sum)
    }
}
