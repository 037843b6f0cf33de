// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Interrupt masking around timed regions.

/// Saved interrupt state returned by [`IrqControl::disable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqState(pub u32);

/// Platform interrupt control.
pub trait IrqControl: Send {
    /// Masks interrupts and returns the previous state.
    fn disable(&mut self) -> IrqState;

    /// Restores a state returned by [`disable`](Self::disable).
    fn restore(&mut self, state: IrqState);
}

/// Leaves interrupts alone. Used on hosts and when a communication stack
/// needs servicing during inference.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIrq;

impl IrqControl for NoIrq {
    fn disable(&mut self) -> IrqState {
        IrqState(0)
    }

    fn restore(&mut self, _state: IrqState) {}
}

/// Masks interrupts for its lifetime.
pub struct IrqGuard<'a> {
    irq: &'a mut dyn IrqControl,
    saved: IrqState,
}

impl<'a> IrqGuard<'a> {
    pub fn new(irq: &'a mut dyn IrqControl) -> Self {
        let saved = irq.disable();
        tracing::trace!(state = saved.0, "interrupts masked");
        Self { irq, saved }
    }
}

impl Drop for IrqGuard<'_> {
    fn drop(&mut self) {
        self.irq.restore(self.saved);
        tracing::trace!(state = self.saved.0, "interrupts restored");
    }
}
