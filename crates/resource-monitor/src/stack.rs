// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Stack high-water mark by painting.
//!
//! The region is filled with [`STACK_PAINT`] before the run. The stack
//! grows downwards from the end of the region, so after the run the first
//! byte (from the bottom) that no longer holds the pattern marks the
//! deepest point reached.

use crate::MonitorError;
use std::sync::{Arc, Mutex};

/// Fill byte written over the monitored region.
pub const STACK_PAINT: u8 = 0xA5;

/// Begin/end/read service for stack usage.
pub trait StackMonitor: Send {
    /// Paint the region; usage is measured from this point.
    fn mark(&mut self) -> Result<(), MonitorError>;

    /// Scan the region for the deepest overwritten byte.
    fn evaluate(&mut self) -> Result<StackUsage, MonitorError>;
}

/// Stack readings for one monitored window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StackUsage {
    /// Size of the monitored region.
    pub size: usize,
    /// Deepest extent reached, in bytes from the top.
    pub used: usize,
}

impl StackUsage {
    pub fn summary(&self) -> String {
        format!("{} bytes (of {})", self.used, self.size)
    }
}

/// A shared stack-like memory region.
///
/// Cloning yields another handle to the same bytes, so an engine can
/// write into the region while a [`PaintedStack`] inspects it.
#[derive(Debug, Clone)]
pub struct StackRegion {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl StackRegion {
    pub fn new(size: usize) -> Result<Self, MonitorError> {
        if size == 0 {
            return Err(MonitorError::EmptyRegion { size });
        }
        Ok(Self {
            bytes: Arc::new(Mutex::new(vec![0; size])),
        })
    }

    pub fn size(&self) -> usize {
        self.bytes.lock().map(|b| b.len()).unwrap_or(0)
    }

    /// Simulates a call chain reaching `depth` bytes below the top.
    pub fn touch(&self, depth: usize) -> Result<(), MonitorError> {
        let mut bytes = self.bytes.lock().map_err(|_| MonitorError::Poisoned)?;
        let size = bytes.len();
        if depth > size {
            return Err(MonitorError::Overflow { depth, size });
        }
        bytes[size - depth..].fill(0);
        Ok(())
    }

    fn paint(&self) -> Result<(), MonitorError> {
        let mut bytes = self.bytes.lock().map_err(|_| MonitorError::Poisoned)?;
        bytes.fill(STACK_PAINT);
        Ok(())
    }

    fn scan(&self) -> Result<StackUsage, MonitorError> {
        let bytes = self.bytes.lock().map_err(|_| MonitorError::Poisoned)?;
        let size = bytes.len();
        let untouched = bytes.iter().take_while(|&&b| b == STACK_PAINT).count();
        Ok(StackUsage {
            size,
            used: size - untouched,
        })
    }
}

/// [`StackMonitor`] over a painted [`StackRegion`].
#[derive(Debug)]
pub struct PaintedStack {
    region: StackRegion,
    marked: bool,
}

impl PaintedStack {
    pub fn new(region: StackRegion) -> Self {
        Self {
            region,
            marked: false,
        }
    }
}

impl StackMonitor for PaintedStack {
    fn mark(&mut self) -> Result<(), MonitorError> {
        self.region.paint()?;
        self.marked = true;
        Ok(())
    }

    fn evaluate(&mut self) -> Result<StackUsage, MonitorError> {
        if !self.marked {
            tracing::warn!("stack evaluated before mark; reporting the whole region as used");
        }
        self.region.scan()
    }
}
