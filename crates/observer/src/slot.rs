// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Single-observer registration.

use crate::{Observer, ObserverError, ObserverOptions};
use std::fmt;

/// Token identifying a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct ObserverId(u32);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Holds at most one registered [`Observer`].
///
/// Owned by the engine adapter; the engine reaches the observer through
/// [`ObserverSlot::active_mut`] on every node event.
#[derive(Debug, Default)]
pub struct ObserverSlot {
    active: Option<(ObserverId, Observer)>,
    next_id: u32,
}

impl ObserverSlot {
    /// Builds and binds an observer, then opens its first window.
    ///
    /// Fails with [`ObserverError::AlreadyBound`] while another observer
    /// is registered; that registration is left untouched.
    pub fn register(
        &mut self,
        options: ObserverOptions,
        n_nodes: usize,
    ) -> Result<ObserverId, ObserverError> {
        if let Some((current, _)) = &self.active {
            return Err(ObserverError::AlreadyBound { current: *current });
        }
        let mut observer = options.build(n_nodes)?;
        observer.start();

        let id = ObserverId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        tracing::debug!(%id, n_nodes, "observer registered");
        self.active = Some((id, observer));
        Ok(id)
    }

    /// Unbinds the observer registered as `id` and hands it back.
    pub fn unregister(&mut self, id: ObserverId) -> Result<Observer, ObserverError> {
        match self.active.take() {
            Some((current, observer)) if current == id => {
                tracing::debug!(%id, "observer unregistered");
                Ok(observer)
            }
            other => {
                self.active = other;
                Err(ObserverError::NotRegistered { id })
            }
        }
    }

    pub fn is_bound(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_id(&self) -> Option<ObserverId> {
        self.active.as_ref().map(|(id, _)| *id)
    }

    pub fn active(&self) -> Option<&Observer> {
        self.active.as_ref().map(|(_, o)| o)
    }

    pub fn active_mut(&mut self) -> Option<&mut Observer> {
        self.active.as_mut().map(|(_, o)| o)
    }
}
