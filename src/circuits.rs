//! Shared in-memory circuit list.
//!
//! The only shared mutable state in the crate. A circuit's `image` is
//! written at most once: the first resolved value wins and later writers
//! get that value back, so concurrent selections converge.

use std::sync::RwLock;

use crate::models::CircuitRecord;

#[derive(Debug, Default)]
pub struct CircuitRegistry {
    circuits: RwLock<Vec<CircuitRecord>>,
}

impl CircuitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.circuits.read().map(|c| c.is_empty()).unwrap_or(true)
    }

    /// Replace the list, keeping images already resolved for circuits that
    /// are still present.
    pub fn replace(&self, mut fresh: Vec<CircuitRecord>) {
        let Ok(mut circuits) = self.circuits.write() else {
            return;
        };
        for circuit in fresh.iter_mut() {
            if circuit.image.is_none() {
                circuit.image = circuits
                    .iter()
                    .find(|c| c.id == circuit.id)
                    .and_then(|c| c.image.clone());
            }
        }
        *circuits = fresh;
    }

    pub fn list(&self) -> Vec<CircuitRecord> {
        self.circuits.read().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn get(&self, id: &str) -> Option<CircuitRecord> {
        self.circuits
            .read()
            .ok()?
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub fn cached_image(&self, id: &str) -> Option<String> {
        self.get(id).and_then(|c| c.image)
    }

    /// Store `image` unless the circuit already has one. Returns the image
    /// the circuit ends up with.
    pub fn fill_image(&self, id: &str, image: String) -> String {
        let Ok(mut circuits) = self.circuits.write() else {
            return image;
        };
        match circuits.iter_mut().find(|c| c.id == id) {
            Some(circuit) => circuit.image.get_or_insert(image).clone(),
            None => image,
        }
    }
}
