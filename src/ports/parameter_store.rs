//! Abstract persistent parameter store (§4.3). The NVS-backed implementation
//! lives in `kv_store`; tests and the `simulate` feature drive an in-memory
//! double instead.

use crate::control::pid::PidParams;

#[derive(Debug)]
pub struct NotFound;

pub trait ParameterStore {
    fn load(&self) -> Result<PidParams, NotFound>;

    /// Must commit all four fields as a single logical transaction: a
    /// partial save must never be observable on the next `load`.
    fn save(&mut self, params: PidParams) -> Result<(), NotFound>;
}

/// In-memory double used under `simulate` and in unit tests. A real NVS
/// write is itself atomic at the namespace level (`kv_store::KeyValueStore`);
/// this mirrors that by always replacing the whole value.
#[derive(Default)]
pub struct InMemoryParameterStore {
    value: Option<PidParams>,
}

impl ParameterStore for InMemoryParameterStore {
    fn load(&self) -> Result<PidParams, NotFound> {
        self.value.ok_or(NotFound)
    }

    fn save(&mut self, params: PidParams) -> Result<(), NotFound> {
        self.value = Some(params);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_bit_exact() {
        let mut store = InMemoryParameterStore::default();
        let params = PidParams {
            kp: 1.528,
            ki: 0.764,
            kd: 0.191,
            tuned: true,
        };
        store.save(params).unwrap();
        assert_eq!(store.load().unwrap(), params);
    }

    #[test]
    fn not_found_before_first_save() {
        let store = InMemoryParameterStore::default();
        assert!(store.load().is_err());
    }
}
