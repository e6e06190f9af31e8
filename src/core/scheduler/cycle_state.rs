//! State shared between the extension points of one scheduling cycle.
//!
//! A fresh `CycleState` is created for every attempt to schedule a pod and is passed by
//! reference to each plugin call of that attempt. Plugins write their data once during
//! PreFilter and read it back in later phases. The whole state can be cloned, which gives
//! every filter worker its own copy with no shared backing storage.

use std::collections::HashMap;
use std::fmt::Debug;

use downcast_rs::{impl_downcast, DowncastSync};
use dyn_clone::DynClone;
use thiserror::Error;

pub trait StateData: DowncastSync + DynClone + Debug {}

impl_downcast!(sync StateData);
dyn_clone::clone_trait_object!(StateData);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CycleStateError {
    #[error("reading {0:?} from cycle state: not found")]
    NotFound(String),
    #[error("reading {0:?} from cycle state: unexpected state data type")]
    TypeMismatch(String),
}

#[derive(Default, Debug, Clone)]
pub struct CycleState {
    storage: HashMap<String, Box<dyn StateData>>,
}

impl CycleState {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn write(&mut self, key: &str, data: Box<dyn StateData>) {
        self.storage.insert(key.to_string(), data);
    }

    pub fn read<T: StateData>(&self, key: &str) -> Result<&T, CycleStateError> {
        let data = self
            .storage
            .get(key)
            .ok_or_else(|| CycleStateError::NotFound(key.to_string()))?;
        data.downcast_ref::<T>()
            .ok_or_else(|| CycleStateError::TypeMismatch(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.storage.contains_key(key)
    }
}
