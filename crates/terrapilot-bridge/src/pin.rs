//! Scoped pointer pinning
//!
//! A [`PinScope`] owns every pointer pinned during one bridge call and unpins
//! each of them exactly once when dropped, on every exit path.

use tracing::warn;

use crate::error::BridgeResult;
use crate::module::ModuleHandle;

pub struct PinScope<'a> {
    module: &'a mut dyn ModuleHandle,
    pinned: Vec<u32>,
}

impl<'a> PinScope<'a> {
    pub fn new(module: &'a mut dyn ModuleHandle) -> Self {
        Self {
            module,
            pinned: Vec::new(),
        }
    }

    /// Pin `ptr` against the module's collector until the scope ends.
    pub fn pin(&mut self, ptr: u32) -> BridgeResult<u32> {
        self.module.call("__pin", &[ptr as i32])?;
        self.pinned.push(ptr);
        Ok(ptr)
    }

    pub fn module(&mut self) -> &mut dyn ModuleHandle {
        &mut *self.module
    }

    pub fn pinned(&self) -> &[u32] {
        &self.pinned
    }
}

impl Drop for PinScope<'_> {
    fn drop(&mut self) {
        while let Some(ptr) = self.pinned.pop() {
            if let Err(e) = self.module.call("__unpin", &[ptr as i32]) {
                warn!(ptr, error = %e, "Failed to unpin module pointer");
            }
        }
    }
}
