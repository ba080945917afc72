use minijinja::Value;

use crate::error::RegistryError;
use crate::registry::{FunctionDescriptor, Registry};

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register(
        "uuid",
        FunctionDescriptor::plain("Generates a random (v4) UUID.", Value::from_function(uuid))
            .with_example("{{ %s() }}"),
    )
}

/// Usage: {{ uuid() }}
pub fn uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}
