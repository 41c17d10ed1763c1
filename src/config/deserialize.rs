// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Routes raw YAML strings through the validated newtypes.

use serde::Deserialize;

use crate::types::SlotName;

pub fn deserialize_slot_name<'de, D>(deserializer: D) -> Result<SlotName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    SlotName::new(&s).map_err(serde::de::Error::custom)
}
