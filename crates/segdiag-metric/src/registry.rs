//! Immutable class id → (name, colour) table shared by every component.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{MetricError, MetricResult};

/// One entry of a [`ClassRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    /// Class id, equal to the entry's position in the registry.
    pub id: usize,
    /// Human-readable class name.
    pub name: String,
    /// Display colour as an RGB triple.
    pub color: [u8; 3],
}

impl ClassInfo {
    pub fn new(id: usize, name: impl Into<String>, color: [u8; 3]) -> Self {
        Self {
            id,
            name: name.into(),
            color,
        }
    }
}

/// Fixed-size, ordered table of classes.
///
/// Ids are dense (`0..len`) and names are unique. The registry has no mutators;
/// share it between components behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ClassInfo>", into = "Vec<ClassInfo>")]
pub struct ClassRegistry {
    classes: Vec<ClassInfo>,
}

impl ClassRegistry {
    /// Builds a registry, validating that ids are `0..N` in order and names are unique.
    pub fn new(classes: Vec<ClassInfo>) -> MetricResult<Self> {
        if classes.is_empty() {
            return Err(MetricError::InvalidRegistry {
                reason: "registry must contain at least one class".to_string(),
            });
        }

        let mut names = HashSet::with_capacity(classes.len());
        for (position, class) in classes.iter().enumerate() {
            if class.id != position {
                return Err(MetricError::InvalidRegistry {
                    reason: format!(
                        "class '{}' has id {} but is at position {position}",
                        class.name, class.id
                    ),
                });
            }
            if class.name.trim().is_empty() {
                return Err(MetricError::InvalidRegistry {
                    reason: format!("class {position} has an empty name"),
                });
            }
            if !names.insert(class.name.as_str()) {
                return Err(MetricError::InvalidRegistry {
                    reason: format!("duplicate class name '{}'", class.name),
                });
            }
        }

        Ok(Self { classes })
    }

    /// The 11-class offroad terrain taxonomy.
    pub fn offroad_terrain() -> Self {
        let table: [(&str, [u8; 3]); 11] = [
            ("Background", [0, 0, 0]),
            ("Trees", [0, 200, 0]),
            ("Lush Bushes", [0, 255, 0]),
            ("Dry Grass", [139, 69, 19]),
            ("Dry Bushes", [210, 105, 30]),
            ("Ground Clutter", [128, 128, 128]),
            ("Flowers", [255, 0, 255]),
            ("Logs", [165, 42, 42]),
            ("Rocks", [192, 192, 192]),
            ("Landscape", [139, 69, 19]),
            ("Sky", [135, 206, 235]),
        ];

        Self {
            classes: table
                .into_iter()
                .enumerate()
                .map(|(id, (name, color))| ClassInfo::new(id, name, color))
                .collect(),
        }
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&ClassInfo> {
        self.classes.get(id)
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.get(id).map(|class| class.name.as_str())
    }

    pub fn color(&self, id: usize) -> Option<[u8; 3]> {
        self.get(id).map(|class| class.color)
    }

    /// Looks a class up by exact name.
    pub fn id_of(&self, name: &str) -> Option<usize> {
        self.classes
            .iter()
            .find(|class| class.name == name)
            .map(|class| class.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.iter()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::offroad_terrain()
    }
}

impl TryFrom<Vec<ClassInfo>> for ClassRegistry {
    type Error = MetricError;

    fn try_from(classes: Vec<ClassInfo>) -> MetricResult<Self> {
        Self::new(classes)
    }
}

impl From<ClassRegistry> for Vec<ClassInfo> {
    fn from(registry: ClassRegistry) -> Self {
        registry.classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offroad_terrain_has_eleven_classes() {
        let registry = ClassRegistry::offroad_terrain();
        assert_eq!(registry.len(), 11);
        assert_eq!(registry.name(6), Some("Flowers"));
        assert_eq!(registry.name(7), Some("Logs"));
        assert_eq!(registry.color(10), Some([135, 206, 235]));
        assert_eq!(registry.id_of("Sky"), Some(10));
        assert_eq!(registry.id_of("Snow"), None);
        assert!(registry.get(11).is_none());
    }

    #[test]
    fn new_rejects_non_dense_ids() {
        let result = ClassRegistry::new(vec![
            ClassInfo::new(0, "a", [0, 0, 0]),
            ClassInfo::new(2, "b", [1, 1, 1]),
        ]);
        assert!(matches!(result, Err(MetricError::InvalidRegistry { .. })));
    }

    #[test]
    fn new_rejects_duplicate_names() {
        let result = ClassRegistry::new(vec![
            ClassInfo::new(0, "road", [0, 0, 0]),
            ClassInfo::new(1, "road", [1, 1, 1]),
        ]);
        assert!(matches!(result, Err(MetricError::InvalidRegistry { .. })));
    }

    #[test]
    fn new_rejects_empty_table() {
        assert!(ClassRegistry::new(Vec::new()).is_err());
    }

    #[test]
    fn deserialization_validates_table() {
        let ok: ClassRegistry = serde_json::from_str(
            r#"[{"id":0,"name":"bg","color":[0,0,0]},{"id":1,"name":"fg","color":[255,255,255]}]"#,
        )
        .unwrap();
        assert_eq!(ok.len(), 2);

        let bad = serde_json::from_str::<ClassRegistry>(
            r#"[{"id":1,"name":"bg","color":[0,0,0]}]"#,
        );
        assert!(bad.is_err());
    }
}
