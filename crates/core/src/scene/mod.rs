use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Value a property has before anything animated it.
pub fn default_value(property: &str) -> f32 {
    match property {
        "scale" | "opacity" => 1.0,
        _ => 0.0,
    }
}

/// Registry of animatable subjects. The engine only reads start values and
/// writes interpolated ones; rendering lives elsewhere.
pub trait TargetRegistry {
    fn read(&self, target: &str, property: &str) -> Option<f32>;
    fn write(&mut self, target: &str, property: &str, value: f32);
}

/// Concrete value routed to a subject's property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyUpdate {
    pub target: String,
    pub property: String,
    pub value: f32,
}

/// Initial state of one subject, as found in scene configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectDefinition {
    pub name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, f32>,
}

impl SubjectDefinition {
    pub fn new<'a>(name: &str, properties: impl IntoIterator<Item = (&'a str, f32)>) -> Self {
        Self {
            name: name.to_string(),
            properties: properties
                .into_iter()
                .map(|(property, value)| (property.to_string(), value))
                .collect(),
        }
    }
}

/// The subjects of the landscape: sun, clouds, birds, tree, mountains and
/// the text panel.
pub fn landscape_subjects() -> Vec<SubjectDefinition> {
    let mut subjects = vec![
        SubjectDefinition::new("sun", [("rotation", 0.0), ("scale", 1.0)]),
        SubjectDefinition::new("cloud1", [("x_vw", 0.0)]),
        SubjectDefinition::new("cloud2", [("x_vw", 0.0)]),
    ];
    for bird in ["bird1", "bird2", "bird3"] {
        subjects.push(SubjectDefinition::new(
            bird,
            [("x_vw", 0.0), ("y", 0.0), ("opacity", 0.0)],
        ));
    }
    subjects.push(SubjectDefinition::new("tree", [("rotation", 0.0)]));
    for mountain in ["mountain1", "mountain2", "mountain3"] {
        subjects.push(SubjectDefinition::new(mountain, [("x", 0.0)]));
    }
    subjects.push(SubjectDefinition::new(
        "text_panel",
        [("y", 0.0), ("opacity", 1.0)],
    ));
    subjects
}

/// In-memory registry holding the current property values of every subject.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneInstance {
    subjects: BTreeMap<String, BTreeMap<String, f32>>,
}

impl SceneInstance {
    pub fn new(subjects: &[SubjectDefinition]) -> Self {
        let mut scene = Self::default();
        for subject in subjects {
            scene
                .subjects
                .insert(subject.name.clone(), subject.properties.clone());
        }
        scene
    }

    pub fn insert_subject<'a>(
        &mut self,
        name: &str,
        properties: impl IntoIterator<Item = (&'a str, f32)>,
    ) {
        let subject = SubjectDefinition::new(name, properties);
        self.subjects.insert(subject.name, subject.properties);
    }

    pub fn subject(&self, name: &str) -> Option<&BTreeMap<String, f32>> {
        self.subjects.get(name)
    }

    pub fn subject_names(&self) -> impl Iterator<Item = &str> {
        self.subjects.keys().map(String::as_str)
    }

    pub fn apply_updates(&mut self, updates: &[PropertyUpdate]) {
        for update in updates {
            self.write(&update.target, &update.property, update.value);
        }
    }
}

impl TargetRegistry for SceneInstance {
    fn read(&self, target: &str, property: &str) -> Option<f32> {
        self.subjects.get(target)?.get(property).copied()
    }

    fn write(&mut self, target: &str, property: &str, value: f32) {
        self.subjects
            .entry(target.to_string())
            .or_default()
            .insert(property.to_string(), value);
    }
}
