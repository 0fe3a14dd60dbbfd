use super::{Component, Cpe, License, Project, ServiceComponent, VulnerableSoftware};
use crate::search::IndexType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Any entity that can be indexed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IndexedEntity {
    Project(Project),
    Component(Component),
    #[serde(rename = "servicecomponent")]
    ServiceComponent(ServiceComponent),
    License(License),
    Cpe(Cpe),
    #[serde(rename = "vulnerablesoftware")]
    VulnerableSoftware(VulnerableSoftware),
}

impl IndexedEntity {
    /// Index this entity belongs to
    pub fn index_type(&self) -> IndexType {
        match self {
            IndexedEntity::Project(_) => IndexType::Project,
            IndexedEntity::Component(_) => IndexType::Component,
            IndexedEntity::ServiceComponent(_) => IndexType::ServiceComponent,
            IndexedEntity::License(_) => IndexType::License,
            IndexedEntity::Cpe(_) => IndexType::Cpe,
            IndexedEntity::VulnerableSoftware(_) => IndexType::VulnerableSoftware,
        }
    }

    pub fn uuid(&self) -> Uuid {
        match self {
            IndexedEntity::Project(e) => e.uuid,
            IndexedEntity::Component(e) => e.uuid,
            IndexedEntity::ServiceComponent(e) => e.uuid,
            IndexedEntity::License(e) => e.uuid,
            IndexedEntity::Cpe(e) => e.uuid,
            IndexedEntity::VulnerableSoftware(e) => e.uuid,
        }
    }

    pub fn as_vulnerable_software(&self) -> Option<&VulnerableSoftware> {
        match self {
            IndexedEntity::VulnerableSoftware(vs) => Some(vs),
            _ => None,
        }
    }

    pub fn into_vulnerable_software(self) -> Option<VulnerableSoftware> {
        match self {
            IndexedEntity::VulnerableSoftware(vs) => Some(vs),
            _ => None,
        }
    }
}

impl From<Project> for IndexedEntity {
    fn from(e: Project) -> Self {
        IndexedEntity::Project(e)
    }
}

impl From<Component> for IndexedEntity {
    fn from(e: Component) -> Self {
        IndexedEntity::Component(e)
    }
}

impl From<ServiceComponent> for IndexedEntity {
    fn from(e: ServiceComponent) -> Self {
        IndexedEntity::ServiceComponent(e)
    }
}

impl From<License> for IndexedEntity {
    fn from(e: License) -> Self {
        IndexedEntity::License(e)
    }
}

impl From<Cpe> for IndexedEntity {
    fn from(e: Cpe) -> Self {
        IndexedEntity::Cpe(e)
    }
}

impl From<VulnerableSoftware> for IndexedEntity {
    fn from(e: VulnerableSoftware) -> Self {
        IndexedEntity::VulnerableSoftware(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_and_uuid() {
        let component = Component::new("crypto-library");
        let uuid = component.uuid;
        let entity: IndexedEntity = component.into();

        assert_eq!(entity.index_type(), IndexType::Component);
        assert_eq!(entity.uuid(), uuid);
        assert!(entity.as_vulnerable_software().is_none());
    }

    #[test]
    fn test_tagged_json() {
        let json = r#"{"type":"license","uuid":"6b0c1e0c-3df8-4a8e-9c1f-7a4b0a3e2d11","license_id":"MIT","name":"MIT License"}"#;
        let entity: IndexedEntity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.index_type(), IndexType::License);
    }
}
