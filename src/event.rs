//! # Lifecycle Events
//!
//! Custom resource lifecycle events and the response contract.

use crate::error::ValidationError;
use crate::properties::ResourceProperties;
use serde::Serialize;
use serde_json::{Map, Value};

/// A decoded lifecycle event
///
/// Create and Update carry fully validated properties; Update and Delete
/// carry the PhysicalResourceId issued on Create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Create {
        properties: ResourceProperties,
    },
    Update {
        physical_resource_id: String,
        properties: ResourceProperties,
    },
    Delete {
        physical_resource_id: String,
    },
}

impl LifecycleEvent {
    /// Decode an untyped event, validating everything the request type needs
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for a non-object event, an unknown
    /// `RequestType`, a missing PhysicalResourceId, or invalid properties.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let object = value.as_object().ok_or(ValidationError::EventNotObject)?;

        let request_type = match object.get("RequestType") {
            None => return Err(ValidationError::MissingField("RequestType")),
            Some(Value::String(s)) => s.as_str(),
            Some(_) => {
                return Err(ValidationError::WrongType {
                    field: "RequestType",
                    expected: "a string",
                })
            }
        };

        match request_type {
            "Create" => Ok(LifecycleEvent::Create {
                properties: properties(object)?,
            }),
            "Update" => Ok(LifecycleEvent::Update {
                physical_resource_id: physical_resource_id(object)?,
                properties: properties(object)?,
            }),
            "Delete" => Ok(LifecycleEvent::Delete {
                physical_resource_id: physical_resource_id(object)?,
            }),
            other => Err(ValidationError::UnknownRequestType(other.to_string())),
        }
    }

    #[must_use]
    pub fn request_type(&self) -> &'static str {
        match self {
            LifecycleEvent::Create { .. } => "Create",
            LifecycleEvent::Update { .. } => "Update",
            LifecycleEvent::Delete { .. } => "Delete",
        }
    }
}

fn properties(object: &Map<String, Value>) -> Result<ResourceProperties, ValidationError> {
    let value = object
        .get("ResourceProperties")
        .ok_or(ValidationError::MissingField("ResourceProperties"))?;
    ResourceProperties::from_value(value)
}

fn physical_resource_id(object: &Map<String, Value>) -> Result<String, ValidationError> {
    match object.get("PhysicalResourceId") {
        None => Err(ValidationError::MissingField("PhysicalResourceId")),
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(_) => Err(ValidationError::WrongType {
            field: "PhysicalResourceId",
            expected: "a non-empty string",
        }),
    }
}

/// Response returned to the provisioning framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Response {
    pub physical_resource_id: String,
    /// Always empty for this provider
    pub data: Map<String, Value>,
}

impl Response {
    #[must_use]
    pub fn new(physical_resource_id: impl Into<String>) -> Self {
        Self {
            physical_resource_id: physical_resource_id.into(),
            data: Map::new(),
        }
    }
}
