use std::collections::HashMap;

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{domain::AccessState, error::ProtocolError};

// The backend writes `None` as `null` and is loose about number types. A bad
// optional field degrades to its default instead of costing the whole event.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

fn lenient_numbers<'de, D, T>(deserializer: D) -> Result<HashMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Object(entries) = Value::deserialize(deserializer)? else {
        return Ok(HashMap::new());
    };
    Ok(entries
        .into_iter()
        .filter_map(|(class, value)| T::deserialize(value).ok().map(|number| (class, number)))
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    #[serde(default, deserialize_with = "lenient")]
    pub detected_classes: Vec<String>,
    #[serde(default, alias = "confidence_scores", deserialize_with = "lenient_numbers")]
    pub confidence_by_class: HashMap<String, f32>,
    #[serde(
        default,
        deserialize_with = "lenient_numbers",
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub detection_counts: HashMap<String, u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub face_detected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityEvent {
    #[serde(default, deserialize_with = "lenient")]
    pub matched: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessStatusEvent {
    pub state: AccessState,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub person_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub message: Option<String>,
    #[serde(
        default,
        alias = "duration",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_seconds: Option<f32>,
}

impl AccessStatusEvent {
    pub fn new(state: AccessState) -> Self {
        Self {
            state,
            person_name: None,
            message: None,
            duration_seconds: None,
        }
    }

    pub fn with_person(mut self, name: impl Into<String>) -> Self {
        self.person_name = Some(name.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_duration_seconds(mut self, seconds: f32) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEvent {
    #[serde(default, deserialize_with = "lenient")]
    pub required_classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    DetectionUpdate(DetectionEvent),
    FaceIdentified(IdentityEvent),
    AccessStatusChange(AccessStatusEvent),
    ConfigUpdate(ConfigEvent),
    DetectionStarted {
        #[serde(default, deserialize_with = "lenient")]
        success: bool,
    },
    DetectionStopped {
        #[serde(default, deserialize_with = "lenient")]
        success: bool,
    },
    Connected {
        #[serde(default, deserialize_with = "lenient")]
        message: Option<String>,
    },
    FaceRecognitionConfigUpdate {
        #[serde(default, deserialize_with = "lenient")]
        enabled: bool,
    },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DetectionUpdate(_) => "detection_update",
            Self::FaceIdentified(_) => "face_identified",
            Self::AccessStatusChange(_) => "access_status_change",
            Self::ConfigUpdate(_) => "config_update",
            Self::DetectionStarted { .. } => "detection_started",
            Self::DetectionStopped { .. } => "detection_stopped",
            Self::Connected { .. } => "connected",
            Self::FaceRecognitionConfigUpdate { .. } => "face_recognition_config_update",
        }
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut value: serde_json::Value = serde_json::from_str(text)?;
        let Some(object) = value.as_object_mut() else {
            return Err(ProtocolError::NotAnObject);
        };
        let event_type = match object.get("type") {
            Some(serde_json::Value::String(name)) => name.clone(),
            _ => return Err(ProtocolError::MissingType),
        };
        if !KNOWN_SERVER_EVENTS.contains(&event_type.as_str()) {
            return Err(ProtocolError::UnknownEvent(event_type));
        }
        match object.get("payload") {
            None | Some(serde_json::Value::Null) => {
                object.insert(
                    "payload".to_string(),
                    serde_json::Value::Object(serde_json::Map::new()),
                );
            }
            Some(_) => {}
        }
        serde_json::from_value(value).map_err(|source| ProtocolError::InvalidPayload {
            event: event_type,
            source,
        })
    }
}

const KNOWN_SERVER_EVENTS: [&str; 8] = [
    "detection_update",
    "face_identified",
    "access_status_change",
    "config_update",
    "detection_started",
    "detection_stopped",
    "connected",
    "face_recognition_config_update",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    StartDetection,
    StopDetection,
    RequestConfig,
}

impl ClientRequest {
    pub fn name(self) -> &'static str {
        match self {
            Self::StartDetection => "start_detection",
            Self::StopDetection => "stop_detection",
            Self::RequestConfig => "request_config",
        }
    }
}
