use std::{io, path::StripPrefixError, sync::mpsc::SendError};

use notify::{Error as NotifyError, ErrorKind as NotifyErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

use crate::event::Event;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum CanopyError {
    #[error("Custom error: {0}")]
    Custom(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Watch service error: {0}")]
    Watch(String),
}

impl From<StripPrefixError> for CanopyError {
    fn from(src: StripPrefixError) -> CanopyError {
        CanopyError::NotFound(format!("Strip prefix failed for path. Error: {src}"))
    }
}

impl From<toml::de::Error> for CanopyError {
    fn from(src: toml::de::Error) -> CanopyError {
        CanopyError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for CanopyError {
    fn from(src: toml::ser::Error) -> CanopyError {
        CanopyError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for CanopyError {
    fn from(src: JsonError) -> CanopyError {
        CanopyError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<serde_yaml::Error> for CanopyError {
    fn from(src: serde_yaml::Error) -> CanopyError {
        CanopyError::Serialization(format!("YAML (de)serialization error: {src}"))
    }
}

impl From<io::Error> for CanopyError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => CanopyError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => CanopyError::PermissionDenied,
            _ => CanopyError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<SendError<Event>> for CanopyError {
    fn from(x: SendError<Event>) -> Self {
        CanopyError::Io(format!(
            "Channel update send Error, could not transmit state update event {:?}",
            x.0
        ))
    }
}

impl From<NotifyError> for CanopyError {
    fn from(notify_error: NotifyError) -> Self {
        match notify_error.kind {
            NotifyErrorKind::Generic(msg) => CanopyError::Watch(format!(
                "notify-debouncer: {}, paths: {:?}",
                msg, notify_error.paths
            )),
            NotifyErrorKind::Io(io_error) => CanopyError::Watch(format!(
                "notify-debouncer: io error {}, paths: {:?}",
                io_error.kind(),
                notify_error.paths
            )),
            NotifyErrorKind::PathNotFound => CanopyError::NotFound(format!(
                "notify-debouncer: path(s) not found: {:?}",
                notify_error.paths
            )),
            NotifyErrorKind::WatchNotFound => CanopyError::NotFound(format!(
                "notify-debouncer: watch not found, paths: {:?}",
                notify_error.paths
            )),
            NotifyErrorKind::InvalidConfig(_) => {
                CanopyError::Watch("notify-debouncer invalid config".to_string())
            }
            NotifyErrorKind::MaxFilesWatch => {
                CanopyError::Watch("notify-debouncer max file watch limit reached".to_string())
            }
        }
    }
}
