use thiserror::Error;

use k8_apiserver_storage::AttributeExtractionError;
use k8_apiserver_storage::StorageError;
use k8_apiserver_types::FieldErrorList;
use k8_apiserver_types::GroupResource;
use k8_apiserver_types::GroupVersionKind;
use k8_apiserver_types::Status;
use k8_apiserver_types::StatusCause;
use k8_apiserver_types::StatusDetails;
use k8_apiserver_types::StatusReason;

/// misconfiguration detected while building schemes and registries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("resource {version} {resource} already registered")]
    AlreadyRegistered { version: String, resource: String },
    #[error("{gvk} is already registered to {existing}, cannot register {requested}")]
    DuplicateKind {
        gvk: GroupVersionKind,
        existing: &'static str,
        requested: &'static str,
    },
    #[error("storage version for {resource} is already {existing}, cannot also use {requested}")]
    MultipleStorageVersions {
        resource: GroupResource,
        existing: GroupVersionKind,
        requested: GroupVersionKind,
    },
    #[error("no GroupVersionKind found for {0}, type must be registered with the scheme")]
    NotRegistered(&'static str),
    #[error("no external GroupVersionKind found for {0}")]
    NoExternalVersion(&'static str),
    #[error("no kind {0} is registered")]
    UnknownKind(GroupVersionKind),
}

/// failure to bind a store to its backend, fatal at build time
#[derive(Error, Debug)]
pub enum StoreInitError {
    #[error("registration: {0}")]
    Registration(#[from] RegistrationError),
    #[error("backend for {resource}: {source}")]
    Backend {
        resource: GroupResource,
        #[source]
        source: StorageError,
    },
    #[error("invalid store options: {0}")]
    InvalidOptions(String),
}

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("installing {version} {resource}: {source}")]
    Provider {
        version: String,
        resource: String,
        #[source]
        source: StoreInitError,
    },
}

/// request time failure of a store operation
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} \"{name}\" is invalid: {errors}")]
    Invalid {
        kind: String,
        name: String,
        errors: FieldErrorList,
    },
    #[error("{resource} \"{name}\" not found")]
    NotFound { resource: GroupResource, name: String },
    #[error("{resource} \"{name}\" already exists")]
    AlreadyExists { resource: GroupResource, name: String },
    #[error("operation cannot be fulfilled on {resource} \"{name}\": {message}")]
    Conflict {
        resource: GroupResource,
        name: String,
        message: String,
    },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("{verb} is not supported on {resource}")]
    MethodNotSupported {
        resource: GroupResource,
        verb: &'static str,
    },
    #[error("request cancelled")]
    Cancelled,
    #[error("internal error: {0}")]
    Internal(String),
    #[error("attribute extraction: {0}")]
    Attribute(#[from] AttributeExtractionError),
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
    #[error("serialization: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// field errors of a rejected create or update
    pub fn field_errors(&self) -> Option<&FieldErrorList> {
        match self {
            Self::Invalid { errors, .. } => Some(errors),
            _ => None,
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::Invalid { .. } => 422,
            Self::NotFound { .. } => 404,
            Self::AlreadyExists { .. } | Self::Conflict { .. } => 409,
            Self::BadRequest(_) => 400,
            Self::MethodNotSupported { .. } => 405,
            Self::Storage(StorageError::TooOldRevision { .. }) => 410,
            Self::Storage(StorageError::InvalidContinue(_))
            | Self::Storage(StorageError::InvalidResourceVersion(_)) => 400,
            Self::Cancelled
            | Self::Internal(_)
            | Self::Attribute(_)
            | Self::Storage(_)
            | Self::Json(_) => 500,
        }
    }

    /// render as a Status object for the serving layer
    pub fn to_status(&self) -> Status {
        let message = self.to_string();
        match self {
            Self::Invalid { kind, name, errors } => {
                Status::failure(self.code(), StatusReason::Invalid, message).with_details(
                    StatusDetails {
                        name: name.clone(),
                        kind: kind.clone(),
                        causes: Vec::<StatusCause>::from(errors),
                        ..Default::default()
                    },
                )
            }
            Self::NotFound { resource, name } => {
                Status::failure(self.code(), StatusReason::NotFound, message)
                    .with_details(resource_details(resource, name))
            }
            Self::AlreadyExists { resource, name } => {
                Status::failure(self.code(), StatusReason::AlreadyExists, message)
                    .with_details(resource_details(resource, name))
            }
            Self::Conflict { resource, name, .. } => {
                Status::failure(self.code(), StatusReason::Conflict, message)
                    .with_details(resource_details(resource, name))
            }
            Self::BadRequest(_) => Status::failure(self.code(), StatusReason::BadRequest, message),
            Self::MethodNotSupported { .. } => {
                Status::failure(self.code(), StatusReason::MethodNotAllowed, message)
            }
            Self::Storage(StorageError::TooOldRevision { .. }) => {
                Status::failure(self.code(), StatusReason::Gone, message)
            }
            Self::Storage(StorageError::InvalidContinue(_))
            | Self::Storage(StorageError::InvalidResourceVersion(_)) => {
                Status::failure(self.code(), StatusReason::BadRequest, message)
            }
            _ => Status::failure(self.code(), StatusReason::InternalError, message),
        }
    }
}

fn resource_details(resource: &GroupResource, name: &str) -> StatusDetails {
    StatusDetails {
        name: name.to_owned(),
        group: resource.group.clone(),
        kind: resource.resource.clone(),
        ..Default::default()
    }
}
