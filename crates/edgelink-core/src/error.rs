//! Error type shared across the runtime.

/// Errors raised by the runtime and its collaborators.
///
/// Each variant corresponds to one failure kind; [`SdkError::http_status`]
/// gives the status the northbound API reports for it.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// No driver implementation was supplied at construction
    #[error("no protocol driver implementation supplied")]
    NoDeviceImpl,

    /// Service constructed without a name
    #[error("no device service name specified")]
    NoDeviceName,

    /// Service constructed without a version
    #[error("no device service version specified")]
    NoDeviceVersion,

    /// A caller-supplied argument was rejected
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// Configuration could not be parsed or is semantically invalid
    #[error("bad configuration: {0}")]
    BadConfig(String),

    /// A required platform service did not respond within the retry budget
    #[error("remote server down: {0}")]
    RemoteServerDown(String),

    /// The protocol driver refused to initialize
    #[error("protocol driver initialization failed: {0}")]
    DriverUnstart(String),

    /// The protocol driver failed a get/set request
    #[error("protocol driver error: {0}")]
    DriverError(String),

    /// Remote create collided with an existing entity
    #[error("conflict: {0}")]
    HttpConflict(String),

    /// Requested entity does not exist
    #[error("not found: {0}")]
    HttpNotFound(String),

    /// Metadata service request failed
    #[error("metadata client failure: {0}")]
    MetadataClientFail(String),

    /// Data service request failed
    #[error("data client failure: {0}")]
    DataClientFail(String),

    /// A reading violated its resource assertion
    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    /// Command rejected: device administratively locked
    #[error("device locked: {0}")]
    DeviceLocked(String),

    /// Command rejected: device operationally disabled
    #[error("device disabled: {0}")]
    DeviceDisabled(String),

    /// A device references a profile that is not loaded
    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    /// A device with the same id or name already exists
    #[error("duplicate device: {0}")]
    DuplicateDevice(String),

    /// Write attempted on a read-only resource
    #[error("resource not writable: {0}")]
    ResourceNotWritable(String),

    /// Every device addressed by an `all` command failed
    #[error("command failed on all matching devices: {0}")]
    AllDevicesFailed(String),

    /// I/O failure reading configuration or profile files
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl SdkError {
    /// HTTP status code reported on the northbound API for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidArg(_) | Self::BadConfig(_) => 400,
            Self::HttpNotFound(_) | Self::ProfileNotFound(_) => 404,
            Self::ResourceNotWritable(_) => 405,
            Self::HttpConflict(_) | Self::DuplicateDevice(_) => 409,
            Self::DeviceLocked(_) | Self::DeviceDisabled(_) => 423,
            Self::DriverError(_) => 502,
            _ => 500,
        }
    }
}
