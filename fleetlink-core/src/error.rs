use thiserror::Error;

use crate::event::bus::BusError;
use crate::event::envelope::EnvelopeError;
use crate::event::registry::{RegistryError, RequestError};
use crate::event::responder::DirectoryError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Request error: {0}")]
    Request(#[from] RequestError),
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
    #[error("Envelope error: {0}")]
    Envelope(#[from] EnvelopeError),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
