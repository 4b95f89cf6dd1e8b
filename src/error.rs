use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetreadyError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("Probe error for {component}: {message}")]
    Probe { component: String, message: String },

    #[error("Topology error: {message}")]
    Topology { message: String },

    #[error("System error: {message}")]
    System { message: String },
}

impl NetreadyError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn probe<S: Into<String>>(component: S, message: S) -> Self {
        Self::Probe {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn topology<S: Into<String>>(message: S) -> Self {
        Self::Topology {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NetreadyError>;
