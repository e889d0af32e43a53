use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Sensor error: {0}")]
    Sensor(String),

    #[error("Process tree error: {0}")]
    Tree(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
