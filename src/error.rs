use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    /// The requested processing context cannot be constructed. Not
    /// recoverable locally; the caller should disable sound-producing UI.
    UnsupportedContext { sample_rate: f64 },
    /// A recorded take could not be decoded back into samples.
    Decode(DecodeError),
}

#[derive(Debug)]
pub enum DecodeError {
    Wav(hound::Error),
    /// The data decoded, but not to something downstream editing can use.
    BadFormat { detail: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnsupportedContext { sample_rate } => {
                write!(f, "unsupported audio context: sample rate {sample_rate} Hz")
            }
            EngineError::Decode(e) => write!(f, "recording decode error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Wav(e) => write!(f, "{e}"),
            DecodeError::BadFormat { detail } => write!(f, "bad format: {detail}"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<DecodeError> for EngineError {
    fn from(e: DecodeError) -> Self {
        EngineError::Decode(e)
    }
}

impl From<hound::Error> for EngineError {
    fn from(e: hound::Error) -> Self {
        EngineError::Decode(DecodeError::Wav(e))
    }
}
