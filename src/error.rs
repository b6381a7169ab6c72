use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// No drawing surface or font face could be set up. Aborts the whole batch.
    RenderingUnavailable(String),
    /// Template parse, page lookup or image embedding failed for one certificate.
    Composition(String),
    LayoutSuggestionFailed(String),
    SpreadsheetParse(String),
    EmptyParticipantList,
    MissingTemplate,
    InvalidLayout(String),
    BatchGenerationFailed(Box<Error>),
    Zip(zip::result::ZipError),
    Pdf(lopdf::Error),
    Io(std::io::Error),
}

impl Error {
    /// Whether this error, raised while processing one participant, must stop the run.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, Error::RenderingUnavailable(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::RenderingUnavailable(reason) => write!(f, "rendering unavailable: {reason}"),
            Error::Composition(reason) => write!(f, "composition error: {reason}"),
            Error::LayoutSuggestionFailed(reason) => {
                write!(f, "layout suggestion failed: {reason}")
            }
            Error::SpreadsheetParse(reason) => {
                write!(f, "could not read participant spreadsheet: {reason}")
            }
            Error::EmptyParticipantList => write!(f, "no participants found"),
            Error::MissingTemplate => write!(f, "no certificate template has been loaded"),
            Error::InvalidLayout(reason) => write!(f, "invalid layout: {reason}"),
            Error::BatchGenerationFailed(e) => write!(f, "certificate generation failed: {e}"),
            Error::Zip(e) => write!(f, "ZIP error: {e}"),
            Error::Pdf(e) => write!(f, "PDF error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::BatchGenerationFailed(e) => Some(e.as_ref()),
            Error::Zip(e) => Some(e),
            Error::Pdf(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Zip(e)
    }
}

impl From<lopdf::Error> for Error {
    fn from(e: lopdf::Error) -> Self {
        Error::Pdf(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::SpreadsheetParse(e.to_string())
    }
}
