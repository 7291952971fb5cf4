use thiserror::Error;

/// Failures surfaced by the city and weather repositories. Nothing here is retried.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{service} request failed with status {status}: {body}")]
    Http { service: &'static str, status: u16, body: String },

    #[error("Failed to reach {service}")]
    Connectivity {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse {service} response")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unparsable date '{0}' in weather response")]
    InvalidDate(String),

    #[error("{0}")]
    Unknown(String),
}

impl RepositoryError {
    /// Classify a transport failure. Requests that could not be built or
    /// followed never reached the service, so they are not connectivity errors.
    pub(crate) fn transport(service: &'static str, source: reqwest::Error) -> Self {
        if source.is_builder() || source.is_redirect() {
            RepositoryError::Unknown(format!("{service} request could not be sent: {source}"))
        } else {
            RepositoryError::Connectivity { service, source }
        }
    }
}

/// Failures writing to durable preference storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to access preferences file '{path}'")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed preferences file '{path}'")]
    Decode {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode preferences")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum FavoritesError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to encode favorites")]
    Encode(#[from] serde_json::Error),
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_bodies_on_char_boundary() {
        let body = "é".repeat(150);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 203);
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn http_error_message_carries_status() {
        let err = RepositoryError::Http { service: "OpenWeather", status: 401, body: "bad key".into() };
        assert_eq!(err.to_string(), "OpenWeather request failed with status 401: bad key");
    }

    #[test]
    fn unbuildable_request_is_unknown() {
        let source = reqwest::Client::new().get("not a url").build().unwrap_err();
        assert!(source.is_builder());

        let err = RepositoryError::transport("Nominatim", source);
        assert!(matches!(err, RepositoryError::Unknown(ref m) if m.starts_with("Nominatim")));
    }
}
