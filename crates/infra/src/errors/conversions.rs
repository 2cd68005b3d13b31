//! Conversions from external infrastructure errors into domain errors.

use amfe_common::StorageError;
use amfe_domain::{AmfeError, RemoteFailure};
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub AmfeError);

impl From<InfraError> for AmfeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<AmfeError> for InfraError {
    fn from(value: AmfeError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoAmfeError {
    fn into_amfe(self) -> AmfeError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → AmfeError */
/* -------------------------------------------------------------------------- */

impl IntoAmfeError for SqlError {
    fn into_amfe(self) -> AmfeError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => {
                        AmfeError::StorageUnavailable("database is busy".into())
                    }
                    ErrorCode::DatabaseLocked => {
                        AmfeError::StorageUnavailable("database is locked".into())
                    }
                    ErrorCode::CannotOpen => {
                        AmfeError::StorageUnavailable(format!("cannot open database: {message}"))
                    }
                    ErrorCode::DiskFull => AmfeError::StorageWrite("disk is full".into()),
                    ErrorCode::ReadOnly => AmfeError::StorageWrite("database is read-only".into()),
                    _ => AmfeError::StorageUnavailable(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => AmfeError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                AmfeError::StorageUnavailable(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                AmfeError::StorageUnavailable(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => AmfeError::StorageUnavailable(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => AmfeError::StorageUnavailable(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_amfe())
    }
}

/* -------------------------------------------------------------------------- */
/* StorageError → AmfeError */
/* -------------------------------------------------------------------------- */

impl IntoAmfeError for StorageError {
    fn into_amfe(self) -> AmfeError {
        match self {
            StorageError::Rusqlite(err) => err.into_amfe(),
            StorageError::Timeout(secs) => {
                AmfeError::StorageUnavailable(format!("timed out after {secs}s waiting for a connection"))
            }
            other => AmfeError::StorageUnavailable(other.to_string()),
        }
    }
}

impl From<StorageError> for InfraError {
    fn from(value: StorageError) -> Self {
        InfraError(value.into_amfe())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → AmfeError / RemoteFailure */
/* -------------------------------------------------------------------------- */

/// Describe a transport-level failure in backend terms
///
/// Errors carrying a status keep it so classification can see 5xx and 429.
pub fn remote_failure_from_http(err: &HttpError) -> RemoteFailure {
    if err.is_timeout() {
        return RemoteFailure::network("HTTP request timed out");
    }

    #[cfg(not(target_arch = "wasm32"))]
    if err.is_connect() {
        return RemoteFailure::network("HTTP connection failure");
    }

    if let Some(status) = err.status() {
        let code = status.as_u16();
        let message =
            format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
        return RemoteFailure::status(code, None, message);
    }

    if err.is_decode() || err.is_body() {
        return RemoteFailure::message(format!("invalid response body: {err}"));
    }

    RemoteFailure::network(err.to_string())
}

impl IntoAmfeError for HttpError {
    fn into_amfe(self) -> AmfeError {
        if self.is_builder() {
            return AmfeError::Config(format!("invalid HTTP client setup: {self}"));
        }
        AmfeError::remote("Remote request failed", remote_failure_from_http(&self))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_amfe())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use amfe_domain::RemoteErrorClass;
    use reqwest::{Client, StatusCode};
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_storage_unavailable() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        let mapped: AmfeError = InfraError::from(err).into();
        match mapped {
            AmfeError::StorageUnavailable(msg) => assert!(msg.contains("busy")),
            other => panic!("expected storage unavailable, got {:?}", other),
        }
    }

    #[test]
    fn sqlite_disk_full_maps_to_storage_write() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DiskFull, extended_code: 13 },
            None,
        );

        let mapped: AmfeError = InfraError::from(err).into();
        assert!(matches!(mapped, AmfeError::StorageWrite(_)));
    }

    #[test]
    fn storage_timeout_maps_to_storage_unavailable() {
        let mapped: AmfeError = InfraError::from(StorageError::Timeout(5)).into();
        assert_eq!(
            mapped,
            AmfeError::StorageUnavailable("timed out after 5s waiting for a connection".into())
        );
    }

    #[tokio::test]
    async fn http_status_503_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::SERVICE_UNAVAILABLE))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let failure = remote_failure_from_http(&error);
        assert_eq!(failure.classify(), RemoteErrorClass::Transient);
        assert!(failure.to_string().contains("503"));
    }

    #[tokio::test]
    async fn http_status_401_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::UNAUTHORIZED))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: AmfeError = InfraError::from(error).into();
        assert!(matches!(mapped, AmfeError::PermanentRemote { .. }));
    }

    #[tokio::test]
    async fn connection_refused_is_network_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(format!("http://{addr}")).send().await.unwrap_err();

        assert!(matches!(remote_failure_from_http(&error), RemoteFailure::Network { .. }));
    }
}
