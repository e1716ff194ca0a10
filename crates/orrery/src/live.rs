//! HTTP-backed [`RemoteSource`].
//!
//! The collection lives at `<base_url><collection_path>`; cursors are the
//! absolute `next` URLs the server hands back, and search appends
//! `?search=<query>` to the collection URL.

use crate::config::{ConfigError, SourceConfig};
use orrery_protocol::{decode_page, Cursor, Page, RemoteSource, SourceError};
use std::future::Future;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Fetches raw response bodies.
pub trait HttpTransport: Send + Sync + 'static {
    /// GET `url` and return the body of a 2xx response.
    fn get(&self, url: &Url) -> impl Future<Output = Result<Vec<u8>, SourceError>> + Send;
}

/// [`HttpTransport`] over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<Vec<u8>, SourceError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(classify)?;
        Ok(body.to_vec())
    }
}

fn classify(err: reqwest::Error) -> SourceError {
    if err.is_decode() {
        SourceError::decode(err.to_string())
    } else if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
        SourceError::network(err.to_string())
    } else if let Some(status) = err.status() {
        SourceError::HttpStatus(status.as_u16())
    } else {
        SourceError::message(err.to_string())
    }
}

/// Paginated listing served over HTTP.
#[derive(Debug, Clone)]
pub struct LiveSource<T> {
    transport: T,
    collection: Url,
}

impl LiveSource<ReqwestTransport> {
    pub fn from_config(config: &SourceConfig) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(config.request_timeout())
            .map_err(|e| ConfigError::Invalid(format!("HTTP client: {}", e)))?;
        Self::new(transport, &config.base_url, &config.collection_path)
    }
}

impl<T: HttpTransport> LiveSource<T> {
    /// `base_url` should end with `/` so the collection path is appended
    /// rather than replacing its last segment.
    pub fn new(transport: T, base_url: &str, collection_path: &str) -> Result<Self, ConfigError> {
        let base = Url::parse(base_url)
            .map_err(|e| ConfigError::Invalid(format!("base URL '{}': {}", base_url, e)))?;
        let collection = base.join(collection_path).map_err(|e| {
            ConfigError::Invalid(format!("collection path '{}': {}", collection_path, e))
        })?;
        Ok(Self {
            transport,
            collection,
        })
    }

    pub fn collection_url(&self) -> &Url {
        &self.collection
    }

    fn search_url(&self, query: &str) -> Url {
        let mut url = self.collection.clone();
        url.query_pairs_mut().append_pair("search", query);
        url
    }

    async fn get_page(&self, url: &Url) -> Result<Page, SourceError> {
        debug!(url = %url, "GET");
        let body = self.transport.get(url).await?;
        decode_page(&body)
    }
}

impl<T: HttpTransport> RemoteSource for LiveSource<T> {
    async fn fetch_first(&self) -> Result<Page, SourceError> {
        self.get_page(&self.collection).await
    }

    async fn fetch_at(&self, cursor: &Cursor) -> Result<Page, SourceError> {
        let url = Url::parse(cursor.as_str())
            .map_err(|e| SourceError::message(format!("Invalid cursor '{}': {}", cursor, e)))?;
        self.get_page(&url).await
    }

    async fn search(&self, query: &str) -> Result<Page, SourceError> {
        self.get_page(&self.search_url(query)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct FakeTransport {
        bodies: Mutex<HashMap<String, Result<Vec<u8>, SourceError>>>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeTransport {
        fn respond(&self, url: &str, body: &str) {
            self.bodies
                .lock()
                .unwrap()
                .insert(url.to_string(), Ok(body.as_bytes().to_vec()));
        }

        fn fail(&self, url: &str, err: SourceError) {
            self.bodies.lock().unwrap().insert(url.to_string(), Err(err));
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl HttpTransport for FakeTransport {
        async fn get(&self, url: &Url) -> Result<Vec<u8>, SourceError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.bodies
                .lock()
                .unwrap()
                .get(url.as_str())
                .cloned()
                .unwrap_or(Err(SourceError::HttpStatus(404)))
        }
    }

    fn planet(name: &str) -> String {
        format!(
            r#"{{"name":"{}","climate":"arid","gravity":"1 standard","terrain":"desert","diameter":"10465","population":"200000"}}"#,
            name
        )
    }

    fn source() -> LiveSource<FakeTransport> {
        LiveSource::new(FakeTransport::default(), "https://swapi.dev/api/", "planets/").unwrap()
    }

    #[test]
    fn test_collection_url_joins_base_and_path() {
        assert_eq!(
            source().collection_url().as_str(),
            "https://swapi.dev/api/planets/"
        );
    }

    #[test]
    fn test_bad_base_url_is_config_error() {
        let err = LiveSource::new(FakeTransport::default(), "::nope", "planets/").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_fetch_first_follows_envelope_cursor() {
        let source = source();
        source.transport.respond(
            "https://swapi.dev/api/planets/",
            &format!(
                r#"{{"next":"https://swapi.dev/api/planets/?page=2","results":[{}]}}"#,
                planet("Tatooine")
            ),
        );
        source.transport.respond(
            "https://swapi.dev/api/planets/?page=2",
            &format!(r#"{{"next":null,"results":[{}]}}"#, planet("Hoth")),
        );

        let first = source.fetch_first().await.unwrap();
        assert_eq!(first.records[0].name, "Tatooine");
        let cursor = first.cursor.unwrap();

        let second = source.fetch_at(&cursor).await.unwrap();
        assert_eq!(second.records[0].name, "Hoth");
        assert!(second.cursor.is_none());
    }

    #[tokio::test]
    async fn test_search_uses_query_parameter() {
        let source = source();
        source.transport.respond(
            "https://swapi.dev/api/planets/?search=al+der",
            &format!("[{}]", planet("Alderaan")),
        );

        let page = source.search("al der").await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(
            source.transport.requested(),
            vec!["https://swapi.dev/api/planets/?search=al+der".to_string()]
        );
    }

    #[tokio::test]
    async fn test_transport_errors_pass_through() {
        let source = source();
        source.transport.fail(
            "https://swapi.dev/api/planets/",
            SourceError::network("offline"),
        );

        let err = source.fetch_first().await.unwrap_err();
        assert_eq!(err.user_message(), "Network connection appears to be offline.");
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_decode_failure() {
        let source = source();
        source
            .transport
            .respond("https://swapi.dev/api/planets/", r#"{"detail":"Not found"}"#);

        let err = source.fetch_first().await.unwrap_err();
        assert!(matches!(err, SourceError::DecodeFailure(_)));
    }

    #[tokio::test]
    async fn test_invalid_cursor_is_message_error() {
        let err = source().fetch_at(&Cursor::from("not a url")).await.unwrap_err();
        assert!(matches!(err, SourceError::Message(_)));
    }

    /// Serve one canned HTTP response on a loopback port and return its URL.
    fn serve_once(response: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        });
        Url::parse(&format!("http://{}/api/", addr)).unwrap()
    }

    #[tokio::test]
    async fn test_reqwest_refused_connection_is_network_unavailable() {
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let url = Url::parse("http://127.0.0.1:1/").unwrap();

        let err = transport.get(&url).await.unwrap_err();
        assert!(matches!(err, SourceError::NetworkUnavailable(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_reqwest_non_success_status_is_http_status() {
        let url = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();

        let err = transport.get(&url).await.unwrap_err();
        assert_eq!(err, SourceError::HttpStatus(503));
        assert_eq!(err.user_message(), "Server responded with status 503.");
    }

    #[tokio::test]
    async fn test_reqwest_silent_server_times_out_as_network_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            // Accept and hold the connection without answering.
            if let Ok((stream, _)) = listener.accept() {
                std::thread::sleep(Duration::from_secs(2));
                drop(stream);
            }
        });
        let transport = ReqwestTransport::new(Duration::from_millis(100)).unwrap();
        let url = Url::parse(&format!("http://{}/", addr)).unwrap();

        let err = transport.get(&url).await.unwrap_err();
        assert!(matches!(err, SourceError::NetworkUnavailable(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_live_source_over_reqwest_decodes_envelope() {
        const RESPONSE: &str = concat!(
            "HTTP/1.1 200 OK\r\n",
            "Content-Type: application/json\r\n",
            "Content-Length: 145\r\n",
            "Connection: close\r\n\r\n",
            r#"{"next":null,"results":[{"name":"Hoth","climate":"frozen","gravity":"1.1 standard","terrain":"tundra","diameter":"7200","population":"unknown"}]}"#,
        );
        let base = serve_once(RESPONSE);
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
        let source = LiveSource::new(transport, base.as_str(), "planets/").unwrap();

        let page = source.fetch_first().await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].name, "Hoth");
        assert!(page.cursor.is_none());
    }
}
