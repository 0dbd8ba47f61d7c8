//! Locating and fetching PAC scripts
//!
//! A script is read from the filesystem or downloaded over HTTP(S). Downloads
//! always go direct: a proxy that is itself chosen by the PAC script cannot
//! be used to fetch that script.

use crate::error::{PacError, Result};
use crate::script::PacScript;
use reqwest::blocking::Client;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Where a PAC script lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacLocation {
    File(PathBuf),
    Http(Url),
}

impl PacLocation {
    /// Accepts `file://` and `http(s)://` URIs, or a plain filesystem path
    pub fn parse(location: &str) -> Result<Self> {
        let location = location.trim();
        if location.is_empty() {
            return Err(PacError::InvalidLocation {
                location: location.to_string(),
                reason: "empty location".to_string(),
            });
        }

        match Url::parse(location) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(PacLocation::Http(url)),
                "file" => url
                    .to_file_path()
                    .map(PacLocation::File)
                    .map_err(|_| PacError::InvalidLocation {
                        location: location.to_string(),
                        reason: "not a local file path".to_string(),
                    }),
                scheme => Err(PacError::UnsupportedScheme {
                    scheme: scheme.to_string(),
                }),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(PacLocation::File(PathBuf::from(location)))
            }
            Err(e) => Err(PacError::InvalidLocation {
                location: location.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Read or download the script text
    pub fn fetch(&self, timeout: Duration) -> Result<PacScript> {
        let source = match self {
            PacLocation::File(path) => {
                debug!("Reading PAC script from {:?}", path);
                fs::read_to_string(path).map_err(|e| PacError::ScriptRead {
                    path: path.clone(),
                    source: e,
                })?
            }
            PacLocation::Http(url) => download(url, timeout)?,
        };
        Ok(PacScript::new(source, self.to_string()))
    }
}

fn download(url: &Url, timeout: Duration) -> Result<String> {
    info!("Downloading PAC script from {}", url);

    let client = Client::builder().no_proxy().timeout(timeout).build()?;
    let response = client.get(url.clone()).send()?;

    let status = response.status();
    if !status.is_success() {
        return Err(PacError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let text = response.text()?;
    debug!("Downloaded PAC script ({} bytes)", text.len());
    Ok(text)
}

impl fmt::Display for PacLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacLocation::File(path) => write!(f, "{}", path.display()),
            PacLocation::Http(url) => write!(f, "{}", url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    const SCRIPT: &str = "function FindProxyForURL(url, host) { return \"DIRECT\"; }";

    /// Serve a single HTTP response on a local port
    fn serve_once(status_line: &'static str, body: &'static str) -> (Url, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
        });
        let url = Url::parse(&format!("http://{addr}/proxy.pac")).unwrap();
        (url, handle)
    }

    #[test]
    fn test_parse_locations() {
        assert_eq!(
            PacLocation::parse("file:///etc/proxy.pac").unwrap(),
            PacLocation::File(PathBuf::from("/etc/proxy.pac"))
        );
        assert_eq!(
            PacLocation::parse("/etc/proxy.pac").unwrap(),
            PacLocation::File(PathBuf::from("/etc/proxy.pac"))
        );
        assert_eq!(
            PacLocation::parse("proxy.pac").unwrap(),
            PacLocation::File(PathBuf::from("proxy.pac"))
        );
        assert!(matches!(
            PacLocation::parse(" https://wpad.example/wpad.dat ").unwrap(),
            PacLocation::Http(_)
        ));
    }

    #[test]
    fn test_parse_rejects() {
        assert!(matches!(
            PacLocation::parse("ftp://example.com/proxy.pac"),
            Err(PacError::UnsupportedScheme { .. })
        ));
        assert!(matches!(
            PacLocation::parse("   "),
            Err(PacError::InvalidLocation { .. })
        ));
        assert!(matches!(
            PacLocation::parse("http://"),
            Err(PacError::InvalidLocation { .. })
        ));
    }

    #[test]
    fn test_fetch_file_and_file_uri() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{SCRIPT}").unwrap();

        let by_path = PacLocation::File(file.path().to_path_buf())
            .fetch(Duration::from_secs(1))
            .unwrap();
        assert_eq!(by_path.source, SCRIPT);
        assert_eq!(by_path.origin, file.path().display().to_string());

        let uri = Url::from_file_path(file.path()).unwrap();
        let by_uri = PacLocation::parse(uri.as_str())
            .unwrap()
            .fetch(Duration::from_secs(1))
            .unwrap();
        assert_eq!(by_uri.source, SCRIPT);
    }

    #[test]
    fn test_fetch_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PacLocation::File(dir.path().join("missing.pac"))
            .fetch(Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, PacError::ScriptRead { .. }));
        assert!(err.is_load_error());
    }

    #[test]
    fn test_fetch_http() {
        let (url, server) = serve_once("200 OK", SCRIPT);
        let script = PacLocation::Http(url.clone())
            .fetch(Duration::from_secs(5))
            .unwrap();
        server.join().unwrap();

        assert_eq!(script.source, SCRIPT);
        assert_eq!(script.origin, url.to_string());
    }

    #[test]
    fn test_fetch_http_error_status() {
        let (url, server) = serve_once("404 Not Found", "gone");
        let err = PacLocation::Http(url)
            .fetch(Duration::from_secs(5))
            .unwrap_err();
        server.join().unwrap();

        assert!(matches!(err, PacError::HttpStatus { status: 404, .. }), "{err}");
    }
}
