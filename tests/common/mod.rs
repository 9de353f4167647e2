#![allow(dead_code)]

pub mod test_server {
    use std::sync::Once;

    /// Ensures the may runtime and tracing are configured only once across
    /// test threads.
    static INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
            let _ = tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
                )
                .with_test_writer()
                .try_init();
        });
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    /// Open a connection, send `raw` and read exactly one framed response.
    pub fn send_request(addr: &SocketAddr, raw: &str) -> String {
        let mut stream = connect(addr);
        stream.write_all(raw.as_bytes()).unwrap();
        read_response(&mut stream)
    }

    pub fn connect(addr: &SocketAddr) -> TcpStream {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream
    }

    /// Read one response: headers up to the blank line plus a
    /// `Content-Length` body. Works on keep-alive connections, where waiting
    /// for EOF would hang.
    pub fn read_response(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(end) = headers_end(&buf) {
                let head = String::from_utf8_lossy(&buf[..end]).into_owned();
                let content_length = head
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if name.eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);
                let total = end + 4 + content_length;
                while buf.len() < total {
                    let n = stream.read(&mut chunk).unwrap();
                    assert!(n > 0, "connection closed mid-body");
                    buf.extend_from_slice(&chunk[..n]);
                }
                return String::from_utf8_lossy(&buf[..total]).into_owned();
            }
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                return String::from_utf8_lossy(&buf).into_owned();
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    fn headers_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    /// Split a raw response into status code, headers and body.
    pub fn parse_response_parts(resp: &str) -> (u16, Vec<(String, String)>, String) {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect();
        (status, headers, body.to_string())
    }

    /// Value of the first header with the given name, case-insensitively.
    pub fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
