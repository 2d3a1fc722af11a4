//! Shared fixtures: an in-process HTTP stub standing in for the NOID service.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};

/// A one-thread HTTP/1.1 server answering every request from `handler`.
pub struct StubServer {
    pub base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    /// `handler` receives the request target (path + query) and returns
    /// the status code and body.
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&str) -> (u16, String) + Send + 'static,
    {
        Self::start_dropping(0, handler)
    }

    /// Like [`StubServer::start`], but the first `drops` connections have
    /// their request read and recorded, then are closed without a response.
    pub fn start_dropping<F>(drops: usize, handler: F) -> Self
    where
        F: Fn(&str) -> (u16, String) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        std::thread::spawn(move || {
            for (i, stream) in listener.incoming().enumerate() {
                let Ok(stream) = stream else { continue };
                if i < drops {
                    if let Some(target) = read_target(&stream) {
                        recorded.lock().unwrap().push(target);
                    }
                    continue;
                }
                serve_one(stream, &handler, &recorded);
            }
        });

        Self { base, requests }
    }

    /// Targets received so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, needle: &str) -> usize {
        self.requests().iter().filter(|r| r.contains(needle)).count()
    }

    pub fn noid_url(&self) -> String {
        format!("{}/noidu_gmgs?", self.base)
    }
}

/// Read a request's line and headers; returns the target.
fn read_target(stream: &TcpStream) -> Option<String> {
    let mut reader = BufReader::new(stream.try_clone().ok()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).ok()? == 0 || header == "\r\n" {
            break;
        }
    }
    Some(request_line.split_whitespace().nth(1)?.to_string())
}

fn serve_one<F>(mut stream: TcpStream, handler: &F, recorded: &Mutex<Vec<String>>) -> Option<()>
where
    F: Fn(&str) -> (u16, String),
{
    let target = read_target(&stream)?;
    // Recorded before answering so the client never sees a response first.
    recorded.lock().unwrap().push(target.clone());
    let (status, body) = handler(&target);
    let response = format!(
        "HTTP/1.1 {} STUB\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).ok()?;
    stream.flush().ok()?;
    Some(())
}

/// NOID-like handler: `mint+1` returns sequential identifiers, binds get `bind_status`.
pub fn noid_handler(bind_status: u16) -> impl Fn(&str) -> (u16, String) + Send + 'static {
    let counter = Mutex::new(0u32);
    move |target: &str| {
        if target.contains("mint+1") {
            let mut n = counter.lock().unwrap();
            *n += 1;
            (200, format!("id: 77981/gmgs{:07}\n", *n))
        } else if target.contains("bind+set+") {
            (bind_status, "ok\n".to_string())
        } else {
            (404, String::new())
        }
    }
}

/// A local port with nothing listening on it.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/noidu_gmgs?", addr)
}

pub fn config_toml(noid_url: &str) -> String {
    format!(
        r#"environment = "development"

[endpoints.production]
app_url = "https://discover.example.org/"
file_server_url = "https://geodata.example.org/"
noid_url = "https://noid.invalid/noidu_gmgs?"

[endpoints.development]
app_url = "https://discover.example.org/"
file_server_url = "https://geodata.example.org/"
noid_url = "{}"

[http]
timeout_secs = 5
max_retries = 0
retry_base_ms = 1

[bind]
base_url = "https://uwm.edu/libraries/"
"#,
        noid_url
    )
}

/// An ArcGIS-style record with a citation block, alternate title, and rights.
pub fn record(title: &str, rights: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xml:lang="en">
  <dataIdInfo>
    <idCitation>
      <resTitle>{title} (full title)</resTitle>
      <resAltTitle>{title}</resAltTitle>
    </idCitation>
    <resConst><Consts><othConsts>{rights}</othConsts></Consts></resConst>
  </dataIdInfo>
  <mdContact>
    <rpCntInfo><cntHours>Mon-Fri 8-4:30</cntHours></rpCntInfo>
  </mdContact>
</metadata>
"#
    )
}
