use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;

/// Server answers exactly one connection with a canned response.
pub struct Server {
    port: u16,
    handle: JoinHandle<Vec<u8>>,
}

impl Server {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Raw bytes of the request the server received.
    pub fn received(self) -> String {
        let raw = self.handle.join().expect("server thread must not panic");
        String::from_utf8_lossy(&raw).into_owned()
    }
}

pub fn serve(response: Vec<u8>) -> Server {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind must succeed");
    let port = listener.local_addr().expect("addr must exist").port();

    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept must succeed");
        let raw = read_request(&mut stream);
        stream.write_all(&response).expect("write must succeed");
        stream.flush().expect("flush must succeed");
        raw
    });
    Server { port, handle }
}

pub fn with_length(status: &str, body: &[u8]) -> Vec<u8> {
    let mut resp = format!(
        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    resp.extend_from_slice(body);
    resp
}

pub fn chunked(chunks: &[&[u8]]) -> Vec<u8> {
    let mut resp =
        b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\nconnection: close\r\n\r\n".to_vec();
    for chunk in chunks {
        resp.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        resp.extend_from_slice(chunk);
        resp.extend_from_slice(b"\r\n");
    }
    resp.extend_from_slice(b"0\r\n\r\n");
    resp
}

fn read_request(stream: &mut impl Read) -> Vec<u8> {
    let mut raw = Vec::new();
    let mut buf = [0; 4096];

    let header_end = loop {
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut buf).expect("read must succeed");
        if n == 0 {
            return raw;
        }
        raw.extend_from_slice(&buf[..n]);
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).to_lowercase();
    let length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or_default();

    while raw.len() < header_end + length {
        let n = stream.read(&mut buf).expect("read must succeed");
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);
    }
    raw
}
