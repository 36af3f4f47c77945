//! Raw request dump
//!
//! Renders a captured request back into HTTP/1.x wire format, for
//! eyeballing exactly what arrived.

use std::io::{self, Write};

use httplog_core::RequestSnapshot;

/// Headers written separately, or not at all
const EXCLUDED: [&str; 3] = ["Host", "Transfer-Encoding", "Trailer"];

/// Write `req` in wire format, with its body when `with_body` is set
pub fn write_request_dump<W: Write>(
    w: &mut W,
    req: &RequestSnapshot,
    with_body: bool,
) -> io::Result<()> {
    write!(
        w,
        "{} {} HTTP/{}.{}\r\n",
        req.method, req.request_uri, req.proto_major, req.proto_minor
    )?;

    let host = req
        .headers
        .get("Host")
        .and_then(|values| values.first().cloned())
        .unwrap_or_else(|| {
            if req.host.contains(':') {
                format!("[{}]:{}", req.host, req.port)
            } else {
                format!("{}:{}", req.host, req.port)
            }
        });
    write!(w, "Host: {host}\r\n")?;

    if req.is_chunked() {
        w.write_all(b"Transfer-Encoding: chunked\r\n")?;
    }

    for (name, values) in &req.headers {
        if EXCLUDED.contains(&name.as_str()) {
            continue;
        }
        for value in values {
            write!(w, "{name}: {value}\r\n")?;
        }
    }
    w.write_all(b"\r\n")?;

    if with_body {
        w.write_all(req.body.as_bytes())?;
    }
    Ok(())
}
