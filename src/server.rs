// Line-oriented TCP front-end.
//
// One thread per accepted connection. A client sends one SQL statement per
// line; the reply is a single line: "OK" when the statement produced no
// rows, a JSON ExecResult when it did, or "parse error: ..." on failure.
// The literal line "exit" closes the connection.
//
// The engine sits behind a mutex shared by all connection threads, which
// serializes statements (and with them all catalog and table writes)
// within the process.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use log::{info, warn};

use crate::engine::Engine;
use crate::error::{DbError, Result};

pub const DEFAULT_ADDR: &str = "127.0.0.1:4000";

/// Bind and serve forever.
pub fn run_server(addr: &str, engine: Engine) -> Result<()> {
    let listener = TcpListener::bind(addr)?;
    info!("listening on {addr}");
    let engine = Arc::new(Mutex::new(engine));

    for conn in listener.incoming() {
        match conn {
            Ok(stream) => {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    if let Err(e) = handle_client(stream, engine) {
                        warn!("connection error: {e}");
                    }
                });
            }
            Err(e) => warn!("accept failed: {e}"),
        }
    }
    Ok(())
}

fn handle_client(stream: TcpStream, engine: Arc<Mutex<Engine>>) -> Result<()> {
    let peer = stream.peer_addr()?;
    info!("client connected: {peer}");

    let reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            break;
        }

        let result = {
            let mut engine = engine
                .lock()
                .map_err(|_| DbError::Storage("engine mutex poisoned".into()))?;
            engine.execute(line)
        };

        match result {
            Ok(res) if res.rows.is_empty() => {
                writer.write_all(b"OK\n")?;
            }
            Ok(res) => {
                let json = serde_json::to_string(&res)
                    .map_err(|e| DbError::Corrupt(format!("encode result: {e}")))?;
                writer.write_all(json.as_bytes())?;
                writer.write_all(b"\n")?;
            }
            Err(e) => {
                writer.write_all(format!("parse error: {e}\n").as_bytes())?;
            }
        }
        writer.flush()?;
    }

    info!("client disconnected: {peer}");
    Ok(())
}
