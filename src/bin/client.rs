// TCP client: a thin REPL that sends one statement per line and renders
// the server's reply. Replies that parse as JSON are shown as a table;
// anything else is echoed verbatim.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;

use minirel::server::DEFAULT_ADDR;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let addr = args.get(1).map(String::as_str).unwrap_or(DEFAULT_ADDR);

    let mut stream = match TcpStream::connect(addr) {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("Error: failed to connect to {addr}: {e}");
            std::process::exit(1);
        }
    };
    let mut server_reader = match stream.try_clone() {
        Ok(clone) => BufReader::new(clone),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!("Connected to {addr}. Type queries, or 'exit' to quit.");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            let _ = stream.write_all(b"exit\n");
            break;
        }

        if let Err(e) = stream.write_all(format!("{line}\n").as_bytes()) {
            eprintln!("Error: send failed: {e}");
            break;
        }

        let mut reply = String::new();
        match server_reader.read_line(&mut reply) {
            Ok(0) => {
                eprintln!("server closed the connection");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error: read failed: {e}");
                break;
            }
        }

        match serde_json::from_str::<serde_json::Value>(reply.trim_end()) {
            Ok(doc) => print_json_result(&doc),
            Err(_) => print!("{reply}"),
        }
    }
}

fn print_json_result(doc: &serde_json::Value) {
    let message = doc["Message"].as_str().unwrap_or("");
    let affected = doc["Affected"].as_u64().unwrap_or(0);
    println!("Message: {message}    Affected: {affected}");

    let columns: Vec<String> = doc["Columns"]
        .as_array()
        .map(|cols| {
            cols.iter()
                .map(|c| c.as_str().unwrap_or("?").to_string())
                .collect()
        })
        .unwrap_or_default();
    let rows: Vec<Vec<String>> = doc["Rows"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .map(|row| {
                    row.as_array()
                        .map(|cells| cells.iter().map(render_cell).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default();

    if !rows.is_empty() {
        print_table(&columns, &rows);
    }
}

fn render_cell(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn print_table(columns: &[String], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = columns.iter().map(String::len).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() && cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }

    let separator = || {
        let parts: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
        println!("+{}+", parts.join("+"));
    };

    separator();
    let header: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!(" {:<width$} ", c, width = widths[i]))
        .collect();
    println!("|{}|", header.join("|"));
    separator();
    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, c)| format!(" {:<width$} ", c, width = widths.get(i).copied().unwrap_or(1)))
            .collect();
        println!("|{}|", cells.join("|"));
    }
    separator();
}
