// Interactive shell over an embedded engine.

use minirel::{Engine, ExecResult, Value};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let data_dir = args.get(1).map(String::as_str).unwrap_or("data");

    let mut engine = match Engine::open(data_dir) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: unable to open database in \"{data_dir}\": {e}");
            std::process::exit(1);
        }
    };

    println!("minirel on {data_dir} (type 'exit' to quit)");

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    loop {
        match rl.readline("db> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                    break;
                }
                let _ = rl.add_history_entry(line);
                match engine.execute(line) {
                    Ok(result) => print_result(&result),
                    Err(e) => eprintln!("Error: {e}"),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {e}");
                break;
            }
        }
    }
}

fn print_result(result: &ExecResult) {
    if result.rows.is_empty() {
        if result.affected > 0 {
            println!("{} ({} row affected)", result.message, result.affected);
        } else {
            println!("{}", result.message);
        }
        return;
    }
    print_table(&result.columns, &result.rows);
}

/// Render rows as an ASCII table with +---+ separators.
fn print_table(columns: &[String], rows: &[Vec<Value>]) {
    let mut widths: Vec<usize> = columns.iter().map(String::len).collect();
    let rendered: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(Value::to_string).collect())
        .collect();
    for row in &rendered {
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
    for row in &rendered {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, c)| format!(" {:<width$} ", c, width = widths[i]))
            .collect();
        println!("|{}|", cells.join("|"));
    }
    separator();
}
