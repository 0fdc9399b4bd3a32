// TCP server binary: serves the line protocol over a data directory.

use minirel::server::{run_server, DEFAULT_ADDR};
use minirel::Engine;

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let data_dir = args.get(1).map(String::as_str).unwrap_or("data");
    let addr = args.get(2).map(String::as_str).unwrap_or(DEFAULT_ADDR);

    let engine = match Engine::open(data_dir) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: unable to open database in \"{data_dir}\": {e}");
            std::process::exit(1);
        }
    };

    println!("minirel server on {addr} (data dir: {data_dir})");
    if let Err(e) = run_server(addr, engine) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
