//! `retec` binary entry point. Only built with `--features cli`.

fn main() {
    env_logger::init();
    if let Err(e) = rete_front::cli::run_cli() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
