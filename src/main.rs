use std::process;

fn main() {
    if let Err(e) = assetrun::cli::run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
