fn main() {
    if let Err(err) = atelier_labels::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
